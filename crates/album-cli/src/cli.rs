use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "album")]
#[command(about = "Upload photos to the shared album and browse the gallery")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resize and upload photos
    Upload {
        /// Image files to upload
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
        /// Caption for the file at the same position (repeatable)
        #[arg(short, long = "caption", value_name = "TEXT")]
        captions: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List one page of the gallery, newest first
    List {
        /// 1-based page number
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a browser would be warned about uploads
    CheckBrowser {
        /// User-agent string to inspect
        #[arg(long, default_value = "")]
        user_agent: String,
        /// Global names present on the page (repeatable)
        #[arg(long = "global", value_name = "NAME")]
        globals: Vec<String>,
        /// Classes on the document root (repeatable)
        #[arg(long = "dom-class", value_name = "NAME")]
        dom_classes: Vec<String>,
    },
    /// Print the effective configuration
    Config {
        /// Also resolve the masonry column count for this viewport width
        #[arg(long, value_name = "PX")]
        viewport_width: Option<u32>,
    },
}

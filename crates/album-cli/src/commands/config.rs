use album_core::storage::R2Config;
use album_core::AlbumConfig;

use crate::error::CliError;

pub fn run_config(
    config: &AlbumConfig,
    storage: Option<&R2Config>,
    viewport_width: Option<u32>,
) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(config)?);

    match storage {
        Some(r2) => println!("storage: {} (bucket {})", r2.endpoint_url(), r2.bucket),
        None => println!("storage: not configured"),
    }

    if let Some(width) = viewport_width {
        println!("columns at {width}px: {}", config.column_count(width));
    }

    Ok(())
}

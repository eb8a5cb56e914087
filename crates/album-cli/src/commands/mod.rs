pub mod check_browser;
pub mod common;
pub mod config;
pub mod list;
pub mod upload;

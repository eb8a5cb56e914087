//! Startup configuration for album hosts.
//!
//! `AlbumConfig` is read once from environment variables. Absent or blank
//! values fall back to the documented defaults; malformed values are rejected
//! so a typo never silently changes paging or image quality.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::{OutputFormat, ResizeOptions};
use crate::util::normalize_text_option;
use crate::{Error, Result};

const ENV_PAGE_SIZE: &str = "ALBUM_PAGE_SIZE";
const ENV_MAX_DIMENSION: &str = "ALBUM_MAX_DIMENSION";
const ENV_OUTPUT_FORMAT: &str = "ALBUM_OUTPUT_FORMAT";
const ENV_OUTPUT_QUALITY: &str = "ALBUM_OUTPUT_QUALITY";
const ENV_MAX_SELECTION: &str = "ALBUM_MAX_SELECTION";
const ENV_COLUMN_BREAKPOINTS: &str = "ALBUM_COLUMN_BREAKPOINTS";
const ENV_GUTTER: &str = "ALBUM_GUTTER";
const ENV_HERO_HEADING: &str = "ALBUM_HERO_HEADING";
const ENV_ROOT_PREFIX: &str = "ALBUM_ROOT_PREFIX";
const ENV_LIST_MAX_RESULTS: &str = "ALBUM_LIST_MAX_RESULTS";
const ENV_URL_TTL_SECS: &str = "ALBUM_URL_TTL_SECS";

pub const DEFAULT_PAGE_SIZE: usize = 60;
pub const DEFAULT_MAX_DIMENSION: u32 = 1920;
pub const DEFAULT_OUTPUT_QUALITY: f32 = 0.8;
pub const DEFAULT_MAX_SELECTION: usize = 20;
pub const DEFAULT_GUTTER: &str = "24px";
pub const DEFAULT_HERO_HEADING: &str = "Our Wedding Journey";
pub const DEFAULT_URL_TTL_SECS: u64 = 3600;

/// Masonry column count applied from `min_width` pixels upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBreakpoint {
    pub min_width: u32,
    pub columns: u32,
}

/// Typed album configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumConfig {
    /// Gallery items per page.
    pub page_size: usize,
    /// Longest allowed edge of an uploaded image, in pixels.
    pub max_dimension: u32,
    /// Re-encode format for uploaded images.
    pub output_format: OutputFormat,
    /// Encoder quality in `0.0..=1.0`.
    pub output_quality: f32,
    /// Maximum number of simultaneously pending uploads.
    pub max_selection: usize,
    /// Responsive column breakpoints, ascending by width.
    pub column_breakpoints: Vec<ColumnBreakpoint>,
    /// Masonry gutter as a CSS length.
    pub gutter: String,
    /// Heading shown above the upload form.
    pub hero_heading: String,
    /// Store prefix that uploads are written under and listed from.
    pub root_prefix: String,
    /// Optional cap on the number of listed objects.
    pub list_max_results: Option<usize>,
    /// Lifetime of presigned download URLs.
    pub url_ttl_secs: u64,
}

impl Default for AlbumConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_dimension: DEFAULT_MAX_DIMENSION,
            output_format: OutputFormat::Jpeg,
            output_quality: DEFAULT_OUTPUT_QUALITY,
            max_selection: DEFAULT_MAX_SELECTION,
            column_breakpoints: default_breakpoints(),
            gutter: DEFAULT_GUTTER.to_string(),
            hero_heading: DEFAULT_HERO_HEADING.to_string(),
            root_prefix: String::new(),
            list_max_results: None,
            url_ttl_secs: DEFAULT_URL_TTL_SECS,
        }
    }
}

impl AlbumConfig {
    /// Load configuration from `ALBUM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }

    /// Resize parameters derived from the output settings.
    #[must_use]
    pub const fn resize_options(&self) -> ResizeOptions {
        ResizeOptions {
            max_dimension: self.max_dimension,
            format: self.output_format,
            quality: self.output_quality,
        }
    }

    #[must_use]
    pub const fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }

    /// Number of masonry columns for a viewport width.
    ///
    /// Uses the widest breakpoint not exceeding `viewport_width`, one column
    /// below every breakpoint.
    #[must_use]
    pub fn column_count(&self, viewport_width: u32) -> u32 {
        self.column_breakpoints
            .iter()
            .filter(|breakpoint| breakpoint.min_width <= viewport_width)
            .max_by_key(|breakpoint| breakpoint.min_width)
            .map_or(1, |breakpoint| breakpoint.columns)
    }
}

fn default_breakpoints() -> Vec<ColumnBreakpoint> {
    vec![
        ColumnBreakpoint {
            min_width: 750,
            columns: 2,
        },
        ColumnBreakpoint {
            min_width: 900,
            columns: 3,
        },
    ]
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<AlbumConfig> {
    let value = |key: &str| normalize_text_option(lookup(key));
    let defaults = AlbumConfig::default();

    let page_size = parse_or(value(ENV_PAGE_SIZE), ENV_PAGE_SIZE, defaults.page_size)?;
    let max_dimension = parse_or(
        value(ENV_MAX_DIMENSION),
        ENV_MAX_DIMENSION,
        defaults.max_dimension,
    )?;
    let output_format = parse_or(
        value(ENV_OUTPUT_FORMAT),
        ENV_OUTPUT_FORMAT,
        defaults.output_format,
    )?;
    let output_quality = parse_or(
        value(ENV_OUTPUT_QUALITY),
        ENV_OUTPUT_QUALITY,
        defaults.output_quality,
    )?;
    let max_selection = parse_or(
        value(ENV_MAX_SELECTION),
        ENV_MAX_SELECTION,
        defaults.max_selection,
    )?;
    let column_breakpoints = match value(ENV_COLUMN_BREAKPOINTS) {
        Some(raw) => parse_breakpoints(&raw)?,
        None => defaults.column_breakpoints,
    };
    let list_max_results = value(ENV_LIST_MAX_RESULTS)
        .map(|raw| parse_value::<usize>(&raw, ENV_LIST_MAX_RESULTS))
        .transpose()?;
    let url_ttl_secs = parse_or(
        value(ENV_URL_TTL_SECS),
        ENV_URL_TTL_SECS,
        defaults.url_ttl_secs,
    )?;

    if page_size == 0 {
        return Err(Error::Config(format!("{ENV_PAGE_SIZE} must be at least 1")));
    }
    if max_selection == 0 {
        return Err(Error::Config(format!(
            "{ENV_MAX_SELECTION} must be at least 1"
        )));
    }
    if max_dimension == 0 {
        return Err(Error::Config(format!(
            "{ENV_MAX_DIMENSION} must be at least 1"
        )));
    }
    if !(0.0..=1.0).contains(&output_quality) {
        return Err(Error::Config(format!(
            "{ENV_OUTPUT_QUALITY} must be between 0 and 1"
        )));
    }
    if list_max_results == Some(0) {
        return Err(Error::Config(format!(
            "{ENV_LIST_MAX_RESULTS} must be at least 1 when set"
        )));
    }

    Ok(AlbumConfig {
        page_size,
        max_dimension,
        output_format,
        output_quality,
        max_selection,
        column_breakpoints,
        gutter: value(ENV_GUTTER).unwrap_or(defaults.gutter),
        hero_heading: value(ENV_HERO_HEADING).unwrap_or(defaults.hero_heading),
        root_prefix: value(ENV_ROOT_PREFIX)
            .map(|prefix| prefix.trim_matches('/').to_string())
            .unwrap_or(defaults.root_prefix),
        list_max_results,
        url_ttl_secs,
    })
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, fallback: T) -> Result<T> {
    raw.map_or(Ok(fallback), |raw| parse_value(&raw, key))
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'")))
}

/// Parse `width:columns` pairs separated by commas, e.g. `750:2,900:3`.
fn parse_breakpoints(raw: &str) -> Result<Vec<ColumnBreakpoint>> {
    let mut breakpoints = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (width, columns) = entry.split_once(':').ok_or_else(|| {
                Error::Config(format!(
                    "{ENV_COLUMN_BREAKPOINTS} entry '{entry}' must look like WIDTH:COLUMNS"
                ))
            })?;
            let columns: u32 = parse_value(columns.trim(), ENV_COLUMN_BREAKPOINTS)?;
            if columns == 0 {
                return Err(Error::Config(format!(
                    "{ENV_COLUMN_BREAKPOINTS} entry '{entry}' needs at least one column"
                )));
            }
            Ok(ColumnBreakpoint {
                min_width: parse_value(width.trim(), ENV_COLUMN_BREAKPOINTS)?,
                columns,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    breakpoints.sort_by_key(|breakpoint| breakpoint.min_width);
    Ok(breakpoints)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<AlbumConfig> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn parse_config_without_values_uses_defaults() {
        let config = parse_from_map(&HashMap::new()).unwrap();
        assert_eq!(config, AlbumConfig::default());
        assert_eq!(config.page_size, 60);
        assert_eq!(config.url_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn parse_config_treats_blank_values_as_absent() {
        let mut map = HashMap::new();
        map.insert(ENV_PAGE_SIZE, "   ");
        map.insert(ENV_HERO_HEADING, "");

        let config = parse_from_map(&map).unwrap();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.hero_heading, DEFAULT_HERO_HEADING);
    }

    #[test]
    fn parse_config_reads_overrides() {
        let mut map = HashMap::new();
        map.insert(ENV_PAGE_SIZE, "24");
        map.insert(ENV_MAX_DIMENSION, "1280");
        map.insert(ENV_OUTPUT_FORMAT, "webp");
        map.insert(ENV_OUTPUT_QUALITY, "0.65");
        map.insert(ENV_MAX_SELECTION, "4");
        map.insert(ENV_COLUMN_BREAKPOINTS, "1200:4, 600:2");
        map.insert(ENV_ROOT_PREFIX, "/wedding/");
        map.insert(ENV_LIST_MAX_RESULTS, "500");

        let config = parse_from_map(&map).unwrap();
        assert_eq!(config.page_size, 24);
        assert_eq!(config.max_dimension, 1280);
        assert_eq!(config.output_format, OutputFormat::WebP);
        assert!((config.output_quality - 0.65).abs() < f32::EPSILON);
        assert_eq!(config.max_selection, 4);
        assert_eq!(
            config.column_breakpoints,
            vec![
                ColumnBreakpoint {
                    min_width: 600,
                    columns: 2
                },
                ColumnBreakpoint {
                    min_width: 1200,
                    columns: 4
                },
            ]
        );
        assert_eq!(config.root_prefix, "wedding");
        assert_eq!(config.list_max_results, Some(500));
    }

    #[test]
    fn parse_config_rejects_malformed_numbers() {
        let mut map = HashMap::new();
        map.insert(ENV_PAGE_SIZE, "sixty");

        let err = parse_from_map(&map).unwrap_err();
        match err {
            Error::Config(message) => assert!(message.contains(ENV_PAGE_SIZE)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_config_rejects_out_of_range_values() {
        for (key, raw) in [
            (ENV_PAGE_SIZE, "0"),
            (ENV_MAX_SELECTION, "0"),
            (ENV_OUTPUT_QUALITY, "1.5"),
            (ENV_LIST_MAX_RESULTS, "0"),
        ] {
            let mut map = HashMap::new();
            map.insert(key, raw);
            assert!(parse_from_map(&map).is_err(), "{key}={raw} should fail");
        }
    }

    #[test]
    fn parse_breakpoints_rejects_missing_separator() {
        assert!(parse_breakpoints("750").is_err());
        assert!(parse_breakpoints("750:0").is_err());
    }

    #[test]
    fn column_count_uses_widest_matching_breakpoint() {
        let config = AlbumConfig::default();
        assert_eq!(config.column_count(320), 1);
        assert_eq!(config.column_count(750), 2);
        assert_eq!(config.column_count(899), 2);
        assert_eq!(config.column_count(1440), 3);
    }

    #[test]
    fn resize_options_follow_output_settings() {
        let config = AlbumConfig {
            max_dimension: 800,
            output_format: OutputFormat::Png,
            ..AlbumConfig::default()
        };
        let options = config.resize_options();
        assert_eq!(options.max_dimension, 800);
        assert_eq!(options.format, OutputFormat::Png);
    }
}

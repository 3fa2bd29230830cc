// Library exports for chartdispatch

pub mod data;
pub mod error;
pub mod graph;
pub mod ir;

// Dispatch core
pub mod aggregate;
pub mod classify;
pub mod dispatch;
pub mod encode;
pub mod resolve;

pub use dispatch::{ColumnOutcome, DispatchEngine};
pub use error::VizError;
pub use ir::{ChartDescriptor, ChartKind, ColumnType, Payload, SeriesKind};

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: OutputFormat::Png,
        }
    }
}

impl RenderOptions {
    /// Read options from a JSON file, e.g. `{"width": 1024, "type": "svg"}`
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read render options '{}'", path.display()))?;
        let options: RenderOptions = serde_json::from_str(&text)
            .with_context(|| format!("Invalid render options in '{}'", path.display()))?;
        if options.width == 0 || options.height == 0 {
            anyhow::bail!("Render width and height must be non-zero");
        }
        if options.width > graph::MAX_DIMENSION || options.height > graph::MAX_DIMENSION {
            anyhow::bail!(
                "Render width and height must be at most {} pixels",
                graph::MAX_DIMENSION
            );
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_options_defaults_fill_gaps() {
        let options: RenderOptions = serde_json::from_str(r#"{"type": "svg"}"#).unwrap();
        assert_eq!(options.width, 800);
        assert_eq!(options.height, 600);
        assert_eq!(options.format, OutputFormat::Svg);
    }

    #[test]
    fn test_options_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"width": 1024, "height": 768}}"#).unwrap();
        let options = RenderOptions::from_path(file.path()).unwrap();
        assert_eq!(options.width, 1024);
        assert_eq!(options.format, OutputFormat::Png);
    }

    #[test]
    fn test_options_reject_zero_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"width": 0}}"#).unwrap();
        assert!(RenderOptions::from_path(file.path()).is_err());
    }

    #[test]
    fn test_options_reject_huge_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"width": 40000, "height": 40000}}"#).unwrap();
        let err = RenderOptions::from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("at most"));
    }
}

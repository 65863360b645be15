//! Shared configuration loader for vimscan.
//!
//! `defaults/scan.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`ScanConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use vimscan::highlighting::{ReaderOptions, ScanOptions, WriterOptions};

const DEFAULT_TOML: &str = include_str!("../defaults/scan.default.toml");

/// Top-level configuration consumed by vimscan applications.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
    pub output: OutputConfig,
}

/// Mirrors [`ReaderOptions`].
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    pub window_size: usize,
    pub safety_margin: usize,
    pub prefetch_depth: usize,
    pub strip_indentation: bool,
    pub trim_trailing_whitespace: bool,
}

/// Mirrors [`WriterOptions`].
#[derive(Debug, Clone, Deserialize)]
pub struct WriterConfig {
    pub flush_threshold: usize,
    pub flush_holdback: usize,
    pub asynchronous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub line_numbers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Html,
    Plain,
    /// The highlight spans as JSON.
    Tokens,
}

impl ScanConfig {
    /// The engine options this configuration describes.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            reader: ReaderOptions {
                window_size: self.reader.window_size,
                safety_margin: self.reader.safety_margin,
                prefetch_depth: self.reader.prefetch_depth,
                strip_indentation: self.reader.strip_indentation,
                trim_trailing_whitespace: self.reader.trim_trailing_whitespace,
            },
            writer: WriterOptions {
                flush_threshold: self.writer.flush_threshold,
                flush_holdback: self.writer.flush_holdback,
                asynchronous: self.writer.asynchronous,
            },
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<ScanConfig, ConfigError> {
        let config: ScanConfig = self.builder.build()?.try_deserialize()?;
        config
            .scan_options()
            .reader
            .validate()
            .map_err(|err| ConfigError::Message(err.to_string()))?;
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<ScanConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_engine_defaults() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.scan_options(), ScanOptions::default());
        assert_eq!(config.output.format, OutputFormat::Html);
        assert!(!config.output.line_numbers);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("output.format", "tokens")
            .expect("override to apply")
            .set_override("writer.asynchronous", false)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.output.format, OutputFormat::Tokens);
        assert!(!config.scan_options().writer.asynchronous);
    }

    #[test]
    fn rejects_a_margin_as_large_as_the_window() {
        let err = Loader::new()
            .set_override("reader.window_size", 1024_i64)
            .expect("override to apply")
            .set_override("reader.safety_margin", 1024_i64)
            .expect("override to apply")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("smaller than the window size"));
    }

    #[test]
    fn files_layer_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[reader]\nwindow_size = 1024\nstrip_indentation = true").unwrap();

        let config = Loader::new().with_file(&path).build().unwrap();
        assert_eq!(config.reader.window_size, 1024);
        assert!(config.reader.strip_indentation);
        assert_eq!(config.reader.safety_margin, 2048);

        let missing = Loader::new()
            .with_optional_file(dir.path().join("absent.toml"))
            .build()
            .unwrap();
        assert_eq!(missing.reader.window_size, 32768);
    }
}

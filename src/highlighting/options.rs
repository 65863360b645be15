//! Tuning knobs for a scan
//!
//!     The defaults here are the same values shipped in `vimscan-config`'s embedded TOML.

use super::error::ScanError;

/// How input text is cut into windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Bytes read from the source per window.
    pub window_size: usize,
    /// Bytes at the end of each window repeated at the start of the next one.
    pub safety_margin: usize,
    /// Windows read ahead by the prefetch worker.
    pub prefetch_depth: usize,
    /// Remove the leading whitespace shared by every non-blank line.
    pub strip_indentation: bool,
    pub trim_trailing_whitespace: bool,
}

impl ReaderOptions {
    /// The margin repeated between windows has to leave room for new text.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.safety_margin >= self.window_size {
            return Err(ScanError::MarginNotBelowWindow {
                safety_margin: self.safety_margin,
                window_size: self.window_size,
            });
        }
        Ok(())
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            window_size: 32768,
            safety_margin: 2048,
            prefetch_depth: 3,
            strip_indentation: false,
            trim_trailing_whitespace: false,
        }
    }
}

/// How highlight tokens travel to the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Pending tokens that trigger a flush.
    pub flush_threshold: usize,
    /// Tokens this close to the cursor stay behind, a later match may still rewrite them.
    pub flush_holdback: usize,
    /// Flush on a worker thread instead of inline.
    pub asynchronous: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            flush_threshold: 4096,
            flush_holdback: 16,
            asynchronous: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub reader: ReaderOptions,
    pub writer: WriterOptions,
}

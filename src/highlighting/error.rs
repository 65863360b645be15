//! Error types for definition building and scanning
//!
//!     Definition errors are configuration mistakes and surface from the builder or from
//!     [`finish`](super::definition::SyntaxDefinitionBuilder::finish), before any input is
//!     scanned. Scan errors are either stream failures or broken invariants inside the
//!     engine; both abort the scan in progress.
//!
//!     A pattern that fails to match, or a oneline region whose end is not on the current
//!     line, is ordinary control flow and never shows up here.

use thiserror::Error;

/// Errors raised while building or freezing a syntax definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("invalid pattern /{pattern}/: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("invalid offset '{0}'")]
    InvalidOffset(String),

    /// A match-start offset relative to the match start must not move it backwards.
    #[error("pattern /{pattern}/ has a match-start offset that moves the match start backwards")]
    NegativeMatchStart { pattern: String },

    #[error("region in group '{group}' has {starts} start patterns and {ends} end patterns")]
    EmptyRegion {
        group: String,
        starts: usize,
        ends: usize,
    },

    #[error("start pattern /{pattern}/ references an external capture")]
    ExternalReferenceInStart { pattern: String },

    #[error("cluster name '{0}' does not start with '@'")]
    InvalidClusterName(String),

    #[error("unknown cluster '{0}'")]
    UnknownCluster(String),

    #[error("context '{0}' already exists")]
    DuplicateContext(String),

    #[error("unknown context '{0}'")]
    UnknownContext(String),

    #[error("highlight link chain starting at group '{0}' is circular")]
    CircularHighlightLink(String),

    #[error("invalid character list '{0}'")]
    InvalidCharList(String),
}

/// Errors raised while scanning input.
#[derive(Debug, Error)]
pub enum ScanError {
    /// More than a window's worth of text arrived without a single line terminator.
    #[error("{read} bytes have been read (starting at position {position}) with no end of line seen")]
    NoLineEnd { read: usize, position: usize },

    #[error("the input window queue is exhausted although the last window has already been read")]
    WindowQueueExhausted,

    #[error("attempt to move to position {pos} but the current window covers {start} to {end}")]
    PositionOutOfWindow { pos: usize, start: usize, end: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("the {0} worker panicked")]
    WorkerPanicked(&'static str),

    #[error("safety margin {safety_margin} must be smaller than the window size {window_size}")]
    MarginNotBelowWindow { safety_margin: usize, window_size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_piece() {
        let err = DefinitionError::EmptyRegion {
            group: "STRING".to_string(),
            starts: 1,
            ends: 0,
        };
        assert_eq!(
            err.to_string(),
            "region in group 'STRING' has 1 start patterns and 0 end patterns"
        );

        let err = ScanError::NoLineEnd {
            read: 40,
            position: 0,
        };
        assert!(err.to_string().contains("no end of line"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: ScanError = io.into();
        assert!(matches!(err, ScanError::Io(_)));
    }
}

//! Vim-style syntax highlighting
//!
//!     A [`SyntaxDefinition`] is built once, with [`SyntaxDefinitionBuilder`] or from a
//!     [`SyntaxFile`], and shared between any number of [`Scanner`]s. A scanner reads text,
//!     works out which syntax item covers every character, and drives a [`Formatter`] with
//!     the text and the resulting [`HighlightMode`] changes.
//!
//!     Building
//!
//!         builder     groups, links, keywords, matches, regions, clusters, contexts
//!         finish()    validation, cluster resolution, interned item sets
//!
//!     Scanning
//!
//!         reader      input -> overlapping, normalized windows (prefetched for streams)
//!         scanner     windows -> scope stack -> mode change tokens
//!         writer      tokens + windows -> formatter calls
//!
//!     Errors in a definition are reported before any text is scanned. Scan errors are I/O
//!     failures or broken engine invariants and abort the scan.

pub mod charlist;
pub mod cluster;
pub mod context;
pub mod definition;
pub mod error;
pub mod formatter;
pub mod group;
pub mod item;
pub mod item_set;
pub mod keyword;
pub mod match_result;
pub mod mode;
pub mod options;
pub mod pattern;
pub mod reader;
pub mod region;
pub mod scanner;
pub mod schema;
mod scope;
mod writer;

pub use definition::{SyntaxDefinition, SyntaxDefinitionBuilder};
pub use error::{DefinitionError, ScanError};
pub use formatter::{Formatter, FormatterEvent, HtmlFormatter, PlainFormatter, RecordingFormatter, Span};
pub use item::{ItemId, ItemOptions};
pub use mode::{HighlightMode, ModeChange};
pub use options::{ReaderOptions, ScanOptions, WriterOptions};
pub use pattern::{OffsetKind, Pattern, PatternOffset, Whence};
pub use region::Region;
pub use scanner::Scanner;
pub use schema::{SchemaError, SyntaxFile};

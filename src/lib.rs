//! # vimscan
//!
//! A streaming syntax highlighter that follows Vim's `:syntax` matching rules: keywords,
//! matches and nestable regions, with clusters, contexts, `nextgroup` chains, `keepend`
//! and `extend`.
//!
//! ```text
//! let definition = Arc::new(SyntaxFile::from_path("c.yaml")?.build()?);
//! let mut scanner = Scanner::new(definition);
//! scanner.scan(File::open("main.c")?, &mut HtmlFormatter::new(io::stdout()))?;
//! ```

pub mod highlighting;

pub use highlighting::{
    DefinitionError, Formatter, HighlightMode, HtmlFormatter, ItemOptions, Pattern,
    PlainFormatter, RecordingFormatter, Region, ScanError, ScanOptions, Scanner,
    SyntaxDefinition, SyntaxDefinitionBuilder, SyntaxFile,
};

//! Highlight modes
//!
//!     A highlight mode is the final "color" a run of text receives. The set is closed and
//!     matches the standard highlight groups every Vim colorscheme knows about. Syntax groups
//!     with other names reach one of these modes through highlight links, or fall back to
//!     [`HighlightMode::Normal`].

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! highlight_modes {
    ($($variant:ident => $css:literal),+ $(,)?) => {
        /// The closed set of modes a formatter is asked to render.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum HighlightMode {
            $($variant),+
        }

        impl HighlightMode {
            /// Every mode, in declaration order.
            pub const ALL: &'static [HighlightMode] = &[$(HighlightMode::$variant),+];

            /// The canonical group name, e.g. `"SpecialChar"`.
            pub fn name(self) -> &'static str {
                match self {
                    $(HighlightMode::$variant => stringify!($variant)),+
                }
            }

            /// CSS class used by the HTML formatter.
            pub fn css_class(self) -> &'static str {
                match self {
                    $(HighlightMode::$variant => $css),+
                }
            }
        }
    };
}

highlight_modes! {
    Normal => "normal",
    Comment => "comment",
    Constant => "constant",
    String => "string",
    Character => "character",
    Number => "number",
    Boolean => "boolean",
    Float => "float",
    Identifier => "identifier",
    Function => "function",
    Statement => "statement",
    Conditional => "conditional",
    Repeat => "repeat",
    Label => "label",
    Operator => "operator",
    Keyword => "keyword",
    Exception => "exception",
    PreProc => "preproc",
    Include => "include",
    Define => "define",
    Macro => "macro",
    PreCondit => "precondit",
    Type => "type",
    StorageClass => "storage-class",
    Structure => "structure",
    Typedef => "typedef",
    Special => "special",
    SpecialChar => "special-char",
    Tag => "tag",
    Delimiter => "delimiter",
    SpecialComment => "special-comment",
    Debug => "debug",
    Underlined => "underlined",
    Ignore => "ignore",
    Error => "error",
    Todo => "todo",
}

impl HighlightMode {
    /// Case-insensitive lookup of a standard group name.
    pub fn from_name(name: &str) -> Option<HighlightMode> {
        HighlightMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }
}

impl Default for HighlightMode {
    fn default() -> Self {
        HighlightMode::Normal
    }
}

impl fmt::Display for HighlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A mode transition: from `pos` onwards text is rendered in `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeChange {
    pub pos: usize,
    pub mode: HighlightMode,
}

impl ModeChange {
    pub fn new(pos: usize, mode: HighlightMode) -> Self {
        Self { pos, mode }
    }
}

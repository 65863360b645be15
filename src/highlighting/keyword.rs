//! Literal keywords
//!
//!     A keyword is a literal word, optionally with a tail that may be abbreviated:
//!     `fu[nction]` matches `fu`, `fun`, `func` and so on up to `function`. Whether case
//!     matters is decided per keyword, from the definition's `ignore_case` setting at the
//!     time the keyword was added.

/// One keyword, possibly with an optional suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    full: String,
    required_chars: usize,
    upper: String,
    ignore_case: bool,
}

impl Keyword {
    /// Parses `word` or `word[suffix]`. Text that isn't a well formed suffix form is literal.
    pub fn parse(text: &str, ignore_case: bool) -> Self {
        let (full, required_chars) = match text.strip_suffix(']').and_then(|t| t.split_once('[')) {
            Some((prefix, suffix)) if !prefix.is_empty() && !suffix.contains(['[', ']']) => {
                (format!("{prefix}{suffix}"), prefix.chars().count())
            }
            _ => (text.to_string(), text.chars().count()),
        };

        Self {
            upper: full.to_uppercase(),
            full,
            required_chars,
            ignore_case,
        }
    }

    /// The longest form of the keyword.
    pub fn name(&self) -> &str {
        &self.full
    }

    /// Upper-cased longest form, the key keywords are sorted by.
    pub fn upper_name(&self) -> &str {
        &self.upper
    }

    pub fn ignores_case(&self) -> bool {
        self.ignore_case
    }

    /// True for keywords with an optional suffix.
    pub fn allows_partial(&self) -> bool {
        self.required_chars < self.full.chars().count()
    }

    pub fn is_match(&self, word: &str) -> bool {
        let len = word.chars().count();
        if len < self.required_chars || len > self.full.chars().count() {
            return false;
        }

        word.chars().zip(self.full.chars()).all(|(a, b)| {
            a == b || (self.ignore_case && a.to_uppercase().eq(b.to_uppercase()))
        })
    }
}

//! Keyword character classes
//!
//!     Vim decides what a "word" is through the `iskeyword` option, a comma separated list of
//!     character specs:
//!
//!         @           ASCII letters
//!         @-@         the '@' character itself
//!         48-57       a range of character codes
//!         a-z         a range of literal characters
//!         _           a single literal character
//!         ^x          removes characters instead of adding them
//!
//!     The list is tokenized with logos and applied to a 256 entry table. Characters at or
//!     below the space character and characters above 255 are never keyword characters.

use super::error::DefinitionError;
use logos::Logos;

/// The default `iskeyword` value.
pub const STANDARD_KEYWORD_CHARS: &str = "@,48-57,_,192-255";

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum CharListToken {
    #[token(",")]
    Comma,

    #[token("^")]
    Caret,

    #[token("-")]
    Dash,

    #[token("@")]
    At,

    #[regex("[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
    Code(u32),

    #[regex(r"[^0-9,\^\-@]", |lex| lex.slice().chars().next())]
    Literal(char),
}

/// What a single element of a character spec stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Atom {
    Letters,
    Char(u32),
}

/// Table of characters that make up keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordChars {
    table: [bool; 256],
}

impl KeywordChars {
    /// A table with no keyword characters at all.
    pub fn empty() -> Self {
        Self {
            table: [false; 256],
        }
    }

    /// Vim's default: letters, digits, underscore and the upper half of Latin-1.
    pub fn standard() -> Self {
        let mut chars = Self::empty();
        for c in b'a'..=b'z' {
            chars.table[c as usize] = true;
            chars.table[c.to_ascii_uppercase() as usize] = true;
        }
        for c in b'0'..=b'9' {
            chars.table[c as usize] = true;
        }
        chars.table[b'_' as usize] = true;
        for c in 192..=255 {
            chars.table[c] = true;
        }
        chars
    }

    pub fn parse(list: &str) -> Result<Self, DefinitionError> {
        let mut chars = Self::empty();
        chars.add(list)?;
        Ok(chars)
    }

    /// Applies a character list on top of the current table.
    pub fn add(&mut self, list: &str) -> Result<(), DefinitionError> {
        let invalid = || DefinitionError::InvalidCharList(list.to_string());

        let mut tokens = Vec::new();
        for token in CharListToken::lexer(list) {
            tokens.push(token.map_err(|_| invalid())?);
        }

        for part in tokens.split(|t| *t == CharListToken::Comma) {
            if part.is_empty() {
                continue;
            }
            self.apply_part(part).ok_or_else(invalid)?;
        }

        Ok(())
    }

    pub fn contains(&self, c: char) -> bool {
        let code = c as u32;
        if code <= ' ' as u32 || code > 255 {
            return false;
        }
        self.table[code as usize]
    }

    fn apply_part(&mut self, part: &[CharListToken]) -> Option<()> {
        use CharListToken::*;

        let (exclude, rest) = match part {
            [Caret] => (false, part),
            [Caret, rest @ ..] => (true, rest),
            _ => (false, part),
        };

        let (low, high) = match rest {
            [Caret] => (Atom::Char('^' as u32), None),
            [Dash] => (Atom::Char('-' as u32), None),
            [single] => (atom(*single)?, None),
            [At, Dash, At] => (Atom::Char('@' as u32), None),
            [from, Dash, to] => (atom(*from)?, Some(atom(*to)?)),
            _ => return None,
        };

        match (low, high) {
            (Atom::Letters, None) => {
                for c in b'a'..=b'z' {
                    self.set(c as u32, !exclude);
                    self.set(c.to_ascii_uppercase() as u32, !exclude);
                }
            }
            (Atom::Char(c), None) => self.set(c, !exclude),
            (Atom::Char(from), Some(Atom::Char(to))) if from <= to => {
                for c in from..=to {
                    self.set(c, !exclude);
                }
            }
            _ => return None,
        }

        Some(())
    }

    fn set(&mut self, code: u32, value: bool) {
        if let Some(slot) = self.table.get_mut(code as usize) {
            *slot = value;
        }
    }
}

impl Default for KeywordChars {
    fn default() -> Self {
        Self::standard()
    }
}

fn atom(token: CharListToken) -> Option<Atom> {
    match token {
        CharListToken::At => Some(Atom::Letters),
        CharListToken::Code(code) => Some(Atom::Char(code)),
        CharListToken::Literal(c) => Some(Atom::Char(c as u32)),
        CharListToken::Caret => Some(Atom::Char('^' as u32)),
        CharListToken::Dash | CharListToken::Comma => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_matches_the_vim_default_list() {
        let parsed = KeywordChars::parse(STANDARD_KEYWORD_CHARS).unwrap();
        assert_eq!(parsed, KeywordChars::standard());
    }

    #[test]
    fn standard_classification() {
        let chars = KeywordChars::standard();
        assert!(chars.contains('a'));
        assert!(chars.contains('Z'));
        assert!(chars.contains('7'));
        assert!(chars.contains('_'));
        assert!(chars.contains('é'));
        assert!(!chars.contains('-'));
        assert!(!chars.contains(' '));
        assert!(!chars.contains('\n'));
        assert!(!chars.contains('λ'));
    }

    #[test]
    fn literal_ranges_and_exclusions() {
        let mut chars = KeywordChars::parse("a-c,-").unwrap();
        assert!(chars.contains('b'));
        assert!(chars.contains('-'));
        assert!(!chars.contains('d'));

        chars.add("^b").unwrap();
        assert!(!chars.contains('b'));
        assert!(chars.contains('a'));
    }

    #[test]
    fn at_sign_itself() {
        let chars = KeywordChars::parse("@-@").unwrap();
        assert!(chars.contains('@'));
        assert!(!chars.contains('a'));
    }

    #[test]
    fn control_characters_never_count() {
        let chars = KeywordChars::parse("1-40").unwrap();
        assert!(!chars.contains('\t'));
        assert!(!chars.contains(' '));
        assert!(chars.contains('!'));
    }

    #[test]
    fn rejects_malformed_lists() {
        assert!(KeywordChars::parse("z-a").is_err());
        assert!(KeywordChars::parse("a-").is_err());
        assert!(KeywordChars::parse("a-b-c").is_err());
    }
}

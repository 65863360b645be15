//! Patterns and pattern offsets
//!
//!     A pattern is one regular expression plus the Vim offsets that adjust where its match
//!     starts and ends, where highlighting starts and ends, and where the body of a region
//!     starts and ends:
//!
//!         ms  me      match start / end
//!         hs  he      highlight start / end
//!         rs  re      region body start / end
//!         lc          leading context
//!
//!     Each offset is relative to the start (`s`) or the end (`e`) of the raw match and
//!     counts characters. Which offsets take effect depends on the event the pattern is
//!     used for; see [`MatchEvent::applies`].
//!
//!     Expressions use the `regex` syntax, compiled with `regex-automata` in multi-line mode
//!     so `^` and `$` anchor at line boundaries. Two conventions stand in for Vim atoms:
//!     empty groups named `zs`/`ze` move the raw match start/end, and a region start may
//!     capture `z1`..`z9` for its end and skip patterns to reference as `\z1`..`\z9`.

use super::error::DefinitionError;
use super::match_result::{ExternalCaptures, MatchResult};
use super::mode::HighlightMode;
use super::reader::InputWindow;
use once_cell::sync::Lazy;
use regex::Regex;
use regex_automata::util::captures::Captures;
use regex_automata::util::syntax;
use regex_automata::{meta, Anchored, Input, PatternID};

static OFFSET_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<what>\w\w)=(?P<whence>[se])?(?P<displacement>[+-]?\d+)?$").unwrap()
});

static EXTERNAL_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\z([1-9])").unwrap());

const EXTERNAL_GROUPS: [&str; 9] = ["z1", "z2", "z3", "z4", "z5", "z6", "z7", "z8", "z9"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetKind {
    MatchStart,
    MatchEnd,
    HighlightStart,
    HighlightEnd,
    RegionStart,
    RegionEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOffset {
    pub kind: OffsetKind,
    pub whence: Whence,
    pub displacement: i32,
}

impl PatternOffset {
    pub fn new(kind: OffsetKind, whence: Whence, displacement: i32) -> Self {
        Self {
            kind,
            whence,
            displacement,
        }
    }

    fn resolve(&self, window: &InputWindow, raw_start: usize, raw_end: usize) -> usize {
        let base = match self.whence {
            Whence::Start => raw_start,
            Whence::End => raw_end,
        };
        window.offset_chars(base, self.displacement)
    }

    /// Like [`resolve`](Self::resolve), without clamping to the window start.
    fn resolve_unclamped(
        &self,
        window: &InputWindow,
        raw_start: usize,
        raw_end: usize,
    ) -> Option<usize> {
        if self.displacement >= 0 {
            return Some(self.resolve(window, raw_start, raw_end));
        }
        let base = match self.whence {
            Whence::Start => raw_start,
            Whence::End => raw_end,
        };
        window.back_chars(base, self.displacement.unsigned_abs())
    }
}

/// What a pattern is being used for when it is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    Match,
    RegionStart,
    RegionSkip,
    RegionEnd,
}

impl MatchEvent {
    /// Offsets that take effect for this event, the rest are ignored.
    pub fn applies(self, kind: OffsetKind) -> bool {
        use OffsetKind::*;
        match self {
            MatchEvent::Match => matches!(kind, MatchStart | MatchEnd | HighlightStart | HighlightEnd),
            MatchEvent::RegionStart => matches!(kind, MatchStart | HighlightStart | RegionStart),
            MatchEvent::RegionSkip => matches!(kind, MatchEnd),
            MatchEvent::RegionEnd => matches!(kind, MatchEnd | HighlightEnd | RegionEnd),
        }
    }
}

/// Offsets parsed from Vim's textual form, e.g. `ms=s+1,he=e-1,lc=2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetSpec {
    pub offsets: Vec<PatternOffset>,
    pub leading_context: usize,
}

impl OffsetSpec {
    pub fn parse(text: &str) -> Result<Self, DefinitionError> {
        let mut spec = OffsetSpec::default();

        for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let invalid = || DefinitionError::InvalidOffset(part.to_string());
            let caps = OFFSET_SPEC.captures(part).ok_or_else(invalid)?;

            let displacement = match caps.name("displacement") {
                Some(m) => m.as_str().parse::<i32>().map_err(|_| invalid())?,
                None => 0,
            };

            let what = &caps["what"];
            if what == "lc" {
                if displacement <= 0 {
                    return Err(invalid());
                }
                spec.leading_context = displacement as usize;
                continue;
            }

            let kind = match what {
                "ms" => OffsetKind::MatchStart,
                "me" => OffsetKind::MatchEnd,
                "hs" => OffsetKind::HighlightStart,
                "he" => OffsetKind::HighlightEnd,
                "rs" => OffsetKind::RegionStart,
                "re" => OffsetKind::RegionEnd,
                _ => return Err(invalid()),
            };
            let whence = match caps.name("whence").map(|m| m.as_str()) {
                Some("s") => Whence::Start,
                _ => Whence::End,
            };

            spec.offsets.push(PatternOffset::new(kind, whence, displacement));
        }

        Ok(spec)
    }
}

/// A regular expression plus its offsets.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    /// `None` while the source references external captures; those compile per scope.
    regex: Option<meta::Regex>,
    offsets: Vec<PatternOffset>,
    leading_context: usize,
    eat_newline: bool,
    matchgroup: Option<String>,
    highlight_mode: Option<HighlightMode>,
    captures_externals: bool,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Result<Self, DefinitionError> {
        let source = source.into();
        let eat_newline = ends_with_line_end_anchor(&source);

        let (regex, captures_externals) = if EXTERNAL_REF.is_match(&source) {
            compile(&substitute_externals(&source, &ExternalCaptures::default()))?;
            (None, false)
        } else {
            let regex = compile(&source)?;
            let captures_externals = regex
                .group_info()
                .pattern_names(PatternID::ZERO)
                .flatten()
                .any(|name| EXTERNAL_GROUPS.contains(&name));
            (Some(regex), captures_externals)
        };

        Ok(Self {
            source,
            regex,
            offsets: Vec::new(),
            leading_context: 0,
            eat_newline,
            matchgroup: None,
            highlight_mode: None,
            captures_externals,
        })
    }

    /// Adds offsets written the way Vim writes them.
    pub fn with_offsets(mut self, spec: &str) -> Result<Self, DefinitionError> {
        let spec = OffsetSpec::parse(spec)?;
        self.offsets.extend(spec.offsets);
        if spec.leading_context > 0 {
            self.leading_context = spec.leading_context;
        }
        Ok(self)
    }

    pub fn with_offset(mut self, offset: PatternOffset) -> Self {
        self.offsets.push(offset);
        self
    }

    pub fn with_leading_context(mut self, chars: usize) -> Self {
        self.leading_context = chars;
        self
    }

    /// Highlights the text this pattern matches with the given group instead of the item's.
    pub fn with_matchgroup(mut self, group: impl Into<String>) -> Self {
        self.matchgroup = Some(group.into());
        self
    }

    /// `excludenl`: a trailing `$` no longer makes the pattern eat the line end.
    pub fn exclude_newline(mut self) -> Self {
        self.eat_newline = false;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn offsets(&self) -> &[PatternOffset] {
        &self.offsets
    }

    pub fn leading_context(&self) -> usize {
        self.leading_context
    }

    pub fn eats_newline(&self) -> bool {
        self.eat_newline
    }

    pub fn matchgroup(&self) -> Option<&str> {
        self.matchgroup.as_deref()
    }

    /// Mode of the matchgroup, known once the definition is finished.
    pub fn highlight_mode(&self) -> Option<HighlightMode> {
        self.highlight_mode
    }

    pub fn has_external_refs(&self) -> bool {
        self.regex.is_none()
    }

    pub fn captures_externals(&self) -> bool {
        self.captures_externals
    }

    pub(crate) fn set_highlight_mode(&mut self, mode: HighlightMode) {
        self.highlight_mode = Some(mode);
    }

    pub(crate) fn validate(&self) -> Result<(), DefinitionError> {
        let backwards = self.offsets.iter().any(|o| {
            o.kind == OffsetKind::MatchStart && o.whence == Whence::Start && o.displacement < 0
        });
        if backwards {
            return Err(DefinitionError::NegativeMatchStart {
                pattern: self.source.clone(),
            });
        }
        Ok(())
    }

    /// Compiles this pattern with `\zN` replaced by the literal text a region start captured.
    pub(crate) fn resolve_externals(
        &self,
        captures: &ExternalCaptures,
    ) -> Result<meta::Regex, DefinitionError> {
        compile(&substitute_externals(&self.source, captures))
    }

    /// Tries the pattern anchored at `pos`, or `leading_context` characters before it.
    ///
    /// `resolved` replaces the pattern's own expression, for patterns with external references.
    pub(crate) fn probe(
        &self,
        window: &InputWindow,
        pos: usize,
        event: MatchEvent,
        resolved: Option<&meta::Regex>,
    ) -> Option<MatchResult> {
        let regex = resolved.or(self.regex.as_ref())?;

        let probe_at = if self.leading_context > 0 {
            let back = -(self.leading_context.min(i32::MAX as usize) as i32);
            let at = window.offset_chars(pos, back);
            if window.offset_chars(at, self.leading_context as i32) != pos || at == pos {
                return None;
            }
            at
        } else {
            pos
        };

        let hay = window.text();
        let input = Input::new(hay)
            .span(window.relative(probe_at)..hay.len())
            .anchored(Anchored::Yes);
        let mut caps = regex.create_captures();
        regex.search_captures(&input, &mut caps);
        if !caps.is_match() {
            return None;
        }

        self.result_from_captures(window, pos, &caps, event)
    }

    /// Turns a regex hit into a [`MatchResult`], applying this pattern's offsets.
    ///
    /// Fails when an offset would move the match start before the raw match start.
    pub(crate) fn result_from_captures(
        &self,
        window: &InputWindow,
        pos: usize,
        caps: &Captures,
        event: MatchEvent,
    ) -> Option<MatchResult> {
        let span = caps.get_match()?.span();
        let base = window.start();

        let mut raw_start = base + span.start;
        let mut raw_end = base + span.end;
        if let Some(zs) = caps.get_group_by_name("zs") {
            raw_start = base + zs.start;
        }
        if let Some(ze) = caps.get_group_by_name("ze") {
            raw_end = base + ze.start;
        }
        if self.leading_context > 0 {
            raw_start = raw_start.max(pos);
        }
        raw_end = raw_end.max(raw_start);

        let mut result = MatchResult {
            pos_matched_at: pos,
            pos_match_start: raw_start,
            pos_after_match: raw_end,
            ..MatchResult::default()
        };

        for offset in self.offsets.iter().filter(|o| event.applies(o.kind)) {
            let value = || offset.resolve(window, raw_start, raw_end);
            match offset.kind {
                OffsetKind::MatchStart => {
                    result.pos_match_start = offset
                        .resolve_unclamped(window, raw_start, raw_end)
                        .filter(|start| *start >= raw_start)?;
                }
                OffsetKind::MatchEnd => result.pos_after_match = value(),
                OffsetKind::HighlightStart => result.pos_highlight_start = Some(value()),
                OffsetKind::HighlightEnd => result.pos_after_highlight = Some(value()),
                OffsetKind::RegionStart => result.pos_region_start = Some(value()),
                OffsetKind::RegionEnd => result.pos_after_region = Some(value()),
            }
        }

        if event == MatchEvent::RegionStart && self.captures_externals {
            let hay = window.text();
            let captured = EXTERNAL_GROUPS
                .iter()
                .map(|name| {
                    caps.get_group_by_name(name)
                        .and_then(|sp| hay.get(sp.range()))
                        .map(str::to_string)
                })
                .collect();
            result.external_captures = ExternalCaptures::new(captured);
        }

        result.do_limit_checks();
        Some(result)
    }
}

pub(crate) fn compile(source: &str) -> Result<meta::Regex, DefinitionError> {
    compile_many(&[source])
}

/// One expression holding several patterns; pattern `i` of the result is `sources[i]`.
pub(crate) fn compile_many(sources: &[&str]) -> Result<meta::Regex, DefinitionError> {
    meta::Regex::builder()
        .syntax(syntax::Config::new().multi_line(true))
        .build_many(sources)
        .map_err(|err| DefinitionError::InvalidPattern {
            pattern: sources.join("|"),
            message: err.to_string(),
        })
}

fn substitute_externals(source: &str, captures: &ExternalCaptures) -> String {
    EXTERNAL_REF
        .replace_all(source, |caps: &regex::Captures| {
            let n = caps[1].parse::<usize>().unwrap_or(0);
            regex::escape(captures.get(n).unwrap_or(""))
        })
        .into_owned()
}

/// A pattern ending in an unescaped `$` eats the line end that follows its match.
fn ends_with_line_end_anchor(source: &str) -> bool {
    let Some(body) = source.strip_suffix('$') else {
        return false;
    };
    let backslashes = body.chars().rev().take_while(|c| *c == '\\').count();
    backslashes % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlighting::options::ReaderOptions;
    use crate::highlighting::reader::WindowedReader;

    fn window(text: &str) -> InputWindow {
        let reader = WindowedReader::from_str(text, &ReaderOptions::default()).unwrap();
        (**reader.window()).clone()
    }

    #[test]
    fn parses_vim_offsets() {
        let spec = OffsetSpec::parse("ms=s+1,he=e-1,lc=2,re=s").unwrap();
        assert_eq!(spec.leading_context, 2);
        assert_eq!(
            spec.offsets,
            vec![
                PatternOffset::new(OffsetKind::MatchStart, Whence::Start, 1),
                PatternOffset::new(OffsetKind::HighlightEnd, Whence::End, -1),
                PatternOffset::new(OffsetKind::RegionEnd, Whence::Start, 0),
            ]
        );
    }

    #[test]
    fn rejects_bad_offsets() {
        assert!(OffsetSpec::parse("xx=s+1").is_err());
        assert!(OffsetSpec::parse("lc=0").is_err());
        assert!(OffsetSpec::parse("ms").is_err());
    }

    #[test]
    fn probe_is_anchored() {
        let w = window("abc foo\n");
        let p = Pattern::new("foo").unwrap();
        assert!(p.probe(&w, 0, MatchEvent::Match, None).is_none());
        let hit = p.probe(&w, 4, MatchEvent::Match, None).unwrap();
        assert_eq!((hit.pos_match_start, hit.pos_after_match), (4, 7));
    }

    #[test]
    fn offsets_shift_highlight() {
        let w = window("\"quoted\"\n");
        let p = Pattern::new("\"[^\"]*\"")
            .unwrap()
            .with_offsets("hs=s+1,he=e-1")
            .unwrap();
        let hit = p.probe(&w, 0, MatchEvent::Match, None).unwrap();
        assert_eq!(hit.pos_highlight_start, Some(1));
        assert_eq!(hit.pos_after_highlight, Some(7));
        assert_eq!(hit.pos_after_match, 8);
    }

    #[test]
    fn offsets_outside_their_event_are_ignored() {
        let w = window("abcd\n");
        let p = Pattern::new("abcd").unwrap().with_offsets("rs=s+1,me=e-1").unwrap();
        let hit = p.probe(&w, 0, MatchEvent::RegionStart, None).unwrap();
        assert_eq!(hit.pos_region_start, Some(1));
        assert_eq!(hit.pos_after_match, 4);
    }

    #[test]
    fn match_start_may_not_move_backwards() {
        let w = window("abcd\n");
        let p = Pattern::new("ab").unwrap().with_offsets("ms=e-5").unwrap();
        assert!(p.validate().is_ok());
        assert!(p.probe(&w, 0, MatchEvent::Match, None).is_none());

        let p = Pattern::new("ab").unwrap().with_offsets("ms=s-1").unwrap();
        assert!(matches!(p.validate(), Err(DefinitionError::NegativeMatchStart { .. })));
    }

    #[test]
    fn match_start_rejection_does_not_depend_on_position() {
        let p = Pattern::new("ab").unwrap().with_offsets("ms=e-5").unwrap();
        assert!(p.probe(&window("ab rest\n"), 0, MatchEvent::Match, None).is_none());
        assert!(p
            .probe(&window("xxxxxxxx ab rest\n"), 9, MatchEvent::Match, None)
            .is_none());

        let p = Pattern::new("ab").unwrap().with_offsets("ms=e-1").unwrap();
        let hit = p.probe(&window("xx ab\n"), 3, MatchEvent::Match, None).unwrap();
        assert_eq!((hit.pos_match_start, hit.pos_after_match), (4, 5));
    }

    #[test]
    fn leading_context_looks_behind_the_cursor() {
        let w = window("a=b\n");
        let p = Pattern::new("=b").unwrap().with_offsets("lc=1").unwrap();
        assert!(p.probe(&w, 0, MatchEvent::Match, None).is_none());
        let hit = p.probe(&w, 2, MatchEvent::Match, None).unwrap();
        assert_eq!((hit.pos_match_start, hit.pos_after_match), (2, 3));
    }

    #[test]
    fn zs_and_ze_groups_bound_the_match() {
        let w = window("foobar\n");
        let p = Pattern::new("foo(?P<zs>)bar(?P<ze>)").unwrap();
        let hit = p.probe(&w, 0, MatchEvent::Match, None).unwrap();
        assert_eq!((hit.pos_match_start, hit.pos_after_match), (3, 6));
    }

    #[test]
    fn external_captures_feed_end_patterns() {
        let w = window("<<EOF\nbody\nEOF\n");
        let start = Pattern::new(r"<<(?P<z1>\w+)").unwrap();
        assert!(start.captures_externals());
        let hit = start.probe(&w, 0, MatchEvent::RegionStart, None).unwrap();
        assert_eq!(hit.external_captures.get(1), Some("EOF"));

        let end = Pattern::new(r"^\z1$").unwrap();
        assert!(end.has_external_refs());
        assert!(end.probe(&w, 11, MatchEvent::RegionEnd, None).is_none());

        let resolved = end.resolve_externals(&hit.external_captures).unwrap();
        let found = end
            .probe(&w, 11, MatchEvent::RegionEnd, Some(&resolved))
            .unwrap();
        assert_eq!(found.pos_after_match, 14);
    }

    #[test]
    fn trailing_dollar_eats_newline() {
        assert!(Pattern::new("foo$").unwrap().eats_newline());
        assert!(!Pattern::new(r"foo\$").unwrap().eats_newline());
        assert!(!Pattern::new("foo$").unwrap().exclude_newline().eats_newline());
    }

    #[test]
    fn invalid_expressions_are_definition_errors() {
        assert!(matches!(
            Pattern::new("(unclosed"),
            Err(DefinitionError::InvalidPattern { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn end_offsets_stay_inside_the_match(
            word in "[a-z]{1,8}",
            me in 0i32..10,
            he in 0i32..10,
            re in 0i32..10,
        ) {
            let w = window(&format!("  {} x\n", word));
            let offsets = format!("me=e-{},he=e-{},re=e-{}", me, he, re);
            let p = Pattern::new("[a-z]+").unwrap().with_offsets(&offsets).unwrap();

            let hit = p.probe(&w, 2, MatchEvent::RegionEnd, None).unwrap();
            let (low, high) = (hit.pos_match_start, hit.pos_after_match);
            proptest::prop_assert_eq!(low, 2);
            proptest::prop_assert!(low <= high && high <= 2 + word.len());
            for bound in [hit.pos_after_highlight, hit.pos_after_region].into_iter().flatten() {
                proptest::prop_assert!(low <= bound && bound <= high);
            }
        }
    }
}

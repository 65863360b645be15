//! Regions
//!
//!     A region opens where one of its start patterns matches and closes where one of its
//!     end patterns matches. Skip patterns hide text from the end patterns: an end that
//!     would match inside a skipped span is never seen.
//!
//!     End and skip patterns that reference text captured by the start pattern (`\z1`..`\z9`)
//!     are compiled once per opened region, see [`ResolvedPatterns`].

use super::match_result::{ExternalCaptures, MatchResult};
use super::pattern::{MatchEvent, Pattern};
use super::reader::InputWindow;
use regex_automata::meta;
use regex_automata::util::captures::Captures;
use tracing::warn;

/// The start, skip and end patterns of a region.
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub(crate) starts: Vec<Pattern>,
    pub(crate) skips: Vec<Pattern>,
    pub(crate) ends: Vec<Pattern>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, pattern: Pattern) -> Self {
        self.starts.push(pattern);
        self
    }

    pub fn skip(mut self, pattern: Pattern) -> Self {
        self.skips.push(pattern);
        self
    }

    pub fn end(mut self, pattern: Pattern) -> Self {
        self.ends.push(pattern);
        self
    }

    pub fn starts(&self) -> &[Pattern] {
        &self.starts
    }

    pub fn skips(&self) -> &[Pattern] {
        &self.skips
    }

    pub fn ends(&self) -> &[Pattern] {
        &self.ends
    }

    pub(crate) fn patterns_mut(&mut self) -> impl Iterator<Item = &mut Pattern> {
        self.starts
            .iter_mut()
            .chain(self.skips.iter_mut())
            .chain(self.ends.iter_mut())
    }

    pub fn has_matchgroup_end(&self) -> bool {
        self.ends.iter().any(|p| p.matchgroup().is_some())
    }

    fn has_deferred_patterns(&self) -> bool {
        self.skips
            .iter()
            .chain(self.ends.iter())
            .any(Pattern::has_external_refs)
    }

    /// Tries every start pattern at `pos`. A oneline region that finds no end on the
    /// current line gives up without trying its remaining start patterns.
    pub(crate) fn try_start(
        &self,
        window: &InputWindow,
        pos: usize,
        one_line: bool,
    ) -> Option<(usize, MatchResult)> {
        for (idx, pattern) in self.starts.iter().enumerate() {
            let Some(result) = pattern.probe(window, pos, MatchEvent::RegionStart, None) else {
                continue;
            };

            if one_line
                && !self.find_end_within_line(window, result.pos_after_match, &result.external_captures)
            {
                return None;
            }
            return Some((idx, result));
        }
        None
    }

    /// Builds a start result out of a hit of the combined expression of an item set.
    pub(crate) fn start_from_captures(
        &self,
        pattern: usize,
        window: &InputWindow,
        pos: usize,
        caps: &Captures,
        one_line: bool,
    ) -> Option<MatchResult> {
        let result = self.starts.get(pattern)?.result_from_captures(
            window,
            pos,
            caps,
            MatchEvent::RegionStart,
        )?;

        if one_line
            && !self.find_end_within_line(window, result.pos_after_match, &result.external_captures)
        {
            return None;
        }
        Some(result)
    }

    /// Looks for an end pattern between `from` and the next line end, honoring skips.
    pub(crate) fn find_end_within_line(
        &self,
        window: &InputWindow,
        from: usize,
        captures: &ExternalCaptures,
    ) -> bool {
        let resolved = self.resolve(captures);
        let mut pos = from;

        while pos < window.end() {
            for (idx, skip) in self.skips.iter().enumerate() {
                let hit = skip.probe(window, pos, MatchEvent::RegionSkip, resolved.skip(idx));
                if let Some(hit) = hit {
                    while pos < hit.pos_after_match {
                        pos = window.next_pos(pos);
                        if window.is_newline_at(pos) {
                            return false;
                        }
                    }
                    break;
                }
            }

            let found = self.ends.iter().enumerate().any(|(idx, end)| {
                end.probe(window, pos, MatchEvent::RegionEnd, resolved.end(idx))
                    .is_some()
            });
            if found {
                return true;
            }

            if window.is_newline_at(pos) {
                return false;
            }
            pos = window.next_pos(pos);
        }

        false
    }

    /// Compiles the skip and end patterns that reference captured text.
    pub(crate) fn resolve(&self, captures: &ExternalCaptures) -> ResolvedPatterns {
        if !self.has_deferred_patterns() {
            return ResolvedPatterns::default();
        }

        let compile = |pattern: &Pattern| {
            if !pattern.has_external_refs() {
                return None;
            }
            match pattern.resolve_externals(captures) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(pattern = pattern.source(), %err, "could not compile pattern with captured text");
                    None
                }
            }
        };

        ResolvedPatterns {
            skips: self.skips.iter().map(compile).collect(),
            ends: self.ends.iter().map(compile).collect(),
        }
    }
}

/// Per-region compiled forms of skip and end patterns with external references.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedPatterns {
    skips: Vec<Option<meta::Regex>>,
    ends: Vec<Option<meta::Regex>>,
}

impl ResolvedPatterns {
    pub(crate) fn skip(&self, idx: usize) -> Option<&meta::Regex> {
        self.skips.get(idx).and_then(Option::as_ref)
    }

    pub(crate) fn end(&self, idx: usize) -> Option<&meta::Regex> {
        self.ends.get(idx).and_then(Option::as_ref)
    }
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

    fn string_region() -> Region {
        Region::new()
            .start(Pattern::new("\"").unwrap())
            .skip(Pattern::new(r#"\\""#).unwrap())
            .end(Pattern::new("\"").unwrap())
    }

    #[test]
    fn oneline_start_needs_an_end_on_the_same_line() {
        let region = string_region();
        assert!(region.try_start(&window("\"abc\"\n"), 0, true).is_some());
        assert!(region.try_start(&window("\"abc\nd\"\n"), 0, true).is_none());
        assert!(region.try_start(&window("\"abc\nd\"\n"), 0, false).is_some());
    }

    #[test]
    fn skips_hide_ends_from_the_line_search() {
        let region = string_region();
        let w = window("\"a\\\"\n");
        assert!(!region.find_end_within_line(&w, 1, &ExternalCaptures::default()));
        let w = window("\"a\\\"b\"\n");
        assert!(region.find_end_within_line(&w, 1, &ExternalCaptures::default()));
    }

    #[test]
    fn deferred_ends_resolve_with_captured_text() {
        let region = Region::new()
            .start(Pattern::new(r"<<(?P<z1>\w+)").unwrap())
            .end(Pattern::new(r"^\z1$").unwrap());
        let w = window("<<END\nx\nEND\n");
        let (_, start) = region.try_start(&w, 0, false).unwrap();
        let resolved = region.resolve(&start.external_captures);
        assert!(resolved.end(0).is_some());
        assert!(region.ends()[0]
            .probe(&w, 8, MatchEvent::RegionEnd, resolved.end(0))
            .is_some());
        assert!(region.has_deferred_patterns());
        assert!(!region.has_matchgroup_end());
    }
}

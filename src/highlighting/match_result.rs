//! Result of a single successful pattern probe

/// Positions produced by a pattern that matched, after offsets were applied.
///
/// The highlight and region fields stay `None` unless an offset set them; the syntax item
/// that owns the pattern picks the defaults that make sense for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Cursor position the probe ran at.
    pub pos_matched_at: usize,
    pub pos_match_start: usize,
    pub pos_after_match: usize,
    pub pos_highlight_start: Option<usize>,
    pub pos_after_highlight: Option<usize>,
    pub pos_region_start: Option<usize>,
    pub pos_after_region: Option<usize>,
    /// Text captured by `z1`..`z9` groups of a region start pattern.
    pub external_captures: ExternalCaptures,
}

impl MatchResult {
    /// Clamps highlight and region bounds into `[pos_match_start, pos_after_match]`.
    pub fn do_limit_checks(&mut self) {
        if self.pos_after_match < self.pos_match_start {
            self.pos_after_match = self.pos_match_start;
        }

        let (low, high) = (self.pos_match_start, self.pos_after_match);
        for bound in [
            &mut self.pos_highlight_start,
            &mut self.pos_after_highlight,
            &mut self.pos_region_start,
            &mut self.pos_after_region,
        ] {
            if let Some(pos) = bound {
                *pos = (*pos).clamp(low, high);
            }
        }
    }
}

/// Captured text for `\z1`..`\z9`, indexed from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCaptures(Vec<Option<String>>);

impl ExternalCaptures {
    pub fn new(captures: Vec<Option<String>>) -> Self {
        Self(captures)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Text captured by `\z{n}`, 1-based.
    pub fn get(&self, n: usize) -> Option<&str> {
        self.0.get(n.checked_sub(1)?)?.as_deref()
    }
}

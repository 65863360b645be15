//! Scanner scopes
//!
//!     The scanner keeps a stack of scopes. The bottom one is the background and is never
//!     popped; every other scope was opened by a match, a region, or a `nextgroup`
//!     lookahead and claims the half open interval `[pos_start, pos_after)`.
//!
//!     `usize::MAX` stands for "not known yet": a region's end is only found while
//!     scanning.

use super::item::{ItemId, SyntaxItem};
use super::item_set::SetId;
use super::mode::HighlightMode;
use super::region::ResolvedPatterns;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Background,
    /// Waiting for one of the items named by `nextgroup` to start.
    NextGroup,
    Match(ItemId),
    Region(ItemId),
}

#[derive(Debug, Clone)]
pub(crate) struct Scope {
    pub(crate) kind: ScopeKind,
    pub(crate) mode: HighlightMode,
    pub(crate) transparent: bool,
    pub(crate) active: SetId,

    pub(crate) extend: bool,
    /// Some enclosing scope's end bounds this one.
    pub(crate) is_within_keep_end: bool,
    /// The end of this scope bounds everything opened inside it.
    pub(crate) limits_children: bool,

    pub(crate) pos_matched_at: usize,
    pub(crate) pos_start: usize,
    pub(crate) pos_after: usize,
    pub(crate) pos_highlight_start: usize,
    pub(crate) pos_after_highlight: usize,
    /// End and skip patterns are not probed before this position.
    pub(crate) pos_end_probe_from: usize,

    pub(crate) eat_newline: bool,
    pub(crate) one_line: bool,
    pub(crate) keep_end: bool,
    pub(crate) matchgroup_end: bool,

    pub(crate) resolved: ResolvedPatterns,
}

impl Scope {
    fn blank(kind: ScopeKind, active: SetId) -> Self {
        Self {
            kind,
            mode: HighlightMode::Normal,
            transparent: false,
            active,
            extend: false,
            is_within_keep_end: false,
            limits_children: false,
            pos_matched_at: 0,
            pos_start: 0,
            pos_after: usize::MAX,
            pos_highlight_start: 0,
            pos_after_highlight: usize::MAX,
            pos_end_probe_from: 0,
            eat_newline: false,
            one_line: false,
            keep_end: false,
            matchgroup_end: false,
            resolved: ResolvedPatterns::default(),
        }
    }

    pub(crate) fn background(active: SetId) -> Self {
        Self::blank(ScopeKind::Background, active)
    }

    /// A scope for `item`, matchable items taken from the item or, for transparent
    /// items without `contains`, from `parent_active`.
    pub(crate) fn for_item(item: &SyntaxItem, parent_active: SetId) -> Self {
        let kind = if item.is_region() {
            ScopeKind::Region(item.id())
        } else {
            ScopeKind::Match(item.id())
        };

        let options = item.options();
        let mut scope = Self::blank(kind, item.contained_items().unwrap_or(parent_active));
        scope.mode = item.mode();
        scope.transparent = options.transparent;
        scope.extend = options.extend;
        scope.keep_end = item.is_region() && options.keep_end;
        scope.one_line = item.is_region() && options.one_line;
        scope.is_within_keep_end = scope.keep_end;
        scope.limits_children = scope.keep_end;
        scope.matchgroup_end = item.as_region().is_some_and(|r| r.has_matchgroup_end());
        scope
    }

    pub(crate) fn next_group(active: SetId, pos_start: usize, pos_after: usize, parent: &Scope) -> Self {
        let mut scope = Self::blank(ScopeKind::NextGroup, active);
        scope.transparent = true;
        scope.extend = parent.extend;
        scope.is_within_keep_end = parent.is_within_keep_end;
        scope.pos_matched_at = pos_start;
        scope.pos_start = pos_start;
        scope.pos_after = pos_after;
        scope.pos_highlight_start = pos_start;
        scope
    }

    pub(crate) fn item(&self) -> Option<ItemId> {
        match self.kind {
            ScopeKind::Match(id) | ScopeKind::Region(id) => Some(id),
            ScopeKind::Background | ScopeKind::NextGroup => None,
        }
    }

    pub(crate) fn is_region(&self) -> bool {
        matches!(self.kind, ScopeKind::Region(_))
    }

    pub(crate) fn is_match(&self) -> bool {
        matches!(self.kind, ScopeKind::Match(_))
    }

    pub(crate) fn is_next_group(&self) -> bool {
        self.kind == ScopeKind::NextGroup
    }

    pub(crate) fn end_is_known(&self) -> bool {
        self.pos_after != usize::MAX
    }

    pub(crate) fn forget_end(&mut self) {
        self.pos_after = usize::MAX;
        self.pos_after_highlight = usize::MAX;
    }

    /// A region whose end was found before the cursor, overtaken by something it
    /// contains, has to look for its end again.
    pub(crate) fn try_clear_stale_end(&mut self, pos: usize) {
        if self.is_region() && !self.keep_end && self.pos_after < pos {
            self.forget_end();
        }
    }
}

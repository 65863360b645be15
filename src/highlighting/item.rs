//! Syntax items
//!
//!     Every keyword, match and region added to a definition becomes one [`SyntaxItem`],
//!     stored in the definition's arena and referred to by [`ItemId`]. The id is the
//!     item's position in definition order: later items win ties.
//!
//!     Items are prioritized by an ordering boost first (keywords beat everything, case
//!     sensitive keywords beat case insensitive ones) and by definition order second,
//!     both descending.

use super::group::GroupId;
use super::item_set::SetId;
use super::keyword::Keyword;
use super::match_result::MatchResult;
use super::mode::HighlightMode;
use super::pattern::{MatchEvent, Pattern};
use super::reader::InputWindow;
use super::region::Region;
use regex_automata::util::captures::Captures;
use std::cmp::Ordering;
use std::slice;

/// Position of an item in definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Attributes shared by all items, mirroring the arguments of `:syntax`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemOptions {
    /// Only recognized inside items whose `contains` names this one.
    pub contained: bool,
    /// Takes the highlighting of whatever contains it.
    pub transparent: bool,
    pub skip_white: bool,
    pub skip_nl: bool,
    pub skip_empty: bool,
    /// Lets the item run past the end of a `keepend` region or an enclosing match.
    pub extend: bool,
    pub keep_end: bool,
    pub one_line: bool,
    /// Cluster expression, e.g. `ALLBUT,cTodo` or `@cStuff,cNumber`.
    pub contains: Option<String>,
    pub contained_in: Option<String>,
    pub next_group: Option<String>,
}

impl ItemOptions {
    pub fn contained(mut self) -> Self {
        self.contained = true;
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    pub fn extend(mut self) -> Self {
        self.extend = true;
        self
    }

    pub fn keep_end(mut self) -> Self {
        self.keep_end = true;
        self
    }

    pub fn one_line(mut self) -> Self {
        self.one_line = true;
        self
    }

    pub fn skip_white(mut self) -> Self {
        self.skip_white = true;
        self
    }

    pub fn skip_nl(mut self) -> Self {
        self.skip_nl = true;
        self
    }

    pub fn skip_empty(mut self) -> Self {
        self.skip_empty = true;
        self
    }

    pub fn contains(mut self, expr: impl Into<String>) -> Self {
        self.contains = Some(expr.into());
        self
    }

    pub fn contained_in(mut self, expr: impl Into<String>) -> Self {
        self.contained_in = Some(expr.into());
        self
    }

    pub fn next_group(mut self, expr: impl Into<String>) -> Self {
        self.next_group = Some(expr.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    Keyword(Keyword),
    Match(Pattern),
    Region(Region),
}

/// Priority key: ascending order puts the highest priority item first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SortKey {
    pub(crate) boost: u8,
    pub(crate) id: ItemId,
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .boost
            .cmp(&self.boost)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxItem {
    pub(crate) id: ItemId,
    pub(crate) group: GroupId,
    pub(crate) mode: HighlightMode,
    pub(crate) options: ItemOptions,
    pub(crate) kind: ItemKind,
    /// `None` for transparent items without `contains`, which borrow their container's.
    pub(crate) contained_items: Option<SetId>,
    pub(crate) next_group: Option<SetId>,
}

impl SyntaxItem {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn mode(&self) -> HighlightMode {
        self.mode
    }

    pub fn options(&self) -> &ItemOptions {
        &self.options
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self.kind, ItemKind::Keyword(_))
    }

    pub fn is_match(&self) -> bool {
        matches!(self.kind, ItemKind::Match(_))
    }

    pub fn is_region(&self) -> bool {
        matches!(self.kind, ItemKind::Region(_))
    }

    pub fn is_transparent(&self) -> bool {
        self.options.transparent
    }

    pub fn contained_items(&self) -> Option<SetId> {
        self.contained_items
    }

    pub fn next_group(&self) -> Option<SetId> {
        self.next_group
    }

    pub(crate) fn boost(&self) -> u8 {
        match &self.kind {
            ItemKind::Keyword(kw) if kw.ignores_case() => 1,
            ItemKind::Keyword(_) => 2,
            _ => 0,
        }
    }

    pub(crate) fn sort_key(&self) -> SortKey {
        SortKey {
            boost: self.boost(),
            id: self.id,
        }
    }

    pub(crate) fn as_region(&self) -> Option<&Region> {
        match &self.kind {
            ItemKind::Region(region) => Some(region),
            _ => None,
        }
    }

    pub(crate) fn start_patterns(&self) -> &[Pattern] {
        match &self.kind {
            ItemKind::Keyword(_) => &[],
            ItemKind::Match(pattern) => slice::from_ref(pattern),
            ItemKind::Region(region) => region.starts(),
        }
    }

    /// Items with leading context can't take part in a combined expression.
    pub(crate) fn needs_manual_match(&self) -> bool {
        self.start_patterns()
            .iter()
            .any(|p| p.leading_context() > 0)
    }

    /// Tries to match or start this item at `pos`, returning the start pattern used.
    pub(crate) fn try_match(&self, window: &InputWindow, pos: usize) -> Option<(usize, MatchResult)> {
        match &self.kind {
            ItemKind::Keyword(_) => None,
            ItemKind::Match(pattern) => pattern
                .probe(window, pos, MatchEvent::Match, None)
                .map(|r| (0, r)),
            ItemKind::Region(region) => region.try_start(window, pos, self.options.one_line),
        }
    }

    /// Confirms a combined-expression hit on start pattern `pattern` of this item.
    pub(crate) fn confirm(
        &self,
        pattern: usize,
        window: &InputWindow,
        pos: usize,
        caps: &Captures,
    ) -> Option<MatchResult> {
        match &self.kind {
            ItemKind::Keyword(_) => None,
            ItemKind::Match(p) => p.result_from_captures(window, pos, caps, MatchEvent::Match),
            ItemKind::Region(region) => {
                region.start_from_captures(pattern, window, pos, caps, self.options.one_line)
            }
        }
    }
}

//! Frozen sets of syntax items
//!
//!     An item set is what a scope can match: an ordered, duplicate free list of items,
//!     highest priority first. Keywords sort ahead of everything else, so the set records
//!     where the matches and regions begin.
//!
//!     The start patterns of every match and region in the set are compiled into one
//!     multi-pattern expression, the communal expression, so a scan position costs a single
//!     anchored search instead of one per item. Items whose patterns use leading context
//!     can't be anchored that way and are tried one by one.
//!
//!     Sets are interned by content: two scopes that can match the same items share one
//!     [`SetId`].

use super::error::DefinitionError;
use super::item::{ItemId, SortKey, SyntaxItem};
use super::match_result::MatchResult;
use super::pattern::compile_many;
use super::reader::InputWindow;
use regex_automata::{meta, Anchored, Input};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub(crate) usize);

/// A match or region start found by [`ItemSet::try_match_or_region_start`].
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    /// Position in the set, lower is higher priority.
    pub(crate) index: usize,
    pub(crate) item: ItemId,
    /// Which start pattern of the item matched.
    pub(crate) pattern: usize,
    pub(crate) result: MatchResult,
}

#[derive(Debug, Clone)]
struct Communal {
    regex: meta::Regex,
    /// Set index and start pattern index for every pattern of `regex`.
    origins: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct ItemSet {
    keys: Vec<SortKey>,
    first_non_keyword: usize,
    manual: Vec<usize>,
    communal: Option<Communal>,
}

impl ItemSet {
    fn build(keys: Vec<SortKey>, items: &[SyntaxItem]) -> Result<Self, DefinitionError> {
        let first_non_keyword = keys
            .iter()
            .position(|k| !items[k.id.0].is_keyword())
            .unwrap_or(keys.len());

        let mut manual = Vec::new();
        let mut sources = Vec::new();
        let mut origins = Vec::new();

        for (index, key) in keys.iter().enumerate().skip(first_non_keyword) {
            let item = &items[key.id.0];
            if item.needs_manual_match() {
                manual.push(index);
                continue;
            }
            for (pattern, start) in item.start_patterns().iter().enumerate() {
                sources.push(start.source());
                origins.push((index, pattern));
            }
        }

        let communal = if sources.is_empty() {
            None
        } else {
            Some(Communal {
                regex: compile_many(&sources)?,
                origins,
            })
        };

        Ok(Self {
            keys,
            first_non_keyword,
            manual,
            communal,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Items in priority order.
    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.keys.iter().map(|k| k.id)
    }

    pub fn item_at(&self, index: usize) -> ItemId {
        self.keys[index].id
    }

    pub fn first_non_keyword(&self) -> usize {
        self.first_non_keyword
    }

    pub fn has_keywords(&self) -> bool {
        self.first_non_keyword > 0
    }

    pub fn has_matches_or_regions(&self) -> bool {
        self.first_non_keyword < self.keys.len()
    }

    pub(crate) fn index_of(&self, item: &SyntaxItem) -> Option<usize> {
        self.keys.binary_search(&item.sort_key()).ok()
    }

    /// Finds the highest priority match or region start at `pos` among the items at
    /// index `from` or later.
    ///
    /// From the top of the set this runs the communal expression and the manual items.
    /// When both hit, the lower set index wins. When the communal hit can't be confirmed
    /// (a oneline region without an end on its line, say), the items after it are tried one
    /// by one, up to the winning manual item.
    pub(crate) fn try_match_or_region_start(
        &self,
        items: &[SyntaxItem],
        window: &InputWindow,
        pos: usize,
        from: usize,
    ) -> Option<Candidate> {
        let from = from.max(self.first_non_keyword);
        let Some(communal) = self.communal.as_ref().filter(|_| from == self.first_non_keyword)
        else {
            return self.try_each(items, window, pos, from, self.len());
        };

        let manual = self.manual.iter().find_map(|&index| {
            let item = &items[self.keys[index].id.0];
            let (pattern, result) = item.try_match(window, pos)?;
            Some(Candidate {
                index,
                item: item.id(),
                pattern,
                result,
            })
        });
        let limit = manual.as_ref().map_or(self.len(), |c| c.index);

        let hay = window.text();
        let input = Input::new(hay)
            .span(window.relative(pos)..hay.len())
            .anchored(Anchored::Yes);
        let mut caps = communal.regex.create_captures();
        communal.regex.search_captures(&input, &mut caps);

        if let Some(pid) = caps.pattern() {
            let (index, pattern) = communal.origins[pid.as_usize()];
            if index < limit {
                let item = &items[self.keys[index].id.0];
                if let Some(result) = item.confirm(pattern, window, pos, &caps) {
                    return Some(Candidate {
                        index,
                        item: item.id(),
                        pattern,
                        result,
                    });
                }
                if let Some(found) = self.try_each(items, window, pos, index + 1, limit) {
                    return Some(found);
                }
            }
        }

        manual
    }

    fn try_each(
        &self,
        items: &[SyntaxItem],
        window: &InputWindow,
        pos: usize,
        from: usize,
        until: usize,
    ) -> Option<Candidate> {
        (from..until).find_map(|index| {
            let item = &items[self.keys[index].id.0];
            let (pattern, result) = item.try_match(window, pos)?;
            Some(Candidate {
                index,
                item: item.id(),
                pattern,
                result,
            })
        })
    }
}

/// Deduplicates sets by membership.
#[derive(Debug, Default)]
pub(crate) struct SetInterner {
    sets: Vec<ItemSet>,
    by_members: HashMap<Vec<SortKey>, SetId>,
}

impl SetInterner {
    pub(crate) fn intern(
        &mut self,
        members: &[ItemId],
        items: &[SyntaxItem],
    ) -> Result<SetId, DefinitionError> {
        let mut keys: Vec<SortKey> = members.iter().map(|id| items[id.0].sort_key()).collect();
        keys.sort();
        keys.dedup();

        if let Some(id) = self.by_members.get(&keys) {
            return Ok(*id);
        }

        let id = SetId(self.sets.len());
        self.sets.push(ItemSet::build(keys.clone(), items)?);
        self.by_members.insert(keys, id);
        Ok(id)
    }

    pub(crate) fn into_sets(self) -> Vec<ItemSet> {
        self.sets
    }
}

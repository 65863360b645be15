//! Highlight groups and links
//!
//!     Group names are case-insensitive and created on first mention. A group's mode is
//!     its own if it carries a standard name, otherwise the mode at the end of its chain
//!     of highlight links, otherwise `Normal`.

use super::error::DefinitionError;
use super::item::ItemId;
use super::mode::HighlightMode;
use regex::Regex;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    items: Vec<ItemId>,
    mode: HighlightMode,
}

impl Group {
    /// Upper-cased name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn mode(&self) -> HighlightMode {
        self.mode
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    groups: Vec<Group>,
    by_name: HashMap<String, GroupId>,
    links: HashMap<String, String>,
}

impl GroupTable {
    pub(crate) fn get_or_create(&mut self, name: &str) -> GroupId {
        let upper = name.to_uppercase();
        if let Some(id) = self.by_name.get(&upper) {
            return *id;
        }

        let id = GroupId(self.groups.len());
        self.groups.push(Group {
            name: upper.clone(),
            items: Vec::new(),
            mode: HighlightMode::Normal,
        });
        self.by_name.insert(upper, id);
        id
    }

    pub fn find(&self, name: &str) -> Option<GroupId> {
        self.by_name.get(&name.to_uppercase()).copied()
    }

    pub fn get(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub(crate) fn add_item(&mut self, group: GroupId, item: ItemId) {
        self.groups[group.0].items.push(item);
    }

    pub(crate) fn add_link(&mut self, from: &str, to: &str) {
        self.get_or_create(from);
        self.links.insert(from.to_uppercase(), to.to_uppercase());
    }

    /// Upper-cased names of existing groups matching a shell wildcard (`*`, `?`).
    pub(crate) fn expand_wildcard(&self, pattern: &str) -> Vec<String> {
        let mut source = String::from("^");
        for c in pattern.to_uppercase().chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        let Ok(matcher) = Regex::new(&source) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .groups
            .iter()
            .filter(|g| matcher.is_match(&g.name))
            .map(|g| g.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Resolves every group's mode through its links.
    pub(crate) fn resolve_modes(&mut self) -> Result<(), DefinitionError> {
        for idx in 0..self.groups.len() {
            let mode = self.mode_for(&self.groups[idx].name)?;
            self.groups[idx].mode = mode;
        }
        Ok(())
    }

    fn mode_for(&self, name: &str) -> Result<HighlightMode, DefinitionError> {
        let mut visited = HashSet::new();
        let mut current = name;

        loop {
            if let Some(mode) = HighlightMode::from_name(current) {
                return Ok(mode);
            }
            if !visited.insert(current) {
                return Err(DefinitionError::CircularHighlightLink(name.to_string()));
            }
            match self.links.get(current) {
                Some(next) => current = next,
                None => return Ok(HighlightMode::Normal),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let mut table = GroupTable::default();
        let a = table.get_or_create("cString");
        let b = table.get_or_create("CSTRING");
        assert_eq!(a, b);
        assert_eq!(table.get(a).name(), "CSTRING");
        assert_eq!(table.find("cstring"), Some(a));
    }

    #[test]
    fn modes_follow_links() {
        let mut table = GroupTable::default();
        let s = table.get_or_create("cString");
        let c = table.get_or_create("cComment");
        let other = table.get_or_create("cOther");
        let todo = table.get_or_create("Todo");
        table.add_link("cString", "cQuoted");
        table.add_link("cQuoted", "String");
        table.add_link("cComment", "Comment");
        table.resolve_modes().unwrap();

        assert_eq!(table.get(s).mode(), HighlightMode::String);
        assert_eq!(table.get(c).mode(), HighlightMode::Comment);
        assert_eq!(table.get(other).mode(), HighlightMode::Normal);
        assert_eq!(table.get(todo).mode(), HighlightMode::Todo);
    }

    #[test]
    fn circular_links_are_rejected() {
        let mut table = GroupTable::default();
        table.add_link("a", "b");
        table.add_link("b", "a");
        assert!(matches!(
            table.resolve_modes(),
            Err(DefinitionError::CircularHighlightLink(_))
        ));
    }

    #[test]
    fn wildcards_expand_against_known_groups() {
        let mut table = GroupTable::default();
        for name in ["cString", "cStatement", "cNumber", "c.x"] {
            table.get_or_create(name);
        }
        assert_eq!(table.expand_wildcard("cSt*"), vec!["CSTATEMENT", "CSTRING"]);
        assert_eq!(table.expand_wildcard("c?x"), vec!["C.X"]);
        assert!(table.expand_wildcard("zz*").is_empty());
    }
}

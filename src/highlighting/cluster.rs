//! Clusters
//!
//!     A cluster is a set expression over group names and other clusters. Named clusters
//!     come from `:syntax cluster` (`@cStuff`); anonymous ones stand behind every
//!     `contains=`, `containedin=` and `nextgroup=` argument.
//!
//!     The first element of the expression may select a universe from the cluster's
//!     context:
//!
//!         ALL             every item, the rest of the list is ignored
//!         ALLBUT,a,b      every item except those listed
//!         TOP,a           every top-level item except those listed
//!         CONTAINED,a     every contained item except those listed
//!         NONE            nothing
//!
//!     Anything else is an explicit list. Group names may use shell wildcards, which are
//!     expanded against the groups that exist when the expression is set.
//!
//!     Membership is resolved once, when the definition is finished. Clusters that refer
//!     to each other resolve without looping: a cluster that is already being resolved
//!     contributes nothing to its own expansion, which may leave mutually recursive
//!     clusters under-resolved.

use super::context::{ContextId, SyntaxContext};
use super::error::DefinitionError;
use super::group::GroupTable;
use super::item::ItemId;
use std::collections::{BTreeSet, HashMap};

pub const CLUSTER_MARKER: char = '@';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    All,
    AllBut,
    Top,
    Contained,
    None,
    List,
}

impl ClusterKind {
    fn from_name(name: &str) -> Self {
        match name.to_uppercase().as_str() {
            "ALL" => ClusterKind::All,
            "ALLBUT" => ClusterKind::AllBut,
            "TOP" => ClusterKind::Top,
            "CONTAINED" => ClusterKind::Contained,
            "NONE" => ClusterKind::None,
            _ => ClusterKind::List,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cluster {
    name: Option<String>,
    context: ContextId,
    kind: ClusterKind,
    members: Vec<String>,
    direct_items: Vec<ItemId>,
}

impl Cluster {
    pub(crate) fn new(name: Option<String>, context: ContextId) -> Self {
        Self {
            name: name.map(|n| n.to_uppercase()),
            context,
            kind: ClusterKind::List,
            members: Vec::new(),
            direct_items: Vec::new(),
        }
    }

    /// Upper-cased name including the `@` marker, `None` for anonymous clusters.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> ClusterKind {
        self.kind
    }

    /// Normalized group and cluster names, in insertion order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Replaces the whole expression, universe selector included.
    pub(crate) fn set_contents_to(&mut self, expr: &str, groups: &GroupTable) {
        let parts = split_names(expr);
        self.kind = parts
            .first()
            .map_or(ClusterKind::List, |first| ClusterKind::from_name(first));
        self.members = expand_names(&parts, groups);
    }

    pub(crate) fn add_sets(&mut self, expr: &str, groups: &GroupTable) {
        for name in expand_names(&split_names(expr), groups) {
            if !self.members.contains(&name) {
                self.members.push(name);
            }
        }
    }

    pub(crate) fn remove_sets(&mut self, expr: &str, groups: &GroupTable) {
        let removed = expand_names(&split_names(expr), groups);
        self.members.retain(|name| !removed.contains(name));
    }

    pub(crate) fn add_direct_item(&mut self, item: ItemId) {
        self.direct_items.push(item);
    }

    /// Cluster names referenced by this expression.
    pub(crate) fn referenced_clusters(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|name| name.starts_with(CLUSTER_MARKER))
            .map(String::as_str)
    }
}

fn split_names(expr: &str) -> Vec<&str> {
    expr.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Drops universe selectors, upper-cases names and expands group wildcards.
fn expand_names(parts: &[&str], groups: &GroupTable) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for part in parts {
        if ClusterKind::from_name(part) != ClusterKind::List {
            continue;
        }

        let expanded = if !part.starts_with(CLUSTER_MARKER) && part.contains(['*', '?']) {
            groups.expand_wildcard(part)
        } else {
            vec![part.to_uppercase()]
        };

        for name in expanded {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    names
}

/// Computes final cluster membership over a finished set of contexts and groups.
pub(crate) struct ClusterResolver<'a> {
    clusters: &'a [Cluster],
    by_name: &'a HashMap<String, ClusterId>,
    groups: &'a GroupTable,
    contexts: &'a [SyntaxContext],
    resolving: Vec<ClusterId>,
    cache: HashMap<ClusterId, Vec<ItemId>>,
}

impl<'a> ClusterResolver<'a> {
    pub(crate) fn new(
        clusters: &'a [Cluster],
        by_name: &'a HashMap<String, ClusterId>,
        groups: &'a GroupTable,
        contexts: &'a [SyntaxContext],
    ) -> Self {
        Self {
            clusters,
            by_name,
            groups,
            contexts,
            resolving: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Sorted, duplicate-free members of a cluster. Repeated calls return the cached result.
    pub(crate) fn resolve(&mut self, id: ClusterId) -> Result<Vec<ItemId>, DefinitionError> {
        if let Some(items) = self.cache.get(&id) {
            return Ok(items.clone());
        }

        let items: Vec<ItemId> = self.member_items(id)?.into_iter().collect();
        self.cache.insert(id, items.clone());
        Ok(items)
    }

    fn member_items(&mut self, id: ClusterId) -> Result<BTreeSet<ItemId>, DefinitionError> {
        if let Some(items) = self.cache.get(&id) {
            return Ok(items.iter().copied().collect());
        }

        let (clusters, contexts) = (self.clusters, self.contexts);
        let cluster = &clusters[id.0];
        let context = &contexts[cluster.context.0];
        self.resolving.push(id);

        let items = match cluster.kind {
            ClusterKind::All => context.all_items().iter().copied().collect(),
            ClusterKind::None => BTreeSet::new(),
            ClusterKind::List => self.items_in_sets(cluster)?,
            ClusterKind::AllBut => except(context.all_items(), &self.items_in_sets(cluster)?),
            ClusterKind::Top => except(context.top_items(), &self.items_in_sets(cluster)?),
            ClusterKind::Contained => {
                except(context.non_top_items(), &self.items_in_sets(cluster)?)
            }
        };

        self.resolving.pop();

        let mut items = items;
        items.extend(cluster.direct_items.iter().copied());
        Ok(items)
    }

    fn items_in_sets(&mut self, cluster: &'a Cluster) -> Result<BTreeSet<ItemId>, DefinitionError> {
        let mut items = BTreeSet::new();

        for name in &cluster.members {
            if name.starts_with(CLUSTER_MARKER) {
                let nested = *self
                    .by_name
                    .get(name)
                    .ok_or_else(|| DefinitionError::UnknownCluster(name.clone()))?;
                if self.resolving.contains(&nested) {
                    continue;
                }
                items.extend(self.member_items(nested)?);
            } else if let Some(group) = self.groups.find(name) {
                items.extend(self.groups.get(group).items().iter().copied());
            }
        }

        Ok(items)
    }
}

fn except(universe: &[ItemId], excluded: &BTreeSet<ItemId>) -> BTreeSet<ItemId> {
    universe
        .iter()
        .copied()
        .filter(|item| !excluded.contains(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_sets_the_kind_and_is_not_a_member() {
        let groups = GroupTable::default();
        let mut cluster = Cluster::new(None, ContextId(0));
        cluster.set_contents_to("ALLBUT,cTodo, cNumber", &groups);
        assert_eq!(cluster.kind(), ClusterKind::AllBut);
        assert_eq!(cluster.members(), ["CTODO", "CNUMBER"]);

        cluster.set_contents_to("@cStuff,cString", &groups);
        assert_eq!(cluster.kind(), ClusterKind::List);
        assert_eq!(cluster.referenced_clusters().collect::<Vec<_>>(), ["@CSTUFF"]);
    }

    #[test]
    fn add_and_remove_sets() {
        let mut groups = GroupTable::default();
        groups.get_or_create("cString");
        groups.get_or_create("cStatement");
        let mut cluster = Cluster::new(Some("@x".into()), ContextId(0));
        assert_eq!(cluster.name(), Some("@X"));

        cluster.add_sets("cSt*,cNumber", &groups);
        assert_eq!(cluster.members(), ["CSTATEMENT", "CSTRING", "CNUMBER"]);
        cluster.add_sets("cnumber", &groups);
        assert_eq!(cluster.members().len(), 3);
        cluster.remove_sets("cString", &groups);
        assert_eq!(cluster.members(), ["CSTATEMENT", "CNUMBER"]);
    }
}

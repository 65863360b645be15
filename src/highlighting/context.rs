//! Syntax contexts
//!
//!     A context is the universe `ALL`, `TOP` and `CONTAINED` are evaluated against. Every
//!     definition has a main context; an included syntax gets a context of its own whose
//!     top-level items are reachable through a cluster named after it.

use super::cluster::ClusterId;
use super::item::ItemId;

pub const MAIN_CONTEXT: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct SyntaxContext {
    name: String,
    all: Vec<ItemId>,
    top: Vec<ItemId>,
    non_top: Vec<ItemId>,
    top_clusters: Vec<ClusterId>,
}

impl SyntaxContext {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            all: Vec::new(),
            top: Vec::new(),
            non_top: Vec::new(),
            top_clusters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn all_items(&self) -> &[ItemId] {
        &self.all
    }

    /// Items recognized without being contained by anything.
    pub fn top_items(&self) -> &[ItemId] {
        &self.top
    }

    pub fn non_top_items(&self) -> &[ItemId] {
        &self.non_top
    }

    /// Clusters that receive every top-level item of this context.
    pub fn top_clusters(&self) -> &[ClusterId] {
        &self.top_clusters
    }

    pub(crate) fn add_item(&mut self, item: ItemId, contained: bool) {
        self.all.push(item);
        if contained {
            self.non_top.push(item);
        } else {
            self.top.push(item);
        }
    }

    pub(crate) fn add_top_cluster(&mut self, cluster: ClusterId) {
        self.top_clusters.push(cluster);
    }
}

//! Syntax definitions
//!
//!     A definition is built in two phases. [`SyntaxDefinitionBuilder`] collects groups,
//!     links, clusters, contexts and items in the order a syntax file declares them. Calling
//!     [`finish`](SyntaxDefinitionBuilder::finish) validates everything, resolves highlight
//!     links and cluster membership, interns the resulting item sets and produces an
//!     immutable [`SyntaxDefinition`].
//!
//!     A finished definition is shared by reference between any number of scanners.
//!
//! Example
//!
//!     let mut builder = SyntaxDefinitionBuilder::new("demo");
//!     builder.set_ignore_case(true);
//!     builder.add_keywords("Statement", ["if", "else"], ItemOptions::default());
//!     builder.add_region(
//!         "String",
//!         Region::new().start(Pattern::new("\"")?).end(Pattern::new("\"")?),
//!         ItemOptions::default(),
//!     );
//!     let definition = builder.finish()?;

use super::charlist::KeywordChars;
use super::cluster::{Cluster, ClusterId, ClusterResolver, CLUSTER_MARKER};
use super::context::{ContextId, SyntaxContext, MAIN_CONTEXT};
use super::error::DefinitionError;
use super::group::{GroupId, GroupTable};
use super::item::{ItemId, ItemKind, ItemOptions, SyntaxItem};
use super::item_set::{ItemSet, SetId, SetInterner};
use super::keyword::Keyword;
use super::mode::HighlightMode;
use super::pattern::Pattern;
use super::region::Region;
use std::collections::HashMap;
use tracing::debug;

/// Anonymous clusters behind an item's set arguments.
#[derive(Debug, Clone, Copy, Default)]
struct ItemClusters {
    contains: Option<ClusterId>,
    contained_in: Option<ClusterId>,
    next_group: Option<ClusterId>,
}

#[derive(Debug)]
pub struct SyntaxDefinitionBuilder {
    id: String,
    ignore_case: bool,
    keyword_chars: KeywordChars,
    items: Vec<SyntaxItem>,
    item_clusters: Vec<ItemClusters>,
    groups: GroupTable,
    clusters: Vec<Cluster>,
    cluster_names: HashMap<String, ClusterId>,
    contexts: Vec<SyntaxContext>,
    context_names: HashMap<String, ContextId>,
    current_context: ContextId,
}

impl SyntaxDefinitionBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let mut context_names = HashMap::new();
        context_names.insert(MAIN_CONTEXT.to_string(), ContextId(0));

        Self {
            id: id.into(),
            ignore_case: false,
            keyword_chars: KeywordChars::standard(),
            items: Vec::new(),
            item_clusters: Vec::new(),
            groups: GroupTable::default(),
            clusters: Vec::new(),
            cluster_names: HashMap::new(),
            contexts: vec![SyntaxContext::new(MAIN_CONTEXT)],
            context_names,
            current_context: ContextId(0),
        }
    }

    /// Applies to keywords added from now on.
    pub fn set_ignore_case(&mut self, ignore_case: bool) {
        self.ignore_case = ignore_case;
    }

    /// Replaces the keyword characters with an `iskeyword` style list.
    pub fn set_keyword_chars(&mut self, list: &str) -> Result<(), DefinitionError> {
        self.keyword_chars = KeywordChars::parse(list)?;
        Ok(())
    }

    pub fn add_keyword_chars(&mut self, list: &str) -> Result<(), DefinitionError> {
        self.keyword_chars.add(list)
    }

    pub fn add_highlight_link(&mut self, from: &str, to: &str) {
        self.groups.add_link(from, to);
    }

    /// Adds one keyword item per word, all in `group`.
    pub fn add_keywords<I, S>(&mut self, group: &str, words: I, options: ItemOptions) -> Vec<ItemId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        words
            .into_iter()
            .map(|word| {
                let keyword = Keyword::parse(word.as_ref(), self.ignore_case);
                self.add_item(group, ItemKind::Keyword(keyword), options.clone())
            })
            .collect()
    }

    pub fn add_match(&mut self, group: &str, pattern: Pattern, options: ItemOptions) -> ItemId {
        self.add_item(group, ItemKind::Match(pattern), options)
    }

    pub fn add_region(&mut self, group: &str, region: Region, options: ItemOptions) -> ItemId {
        for pattern in region.starts().iter().chain(region.ends()) {
            if let Some(matchgroup) = pattern.matchgroup() {
                self.groups.get_or_create(matchgroup);
            }
        }
        self.add_item(group, ItemKind::Region(region), options)
    }

    /// Sets the contents of a named cluster, creating it if needed.
    pub fn define_cluster(&mut self, name: &str, expr: &str) -> Result<ClusterId, DefinitionError> {
        let id = self.named_cluster(name)?;
        self.clusters[id.0].set_contents_to(expr, &self.groups);
        Ok(id)
    }

    pub fn add_to_cluster(&mut self, name: &str, expr: &str) -> Result<ClusterId, DefinitionError> {
        let id = self.named_cluster(name)?;
        self.clusters[id.0].add_sets(expr, &self.groups);
        Ok(id)
    }

    pub fn remove_from_cluster(&mut self, name: &str, expr: &str) -> Result<ClusterId, DefinitionError> {
        let id = self.named_cluster(name)?;
        self.clusters[id.0].remove_sets(expr, &self.groups);
        Ok(id)
    }

    /// Creates a context for an included syntax. Its top-level items become members of
    /// the cluster `@name`.
    pub fn create_context(&mut self, name: &str) -> Result<ContextId, DefinitionError> {
        if self.context_names.contains_key(name) {
            return Err(DefinitionError::DuplicateContext(name.to_string()));
        }

        let id = ContextId(self.contexts.len());
        self.contexts.push(SyntaxContext::new(name));
        self.context_names.insert(name.to_string(), id);

        let previous = std::mem::replace(&mut self.current_context, id);
        let cluster = self.named_cluster(&format!("{CLUSTER_MARKER}{name}"));
        self.current_context = previous;

        self.contexts[id.0].add_top_cluster(cluster?);
        Ok(id)
    }

    /// Items and clusters added from now on belong to context `name`.
    pub fn use_context(&mut self, name: &str) -> Result<(), DefinitionError> {
        self.current_context = *self
            .context_names
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownContext(name.to_string()))?;
        Ok(())
    }

    pub fn use_main_context(&mut self) {
        self.current_context = ContextId(0);
    }

    fn named_cluster(&mut self, name: &str) -> Result<ClusterId, DefinitionError> {
        if !name.starts_with(CLUSTER_MARKER) || name.len() == 1 {
            return Err(DefinitionError::InvalidClusterName(name.to_string()));
        }

        let upper = name.to_uppercase();
        if let Some(id) = self.cluster_names.get(&upper) {
            return Ok(*id);
        }

        let id = ClusterId(self.clusters.len());
        self.clusters
            .push(Cluster::new(Some(upper.clone()), self.current_context));
        self.cluster_names.insert(upper, id);
        Ok(id)
    }

    fn anonymous_cluster(&mut self, expr: &str) -> ClusterId {
        let id = ClusterId(self.clusters.len());
        let mut cluster = Cluster::new(None, self.current_context);
        cluster.set_contents_to(expr, &self.groups);
        self.clusters.push(cluster);
        id
    }

    fn add_item(&mut self, group: &str, kind: ItemKind, options: ItemOptions) -> ItemId {
        let id = ItemId(self.items.len());
        let group = self.groups.get_or_create(group);
        self.groups.add_item(group, id);

        let clusters = ItemClusters {
            contains: options.contains.as_deref().map(|e| self.anonymous_cluster(e)),
            contained_in: options.contained_in.as_deref().map(|e| self.anonymous_cluster(e)),
            next_group: options.next_group.as_deref().map(|e| self.anonymous_cluster(e)),
        };

        let context = &mut self.contexts[self.current_context.0];
        context.add_item(id, options.contained);
        if !options.contained {
            for cluster in context.top_clusters().to_vec() {
                self.clusters[cluster.0].add_direct_item(id);
            }
        }

        self.items.push(SyntaxItem {
            id,
            group,
            mode: HighlightMode::Normal,
            options,
            kind,
            contained_items: None,
            next_group: None,
        });
        self.item_clusters.push(clusters);
        id
    }

    /// Validates and freezes the definition.
    pub fn finish(self) -> Result<SyntaxDefinition, DefinitionError> {
        let Self {
            id,
            keyword_chars,
            mut items,
            item_clusters,
            mut groups,
            clusters,
            cluster_names,
            contexts,
            ..
        } = self;

        for item in &items {
            validate_item(item, &groups)?;
        }
        for cluster in &clusters {
            if let Some(name) = cluster
                .referenced_clusters()
                .find(|name| !cluster_names.contains_key(*name))
            {
                return Err(DefinitionError::UnknownCluster(name.to_string()));
            }
        }

        groups.resolve_modes()?;
        for item in &mut items {
            item.mode = groups.get(item.group).mode();
            if let ItemKind::Region(region) = &mut item.kind {
                for pattern in region.patterns_mut() {
                    let mode = pattern
                        .matchgroup()
                        .and_then(|name| groups.find(name))
                        .map(|group| groups.get(group).mode());
                    if let Some(mode) = mode {
                        pattern.set_highlight_mode(mode);
                    }
                }
            }
        }

        let mut resolver = ClusterResolver::new(&clusters, &cluster_names, &groups, &contexts);
        let mut interner = SetInterner::default();

        let mut back_refs: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
        for (item, links) in items.iter().zip(&item_clusters) {
            if let Some(cluster) = links.contained_in {
                for container in resolver.resolve(cluster)? {
                    back_refs.entry(container).or_default().push(item.id);
                }
            }
        }

        let mut resolved = Vec::with_capacity(items.len());
        for (item, links) in items.iter().zip(&item_clusters) {
            let refs = back_refs.get(&item.id);
            let contained_items = match (links.contains, refs) {
                _ if item.is_keyword() => None,
                (None, None) if item.is_transparent() => None,
                (contains, refs) => {
                    let mut members = match contains {
                        Some(cluster) => resolver.resolve(cluster)?,
                        None => Vec::new(),
                    };
                    members.extend(refs.into_iter().flatten().copied());
                    Some(interner.intern(&members, &items)?)
                }
            };

            let next_group = match links.next_group {
                Some(cluster) => Some(interner.intern(&resolver.resolve(cluster)?, &items)?),
                None => None,
            };
            resolved.push((contained_items, next_group));
        }

        for (item, (contained_items, next_group)) in items.iter_mut().zip(resolved) {
            item.contained_items = contained_items;
            item.next_group = next_group;
        }

        let mut cluster_sets = HashMap::new();
        for (name, cluster) in &cluster_names {
            let members = resolver.resolve(*cluster)?;
            cluster_sets.insert(name.clone(), interner.intern(&members, &items)?);
        }

        let background = interner.intern(contexts[0].top_items(), &items)?;

        let mut keywords: Vec<(String, ItemId)> = items
            .iter()
            .filter_map(|item| match &item.kind {
                ItemKind::Keyword(kw) => Some((kw.upper_name().to_string(), item.id)),
                _ => None,
            })
            .collect();
        keywords.sort();
        let has_partial_keywords = items
            .iter()
            .any(|item| matches!(&item.kind, ItemKind::Keyword(kw) if kw.allows_partial()));

        let sets = interner.into_sets();
        debug!(
            syntax = %id,
            items = items.len(),
            groups = groups.len(),
            clusters = clusters.len(),
            sets = sets.len(),
            keywords = keywords.len(),
            "finished syntax definition"
        );

        Ok(SyntaxDefinition {
            id,
            items,
            groups,
            sets,
            contexts,
            cluster_sets,
            background,
            keyword_chars,
            keywords,
            has_partial_keywords,
        })
    }
}

fn validate_item(item: &SyntaxItem, groups: &GroupTable) -> Result<(), DefinitionError> {
    if let ItemKind::Region(region) = &item.kind {
        if region.starts().is_empty() || region.ends().is_empty() {
            return Err(DefinitionError::EmptyRegion {
                group: groups.get(item.group).name().to_string(),
                starts: region.starts().len(),
                ends: region.ends().len(),
            });
        }
        for pattern in region.skips().iter().chain(region.ends()) {
            pattern.validate()?;
        }
    }

    for pattern in item.start_patterns() {
        if pattern.has_external_refs() {
            return Err(DefinitionError::ExternalReferenceInStart {
                pattern: pattern.source().to_string(),
            });
        }
        pattern.validate()?;
    }

    Ok(())
}

/// A finished, immutable syntax definition.
#[derive(Debug)]
pub struct SyntaxDefinition {
    id: String,
    items: Vec<SyntaxItem>,
    groups: GroupTable,
    sets: Vec<ItemSet>,
    contexts: Vec<SyntaxContext>,
    cluster_sets: HashMap<String, SetId>,
    background: SetId,
    keyword_chars: KeywordChars,
    /// Upper-cased keyword names, sorted.
    keywords: Vec<(String, ItemId)>,
    has_partial_keywords: bool,
}

impl SyntaxDefinition {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[SyntaxItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> &SyntaxItem {
        &self.items[id.0]
    }

    pub fn set(&self, id: SetId) -> &ItemSet {
        &self.sets[id.0]
    }

    /// Number of distinct item sets after interning.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Items matchable outside of any other item.
    pub fn background_set(&self) -> SetId {
        self.background
    }

    /// Final membership of a named cluster, e.g. `@cStuff`.
    pub fn cluster_set(&self, name: &str) -> Option<SetId> {
        self.cluster_sets.get(&name.to_uppercase()).copied()
    }

    pub fn group_mode(&self, name: &str) -> Option<HighlightMode> {
        self.groups.find(name).map(|g| self.groups.get(g).mode())
    }

    pub fn group_name(&self, id: GroupId) -> &str {
        self.groups.get(id).name()
    }

    pub fn contexts(&self) -> &[SyntaxContext] {
        &self.contexts
    }

    pub fn keyword_chars(&self) -> &KeywordChars {
        &self.keyword_chars
    }

    pub fn is_keyword_char(&self, c: char) -> bool {
        self.keyword_chars.contains(c)
    }

    /// The highest priority keyword in `active` matching `word`.
    pub(crate) fn find_keyword(&self, word: &str, active: &ItemSet) -> Option<ItemId> {
        let upper = word.to_uppercase();

        let first = match self
            .keywords
            .binary_search_by(|(name, _)| name.as_str().cmp(upper.as_str()))
        {
            Ok(mut idx) => {
                while idx > 0 && self.keywords[idx - 1].0 == upper {
                    idx -= 1;
                }
                idx
            }
            Err(_) if !self.has_partial_keywords => return None,
            Err(idx) => idx,
        };

        let mut best: Option<(usize, ItemId)> = None;
        for (name, id) in &self.keywords[first..] {
            if !name.starts_with(&upper) {
                break;
            }

            let item = &self.items[id.0];
            let ItemKind::Keyword(keyword) = &item.kind else {
                continue;
            };
            if !keyword.is_match(word) {
                continue;
            }

            if let Some(idx) = active.index_of(item) {
                if best.map_or(true, |(best_idx, _)| idx < best_idx) {
                    best = Some((idx, *id));
                }
            }
        }

        best.map(|(_, id)| id)
    }
}

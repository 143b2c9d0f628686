//! # Documents
//!
//! A document is an ordered set of pages plus the editing context around them
//! (active page, selection) and the id counters every page draws from.
//!
//! Pages sit behind `Arc`, so cloning a document for a history snapshot copies
//! only the page table. Editing a page copies that page's node table and the
//! nodes being edited; every other page stays shared.

use crate::{
    linearize, IdSource, Node, NodeId, NodeKind, NodePatch, NodeTree, PageId, Parent, RemovedSubtree,
    SceneGraph, StructuralResult, StructuralViolation,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub name: String,
    /// Ordering key among pages; smaller sorts first
    pub sort: f64,
    pub graph: SceneGraph,
}

impl Page {
    pub fn new(id: PageId, name: impl Into<String>, sort: f64) -> Self {
        Self {
            id,
            name: name.into(),
            sort,
            graph: SceneGraph::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "DocumentRepr", try_from = "DocumentRepr")]
pub struct Document {
    pages: BTreeMap<PageId, Arc<Page>>,
    active_page: Option<PageId>,
    selection: BTreeSet<NodeId>,
    ids: IdSource,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document with one empty page, which is active
    pub fn with_page(name: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.add_page(name);
        doc
    }

    // ---- Pages ----

    pub fn add_page(&mut self, name: impl Into<String>) -> PageId {
        let id = self.ids.next_page();
        let sort = self
            .pages
            .values()
            .map(|p| p.sort)
            .fold(None, |max: Option<f64>, s| Some(max.map_or(s, |m| m.max(s))))
            .map_or(0.0, |m| m + 1.0);

        self.pages.insert(id, Arc::new(Page::new(id, name, sort)));
        if self.active_page.is_none() {
            self.active_page = Some(id);
        }
        tracing::debug!(page = %id, sort, "added page");
        id
    }

    pub fn remove_page(&mut self, id: PageId) -> StructuralResult<Arc<Page>> {
        let page = self.pages.remove(&id).ok_or(StructuralViolation::PageNotFound(id))?;
        if self.active_page == Some(id) {
            self.active_page = self.pages_in_order().first().map(|p| p.id);
            self.selection.clear();
        }
        Ok(page)
    }

    pub fn rename_page(&mut self, id: PageId, name: impl Into<String>) -> StructuralResult<()> {
        self.page_mut(id)?.name = name.into();
        Ok(())
    }

    /// Place `id` directly after `after`, or first when `after` is `None`.
    /// Only the moved page's sort key changes.
    pub fn reorder_page(&mut self, id: PageId, after: Option<PageId>) -> StructuralResult<()> {
        if !self.pages.contains_key(&id) {
            return Err(StructuralViolation::PageNotFound(id));
        }
        if let Some(after) = after {
            if !self.pages.contains_key(&after) {
                return Err(StructuralViolation::PageNotFound(after));
            }
        }
        if after == Some(id) {
            return Ok(());
        }

        let others: Vec<(PageId, f64)> = self
            .pages_in_order()
            .into_iter()
            .filter(|p| p.id != id)
            .map(|p| (p.id, p.sort))
            .collect();

        let slot = match after {
            None => 0,
            Some(after) => others.iter().position(|(pid, _)| *pid == after).map_or(others.len(), |i| i + 1),
        };
        let prev = slot.checked_sub(1).and_then(|i| others.get(i)).map(|(_, s)| *s);
        let next = others.get(slot).map(|(_, s)| *s);

        let sort = match (prev, next) {
            (Some(a), Some(b)) => (a + b) / 2.0,
            (Some(a), None) => a + 1.0,
            (None, Some(b)) => b - 1.0,
            (None, None) => 0.0,
        };
        self.page_mut(id)?.sort = sort;
        Ok(())
    }

    /// Switching pages drops the selection, which only applies to one page
    pub fn set_active_page(&mut self, id: PageId) -> StructuralResult<()> {
        if !self.pages.contains_key(&id) {
            return Err(StructuralViolation::PageNotFound(id));
        }
        if self.active_page != Some(id) {
            self.active_page = Some(id);
            self.selection.clear();
        }
        Ok(())
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id).map(|p| p.as_ref())
    }

    /// Shared handle to a page, for callers that want to check sharing
    pub fn page_shared(&self, id: PageId) -> Option<&Arc<Page>> {
        self.pages.get(&id)
    }

    pub fn page_mut(&mut self, id: PageId) -> StructuralResult<&mut Page> {
        self.pages
            .get_mut(&id)
            .map(Arc::make_mut)
            .ok_or(StructuralViolation::PageNotFound(id))
    }

    /// Pages sorted by sort key, ties broken by id
    pub fn pages_in_order(&self) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self.pages.values().map(|p| p.as_ref()).collect();
        pages.sort_by(|a, b| a.sort.total_cmp(&b.sort).then(a.id.cmp(&b.id)));
        pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn active_page_id(&self) -> Option<PageId> {
        self.active_page
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.active_page.and_then(|id| self.page(id))
    }

    pub fn node_count(&self) -> usize {
        self.pages.values().map(|p| p.graph.len()).sum()
    }

    /// Counters the next node and page ids are drawn from
    pub fn ids(&self) -> &IdSource {
        &self.ids
    }

    /// Never hand out ids at or below those `issued` has reached
    pub fn reserve_ids(&mut self, issued: &IdSource) {
        self.ids.reserve(issued);
    }

    // ---- Nodes ----

    /// A new detached node with a fresh id
    pub fn new_node(&mut self, kind: NodeKind) -> Node {
        Node::new(self.ids.next_node(), kind)
    }

    /// Find the page holding `id`
    pub fn find_node(&self, id: NodeId) -> Option<(PageId, &Node)> {
        self.pages
            .values()
            .find_map(|p| p.graph.get(id).map(|n| (p.id, n)))
    }

    pub fn insert_node(
        &mut self,
        page: PageId,
        parent: Parent,
        node: Node,
        index: Option<usize>,
    ) -> StructuralResult<NodeId> {
        let id = node.id;
        if self.find_node(id).is_some() {
            return Err(StructuralViolation::DuplicateId(id));
        }
        self.page_mut(page)?.graph.insert(parent, node, index)?;
        self.ids.reserve_node(id);
        Ok(id)
    }

    pub fn insert_tree(
        &mut self,
        page: PageId,
        parent: Parent,
        tree: &NodeTree,
        index: Option<usize>,
    ) -> StructuralResult<Vec<NodeId>> {
        let mut ids = self.ids.clone();
        let slot = self
            .pages
            .get_mut(&page)
            .ok_or(StructuralViolation::PageNotFound(page))?;
        let created = Arc::make_mut(slot).graph.insert_tree(parent, tree, index, &mut ids)?;
        self.ids = ids;
        Ok(created)
    }

    pub fn move_node(
        &mut self,
        page: PageId,
        id: NodeId,
        parent: Parent,
        index: Option<usize>,
    ) -> StructuralResult<()> {
        self.require_node(page, id)?;
        self.page_mut(page)?.graph.move_node(id, parent, index)
    }

    pub fn update_node(&mut self, page: PageId, id: NodeId, patch: NodePatch) -> StructuralResult<&Node> {
        self.require_node(page, id)?;
        self.page_mut(page)?.graph.update(id, patch)
    }

    pub fn remove_node(&mut self, page: PageId, id: NodeId) -> StructuralResult<RemovedSubtree> {
        self.require_node(page, id)?;
        self.page_mut(page)?.graph.remove(id)
    }

    pub fn restore_node(&mut self, page: PageId, removed: RemovedSubtree) -> StructuralResult<NodeId> {
        if let Some(taken) = removed.ids().find(|id| self.find_node(*id).is_some()) {
            return Err(StructuralViolation::DuplicateId(taken));
        }
        self.page_mut(page)?.graph.restore(removed)
    }

    // ---- Selection ----

    pub fn selection(&self) -> &BTreeSet<NodeId> {
        &self.selection
    }

    /// Replace the selection. Every id must live on the active page.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = NodeId>) -> StructuralResult<()> {
        let ids: BTreeSet<NodeId> = ids.into_iter().collect();
        let page = self.active_page();
        if let Some(stray) = ids
            .iter()
            .find(|id| !page.is_some_and(|p| p.graph.contains(**id)))
        {
            return Err(StructuralViolation::InvalidSelection(*stray));
        }
        self.selection = ids;
        Ok(())
    }

    /// Drop selected ids that no longer exist on the active page.
    /// Returns the ids that were dropped.
    pub fn prune_selection(&mut self) -> Vec<NodeId> {
        let page = self.active_page.and_then(|id| self.pages.get(&id));
        let stale: Vec<NodeId> = self
            .selection
            .iter()
            .filter(|id| !page.is_some_and(|p| p.graph.contains(**id)))
            .copied()
            .collect();
        for id in &stale {
            self.selection.remove(id);
        }
        stale
    }

    // ---- Merging ----

    /// Append every page of `other` after this document's pages. Pages and
    /// nodes get fresh ids; node structure, order and payloads are kept.
    /// Returns the new page ids in order.
    pub fn absorb(&mut self, other: Document) -> StructuralResult<Vec<PageId>> {
        let mut added = Vec::new();
        let mut staged = self.clone();

        for page in other.pages_in_order() {
            let new_page = staged.add_page(page.name.clone());
            let mut remap: HashMap<NodeId, NodeId> = HashMap::new();

            for id in linearize(&page.graph, Parent::Root).into_iter().map(|f| f.node) {
                remap.insert(id, staged.ids.next_node());
            }

            let mut graph = SceneGraph::new();
            for flat in linearize(&page.graph, Parent::Root) {
                let Some(source) = page.graph.get(flat.node) else {
                    continue;
                };
                let parent = match source.parent {
                    Parent::Root => Parent::Root,
                    Parent::Node(pid) => Parent::Node(remap.get(&pid).copied().unwrap_or(pid)),
                };
                let mut node = source.clone();
                node.id = remap.get(&source.id).copied().unwrap_or(source.id);
                graph.insert(parent, node, None)?;
            }
            staged.page_mut(new_page)?.graph = graph;
            added.push(new_page);
        }

        *self = staged;
        tracing::debug!(pages = added.len(), "absorbed document");
        Ok(added)
    }

    fn require_node(&self, page: PageId, id: NodeId) -> StructuralResult<()> {
        let page = self.page(page).ok_or(StructuralViolation::PageNotFound(page))?;
        if page.graph.contains(id) {
            Ok(())
        } else {
            Err(StructuralViolation::NodeNotFound(id))
        }
    }
}

/// Serialized form: pages as a list in display order
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRepr {
    pages: Vec<Page>,
    #[serde(default)]
    active_page: Option<PageId>,
    #[serde(default)]
    selection: BTreeSet<NodeId>,
    #[serde(default)]
    ids: IdSource,
}

impl From<Document> for DocumentRepr {
    fn from(doc: Document) -> Self {
        let mut pages: Vec<Page> = doc
            .pages
            .into_values()
            .map(|p| Arc::try_unwrap(p).unwrap_or_else(|shared| (*shared).clone()))
            .collect();
        pages.sort_by(|a, b| a.sort.total_cmp(&b.sort).then(a.id.cmp(&b.id)));
        DocumentRepr {
            pages,
            active_page: doc.active_page,
            selection: doc.selection,
            ids: doc.ids,
        }
    }
}

impl TryFrom<DocumentRepr> for Document {
    type Error = StructuralViolation;

    fn try_from(repr: DocumentRepr) -> Result<Self, Self::Error> {
        let mut doc = Document {
            ids: repr.ids,
            ..Document::default()
        };
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        for page in repr.pages {
            for node in page.graph.nodes() {
                if !seen.insert(node.id) {
                    return Err(StructuralViolation::DuplicateId(node.id));
                }
            }
            let id = page.id;
            doc.ids.reserve_page(id);
            if doc.pages.insert(id, Arc::new(page)).is_some() {
                return Err(StructuralViolation::DuplicatePage(id));
            }
        }
        if let Some(max) = seen.iter().next_back() {
            doc.ids.reserve_node(*max);
        }
        if let Some(active) = repr.active_page {
            doc.set_active_page(active)?;
        } else {
            doc.active_page = doc.pages_in_order().first().map(|p| p.id);
        }
        doc.set_selection(repr.selection)?;
        Ok(doc)
    }
}

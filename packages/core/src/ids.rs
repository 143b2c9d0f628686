use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identity, unique within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Sequential id generator for one document.
///
/// Counters only move forward, so an id is never handed out twice even after
/// the node it named has been deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdSource {
    next_node: u64,
    next_page: u64,
}

impl IdSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate next node id
    pub fn next_node(&mut self) -> NodeId {
        self.next_node += 1;
        NodeId(self.next_node)
    }

    /// Generate next page id
    pub fn next_page(&mut self) -> PageId {
        self.next_page += 1;
        PageId(self.next_page)
    }

    /// Make sure ids at or below `id` are never generated
    pub fn reserve_node(&mut self, id: NodeId) {
        self.next_node = self.next_node.max(id.0);
    }

    pub fn reserve_page(&mut self, id: PageId) {
        self.next_page = self.next_page.max(id.0);
    }

    /// Raise both counters to at least `other`'s
    pub fn reserve(&mut self, other: &IdSource) {
        self.next_node = self.next_node.max(other.next_node);
        self.next_page = self.next_page.max(other.next_page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut ids = IdSource::new();

        assert_eq!(ids.next_node(), NodeId(1));
        assert_eq!(ids.next_node(), NodeId(2));
        assert_eq!(ids.next_page(), PageId(1));
    }

    #[test]
    fn test_reserve_skips_taken_ids() {
        let mut ids = IdSource::new();
        ids.reserve_node(NodeId(41));
        assert_eq!(ids.next_node(), NodeId(42));

        // Reserving below the counter never moves it back
        ids.reserve_node(NodeId(3));
        assert_eq!(ids.next_node(), NodeId(43));
    }

    #[test]
    fn test_reserve_takes_higher_counters() {
        let mut behind = IdSource::new();
        behind.next_page();

        let mut ahead = IdSource::new();
        ahead.reserve_node(NodeId(9));

        behind.reserve(&ahead);
        assert_eq!(behind.next_node(), NodeId(10));
        assert_eq!(behind.next_page(), PageId(2));
    }
}

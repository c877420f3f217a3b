//! Namespace delegation: a namespace index is either served by the local [`crate::store`], or
//! handed off wholesale to an [`ExternalNodeStore`] the embedder plugs in. Every service that
//! walks a batch of items first partitions by namespace, dispatches each partition to the owning
//! store, then merges results back into the caller's original order.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::Result,
    ua::{self, DataValue, NodeId, NumericRange, QualifiedName},
};

/// One item of a batched Read request.
#[derive(Debug, Clone)]
pub struct ReadValueId {
    pub node_id: NodeId,
    pub attribute_id: ua::AttributeId,
    pub range: Option<NumericRange>,
}

/// One item of a batched Write request.
#[derive(Debug, Clone)]
pub struct WriteValue {
    pub node_id: NodeId,
    pub attribute_id: ua::AttributeId,
    pub range: Option<NumericRange>,
    pub value: DataValue,
}

/// A relative path to resolve against a starting node, as used by TranslateBrowsePathsToNodeIds.
#[derive(Debug, Clone)]
pub struct BrowsePath {
    pub starting_node: NodeId,
    pub relative_path: Vec<QualifiedName>,
}

/// One item of a batched AddNodes request.
#[derive(Debug, Clone)]
pub struct AddNodesItem {
    pub namespace_index: u16,
    pub parent_node_id: NodeId,
    pub reference_type_id: NodeId,
    pub requested_new_node_id: Option<NodeId>,
    pub browse_name: QualifiedName,
    pub type_definition: Option<NodeId>,
    pub attributes: ua::NodeAttributes,
}

/// A namespace delegated entirely to an external implementation: everything from reads to node
/// management goes through this interface instead of the in-process node store.
///
/// Every method is batched: implementors receive the whole slice owned by their namespace in one
/// call and return one result per input item, in the same order. A failure on one item must not
/// fail the others in the same batch.
pub trait ExternalNodeStore: Send + Sync {
    fn read(&self, items: &[ReadValueId]) -> Vec<Result<DataValue>>;

    fn write(&self, items: &[WriteValue]) -> Vec<Result<()>>;

    fn browse(&self, node_ids: &[NodeId]) -> Vec<Result<Vec<crate::node::Reference>>>;

    fn translate_browse_paths_to_node_ids(&self, paths: &[BrowsePath]) -> Vec<Result<Vec<NodeId>>>;

    fn add_nodes(&self, items: &[AddNodesItem]) -> Vec<Result<NodeId>>;

    fn delete_nodes(&self, node_ids: &[NodeId]) -> Vec<Result<()>>;
}

/// Either the local store, or a delegate for an entire namespace index.
#[derive(Clone)]
pub enum NamespaceEntry {
    Local,
    External(Arc<dyn ExternalNodeStore>),
}

impl std::fmt::Debug for NamespaceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "Local"),
            Self::External(_) => write!(f, "External"),
        }
    }
}

/// Maps namespace indices to whichever store owns them. Namespace 0, and any namespace not
/// explicitly registered, is always local.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    entries: HashMap<u16, NamespaceEntry>,
}

impl NamespaceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegates `namespace_index` to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ArgumentInvalid`](crate::error::ErrorKind::ArgumentInvalid) for
    /// namespace 0: the standard information model must always be local.
    pub fn register_external(
        &mut self,
        namespace_index: u16,
        store: Arc<dyn ExternalNodeStore>,
    ) -> Result<()> {
        if namespace_index == ua::NS0 {
            return Err(crate::error::Error::argument_invalid(
                "namespace 0 cannot be delegated externally",
            ));
        }
        self.entries
            .insert(namespace_index, NamespaceEntry::External(store));
        Ok(())
    }

    #[must_use]
    pub fn is_local(&self, namespace_index: u16) -> bool {
        matches!(self.entry(namespace_index), NamespaceEntry::Local)
    }

    #[must_use]
    pub fn external(&self, namespace_index: u16) -> Option<Arc<dyn ExternalNodeStore>> {
        match self.entry(namespace_index) {
            NamespaceEntry::External(store) => Some(store),
            NamespaceEntry::Local => None,
        }
    }

    fn entry(&self, namespace_index: u16) -> NamespaceEntry {
        self.entries
            .get(&namespace_index)
            .cloned()
            .unwrap_or(NamespaceEntry::Local)
    }

    /// Splits `items` into the subset owned by the local store and the subsets owned by each
    /// external store, preserving each item's position in the original slice so the caller can
    /// merge results back in order.
    pub fn partition<T>(
        &self,
        items: Vec<T>,
        namespace_of: impl Fn(&T) -> u16,
    ) -> Partition<T> {
        let mut local = Vec::new();
        let mut external: HashMap<u16, (Arc<dyn ExternalNodeStore>, Vec<(usize, T)>)> =
            HashMap::new();
        for (index, item) in items.into_iter().enumerate() {
            match self.entry(namespace_of(&item)) {
                NamespaceEntry::Local => local.push((index, item)),
                NamespaceEntry::External(store) => {
                    external
                        .entry(namespace_of(&item))
                        .or_insert_with(|| (store, Vec::new()))
                        .1
                        .push((index, item));
                }
            }
        }
        Partition { local, external }
    }
}

/// The result of [`NamespaceTable::partition`]: items grouped by owning store, each tagged with
/// its original index for merging results back in order.
pub struct Partition<T> {
    pub local: Vec<(usize, T)>,
    pub external: HashMap<u16, (Arc<dyn ExternalNodeStore>, Vec<(usize, T)>)>,
}

impl<T> Partition<T> {
    /// Reassembles per-item results, keyed by `(original_index, result)` pairs from the local and
    /// each external dispatch, back into one vector in the caller's original order.
    ///
    /// # Panics
    ///
    /// Panics if the combined result count does not match `len`, which would indicate a store
    /// implementation dropped or duplicated an item — an internal invariant violation, not a
    /// reportable runtime error.
    #[must_use]
    pub fn merge<R>(len: usize, groups: Vec<Vec<(usize, R)>>) -> Vec<R> {
        let mut slots: Vec<Option<R>> = (0..len).map(|_| None).collect();
        for group in groups {
            for (index, result) in group {
                slots[index] = Some(result);
            }
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or_else(|| panic!("partition dropped item {index}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyStore;

    impl ExternalNodeStore for EmptyStore {
        fn read(&self, items: &[ReadValueId]) -> Vec<Result<DataValue>> {
            items
                .iter()
                .map(|_| Err(crate::error::Error::lookup_miss("no such node")))
                .collect()
        }

        fn write(&self, items: &[WriteValue]) -> Vec<Result<()>> {
            items
                .iter()
                .map(|_| Err(crate::error::Error::not_writable("read-only store")))
                .collect()
        }

        fn browse(&self, node_ids: &[NodeId]) -> Vec<Result<Vec<crate::node::Reference>>> {
            node_ids.iter().map(|_| Ok(Vec::new())).collect()
        }

        fn translate_browse_paths_to_node_ids(
            &self,
            paths: &[BrowsePath],
        ) -> Vec<Result<Vec<NodeId>>> {
            paths.iter().map(|_| Ok(Vec::new())).collect()
        }

        fn add_nodes(&self, items: &[AddNodesItem]) -> Vec<Result<NodeId>> {
            items
                .iter()
                .map(|_| Err(crate::error::Error::not_supported("read-only store")))
                .collect()
        }

        fn delete_nodes(&self, node_ids: &[NodeId]) -> Vec<Result<()>> {
            node_ids
                .iter()
                .map(|_| Err(crate::error::Error::not_supported("read-only store")))
                .collect()
        }
    }

    #[test]
    fn namespace_zero_cannot_be_delegated() {
        let mut table = NamespaceTable::new();
        assert!(table.register_external(0, Arc::new(EmptyStore)).is_err());
    }

    #[test]
    fn partition_routes_by_registered_namespace() {
        let mut table = NamespaceTable::new();
        table.register_external(2, Arc::new(EmptyStore)).unwrap();

        let items = vec![NodeId::numeric(1, 1), NodeId::numeric(2, 1), NodeId::numeric(1, 2)];
        let partition = table.partition(items, NodeId::namespace_index);

        assert_eq!(partition.local.len(), 2);
        assert_eq!(partition.external.len(), 1);
        assert!(partition.external.contains_key(&2));
    }

    #[test]
    fn merge_restores_original_order() {
        let groups = vec![
            vec![(0usize, "a"), (2, "c")],
            vec![(1usize, "b")],
        ];
        assert_eq!(Partition::<()>::merge(3, groups), vec!["a", "b", "c"]);
    }
}

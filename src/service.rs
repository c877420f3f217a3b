//! Batched service glue: partitions each request across namespaces, dispatches local items to
//! the [`crate::store::NodeStore`] and external items to their delegate, and merges results back
//! in the caller's original order. No item in a batch fails the others.

use crate::{
    error::{Error, Result},
    external_namespace::{AddNodesItem, BrowsePath, Partition, ReadValueId, WriteValue},
    node::Reference,
    runtime::Server,
    ua::{self, DataValue, NodeId, Variant},
};

/// The result of a Call service invocation: per-input validation statuses plus the method's
/// output arguments (empty if any input failed validation).
#[derive(Debug, Clone)]
pub struct CallResult {
    pub input_argument_results: Vec<ua::StatusCode>,
    pub output_arguments: Vec<Variant>,
}

/// Reads a batch of attributes, routing each item to whichever namespace owns its node id.
pub fn read(server: &Server, items: Vec<ReadValueId>, include_source_timestamp: bool) -> Vec<Result<DataValue>> {
    let len = items.len();
    let partition = server
        .namespaces
        .read()
        .partition(items, |item| item.node_id.namespace_index());

    let local: Vec<(usize, Result<DataValue>)> = partition
        .local
        .into_iter()
        .map(|(index, item)| {
            let result = server.store.read_attribute(
                &item.node_id,
                item.attribute_id,
                item.range.as_ref(),
                include_source_timestamp,
            );
            (index, result)
        })
        .collect();

    let mut groups = vec![local];
    for (store, items) in partition.external.into_values() {
        let (indices, requests): (Vec<usize>, Vec<ReadValueId>) = items.into_iter().unzip();
        let results = store.read(&requests);
        groups.push(indices.into_iter().zip(results).collect());
    }
    Partition::merge(len, groups)
}

/// Writes a batch of attributes, routing each item to whichever namespace owns its node id.
pub fn write(server: &Server, items: Vec<WriteValue>) -> Vec<Result<()>> {
    let len = items.len();
    let partition = server
        .namespaces
        .read()
        .partition(items, |item| item.node_id.namespace_index());

    let local: Vec<(usize, Result<()>)> = partition
        .local
        .into_iter()
        .map(|(index, item)| {
            let result = server.store.write_attribute(
                &item.node_id,
                item.attribute_id,
                item.range.as_ref(),
                item.value.into_value(),
            );
            (index, result)
        })
        .collect();

    let mut groups = vec![local];
    for (store, items) in partition.external.into_values() {
        let (indices, requests): (Vec<usize>, Vec<WriteValue>) = items.into_iter().unzip();
        let results = store.write(&requests);
        groups.push(indices.into_iter().zip(results).collect());
    }
    Partition::merge(len, groups)
}

/// Browses a batch of nodes, returning each node's outgoing references.
pub fn browse(server: &Server, node_ids: Vec<NodeId>) -> Vec<Result<Vec<Reference>>> {
    let len = node_ids.len();
    let partition = server
        .namespaces
        .read()
        .partition(node_ids, NodeId::namespace_index);

    let local: Vec<(usize, Result<Vec<Reference>>)> = partition
        .local
        .into_iter()
        .map(|(index, node_id)| (index, server.store.browse(&node_id)))
        .collect();

    let mut groups = vec![local];
    for (store, items) in partition.external.into_values() {
        let (indices, requests): (Vec<usize>, Vec<NodeId>) = items.into_iter().unzip();
        let results = store.browse(&requests);
        groups.push(indices.into_iter().zip(results).collect());
    }
    Partition::merge(len, groups)
}

/// Resolves a batch of relative browse paths to concrete node ids.
pub fn translate_browse_paths_to_node_ids(
    server: &Server,
    paths: Vec<BrowsePath>,
) -> Vec<Result<Vec<NodeId>>> {
    let len = paths.len();
    let partition = server
        .namespaces
        .read()
        .partition(paths, |path| path.starting_node.namespace_index());

    let local: Vec<(usize, Result<Vec<NodeId>>)> = partition
        .local
        .into_iter()
        .map(|(index, path)| {
            let resolved = path.relative_path.iter().try_fold(
                path.starting_node,
                |current, element| server.store.resolve_child_by_browse_name(&current, element),
            );
            (index, resolved.map(|node_id| vec![node_id]))
        })
        .collect();

    let mut groups = vec![local];
    for (store, items) in partition.external.into_values() {
        let (indices, requests): (Vec<usize>, Vec<BrowsePath>) = items.into_iter().unzip();
        let results = store.translate_browse_paths_to_node_ids(&requests);
        groups.push(indices.into_iter().zip(results).collect());
    }
    Partition::merge(len, groups)
}

/// Adds a batch of nodes, routing each by its requested id's namespace (or, if none was
/// requested, the namespace the caller asked the new node to be assigned into).
pub fn add_nodes(server: &Server, items: Vec<AddNodesItem>) -> Vec<Result<NodeId>> {
    let len = items.len();
    let partition = server.namespaces.read().partition(items, |item| {
        item.requested_new_node_id
            .as_ref()
            .map_or(item.namespace_index, NodeId::namespace_index)
    });

    let local: Vec<(usize, Result<NodeId>)> = partition
        .local
        .into_iter()
        .map(|(index, item)| {
            let result = server.store.add_node(
                item.namespace_index,
                &item.parent_node_id,
                &item.reference_type_id,
                item.requested_new_node_id,
                item.browse_name,
                item.type_definition,
                item.attributes,
            );
            (index, result)
        })
        .collect();

    let mut groups = vec![local];
    for (store, items) in partition.external.into_values() {
        let (indices, requests): (Vec<usize>, Vec<AddNodesItem>) = items.into_iter().unzip();
        let results = store.add_nodes(&requests);
        groups.push(indices.into_iter().zip(results).collect());
    }
    Partition::merge(len, groups)
}

/// Deletes a batch of nodes, routing each by its own namespace.
pub fn delete_nodes(server: &Server, node_ids: Vec<NodeId>) -> Vec<Result<()>> {
    let len = node_ids.len();
    let partition = server
        .namespaces
        .read()
        .partition(node_ids, NodeId::namespace_index);

    let local: Vec<(usize, Result<()>)> = partition
        .local
        .into_iter()
        .map(|(index, node_id)| (index, server.store.delete_node(&node_id)))
        .collect();

    let mut groups = vec![local];
    for (store, items) in partition.external.into_values() {
        let (indices, requests): (Vec<usize>, Vec<NodeId>) = items.into_iter().unzip();
        let results = store.delete_nodes(&requests);
        groups.push(indices.into_iter().zip(results).collect());
    }
    Partition::merge(len, groups)
}

/// Calls a method on an object. Only supported for objects in a local namespace; external
/// namespaces own their own method dispatch outside this interface.
///
/// # Errors
///
/// [`ErrorKind::NotSupported`](crate::error::ErrorKind::NotSupported) if `object_id` belongs to
/// an externally-delegated namespace; otherwise whatever
/// [`crate::store::NodeStore::call_method`] returns.
pub fn call(
    server: &Server,
    object_id: &NodeId,
    method_id: &NodeId,
    inputs: &[Variant],
) -> Result<CallResult> {
    if !server.namespaces.read().is_local(object_id.namespace_index()) {
        return Err(Error::not_supported(
            "method calls are not supported on externally-delegated namespaces",
        ));
    }
    let (output_arguments, input_argument_results) =
        server.store.call_method(object_id, method_id, inputs)?;
    Ok(CallResult {
        input_argument_results,
        output_arguments,
    })
}

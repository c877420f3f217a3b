//! The local address space: a map of [`NodeId`] to [`Node`], guarded by one
//! [`parking_lot::RwLock`] for the whole store. Reads (Read service calls, browsing) take the
//! read lock and run concurrently; structural changes (AddNodes, AddReferences, DeleteNodes,
//! writes) take the write lock.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    error::{Error, Result},
    node::{
        MethodNode, Node, NodeHeader, NodePayload, ObjectInstanceManagement, ObjectNode,
        ObjectTypeNode, Reference, ValueSource,
    },
    ua::{self, AttributeId, DataValue, NodeAttributes, NodeId, NumericRange, Variant},
    value_access::{DataSourceReadContext, DataSourceWriteContext, ValueCallback},
};

/// `ns=0;i=40`, `HasTypeDefinition`.
pub const HAS_TYPE_DEFINITION: NodeId = NodeId::ns0(40);
/// `ns=0;i=45`, `HasSubtype`.
pub const HAS_SUBTYPE: NodeId = NodeId::ns0(45);
/// `ns=0;i=35`, `Organizes`.
pub const ORGANIZES: NodeId = NodeId::ns0(35);
/// `ns=0;i=84`, `Root`, the one node every address space is seeded with and that has no parent.
pub const ROOT_FOLDER: NodeId = NodeId::ns0(84);
/// `ns=0;i=85`, `Objects`, organized under [`ROOT_FOLDER`].
pub const OBJECTS_FOLDER: NodeId = NodeId::ns0(85);
/// `ns=0;i=58`, `BaseObjectType`, the root of the object type hierarchy.
pub const BASE_OBJECT_TYPE: NodeId = NodeId::ns0(58);
/// `ns=0;i=61`, `FolderType`, the type `ROOT_FOLDER`/`OBJECTS_FOLDER` instantiate.
pub const FOLDER_TYPE: NodeId = NodeId::ns0(61);

struct StoreInner {
    nodes: HashMap<NodeId, Node>,
    next_numeric_id: HashMap<u16, u32>,
}

/// The in-process node store. Cheap to clone (wraps an `Arc`-like lock internally via the
/// runtime, which owns exactly one instance and hands out `&NodeStore` references).
pub struct NodeStore {
    inner: RwLock<StoreInner>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates a store seeded with the standard root of the address space: `Root` (`i=84`),
    /// organizing `Objects` (`i=85`), plus `BaseObjectType` (`i=58`) for instances to type
    /// themselves on. Every other node an embedder adds descends from one of these three.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_FOLDER, folder_node(ROOT_FOLDER, "Root"));
        nodes.insert(OBJECTS_FOLDER, folder_node(OBJECTS_FOLDER, "Objects"));
        nodes.insert(BASE_OBJECT_TYPE, base_object_type_node());

        if let Some(root) = nodes.get_mut(&ROOT_FOLDER) {
            root.references.push(Reference {
                reference_type_id: ORGANIZES,
                target_id: OBJECTS_FOLDER.into(),
                is_forward: true,
            });
        }
        if let Some(objects) = nodes.get_mut(&OBJECTS_FOLDER) {
            objects.references.push(Reference {
                reference_type_id: ORGANIZES,
                target_id: ROOT_FOLDER.into(),
                is_forward: false,
            });
            objects.references.push(Reference {
                reference_type_id: HAS_TYPE_DEFINITION,
                target_id: FOLDER_TYPE.into(),
                is_forward: true,
            });
        }

        Self {
            inner: RwLock::new(StoreInner {
                nodes,
                next_numeric_id: HashMap::new(),
            }),
        }
    }

    /// Adds one node under `parent`, linked by `reference_type_id`, with an inverse reference
    /// added automatically on the new node (data model invariant: references exist in both
    /// directions as distinct entries). Assigns a fresh numeric id in `namespace_index` when
    /// `requested_new_node_id` is `None`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::LookupMiss`](crate::error::ErrorKind::LookupMiss) if `parent` does not exist.
    /// - [`ErrorKind::AlreadyExists`](crate::error::ErrorKind::AlreadyExists) if the requested id
    ///   is already taken.
    /// - [`ErrorKind::ArgumentInvalid`](crate::error::ErrorKind::ArgumentInvalid) if the node
    ///   class requires a type definition (Variable, Object) and none was given.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node(
        &self,
        namespace_index: u16,
        parent: &NodeId,
        reference_type_id: &NodeId,
        requested_new_node_id: Option<NodeId>,
        browse_name: ua::QualifiedName,
        type_definition: Option<NodeId>,
        attributes: NodeAttributes,
    ) -> Result<NodeId> {
        if attributes.requires_type_definition() && type_definition.is_none() {
            return Err(Error::argument_invalid(
                "Variable and Object nodes require a type definition reference",
            ));
        }

        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(parent) {
            return Err(Error::lookup_miss(format!("parent {parent} not found")));
        }

        let node_id = match requested_new_node_id {
            Some(id) if inner.nodes.contains_key(&id) => {
                return Err(Error::already_exists(format!("node {id} already exists")));
            }
            Some(id) => id,
            None => {
                let counter = inner.next_numeric_id.entry(namespace_index).or_insert(1000);
                let id = NodeId::numeric(namespace_index, *counter);
                *counter += 1;
                id
            }
        };

        let common = attributes.common().clone();
        let node_class = attributes.node_class();
        let payload = payload_from_attributes(attributes)?;

        let mut node = Node {
            header: NodeHeader {
                node_id: node_id.clone(),
                node_class,
                browse_name,
                display_name: common.display_name,
                description: common.description,
                write_mask: common.write_mask,
                user_write_mask: common.user_write_mask,
            },
            references: Vec::new(),
            payload,
        };
        node.references.push(Reference {
            reference_type_id: reference_type_id.clone(),
            target_id: parent.clone().into(),
            is_forward: false,
        });
        if let Some(type_definition) = &type_definition {
            node.references.push(Reference {
                reference_type_id: HAS_TYPE_DEFINITION,
                target_id: type_definition.clone().into(),
                is_forward: true,
            });
        }

        inner.nodes.insert(node_id.clone(), node);
        if let Some(parent_node) = inner.nodes.get_mut(parent) {
            parent_node.references.push(Reference {
                reference_type_id: reference_type_id.clone(),
                target_id: node_id.clone().into(),
                is_forward: true,
            });
        }

        if let Some(type_definition) = type_definition {
            let instance_management = find_instance_management(&inner.nodes, &type_definition);
            if let Some(instance_management) = instance_management {
                run_constructor(&mut inner.nodes, &node_id, &instance_management);
            }
        }

        log::debug!("added node {node_id}");
        Ok(node_id)
    }

    /// Adds a single reference from `source` to `target`, in the direction `is_forward`
    /// indicates. Callers add both directions explicitly as two calls, matching the wire-level
    /// AddReferences service.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::LookupMiss`](crate::error::ErrorKind::LookupMiss) if `source` does not
    ///   exist, or `target` does not exist and is a local node id.
    pub fn add_reference(
        &self,
        source: &NodeId,
        reference_type_id: &NodeId,
        target: &ua::ExpandedNodeId,
        is_forward: bool,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        if target.is_local() && !inner.nodes.contains_key(target.node_id()) {
            return Err(Error::lookup_miss(format!(
                "reference target {} not found",
                target.node_id()
            )));
        }
        let node = inner
            .nodes
            .get_mut(source)
            .ok_or_else(|| Error::lookup_miss(format!("node {source} not found")))?;
        node.references.push(Reference {
            reference_type_id: reference_type_id.clone(),
            target_id: target.clone(),
            is_forward,
        });
        Ok(())
    }

    /// Deletes a node. Standard (namespace 0) nodes cannot be deleted.
    ///
    /// Also performs a best-effort sweep removing any other node's reference that targets the
    /// deleted node; a reference left dangling because the sweep missed a concurrently-added edge
    /// is tolerated, not treated as corruption.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::LookupMiss`](crate::error::ErrorKind::LookupMiss) if `node_id` does not
    ///   exist.
    /// - [`ErrorKind::NotSupported`](crate::error::ErrorKind::NotSupported) for a namespace-0
    ///   node.
    pub fn delete_node(&self, node_id: &NodeId) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get(node_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {node_id} not found")))?;
        if node.is_standard() {
            return Err(Error::not_supported("standard nodes cannot be deleted"));
        }

        if matches!(node.payload, NodePayload::Object(_)) {
            let type_definition = node
                .references
                .iter()
                .find(|r| r.reference_type_id == HAS_TYPE_DEFINITION && r.is_forward)
                .map(|r| r.target_id.node_id().clone());
            let instance_management =
                type_definition.and_then(|td| find_instance_management(&inner.nodes, &td));
            if let Some(instance_management) = instance_management {
                let handle = inner.nodes.get_mut(node_id).and_then(|node| {
                    node.as_object_mut().and_then(|o| o.instance_handle.take())
                });
                instance_management.destructor(node_id, handle);
            }
        }

        inner.nodes.remove(node_id);
        for other in inner.nodes.values_mut() {
            other
                .references
                .retain(|reference| reference.target_id.node_id() != node_id);
        }
        log::debug!("deleted node {node_id}");
        Ok(())
    }

    /// All targets of forward references from `parent`, in insertion order, optionally filtered
    /// to one reference type.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::LookupMiss`](crate::error::ErrorKind::LookupMiss) if `parent` does not exist.
    pub fn for_each_child(
        &self,
        parent: &NodeId,
        reference_type_id: Option<&NodeId>,
    ) -> Result<Vec<NodeId>> {
        let inner = self.inner.read();
        let node = inner
            .nodes
            .get(parent)
            .ok_or_else(|| Error::lookup_miss(format!("node {parent} not found")))?;
        Ok(node
            .references
            .iter()
            .filter(|r| r.is_forward)
            .filter(|r| reference_type_id.is_none_or(|rt| *rt == r.reference_type_id))
            .filter(|r| r.target_id.is_local())
            .map(|r| r.target_id.node_id().clone())
            .collect())
    }

    /// Finds the forward-reference target of `parent` whose `BrowseName` matches, the single
    /// hop `translate_browse_paths_to_node_ids` repeats for each element of a relative path.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::LookupMiss`](crate::error::ErrorKind::LookupMiss) if `parent` does not exist,
    /// or no forward-referenced child has that browse name.
    pub fn resolve_child_by_browse_name(
        &self,
        parent: &NodeId,
        browse_name: &ua::QualifiedName,
    ) -> Result<NodeId> {
        let inner = self.inner.read();
        let node = inner
            .nodes
            .get(parent)
            .ok_or_else(|| Error::lookup_miss(format!("node {parent} not found")))?;
        node.references
            .iter()
            .filter(|r| r.is_forward && r.target_id.is_local())
            .find_map(|r| {
                let target = inner.nodes.get(r.target_id.node_id())?;
                (target.header.browse_name == *browse_name).then(|| r.target_id.node_id().clone())
            })
            .ok_or_else(|| {
                Error::lookup_miss(format!("no child of {parent} named {browse_name:?}"))
            })
    }

    #[must_use]
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.inner.read().nodes.contains_key(node_id)
    }

    /// All outgoing and inverse references stored directly on `node_id`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::LookupMiss`](crate::error::ErrorKind::LookupMiss) if `node_id` does not
    /// exist.
    pub fn browse(&self, node_id: &NodeId) -> Result<Vec<Reference>> {
        let inner = self.inner.read();
        let node = inner
            .nodes
            .get(node_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {node_id} not found")))?;
        Ok(node.references.clone())
    }

    /// Reads one attribute of a node.
    ///
    /// For the `Value` attribute of a Variable, this dispatches to the node's
    /// [`crate::value_access::DataSource`] if one is set, applies `range` if given, runs the
    /// node's [`ValueCallback::on_read`] hook, then stamps the result's timestamps — in that
    /// order, regardless of which timestamps the caller asked for.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::LookupMiss`](crate::error::ErrorKind::LookupMiss) if the node does not
    ///   exist.
    /// - [`ErrorKind::TypeMismatch`](crate::error::ErrorKind::TypeMismatch) if `Value` is read on
    ///   a non-value-bearing node class.
    /// - Whatever a [`crate::value_access::DataSource`] read returns.
    pub fn read_attribute(
        &self,
        node_id: &NodeId,
        attribute_id: AttributeId,
        range: Option<&NumericRange>,
        include_source_timestamp: bool,
    ) -> Result<DataValue> {
        let inner = self.inner.read();
        let node = inner
            .nodes
            .get(node_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {node_id} not found")))?;

        if attribute_id != AttributeId::Value {
            return Ok(DataValue::good(read_header_attribute(node, attribute_id)?).stamped());
        }

        let (value, callback) = match &node.payload {
            NodePayload::Variable(variable) => {
                let value = read_value_source(&variable.value_source, node_id, range, include_source_timestamp)?;
                (value, variable.value_callback.clone())
            }
            NodePayload::VariableType(variable_type) => {
                let value = ranged_value(&variable_type.value, range)?;
                (DataValue::good(value), None)
            }
            _ => {
                return Err(Error::type_mismatch(
                    "Value attribute is only defined for Variable and VariableType nodes",
                ));
            }
        };

        if let Some(callback) = callback {
            callback.on_read(node_id, &value);
        }
        Ok(value.stamped())
    }

    /// Writes the `Value` attribute of a Variable. All other attributes are either structurally
    /// immutable, unmanaged by this core, or derived from the value — see [`AttributeId`] — and
    /// are rejected.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotWritable`](crate::error::ErrorKind::NotWritable) /
    ///   [`ErrorKind::NotSupported`](crate::error::ErrorKind::NotSupported) per the attribute
    ///   category above.
    /// - [`ErrorKind::TypeMismatch`](crate::error::ErrorKind::TypeMismatch) if the written value's
    ///   type does not match the variable's current value.
    pub fn write_attribute(
        &self,
        node_id: &NodeId,
        attribute_id: AttributeId,
        range: Option<&NumericRange>,
        value: Variant,
    ) -> Result<()> {
        if attribute_id.is_structurally_immutable() {
            return Err(Error::not_writable(format!(
                "{attribute_id:?} is structurally immutable"
            )));
        }
        if attribute_id.is_derived_from_value() {
            return Err(Error::not_writable(format!(
                "{attribute_id:?} is derived from the current value"
            )));
        }
        if attribute_id.is_unmanaged_for_write() || attribute_id != AttributeId::Value {
            return Err(Error::not_supported(format!(
                "{attribute_id:?} is not independently writable by this core"
            )));
        }

        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {node_id} not found")))?;
        let NodePayload::Variable(variable) = &mut node.payload else {
            return Err(Error::type_mismatch("Value write target is not a Variable"));
        };
        if !variable.access_level.contains(ua::AccessLevel::CURRENT_WRITE) {
            return Err(Error::not_writable("variable is not writable"));
        }

        let committed = match &mut variable.value_source {
            ValueSource::Inline(current) => {
                let committed = match range {
                    Some(range) => {
                        let mut array = current
                            .as_array()
                            .ok_or_else(|| {
                                Error::range_invalid("numeric range write against a scalar value")
                            })?
                            .to_vec();
                        let incoming = value.as_array().ok_or_else(|| {
                            Error::range_invalid("numeric range write requires an array value")
                        })?;
                        range.splice(&mut array, incoming)?;
                        Variant::array(array)
                    }
                    None => {
                        if !current.is_empty() && !current.is_type_compatible_with(&value) {
                            return Err(Error::type_mismatch(
                                "written value's type does not match the variable's current value",
                            ));
                        }
                        value
                    }
                };
                *current = committed.clone();
                committed
            }
            ValueSource::DataSource(data_source) => {
                let data_value = DataValue::good(value);
                let ctx = DataSourceWriteContext {
                    node_id,
                    range,
                    value: &data_value,
                };
                data_source.write(&ctx)?;
                data_value.into_value()
            }
        };

        let callback = variable.value_callback.clone();
        let committed_data_value = DataValue::good(committed).stamped();
        if let Some(callback) = callback {
            callback.on_write(node_id, &committed_data_value);
        }
        Ok(())
    }

    /// Attaches (or replaces) the constructor/destructor pair instances of `object_type` use.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TypeMismatch`](crate::error::ErrorKind::TypeMismatch) if `object_type` is not
    /// an ObjectType node.
    pub fn set_object_instance_management(
        &self,
        object_type: &NodeId,
        instance_management: Arc<dyn ObjectInstanceManagement>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(object_type)
            .ok_or_else(|| Error::lookup_miss(format!("node {object_type} not found")))?;
        let NodePayload::ObjectType(object_type) = &mut node.payload else {
            return Err(Error::type_mismatch("not an ObjectType node"));
        };
        object_type.instance_management = Some(instance_management);
        Ok(())
    }

    /// Invokes a Method node's callback, validating each input argument against the method's
    /// declared [`ua::Argument`] descriptors first.
    ///
    /// Per-argument validation failures are reported in the returned status vector rather than
    /// as an overall error, matching the wire service's per-input result array; a structural
    /// problem (wrong argument count, method not callable at all) is returned as an `Err`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::LookupMiss`](crate::error::ErrorKind::LookupMiss) if either id is unknown.
    /// - [`ErrorKind::TypeMismatch`](crate::error::ErrorKind::TypeMismatch) if `method_id` is not
    ///   a Method node, or is not referenced by `object_id`.
    /// - [`ErrorKind::NotWritable`](crate::error::ErrorKind::NotWritable) if the method is not
    ///   executable.
    /// - [`ErrorKind::ArgumentInvalid`](crate::error::ErrorKind::ArgumentInvalid) if the input
    ///   count does not match the method's declared inputs.
    pub fn call_method(
        &self,
        object_id: &NodeId,
        method_id: &NodeId,
        inputs: &[Variant],
    ) -> Result<(Vec<Variant>, Vec<ua::StatusCode>)> {
        let inner = self.inner.read();
        let object = inner
            .nodes
            .get(object_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {object_id} not found")))?;
        let node = inner
            .nodes
            .get(method_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {method_id} not found")))?;
        let NodePayload::Method(method) = &node.payload else {
            return Err(Error::type_mismatch("not a Method node"));
        };
        let is_referenced = object
            .references
            .iter()
            .any(|r| r.is_forward && r.target_id.node_id() == method_id);
        if !is_referenced {
            return Err(Error::type_mismatch(format!(
                "method {method_id} is not referenced by object {object_id}"
            )));
        }
        if !method.executable || !method.user_executable {
            return Err(Error::not_writable("method is not executable"));
        }
        if inputs.len() != method.input_arguments.len() {
            return Err(Error::argument_invalid(format!(
                "expected {} input arguments, got {}",
                method.input_arguments.len(),
                inputs.len()
            )));
        }

        let mut statuses = Vec::with_capacity(inputs.len());
        let mut all_good = true;
        for (argument, input) in method.input_arguments.iter().zip(inputs) {
            let matches = input
                .data_type()
                .is_none_or(|data_type| data_type == *argument.data_type());
            if matches {
                statuses.push(ua::StatusCode::GOOD);
            } else {
                all_good = false;
                statuses.push(ua::StatusCode::BAD_TYPE_MISMATCH);
            }
        }
        if !all_good {
            return Ok((Vec::new(), statuses));
        }

        let Some(callback) = method.callback.clone() else {
            return Err(Error::not_supported("method has no callback attached"));
        };
        drop(inner);
        let outputs = callback.call(object_id, inputs)?;
        Ok((outputs, statuses))
    }

    /// Attaches a callback to a Method node.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TypeMismatch`](crate::error::ErrorKind::TypeMismatch) if `method_id` is not a
    /// Method node.
    pub fn set_method_callback(
        &self,
        method_id: &NodeId,
        callback: Arc<dyn crate::node::MethodCallback>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(method_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {method_id} not found")))?;
        let NodePayload::Method(method) = &mut node.payload else {
            return Err(Error::type_mismatch("not a Method node"));
        };
        method.callback = Some(callback);
        Ok(())
    }

    /// Switches a Variable's value source to `data_source`, replacing whatever inline value or
    /// prior data source it had (data model: exactly one of {inline, data source} backs a
    /// variable's value at a time).
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TypeMismatch`](crate::error::ErrorKind::TypeMismatch) if `node_id` is not a
    /// Variable node.
    pub fn set_data_source(
        &self,
        node_id: &NodeId,
        data_source: Box<dyn crate::value_access::DataSource>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {node_id} not found")))?;
        let variable = node
            .as_variable_mut()
            .ok_or_else(|| Error::type_mismatch("not a Variable node"))?;
        variable.value_source = ValueSource::DataSource(data_source);
        Ok(())
    }

    /// Attaches (or replaces) the [`ValueCallback`] of a Variable node.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TypeMismatch`](crate::error::ErrorKind::TypeMismatch) if `node_id` is not a
    /// Variable node.
    pub fn set_value_callback(
        &self,
        node_id: &NodeId,
        callback: Arc<dyn ValueCallback>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| Error::lookup_miss(format!("node {node_id} not found")))?;
        let variable = node
            .as_variable_mut()
            .ok_or_else(|| Error::type_mismatch("not a Variable node"))?;
        variable.value_callback = Some(callback);
        Ok(())
    }
}

fn folder_node(node_id: NodeId, name: &str) -> Node {
    Node {
        header: NodeHeader {
            node_id: node_id.clone(),
            node_class: ua::NodeClass::Object,
            browse_name: ua::QualifiedName::new(0, name),
            display_name: ua::LocalizedText::unlocalized(name),
            description: ua::LocalizedText::default(),
            write_mask: 0,
            user_write_mask: 0,
        },
        references: Vec::new(),
        payload: NodePayload::Object(ObjectNode {
            event_notifier: 0,
            instance_handle: None,
        }),
    }
}

fn base_object_type_node() -> Node {
    Node {
        header: NodeHeader {
            node_id: BASE_OBJECT_TYPE,
            node_class: ua::NodeClass::ObjectType,
            browse_name: ua::QualifiedName::new(0, "BaseObjectType"),
            display_name: ua::LocalizedText::unlocalized("BaseObjectType"),
            description: ua::LocalizedText::default(),
            write_mask: 0,
            user_write_mask: 0,
        },
        references: Vec::new(),
        payload: NodePayload::ObjectType(ObjectTypeNode {
            is_abstract: false,
            instance_management: None,
        }),
    }
}

fn current_value(source: &ValueSource) -> Option<&Variant> {
    match source {
        ValueSource::Inline(value) => Some(value),
        ValueSource::DataSource(_) => None,
    }
}

fn ranged_value(value: &Variant, range: Option<&NumericRange>) -> Result<Variant> {
    let Some(range) = range else {
        return Ok(value.clone());
    };
    let array = value
        .as_array()
        .ok_or_else(|| Error::range_invalid("numeric range read against a scalar value"))?;
    Ok(Variant::array(range.slice(array)?.to_vec()))
}

fn read_value_source(
    source: &ValueSource,
    node_id: &NodeId,
    range: Option<&NumericRange>,
    include_source_timestamp: bool,
) -> Result<DataValue> {
    match source {
        ValueSource::Inline(value) => Ok(DataValue::good(ranged_value(value, range)?)),
        ValueSource::DataSource(data_source) => {
            let ctx = DataSourceReadContext {
                node_id,
                range,
                include_source_timestamp,
            };
            data_source.read(&ctx)
        }
    }
}

fn read_header_attribute(node: &Node, attribute_id: AttributeId) -> Result<Variant> {
    use ua::ScalarValue;
    let header = &node.header;
    let value = match attribute_id {
        AttributeId::NodeId => ScalarValue::NodeId(header.node_id.clone()),
        AttributeId::WriteMask => ScalarValue::UInt32(header.write_mask),
        AttributeId::UserWriteMask => ScalarValue::UInt32(header.user_write_mask),
        AttributeId::EventNotifier => match &node.payload {
            NodePayload::Object(o) => ScalarValue::Byte(o.event_notifier),
            NodePayload::View(v) => ScalarValue::Byte(v.event_notifier),
            _ => return Err(Error::type_mismatch("EventNotifier is not defined for this node class")),
        },
        AttributeId::IsAbstract => match &node.payload {
            NodePayload::ObjectType(t) => ScalarValue::Boolean(t.is_abstract),
            NodePayload::VariableType(t) => ScalarValue::Boolean(t.is_abstract),
            NodePayload::ReferenceType(t) => ScalarValue::Boolean(t.is_abstract),
            NodePayload::DataType(t) => ScalarValue::Boolean(t.is_abstract),
            _ => return Err(Error::type_mismatch("IsAbstract is not defined for this node class")),
        },
        AttributeId::AccessLevel => match &node.payload {
            NodePayload::Variable(v) => ScalarValue::Byte(v.access_level.as_u8()),
            _ => return Err(Error::type_mismatch("AccessLevel is only defined for Variable nodes")),
        },
        AttributeId::UserAccessLevel => match &node.payload {
            NodePayload::Variable(v) => ScalarValue::Byte(v.user_access_level.as_u8()),
            _ => return Err(Error::type_mismatch("UserAccessLevel is only defined for Variable nodes")),
        },
        AttributeId::MinimumSamplingInterval => match &node.payload {
            NodePayload::Variable(v) => ScalarValue::Double(v.minimum_sampling_interval),
            _ => return Err(Error::type_mismatch(
                "MinimumSamplingInterval is only defined for Variable nodes",
            )),
        },
        AttributeId::Historizing => match &node.payload {
            NodePayload::Variable(v) => ScalarValue::Boolean(v.historizing),
            _ => return Err(Error::type_mismatch("Historizing is only defined for Variable nodes")),
        },
        AttributeId::Executable => match &node.payload {
            NodePayload::Method(m) => ScalarValue::Boolean(m.executable),
            _ => return Err(Error::type_mismatch("Executable is only defined for Method nodes")),
        },
        AttributeId::UserExecutable => match &node.payload {
            NodePayload::Method(m) => ScalarValue::Boolean(m.user_executable),
            _ => return Err(Error::type_mismatch("UserExecutable is only defined for Method nodes")),
        },
        AttributeId::Symmetric => match &node.payload {
            NodePayload::ReferenceType(r) => ScalarValue::Boolean(r.symmetric),
            _ => return Err(Error::type_mismatch("Symmetric is only defined for ReferenceType nodes")),
        },
        AttributeId::ContainsNoLoops => match &node.payload {
            NodePayload::View(v) => ScalarValue::Boolean(v.contains_no_loops),
            _ => return Err(Error::type_mismatch("ContainsNoLoops is only defined for View nodes")),
        },
        AttributeId::DataType => {
            let current = match &node.payload {
                NodePayload::Variable(v) => current_value(&v.value_source),
                NodePayload::VariableType(t) => Some(&t.value),
                _ => return Err(Error::type_mismatch(
                    "DataType is only defined for Variable and VariableType nodes",
                )),
            };
            ScalarValue::NodeId(
                current
                    .and_then(Variant::data_type)
                    .unwrap_or_else(|| NodeId::ns0(24)),
            )
        }
        AttributeId::ValueRank => {
            let rank = match &node.payload {
                NodePayload::Variable(v) => current_value(&v.value_source).map_or(-1, Variant::value_rank),
                NodePayload::VariableType(t) => t.value.value_rank(),
                _ => return Err(Error::type_mismatch(
                    "ValueRank is only defined for Variable and VariableType nodes",
                )),
            };
            ScalarValue::Int32(rank)
        }
        AttributeId::NodeClass | AttributeId::BrowseName | AttributeId::DisplayName
        | AttributeId::Description | AttributeId::InverseName | AttributeId::Value => {
            return Err(Error::not_supported(format!(
                "{attribute_id:?} has no generic Variant representation in this core"
            )));
        }
    };
    Ok(Variant::scalar(value))
}

fn payload_from_attributes(attributes: NodeAttributes) -> Result<NodePayload> {
    Ok(match attributes {
        NodeAttributes::Object(a) => NodePayload::Object(ObjectNode {
            event_notifier: a.event_notifier.0,
            instance_handle: None,
        }),
        NodeAttributes::Variable(a) => NodePayload::Variable(crate::node::VariableNode {
            access_level: a.access_level,
            user_access_level: a.access_level,
            minimum_sampling_interval: a.minimum_sampling_interval,
            historizing: a.historizing,
            value_source: ValueSource::Inline(a.value),
            value_callback: None,
        }),
        NodeAttributes::Method(a) => NodePayload::Method(MethodNode {
            executable: a.executable,
            user_executable: a.executable,
            input_arguments: a.input_arguments,
            output_arguments: a.output_arguments,
            callback: None,
        }),
        NodeAttributes::ObjectType(a) => NodePayload::ObjectType(ObjectTypeNode {
            is_abstract: a.is_abstract,
            instance_management: None,
        }),
        NodeAttributes::VariableType(a) => {
            NodePayload::VariableType(crate::node::VariableTypeNode {
                value: a.value,
                is_abstract: a.is_abstract,
            })
        }
        NodeAttributes::ReferenceType(a) => {
            NodePayload::ReferenceType(crate::node::ReferenceTypeNode {
                is_abstract: a.is_abstract,
                symmetric: a.symmetric,
                inverse_name: a.inverse_name,
            })
        }
        NodeAttributes::DataType(a) => NodePayload::DataType(crate::node::DataTypeNode {
            is_abstract: a.is_abstract,
        }),
        NodeAttributes::View(a) => NodePayload::View(crate::node::ViewNode {
            event_notifier: a.event_notifier.0,
            contains_no_loops: a.contains_no_loops,
        }),
    })
}

/// Walks `HasSubtype` from `type_definition` towards the root type, returning the nearest
/// ancestor (inclusive) that has a constructor/destructor pair attached.
fn find_instance_management(
    nodes: &HashMap<NodeId, Node>,
    type_definition: &NodeId,
) -> Option<Arc<dyn ObjectInstanceManagement>> {
    let mut current = type_definition.clone();
    loop {
        let node = nodes.get(&current)?;
        if let NodePayload::ObjectType(object_type) = &node.payload {
            if let Some(instance_management) = &object_type.instance_management {
                return Some(Arc::clone(instance_management));
            }
        }
        let parent = node
            .references
            .iter()
            .find(|r| r.reference_type_id == HAS_SUBTYPE && !r.is_forward)
            .map(|r| r.target_id.node_id().clone())?;
        current = parent;
    }
}

fn run_constructor(
    nodes: &mut HashMap<NodeId, Node>,
    node_id: &NodeId,
    instance_management: &Arc<dyn ObjectInstanceManagement>,
) {
    match instance_management.constructor(node_id) {
        Ok(handle) => {
            if let Some(node) = nodes.get_mut(node_id) {
                if let Some(object) = node.as_object_mut() {
                    object.instance_handle = handle;
                }
            }
        }
        Err(err) => log::warn!("constructor for {node_id} failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ua::{CommonAttributes, ObjectAttributes, QualifiedName, ScalarValue, VariableAttributes};

    const ROOT: NodeId = ROOT_FOLDER;
    const ORGANIZES: NodeId = super::ORGANIZES;
    const BASE_OBJECT_TYPE: NodeId = super::BASE_OBJECT_TYPE;

    fn store_with_root() -> NodeStore {
        NodeStore::new()
    }

    #[test]
    fn add_and_read_inline_variable() {
        let store = store_with_root();
        let attrs = NodeAttributes::Variable(
            VariableAttributes {
                common: CommonAttributes::default(),
                value: Variant::scalar(ScalarValue::Int32(7)),
                access_level: ua::AccessLevel::CURRENT_READ | ua::AccessLevel::CURRENT_WRITE,
                minimum_sampling_interval: 0.0,
                historizing: false,
            },
        );
        let node_id = store
            .add_node(
                1,
                &ROOT,
                &ORGANIZES,
                None,
                QualifiedName::new(1, "Temperature"),
                Some(BASE_OBJECT_TYPE),
                attrs,
            )
            .expect("add_node succeeds");

        let value = store
            .read_attribute(&node_id, AttributeId::Value, None, false)
            .expect("read succeeds");
        assert_eq!(value.value().as_scalar(), Some(&ScalarValue::Int32(7)));
    }

    #[test]
    fn write_rejects_type_mismatch() {
        let store = store_with_root();
        let attrs = NodeAttributes::Variable(VariableAttributes {
            common: CommonAttributes::default(),
            value: Variant::scalar(ScalarValue::Int32(7)),
            access_level: ua::AccessLevel::CURRENT_WRITE,
            minimum_sampling_interval: 0.0,
            historizing: false,
        });
        let node_id = store
            .add_node(1, &ROOT, &ORGANIZES, None, QualifiedName::new(1, "X"), Some(BASE_OBJECT_TYPE), attrs)
            .unwrap();

        let result = store.write_attribute(
            &node_id,
            AttributeId::Value,
            None,
            Variant::scalar(ScalarValue::Boolean(true)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn standard_nodes_cannot_be_deleted() {
        let store = store_with_root();
        assert!(store.delete_node(&ROOT).is_err());
    }

    #[test]
    fn object_construction_inherits_nearest_ancestor_constructor() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingManagement(Arc<AtomicUsize>);
        impl ObjectInstanceManagement for CountingManagement {
            fn constructor(&self, _node_id: &NodeId) -> Result<Option<crate::node::InstanceHandle>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
        }

        let store = store_with_root();
        let calls = Arc::new(AtomicUsize::new(0));
        store
            .set_object_instance_management(&BASE_OBJECT_TYPE, Arc::new(CountingManagement(Arc::clone(&calls))))
            .unwrap();

        let attrs = NodeAttributes::Object(ObjectAttributes {
            common: CommonAttributes::default(),
            event_notifier: ua::EventNotifier(0),
        });
        store
            .add_node(1, &ROOT, &ORGANIZES, None, QualifiedName::new(1, "Instance"), Some(BASE_OBJECT_TYPE), attrs)
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn new_store_is_seeded_with_root_and_objects_folder() {
        let store = NodeStore::new();
        assert!(store.contains(&ROOT_FOLDER));
        assert!(store.contains(&OBJECTS_FOLDER));
        assert!(store.contains(&BASE_OBJECT_TYPE));
        let children = store.for_each_child(&ROOT_FOLDER, Some(&ORGANIZES)).unwrap();
        assert_eq!(children, vec![OBJECTS_FOLDER]);
    }

    #[test]
    fn data_source_backed_variable_reads_through_the_source() {
        use crate::value_access::{DataSource, DataSourceReadContext};

        struct ConstantSource(i32);
        impl DataSource for ConstantSource {
            fn read(&self, _ctx: &DataSourceReadContext<'_>) -> Result<DataValue> {
                Ok(DataValue::good(Variant::scalar(ScalarValue::Int32(self.0))))
            }
        }

        let store = store_with_root();
        let attrs = NodeAttributes::Variable(VariableAttributes {
            common: CommonAttributes::default(),
            value: Variant::scalar(ScalarValue::Int32(0)),
            access_level: ua::AccessLevel::CURRENT_READ,
            minimum_sampling_interval: 0.0,
            historizing: false,
        });
        let node_id = store
            .add_node(1, &ROOT, &ORGANIZES, None, QualifiedName::new(1, "Live"), Some(BASE_OBJECT_TYPE), attrs)
            .unwrap();

        store
            .set_data_source(&node_id, Box::new(ConstantSource(123)))
            .unwrap();

        let value = store
            .read_attribute(&node_id, AttributeId::Value, None, false)
            .unwrap();
        assert_eq!(value.value().as_scalar(), Some(&ScalarValue::Int32(123)));
    }
}

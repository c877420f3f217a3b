//! The polymorphic node graph: one [`Node`] type tagged by [`ua::NodeClass`], instead of one
//! Rust type per node class, per the polymorphic-node design note.

use std::{any::Any, sync::Arc};

use crate::{
    ua::{self, ExpandedNodeId, LocalizedText, NodeId, QualifiedName},
    value_access::{DataSource, ValueCallback},
};

/// Opaque state a constructor may stash on an object instance for its destructor to consume.
pub type InstanceHandle = Box<dyn Any + Send + Sync>;

/// Header fields every node class shares.
#[derive(Debug, Clone)]
pub struct NodeHeader {
    pub node_id: NodeId,
    pub node_class: ua::NodeClass,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
    pub description: LocalizedText,
    pub write_mask: u32,
    pub user_write_mask: u32,
}

/// A typed, directed edge stored on its source node.
#[derive(Debug, Clone)]
pub struct Reference {
    pub reference_type_id: NodeId,
    pub target_id: ExpandedNodeId,
    pub is_forward: bool,
}

/// Exactly one of {an inline [`ua::Variant`], or an external [`DataSource`]} backs a variable's
/// value. Switching between the two releases the prior state (data model: value source).
pub enum ValueSource {
    Inline(ua::Variant),
    DataSource(Box<dyn DataSource>),
}

impl std::fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(variant) => f.debug_tuple("Inline").field(variant).finish(),
            Self::DataSource(_) => f.debug_tuple("DataSource").finish(),
        }
    }
}

pub struct VariableNode {
    pub access_level: ua::AccessLevel,
    pub user_access_level: ua::AccessLevel,
    pub minimum_sampling_interval: f64,
    pub historizing: bool,
    pub value_source: ValueSource,
    pub value_callback: Option<Arc<dyn ValueCallback>>,
}

impl std::fmt::Debug for VariableNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableNode")
            .field("access_level", &self.access_level)
            .field("value_source", &self.value_source)
            .field("has_value_callback", &self.value_callback.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct VariableTypeNode {
    pub value: ua::Variant,
    pub is_abstract: bool,
}

/// Constructor/destructor pair attached directly to an Object, or inherited from its type.
pub trait ObjectInstanceManagement: Send + Sync {
    /// Runs when an Object instance of this type is created.
    ///
    /// # Errors
    ///
    /// A failing constructor does not roll back node creation (the node is already committed by
    /// the time this runs); the error is logged and the node is left without an instance handle.
    fn constructor(&self, node_id: &NodeId) -> crate::error::Result<Option<InstanceHandle>> {
        let _ = node_id;
        Ok(None)
    }

    /// Runs when an Object instance of this type is deleted, with whichever handle the
    /// constructor produced (or `None` if it produced none or was never invoked).
    fn destructor(&self, node_id: &NodeId, handle: Option<InstanceHandle>) {
        let _ = (node_id, handle);
    }
}

pub struct ObjectNode {
    pub event_notifier: u8,
    pub instance_handle: Option<InstanceHandle>,
}

impl std::fmt::Debug for ObjectNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectNode")
            .field("event_notifier", &self.event_notifier)
            .field("has_instance_handle", &self.instance_handle.is_some())
            .finish()
    }
}

pub struct ObjectTypeNode {
    pub is_abstract: bool,
    pub instance_management: Option<Arc<dyn ObjectInstanceManagement>>,
}

impl std::fmt::Debug for ObjectTypeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectTypeNode")
            .field("is_abstract", &self.is_abstract)
            .field(
                "has_instance_management",
                &self.instance_management.is_some(),
            )
            .finish()
    }
}

#[derive(Debug)]
pub struct ReferenceTypeNode {
    pub is_abstract: bool,
    pub symmetric: bool,
    pub inverse_name: LocalizedText,
}

#[derive(Debug)]
pub struct ViewNode {
    pub event_notifier: u8,
    pub contains_no_loops: bool,
}

#[derive(Debug)]
pub struct DataTypeNode {
    pub is_abstract: bool,
}

/// Invoked when a client calls a method on an object.
pub trait MethodCallback: Send + Sync {
    /// # Errors
    ///
    /// Returns the status code to report to the client; the method is considered not to have run
    /// on error.
    fn call(
        &self,
        object_id: &NodeId,
        inputs: &[ua::Variant],
    ) -> crate::error::Result<Vec<ua::Variant>>;
}

pub struct MethodNode {
    pub executable: bool,
    pub user_executable: bool,
    pub input_arguments: Vec<ua::Argument>,
    pub output_arguments: Vec<ua::Argument>,
    pub callback: Option<Arc<dyn MethodCallback>>,
}

impl std::fmt::Debug for MethodNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodNode")
            .field("executable", &self.executable)
            .field("input_arguments", &self.input_arguments)
            .field("output_arguments", &self.output_arguments)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Class-specific payload of a [`Node`].
#[derive(Debug)]
pub enum NodePayload {
    Object(ObjectNode),
    Variable(VariableNode),
    Method(MethodNode),
    ObjectType(ObjectTypeNode),
    VariableType(VariableTypeNode),
    ReferenceType(ReferenceTypeNode),
    DataType(DataTypeNode),
    View(ViewNode),
}

/// A vertex of the address space graph: a common header, its outgoing references, and one
/// class-specific payload.
#[derive(Debug)]
pub struct Node {
    pub header: NodeHeader,
    pub references: Vec<Reference>,
    pub payload: NodePayload,
}

impl Node {
    #[must_use]
    pub const fn node_id(&self) -> &NodeId {
        &self.header.node_id
    }

    #[must_use]
    pub const fn node_class(&self) -> ua::NodeClass {
        self.header.node_class
    }

    #[must_use]
    pub const fn as_variable(&self) -> Option<&VariableNode> {
        match &self.payload {
            NodePayload::Variable(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_variable_mut(&mut self) -> Option<&mut VariableNode> {
        match &mut self.payload {
            NodePayload::Variable(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_method(&self) -> Option<&MethodNode> {
        match &self.payload {
            NodePayload::Method(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match &mut self.payload {
            NodePayload::Object(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object_type(&self) -> Option<&ObjectTypeNode> {
        match &self.payload {
            NodePayload::ObjectType(node) => Some(node),
            _ => None,
        }
    }

    /// Standard (namespace 0) nodes may be excluded from deletion by the store, at the
    /// implementor's discretion per §4.1.
    #[must_use]
    pub fn is_standard(&self) -> bool {
        self.header.node_id.namespace_index() == ua::NS0
    }
}

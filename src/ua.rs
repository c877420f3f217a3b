//! OPC UA primitive data types.
//!
//! Mirrors the split the reference crate uses for its `ua::` module: small, independently
//! testable wrapper types around the wire-level primitives, kept free of any knowledge of the
//! node store or runtime that consume them.

mod access_level;
mod argument;
mod attribute_id;
mod data_value;
mod localized_text;
mod node_attributes;
mod node_class;
mod node_id;
mod numeric_range;
mod qualified_name;
mod status_code;
mod variant;

pub use self::{
    access_level::AccessLevel,
    argument::Argument,
    attribute_id::AttributeId,
    data_value::{DataValue, Timestamp},
    localized_text::LocalizedText,
    node_attributes::{
        CommonAttributes, DataTypeAttributes, EventNotifier, MethodAttributes, NodeAttributes,
        ObjectAttributes, ObjectTypeAttributes, ReferenceTypeAttributes, VariableAttributes,
        VariableTypeAttributes, ViewAttributes,
    },
    node_class::NodeClass,
    node_id::{ExpandedNodeId, Identifier, NodeId, NS0},
    numeric_range::{Dimension, NumericRange},
    qualified_name::QualifiedName,
    status_code::{Severity, StatusCode},
    variant::{ScalarValue, Variant, VariantValue},
};

/// 128-bit globally unique identifier, used for repeated-job identity.
pub type Guid = uuid::Uuid;

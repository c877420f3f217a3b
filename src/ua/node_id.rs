use std::fmt;

use uuid::Uuid;

/// Namespace-0 is reserved for the standard information model.
pub const NS0: u16 = 0;

/// The identifier payload of a [`NodeId`].
///
/// Equality and hashing are structural over this discriminant plus its payload, matching
/// the data model's requirement that node ids compare by value, never by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Uuid),
    ByteString(Vec<u8>),
}

/// Identifier of a node: a namespace index plus one of four identifier shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    namespace_index: u16,
    identifier: Identifier,
}

impl NodeId {
    #[must_use]
    pub const fn new(namespace_index: u16, identifier: Identifier) -> Self {
        Self {
            namespace_index,
            identifier,
        }
    }

    #[must_use]
    pub const fn numeric(namespace_index: u16, value: u32) -> Self {
        Self::new(namespace_index, Identifier::Numeric(value))
    }

    #[must_use]
    pub const fn ns0(value: u32) -> Self {
        Self::numeric(NS0, value)
    }

    #[must_use]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self::new(namespace_index, Identifier::String(value.into()))
    }

    #[must_use]
    pub const fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self::new(namespace_index, Identifier::Guid(value))
    }

    #[must_use]
    pub fn byte_string(namespace_index: u16, value: impl Into<Vec<u8>>) -> Self {
        Self::new(namespace_index, Identifier::ByteString(value.into()))
    }

    /// The null node id: `(ns=0, i=0)`. Used as a sentinel for "assign a fresh id" and for
    /// "no parent" in contexts where that is meaningful.
    #[must_use]
    pub const fn null() -> Self {
        Self::ns0(0)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.namespace_index == NS0 && matches!(self.identifier, Identifier::Numeric(0))
    }

    #[must_use]
    pub const fn namespace_index(&self) -> u16 {
        self.namespace_index
    }

    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    #[must_use]
    pub const fn numeric_value(&self) -> Option<u32> {
        match self.identifier {
            Identifier::Numeric(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn string_value(&self) -> Option<&str> {
        match &self.identifier {
            Identifier::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns a copy of this node id with a different namespace index, used when remapping a
    /// locally-assigned identifier into the namespace the caller requested.
    #[must_use]
    pub fn with_namespace_index(mut self, namespace_index: u16) -> Self {
        self.namespace_index = namespace_index;
        self
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Identifier::Numeric(value) => write!(f, "ns={};i={value}", self.namespace_index),
            Identifier::String(value) => write!(f, "ns={};s={value}", self.namespace_index),
            Identifier::Guid(value) => write!(f, "ns={};g={value}", self.namespace_index),
            Identifier::ByteString(value) => {
                write!(f, "ns={};b={}", self.namespace_index, hex(value))
            }
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// A [`NodeId`] that may additionally carry a reference to another OPC UA server, used as
/// reference targets that point outside this server's address space entirely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedNodeId {
    node_id: NodeId,
    namespace_uri: Option<String>,
    server_index: u32,
}

impl ExpandedNodeId {
    #[must_use]
    pub const fn local(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index: 0,
        }
    }

    #[must_use]
    pub fn foreign(node_id: NodeId, namespace_uri: impl Into<String>, server_index: u32) -> Self {
        Self {
            node_id,
            namespace_uri: Some(namespace_uri.into()),
            server_index,
        }
    }

    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.server_index == 0
    }

    #[must_use]
    pub const fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    #[must_use]
    pub const fn server_index(&self) -> u32 {
        self.server_index
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        Self::local(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_node_id_is_ns0_numeric_zero() {
        let null = NodeId::null();
        assert!(null.is_null());
        assert_eq!(null.namespace_index(), 0);
        assert_eq!(null.numeric_value(), Some(0));
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(NodeId::numeric(1, 100), NodeId::numeric(1, 100));
        assert_ne!(NodeId::numeric(1, 100), NodeId::numeric(2, 100));
        assert_ne!(NodeId::numeric(1, 100), NodeId::string(1, "100"));
    }

    #[test]
    fn expanded_node_id_defaults_to_local() {
        let expanded: ExpandedNodeId = NodeId::numeric(1, 1).into();
        assert!(expanded.is_local());
    }
}

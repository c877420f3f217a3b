/// Named node attributes, taken from the attribute set OPC UA Part 3 defines for nodes.
///
/// Array-valued attributes (`ArrayDimensions`, `RolePermissions`, `UserRolePermissions`) are
/// deliberately left out here, same as the teacher crate does for its typed attribute access:
/// the value-array support they would need is attribute-derived (see [`crate::node::Node`]) and
/// has no independent settable representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeId {
    NodeId,
    NodeClass,
    BrowseName,
    DisplayName,
    Description,
    WriteMask,
    UserWriteMask,
    IsAbstract,
    Symmetric,
    InverseName,
    ContainsNoLoops,
    EventNotifier,
    Value,
    DataType,
    ValueRank,
    AccessLevel,
    UserAccessLevel,
    MinimumSamplingInterval,
    Historizing,
    Executable,
    UserExecutable,
}

impl AttributeId {
    /// Attributes that are immutable once a node is created: writes always fail with
    /// `NotWritable` regardless of node class.
    #[must_use]
    pub const fn is_structurally_immutable(self) -> bool {
        matches!(self, Self::NodeId | Self::NodeClass | Self::Symmetric)
    }

    /// Attributes this core does not manage independently: writes fail with `NotSupported`.
    #[must_use]
    pub const fn is_unmanaged_for_write(self) -> bool {
        matches!(
            self,
            Self::WriteMask
                | Self::UserWriteMask
                | Self::AccessLevel
                | Self::UserAccessLevel
                | Self::UserExecutable
                | Self::Historizing
        )
    }

    /// Attributes derived from the variable's current [`crate::ua::Variant`] rather than
    /// independently settable.
    #[must_use]
    pub const fn is_derived_from_value(self) -> bool {
        matches!(self, Self::DataType | Self::ValueRank)
    }
}

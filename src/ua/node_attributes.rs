//! Per-node-class attribute payloads, collapsed into one [`NodeAttributes`] variant so that node
//! creation has a single entry point (`NodeStore::add_node`) instead of one per node class, per
//! the polymorphic-node design note.

use crate::ua::{self, AccessLevel, LocalizedText, NodeClass, Variant};

/// Header fields every node class shares.
#[derive(Debug, Clone, Default)]
pub struct CommonAttributes {
    pub display_name: LocalizedText,
    pub description: LocalizedText,
    pub write_mask: u32,
    pub user_write_mask: u32,
}

macro_rules! with_common {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn with_display_name(mut self, display_name: LocalizedText) -> Self {
                self.common.display_name = display_name;
                self
            }

            #[must_use]
            pub fn with_description(mut self, description: LocalizedText) -> Self {
                self.common.description = description;
                self
            }
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct VariableAttributes {
    pub common: CommonAttributes,
    pub value: Variant,
    pub access_level: AccessLevel,
    pub minimum_sampling_interval: f64,
    pub historizing: bool,
}

with_common!(VariableAttributes);

impl VariableAttributes {
    #[must_use]
    pub fn with_value(mut self, value: Variant) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub const fn with_access_level(mut self, access_level: AccessLevel) -> Self {
        self.access_level = access_level;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableTypeAttributes {
    pub common: CommonAttributes,
    pub value: Variant,
    pub is_abstract: bool,
}

with_common!(VariableTypeAttributes);

impl VariableTypeAttributes {
    #[must_use]
    pub fn with_value(mut self, value: Variant) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub const fn with_is_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventNotifier(pub u8);

#[derive(Debug, Clone, Default)]
pub struct ObjectAttributes {
    pub common: CommonAttributes,
    pub event_notifier: EventNotifier,
}

with_common!(ObjectAttributes);

#[derive(Debug, Clone, Default)]
pub struct ObjectTypeAttributes {
    pub common: CommonAttributes,
    pub is_abstract: bool,
}

with_common!(ObjectTypeAttributes);

impl ObjectTypeAttributes {
    #[must_use]
    pub const fn with_is_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTypeAttributes {
    pub common: CommonAttributes,
    pub is_abstract: bool,
    pub symmetric: bool,
    pub inverse_name: LocalizedText,
}

with_common!(ReferenceTypeAttributes);

impl ReferenceTypeAttributes {
    #[must_use]
    pub const fn with_is_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    #[must_use]
    pub const fn with_symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    #[must_use]
    pub fn with_inverse_name(mut self, inverse_name: LocalizedText) -> Self {
        self.inverse_name = inverse_name;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewAttributes {
    pub common: CommonAttributes,
    pub event_notifier: EventNotifier,
    pub contains_no_loops: bool,
}

with_common!(ViewAttributes);

#[derive(Debug, Clone, Default)]
pub struct DataTypeAttributes {
    pub common: CommonAttributes,
    pub is_abstract: bool,
}

with_common!(DataTypeAttributes);

#[derive(Debug, Clone, Default)]
pub struct MethodAttributes {
    pub common: CommonAttributes,
    pub executable: bool,
    pub input_arguments: Vec<ua::Argument>,
    pub output_arguments: Vec<ua::Argument>,
}

with_common!(MethodAttributes);

impl MethodAttributes {
    #[must_use]
    pub const fn with_executable(mut self, executable: bool) -> Self {
        self.executable = executable;
        self
    }

    #[must_use]
    pub fn with_input_arguments(mut self, arguments: Vec<ua::Argument>) -> Self {
        self.input_arguments = arguments;
        self
    }

    #[must_use]
    pub fn with_output_arguments(mut self, arguments: Vec<ua::Argument>) -> Self {
        self.output_arguments = arguments;
        self
    }
}

/// The attributes payload for one node, tagged by node class so `NodeStore::add_node` has a
/// single entry point regardless of which class is being created.
#[derive(Debug, Clone)]
pub enum NodeAttributes {
    Object(ObjectAttributes),
    Variable(VariableAttributes),
    Method(MethodAttributes),
    ObjectType(ObjectTypeAttributes),
    VariableType(VariableTypeAttributes),
    ReferenceType(ReferenceTypeAttributes),
    DataType(DataTypeAttributes),
    View(ViewAttributes),
}

impl NodeAttributes {
    #[must_use]
    pub const fn node_class(&self) -> NodeClass {
        match self {
            Self::Object(_) => NodeClass::Object,
            Self::Variable(_) => NodeClass::Variable,
            Self::Method(_) => NodeClass::Method,
            Self::ObjectType(_) => NodeClass::ObjectType,
            Self::VariableType(_) => NodeClass::VariableType,
            Self::ReferenceType(_) => NodeClass::ReferenceType,
            Self::DataType(_) => NodeClass::DataType,
            Self::View(_) => NodeClass::View,
        }
    }

    #[must_use]
    pub const fn common(&self) -> &CommonAttributes {
        match self {
            Self::Object(attributes) => &attributes.common,
            Self::Variable(attributes) => &attributes.common,
            Self::Method(attributes) => &attributes.common,
            Self::ObjectType(attributes) => &attributes.common,
            Self::VariableType(attributes) => &attributes.common,
            Self::ReferenceType(attributes) => &attributes.common,
            Self::DataType(attributes) => &attributes.common,
            Self::View(attributes) => &attributes.common,
        }
    }

    /// Whether this node class requires a `typeDefinition` reference on creation (Variables and
    /// Objects do; the other six classes do not).
    #[must_use]
    pub const fn requires_type_definition(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Variable(_))
    }
}

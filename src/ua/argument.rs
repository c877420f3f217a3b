use crate::ua::{LocalizedText, NodeId};

/// Describes one input or output parameter of a [`Method`](crate::node::MethodNode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    name: String,
    data_type: NodeId,
    value_rank: i32,
    description: LocalizedText,
}

impl Argument {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: NodeId) -> Self {
        Self {
            name: name.into(),
            data_type,
            value_rank: -1,
            description: LocalizedText::default(),
        }
    }

    #[must_use]
    pub const fn with_value_rank(mut self, value_rank: i32) -> Self {
        self.value_rank = value_rank;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: LocalizedText) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn data_type(&self) -> &NodeId {
        &self.data_type
    }

    #[must_use]
    pub const fn value_rank(&self) -> i32 {
        self.value_rank
    }

    #[must_use]
    pub const fn description(&self) -> &LocalizedText {
        &self.description
    }
}

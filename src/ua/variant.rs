use crate::ua::{self, NodeId};

/// The scalar types a [`Variant`] can carry. Data type node ids follow the standard's namespace-0
/// numeric identifiers (documented alongside each variant).
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub enum ScalarValue {
    Boolean(bool),       // ns=0;i=1
    SByte(i8),           // ns=0;i=2
    Byte(u8),            // ns=0;i=3
    Int16(i16),          // ns=0;i=4
    UInt16(u16),         // ns=0;i=5
    Int32(i32),          // ns=0;i=6
    UInt32(u32),         // ns=0;i=7
    Int64(i64),          // ns=0;i=8
    UInt64(u64),         // ns=0;i=9
    Float(f32),          // ns=0;i=10
    Double(f64),         // ns=0;i=11
    String(String),      // ns=0;i=12
    StatusCode(ua::StatusCode), // ns=0;i=19
    NodeId(NodeId),       // ns=0;i=17
}

impl ScalarValue {
    #[must_use]
    pub const fn data_type_id(&self) -> u32 {
        match self {
            Self::Boolean(_) => 1,
            Self::SByte(_) => 2,
            Self::Byte(_) => 3,
            Self::Int16(_) => 4,
            Self::UInt16(_) => 5,
            Self::Int32(_) => 6,
            Self::UInt32(_) => 7,
            Self::Int64(_) => 8,
            Self::UInt64(_) => 9,
            Self::Float(_) => 10,
            Self::Double(_) => 11,
            Self::String(_) => 12,
            Self::NodeId(_) => 17,
            Self::StatusCode(_) => 19,
        }
    }

    /// Whether `self` and `other` are the same variant discriminant, irrespective of payload.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        self.data_type_id() == other.data_type_id()
    }
}

/// The shape of a [`Variant`]'s payload: empty, a single scalar, or a flat array of scalars of
/// the same type.
///
/// Arrays are modeled as flat (single-dimensional); multi-dimensional arrays are out of scope
/// for this core, matching [`ua::NumericRange`]'s single-dimension limitation.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantValue {
    Empty,
    Scalar(ScalarValue),
    Array(Vec<ScalarValue>),
}

/// A dynamically-typed value container, the payload of every `Value` attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variant {
    value: Option<VariantValue>,
}

impl Variant {
    #[must_use]
    pub const fn empty() -> Self {
        Self { value: None }
    }

    #[must_use]
    pub fn scalar(value: ScalarValue) -> Self {
        Self {
            value: Some(VariantValue::Scalar(value)),
        }
    }

    /// Creates an array variant.
    ///
    /// # Panics
    ///
    /// Panics if `values` is non-empty and its elements are not all the same scalar type: this
    /// indicates a bug in the caller, not a recoverable runtime condition (OPC UA arrays are
    /// always homogeneous).
    #[must_use]
    pub fn array(values: Vec<ScalarValue>) -> Self {
        if let [first, rest @ ..] = values.as_slice() {
            assert!(
                rest.iter().all(|value| value.same_type(first)),
                "array Variant must be homogeneously typed"
            );
        }
        Self {
            value: Some(VariantValue::Array(values)),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    #[must_use]
    pub const fn value(&self) -> Option<&VariantValue> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match &self.value {
            Some(VariantValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[ScalarValue]> {
        match &self.value {
            Some(VariantValue::Array(values)) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self.value, Some(VariantValue::Array(_)))
    }

    /// The OPC UA `ValueRank`: `-1` for scalars (or the empty variant), `1` for (flat) arrays.
    #[must_use]
    pub const fn value_rank(&self) -> i32 {
        match &self.value {
            Some(VariantValue::Array(_)) => 1,
            _ => -1,
        }
    }

    /// The namespace-0 data type node id this variant's payload corresponds to, if non-empty.
    #[must_use]
    pub fn data_type(&self) -> Option<NodeId> {
        let data_type_id = match &self.value {
            None => return None,
            Some(VariantValue::Scalar(scalar)) => scalar.data_type_id(),
            Some(VariantValue::Array(values)) => values.first()?.data_type_id(),
            Some(VariantValue::Empty) => return None,
        };
        Some(NodeId::ns0(data_type_id))
    }

    /// Whether `self` and `other` carry the same shape (scalar vs. array) and, for non-empty
    /// values, the same scalar type — the check a write must pass against a variable's current
    /// value (data model invariant 4).
    #[must_use]
    pub fn is_type_compatible_with(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (None, None) => true,
            (Some(VariantValue::Scalar(a)), Some(VariantValue::Scalar(b))) => a.same_type(b),
            (Some(VariantValue::Array(a)), Some(VariantValue::Array(b))) => {
                match (a.first(), b.first()) {
                    (Some(a), Some(b)) => a.same_type(b),
                    _ => true,
                }
            }
            _ => false,
        }
    }
}

impl From<ScalarValue> for Variant {
    fn from(value: ScalarValue) -> Self {
        Self::scalar(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_variant_reports_its_own_type() {
        let variant = Variant::scalar(ScalarValue::Int32(42));
        assert_eq!(variant.value_rank(), -1);
        assert_eq!(variant.data_type(), Some(NodeId::ns0(6)));
    }

    #[test]
    fn array_variant_reports_rank_one() {
        let variant = Variant::array(vec![ScalarValue::Int32(1), ScalarValue::Int32(2)]);
        assert_eq!(variant.value_rank(), 1);
        assert!(variant.is_array());
    }

    #[test]
    fn type_compatibility_rejects_cross_type_writes() {
        let current = Variant::scalar(ScalarValue::Int32(1));
        let good = Variant::scalar(ScalarValue::Int32(2));
        let bad = Variant::scalar(ScalarValue::String("nope".into()));
        assert!(current.is_type_compatible_with(&good));
        assert!(!current.is_type_compatible_with(&bad));
    }

    #[test]
    #[should_panic(expected = "homogeneously typed")]
    fn array_variant_rejects_mixed_types() {
        let _ = Variant::array(vec![ScalarValue::Int32(1), ScalarValue::Boolean(true)]);
    }
}

use std::fmt;

/// Severity a [`StatusCode`] falls into, encoded in its two highest bits per the OPC UA wire
/// format (we only reproduce the discriminant, not the standard's full numeric code space).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Good,
    Uncertain,
    Bad,
}

/// Wrapper around an OPC UA status code.
///
/// Only the subset of named codes this core's own operations can produce is defined as
/// associated constants; arbitrary numeric codes can still be wrapped with [`StatusCode::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(u32);

impl StatusCode {
    const SEVERITY_MASK: u32 = 0xC000_0000;
    const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;
    const SEVERITY_BAD: u32 = 0x8000_0000;

    pub const GOOD: Self = Self(0x0000_0000);
    pub const GOOD_NO_DATA: Self = Self(0x00A9_0000);
    pub const UNCERTAIN_INITIAL_VALUE: Self = Self(0x40A4_0000);

    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8035_0000);
    pub const BAD_NODE_ID_EXISTS: Self = Self(0x803E_0000);
    pub const BAD_NODE_ID_INVALID: Self = Self(0x8033_0000);
    pub const BAD_PARENT_NODE_ID_INVALID: Self = Self(0x803B_0000);
    pub const BAD_REFERENCE_TYPE_ID_INVALID: Self = Self(0x803C_0000);
    pub const BAD_TYPE_DEFINITION_INVALID: Self = Self(0x8038_0000);
    pub const BAD_TYPE_MISMATCH: Self = Self(0x80740000);
    pub const BAD_INDEX_RANGE_INVALID: Self = Self(0x80650000);
    pub const BAD_NOT_SUPPORTED: Self = Self(0x803D_0000);
    pub const BAD_NOT_WRITABLE: Self = Self(0x803F_0000);
    pub const BAD_WRITE_NOT_SUPPORTED: Self = Self(0x80700000);
    pub const BAD_INVALID_ARGUMENT: Self = Self(0x80AB_0000);
    pub const BAD_INTERNAL_ERROR: Self = Self(0x8029_0000);
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x802A_0000);
    pub const BAD_USER_ACCESS_DENIED: Self = Self(0x801F_0000);
    pub const BAD_DUPLICATE_REFERENCE_NOT_ALLOWED: Self = Self(0x80780000);
    pub const BAD_SOURCE_NODE_ID_INVALID: Self = Self(0x8079_0000);
    pub const BAD_OUT_OF_RANGE: Self = Self(0x803A_0000);

    #[must_use]
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn severity(self) -> Severity {
        match self.0 & Self::SEVERITY_MASK {
            Self::SEVERITY_BAD => Severity::Bad,
            Self::SEVERITY_UNCERTAIN => Severity::Uncertain,
            _ => Severity::Good,
        }
    }

    #[must_use]
    pub const fn is_good(self) -> bool {
        matches!(self.severity(), Severity::Good)
    }

    #[must_use]
    pub const fn is_bad(self) -> bool {
        matches!(self.severity(), Severity::Bad)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::GOOD
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X} ({:?})", self.0, self.severity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_from_high_bits() {
        assert_eq!(StatusCode::GOOD.severity(), Severity::Good);
        assert_eq!(
            StatusCode::UNCERTAIN_INITIAL_VALUE.severity(),
            Severity::Uncertain
        );
        assert_eq!(StatusCode::BAD_NODE_ID_UNKNOWN.severity(), Severity::Bad);
    }

    #[test]
    fn is_good_and_is_bad_agree_with_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(!StatusCode::GOOD.is_bad());
        assert!(StatusCode::BAD_INTERNAL_ERROR.is_bad());
        assert!(!StatusCode::BAD_INTERNAL_ERROR.is_good());
    }
}

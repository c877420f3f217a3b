/// Bit flags for `AccessLevel`/`UserAccessLevel`, as defined by OPC UA Part 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessLevel(u8);

impl AccessLevel {
    pub const NONE: Self = Self(0);
    pub const CURRENT_READ: Self = Self(0x01);
    pub const CURRENT_WRITE: Self = Self(0x02);
    pub const HISTORY_READ: Self = Self(0x04);
    pub const HISTORY_WRITE: Self = Self(0x08);

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for AccessLevel {
    fn default() -> Self {
        Self::CURRENT_READ
    }
}

impl std::ops::BitOr for AccessLevel {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

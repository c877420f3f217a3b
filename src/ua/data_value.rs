use crate::ua::{StatusCode, Variant};

#[cfg(feature = "time")]
pub type Timestamp = time::OffsetDateTime;
#[cfg(not(feature = "time"))]
pub type Timestamp = std::time::SystemTime;

#[cfg(feature = "time")]
fn now() -> Timestamp {
    Timestamp::now_utc()
}
#[cfg(not(feature = "time"))]
fn now() -> Timestamp {
    std::time::SystemTime::now()
}

/// A value together with its status and timestamps, the unit the Read/Write services exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValue {
    value: Variant,
    status: StatusCode,
    source_timestamp: Option<Timestamp>,
    server_timestamp: Option<Timestamp>,
}

impl DataValue {
    #[must_use]
    pub fn new(value: Variant, status: StatusCode) -> Self {
        Self {
            value,
            status,
            source_timestamp: None,
            server_timestamp: None,
        }
    }

    #[must_use]
    pub fn good(value: Variant) -> Self {
        Self::new(value, StatusCode::GOOD)
    }

    #[must_use]
    pub fn bad(status: StatusCode) -> Self {
        Self::new(Variant::empty(), status)
    }

    #[must_use]
    pub fn with_source_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.source_timestamp = Some(timestamp);
        self
    }

    /// Stamps the server timestamp with the current time, as the service glue does immediately
    /// before returning a read result to the caller.
    #[must_use]
    pub fn stamped(mut self) -> Self {
        self.server_timestamp = Some(now());
        if self.source_timestamp.is_none() {
            self.source_timestamp = Some(now());
        }
        self
    }

    #[must_use]
    pub const fn value(&self) -> &Variant {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> Variant {
        self.value
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn source_timestamp(&self) -> Option<Timestamp> {
        self.source_timestamp
    }

    #[must_use]
    pub const fn server_timestamp(&self) -> Option<Timestamp> {
        self.server_timestamp
    }
}

//! Pluggable value access: a variable's value is either stored inline in the node, or backed by a
//! [`DataSource`] the embedder supplies. [`ValueCallback`] hooks run alongside either value source
//! and never fail the operation they observe.

use crate::{
    error::Result,
    ua::{DataValue, NodeId, NumericRange},
};

/// Parameters of a read dispatched to a [`DataSource`].
#[derive(Debug, Clone, Copy)]
pub struct DataSourceReadContext<'a> {
    pub node_id: &'a NodeId,
    pub range: Option<&'a NumericRange>,
    pub include_source_timestamp: bool,
}

/// Parameters of a write dispatched to a [`DataSource`].
#[derive(Debug, Clone, Copy)]
pub struct DataSourceWriteContext<'a> {
    pub node_id: &'a NodeId,
    pub range: Option<&'a NumericRange>,
    pub value: &'a DataValue,
}

/// An externally-backed variable value, read on every Read service call and optionally
/// writable. Implementors own whatever handle they need to reach the backing value; the store
/// holds only the trait object.
pub trait DataSource: Send + Sync {
    /// # Errors
    ///
    /// Any error is reported to the caller as the read's status code; it does not poison the
    /// node for subsequent reads.
    fn read(&self, ctx: &DataSourceReadContext<'_>) -> Result<DataValue>;

    /// Data sources are read-only unless they opt in by overriding this.
    ///
    /// # Errors
    ///
    /// Defaults to [`ErrorKind::NotWritable`](crate::error::ErrorKind::NotWritable).
    fn write(&self, ctx: &DataSourceWriteContext<'_>) -> Result<()> {
        let _ = ctx;
        Err(crate::error::Error::not_writable(
            "this data source does not support writes",
        ))
    }
}

/// Observes reads and writes of a variable's value, regardless of whether it is backed inline or
/// by a [`DataSource`]. Both hooks are advisory: nothing they do can fail the operation they
/// observe, so they return nothing rather than a `Result`.
pub trait ValueCallback: Send + Sync {
    /// Runs immediately before a read result is delivered to the caller.
    fn on_read(&self, node_id: &NodeId, value: &DataValue) {
        let _ = (node_id, value);
    }

    /// Runs immediately after a write has been committed to the node.
    fn on_write(&self, node_id: &NodeId, value: &DataValue) {
        let _ = (node_id, value);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ua::{StatusCode, Variant};

    struct ConstantSource(i32);

    impl DataSource for ConstantSource {
        fn read(&self, _ctx: &DataSourceReadContext<'_>) -> Result<DataValue> {
            Ok(DataValue::good(Variant::scalar(crate::ua::ScalarValue::Int32(self.0))))
        }
    }

    #[test]
    fn read_only_data_source_rejects_write() {
        let source = ConstantSource(42);
        let value = DataValue::bad(StatusCode::GOOD);
        let ctx = DataSourceWriteContext {
            node_id: &NodeId::numeric(1, 1),
            range: None,
            value: &value,
        };
        assert!(source.write(&ctx).is_err());
    }

    #[test]
    fn value_callback_default_hooks_are_inert() {
        struct CountingCallback(AtomicUsize);
        impl ValueCallback for CountingCallback {
            fn on_read(&self, _node_id: &NodeId, _value: &DataValue) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let callback = CountingCallback(AtomicUsize::new(0));
        let value = DataValue::good(Variant::empty());
        callback.on_read(&NodeId::numeric(1, 1), &value);
        callback.on_write(&NodeId::numeric(1, 1), &value);
        assert_eq!(callback.0.load(Ordering::Relaxed), 1);
    }
}

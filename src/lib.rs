//! An embeddable OPC UA server core: an address space backed by an in-process node store,
//! pluggable value access, a single-threaded job-dispatch main loop with optional worker
//! parallelism, and namespace delegation to externally-implemented node stores.
//!
//! This crate is transport-agnostic: plug in a [`network::NetworkLayer`] to drive it over
//! whatever wire protocol binding the embedder needs.

pub mod error;
pub mod external_namespace;
pub mod job;
pub mod network;
pub mod node;
pub mod runtime;
pub mod service;
pub mod store;
pub mod ua;
pub mod value_access;

pub use error::{Error, ErrorKind, Result};
pub use runtime::{Server, ServerBuilder, ServerConfig};

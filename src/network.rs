//! The transport seam: everything this core knows about a concrete protocol binding (TCP,
//! in-process test doubles, anything else) is expressed through one trait the main loop drives.

use std::time::Duration;

use crate::{error::Result, job::Job};

/// One registered transport binding.
///
/// The main loop owns an ordered list of these; [`NetworkLayer::get_jobs`] is consumed from the
/// loop thread only — implementors do not need to synchronize calls to it against each other,
/// only against their own background I/O.
pub trait NetworkLayer: Send {
    /// A URL advertised to clients during discovery, e.g. `opc.tcp://0.0.0.0:4840`.
    fn discovery_url(&self) -> &str;

    /// Starts accepting connections. Called once, before the main loop's first iteration.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TransportFailure`](crate::error::ErrorKind::TransportFailure) if the layer
    /// could not bind or otherwise begin serving.
    fn start(&mut self) -> Result<()>;

    /// Blocks for up to `timeout`, returning whatever jobs are ready. Only the first layer in
    /// registration order is given a real timeout each iteration; subsequent layers are polled
    /// with a zero timeout so one slow layer cannot stall the others.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TransportFailure`](crate::error::ErrorKind::TransportFailure) on a transport
    /// error; a timeout with no jobs ready is `Ok(vec![])`, not an error.
    fn get_jobs(&mut self, timeout: Duration) -> Result<Vec<Job>>;

    /// Stops accepting new connections and drains whatever jobs were already in flight,
    /// returning them so the loop can dispatch them one final time before shutdown completes.
    fn stop(&mut self) -> Vec<Job>;

    /// Releases any resources `start` acquired. Called once, after `stop`, during shutdown.
    fn delete_members(&mut self);
}

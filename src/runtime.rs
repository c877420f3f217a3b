//! Server construction and the main loop: startup, the per-iteration job pump, and shutdown.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::RwLock;

use crate::{
    error::Result,
    external_namespace::NamespaceTable,
    job::{Job, RepeatedJobId, RepeatedJobScheduler},
    network::NetworkLayer,
    store::NodeStore,
    ua::LocalizedText,
};

/// The ceiling `tick` ever blocks on the first network layer's `getJobs` call, whether because no
/// repeated job is pending or because the next one is further out than this — keeps the loop
/// responsive to `stop()` and to newly-registered repeated jobs regardless of what else is due.
const SAFETY_CEILING: Duration = Duration::from_millis(50);

/// A change to the repeated-job schedule requested from any thread, applied by the loop thread at
/// the start of its next `tick` rather than touching the scheduler directly — this is what lets a
/// repeated job remove itself from within its own callback without deadlocking.
enum SchedulerChange {
    Add {
        id: RepeatedJobId,
        interval: Duration,
        callback: Box<dyn FnMut() + Send>,
    },
    Remove(RepeatedJobId),
}

/// Anonymous and username/password login acceptance, mirroring the original C API's
/// `UA_ServerConfig.Login_*` fields.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoginConfig {
    pub enable_anonymous: bool,
    pub enable_username_password: bool,
    pub logins: Vec<(String, String)>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            enable_anonymous: true,
            enable_username_password: false,
            logins: Vec::new(),
        }
    }
}

/// Identifies this server to clients during discovery.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApplicationConfig {
    pub application_uri: String,
    pub application_name: String,
}

/// Persisted/deserializable server configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerConfig {
    pub login: LoginConfig,
    pub application: ApplicationConfig,
    /// Worker threads dispatch jobs drawn from the loop; `0` runs every job on the loop thread.
    pub n_threads: usize,
}

#[cfg(feature = "serde")]
impl ServerConfig {
    /// Loads a configuration previously written by [`ServerConfig::to_json`], e.g. from a file
    /// an embedder ships alongside the binary.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json`'s parse error, wrapped as
    /// [`ErrorKind::ArgumentInvalid`](crate::error::ErrorKind::ArgumentInvalid).
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| crate::error::Error::argument_invalid(format!("invalid config: {err}")))
    }

    /// Serializes this configuration for persistence.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json`'s serialization error, which only occurs for types this crate
    /// does not define (e.g. a map with non-string keys), wrapped as
    /// [`ErrorKind::InternalInvariantBroken`](crate::error::ErrorKind::InternalInvariantBroken).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| crate::error::Error::internal(format!("config serialization failed: {err}")))
    }
}

/// A job consumer, given the server core and one job to run. Supplied once by whoever wires up
/// service dispatch; the runtime itself has no opinion on what a job means.
pub type Dispatcher = Arc<dyn Fn(&Server, Job) + Send + Sync>;

/// The server's shared core: the address space and namespace routing table. Cheap to share
/// behind an `Arc` with worker threads.
///
/// The repeated-job scheduler itself is *not* here: it is owned exclusively by the [`Runner`] and
/// touched only from the loop thread. `add_repeated_job`/`remove_repeated_job` just enqueue the
/// request onto `scheduler_changes`, which the loop drains at the start of every `tick`.
pub struct Server {
    pub config: ServerConfig,
    pub store: NodeStore,
    pub namespaces: RwLock<NamespaceTable>,
    scheduler_changes: crossbeam_channel::Sender<SchedulerChange>,
}

impl Server {
    /// # Errors
    ///
    /// [`ErrorKind::ArgumentInvalid`](crate::error::ErrorKind::ArgumentInvalid) if `interval` is
    /// at or below [`crate::job::MINIMUM_INTERVAL`]. Validated here, synchronously, so a caller
    /// gets an immediate answer even though the job itself is only installed on the next tick.
    pub fn add_repeated_job(
        &self,
        interval: Duration,
        callback: Box<dyn FnMut() + Send>,
    ) -> Result<RepeatedJobId> {
        RepeatedJobScheduler::validate_interval(interval)?;
        let id = RepeatedJobId::new_v4();
        let _ = self.scheduler_changes.send(SchedulerChange::Add { id, interval, callback });
        Ok(id)
    }

    pub fn remove_repeated_job(&self, id: RepeatedJobId) {
        let _ = self.scheduler_changes.send(SchedulerChange::Remove(id));
    }
}

/// Consuming builder for a [`Server`]/[`Runner`] pair, in the style of the reference crate's
/// `ServerBuilder`.
pub struct ServerBuilder {
    config: ServerConfig,
    network_layers: Vec<Box<dyn NetworkLayer>>,
    dispatcher: Option<Dispatcher>,
}

impl ServerBuilder {
    #[must_use]
    pub fn new(application_uri: impl Into<String>, application_name: impl Into<String>) -> Self {
        Self {
            config: ServerConfig {
                login: LoginConfig::default(),
                application: ApplicationConfig {
                    application_uri: application_uri.into(),
                    application_name: application_name.into(),
                },
                n_threads: 0,
            },
            network_layers: Vec::new(),
            dispatcher: None,
        }
    }

    #[must_use]
    pub const fn with_anonymous_login(mut self, enable: bool) -> Self {
        self.config.login.enable_anonymous = enable;
        self
    }

    #[must_use]
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.login.enable_username_password = true;
        self.config.login.logins.push((username.into(), password.into()));
        self
    }

    #[must_use]
    pub const fn with_worker_threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    #[must_use]
    pub fn with_network_layer(mut self, layer: Box<dyn NetworkLayer>) -> Self {
        self.network_layers.push(layer);
        self
    }

    #[must_use]
    pub fn with_dispatcher(
        mut self,
        dispatcher: impl Fn(&Server, Job) + Send + Sync + 'static,
    ) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Builds the server core and its runner.
    ///
    /// # Panics
    ///
    /// Panics if no dispatcher was configured: a server with nowhere to send jobs is a
    /// programming error, not a runtime condition to recover from.
    #[must_use]
    pub fn build(self) -> (Arc<Server>, Runner) {
        let dispatcher = self
            .dispatcher
            .expect("ServerBuilder::build called without with_dispatcher");
        let (scheduler_changes_tx, scheduler_changes_rx) = crossbeam_channel::unbounded();
        let server = Arc::new(Server {
            config: self.config,
            store: NodeStore::new(),
            namespaces: RwLock::new(NamespaceTable::new()),
            scheduler_changes: scheduler_changes_tx,
        });
        let runner = Runner {
            server: Arc::clone(&server),
            network_layers: self.network_layers,
            dispatcher,
            workers: None,
            running: Arc::new(AtomicBool::new(false)),
            scheduler: RepeatedJobScheduler::new(),
            scheduler_changes: scheduler_changes_rx,
        };
        (server, runner)
    }
}

struct WorkerPool {
    sender: crossbeam_channel::Sender<Job>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    fn spawn(n_threads: usize, server: Arc<Server>, dispatcher: Dispatcher) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let handles = (0..n_threads)
            .map(|index| {
                let receiver = receiver.clone();
                let server = Arc::clone(&server);
                let dispatcher = Arc::clone(&dispatcher);
                thread::Builder::new()
                    .name(format!("opcua-worker-{index}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            dispatcher(&server, job);
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { sender, handles }
    }
}

/// Drives the main loop: starts the registered network layers, pumps jobs each iteration, and
/// shuts everything down in the reverse order on [`Runner::stop`].
pub struct Runner {
    server: Arc<Server>,
    network_layers: Vec<Box<dyn NetworkLayer>>,
    dispatcher: Dispatcher,
    workers: Option<WorkerPool>,
    running: Arc<AtomicBool>,
    /// Owned exclusively by the loop thread; never locked, never shared.
    scheduler: RepeatedJobScheduler,
    scheduler_changes: crossbeam_channel::Receiver<SchedulerChange>,
}

impl Runner {
    /// A handle that can be used to request shutdown from another thread while [`Runner::run`]
    /// blocks on this one.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Requests that [`Runner::run`]'s loop exit after its current iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Runs startup, pumps the loop until [`Runner::stop`] is called, then runs shutdown.
    ///
    /// # Errors
    ///
    /// Propagates a [`NetworkLayer::start`] failure; shutdown still runs for any layer that had
    /// already started.
    pub fn run(&mut self) -> Result<()> {
        self.startup()?;
        while self.running.load(Ordering::SeqCst) {
            self.tick();
        }
        self.shutdown();
        Ok(())
    }

    fn startup(&mut self) -> Result<()> {
        for layer in &mut self.network_layers {
            layer.start()?;
            log::info!("network layer started: {}", layer.discovery_url());
        }
        if self.server.config.n_threads > 0 {
            self.workers = Some(WorkerPool::spawn(
                self.server.config.n_threads,
                Arc::clone(&self.server),
                Arc::clone(&self.dispatcher),
            ));
        }
        self.running.store(true, Ordering::SeqCst);
        log::info!(
            "server started ({} network layer(s), {} worker thread(s))",
            self.network_layers.len(),
            self.server.config.n_threads
        );
        Ok(())
    }

    /// One iteration: apply pending schedule changes, fire due repeated jobs, poll every network
    /// layer (a real timeout only for the first, to bound total iteration latency), then dispatch
    /// whatever came back.
    fn tick(&mut self) {
        self.drain_scheduler_changes();

        let now = Instant::now();
        self.scheduler.run_due(now);

        let timeout = self
            .scheduler
            .next_due_in(now)
            .map(|due| due.min(SAFETY_CEILING))
            .unwrap_or(SAFETY_CEILING);

        let mut jobs = Vec::new();
        for (index, layer) in self.network_layers.iter_mut().enumerate() {
            let layer_timeout = if index == 0 { timeout } else { Duration::ZERO };
            match layer.get_jobs(layer_timeout) {
                Ok(layer_jobs) => jobs.extend(layer_jobs),
                Err(err) => log::warn!("network layer {} failed: {err}", layer.discovery_url()),
            }
        }

        for job in jobs {
            self.dispatch(job);
        }
    }

    /// Applies every schedule change requested since the last tick. Run first, on the loop
    /// thread, before `run_due` — so an add/remove made from a callback that just fired is
    /// visible no later than the next tick, never mid-callback.
    fn drain_scheduler_changes(&mut self) {
        while let Ok(change) = self.scheduler_changes.try_recv() {
            match change {
                SchedulerChange::Add { id, interval, callback } => {
                    self.scheduler.insert(id, interval, callback);
                }
                SchedulerChange::Remove(id) => self.scheduler.remove(id),
            }
        }
    }

    fn dispatch(&self, job: Job) {
        if job.must_run_on_loop_thread() {
            (self.dispatcher)(&self.server, job);
            return;
        }
        match &self.workers {
            Some(workers) => {
                if let Err(err) = workers.sender.send(job) {
                    log::warn!("worker pool unavailable, running job inline");
                    (self.dispatcher)(&self.server, err.into_inner());
                }
            }
            None => (self.dispatcher)(&self.server, job),
        }
    }

    fn shutdown(&mut self) {
        let mut drained = Vec::new();
        for layer in &mut self.network_layers {
            drained.extend(layer.stop());
        }
        for job in drained {
            (self.dispatcher)(&self.server, job);
        }
        if let Some(workers) = self.workers.take() {
            drop(workers.sender);
            for handle in workers.handles {
                let _ = handle.join();
            }
        }
        for layer in &mut self.network_layers {
            layer.delete_members();
        }
        log::info!("server stopped");
    }
}

impl From<&ApplicationConfig> for LocalizedText {
    fn from(config: &ApplicationConfig) -> Self {
        Self::unlocalized(config.application_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    struct NoOpLayer {
        url: String,
        started: bool,
    }

    impl NetworkLayer for NoOpLayer {
        fn discovery_url(&self) -> &str {
            &self.url
        }

        fn start(&mut self) -> Result<()> {
            self.started = true;
            Ok(())
        }

        fn get_jobs(&mut self, _timeout: Duration) -> Result<Vec<Job>> {
            Ok(Vec::new())
        }

        fn stop(&mut self) -> Vec<Job> {
            Vec::new()
        }

        fn delete_members(&mut self) {}
    }

    #[test]
    fn run_until_stop_completes() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&dispatched);
        let (_server, mut runner) = ServerBuilder::new("urn:test:server", "Test Server")
            .with_network_layer(Box::new(NoOpLayer {
                url: "opc.tcp://127.0.0.1:4840".into(),
                started: false,
            }))
            .with_dispatcher(move |_server, _job| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let stop_handle = runner.stop_handle();
        let handle = thread::spawn(move || runner.run());
        thread::sleep(Duration::from_millis(20));
        stop_handle.store(false, Ordering::SeqCst);
        handle.join().unwrap().unwrap();
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_round_trips_through_json() {
        let config = ServerConfig {
            login: LoginConfig {
                enable_anonymous: false,
                enable_username_password: true,
                logins: vec![("alice".into(), "hunter2".into())],
            },
            application: ApplicationConfig {
                application_uri: "urn:test:server".into(),
                application_name: "Test Server".into(),
            },
            n_threads: 4,
        };

        let json = config.to_json().expect("serializes");
        let restored = ServerConfig::from_json(&json).expect("deserializes");
        assert_eq!(restored.n_threads, 4);
        assert!(!restored.login.enable_anonymous);
        assert_eq!(restored.login.logins, vec![("alice".to_string(), "hunter2".to_string())]);
    }
}

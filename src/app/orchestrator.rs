use super::shutdown::{ShutdownHandle, ShutdownState};
use super::types::{Phase, ShutdownReason};
use crate::config::SwutrackConfig;
use crate::error::{Result, SwutrackError};
use crate::service::{ErrorSink, Service, ServiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Invoked by the watchdog when shutdown exceeds its timeout
pub type FatalHandler = Arc<dyn Fn() + Send + Sync>;

/// Starts a fixed set of services and coordinates their shutdown
pub struct Supervisor {
    pub(super) services: Vec<Arc<dyn Service>>,
    pub(super) shutdown_timeout: Duration,
    pub(super) state: Arc<ShutdownState>,

    // Handed to every stop call; cancelled only by the watchdog
    pub(super) run_context: CancellationToken,

    pub(super) error_sink: ErrorSink,
    pub(super) error_receiver: Option<mpsc::UnboundedReceiver<ServiceError>>,
    pub(super) stop_failures: Arc<AtomicUsize>,
    pub(super) on_timeout: FatalHandler,
    pub(super) started: bool,
}

impl Supervisor {
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Launch every service and its shutdown watcher.
    ///
    /// Each service gets one unit of outstanding work, released when its
    /// watcher's `stop` call returns. Must be called within a tokio runtime.
    pub fn start_services(&mut self) -> Result<()> {
        if self.started {
            return Err(SwutrackError::system("Services already started"));
        }
        self.started = true;

        for service in &self.services {
            let name = service.name().to_string();

            let stopping = Arc::clone(service);
            let shutdown = self.state.signal();
            let run_context = self.run_context.clone();
            let stop_failures = Arc::clone(&self.stop_failures);
            self.state.tracker().spawn(async move {
                shutdown.cancelled().await;
                debug!("Stopping {:?}", name);

                let result = stopping.stop(run_context).await;
                if result.has_error() {
                    error!("failed to stop service: {}", result);
                    stop_failures.fetch_add(1, Ordering::SeqCst);
                } else {
                    debug!("{:?} stopped", name);
                }
            });

            info!("starting {:?}", service.name());
            let starting = Arc::clone(service);
            let errors = self.error_sink.clone();
            tokio::spawn(async move { starting.start(errors).await });
        }

        Ok(())
    }

    /// Handle for requesting shutdown from another task
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.state))
    }

    /// Number of services not yet confirmed stopped
    pub fn outstanding(&self) -> usize {
        self.state.outstanding()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.state.reason()
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }
}

/// Builder for [`Supervisor`]
pub struct SupervisorBuilder {
    services: Vec<Arc<dyn Service>>,
    shutdown_timeout: Option<Duration>,
    on_timeout: Option<FatalHandler>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            shutdown_timeout: None,
            on_timeout: None,
        }
    }

    /// Take the shutdown timeout from a validated configuration
    pub fn with_config(self, config: &SwutrackConfig) -> Self {
        self.with_shutdown_timeout(config.shutdown_timeout)
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    pub fn with_service<S: Service + 'static>(mut self, service: Arc<S>) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_services<I>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Service>>,
    {
        self.services.extend(services);
        self
    }

    /// Replace the default fatal path, which exits the process with status 1
    pub fn on_shutdown_timeout<F>(mut self, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_timeout = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Supervisor> {
        let shutdown_timeout = self
            .shutdown_timeout
            .ok_or_else(|| SwutrackError::system("Shutdown timeout is required"))?;

        if shutdown_timeout.is_zero() {
            return Err(SwutrackError::system(
                "Shutdown timeout must be greater than 0",
            ));
        }

        let (error_sink, error_receiver) = ErrorSink::channel();

        Ok(Supervisor {
            services: self.services,
            shutdown_timeout,
            state: Arc::new(ShutdownState::new()),
            run_context: CancellationToken::new(),
            error_sink,
            error_receiver: Some(error_receiver),
            stop_failures: Arc::new(AtomicUsize::new(0)),
            on_timeout: self
                .on_timeout
                .unwrap_or_else(|| Arc::new(exit_on_shutdown_timeout)),
            started: false,
        })
    }
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn exit_on_shutdown_timeout() {
    error!("Terminating process: services did not stop within the shutdown timeout");
    std::process::exit(1);
}

use super::{ErrorSink, Service, ServiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a mock service responds to `stop`
#[derive(Debug, Clone)]
pub enum StopBehavior {
    Clean,
    Fail(String),
    Delay(Duration),
    /// Never returns, ignoring the run context
    Hang,
    /// Returns an error once the run context is cancelled
    UntilCancelled,
}

/// Test service with scripted start and stop behavior
pub struct MockService {
    name: String,
    start_failure: Option<String>,
    stop_behavior: StopBehavior,
    running: CancellationToken,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl MockService {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start_failure: None,
            stop_behavior: StopBehavior::Clean,
            running: CancellationToken::new(),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// Report `cause` as soon as the service starts
    pub fn failing_on_start(mut self, cause: &str) -> Self {
        self.start_failure = Some(cause.to_string());
        self
    }

    pub fn with_stop_behavior(mut self, behavior: StopBehavior) -> Self {
        self.stop_behavior = behavior;
        self
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Service for MockService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, errors: ErrorSink) {
        self.start_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(cause) = &self.start_failure {
            errors.report(ServiceError::new(self.name.clone(), cause.clone()));
            return;
        }

        self.running.cancelled().await;
    }

    async fn stop(&self, run_context: CancellationToken) -> ServiceError {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.running.cancel();

        match &self.stop_behavior {
            StopBehavior::Clean => ServiceError::none(self.name.clone()),
            StopBehavior::Fail(cause) => ServiceError::new(self.name.clone(), cause.clone()),
            StopBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                ServiceError::none(self.name.clone())
            }
            StopBehavior::Hang => std::future::pending().await,
            StopBehavior::UntilCancelled => {
                run_context.cancelled().await;
                ServiceError::new(self.name.clone(), "stop interrupted by deadline")
            }
        }
    }
}

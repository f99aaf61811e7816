mod error;

#[cfg(feature = "http_api")]
pub mod http_api;

#[cfg(test)]
pub(crate) mod mock;

pub use error::{BoxError, ServiceError};

#[cfg(feature = "http_api")]
pub use http_api::HttpApiService;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A long-running unit of work managed by the [`Supervisor`].
///
/// `start` is called exactly once per run on its own task. It runs until
/// `stop` is called or an unrecoverable fault occurs; on a fault it reports
/// one [`ServiceError`] on the sink and returns.
///
/// `stop` may be handed a run context that is already cancelled and must
/// still attempt a best-effort shutdown and return promptly.
///
/// [`Supervisor`]: crate::app::Supervisor
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    /// Name used to scope errors and log lines
    fn name(&self) -> &str;

    /// Run the service, reporting a fault on `errors`
    async fn start(&self, errors: ErrorSink);

    /// Request graceful termination
    async fn stop(&self, run_context: CancellationToken) -> ServiceError;
}

/// Sending half of the shared error channel.
///
/// Any number of services hold a clone; the supervisor is the only consumer.
/// Reporting never blocks.
#[derive(Clone, Debug)]
pub struct ErrorSink {
    sender: mpsc::UnboundedSender<ServiceError>,
}

impl ErrorSink {
    /// Create a sink together with its receiving half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServiceError>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Report a service fault.
    ///
    /// Values without a cause are dropped with a warning.
    pub fn report(&self, err: ServiceError) {
        if !err.has_error() {
            warn!(
                "ignoring error report without a cause from {:?}",
                err.name()
            );
            return;
        }

        if let Err(rejected) = self.sender.send(err) {
            debug!(
                "supervisor no longer listening, dropping error: {}",
                rejected.0
            );
        }
    }
}

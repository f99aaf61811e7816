//! OS termination signals.

use std::fmt;
use tracing::{error, info};

/// Termination signal that initiated shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SIGINT / Ctrl-C
    Interrupt,
    /// SIGTERM (systemd stop)
    Terminate,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
        })
    }
}

/// Installed interrupt and terminate handlers.
///
/// Signals delivered between [`install`](Self::install) and
/// [`recv`](Self::recv) are not lost. A handler that cannot be installed is
/// logged and never fires.
#[derive(Debug)]
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl TerminationSignals {
    /// Register the handlers now. Must be called within a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind as UnixSignal};

        let interrupt = signal(UnixSignal::interrupt())
            .map_err(|e| error!("Failed to register SIGINT handler: {}", e))
            .ok();
        let terminate = signal(UnixSignal::terminate())
            .map_err(|e| error!("Failed to register SIGTERM handler: {}", e))
            .ok();

        Self {
            interrupt,
            terminate,
        }
    }

    #[cfg(not(unix))]
    pub fn install() -> Self {
        Self {}
    }

    /// Resolve once an interrupt or terminate signal arrives
    #[cfg(unix)]
    pub async fn recv(self) -> SignalKind {
        let Self {
            interrupt,
            terminate,
        } = self;

        let interrupt = async move {
            match interrupt {
                Some(mut sig) => {
                    sig.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        let terminate = async move {
            match terminate {
                Some(mut sig) => {
                    sig.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        let kind = tokio::select! {
            _ = interrupt => SignalKind::Interrupt,
            _ = terminate => SignalKind::Terminate,
        };

        info!("Received {} signal", kind);
        kind
    }

    #[cfg(not(unix))]
    pub async fn recv(self) -> SignalKind {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to register SIGINT handler: {}", e);
            std::future::pending::<()>().await;
        }

        info!("Received {} signal", SignalKind::Interrupt);
        SignalKind::Interrupt
    }
}

/// Install the handlers and wait for the first termination signal
pub async fn termination_signal() -> SignalKind {
    TerminationSignals::install().recv().await
}

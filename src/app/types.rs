use crate::service::ServiceError;
use crate::signals::SignalKind;
use std::fmt;

/// Supervisor lifecycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    ShuttingDown,
    Terminated,
    TimedOut,
}

/// Why the supervisor is shutting down
#[derive(Debug, Clone)]
pub enum ShutdownReason {
    Signal(SignalKind),
    ServiceFailure(ServiceError),
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(kind) => write!(f, "received {}", kind),
            ShutdownReason::ServiceFailure(err) => write!(f, "service error: {}", err),
            ShutdownReason::Requested => f.write_str("shutdown requested"),
        }
    }
}

/// Result of a run that shut down within the timeout
#[derive(Debug, Clone)]
pub struct ShutdownOutcome {
    pub reason: ShutdownReason,
    /// Services whose stop reported an error
    pub stop_failures: usize,
}

pub mod app;
pub mod config;
pub mod error;
pub mod service;
pub mod signals;

pub use app::{Phase, ShutdownHandle, ShutdownOutcome, ShutdownReason, Supervisor, SupervisorBuilder};
pub use config::SwutrackConfig;
pub use error::{HttpApiError, Result, SwutrackError};
pub use service::{ErrorSink, Service, ServiceError};
pub use signals::{SignalKind, TerminationSignals};

#[cfg(feature = "http_api")]
pub use service::HttpApiService;

mod orchestrator;
mod runtime;
mod shutdown;
mod types;


pub use orchestrator::{FatalHandler, Supervisor, SupervisorBuilder};
pub use shutdown::{ShutdownHandle, ShutdownState};
pub use types::{Phase, ShutdownOutcome, ShutdownReason};

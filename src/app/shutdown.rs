use super::types::{Phase, ShutdownReason};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Shutdown coordination state for one supervisor run.
///
/// Shared through an `Arc` with every task that takes part in shutdown. The
/// cancellation token is the one-shot broadcast every watcher waits on, the
/// task tracker counts outstanding watchers, and the first recorded reason
/// is the one reported.
#[derive(Debug)]
pub struct ShutdownState {
    signal: CancellationToken,
    outstanding: TaskTracker,
    reason: Mutex<Option<ShutdownReason>>,
    phase: Mutex<Phase>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self {
            signal: CancellationToken::new(),
            outstanding: TaskTracker::new(),
            reason: Mutex::new(None),
            phase: Mutex::new(Phase::Running),
        }
    }

    /// Record `reason` and broadcast the shutdown signal.
    ///
    /// Returns `true` if this call recorded the reason. Later calls keep the
    /// first reason and leave the already-fired signal untouched.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let recorded = {
            let mut slot = self.reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
                true
            } else {
                debug!("Shutdown already triggered, ignoring: {}", reason);
                false
            }
        };

        self.signal.cancel();
        recorded
    }

    pub fn is_triggered(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Reason recorded by the first trigger
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.lock().clone()
    }

    /// Number of services whose shutdown watcher has not finished
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Move from `from` to `to`, returning whether the transition happened
    pub(crate) fn transition(&self, from: Phase, to: Phase) -> bool {
        let mut phase = self.phase.lock();
        if *phase == from {
            debug!("Supervisor phase changed: {:?} -> {:?}", from, to);
            *phase = to;
            true
        } else {
            false
        }
    }

    pub(crate) fn signal(&self) -> CancellationToken {
        self.signal.clone()
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.outstanding
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle for requesting shutdown from outside the supervisor
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    state: Arc<ShutdownState>,
}

impl ShutdownHandle {
    pub(crate) fn new(state: Arc<ShutdownState>) -> Self {
        Self { state }
    }

    /// Request shutdown; returns `true` if this request became the reason
    pub fn shutdown(&self) -> bool {
        self.state.trigger(ShutdownReason::Requested)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.is_triggered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use crate::signals::SignalKind;

    #[test]
    fn test_first_reason_wins() {
        let state = ShutdownState::new();
        assert!(!state.is_triggered());
        assert!(state.reason().is_none());

        assert!(state.trigger(ShutdownReason::ServiceFailure(ServiceError::new(
            "B",
            "disk full"
        ))));
        assert!(!state.trigger(ShutdownReason::Signal(SignalKind::Terminate)));
        assert!(!state.trigger(ShutdownReason::Requested));

        assert!(state.is_triggered());
        assert_eq!(
            state.reason().unwrap().to_string(),
            "service error: B: disk full"
        );
    }

    #[test]
    fn test_transition_only_from_expected_phase() {
        let state = ShutdownState::new();
        assert_eq!(state.phase(), Phase::Running);

        assert!(!state.transition(Phase::ShuttingDown, Phase::Terminated));
        assert!(state.transition(Phase::Running, Phase::ShuttingDown));
        assert!(state.transition(Phase::ShuttingDown, Phase::TimedOut));
        assert!(!state.transition(Phase::ShuttingDown, Phase::Terminated));
        assert_eq!(state.phase(), Phase::TimedOut);
    }

    #[tokio::test]
    async fn test_handle_broadcasts_to_every_waiter() {
        let state = Arc::new(ShutdownState::new());
        let handle = ShutdownHandle::new(Arc::clone(&state));

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let signal = state.signal();
                tokio::spawn(async move { signal.cancelled().await })
            })
            .collect();

        assert!(handle.shutdown());
        assert!(!handle.shutdown());
        assert!(handle.is_shutting_down());

        for waiter in waiters {
            waiter.await.unwrap();
        }
        assert!(matches!(state.reason(), Some(ShutdownReason::Requested)));
    }
}

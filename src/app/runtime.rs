use super::types::{Phase, ShutdownOutcome, ShutdownReason};
use super::Supervisor;
use crate::error::{Result, SwutrackError};
use crate::signals::{SignalKind, TerminationSignals};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

impl Supervisor {
    /// Run until a service fails, a termination signal arrives or shutdown
    /// is requested, then stop every service.
    ///
    /// Returns once all services confirmed they stopped. If that takes longer
    /// than the shutdown timeout, the process is terminated instead.
    ///
    /// Signal handlers are installed before any service starts.
    pub async fn run(&mut self) -> Result<ShutdownOutcome> {
        let signals = TerminationSignals::install();
        self.run_until(signals.recv()).await
    }

    /// Same as [`run`](Self::run) with a caller-supplied signal source
    pub async fn run_until<F>(&mut self, signal: F) -> Result<ShutdownOutcome>
    where
        F: Future<Output = SignalKind>,
    {
        if !self.started {
            self.start_services()?;
        }

        let reason = self.wait_for_trigger(signal).await?;
        self.wait_for_shutdown(reason).await
    }

    /// Wait for the first terminal event and broadcast shutdown
    async fn wait_for_trigger<F>(&mut self, signal: F) -> Result<ShutdownReason>
    where
        F: Future<Output = SignalKind>,
    {
        let mut errors = self
            .error_receiver
            .take()
            .ok_or_else(|| SwutrackError::system("Supervisor already ran"))?;
        let shutdown = self.state.signal();

        tokio::select! {
            Some(err) = errors.recv() => {
                self.state.trigger(ShutdownReason::ServiceFailure(err));
            }
            kind = signal => {
                self.state.trigger(ShutdownReason::Signal(kind));
            }
            _ = shutdown.cancelled() => {}
        }

        let reason = self.state.reason().unwrap_or(ShutdownReason::Requested);
        match &reason {
            ShutdownReason::ServiceFailure(_) => error!("{}", reason),
            _ => info!("{}", reason),
        }

        self.state.transition(Phase::Running, Phase::ShuttingDown);
        Ok(reason)
    }

    /// Wait for every watcher while the watchdog enforces the timeout
    async fn wait_for_shutdown(&self, reason: ShutdownReason) -> Result<ShutdownOutcome> {
        info!("shutting down...");

        let timeout = self.shutdown_timeout;
        let state = Arc::clone(&self.state);
        let run_context = self.run_context.clone();
        let on_timeout = Arc::clone(&self.on_timeout);
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if state.transition(Phase::ShuttingDown, Phase::TimedOut) {
                error!(
                    "shutdown timeout reached, {} service(s) still stopping",
                    state.outstanding()
                );
                run_context.cancel();
                on_timeout();
            }
        });

        let tracker = self.state.tracker();
        tracker.close();
        tracker.wait().await;
        watchdog.abort();

        if !self.state.transition(Phase::ShuttingDown, Phase::Terminated) {
            return Err(SwutrackError::system(
                "Services stopped after the shutdown timeout was reached",
            ));
        }

        let stop_failures = self.stop_failures.load(Ordering::SeqCst);
        if stop_failures > 0 {
            warn!("{} service(s) reported errors while stopping", stop_failures);
        }
        info!("shutdown successful");

        Ok(ShutdownOutcome {
            reason,
            stop_failures,
        })
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::notifier::{ChangeNotifier, Notice};

/// sequences an orderly stop: flag, tell listeners, wait out the grace period,
/// then release the serving loop
#[derive(Debug)]
pub struct ShutdownCoordinator {
    notifier: Arc<ChangeNotifier>,
    grace: Duration,
    stopping: AtomicBool,
    terminate: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(notifier: Arc<ChangeNotifier>, grace: Duration) -> Self {
        Self {
            notifier,
            grace,
            stopping: AtomicBool::new(false),
            terminate: CancellationToken::new(),
        }
    }

    /// start shutting down. only the first call does anything, later ones return false.
    /// must be called from inside the tokio runtime
    pub fn initiate(&self) -> bool {
        if self
            .stopping
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Shutdown already in progress, ignoring request");
            return false;
        }

        let notified = self.notifier.publish(Notice::Shutdown);
        tracing::info!(
            "🛑 Shutting down in {:?} ({} listener(s) notified)",
            self.grace,
            notified
        );

        let terminate = self.terminate.clone();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            terminate.cancel();
        });

        true
    }

    /// set as soon as shutdown begins, before the grace period runs out
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// resolves once the grace period is over and the server should stop serving
    pub fn terminated(&self) -> WaitForCancellationFutureOwned {
        self.terminate.clone().cancelled_owned()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminate.is_cancelled()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }
}

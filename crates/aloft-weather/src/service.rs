//! Refresh loop with an explicit lifecycle.

use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::Orchestrator;
use crate::scheduler::RefreshScheduler;

/// Owns the refresh loop: one instance per process, `start()` to spawn,
/// `stop()` to shut down. Visibility transitions come in through
/// `set_visible`; while hidden no timer is pending.
pub struct WeatherService {
    orchestrator: Arc<Orchestrator>,
    scheduler: RefreshScheduler,
    visible: watch::Sender<bool>,
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WeatherService {
    pub fn new(orchestrator: Arc<Orchestrator>, scheduler: RefreshScheduler) -> Self {
        let (visible, _) = watch::channel(true);
        Self {
            orchestrator,
            scheduler,
            visible,
            shutdown: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the refresh loop. A second call while running is a no-op.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return;
        }

        let orchestrator = self.orchestrator.clone();
        let scheduler = self.scheduler.clone();
        let visible = self.visible.subscribe();
        let shutdown = self.shutdown.clone();
        *handle = Some(tokio::spawn(run_loop(
            orchestrator,
            scheduler,
            visible,
            shutdown,
        )));
    }

    /// Report a host visibility transition.
    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    pub async fn stop(&self) {
        self.shutdown.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Refresh loop did not shut down cleanly: {}", e);
            }
        }
    }
}

async fn run_loop(
    orchestrator: Arc<Orchestrator>,
    scheduler: RefreshScheduler,
    mut visible: watch::Receiver<bool>,
    shutdown: CancellationToken,
) {
    if *visible.borrow_and_update() {
        run_refresh(&orchestrator, false).await;
    }

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        if !*visible.borrow_and_update() {
            // Hidden: no pending delay. Wait for a transition.
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = visible.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *visible.borrow_and_update() {
                        run_refresh(&orchestrator, true).await;
                    }
                }
            }
            continue;
        }

        let delay = scheduler.next_delay(SystemTime::now());
        tracing::debug!(secs = delay.as_secs(), "Next refresh armed");

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {
                run_refresh(&orchestrator, false).await;
            }
            changed = visible.changed() => {
                if changed.is_err() {
                    break;
                }
                // A transition to hidden drops the pending delay; the top
                // of the loop then parks until visible again.
                if *visible.borrow_and_update() {
                    run_refresh(&orchestrator, true).await;
                }
            }
        }
    }
}

async fn run_refresh(orchestrator: &Orchestrator, stale_check: bool) {
    let result = if stale_check {
        orchestrator.refresh_if_stale().await
    } else {
        orchestrator.refresh().await
    };
    // Errors end the cycle, never the loop; the next boundary retries.
    if let Err(e) = result {
        tracing::error!("Refresh failed: {}", e);
    }
}

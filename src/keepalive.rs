use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

/// Notified when either timer fires. Mirrors `KeepAliveManager::Listener`'s
/// two virtual callbacks.
pub trait KeepAliveListener: Send + Sync {
    fn on_keep_alive_expired(&self) {}
    fn on_keep_alive_timeout(&self) {}
}

enum Reset {
    Flush,
    Stop,
}

/// Dual-timer liveness tracker: an "expired" timer fires first as a soft
/// nudge, a "timeout" timer (by default 3x as long) fires after that as a
/// hard deadline. Either timer resets back to the full interval every time
/// [`KeepAliveManager::flush`] is called.
///
/// ASIO's `steady_timer::cancel()` + reschedule has no direct tokio
/// equivalent, so each timer is its own spawned task racing `tokio::time::sleep`
/// against a reset/stop signal sent over an mpsc channel — logically the
/// same "cancel and reschedule from now" contract.
pub struct KeepAliveManager {
    expired_tx: mpsc::Sender<Reset>,
    timeout_tx: mpsc::Sender<Reset>,
}

impl KeepAliveManager {
    pub fn new(
        expired: Duration,
        timeout: Duration,
        listener: Arc<dyn KeepAliveListener>,
    ) -> Self {
        let expired_tx = spawn_timer(expired, {
            let listener = Arc::clone(&listener);
            move || listener.on_keep_alive_expired()
        });
        let timeout_tx = spawn_timer(timeout, move || listener.on_keep_alive_timeout());

        Self {
            expired_tx,
            timeout_tx,
        }
    }

    /// Start (or restart) both timers from now. Matches `Start`/`Flush`.
    pub async fn flush(&self) {
        debug!("keep-alive: rearming expired/timeout timers");
        // Best-effort: a closed receiver means the timer task already fired
        // and exited, which is fine — there's nothing left to reset.
        let _ = self.expired_tx.send(Reset::Flush).await;
        let _ = self.timeout_tx.send(Reset::Flush).await;
    }

    /// Non-blocking variant of [`KeepAliveManager::flush`], for callers
    /// (the expired-timer listener itself) that run outside an `async fn`
    /// and cannot `.await`.
    pub fn try_flush(&self) {
        debug!("keep-alive: rearming expired/timeout timers (non-blocking)");
        let _ = self.expired_tx.try_send(Reset::Flush);
        let _ = self.timeout_tx.try_send(Reset::Flush);
    }

    /// Cancel both timers permanently. Matches `Stop`.
    pub async fn stop(&self) {
        debug!("keep-alive: stopping expired/timeout timers");
        let _ = self.expired_tx.send(Reset::Stop).await;
        let _ = self.timeout_tx.send(Reset::Stop).await;
    }
}

fn spawn_timer<F>(interval: Duration, on_fire: F) -> mpsc::Sender<Reset>
where
    F: Fn() + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(4);
    let rx = Arc::new(Mutex::new(rx));

    tokio::spawn(async move {
        let mut rx = rx.lock().await;
        loop {
            tokio::select! {
                _ = sleep(interval) => {
                    debug!("keep-alive: timer fired after {interval:?}");
                    on_fire();
                    // Keeps ticking at the same interval until explicitly
                    // stopped or flushed again.
                }
                msg = rx.recv() => {
                    match msg {
                        Some(Reset::Flush) => continue,
                        Some(Reset::Stop) | None => break,
                    }
                }
            }
        }
    });

    tx
}

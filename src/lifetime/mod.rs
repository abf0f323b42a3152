// Package lifetime provides time-bound ownership of closable resources,
// releasing the wrapped value exactly once when its deadline elapses or
// expiry is forced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::closer::Closer;

pub mod error;


pub use error::Expired;

struct State<T> {
    value: T,
    expired: bool,
    err: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

/// Wraps a [`Closer`], keeping it accessible through `value` until the
/// configured deadline passes or `expire` is called, then closes it
/// exactly once. The deadline can be rescheduled with `reset` while the
/// lifetime is still alive.
pub struct Lifetime<T: Closer> {
    state: RwLock<State<T>>,
    expire_once: AtomicBool,
    cancel: CancellationToken,
    // Capacity-1 mailbox used in a last-write-wins fashion: reset drains
    // a pending unconsumed value before rewriting, so the watcher only
    // ever observes the most recent request.
    reset_tx: mpsc::Sender<Duration>,
    reset_rx: Arc<Mutex<mpsc::Receiver<Duration>>>,
}

impl<T: Closer + 'static> Lifetime<T> {
    /// Wraps `value`, closing it after `lifetime` unless rescheduled or
    /// expired early. After expiry, `value` yields [`Expired`]; if the
    /// close call itself failed, its error rides along as the source of
    /// [`Expired`]. Must be called within a tokio runtime.
    pub fn new(value: T, lifetime: Duration) -> Arc<Self> {
        let (reset_tx, reset_rx) = mpsc::channel(1);

        let lt = Arc::new(Self {
            state: RwLock::new(State {
                value,
                expired: false,
                err: None,
            }),
            expire_once: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            reset_tx,
            reset_rx: Arc::new(Mutex::new(reset_rx)),
        });

        let watcher = lt.clone();
        tokio::spawn(async move { watcher.wait(lifetime).await });

        lt
    }

    /// Returns a clone of the wrapped value while the lifetime is alive.
    ///
    /// Note that clones handed out here may outlive the lifetime itself:
    /// a caller holding one across the expiry instant must either
    /// synchronize externally or accept that the resource can be closed
    /// underneath it.
    pub async fn value(&self) -> Result<T, Expired>
    where
        T: Clone,
    {
        let state = self.state.read().await;

        if state.expired {
            return Err(Expired::new(state.err.clone()));
        }

        Ok(state.value.clone())
    }

    /// Expires the lifetime immediately, closing the wrapped value.
    ///
    /// Safe to call any number of times from any number of tasks; the
    /// close call runs exactly once, whichever of the manual and timeout
    /// paths gets here first. A close failure is observable only through
    /// later `value` calls.
    pub async fn expire(&self) {
        if self
            .expire_once
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let mut state = self.state.write().await;
        state.expired = true;
        self.cancel.cancel();
        if let Err(err) = state.value.close().await {
            error!(error = %err, "closing wrapped value failed");
            state.err = Some(Arc::from(err));
        }
        debug!("lifetime expired");
    }

    /// Reschedules expiry to occur `lifetime` from now. The previous
    /// deadline is replaced, not extended. Fails with [`Expired`] if the
    /// lifetime has already terminated.
    pub async fn reset(&self, lifetime: Duration) -> Result<(), Expired> {
        {
            let state = self.state.read().await;
            if state.expired {
                return Err(Expired::new(state.err.clone()));
            }
        }

        // Non-blocking handshake: write straight into the mailbox slot
        // and, if it still holds an unconsumed earlier reset, drain that
        // stale value and rewrite. Holding the receiver here keeps the
        // watcher from consuming between the drain and the rewrite.
        if self.reset_tx.try_send(lifetime).is_err() {
            let mut rx = self.reset_rx.lock().await;
            while self.reset_tx.try_send(lifetime).is_err() {
                let _ = rx.try_recv();
            }
        }

        Ok(())
    }

    async fn wait(self: Arc<Self>, lifetime: Duration) {
        let timer = tokio::time::sleep(lifetime);
        tokio::pin!(timer);

        loop {
            // A lifetime terminates on cancellation (a call to expire) or
            // on the deadline elapsing; a reset only re-arms the timer.
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.expire().await;
                    return;
                }
                _ = &mut timer => {
                    self.expire().await;
                    return;
                }
                lifetime = async {
                    let mut rx = self.reset_rx.lock().await;
                    rx.recv().await
                } => {
                    if let Some(lifetime) = lifetime {
                        // Re-arming in place also swallows a firing that
                        // raced with this reset, so it is neither lost to
                        // the new deadline nor treated as expiry.
                        timer.as_mut().reset(Instant::now() + lifetime);
                        debug!(lifetime = ?lifetime, "lifetime rearmed");
                    }
                }
            }
        }
    }
}

//! The server-wide stop signal.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable trigger for stopping the accept loop and the supervisor.
///
/// Backed by a `watch` channel holding `false` until the first
/// [`trigger`](Self::trigger). Triggering again is a no-op.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fires the signal.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// A receiver for use in `select!`; see [`wait`].
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the signal has fired (immediately if it already has).
pub(crate) async fn wait(rx: &mut watch::Receiver<bool>) {
    // An Err means every handle is gone, which also means stop.
    let _ = rx.wait_for(|&stopped| stopped).await;
}

//! Cooperative cancellation
//!
//! Ctrl-C is forwarded into a `watch::Receiver<bool>` instead of dropping
//! futures, so work that has changed device state can put it back before
//! stopping.

use std::time::Duration;
use tokio::sync::watch;

/// A receiver that never signals
pub fn never() -> watch::Receiver<bool> {
    watch::channel(false).1
}

/// Resolves once the flag is `true`; pends forever if the sender is gone
pub(crate) async fn interrupted(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Resolves with `limit` once it has elapsed; pends forever for `None`
pub(crate) async fn expired(limit: Option<Duration>) -> Duration {
    match limit {
        Some(limit) => {
            tokio::time::sleep(limit).await;
            limit
        }
        None => std::future::pending().await,
    }
}

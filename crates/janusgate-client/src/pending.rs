//! Pending-waiter table for transaction correlation.
//!
//! One single-fire waiter per outstanding transaction id. Used both for
//! the session-level pending table (direct responses) and for each
//! handle's secondary table (deferred results of two-phase requests).

use std::collections::HashMap;

use janusgate_protocol::ServerMessage;
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

/// Table of single-fire waiters keyed by transaction id.
///
/// An entry lives from registration until resolution, discard or
/// [`fail_all`](Self::fail_all), whichever comes first. A lookup that
/// races a concurrent removal legitimately misses; callers treat "not
/// found" as a normal outcome.
#[derive(Default)]
pub(crate) struct WaiterTable {
    waiters: Mutex<HashMap<String, oneshot::Sender<ServerMessage>>>,
}

impl WaiterTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for a transaction id, returning the receiving
    /// end. A previous waiter under the same id is dropped, which fails
    /// its receiver.
    pub(crate) async fn register(&self, txn: &str) -> oneshot::Receiver<ServerMessage> {
        let (tx, rx) = oneshot::channel();
        if self.waiters.lock().await.insert(txn.to_string(), tx).is_some() {
            debug!(transaction = txn, "replaced existing waiter");
        }
        rx
    }

    /// Resolves and removes the waiter for a transaction id.
    ///
    /// Returns true if a waiter was found. Delivery to a receiver that
    /// has already given up (timed out) is not an error.
    pub(crate) async fn resolve(&self, txn: &str, msg: ServerMessage) -> bool {
        match self.waiters.lock().await.remove(txn) {
            Some(tx) => {
                if tx.send(msg).is_err() {
                    debug!(transaction = txn, "waiter gone before resolution");
                }
                true
            }
            None => false,
        }
    }

    /// Removes a waiter without resolving it (caller timed out or the
    /// request never went out).
    pub(crate) async fn discard(&self, txn: &str) {
        self.waiters.lock().await.remove(txn);
    }

    /// Drops every waiter, failing all blocked receivers. Called on
    /// session teardown.
    pub(crate) async fn fail_all(&self) {
        let mut waiters = self.waiters.lock().await;
        let dropped = waiters.len();
        waiters.clear();
        if dropped > 0 {
            debug!(dropped, "released blocked waiters on teardown");
        }
    }

    /// Returns true if a waiter is registered for the transaction id.
    #[cfg(test)]
    pub(crate) async fn contains(&self, txn: &str) -> bool {
        self.waiters.lock().await.contains_key(txn)
    }

    /// Number of registered waiters.
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.waiters.lock().await.len()
    }
}

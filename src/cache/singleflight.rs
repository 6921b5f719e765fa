//! Call Coalescer (single-flight)
//!
//! Suppresses duplicate concurrent computations for the same key. The first
//! caller for a key starts the computation on its own tokio task; everyone
//! arriving while it runs, the starting caller included, waits on the same
//! record and gets a clone of the identical result.
//!
//! Each in-flight record is a `watch` channel holding `None` until the task
//! publishes. The record leaves the pending set before the result is
//! published, so the next miss for that key starts a fresh computation
//! (errors are never remembered).
//!
//! A caller that stops waiting does not stop the computation: the task keeps
//! running and still publishes to whoever remains.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::Instrument;

/// One pending computation
struct Call<T> {
    tx: watch::Sender<Option<T>>,
}

type Calls<T> = Arc<Mutex<HashMap<String, Arc<Call<T>>>>>;

/// Per-key coalescing of in-flight computations
pub struct Coalescer<T> {
    calls: Calls<T>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Coalescer<T> {
    /// Create an empty coalescer
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of keys with a computation in flight
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    /// Callers currently waiting on `key`, including the one that started it
    pub fn waiters(&self, key: &str) -> usize {
        self.calls
            .lock()
            .get(key)
            .map(|call| call.tx.receiver_count())
            .unwrap_or(0)
    }
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Run `f` for `key` unless a run is already in flight, in which case
    /// wait for it. Returns the result and whether it was shared from a run
    /// another caller started.
    ///
    /// Returns `None` if the computation ended without a result (it panicked
    /// or the runtime shut down).
    pub async fn call<F, Fut>(&self, key: &str, f: F) -> Option<(T, bool)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (mut rx, shared) = self.claim(key, f);
        let value = rx.wait_for(Option::is_some).await.ok()?;
        (*value).clone().map(|value| (value, shared))
    }

    fn claim<F, Fut>(&self, key: &str, f: F) -> (watch::Receiver<Option<T>>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (call, rx) = {
            let mut calls = self.calls.lock();
            if let Some(call) = calls.get(key) {
                return (call.tx.subscribe(), true);
            }
            let (tx, rx) = watch::channel(None);
            let call = Arc::new(Call { tx });
            calls.insert(key.to_string(), Arc::clone(&call));
            (call, rx)
        };

        let record = Record {
            calls: Arc::clone(&self.calls),
            key: key.to_string(),
            call,
        };
        let fut = f();
        tokio::spawn(
            async move {
                let value = fut.await;
                record.forget();
                record.call.tx.send_replace(Some(value));
            }
            .in_current_span(),
        );
        (rx, false)
    }
}

/// Owned by the running task; the record also leaves the pending set if the
/// task unwinds without publishing
struct Record<T> {
    calls: Calls<T>,
    key: String,
    call: Arc<Call<T>>,
}

impl<T> Record<T> {
    fn forget(&self) {
        let mut calls = self.calls.lock();
        if calls
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.call))
        {
            calls.remove(&self.key);
        }
    }
}

impl<T> Drop for Record<T> {
    fn drop(&mut self) {
        self.forget();
    }
}

// =============================================================================
// Tests
// =============================================================================

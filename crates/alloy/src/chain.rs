//! Sequential callback chain.
//!
//! A [`Chain`] holds a private ordered queue of callbacks and a cursor.
//! Each [`Chain::call_chain`] runs the next unrun callback and advances the
//! cursor; once every queued callback has run, further calls are no-ops.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback stored in a [`Chain`].
///
/// Receives the owning chain (so a callback can append follow-up work or
/// advance the chain itself) and the invocation arguments. The return value
/// is handed back by [`Chain::call_chain`].
pub type ChainFn = Arc<dyn Fn(&mut Chain, &[Value]) -> Option<Value> + Send + Sync>;

/// An ordered queue of callbacks, consumed one per call.
///
/// The cursor only ever moves forward: callbacks already consumed are never
/// re-run, and callbacks appended after the cursor caught up are still
/// reachable by later calls.
#[derive(Default)]
pub struct Chain {
    queue: Vec<ChainFn>,
    cursor: usize,
}

impl Chain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single callback to the queue.
    pub fn chain<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut Chain, &[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        self.queue.push(Arc::new(callback));
        tracing::trace!(queued = self.queue.len(), "chain callback appended");
        self
    }

    /// Append a sequence of callbacks, preserving their order.
    pub fn chain_all<I>(&mut self, callbacks: I) -> &mut Self
    where
        I: IntoIterator<Item = ChainFn>,
    {
        self.queue.extend(callbacks);
        tracing::trace!(queued = self.queue.len(), "chain callbacks appended");
        self
    }

    /// Run the next unrun callback with `args` and return its result.
    ///
    /// Returns `None` without invoking anything when the queue is empty or
    /// every queued callback has already run.
    pub fn call_chain(&mut self, args: &[Value]) -> Option<Value> {
        let Some(callback) = self.queue.get(self.cursor).cloned() else {
            tracing::debug!(cursor = self.cursor, "call_chain with nothing left to run");
            return None;
        };
        self.cursor += 1;
        callback(self, args)
    }

    /// Number of queued callbacks not yet run.
    pub fn pending(&self) -> usize {
        self.queue.len() - self.cursor
    }

    /// Whether every queued callback has already run.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.queue.len()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("queued", &self.queue.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

//! Drivers: spawn a fixed pool of workers against one shared resource, wait
//! for all of them and report expected against actual state.

use std::thread::{self, JoinHandle};

use tracing::{error, Span};

use crate::{ContentionError, Result};

mod balance;
mod orders;

pub use balance::{run_balance, BalanceReport};
pub use orders::{run_order_queue, QueueReport};

/// Named worker threads, joined together.
pub(crate) struct Workers<T> {
    handles: Vec<(String, JoinHandle<T>)>,
}

impl<T: Send + 'static> Workers<T> {
    pub(crate) fn new() -> Workers<T> {
        Workers {
            handles: Vec::new(),
        }
    }

    /// Runs `f` on a new thread inside `span`.
    pub(crate) fn spawn<F>(&mut self, name: String, span: Span, f: F) -> Result<()>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || span.in_scope(f))
            .map_err(|source| ContentionError::Spawn {
                worker: name.clone(),
                source,
            })?;
        self.handles.push((name, handle));
        Ok(())
    }

    /// Waits for every worker, then fails with the first one that panicked.
    pub(crate) fn join(self) -> Result<Vec<T>> {
        let mut results = Vec::with_capacity(self.handles.len());
        let mut panicked = None;
        for (name, handle) in self.handles {
            match handle.join() {
                Ok(v) => results.push(v),
                Err(_) => {
                    error!(worker = %name, "worker panicked");
                    panicked.get_or_insert(name);
                }
            }
        }
        match panicked {
            Some(name) => Err(ContentionError::WorkerPanicked(name)),
            None => Ok(results),
        }
    }
}

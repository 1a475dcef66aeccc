//! A small fan-out/fan-in worker pool used to parallelize digesting and copying files during
//! commit and validation. Work items are pulled off a bounded channel by a fixed pool of
//! threads; results are pushed back onto a second channel in completion order (not submission
//! order).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::ocfl::error::Result;

/// A flag shared between the pipeline driver and its workers. Workers check it between items and
/// stop pulling new work once it is set, so a failing item does not prevent the others that are
/// already in flight from being drained, but no new work starts.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The outcome of processing a single work item.
pub struct PipelineResult<O> {
    pub output: Result<O>,
}

/// A fan-out/fan-in worker pool over a fixed batch of work items.
pub struct Pipeline;

impl Pipeline {
    /// Runs `work_fn` over every item in `items` using up to `workers` threads, returning results
    /// in completion order. If any invocation returns an `Err`, the token is cancelled so that
    /// workers stop pulling new items, but results already produced (including the error) are
    /// still returned -- callers are responsible for deciding whether a single failure should
    /// abort the whole batch.
    pub fn run<I, O, F>(items: Vec<I>, workers: usize, work_fn: F) -> Vec<PipelineResult<O>>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(&I, &CancellationToken) -> Result<O> + Send + Sync + 'static,
    {
        let workers = workers.max(1);
        let token = CancellationToken::new();
        let work_fn = Arc::new(work_fn);

        let (item_tx, item_rx): (Sender<I>, Receiver<I>) = bounded(items.len().max(1));
        let (result_tx, result_rx) = bounded(items.len().max(1));

        let total = items.len();
        for item in items {
            item_tx.send(item).expect("item channel is open");
        }
        drop(item_tx);

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let item_rx = item_rx.clone();
            let result_tx = result_tx.clone();
            let work_fn = Arc::clone(&work_fn);
            let token = token.clone();

            handles.push(thread::spawn(move || {
                while let Ok(item) = item_rx.recv() {
                    if token.is_cancelled() {
                        break;
                    }

                    let output = work_fn(&item, &token);
                    if output.is_err() {
                        token.cancel();
                    }

                    if result_tx.send(PipelineResult { output }).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        while let Ok(result) = result_rx.recv() {
            results.push(result);
        }

        for handle in handles {
            let _ = handle.join();
        }

        results
    }

    /// Returns a worker count derived from the number of available CPUs, capped so that small
    /// jobs don't spin up more threads than they have work items.
    pub fn default_worker_count(item_count: usize) -> usize {
        num_cpus::get().max(1).min(item_count.max(1))
    }
}

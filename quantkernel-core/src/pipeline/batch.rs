//! Batch execution over a ticker list, inline or on one background thread.
//!
//! A fetch failure is reported for its ticker and the batch moves on. Any
//! other failure (contract violation, bad component config) aborts the batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use super::{Pipeline, PipelineRequest};
use crate::data::{DataManager, FetchError};
use crate::domain::Table;
use crate::error::{Error, Result};

/// Progress and results of a batch, in ticker order.
#[derive(Debug)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        ticker: String,
    },
    Completed {
        index: usize,
        ticker: String,
        table: Box<Table>,
    },
    Failed {
        index: usize,
        ticker: String,
        error: FetchError,
    },
    Finished(BatchSummary),
    Aborted {
        error: Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the batch was cancelled before every ticker ran.
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.succeeded == self.total
    }
}

/// Run `request` over `tickers`, reporting each ticker to `sink` as it finishes.
///
/// Parameters (and any provider switch) are applied once, before the first
/// ticker. Stops early, with `cancelled` set, once `cancel` is raised.
pub fn run_batch(
    pipeline: &Pipeline,
    manager: &mut DataManager,
    request: &PipelineRequest,
    tickers: &[String],
    cancel: &AtomicBool,
    mut sink: impl FnMut(BatchEvent),
) -> Result<BatchSummary> {
    manager.set_parameters(&request.params)?;
    // Surface config mistakes before any network traffic.
    pipeline.build_registry(request)?;

    let mut summary = BatchSummary {
        total: tickers.len(),
        ..BatchSummary::default()
    };

    for (index, ticker) in tickers.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            summary.cancelled = true;
            break;
        }
        sink(BatchEvent::Started {
            index,
            total: summary.total,
            ticker: ticker.clone(),
        });

        match pipeline.run_ticker(manager, request, ticker) {
            Ok(table) => {
                summary.succeeded += 1;
                sink(BatchEvent::Completed {
                    index,
                    ticker: ticker.clone(),
                    table: Box::new(table),
                });
            }
            Err(Error::Fetch(error)) => {
                warn!(ticker = %ticker, category = ?error.category(), %error, "ticker failed");
                summary.failed += 1;
                sink(BatchEvent::Failed {
                    index,
                    ticker: ticker.clone(),
                    error,
                });
            }
            Err(other) => return Err(other),
        }
    }

    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "batch finished"
    );
    Ok(summary)
}

/// A batch running on its own thread, owning its data manager.
///
/// Events arrive on `events()`; the last one is always `Finished` or
/// `Aborted`. `join` hands the manager back.
pub struct BatchWorker {
    events: Receiver<BatchEvent>,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<DataManager>,
}

impl BatchWorker {
    pub fn spawn(
        pipeline: Pipeline,
        mut manager: DataManager,
        request: PipelineRequest,
        tickers: Vec<String>,
    ) -> Result<Self> {
        let (tx, events) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name("quantkernel-batch".into())
            .spawn(move || {
                let outcome = run_batch(&pipeline, &mut manager, &request, &tickers, &worker_cancel, |event| {
                    send(&tx, event)
                });
                send(
                    &tx,
                    match outcome {
                        Ok(summary) => BatchEvent::Finished(summary),
                        Err(error) => BatchEvent::Aborted { error },
                    },
                );
                manager
            })
            .map_err(Error::Spawn)?;

        Ok(Self { events, cancel, handle })
    }

    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.events
    }

    /// Ask the worker to stop before its next ticker.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the worker and take back its data manager. `None` if the
    /// worker panicked.
    pub fn join(self) -> Option<DataManager> {
        self.handle.join().ok()
    }
}

// The receiver may already be gone; the batch still runs to completion.
fn send(tx: &Sender<BatchEvent>, event: BatchEvent) {
    let _ = tx.send(event);
}

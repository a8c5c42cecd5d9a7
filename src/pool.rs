//! Fixed-size validation worker pool
//!
//! Workers run on tokio's blocking threads and pull assets from one shared
//! queue. Each worker builds its own [`ValidationDispatcher`], so rule
//! caches, the local ontology store and the term memo are never shared
//! between workers. A panic while validating one asset is caught and
//! becomes a report entry for that asset; the remaining assets are still
//! processed.

use crate::catalog::AssetPath;
use crate::dispatch::{CheckName, ValidationDispatcher};
use crate::error::ConformanceError;
use crate::logging::run_span;
use crate::report::{FileOutcome, ValidationReport};
use futures::future::join_all;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Builds one dispatcher per worker.
pub type DispatcherFactory =
    Arc<dyn Fn() -> Result<ValidationDispatcher, ConformanceError> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Validate every asset and merge the outcomes. Returns once the queue
    /// is drained and every worker has finished.
    pub async fn run(
        &self,
        assets: Vec<AssetPath>,
        checks: &[CheckName],
        factory: DispatcherFactory,
    ) -> ValidationReport {
        let total = assets.len();
        let workers = self.workers.min(total).max(1);
        let queue = Arc::new(Mutex::new(VecDeque::from(assets)));
        let checks: Arc<[CheckName]> = checks.into();

        async move {
            let started = Instant::now();
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                handles.push(tokio::task::spawn_blocking({
                    let queue = queue.clone();
                    let checks = checks.clone();
                    let factory = factory.clone();
                    move || run_worker(worker, &queue, &checks, factory.as_ref())
                }));
            }

            let mut report = ValidationReport::new();
            for joined in join_all(handles).await {
                match joined {
                    Ok(partial) => report.merge(partial),
                    Err(error) => report.push(format!("validation worker failed: {error}")),
                }
            }
            tracing::info!(
                files = report.files_checked(),
                errors = report.len(),
                duration_ms = started.elapsed().as_millis() as u64,
                "validation finished"
            );
            report
        }
        .instrument(run_span("validate", total))
        .await
    }
}

fn run_worker(
    worker: usize,
    queue: &Mutex<VecDeque<AssetPath>>,
    checks: &[CheckName],
    factory: &(dyn Fn() -> Result<ValidationDispatcher, ConformanceError> + Send + Sync),
) -> ValidationReport {
    let mut report = ValidationReport::new();
    let dispatcher = match factory() {
        Ok(dispatcher) => dispatcher,
        Err(error) => {
            tracing::error!(worker, error = %error, "worker cannot start");
            report.push(format!("worker {worker} cannot start: {error}"));
            return report;
        }
    };

    loop {
        let Some(asset) = queue.lock().pop_front() else {
            break;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(&asset, checks)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(worker, asset = %asset, panic = %message, "validation panicked");
                let mut outcome = FileOutcome::new(&asset);
                outcome.push(format!("{asset}: validation aborted: {message}"));
                outcome
            });
        report.record(outcome);
    }

    tracing::debug!(
        worker,
        files = report.files_checked(),
        rule_cache_hit_rate = dispatcher.rules().cache_stats().hit_rate(),
        remote_fetches = dispatcher.semantic().remote_fetches(),
        "worker drained queue"
    );
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

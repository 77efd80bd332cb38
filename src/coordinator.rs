//! Fan-out/fan-in driver shared by both phases.
//!
//! Units are processed by a bounded pool of concurrent lanes. Each lane gets
//! a [`Lane`] handle and emits its results through it; a single aggregating
//! task receives them one at a time and is the only place where the crawl
//! maps are mutated. The aggregating task stops when every lane handle has
//! been dropped, not when a count is reached, so a lane emitting more or
//! fewer results than anticipated cannot stall the phase. The anticipated
//! count is still checked and reported.
//!
//! Once the channel drains, [`Aggregator::flush`] runs exactly once.

use std::future::{self, Future};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;

/// Capacity of the result channel between lanes and the aggregator.
const RESULT_BUFFER: usize = 256;

/// How the aggregator classified a merged result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Applied,
    Failed,
    Skipped,
    /// Marker for a unit that produced no results at all. Not a result, so it
    /// is kept out of `received`.
    UnitFailed,
}

/// Single writer of a phase's state.
pub trait Aggregator<R> {
    fn merge(&mut self, result: R) -> Merge;

    /// Persist the merged state. Called once per phase.
    async fn flush(&mut self) -> Result<()>;
}

/// Handle a lane uses to emit results.
#[derive(Debug)]
pub struct Lane<R> {
    tx: mpsc::Sender<R>,
}

impl<R> Clone for Lane<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R> Lane<R> {
    pub async fn emit(&self, result: R) {
        if self.tx.send(result).await.is_err() {
            warn!("Aggregator is gone; dropping result");
        }
    }
}

/// Outcome of one phase run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseReport {
    /// Work units handed to the pool.
    pub units: usize,
    /// Results the phase anticipated.
    pub expected: usize,
    /// Results actually received.
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Units that reported failure instead of results.
    pub failed_units: usize,
    pub elapsed: Duration,
}

impl PhaseReport {
    fn record(&mut self, merge: Merge) {
        if merge == Merge::UnitFailed {
            self.failed_units += 1;
            return;
        }
        self.received += 1;
        match merge {
            Merge::Applied => self.succeeded += 1,
            Merge::Failed => self.failed += 1,
            Merge::Skipped => self.skipped += 1,
            Merge::UnitFailed => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Coordinator {
    concurrency: usize,
}

impl Coordinator {
    /// `concurrency` is the number of lanes allowed in flight; zero is
    /// treated as one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Run `worker` once per unit and feed everything it emits to
    /// `aggregator`, then flush.
    ///
    /// # Arguments
    ///
    /// * `units` - Work items, each handed to exactly one `worker` call
    /// * `expected` - Results the caller anticipates; a mismatch is logged
    ///   and visible in the report but never blocks completion
    /// * `aggregator` - Sole owner of the phase state
    /// * `worker` - Processes one unit and emits its results through the lane
    ///
    /// # Returns
    ///
    /// Counts of merged results by [`Merge`] outcome, plus timing.
    ///
    /// # Errors
    ///
    /// Fails if the aggregating task panics or [`Aggregator::flush`] fails.
    #[instrument(level = "info", skip_all, fields(units = units.len(), expected = expected, concurrency = self.concurrency))]
    pub async fn run<U, R, A, W, Fut>(
        &self,
        units: Vec<U>,
        expected: usize,
        mut aggregator: A,
        worker: W,
    ) -> Result<PhaseReport>
    where
        R: Send + 'static,
        A: Aggregator<R> + Send + 'static,
        W: Fn(U, Lane<R>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let started = Instant::now();
        let units_len = units.len();
        let (tx, mut rx) = mpsc::channel::<R>(RESULT_BUFFER);

        let collector = tokio::spawn(async move {
            let mut report = PhaseReport::default();
            while let Some(result) = rx.recv().await {
                report.record(aggregator.merge(result));
                debug!(received = report.received, "Merged result");
            }
            (aggregator, report)
        });

        let lane = Lane { tx };
        stream::iter(units)
            .map(|unit| worker(unit, lane.clone()))
            .buffer_unordered(self.concurrency)
            .for_each(|()| future::ready(()))
            .await;
        drop(lane);

        let (mut aggregator, mut report) = collector.await?;
        report.units = units_len;
        report.expected = expected;

        if report.received != expected {
            warn!(
                expected,
                received = report.received,
                failed_units = report.failed_units,
                "Result count differs from the anticipated count"
            );
        }

        aggregator.flush().await?;
        report.elapsed = started.elapsed();
        info!(
            units = report.units,
            received = report.received,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            failed_units = report.failed_units,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Phase complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Collects numbers; odd numbers count as failures.
    #[derive(Default)]
    struct Collect {
        seen: Vec<u32>,
        flushed: Arc<Mutex<Vec<Vec<u32>>>>,
    }

    impl Aggregator<u32> for Collect {
        fn merge(&mut self, n: u32) -> Merge {
            if n % 2 == 1 {
                return Merge::Failed;
            }
            self.seen.push(n);
            Merge::Applied
        }

        async fn flush(&mut self) -> Result<()> {
            let mut seen = self.seen.clone();
            seen.sort_unstable();
            self.flushed.lock().unwrap().push(seen);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_every_unit_runs_once_and_flushes_once() {
        let flushed = Arc::new(Mutex::new(Vec::new()));
        let agg = Collect {
            flushed: flushed.clone(),
            ..Collect::default()
        };

        let report = Coordinator::new(3)
            .run((0..10u32).collect(), 10, agg, |n, lane| async move {
                lane.emit(n).await;
            })
            .await
            .unwrap();

        assert_eq!(report.units, 10);
        assert_eq!(report.received, 10);
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failed, 5);
        let flushed = flushed.lock().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0], vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let report = Coordinator::new(2)
            .run((0..8u32).map(|n| n * 2).collect(), 8, Collect::default(), |n, lane| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    lane.emit(n).await;
                }
            })
            .await
            .unwrap();

        assert_eq!(report.succeeded, 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_fewer_results_than_expected_does_not_hang() {
        let report = Coordinator::new(4)
            .run(vec![2u32, 4], 60, Collect::default(), |_, _lane: Lane<u32>| async {})
            .await
            .unwrap();
        assert_eq!(report.received, 0);
        assert_eq!(report.expected, 60);
    }

    #[tokio::test]
    async fn test_more_results_than_expected_are_all_merged() {
        let flushed = Arc::new(Mutex::new(Vec::new()));
        let agg = Collect {
            flushed: flushed.clone(),
            ..Collect::default()
        };
        // Each unit emits three results, far past the anticipated count.
        let report = Coordinator::new(2)
            .run(vec![0u32, 10], 2, agg, |base, lane| async move {
                for n in [base, base + 2, base + 4] {
                    lane.emit(n).await;
                }
            })
            .await
            .unwrap();
        assert_eq!(report.received, 6);
        assert_eq!(flushed.lock().unwrap()[0], vec![0, 2, 4, 10, 12, 14]);
    }

    /// Treats zero as a unit that failed before producing anything.
    #[derive(Default)]
    struct Markers;

    impl Aggregator<u32> for Markers {
        fn merge(&mut self, n: u32) -> Merge {
            if n == 0 { Merge::UnitFailed } else { Merge::Applied }
        }

        async fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unit_failures_are_kept_out_of_received() {
        let report = Coordinator::new(2)
            .run(vec![0u32, 0, 7], 30, Markers, |n, lane| async move { lane.emit(n).await })
            .await
            .unwrap();
        assert_eq!(report.units, 3);
        assert_eq!(report.received, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.failed_units, 2);
    }

    #[tokio::test]
    async fn test_no_units_still_flushes() {
        let flushed = Arc::new(Mutex::new(Vec::new()));
        let agg = Collect {
            flushed: flushed.clone(),
            ..Collect::default()
        };
        let report = Coordinator::new(0)
            .run(Vec::<u32>::new(), 0, agg, |n, lane| async move { lane.emit(n).await })
            .await
            .unwrap();
        assert_eq!(report, PhaseReport { elapsed: report.elapsed, ..PhaseReport::default() });
        assert_eq!(flushed.lock().unwrap().len(), 1);
    }
}

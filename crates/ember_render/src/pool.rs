//! # Thread Pool Coordinator
//!
//! A fixed set of render threads, created once at initialization and parked
//! on their job channel between frames.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌─────────────────────────┐
//!   dispatch(frame) ──>│    RenderThreadPool     │
//!                      │ partition_ranges(len,N) │
//!                      └──┬─────────┬─────────┬──┘
//!          Record(job 0)  │         │         │  Record(job N-1)
//!                         ▼         ▼         ▼
//!                   ┌─────────┐┌─────────┐┌─────────┐
//!                   │ render-0││ render-1││ render-N│   each job carries its
//!                   │ record()││ record()││ record()│   own CommandRecorder
//!                   └────┬────┘└────┬────┘└────┬────┘
//!                        └──────────┼──────────┘
//!                                   ▼ WorkerReport (recorder comes back)
//!                      ┌─────────────────────────┐
//!                      │ join: one report each   │
//!                      │ lists kept by index     │
//!                      └─────────────────────────┘
//! ```
//!
//! A recorder lives either in its pool slot or inside exactly one job or
//! report, so no two threads can ever write the same buffer. Lists are read
//! back by worker index, which makes submission order independent of which
//! thread finished first.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::command::{CommandList, WorkItem};
use crate::config::RecorderConfig;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::FrameContext;
use crate::recorder::{CommandRecorder, RecordStats};
use crate::workload::partition_ranges;

/// One worker's share of a frame.
struct RecordJob {
    frame: FrameContext,
    workload: Arc<[WorkItem]>,
    range: Range<usize>,
    recorder: CommandRecorder,
}

/// Messages a worker waits for.
enum WorkerMessage {
    Record(RecordJob),
    Shutdown,
}

/// What a worker sends back when its job is done.
struct WorkerReport {
    worker_index: usize,
    recorder: CommandRecorder,
    elapsed: Duration,
    panicked: bool,
}

/// Summary of one dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Workers that panicked and contributed an empty list.
    pub panicked: u32,
    /// Counters summed over all workers.
    pub totals: RecordStats,
}

struct WorkerHandle {
    jobs: Sender<WorkerMessage>,
    thread: Option<JoinHandle<()>>,
}

/// Owns the render threads and their recorders.
pub struct RenderThreadPool {
    workers: Vec<WorkerHandle>,
    reports: Receiver<WorkerReport>,
    /// Recorder of worker `i`, `None` while it is out on a job.
    recorders: Vec<Option<CommandRecorder>>,
    /// Recording time of worker `i` in the last dispatch.
    timings: Vec<Duration>,
}

impl RenderThreadPool {
    /// Spawns `count` parked render threads.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ThreadSpawn`] if any thread fails to start.
    /// Threads already started are stopped and joined before returning.
    pub fn spawn(count: usize, recorder: RecorderConfig) -> RenderResult<Self> {
        let (report_tx, reports) = unbounded();
        let mut pool = Self {
            workers: Vec::with_capacity(count),
            reports,
            recorders: Vec::with_capacity(count),
            timings: vec![Duration::ZERO; count],
        };

        for index in 0..count {
            let (jobs, job_rx) = bounded(1);
            let report_tx = report_tx.clone();

            let thread = thread::Builder::new()
                .name(format!("ember-render-{index}"))
                .spawn(move || worker_loop(index, &job_rx, &report_tx))
                .map_err(|e| RenderError::ThreadSpawn {
                    index,
                    reason: e.to_string(),
                })?;

            pool.workers.push(WorkerHandle {
                jobs,
                thread: Some(thread),
            });
            pool.recorders.push(Some(CommandRecorder::new(index, recorder)));
        }

        tracing::debug!(threads = count, "render threads spawned");
        Ok(pool)
    }

    /// Number of render threads.
    #[inline]
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Records `workload` for `frame` across all workers and blocks until
    /// every worker has reported.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::WorkerDisconnected`] if a worker thread is gone.
    /// Workers that did receive their job are still joined first.
    pub fn dispatch(
        &mut self,
        frame: FrameContext,
        workload: &Arc<[WorkItem]>,
    ) -> RenderResult<DispatchReport> {
        let ranges = partition_ranges(workload.len(), self.thread_count());
        self.dispatch_ranges(frame, workload, ranges)
    }

    fn dispatch_ranges(
        &mut self,
        frame: FrameContext,
        workload: &Arc<[WorkItem]>,
        ranges: impl Iterator<Item = Range<usize>>,
    ) -> RenderResult<DispatchReport> {
        let mut dispatched = 0;
        let mut failure = None;

        for (index, range) in ranges.enumerate().take(self.workers.len()) {
            let Some(recorder) = self.recorders[index].take() else {
                failure = Some(RenderError::WorkerDisconnected { index });
                break;
            };

            let job = RecordJob {
                frame,
                workload: Arc::clone(workload),
                range,
                recorder,
            };

            match self.workers[index].jobs.send(WorkerMessage::Record(job)) {
                Ok(()) => dispatched += 1,
                Err(crossbeam_channel::SendError(message)) => {
                    if let WorkerMessage::Record(job) = message {
                        self.recorders[index] = Some(job.recorder);
                    }
                    failure = Some(RenderError::WorkerDisconnected { index });
                    break;
                }
            }
        }

        let mut report = DispatchReport::default();
        for _ in 0..dispatched {
            let worker = self.reports.recv().map_err(|_| RenderError::WorkerDisconnected {
                index: self.first_outstanding(dispatched),
            })?;

            if worker.panicked {
                report.panicked += 1;
                tracing::warn!(
                    worker = worker.worker_index,
                    frame = frame.frame_index,
                    "render thread panicked while recording, submitting an empty list"
                );
            }

            let stats = worker.recorder.stats();
            report.totals.draws += stats.draws;
            report.totals.material_binds += stats.material_binds;
            report.totals.dropped += stats.dropped;

            self.timings[worker.worker_index] = worker.elapsed;
            self.recorders[worker.worker_index] = Some(worker.recorder);
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(report),
        }
    }

    /// Lowest-index worker among the first `dispatched` that still holds its
    /// recorder.
    fn first_outstanding(&self, dispatched: usize) -> usize {
        self.recorders[..dispatched]
            .iter()
            .position(Option::is_none)
            .unwrap_or(0)
    }

    /// Lists recorded by the last dispatch, in worker-index order.
    pub fn command_lists(&self) -> impl Iterator<Item = CommandList<'_>> {
        self.recorders.iter().flatten().map(|recorder| CommandList {
            worker_index: recorder.worker_index(),
            commands: recorder.commands(),
        })
    }

    /// Recorders in worker-index order.
    pub fn recorders(&self) -> impl Iterator<Item = &CommandRecorder> {
        self.recorders.iter().flatten()
    }

    /// Recording time per worker in the last dispatch.
    #[inline]
    #[must_use]
    pub fn worker_timings(&self) -> &[Duration] {
        &self.timings
    }

    /// Stops every worker and joins its thread.
    ///
    /// Parked workers exit at once; a worker still recording finishes its
    /// job first. Calling this twice is harmless.
    pub fn shutdown(&mut self) {
        for worker in &self.workers {
            // A worker that already exited has dropped its receiver
            let _ = worker.jobs.send(WorkerMessage::Shutdown);
        }

        let mut joined = 0usize;
        for (index, worker) in self.workers.iter_mut().enumerate() {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    tracing::warn!(worker = index, "render thread terminated by a panic");
                }
                joined += 1;
            }
        }

        if joined > 0 {
            tracing::debug!(threads = joined, "render threads joined");
        }
    }
}

impl Drop for RenderThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RenderThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderThreadPool")
            .field("threads", &self.workers.len())
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

fn worker_loop(index: usize, jobs: &Receiver<WorkerMessage>, reports: &Sender<WorkerReport>) {
    while let Ok(message) = jobs.recv() {
        let job = match message {
            WorkerMessage::Record(job) => job,
            WorkerMessage::Shutdown => break,
        };

        if reports.send(run_job(index, job)).is_err() {
            break;
        }
    }

    tracing::trace!(worker = index, "render thread exiting");
}

fn run_job(index: usize, job: RecordJob) -> WorkerReport {
    let RecordJob {
        frame,
        workload,
        range,
        mut recorder,
    } = job;

    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        recorder.record(&frame, &workload[range]);
    }));
    let panicked = outcome.is_err();
    if panicked {
        recorder.reset();
    }

    WorkerReport {
        worker_index: index,
        recorder,
        elapsed: start.elapsed(),
        panicked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{RenderCommand, RenderQueue};
    use crate::pipeline::Extent;
    use crate::workload::synthetic_workload;

    fn frame() -> FrameContext {
        FrameContext {
            frame_index: 7,
            slot: 1,
            extent: Extent::new(640, 480),
            anisotropy: 2,
        }
    }

    fn drawn_ids(pool: &RenderThreadPool) -> Vec<u32> {
        pool.command_lists()
            .flat_map(|list| list.commands.iter())
            .filter_map(|c| match c {
                RenderCommand::DrawIndexed { item_id, .. } => Some(*item_id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_spawn_and_shutdown() {
        let mut pool = RenderThreadPool::spawn(4, RecorderConfig::default()).unwrap();
        assert_eq!(pool.thread_count(), 4);
        pool.shutdown();
        pool.shutdown();
    }

    #[test]
    fn test_every_item_recorded_once_in_order() {
        let mut pool = RenderThreadPool::spawn(3, RecorderConfig::default()).unwrap();
        let workload: Arc<[WorkItem]> = synthetic_workload(100, 9).into();

        let report = pool.dispatch(frame(), &workload).unwrap();

        assert_eq!(report.panicked, 0);
        assert_eq!(report.totals.draws, 100);
        assert_eq!(drawn_ids(&pool), (0..100).collect::<Vec<u32>>());
        let indices: Vec<usize> = pool.command_lists().map(|l| l.worker_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_more_workers_than_items() {
        let mut pool = RenderThreadPool::spawn(8, RecorderConfig::default()).unwrap();
        let workload: Arc<[WorkItem]> = vec![
            WorkItem::new(0, 0, 0, RenderQueue::Opaque),
            WorkItem::new(1, 1, 0, RenderQueue::Opaque),
        ]
        .into();

        pool.dispatch(frame(), &workload).unwrap();

        assert_eq!(pool.command_lists().count(), 8);
        assert_eq!(drawn_ids(&pool), vec![0, 1]);
        // Idle workers still set their state
        assert!(pool.command_lists().all(|l| l.commands.len() >= 2));
    }

    #[test]
    fn test_repeated_dispatch_reuses_recorders() {
        let mut pool = RenderThreadPool::spawn(2, RecorderConfig::default()).unwrap();
        let workload: Arc<[WorkItem]> = synthetic_workload(500, 3).into();

        pool.dispatch(frame(), &workload).unwrap();
        let first: Vec<u32> = pool.recorders().map(CommandRecorder::grow_count).collect();
        for _ in 0..10 {
            pool.dispatch(frame(), &workload).unwrap();
        }
        let later: Vec<u32> = pool.recorders().map(CommandRecorder::grow_count).collect();

        assert_eq!(first, later);
        assert_eq!(pool.worker_timings().len(), 2);
    }

    #[test]
    fn test_panicking_worker_reports_empty_list() {
        let mut pool = RenderThreadPool::spawn(2, RecorderConfig::default()).unwrap();
        let workload: Arc<[WorkItem]> = synthetic_workload(10, 1).into();

        // Worker 1 gets a range past the end of the workload
        let ranges = vec![0..5, 5..50].into_iter();
        let report = pool.dispatch_ranges(frame(), &workload, ranges).unwrap();

        assert_eq!(report.panicked, 1);
        let lists: Vec<usize> = pool.command_lists().map(|l| l.commands.len()).collect();
        assert!(lists[0] > 0);
        assert_eq!(lists[1], 0);

        // The worker survives and records the next frame normally
        let report = pool.dispatch(frame(), &workload).unwrap();
        assert_eq!(report.panicked, 0);
        assert_eq!(report.totals.draws, 10);
    }

    #[test]
    fn test_first_outstanding_names_missing_worker() {
        let mut pool = RenderThreadPool::spawn(4, RecorderConfig::default()).unwrap();
        let out = pool.recorders[2].take();

        assert_eq!(pool.first_outstanding(4), 2);
        assert_eq!(pool.first_outstanding(2), 0);

        pool.recorders[2] = out;
        pool.recorders[1] = None;
        assert_eq!(pool.first_outstanding(4), 1);
    }

    #[test]
    fn test_dispatch_after_shutdown_fails() {
        let mut pool = RenderThreadPool::spawn(2, RecorderConfig::default()).unwrap();
        let workload: Arc<[WorkItem]> = synthetic_workload(4, 1).into();
        pool.shutdown();

        assert!(matches!(
            pool.dispatch(frame(), &workload),
            Err(RenderError::WorkerDisconnected { index: 0 })
        ));
        // Recorder went back to its slot
        assert_eq!(pool.recorders().count(), 2);
    }
}

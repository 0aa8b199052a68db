//! # Profiler Sink
//!
//! Collects per-stage timings for one frame and publishes them as a single
//! immutable [`ProfileSnapshot`].
//!
//! ```text
//! Host thread (writer)                      UI thread (reader)
//! ─────────────────────                     ──────────────────
//! begin_frame(N)
//! record_cpu(Update, ..)
//! record_cpu(Worker(i), ..)                 reader.snapshot()  → frame N-1
//! record_gpu(CommandList(i), ..)
//! publish()  ── pointer swap ──────────────>reader.snapshot()  → frame N
//! ```
//!
//! A reader never observes CPU text from one frame and GPU text from another:
//! both strings live in the same snapshot and are swapped in together.

use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ember_core::SnapshotCell;

use crate::recorder::RecordStats;

/// Name of a timed stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageLabel {
    /// A fixed stage name.
    Named(&'static str),
    /// Recording time of one worker.
    Worker(usize),
    /// Backend execution time of one worker's command list.
    CommandList(usize),
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Worker(index) => write!(f, "  Worker {index}"),
            Self::CommandList(index) => write!(f, "List {index}"),
        }
    }
}

/// One timed stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSample {
    /// Stage name.
    pub label: StageLabel,
    /// Time spent.
    pub duration: Duration,
}

impl StageSample {
    /// Creates a sample.
    #[must_use]
    pub const fn new(label: StageLabel, duration: Duration) -> Self {
        Self { label, duration }
    }
}

/// The latest complete profiling report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileSnapshot {
    /// Frame the report describes; `None` before the first frame.
    pub frame: Option<u64>,
    /// Human-readable CPU breakdown.
    pub cpu: String,
    /// Human-readable GPU breakdown.
    pub gpu: String,
    /// When the report was published.
    pub published_at: Option<Instant>,
}

impl ProfileSnapshot {
    /// Returns true if no frame has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }
}

/// Cheap, cloneable read handle for the published snapshot.
#[derive(Clone, Debug)]
pub struct ProfileReader {
    cell: Arc<SnapshotCell<ProfileSnapshot>>,
}

impl ProfileReader {
    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ProfileSnapshot> {
        self.cell.load()
    }

    /// Returns the current CPU text.
    #[must_use]
    pub fn cpu_profile(&self) -> String {
        self.snapshot().cpu.clone()
    }

    /// Returns the current GPU text.
    #[must_use]
    pub fn gpu_profile(&self) -> String {
        self.snapshot().gpu.clone()
    }

    /// Number of snapshots published so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.cell.generation()
    }
}

/// Per-frame counters shown below the CPU timings.
#[derive(Clone, Copy, Debug, Default)]
struct FrameCounters {
    draws: u64,
    material_binds: u64,
    dropped: u64,
}

/// Accumulates one frame's samples and publishes them.
#[derive(Debug)]
pub struct ProfilerSink {
    frame_index: u64,
    cpu: Vec<StageSample>,
    gpu: Vec<StageSample>,
    counters: FrameCounters,
    cell: Arc<SnapshotCell<ProfileSnapshot>>,
    /// Buffers of a snapshot no reader holds anymore.
    spare: Option<ProfileSnapshot>,
}

impl ProfilerSink {
    /// Creates a sink with room for `workers` per-worker samples.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            frame_index: 0,
            cpu: Vec::with_capacity(workers + 8),
            gpu: Vec::with_capacity(workers + 4),
            counters: FrameCounters::default(),
            cell: Arc::new(SnapshotCell::default()),
            spare: None,
        }
    }

    /// Returns a read handle.
    #[must_use]
    pub fn reader(&self) -> ProfileReader {
        ProfileReader {
            cell: Arc::clone(&self.cell),
        }
    }

    /// Starts accumulating frame `frame_index`, discarding unpublished samples.
    pub fn begin_frame(&mut self, frame_index: u64) {
        self.frame_index = frame_index;
        self.cpu.clear();
        self.gpu.clear();
        self.counters = FrameCounters::default();
    }

    /// Adds a CPU-side sample.
    pub fn record_cpu(&mut self, label: StageLabel, duration: Duration) {
        self.cpu.push(StageSample::new(label, duration));
    }

    /// Adds a GPU-side sample.
    pub fn record_gpu(&mut self, label: StageLabel, duration: Duration) {
        self.gpu.push(StageSample::new(label, duration));
    }

    /// Adds GPU-side samples reported by the backend.
    pub fn record_gpu_samples(&mut self, samples: &[StageSample]) {
        self.gpu.extend_from_slice(samples);
    }

    /// Adds one worker's recording counters.
    pub fn add_record_stats(&mut self, stats: RecordStats) {
        self.counters.draws += u64::from(stats.draws);
        self.counters.material_binds += u64::from(stats.material_binds);
        self.counters.dropped += u64::from(stats.dropped);
    }

    /// Formats the accumulated samples and publishes them atomically.
    pub fn publish(&mut self) {
        let mut snapshot = self.spare.take().unwrap_or_default();
        snapshot.cpu.clear();
        snapshot.gpu.clear();

        // Writing into a String cannot fail
        let _ = self.write_cpu(&mut snapshot.cpu);
        let _ = self.write_gpu(&mut snapshot.gpu);
        snapshot.frame = Some(self.frame_index);
        snapshot.published_at = Some(Instant::now());

        let previous = self.cell.replace(Arc::new(snapshot));
        self.spare = Arc::try_unwrap(previous).ok();
    }

    /// Publishes an empty snapshot.
    pub fn clear(&mut self) {
        self.cpu.clear();
        self.gpu.clear();
        self.counters = FrameCounters::default();
        self.cell.publish(ProfileSnapshot::default());
        self.spare = None;
    }

    fn write_cpu(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "Frame {}", self.frame_index)?;
        writeln!(out, "CPU")?;
        for sample in &self.cpu {
            writeln!(out, "{}: {}", sample.label, Millis(sample.duration))?;
        }
        writeln!(out, "Draws: {}", self.counters.draws)?;
        writeln!(out, "Material binds: {}", self.counters.material_binds)?;
        write!(out, "Dropped: {}", self.counters.dropped)
    }

    fn write_gpu(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "Frame {}", self.frame_index)?;
        writeln!(out, "GPU")?;
        let mut total = Duration::ZERO;
        for sample in &self.gpu {
            total += sample.duration;
            writeln!(out, "{}: {}", sample.label, Millis(sample.duration))?;
        }
        write!(out, "GPU Total: {}", Millis(total))
    }
}

/// Formats a duration as milliseconds with three decimals.
struct Millis(Duration);

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} ms", self.0.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_before_first_publish() {
        let sink = ProfilerSink::new(4);
        let reader = sink.reader();

        let snapshot = reader.snapshot();
        assert!(snapshot.is_empty());
        assert!(reader.cpu_profile().is_empty());
        assert!(reader.gpu_profile().is_empty());
        assert_eq!(reader.generation(), 0);
    }

    #[test]
    fn test_publish_formats_both_sides() {
        let mut sink = ProfilerSink::new(2);
        let reader = sink.reader();

        sink.begin_frame(12);
        sink.record_cpu(StageLabel::Named("Update"), Duration::from_micros(250));
        sink.record_cpu(StageLabel::Worker(0), Duration::from_micros(1500));
        sink.record_gpu(StageLabel::CommandList(0), Duration::from_micros(9800));
        sink.add_record_stats(RecordStats {
            draws: 40,
            material_binds: 5,
            dropped: 1,
        });
        sink.publish();

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.frame, Some(12));
        assert!(snapshot.published_at.is_some());
        assert!(snapshot.cpu.starts_with("Frame 12\nCPU\n"));
        assert!(snapshot.cpu.contains("Update: 0.250 ms"));
        assert!(snapshot.cpu.contains("  Worker 0: 1.500 ms"));
        assert!(snapshot.cpu.contains("Draws: 40"));
        assert!(snapshot.cpu.contains("Dropped: 1"));
        assert!(snapshot.gpu.contains("List 0: 9.800 ms"));
        assert!(snapshot.gpu.ends_with("GPU Total: 9.800 ms"));
    }

    #[test]
    fn test_begin_frame_discards_previous_samples() {
        let mut sink = ProfilerSink::new(1);
        let reader = sink.reader();

        sink.begin_frame(1);
        sink.record_cpu(StageLabel::Named("Stale"), Duration::from_millis(1));
        sink.begin_frame(2);
        sink.record_cpu(StageLabel::Named("Fresh"), Duration::from_millis(1));
        sink.publish();

        let cpu = reader.cpu_profile();
        assert!(!cpu.contains("Stale"));
        assert!(cpu.contains("Fresh"));
    }

    #[test]
    fn test_held_snapshot_survives_later_publishes() {
        let mut sink = ProfilerSink::new(1);
        let reader = sink.reader();

        sink.begin_frame(1);
        sink.record_cpu(StageLabel::Named("Total"), Duration::from_micros(12_300));
        sink.publish();
        let held = reader.snapshot();

        for frame in 2..5 {
            sink.begin_frame(frame);
            sink.record_cpu(StageLabel::Named("Total"), Duration::from_micros(9_800));
            sink.publish();
        }

        assert!(held.cpu.contains("Total: 12.300 ms"));
        assert!(reader.cpu_profile().contains("Total: 9.800 ms"));
        assert_eq!(reader.generation(), 4);
    }

    #[test]
    fn test_clear_publishes_empty() {
        let mut sink = ProfilerSink::new(1);
        let reader = sink.reader();

        sink.begin_frame(3);
        sink.publish();
        sink.clear();

        assert!(reader.snapshot().is_empty());
        assert!(reader.cpu_profile().is_empty());
    }
}

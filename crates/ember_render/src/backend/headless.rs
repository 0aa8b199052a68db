//! Headless backend.
//!
//! Executes command lists on the host thread by folding every command into a
//! running hash. The hash of a frame is its fingerprint: same lists in the
//! same order, same fingerprint.
//!
//! Fences retire lazily: work is done when `present` returns, but a fence is
//! only marked complete once the pipeline waits on it, which exercises the
//! same frame-in-flight path a GPU backend goes through.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use crate::backend::{validate_extent, BackendDesc, PresentInfo, RenderBackend};
use crate::command::{CommandList, RenderCommand};
use crate::error::{RenderError, RenderResult};
use crate::pipeline::{Extent, FrameContext};
use crate::profiler::{StageLabel, StageSample};

/// CPU-only backend used by tests, benches and the demo.
#[derive(Debug)]
pub struct HeadlessBackend {
    extent: Extent,
    anisotropy: u8,
    /// Frame whose lists are being executed.
    open_frame: Option<u64>,
    hasher: DefaultHasher,
    command_count: u64,
    draw_count: u64,
    timings: Vec<StageSample>,
    signalled_fence: u64,
    completed_fence: u64,
}

impl HeadlessBackend {
    /// Anisotropy level currently applied.
    #[inline]
    #[must_use]
    pub const fn anisotropy(&self) -> u8 {
        self.anisotropy
    }

    fn begin_frame_if_needed(&mut self, frame: &FrameContext) {
        if self.open_frame == Some(frame.frame_index) {
            return;
        }
        self.open_frame = Some(frame.frame_index);
        self.hasher = DefaultHasher::new();
        self.command_count = 0;
        self.draw_count = 0;
        self.timings.clear();
    }
}

impl RenderBackend for HeadlessBackend {
    fn create(desc: &BackendDesc) -> RenderResult<Self> {
        validate_extent::<Self>(desc.extent).map_err(|_| {
            RenderError::BackendCreation(format!(
                "unsupported target extent {} (max {m}x{m})",
                desc.extent,
                m = Self::MAX_EXTENT
            ))
        })?;

        tracing::debug!(extent = %desc.extent, anisotropy = desc.anisotropy, "headless backend created");

        Ok(Self {
            extent: desc.extent,
            anisotropy: desc.anisotropy,
            open_frame: None,
            hasher: DefaultHasher::new(),
            command_count: 0,
            draw_count: 0,
            timings: Vec::with_capacity(crate::config::MAX_RENDER_THREADS + 1),
            signalled_fence: 0,
            completed_fence: 0,
        })
    }

    fn extent(&self) -> Extent {
        self.extent
    }

    fn resize(&mut self, extent: Extent) -> RenderResult<()> {
        validate_extent::<Self>(extent)?;
        self.extent = extent;
        Ok(())
    }

    fn set_anisotropy(&mut self, level: u8) {
        self.anisotropy = level;
    }

    fn execute(&mut self, frame: &FrameContext, list: CommandList<'_>) -> RenderResult<()> {
        self.begin_frame_if_needed(frame);
        let start = Instant::now();

        list.worker_index.hash(&mut self.hasher);
        for command in list.commands {
            if let RenderCommand::SetViewport { width, height } = *command {
                if Extent::new(width, height) != self.extent {
                    // A retried frame must not absorb this partial stream
                    self.open_frame = None;
                    return Err(RenderError::Backend(format!(
                        "list {} targets {width}x{height}, backbuffer is {}",
                        list.worker_index, self.extent
                    )));
                }
            }
            command.hash(&mut self.hasher);
            if command.is_draw() {
                self.draw_count += 1;
            }
        }
        self.command_count += list.commands.len() as u64;

        self.timings.push(StageSample::new(
            StageLabel::CommandList(list.worker_index),
            start.elapsed(),
        ));
        Ok(())
    }

    fn present(&mut self, frame: &FrameContext) -> RenderResult<PresentInfo> {
        self.begin_frame_if_needed(frame);
        let start = Instant::now();

        self.signalled_fence += 1;
        let info = PresentInfo {
            frame_index: frame.frame_index,
            fence_value: self.signalled_fence,
            command_count: self.command_count,
            draw_count: self.draw_count,
            fingerprint: self.hasher.finish(),
        };
        self.open_frame = None;

        self.timings
            .push(StageSample::new(StageLabel::Named("Present"), start.elapsed()));
        Ok(info)
    }

    fn completed_fence(&self) -> u64 {
        self.completed_fence
    }

    fn wait_for_fence(&mut self, value: u64) {
        self.completed_fence = self.completed_fence.max(value.min(self.signalled_fence));
    }

    fn wait_idle(&mut self) {
        self.completed_fence = self.signalled_fence;
    }

    fn gpu_timings(&self) -> &[StageSample] {
        &self.timings
    }
}

//! # Render Command Recorder
//!
//! Each worker owns exactly one recorder. The recorder moves to the worker
//! with the frame's job and back to the coordinator with the report, so two
//! workers can never touch the same buffer.
//!
//! ## Exhaustion
//!
//! ```text
//! worst case = PREAMBLE_COMMANDS (viewport + sampler)
//!            + MAX_COMMANDS_PER_ITEM per item (bind + draw)
//!
//! worst case <= max_commands  →  record everything (buffer grows as needed)
//! worst case >  max_commands  →  keep the highest-priority items that fit,
//!                                drop the rest for this frame
//! allocation fails mid-item   →  roll that item back, drop it
//! ```

use ember_core::BoundedBuffer;

use crate::command::{RenderCommand, WorkItem};
use crate::config::RecorderConfig;
use crate::pipeline::FrameContext;

/// Commands emitted before the first item.
const PREAMBLE_COMMANDS: usize = 2;
/// Upper bound of commands one item can emit.
const MAX_COMMANDS_PER_ITEM: usize = 2;

/// Outcome of recording one partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordStats {
    /// Draw commands recorded.
    pub draws: u32,
    /// Material binds recorded.
    pub material_binds: u32,
    /// Items dropped because the buffer ran out of space.
    pub dropped: u32,
}

/// Per-worker command buffer for one frame.
#[derive(Debug)]
pub struct CommandRecorder {
    worker_index: usize,
    commands: BoundedBuffer<RenderCommand>,
    /// Indices of admitted items, reused every frame.
    admitted: Vec<usize>,
    stats: RecordStats,
}

impl CommandRecorder {
    /// Creates the recorder for worker `worker_index`.
    #[must_use]
    pub fn new(worker_index: usize, config: RecorderConfig) -> Self {
        Self {
            worker_index,
            commands: BoundedBuffer::new(config.initial_commands, config.max_commands),
            admitted: Vec::new(),
            stats: RecordStats::default(),
        }
    }

    /// Index of the worker owning this recorder.
    #[inline]
    #[must_use]
    pub const fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// Commands recorded for the current frame.
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        self.commands.as_slice()
    }

    /// Stats of the last recording.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> RecordStats {
        self.stats
    }

    /// Number of times the command buffer grew since creation.
    #[inline]
    #[must_use]
    pub fn grow_count(&self) -> u32 {
        self.commands.stats().grow_count
    }

    /// Discards the current frame's commands, keeping the allocation.
    pub fn reset(&mut self) {
        self.commands.clear();
        self.stats = RecordStats::default();
    }

    /// Records `items` for `frame`, replacing whatever was recorded before.
    pub fn record(&mut self, frame: &FrameContext, items: &[WorkItem]) -> RecordStats {
        self.reset();

        let preamble = [
            RenderCommand::SetViewport {
                width: frame.extent.width,
                height: frame.extent.height,
            },
            RenderCommand::SetSampler {
                anisotropy: frame.anisotropy,
            },
        ];
        for command in preamble {
            if self.commands.try_push(command).is_err() {
                // Cannot even set state: present an empty list
                self.commands.clear();
                self.stats.dropped = saturating_u32(items.len());
                return self.stats;
            }
        }

        debug_assert_eq!(self.commands.len(), PREAMBLE_COMMANDS);
        self.admit(items);

        let mut bound_material = None;
        for slot in 0..self.admitted.len() {
            let item = &items[self.admitted[slot]];
            let rollback = self.commands.len();

            if self.record_item(item, &mut bound_material).is_err() {
                self.commands.truncate(rollback);
                bound_material = last_bound_material(self.commands.as_slice());
                self.stats.dropped += 1;
            }
        }

        self.stats
    }

    /// Fills `admitted` with the indices of the items that fit, in input
    /// order. Lowest priority (then latest index) goes first when space runs
    /// out.
    fn admit(&mut self, items: &[WorkItem]) {
        self.admitted.clear();
        self.admitted.extend(0..items.len());

        let budget = self.commands.remaining() / MAX_COMMANDS_PER_ITEM;
        if items.len() <= budget {
            return;
        }

        // Highest priority first, earliest index breaks ties
        self.admitted
            .sort_unstable_by(|&a, &b| items[b].priority.cmp(&items[a].priority).then(a.cmp(&b)));
        self.admitted.truncate(budget);
        self.admitted.sort_unstable();

        self.stats.dropped += saturating_u32(items.len() - budget);
        tracing::warn!(
            worker = self.worker_index,
            dropped = items.len() - budget,
            limit = self.commands.limit(),
            "command buffer exhausted, dropping lowest-priority items"
        );
    }

    fn record_item(
        &mut self,
        item: &WorkItem,
        bound_material: &mut Option<u32>,
    ) -> Result<(), ember_core::BufferError> {
        if *bound_material != Some(item.material_id) {
            self.commands.try_push(RenderCommand::BindMaterial {
                material_id: item.material_id,
            })?;
            self.stats.material_binds += 1;
            *bound_material = Some(item.material_id);
        }

        self.commands.try_push(RenderCommand::DrawIndexed {
            item_id: item.item_id,
            mesh_id: item.mesh_id,
            submesh: item.submesh,
            instance_count: item.instance_count,
        })?;
        self.stats.draws += 1;
        Ok(())
    }
}

fn last_bound_material(commands: &[RenderCommand]) -> Option<u32> {
    commands.iter().rev().find_map(|command| match command {
        RenderCommand::BindMaterial { material_id } => Some(*material_id),
        _ => None,
    })
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

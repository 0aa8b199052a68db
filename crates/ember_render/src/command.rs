//! Render commands and the work items they are recorded from.

/// Render queue a work item belongs to. Later queues draw on top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderQueue {
    /// Fully opaque geometry.
    Opaque,
    /// Alpha-tested geometry.
    Cutoff,
    /// Alpha-blended geometry.
    Transparent,
}

impl RenderQueue {
    /// Default priority for items in this queue. Opaque geometry survives
    /// exhaustion longest.
    #[must_use]
    pub const fn default_priority(self) -> u8 {
        match self {
            Self::Opaque => 200,
            Self::Cutoff => 150,
            Self::Transparent => 100,
        }
    }
}

/// One renderable the workers record a draw for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkItem {
    /// Stable identifier of the renderable.
    pub item_id: u32,
    /// Mesh to draw.
    pub mesh_id: u32,
    /// Submesh within the mesh.
    pub submesh: u16,
    /// Material to bind.
    pub material_id: u32,
    /// Instances drawn with this item.
    pub instance_count: u32,
    /// Render queue.
    pub queue: RenderQueue,
    /// Higher priority items are kept when a worker runs out of space.
    pub priority: u8,
}

impl WorkItem {
    /// Creates a single-instance item with its queue's default priority.
    #[must_use]
    pub const fn new(item_id: u32, mesh_id: u32, material_id: u32, queue: RenderQueue) -> Self {
        Self {
            item_id,
            mesh_id,
            submesh: 0,
            material_id,
            instance_count: 1,
            queue,
            priority: queue.default_priority(),
        }
    }

    /// Overrides the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// A single recorded command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderCommand {
    /// Sets the viewport to the full target.
    SetViewport {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Sets the global sampler state.
    SetSampler {
        /// Anisotropic filtering level.
        anisotropy: u8,
    },
    /// Binds a material's pipeline and resources.
    BindMaterial {
        /// Material to bind.
        material_id: u32,
    },
    /// Draws one work item.
    DrawIndexed {
        /// Work item being drawn.
        item_id: u32,
        /// Mesh to draw.
        mesh_id: u32,
        /// Submesh within the mesh.
        submesh: u16,
        /// Instances to draw.
        instance_count: u32,
    },
}

impl RenderCommand {
    /// Returns true for draw commands.
    #[inline]
    #[must_use]
    pub const fn is_draw(&self) -> bool {
        matches!(self, Self::DrawIndexed { .. })
    }
}

/// One worker's recorded commands, handed to the backend for execution.
#[derive(Clone, Copy, Debug)]
pub struct CommandList<'a> {
    /// Index of the worker that recorded the list.
    pub worker_index: usize,
    /// Commands in recording order.
    pub commands: &'a [RenderCommand],
}

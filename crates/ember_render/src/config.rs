//! # Engine Configuration
//!
//! Loaded once at startup, validated before any thread is spawned.
//!
//! ```toml
//! render_threads = 4
//! width = 1920
//! height = 1080
//! anisotropy = 8
//! frames_in_flight = 2
//!
//! [recorder]
//! initial_commands = 1024
//! max_commands = 65536
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Smallest supported worker count.
pub const MIN_RENDER_THREADS: usize = 2;
/// Largest supported worker count.
pub const MAX_RENDER_THREADS: usize = 16;
/// Smallest anisotropic filtering level.
pub const MIN_ANISOTROPY: u8 = 1;
/// Largest anisotropic filtering level.
pub const MAX_ANISOTROPY: u8 = 16;
/// Largest number of frames the backend may have in flight.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;
/// Largest per-worker command limit.
pub const MAX_RECORDER_COMMANDS: usize = 1 << 24;

/// Per-worker command buffer sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Commands pre-allocated per worker.
    pub initial_commands: usize,
    /// Hard limit of commands per worker per frame.
    pub max_commands: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            initial_commands: 1024,
            max_commands: 65_536,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of render worker threads, in `[2, 16]`.
    pub render_threads: usize,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Global anisotropic filtering level, in `[1, 16]`.
    pub anisotropy: u8,
    /// Frames the backend may work on concurrently, in `[1, 3]`.
    pub frames_in_flight: usize,
    /// Lower `render_threads` to the machine's available parallelism.
    pub limit_to_available_parallelism: bool,
    /// Command buffer sizing.
    pub recorder: RecorderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_threads: 4,
            width: 1920,
            height: 1080,
            anisotropy: 8,
            frames_in_flight: 2,
            limit_to_available_parallelism: false,
            recorder: RecorderConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration from the three values every host provides.
    #[must_use]
    pub fn new(render_threads: usize, width: u32, height: u32) -> Self {
        Self {
            render_threads,
            width,
            height,
            ..Self::default()
        }
    }

    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] if the document does not parse.
    pub fn from_toml_str(source: &str) -> RenderResult<Self> {
        toml::from_str(source).map_err(|e| RenderError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            RenderError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks every range constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> RenderResult<()> {
        if !(MIN_RENDER_THREADS..=MAX_RENDER_THREADS).contains(&self.render_threads) {
            return Err(RenderError::InvalidThreadCount {
                requested: i64::try_from(self.render_threads).unwrap_or(i64::MAX),
                min: MIN_RENDER_THREADS,
                max: MAX_RENDER_THREADS,
            });
        }

        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidResolution {
                width: i64::from(self.width),
                height: i64::from(self.height),
            });
        }

        validate_anisotropy(i64::from(self.anisotropy))?;

        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&self.frames_in_flight) {
            return Err(RenderError::InvalidConfig(format!(
                "frames_in_flight must be in [1, {MAX_FRAMES_IN_FLIGHT}], got {}",
                self.frames_in_flight
            )));
        }

        if !(4..=MAX_RECORDER_COMMANDS).contains(&self.recorder.max_commands) {
            return Err(RenderError::InvalidConfig(format!(
                "recorder.max_commands must be in [4, {MAX_RECORDER_COMMANDS}], got {}",
                self.recorder.max_commands
            )));
        }

        if self.recorder.initial_commands > self.recorder.max_commands {
            return Err(RenderError::InvalidConfig(format!(
                "recorder.initial_commands ({}) exceeds recorder.max_commands ({})",
                self.recorder.initial_commands, self.recorder.max_commands
            )));
        }

        Ok(())
    }

    /// Returns the worker count that will actually be spawned.
    ///
    /// Equal to `render_threads` unless `limit_to_available_parallelism` is
    /// set, in which case it never exceeds the machine's parallelism (and
    /// never drops below the minimum).
    #[must_use]
    pub fn effective_thread_count(&self) -> usize {
        if !self.limit_to_available_parallelism {
            return self.render_threads;
        }

        let available = std::thread::available_parallelism().map_or(MIN_RENDER_THREADS, usize::from);
        self.render_threads.min(available).max(MIN_RENDER_THREADS)
    }
}

/// Validates an anisotropy level coming from the host.
///
/// # Errors
///
/// Returns [`RenderError::InvalidAnisotropy`] outside `[1, 16]`.
pub fn validate_anisotropy(level: i64) -> RenderResult<u8> {
    u8::try_from(level)
        .ok()
        .filter(|l| (MIN_ANISOTROPY..=MAX_ANISOTROPY).contains(l))
        .ok_or(RenderError::InvalidAnisotropy(level))
}

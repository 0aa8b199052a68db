//! # Render Error Types
//!
//! All errors that can occur inside the engine. None of them cross the host
//! boundary: the control surface turns each into a sentinel.

use thiserror::Error;

/// Errors that can occur in the render engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Requested worker count is outside the supported range.
    #[error("invalid render thread count {requested}: must be in [{min}, {max}]")]
    InvalidThreadCount {
        /// The count that was requested.
        requested: i64,
        /// Smallest supported count.
        min: usize,
        /// Largest supported count.
        max: usize,
    },

    /// Target resolution is empty or too large.
    #[error("invalid resolution {width}x{height}")]
    InvalidResolution {
        /// Requested width.
        width: i64,
        /// Requested height.
        height: i64,
    },

    /// Anisotropic filtering level is outside the supported range.
    #[error("invalid anisotropy level {0}: must be in [1, 16]")]
    InvalidAnisotropy(i64),

    /// Any other configuration value is invalid or unparsable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backend context could not be created.
    #[error("backend creation failed: {0}")]
    BackendCreation(String),

    /// A worker thread could not be spawned.
    #[error("failed to spawn render thread {index}: {reason}")]
    ThreadSpawn {
        /// Index of the worker that failed.
        index: usize,
        /// OS error text.
        reason: String,
    },

    /// An engine instance already exists.
    #[error("engine already initialized")]
    AlreadyInitialized,

    /// The operation requires a running engine.
    #[error("engine is not running")]
    NotRunning,

    /// A worker thread exited while the coordinator still needed it.
    #[error("render thread {index} disconnected")]
    WorkerDisconnected {
        /// Index of the lost worker.
        index: usize,
    },

    /// The backend failed during a frame.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

use thiserror::Error;

use lumen_engine::device::{BackendError, ContextUnavailable};

use crate::compositor::CompositorState;

/// Invalid or missing configuration; prevents start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no scene source configured")]
    MissingScene,
}

/// GPU resource allocation failed while initializing the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error(transparent)]
    ContextUnavailable(#[from] ContextUnavailable),

    #[error("failed to allocate renderer resources: {0}")]
    Allocation(#[from] BackendError),
}

/// Scene loading, compilation, or node access failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// Empty source, or a component reference that cannot be resolved.
    #[error("scene not found: {0}")]
    NotFound(String),

    #[error("scene compile failed: {message}")]
    CompileFailed { message: String },

    #[error("scene compiled without a root node")]
    NoRootNode,

    /// The handle belongs to a scene that has since been replaced.
    #[error("node handle does not belong to the active scene")]
    StaleHandle,

    #[error("no scene is loaded")]
    NoScene,
}

impl SceneError {
    pub(crate) fn compile(message: impl Into<String>) -> Self {
        SceneError::CompileFailed { message: message.into() }
    }

    pub(crate) fn at(line: usize, col: usize, message: impl std::fmt::Display) -> Self {
        SceneError::CompileFailed { message: format!("{line}:{col}: {message}") }
    }
}

/// A single render pass failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("no scene is loaded")]
    NoScene,

    #[error("renderer is not initialized")]
    NotInitialized,

    #[error("GPU failure: {0}")]
    GpuFailure(#[from] BackendError),

    #[error(transparent)]
    ContextUnavailable(#[from] ContextUnavailable),
}

/// Everything the compositor reports to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    ContextUnavailable(#[from] ContextUnavailable),

    #[error("cannot {operation} while {state}")]
    InvalidState { operation: &'static str, state: CompositorState },

    #[error("caps have not been negotiated")]
    NotNegotiated,
}

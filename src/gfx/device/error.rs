//! Error types raised by the graphics device and by uniform value contracts.

use thiserror::Error;

use super::uniform::UniformType;

/// Failures reported by a [`GraphicsDevice`](super::GraphicsDevice) implementation.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to create program '{label}': {reason}")]
    ProgramCreation { label: String, reason: String },

    #[error("unknown {kind} resource #{id}")]
    UnknownResource { kind: &'static str, id: u64 },

    #[error("surface unavailable: {0}")]
    Surface(String),

    #[error("failed to initialise the graphics backend: {0}")]
    Initialization(String),
}

/// Violations of the shading-property value contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UniformError {
    #[error("uniform '{name}' holds {expected:?}, cannot store {found:?}")]
    TypeMismatch {
        name: String,
        expected: UniformType,
        found: UniformType,
    },

    #[error("no parameter named '{0}'")]
    UnknownParameter(String),
}

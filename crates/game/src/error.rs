//! Errors that stop a session from starting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The render collaborator could not provide a drawing context.
    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),
    /// A config value is outside the range the simulation can run with.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

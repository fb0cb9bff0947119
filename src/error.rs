//! Error types for lane setup

use thiserror::Error;

/// Errors raised while wiring or configuring lane components.
///
/// Runtime guards (double launch, pin already fallen, reset in flight) are
/// not errors; they are silent no-ops.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{component}: {collaborator} is not assigned")]
    MissingCollaborator {
        component: &'static str,
        collaborator: &'static str,
    },

    #[error("{component}: entity {entity} has no rigid body")]
    MissingBody { component: &'static str, entity: u32 },

    #[error("no pin set found and pin template {0} is unavailable")]
    MissingPinTemplate(u32),

    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn missing(component: &'static str, collaborator: &'static str) -> Self {
        ConfigError::MissingCollaborator {
            component,
            collaborator,
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service not offered: {0}")]
    NotOffered(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Upstream read failed: {0}")]
    UpstreamReadFailure(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}


// Typed errors with thiserror. Runtime rendering problems never surface here;
// only boundary mistakes (bad config, unknown engine, unknown slot) do.

use thiserror::Error;

use crate::types::EngineKind;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown engine kind: {0}")]
    UnknownEngine(String),

    #[error("Render surface unavailable for {0:?}")]
    SurfaceUnavailable(EngineKind),

    #[error("No engine mounted in slot {0}")]
    UnknownSlot(u32),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            EngineError::InvalidConfig(err.to_string())
        } else {
            EngineError::Serialization(err.to_string())
        }
    }
}

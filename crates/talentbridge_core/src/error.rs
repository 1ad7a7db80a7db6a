//! Error types for core operations.

use thiserror::Error;

/// Errors surfaced by the store, the call flow and the procedure backend.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported command: {0}")]
    UnknownCommand(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("Already applied")]
    AlreadyApplied,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    /// Start was refused because candidates are still in the waiting room.
    #[error("{count} candidate(s) still waiting to be admitted")]
    CandidatesWaiting { count: usize },

    #[error("{candidate} has not been admitted to call {call_id}")]
    NotAdmitted { call_id: String, candidate: String },

    #[error("{candidate} was removed from the waiting room of call {call_id}")]
    RemovedFromWaitingRoom { call_id: String, candidate: String },

    #[error("call {0} is already active")]
    CallAlreadyActive(String),

    #[error("no active call")]
    NoActiveCall,

    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code reported across the invoke boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "unknown_command",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::AlreadyApplied => "already_applied",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::CandidatesWaiting { .. } => "candidates_waiting",
            Self::NotAdmitted { .. } => "not_admitted",
            Self::RemovedFromWaitingRoom { .. } => "removed_from_waiting_room",
            Self::CallAlreadyActive(_) => "call_already_active",
            Self::NoActiveCall => "no_active_call",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_backend_wording() {
        assert_eq!(CoreError::not_found("Job", "9").to_string(), "Job not found: 9");
        assert_eq!(CoreError::AlreadyApplied.to_string(), "Already applied");
        assert_eq!(CoreError::AlreadyApplied.code(), "already_applied");
    }

    #[test]
    fn test_storage_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("disk full").context("failed to write store");
        let error = CoreError::from(inner);
        assert_eq!(error.code(), "storage_error");
        assert!(error.to_string().contains("disk full"));
    }
}

//! Typed error hierarchy for the diner runtime.
//!
//! One enum per subsystem:
//! - `ConfigError`: configuration loading and validation
//! - `OrchestratorError`: starting, driving and stopping a run
//! - `GateError`: the UI gate channel
//! - `SurveyError`: rejected survey selections
//! - `SessionError`: writes to a sealed session
//! - `RecordError`: durable record output
//! - `IdentityError`: participant preferences

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cue '{cue}' has invalid duration {duration_secs}")]
    InvalidCueDuration { cue: String, duration_secs: f32 },
}

/// Errors from the phase orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Cannot start: no {role} attached")]
    MissingCollaborator { role: &'static str },

    #[error("UI gate unavailable during {stage}")]
    GateUnavailable { stage: String },

    #[error("Session already flushed; a new run needs a new process")]
    SessionSealed,

    #[error("Main sequence is running; manual walks are only accepted while idle")]
    SequenceRunning,
}

/// Errors from the UI gate channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("UI gate disconnected")]
    Disconnected,
}

/// Reasons a survey selection is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurveyError {
    #[error("Survey has not started")]
    NotStarted,

    #[error("Survey panel is still initializing")]
    Initializing,

    #[error("Option {option} out of range (panel has {options} options)")]
    OptionOutOfRange { option: u32, options: u32 },

    #[error("Survey already complete")]
    AlreadyComplete,

    #[error(transparent)]
    Gate(#[from] GateError),
}

/// Errors from writes to the session store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session for participant {participant_id} is sealed")]
    Sealed { participant_id: String },
}

/// Errors from the durable record writer.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Record I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the participant preferences store.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Failed to access preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse preferences at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    InvalidCondition(#[from] diner_common::InvalidCondition),
}

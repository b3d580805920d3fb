//! Participant identity preferences (participant id + condition).
//!
//! Stored as a small TOML key-value file so the experimenter can set the
//! next participant before launching a run.

use std::fs;
use std::path::Path;

use diner_common::Condition;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::IdentityError;

const DEFAULT_PARTICIPANT_ID: &str = "1";

/// Raw key-value contents of the prefs file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<i64>,
}

/// Identity resolved for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub participant_id: String,
    pub condition: Condition,
}

impl ParticipantPrefs {
    /// Read prefs; a missing file yields empty prefs.
    pub fn load(path: &Path) -> Result<Self, IdentityError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| IdentityError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| IdentityError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), IdentityError> {
        let io_err = |source| IdentityError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)
    }

    /// Set the participant and (optionally) the condition, validating the latter.
    pub fn assign(&mut self, participant_id: &str, condition: Option<u8>) -> Result<(), IdentityError> {
        let condition = condition.map(Condition::new).transpose()?;
        self.participant_id = Some(participant_id.to_string());
        if let Some(condition) = condition {
            self.condition = Some(i64::from(condition.get()));
        }
        Ok(())
    }

    /// Resolve the run identity, applying defaults for missing values.
    ///
    /// A missing participant id defaults to `1` and is written back so the
    /// next launch sees it. The condition falls back to `1` without being
    /// persisted.
    pub fn load_or_init(path: &Path) -> Result<Identity, IdentityError> {
        let mut prefs = Self::load(path)?;

        let participant_id = match prefs.participant_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!(path = %path.display(), "No participant id set; defaulting to {}", DEFAULT_PARTICIPANT_ID);
                prefs.participant_id = Some(DEFAULT_PARTICIPANT_ID.to_string());
                prefs.save(path)?;
                DEFAULT_PARTICIPANT_ID.to_string()
            }
        };

        let condition = match prefs.condition {
            Some(raw) => match u8::try_from(raw).ok().map(Condition::new) {
                Some(Ok(condition)) => condition,
                _ => {
                    warn!(condition = raw, "Invalid condition in preferences; defaulting to 1");
                    Condition::default()
                }
            },
            None => {
                warn!("No condition set; defaulting to 1");
                Condition::default()
            }
        };

        info!(participant = %participant_id, condition = condition.get(), "Participant identity loaded");
        Ok(Identity {
            participant_id,
            condition,
        })
    }
}

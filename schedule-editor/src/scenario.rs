//! On-disk scenario: a network and the schedule edited against it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Network, TransitSchedule};

/// Errors reading or writing a scenario file.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Reading or writing the file failed
    #[error("scenario file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a valid scenario
    #[error("scenario file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Network plus transit schedule, stored as one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    pub network: Network,
    pub schedule: TransitSchedule,
}

impl Scenario {
    pub fn new(network: Network, schedule: TransitSchedule) -> Self {
        Self { network, schedule }
    }

    /// Read a scenario from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Scenario =
            serde_json::from_str(&contents).map_err(|source| ScenarioError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            path = %path.display(),
            links = scenario.network.links().count(),
            lines = scenario.schedule.lines().count(),
            "loaded scenario"
        );
        Ok(scenario)
    }

    /// Write the scenario to `path` as pretty-printed JSON.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
        let path = path.as_ref();
        let io_error = |source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| ScenarioError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_error)?;

        debug!(path = %path.display(), "saved scenario");
        Ok(())
    }
}

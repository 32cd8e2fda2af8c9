//! Terminal status report
//!
//! Written to a well-known path on every exit, success or failure, so
//! external health checks can react to a classified outcome instead of
//! parsing boot logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::{write_atomic, Error, Outcome, Result};

use super::state::Phase;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub outcome: Outcome,
    pub message: String,
    /// Last phase that completed before the run ended
    pub phase: Phase,
    /// Node ID, when identity parsing got far enough to know it
    pub node_id: Option<u32>,
    pub finished_at: DateTime<Utc>,
}

impl StatusReport {
    pub fn success(phase: Phase, node_id: u32) -> Self {
        Self {
            outcome: Outcome::Success,
            message: "bootstrap complete".to_string(),
            phase,
            node_id: Some(node_id),
            finished_at: Utc::now(),
        }
    }

    pub fn failure(error: &Error, phase: Phase, node_id: Option<u32>) -> Self {
        Self {
            outcome: error.outcome(),
            message: error.to_string(),
            phase,
            node_id,
            finished_at: Utc::now(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, &serde_json::to_string_pretty(self)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

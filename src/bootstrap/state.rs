//! Step ledger
//!
//! Each completed bootstrap step is recorded as an ordered phase transition
//! persisted to a local JSON file, so a restarted bootstrap resumes after
//! the last completed step instead of blindly re-running side-effecting
//! steps. The ledger is the only bootstrap state kept outside what Kafka
//! itself persists to disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::common::{timestamp_now, write_atomic, Error, Result};

/// Ordered bootstrap phases. `StorageFormatted` is recorded only on the
/// first node; the others skip straight from `ServiceEnabled` to `Running`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    #[default]
    NotStarted,
    DependenciesInstalled,
    DistributionReady,
    ConfigWritten,
    ServiceEnabled,
    StorageFormatted,
    Running,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::NotStarted => "not-started",
            Phase::DependenciesInstalled => "dependencies-installed",
            Phase::DistributionReady => "distribution-ready",
            Phase::ConfigWritten => "config-written",
            Phase::ServiceEnabled => "service-enabled",
            Phase::StorageFormatted => "storage-formatted",
            Phase::Running => "running",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerRecord {
    phase: Phase,
    updated_at: u64,
}

/// Persistent record of the last completed phase.
#[derive(Debug)]
pub struct StateLedger {
    path: PathBuf,
    phase: Phase,
}

impl StateLedger {
    /// Open the ledger, loading the previously recorded phase if any.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let phase = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let record: LedgerRecord = serde_json::from_str(&raw)
                    .map_err(|e| Error::State(format!("corrupt ledger {}: {}", path.display(), e)))?;
                record.phase
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Phase::NotStarted,
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, phase })
    }

    /// Last completed phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Record a completed phase. Transitions only move forward; recording an
    /// earlier phase than the current one is a ledger error.
    pub fn record(&mut self, phase: Phase) -> Result<()> {
        if phase < self.phase {
            return Err(Error::State(format!(
                "phase moved backwards: {} -> {}",
                self.phase, phase
            )));
        }
        let record = LedgerRecord {
            phase,
            updated_at: timestamp_now(),
        };
        write_atomic(&self.path, &serde_json::to_string_pretty(&record)?)?;
        self.phase = phase;
        tracing::info!("bootstrap phase complete: {}", phase);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_ledger_starts_not_started() {
        let dir = TempDir::new().unwrap();
        let ledger = StateLedger::open(dir.path().join("state.json")).unwrap();
        assert_eq!(ledger.phase(), Phase::NotStarted);
    }

    #[test]
    fn test_ledger_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        {
            let mut ledger = StateLedger::open(&path).unwrap();
            ledger.record(Phase::DependenciesInstalled).unwrap();
            ledger.record(Phase::DistributionReady).unwrap();
        }

        let ledger = StateLedger::open(&path).unwrap();
        assert_eq!(ledger.phase(), Phase::DistributionReady);
    }

    #[test]
    fn test_ledger_rejects_backwards_transition() {
        let dir = TempDir::new().unwrap();
        let mut ledger = StateLedger::open(dir.path().join("state.json")).unwrap();

        ledger.record(Phase::ConfigWritten).unwrap();
        let err = ledger.record(Phase::DependenciesInstalled).unwrap_err();
        assert!(matches!(err, Error::State(_)));
        assert_eq!(ledger.phase(), Phase::ConfigWritten);
    }

    #[test]
    fn test_phase_ordering() {
        assert!(Phase::NotStarted < Phase::DependenciesInstalled);
        assert!(Phase::ConfigWritten < Phase::ServiceEnabled);
        assert!(Phase::StorageFormatted < Phase::Running);
    }

    #[test]
    fn test_corrupt_ledger_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(StateLedger::open(&path), Err(Error::State(_))));
    }
}

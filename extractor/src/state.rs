use chrono::{DateTime, Utc};
use extractor_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Per-stream bookmarks persisted between runs.
///
/// A bookmark marks how far incremental extraction has progressed; it is
/// read once at the start of a stream's sync and advanced exactly once,
/// at the end, only if the sync completed without error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    bookmarks: BTreeMap<String, DateTime<Utc>>,
}

impl State {
    /// Load saved state; a missing file is a first run, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No state file, starting fresh");
            return Ok(State::default());
        }

        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::Checkpoint(format!("invalid state file {}: {}", path.display(), e))
        })
    }

    /// Replace the state file wholesale. Write-then-rename so a crash
    /// mid-save never leaves a truncated file behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "State saved");
        Ok(())
    }

    pub fn since(&self, stream: &str) -> Option<DateTime<Utc>> {
        self.bookmarks.get(stream).copied()
    }

    /// Advance a stream's bookmark. Never moves backwards, so a replayed
    /// or out-of-order advance cannot lose progress.
    pub fn advance(&mut self, stream: &str, ts: DateTime<Utc>) {
        let entry = self.bookmarks.entry(stream.to_string()).or_insert(ts);
        if *entry < ts {
            *entry = ts;
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn absent_bookmark_reads_as_none() {
        let state = State::default();
        assert_eq!(state.since("incidents"), None);
    }

    #[test]
    fn advance_sets_and_moves_forward() {
        let mut state = State::default();
        state.advance("incidents", ts(2020, 1, 1));
        assert_eq!(state.since("incidents"), Some(ts(2020, 1, 1)));

        state.advance("incidents", ts(2020, 6, 1));
        assert_eq!(state.since("incidents"), Some(ts(2020, 6, 1)));
    }

    #[test]
    fn advance_never_moves_backwards() {
        let mut state = State::default();
        state.advance("incidents", ts(2020, 6, 1));
        state.advance("incidents", ts(2019, 1, 1));
        assert_eq!(state.since("incidents"), Some(ts(2020, 6, 1)));
    }

    #[test]
    fn bookmarks_are_scoped_per_stream() {
        let mut state = State::default();
        state.advance("incidents", ts(2020, 1, 1));
        assert_eq!(state.since("alerts"), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = State::default();
        state.advance("incidents", ts(2020, 3, 15));
        state.save(&path).unwrap();

        let loaded = State::load(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = State::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, State::default());
    }

    #[test]
    fn corrupt_file_is_a_checkpoint_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();

        let err = State::load(&path).unwrap_err();
        assert!(matches!(err, Error::Checkpoint(_)));
    }
}

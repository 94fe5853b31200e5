// src/history/schedule.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Runs after which the cadence drops from daily to weekly.
pub const DAILY_RUNS: u64 = 5;

/// Whether the import should be scheduled daily or weekly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Daily,
    Weekly,
}

impl Mode {
    pub fn as_str(&self) -> &str {
        match self {
            Mode::Daily => "daily",
            Mode::Weekly => "weekly",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    #[serde(default)]
    pub run_count: u64,
    pub last_run: Option<DateTime<Local>>,
}

impl ScheduleState {
    pub fn mode(&self) -> Mode {
        if self.run_count < DAILY_RUNS {
            Mode::Daily
        } else {
            Mode::Weekly
        }
    }

    /// Daily runs left before switching to weekly.
    pub fn daily_runs_left(&self) -> u64 {
        DAILY_RUNS.saturating_sub(self.run_count)
    }
}

/// JSON file holding the run counter.
#[derive(Clone, Debug)]
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state; a missing file is a fresh state.
    pub fn load(&self) -> Result<ScheduleState> {
        if !self.path.exists() {
            return Ok(ScheduleState::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", self.path.display()))
    }

    pub fn save(&self, state: &ScheduleState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, text).with_context(|| format!("writing {}", self.path.display()))
    }

    /// Count one more run, stamped now.
    pub fn increment(&self) -> Result<ScheduleState> {
        let mut state = self.load()?;
        state.run_count += 1;
        state.last_run = Some(Local::now());
        self.save(&state)?;
        info!(
            run_count = state.run_count,
            mode = state.mode().as_str(),
            "run count updated"
        );
        Ok(state)
    }

    pub fn reset(&self) -> Result<ScheduleState> {
        let state = ScheduleState::default();
        self.save(&state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_fresh_state() -> Result<()> {
        let tmp = tempdir()?;
        let store = ScheduleStore::new(tmp.path().join("state.json"));
        let state = store.load()?;
        assert_eq!(state.run_count, 0);
        assert!(state.last_run.is_none());
        assert_eq!(state.mode(), Mode::Daily);
        Ok(())
    }

    #[test]
    fn switches_to_weekly_after_five_runs() -> Result<()> {
        let tmp = tempdir()?;
        let store = ScheduleStore::new(tmp.path().join("nested").join("state.json"));

        for expected in 1..=4 {
            let state = store.increment()?;
            assert_eq!(state.run_count, expected);
            assert_eq!(state.mode(), Mode::Daily);
        }
        let state = store.increment()?;
        assert_eq!(state.mode(), Mode::Weekly);
        assert_eq!(state.daily_runs_left(), 0);
        assert!(state.last_run.is_some());

        // persisted across store instances
        let reopened = ScheduleStore::new(store.path());
        assert_eq!(reopened.load()?.run_count, 5);
        Ok(())
    }

    #[test]
    fn reset_clears_count() -> Result<()> {
        let tmp = tempdir()?;
        let store = ScheduleStore::new(tmp.path().join("state.json"));
        store.increment()?;
        store.increment()?;
        let state = store.reset()?;
        assert_eq!(state, ScheduleState::default());
        assert_eq!(store.load()?.daily_runs_left(), DAILY_RUNS);
        Ok(())
    }

    #[test]
    fn reads_state_without_last_run() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("state.json");
        fs::write(&path, r#"{"run_count": 7, "last_run": null}"#)?;
        let state = ScheduleStore::new(&path).load()?;
        assert_eq!(state.run_count, 7);
        assert_eq!(state.mode(), Mode::Weekly);
        Ok(())
    }
}

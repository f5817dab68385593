//! Student progress record, persisted as JSON in the config directory.
//!
//! [`ProgressStore`] is the only writer of `progress.json`.  Every mutation
//! is written straight through; write failures are logged and otherwise
//! ignored, since the file is a convenience cache rather than a store of
//! record.  A missing or unreadable file loads as the default record.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::AppPaths;
use crate::lesson::Tier;

/// XP needed to reach the Intermediate level.
pub const INTERMEDIATE_XP: u64 = 500;
/// XP needed to reach the Conversational level.
pub const CONVERSATIONAL_XP: u64 = 1_500;

// ---------------------------------------------------------------------------
// StudentProgress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub xp: u64,
    pub level: Tier,
    pub streak_days: u32,
    pub learned_signs: BTreeSet<String>,
    #[serde(default)]
    pub last_active: Option<NaiveDate>,
}

impl Default for StudentProgress {
    fn default() -> Self {
        Self {
            xp: 0,
            level: Tier::Beginner,
            streak_days: 1,
            learned_signs: BTreeSet::new(),
            last_active: None,
        }
    }
}

/// Level tier earned by `xp`.
pub fn level_for_xp(xp: u64) -> Tier {
    if xp >= CONVERSATIONAL_XP {
        Tier::Conversational
    } else if xp >= INTERMEDIATE_XP {
        Tier::Intermediate
    } else {
        Tier::Beginner
    }
}

// ---------------------------------------------------------------------------
// ProgressStore
// ---------------------------------------------------------------------------

pub struct ProgressStore {
    progress: StudentProgress,
    path: PathBuf,
}

impl ProgressStore {
    /// Load from the platform config directory.
    pub fn load_or_default() -> Self {
        Self::load_from(AppPaths::new().progress_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: PathBuf) -> Self {
        let progress = Self::read(&path);
        Self { progress, path }
    }

    fn read(path: &Path) -> StudentProgress {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => return StudentProgress::default(),
        };
        serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("progress: {} is unreadable ({e}); starting fresh", path.display());
            StudentProgress::default()
        })
    }

    pub fn progress(&self) -> &StudentProgress {
        &self.progress
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Add `amount` XP, raise the level if a threshold was crossed, persist.
    pub fn add_xp(&mut self, amount: u64) {
        self.progress.xp = self.progress.xp.saturating_add(amount);
        let earned = level_for_xp(self.progress.xp);
        if earned > self.progress.level {
            log::info!("progress: level up → {}", earned.label());
            self.progress.level = earned;
        }
        self.save();
    }

    /// Record `sign_id` as learned.  Calling it again is a no-op apart from
    /// the write.
    pub fn mark_learned(&mut self, sign_id: &str) {
        if self.progress.learned_signs.insert(sign_id.to_string()) {
            log::debug!("progress: learned {sign_id}");
        }
        self.save();
    }

    /// Update the day streak for a session on `today`.
    pub fn touch_streak(&mut self, today: NaiveDate) {
        let p = &mut self.progress;
        match p.last_active {
            Some(last) if last == today => return,
            Some(last) if last.succ_opt() == Some(today) => {
                p.streak_days = p.streak_days.saturating_add(1);
            }
            Some(_) => p.streak_days = 1,
            None => {}
        }
        p.last_active = Some(today);
        self.save();
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn save(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.progress) {
            Ok(data) => {
                if let Err(e) = std::fs::write(&self.path, data) {
                    log::warn!("progress: could not write {}: {e}", self.path.display());
                }
            }
            Err(e) => log::warn!("progress: could not serialise record: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Pacing of the staged effects the player drives, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timings {
    /// Per character when typing into a field
    pub type_char_ms: u64,
    /// Between result cards entering the results area
    pub result_stagger_ms: u64,
    /// Between the top-level branches of a generated template
    pub root_stagger_ms: u64,
    /// Before the first nested branch appears under its parent
    pub child_delay_ms: u64,
    /// Between nested siblings
    pub sibling_stagger_ms: u64,
    /// After each generated branch appears
    pub branch_settle_ms: u64,
    /// Between the two messages of a free-play search
    pub free_play_search_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            type_char_ms: 50,
            result_stagger_ms: 100,
            root_stagger_ms: 500,
            child_delay_ms: 800,
            sibling_stagger_ms: 300,
            branch_settle_ms: 300,
            free_play_search_ms: 2000,
        }
    }
}

impl Timings {
    /// No pauses at all, for tests and unattended runs.
    pub fn instant() -> Self {
        Self {
            type_char_ms: 0,
            result_stagger_ms: 0,
            root_stagger_ms: 0,
            child_delay_ms: 0,
            sibling_stagger_ms: 0,
            branch_settle_ms: 0,
            free_play_search_ms: 0,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn type_char(&self) -> Duration {
        Duration::from_millis(self.type_char_ms)
    }

    pub fn result_stagger(&self) -> Duration {
        Duration::from_millis(self.result_stagger_ms)
    }

    pub fn branch_settle(&self) -> Duration {
        Duration::from_millis(self.branch_settle_ms)
    }

    pub fn free_play_search(&self) -> Duration {
        Duration::from_millis(self.free_play_search_ms)
    }

    /// Delay before the `index`-th sibling of a generated template appears.
    ///
    /// Top-level branches (depth 1) stagger by `root_stagger_ms` once the
    /// previous one has settled. Deeper ones appear `child_delay_ms + index *
    /// sibling_stagger_ms` after their parent.
    pub fn template_delay(&self, depth: usize, index: usize) -> Duration {
        let index = index as u64;
        let ms = if depth <= 1 {
            index * self.root_stagger_ms
        } else {
            self.child_delay_ms + index * self.sibling_stagger_ms
        };
        Duration::from_millis(ms)
    }
}

//! Persisted UI preferences.
//!
//! One small JSON record in the platform data dir. Loading is best-effort:
//! a missing or corrupt file just means defaults, never an error dialog.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UiPrefs {
    /// "dark" or "light".
    pub theme: Option<String>,
    /// Set once the operator dismisses the help overlay for the first
    /// time, so it stops auto-showing.
    pub has_seen_help: Option<bool>,
}

pub fn prefs_path(data_dir: &Path) -> PathBuf {
    data_dir.join("ui_prefs.json")
}

impl UiPrefs {
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).with_context(|| format!("write {}", path.display()))
    }
}

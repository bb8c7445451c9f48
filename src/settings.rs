//! Persisted link settings: the cluster window and manual overrides.
//!
//! Both survive restarts in one TOML file. The file is optional; defaults
//! apply when it is absent. Saves are atomic (write `.tmp`, rename) so a
//! crash mid-save never leaves a truncated file behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CLUSTER_WINDOW: u32 = 10;
pub const MIN_CLUSTER_WINDOW: u32 = 1;
pub const MAX_CLUSTER_WINDOW: u32 = 60;

/// Link settings — in-memory layer (numeric override keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Clustering time window in minutes, within [1, 60]
    pub cluster_window_minutes: u32,
    /// Manual overrides: landing index -> flight index. Indices are not
    /// bounds-checked here; the engine validates them at apply time.
    pub overrides: BTreeMap<usize, usize>,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            cluster_window_minutes: DEFAULT_CLUSTER_WINDOW,
            overrides: BTreeMap::new(),
        }
    }
}

/// Link settings — TOML file layer. TOML table keys are strings, so the
/// override map is keyed by stringified landing indices on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TomlLinkSettings {
    #[serde(default = "default_window")]
    cluster_window_minutes: u32,
    #[serde(default)]
    overrides: BTreeMap<String, usize>,
}

fn default_window() -> u32 {
    DEFAULT_CLUSTER_WINDOW
}

impl From<&LinkSettings> for TomlLinkSettings {
    fn from(s: &LinkSettings) -> Self {
        Self {
            cluster_window_minutes: s.cluster_window_minutes,
            overrides: s
                .overrides
                .iter()
                .map(|(l, f)| (l.to_string(), *f))
                .collect(),
        }
    }
}

impl From<TomlLinkSettings> for LinkSettings {
    fn from(t: TomlLinkSettings) -> Self {
        let mut overrides = BTreeMap::new();
        for (key, flight) in t.overrides {
            match key.parse::<usize>() {
                Ok(landing) => {
                    overrides.insert(landing, flight);
                }
                Err(_) => {
                    warn!(key = %key, "Ignoring override with non-numeric landing key");
                }
            }
        }

        let cluster_window_minutes = if (MIN_CLUSTER_WINDOW..=MAX_CLUSTER_WINDOW)
            .contains(&t.cluster_window_minutes)
        {
            t.cluster_window_minutes
        } else {
            warn!(
                value = t.cluster_window_minutes,
                "Persisted cluster window out of range, using default"
            );
            DEFAULT_CLUSTER_WINDOW
        };

        Self {
            cluster_window_minutes,
            overrides,
        }
    }
}

impl LinkSettings {
    /// Set the cluster window, rejecting values outside [1, 60]. On
    /// rejection the previous value is retained and the error is surfaced
    /// only to the caller.
    pub fn set_cluster_window(&mut self, minutes: u32) -> Result<()> {
        if !(MIN_CLUSTER_WINDOW..=MAX_CLUSTER_WINDOW).contains(&minutes) {
            bail!(
                "cluster window must be between {} and {} minutes, got {}",
                MIN_CLUSTER_WINDOW,
                MAX_CLUSTER_WINDOW,
                minutes
            );
        }
        self.cluster_window_minutes = minutes;
        Ok(())
    }

    /// Record an override. No bounds validation at set time; an index that
    /// is out of range against a later snapshot is ignored at apply time.
    pub fn set_override(&mut self, landing: usize, flight: usize) {
        self.overrides.insert(landing, flight);
    }

    /// Remove one override. Returns whether an entry existed.
    pub fn clear_override(&mut self, landing: usize) -> bool {
        self.overrides.remove(&landing).is_some()
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Load settings from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let toml_settings: TomlLinkSettings =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(toml_settings.into())
    }

    /// Save settings to a TOML file (atomic: write to .tmp then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(&TomlLinkSettings::from(self))
            .context("Failed to serialize settings to TOML")?;
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, &contents)
            .with_context(|| format!("Failed to write {:?}", tmp_path))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", tmp_path, path))?;
        Ok(())
    }
}

/// Resolve the settings file path.
///
/// Priority:
/// 1. `TOUCHDOWN_SETTINGS` env var
/// 2. `./touchdown.toml`
pub fn settings_path() -> PathBuf {
    if let Ok(path) = std::env::var("TOUCHDOWN_SETTINGS") {
        return PathBuf::from(path);
    }
    PathBuf::from("./touchdown.toml")
}

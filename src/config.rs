//! Configuration for the htn planner CLI

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one JSON file per domain
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Base URL of the principles service; unset means every action is allowed
    #[serde(default)]
    pub principles_url: Option<String>,

    /// Simulated duration of each executed action
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,

    /// Planning attempts in `run` before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Upper bound on task expansions per planning call
    #[serde(default)]
    pub max_expansions: Option<usize>,
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("htn-learner")
}

fn default_action_delay_ms() -> u64 {
    crate::htn::executor::DEFAULT_ACTION_DELAY.as_millis() as u64
}

fn default_max_retries() -> usize {
    crate::htn::solver::DEFAULT_MAX_RETRIES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            principles_url: None,
            action_delay_ms: default_action_delay_ms(),
            max_retries: default_max_retries(),
            max_expansions: None,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("htn-learner").join("config.yml")),
            Some(PathBuf::from("htn-learner.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Apply `PRINCIPLES_URL` and `HTN_STORE_PATH` from the environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(url) = lookup("PRINCIPLES_URL").filter(|u| !u.is_empty()) {
            self.principles_url = Some(url);
        }
        if let Some(path) = lookup("HTN_STORE_PATH").filter(|p| !p.is_empty()) {
            self.store_path = PathBuf::from(path);
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Runtime settings for the service and the command-line tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Snapshot file the store is opened from and saved to
    pub store_path: Option<PathBuf>,

    /// Acting principal recorded in logs
    pub principal: String,

    /// Save the snapshot after every mutating command
    pub autosave: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            principal: "system".to_string(),
            autosave: true,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `WARGAME_STORE_PATH`, `WARGAME_PRINCIPAL` and `WARGAME_AUTOSAVE`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let store_path = env_opt("WARGAME_STORE_PATH").map(PathBuf::from);
        let principal = env_opt("WARGAME_PRINCIPAL").unwrap_or(defaults.principal);
        let autosave = match env_opt("WARGAME_AUTOSAVE") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("WARGAME_AUTOSAVE must be true or false, got '{raw}'"))?,
            None => defaults.autosave,
        };

        Ok(Self {
            store_path,
            principal,
            autosave,
        })
    }

    /// Set the snapshot file
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Set the acting principal
    pub fn principal(mut self, principal: &str) -> Self {
        self.principal = principal.to_string();
        self
    }

    /// Enable or disable saving after mutations
    pub fn autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized flag '{other}'"),
    }
}

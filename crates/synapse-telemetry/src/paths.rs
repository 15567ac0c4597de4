//! Path resolution for engine state files

use std::path::PathBuf;

/// Overrides the data directory when set
pub const HOME_ENV: &str = "SYNAPSE_HOME";

/// Resolves standard paths for the database, event log and config
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve from `$SYNAPSE_HOME`, falling back to `~/.synapse`
    pub fn new() -> std::io::Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self {
                data_dir: PathBuf::from(dir),
            });
        }

        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;

        Ok(Self {
            data_dir: home.join(".synapse"),
        })
    }

    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// SQLite database holding pathways, traces, patterns and predictions
    pub fn database(&self) -> PathBuf {
        self.data_dir.join("synapse.db")
    }

    /// JSONL event log
    pub fn events_file(&self) -> PathBuf {
        self.data_dir.join("events.jsonl")
    }

    /// Engine configuration (worker profiles, tuning)
    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

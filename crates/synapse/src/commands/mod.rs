pub mod init;
pub mod inspect;
pub mod jobs;
pub mod version;

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synapse_core::Config;
use synapse_learn::Synapse;
use synapse_store::Store;
use synapse_telemetry::{JsonlEventSink, Paths};

/// Resolved locations of the engine's state files
#[derive(Debug, Clone)]
pub struct Workspace {
    pub db: PathBuf,
    pub config: PathBuf,
    pub events: PathBuf,
}

impl Workspace {
    pub fn resolve(
        home: Option<&Path>,
        db: Option<&Path>,
        config: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let paths = match home {
            Some(dir) => Paths::at(dir),
            None => Paths::new().context("resolving data directory")?,
        };
        Ok(Self {
            db: db.map(Path::to_path_buf).unwrap_or_else(|| paths.database()),
            config: config.map(Path::to_path_buf).unwrap_or_else(|| paths.config_file()),
            events: paths.events_file(),
        })
    }

    pub fn load_config(&self) -> anyhow::Result<Config> {
        Config::load_or_default(&self.config)
            .with_context(|| format!("loading config from {}", self.config.display()))
    }

    pub fn engine(&self) -> anyhow::Result<Synapse> {
        let config = self.load_config()?;
        let store = Store::open(&self.db)
            .with_context(|| format!("opening database {}", self.db.display()))?;
        let engine = Synapse::new(config, Arc::new(store))
            .with_sink(Arc::new(JsonlEventSink::new(&self.events)));
        Ok(attach_embedder(engine))
    }
}

#[cfg(feature = "fastembed")]
fn attach_embedder(engine: Synapse) -> Synapse {
    match synapse_learn::FastEmbedder::try_new() {
        Ok(embedder) => engine.with_embedder(Arc::new(embedder)),
        Err(e) => {
            tracing::warn!(error = %e, "embedding model unavailable, categories will be UNKNOWN");
            engine
        }
    }
}

#[cfg(not(feature = "fastembed"))]
fn attach_embedder(engine: Synapse) -> Synapse {
    engine
}

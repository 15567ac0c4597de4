use super::Workspace;
use anyhow::Context;
use synapse_core::Config;
use synapse_store::Store;
use synapse_telemetry::atomic_write;

pub fn run(ws: &Workspace, force: bool) -> anyhow::Result<serde_json::Value> {
    let wrote_config = if force || !ws.config.exists() {
        let json = serde_json::to_string_pretty(&Config::default())?;
        atomic_write(&ws.config, json.as_bytes())
            .with_context(|| format!("writing {}", ws.config.display()))?;
        true
    } else {
        // an existing file must at least be valid
        ws.load_config()?;
        false
    };

    Store::open(&ws.db).with_context(|| format!("creating database {}", ws.db.display()))?;
    tracing::info!(db = %ws.db.display(), "synapse initialized");

    Ok(serde_json::json!({
        "config": ws.config.display().to_string(),
        "config_written": wrote_config,
        "database": ws.db.display().to_string(),
    }))
}

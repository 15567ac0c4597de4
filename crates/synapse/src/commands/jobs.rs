//! Periodic jobs: mining, decay, prediction and its resolution

use chrono::Utc;
use serde_json::{json, Value};
use synapse_learn::Synapse;

pub fn mine(engine: &Synapse) -> anyhow::Result<Value> {
    let patterns = engine.mine_patterns(Utc::now())?;
    Ok(json!({ "patterns": patterns }))
}

pub fn decay(engine: &Synapse, days: Option<i64>) -> anyhow::Result<Value> {
    let days = days.unwrap_or(engine.config().decay.older_than_days);
    anyhow::ensure!(days >= 0, "days must not be negative");
    let decayed = engine.decay_unused(days, Utc::now())?;
    Ok(json!({ "decayed": decayed, "older_than_days": days }))
}

pub fn predict(engine: &Synapse) -> anyhow::Result<Value> {
    let candidates = engine.predict_next(Utc::now());
    Ok(json!({ "predictions": candidates }))
}

pub fn resolve(engine: &Synapse, actual: &str) -> anyhow::Result<Value> {
    let resolved = engine.resolve_predictions(actual)?;
    Ok(json!({ "actual": actual, "resolved": resolved }))
}

pub fn reject(engine: &Synapse, text: &str, workers: &[String]) -> anyhow::Result<Value> {
    let category = engine.record_rejection(text, workers);
    Ok(json!({ "category": category, "workers": workers }))
}

pub fn register_pattern(
    engine: &Synapse,
    category: &str,
    slot: Option<&str>,
) -> anyhow::Result<Value> {
    match engine.register_external_pattern(category, slot, Utc::now())? {
        Some(pattern) => Ok(json!({ "registered": true, "pattern": pattern })),
        None => Ok(json!({ "registered": false })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synapse_core::{Config, PathwayState};
    use synapse_store::Store;

    fn engine() -> Synapse {
        Synapse::new(Config::default(), Arc::new(Store::open_in_memory().unwrap()))
    }

    #[test]
    fn test_mine_without_history() {
        let out = mine(&engine()).unwrap();
        assert_eq!(out["patterns"], 0);
    }

    #[test]
    fn test_decay_uses_configured_default() {
        let engine = engine();
        let old = Utc::now() - chrono::Duration::days(30);
        engine
            .store()
            .upsert_pathway("A+B", "A", &PathwayState::fresh(0.9), old)
            .unwrap();

        let out = decay(&engine, None).unwrap();
        assert_eq!(out["older_than_days"], 7);
        assert_eq!(out["decayed"], 1);
        assert!(decay(&engine, Some(-1)).is_err());
    }

    #[test]
    fn test_register_then_predict_then_resolve() {
        let engine = engine();
        register_pattern(&engine, "A+B", None).unwrap();
        let out = register_pattern(&engine, "A+B", None).unwrap();
        assert_eq!(out["registered"], true);
        assert_eq!(out["pattern"]["sample_count"], 2);

        let out = predict(&engine).unwrap();
        assert_eq!(out["predictions"][0]["category"], "A+B");
        assert_eq!(out["predictions"][0]["basis"], "external");

        let out = resolve(&engine, "A+B").unwrap();
        assert_eq!(out["resolved"], 1);
    }

    #[test]
    fn test_register_blank_is_ignored() {
        let out = register_pattern(&engine(), "  ", None).unwrap();
        assert_eq!(out["registered"], false);
    }
}

use serde_json::{json, Value};
use synapse_learn::Synapse;

pub fn stats(engine: &Synapse) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(engine.stats()?)?)
}

pub fn accuracy(engine: &Synapse) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(engine.accuracy()?)?)
}

pub fn pathways(engine: &Synapse, limit: usize) -> anyhow::Result<Value> {
    let pathways: Vec<Value> = engine
        .top_pathways(limit)?
        .into_iter()
        .map(|p| {
            json!({
                "category": p.category,
                "worker": p.worker,
                "strength": p.strength,
                "fires": p.fire_count,
                "successes": p.success_count,
                "failures": p.fail_count,
                "updated_at": p.updated_at,
            })
        })
        .collect();
    Ok(json!({ "pathways": pathways }))
}

pub fn pending(engine: &Synapse, limit: usize) -> anyhow::Result<Value> {
    Ok(json!({ "predictions": engine.pending_predictions(limit)? }))
}

pub fn bias(engine: &Synapse, category: Option<&str>, text: Option<&str>) -> anyhow::Result<Value> {
    let category = match (category, text) {
        (Some(category), _) => category.to_string(),
        (None, Some(text)) => engine.categorize(text),
        (None, None) => anyhow::bail!("either a category or a text is required"),
    };
    // BTreeMap for stable output
    let bias: std::collections::BTreeMap<_, _> =
        engine.bias_for_category(&category).into_iter().collect();
    Ok(json!({ "category": category, "bias": bias }))
}

pub fn categorize(engine: &Synapse, text: &str) -> anyhow::Result<Value> {
    Ok(json!({ "category": engine.categorize(text) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use synapse_core::{Config, PathwayState};
    use synapse_store::Store;

    fn engine_with_pathways() -> Synapse {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let now = Utc::now();
        let mut strong = PathwayState::fresh(0.95);
        strong.fire_count = 4;
        store.upsert_pathway("A+B", "A", &strong, now).unwrap();
        store
            .upsert_pathway("A+B", "B", &PathwayState::fresh(0.05), now)
            .unwrap();
        Synapse::new(Config::default(), store)
    }

    #[test]
    fn test_bias_by_category() {
        let out = bias(&engine_with_pathways(), Some("A+B"), None).unwrap();
        assert_eq!(out["bias"]["A"], 0.985);
        assert_eq!(out["bias"]["B"], 0.715);
    }

    #[test]
    fn test_bias_by_text_without_embedder_is_empty() {
        let out = bias(&engine_with_pathways(), None, Some("anything")).unwrap();
        assert_eq!(out["category"], "UNKNOWN");
        assert!(out["bias"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_pathways_ordered_by_use() {
        let out = pathways(&engine_with_pathways(), 10).unwrap();
        assert_eq!(out["pathways"][0]["worker"], "A");
        assert_eq!(out["pathways"][0]["fires"], 4);
    }

    #[test]
    fn test_stats_shape() {
        let out = stats(&engine_with_pathways()).unwrap();
        assert_eq!(out["pathways"], 2);
        assert_eq!(out["avg_strength"], 0.5);
        assert_eq!(out["interactions"], 0);
    }

    #[test]
    fn test_accuracy_empty() {
        let out = accuracy(&engine_with_pathways()).unwrap();
        assert_eq!(out["total"], 0);
        assert_eq!(out["hit_rate"], 0.0);
    }
}

//! Events announced by the engine for observability

use serde::{Deserialize, Serialize};

/// A ranked prediction as carried in a `prediction_made` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub category: String,
    pub confidence: f64,
    pub basis: String,
}

/// Observability events. Consumers must tolerate unknown future kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynapseEvent {
    /// A pathway strength was rewritten by plasticity
    PathwayUpdated {
        category: String,
        worker: String,
        old_strength: f64,
        new_strength: f64,
        signal: f64,
    },
    /// The predictor emitted at least one candidate
    PredictionMade {
        candidates: Vec<CandidateSummary>,
        hour: u32,
        weekday: u32,
    },
    /// Pre-warmed context was consumed for a category
    PredictionHit {
        category: String,
        fragment_count: usize,
    },
}

impl SynapseEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SynapseEvent::PathwayUpdated { .. } => "pathway_updated",
            SynapseEvent::PredictionMade { .. } => "prediction_made",
            SynapseEvent::PredictionHit { .. } => "prediction_hit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_by_kind() {
        let event = SynapseEvent::PredictionHit {
            category: "A+B".to_string(),
            fragment_count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "prediction_hit");
        assert_eq!(json["fragment_count"], 3);
        assert_eq!(event.kind(), "prediction_hit");
    }

    #[test]
    fn test_prediction_made_shape() {
        let event = SynapseEvent::PredictionMade {
            candidates: vec![CandidateSummary {
                category: "A+B".to_string(),
                confidence: 0.42,
                basis: "hourly+daily".to_string(),
            }],
            hour: 9,
            weekday: 0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"prediction_made\""));
        assert!(json.contains("\"basis\":\"hourly+daily\""));
    }
}

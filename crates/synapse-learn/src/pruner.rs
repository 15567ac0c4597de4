use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use synapse_core::{DecayConfig, PlasticityConfig};
use synapse_store::{Store, StoreError};

/// Periodic relaxation of pathways that stopped firing
pub struct Pruner {
    store: Arc<Store>,
    plasticity: PlasticityConfig,
    decay: DecayConfig,
}

impl Pruner {
    pub fn new(store: Arc<Store>, plasticity: PlasticityConfig, decay: DecayConfig) -> Self {
        Self {
            store,
            plasticity,
            decay,
        }
    }

    /// Relax every pathway untouched for more than `older_than_days`
    pub fn decay(&self, older_than_days: i64, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = now - Duration::days(older_than_days.max(0));
        let (decay, plasticity) = (self.decay, self.plasticity);
        let touched = self
            .store
            .relax_stale_pathways(cutoff, now, |s| decay.relax(s, &plasticity))?;
        tracing::info!(pathways = touched, older_than_days, "decayed stale pathways");
        Ok(touched)
    }
}

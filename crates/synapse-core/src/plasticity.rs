//! Bounded reinforcement and relaxation of pathway strength

use crate::config::{DecayConfig, PlasticityConfig};
use crate::types::PathwayState;

impl PlasticityConfig {
    pub fn clamp(&self, strength: f64) -> f64 {
        strength.clamp(self.min_strength, self.max_strength)
    }

    pub fn fresh(&self) -> PathwayState {
        PathwayState::fresh(self.default_strength)
    }

    pub fn in_bounds(&self, strength: f64) -> bool {
        (self.min_strength..=self.max_strength).contains(&strength)
    }

    /// Apply one signal. Positive signals count as success, everything else
    /// (including zero) as failure. A non-finite signal moves nothing.
    pub fn reinforce(&self, state: PathwayState, signal: f64) -> PathwayState {
        let signal = if signal.is_finite() { signal } else { 0.0 };
        let mut next = state;
        next.fire_count += 1;

        let delta = if signal > 0.0 {
            next.success_count += 1;
            self.strengthen_rate * signal
        } else {
            next.fail_count += 1;
            self.weaken_rate * signal
        };

        next.strength = self.clamp(state.strength + delta);
        debug_assert!(
            self.in_bounds(next.strength),
            "strength {} escaped bounds",
            next.strength
        );
        next
    }
}

impl DecayConfig {
    /// Move a stale strength part of the way back toward the default
    pub fn relax(&self, strength: f64, plasticity: &PlasticityConfig) -> f64 {
        let relaxed =
            strength + self.relax_fraction * (plasticity.default_strength - strength);
        plasticity.clamp(relaxed)
    }
}

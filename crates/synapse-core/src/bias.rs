//! Projection of pathway strength onto the routing multiplier range

use crate::config::{BiasRange, PlasticityConfig};

impl BiasRange {
    /// Linear remap of `[min_strength, max_strength]` onto `[min, max]`.
    /// The endpoints map exactly; anything outside is pinned to the range.
    pub fn project(&self, strength: f64, plasticity: &PlasticityConfig) -> f64 {
        let span = plasticity.max_strength - plasticity.min_strength;
        let normalized = (strength - plasticity.min_strength) / span;
        if !(normalized > 0.0) {
            return self.min;
        }
        if normalized >= 1.0 {
            return self.max;
        }
        (self.min + normalized * (self.max - self.min)).clamp(self.min, self.max)
    }

    pub fn contains(&self, bias: f64) -> bool {
        (self.min..=self.max).contains(&bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_map_exactly() {
        let range = BiasRange::default();
        let plasticity = PlasticityConfig::default();
        assert_eq!(range.project(0.05, &plasticity), 0.715);
        assert_eq!(range.project(0.95, &plasticity), 0.985);
    }

    #[test]
    fn test_default_strength_maps_to_midpoint() {
        let range = BiasRange::default();
        let bias = range.project(0.5, &PlasticityConfig::default());
        assert!((bias - 0.85).abs() < 1e-9, "bias {}", bias);
    }

    #[test]
    fn test_out_of_range_strength_is_pinned() {
        let range = BiasRange::default();
        let plasticity = PlasticityConfig::default();
        assert_eq!(range.project(-3.0, &plasticity), 0.715);
        assert_eq!(range.project(7.0, &plasticity), 0.985);
        assert_eq!(range.project(f64::NAN, &plasticity), 0.715);
    }
}

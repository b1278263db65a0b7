//! Per-species life history traits.

use forcs_core::errors::{ForcsError, ForcsResult};
use serde::{Deserialize, Serialize};

/// Life history traits that drive growth, mortality and the merchantable
/// stem split for one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesTraits {
    /// Maximum cohort age, years.
    pub longevity: u16,
    /// Mean foliage lifespan, years (0.9..=5.0). Values above 1 mark
    /// evergreens that carry more than one year of leaves.
    pub leaf_longevity: f64,
    /// Shape of the age-related mortality curve (1..=50); larger values
    /// push mortality towards the end of the lifespan.
    pub mortality_curve_shape: f64,
    /// Shape of the growth curve (0..=1), the exponent on relative biomass
    /// in the production equation.
    pub growth_curve_shape: f64,
    /// Youngest age at which stems carry any merchantable wood.
    pub merch_stems_min_age: u16,
    /// Asymptote of the merchantable proportion curve (0..=1).
    pub merch_curve_a: f64,
    /// Base of the merchantable proportion curve (0..=1).
    pub merch_curve_b: f64,
    /// Fraction of otherwise-merchantable stem wood that is unusable
    /// (bark, cull) and routed to branch snags instead (0..=1).
    pub prop_non_merch: f64,
    /// Fire severity class the species tolerates without scorching.
    pub fire_tolerance: u8,
    /// Whether the species resprouts epicormically after crown scorch.
    pub epicormic: bool,
}

impl Default for SpeciesTraits {
    fn default() -> Self {
        Self {
            longevity: 100,
            leaf_longevity: 1.0,
            mortality_curve_shape: 10.0,
            growth_curve_shape: 0.25,
            merch_stems_min_age: 0,
            merch_curve_a: 0.7,
            merch_curve_b: 0.98,
            prop_non_merch: 0.0,
            fire_tolerance: 1,
            epicormic: false,
        }
    }
}

impl SpeciesTraits {
    pub fn validate(&self, name: &str) -> ForcsResult<()> {
        check_range(name, "leaf longevity", self.leaf_longevity, 0.9, 5.0)?;
        check_range(
            name,
            "mortality curve shape",
            self.mortality_curve_shape,
            1.0,
            50.0,
        )?;
        check_range(name, "growth curve shape", self.growth_curve_shape, 0.0, 1.0)?;
        check_range(name, "merch curve parameter a", self.merch_curve_a, 0.0, 1.0)?;
        check_range(name, "merch curve parameter b", self.merch_curve_b, 0.0, 1.0)?;
        check_range(
            name,
            "non-merchantable proportion",
            self.prop_non_merch,
            0.0,
            1.0,
        )?;
        if self.merch_stems_min_age > self.longevity {
            log::warn!(
                "{}: merchantable stems begin at age {}, past the longevity of {}",
                name,
                self.merch_stems_min_age,
                self.longevity
            );
        }
        Ok(())
    }
}

fn check_range(species: &str, what: &str, value: f64, min: f64, max: f64) -> ForcsResult<()> {
    if value < min || value > max {
        return Err(ForcsError::OutOfRange {
            name: format!("{} for {}", what, species),
            value,
            min,
            max,
        });
    }
    Ok(())
}

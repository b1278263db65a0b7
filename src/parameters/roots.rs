//! Root allocation parameters.
//!
//! Root biomass is not tracked per cohort; it is derived from above-ground
//! woody biomass through a small piecewise table. Each bin covers a range
//! of above-ground biomass and carries its own root:shoot ratio, fine-root
//! share and turnover rates, so young open stands and closed-canopy stands
//! can allocate differently.

use forcs_core::errors::{ForcsError, ForcsResult};
use serde::{Deserialize, Serialize};

/// Maximum number of allocation bins per (ecoregion, species) pair.
pub const MAX_ROOT_BINS: usize = 5;

/// One row of the piecewise root allocation table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootBin {
    /// Above-ground woody biomass at which this bin takes over, g m⁻².
    pub min_woody_biomass: f64,
    /// Total root biomass as a fraction of above-ground biomass.
    pub root_to_shoot: f64,
    /// Fraction of total root biomass that is fine roots.
    pub prop_fine: f64,
    /// Annual turnover of the fine root stock.
    pub fine_turnover: f64,
    /// Annual turnover of the coarse root stock.
    pub coarse_turnover: f64,
}

impl Default for RootBin {
    fn default() -> Self {
        Self {
            min_woody_biomass: 0.0,
            root_to_shoot: 0.25,
            prop_fine: 0.1,
            fine_turnover: 0.6,
            coarse_turnover: 0.02,
        }
    }
}

/// The piecewise allocation table for one (ecoregion, species) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootAllocation {
    bins: Vec<RootBin>,
}

impl Default for RootAllocation {
    fn default() -> Self {
        Self {
            bins: vec![RootBin::default()],
        }
    }
}

impl RootAllocation {
    pub fn new(bins: Vec<RootBin>) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &[RootBin] {
        &self.bins
    }

    /// The bin in force at the given above-ground woody biomass.
    ///
    /// Biomass below the first threshold falls through to the last bin,
    /// as does biomass at or past the final threshold.
    pub fn bin_for(&self, aboveground_biomass: f64) -> &RootBin {
        for window in self.bins.windows(2) {
            if aboveground_biomass >= window[0].min_woody_biomass
                && aboveground_biomass < window[1].min_woody_biomass
            {
                return &window[0];
            }
        }
        self.bins.last().expect("allocation table has at least one bin")
    }

    pub fn validate(&self, ecoregion: &str, species: &str) -> ForcsResult<()> {
        if self.bins.is_empty() {
            return Err(ForcsError::Error(format!(
                "no root allocation bins for ecoregion {}, species {}",
                ecoregion, species
            )));
        }
        if self.bins.len() > MAX_ROOT_BINS {
            return Err(ForcsError::TooManyRootBins {
                ecoregion: ecoregion.to_string(),
                species: species.to_string(),
                max: MAX_ROOT_BINS,
            });
        }
        for pair in self.bins.windows(2) {
            if pair[1].min_woody_biomass <= pair[0].min_woody_biomass {
                return Err(ForcsError::Error(format!(
                    "root allocation thresholds for {} / {} are not ascending",
                    ecoregion, species
                )));
            }
        }
        for (idx, bin) in self.bins.iter().enumerate() {
            for (what, value) in [
                ("fine root proportion", bin.prop_fine),
                ("fine root turnover", bin.fine_turnover),
                ("coarse root turnover", bin.coarse_turnover),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ForcsError::OutOfRange {
                        name: format!("{} in root bin {} for {}", what, idx, species),
                        value,
                        min: 0.0,
                        max: 1.0,
                    });
                }
            }
            if bin.root_to_shoot < 0.0 {
                return Err(ForcsError::OutOfRange {
                    name: format!("root:shoot ratio in bin {} for {}", idx, species),
                    value: bin.root_to_shoot,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bin_table() -> RootAllocation {
        RootAllocation::new(vec![
            RootBin {
                min_woody_biomass: 0.0,
                root_to_shoot: 0.4,
                ..RootBin::default()
            },
            RootBin {
                min_woody_biomass: 1000.0,
                root_to_shoot: 0.2,
                ..RootBin::default()
            },
        ])
    }

    #[test]
    fn bin_selection_walks_the_thresholds() {
        let table = two_bin_table();
        assert_eq!(table.bin_for(0.0).root_to_shoot, 0.4);
        assert_eq!(table.bin_for(999.9).root_to_shoot, 0.4);
        assert_eq!(table.bin_for(1000.0).root_to_shoot, 0.2);
        assert_eq!(table.bin_for(50_000.0).root_to_shoot, 0.2);
    }

    #[test]
    fn single_bin_covers_everything() {
        let table = RootAllocation::default();
        assert_eq!(table.bin_for(0.0).root_to_shoot, 0.25);
        assert_eq!(table.bin_for(1e9).root_to_shoot, 0.25);
    }

    #[test]
    fn more_than_five_bins_is_rejected() {
        let bins = (0..6)
            .map(|i| RootBin {
                min_woody_biomass: i as f64 * 100.0,
                ..RootBin::default()
            })
            .collect();
        let err = RootAllocation::new(bins)
            .validate("upland", "Pinus banksiana")
            .unwrap_err();
        assert!(matches!(err, ForcsError::TooManyRootBins { .. }));
    }

    #[test]
    fn non_ascending_thresholds_are_rejected() {
        let table = RootAllocation::new(vec![
            RootBin {
                min_woody_biomass: 500.0,
                ..RootBin::default()
            },
            RootBin {
                min_woody_biomass: 500.0,
                ..RootBin::default()
            },
        ]);
        assert!(table.validate("upland", "Pinus banksiana").is_err());
    }
}

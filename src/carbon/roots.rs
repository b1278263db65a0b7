//! Root stock and turnover derivation.
//!
//! Roots are derived quantities: given a cohort's above-ground biomass and
//! the allocation bin in force at that biomass, the engine computes the
//! coarse and fine root stocks and their annual turnover. All values here
//! are biomass (g m⁻²), not carbon; callers convert at the pool boundary.

use crate::parameters::roots::RootAllocation;

/// Coarse and fine root stocks for one cohort, g biomass m⁻².
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootBiomass {
    pub coarse: f64,
    pub fine: f64,
}

impl RootBiomass {
    pub fn total(&self) -> f64 {
        self.coarse + self.fine
    }
}

/// Annual root mortality for one cohort, g biomass m⁻².
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootTurnover {
    pub coarse: f64,
    pub fine: f64,
}

/// Root stocks implied by the given above-ground biomass.
pub fn root_biomass(allocation: &RootAllocation, aboveground_biomass: f64) -> RootBiomass {
    let bin = allocation.bin_for(aboveground_biomass);
    let total = aboveground_biomass * bin.root_to_shoot;
    let fine = total * bin.prop_fine;
    RootBiomass {
        coarse: total - fine,
        fine,
    }
}

/// Annual root turnover implied by the given above-ground biomass.
pub fn root_turnover(allocation: &RootAllocation, aboveground_biomass: f64) -> RootTurnover {
    let bin = allocation.bin_for(aboveground_biomass);
    let stocks = root_biomass(allocation, aboveground_biomass);
    RootTurnover {
        coarse: stocks.coarse * bin.coarse_turnover,
        fine: stocks.fine * bin.fine_turnover,
    }
}

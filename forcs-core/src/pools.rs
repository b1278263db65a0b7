//! Pool enumerations for the carbon accounts.
//!
//! Two families of pools exist side by side: the ten dead organic matter
//! (DOM) pools that make up a site's decomposition network, and the six
//! live biomass components that mortality and disturbance losses are
//! partitioned into before they enter the DOM network. Both map onto
//! fixed array indices so per-site state can live in dense matrices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversion factor from live biomass to carbon mass.
pub const BIOMASS_TO_CARBON: f64 = 0.5;

/// Number of dead organic matter pools per species column.
pub const NUM_DOM_POOLS: usize = 10;

/// Number of live biomass components per species column.
pub const NUM_BIOMASS_POOLS: usize = 6;

/// Dead organic matter pools, in matrix-row order.
///
/// AG/BG marks above-ground versus below-ground litter. The two snag pools
/// hold standing dead stem and branch material; `Medium` receives stem
/// snags as they fall over and `BlackCarbon` is an inert charcoal store
/// that only ever decays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomPool {
    VeryFastAg,
    VeryFastBg,
    FastAg,
    FastBg,
    Medium,
    SlowAg,
    SlowBg,
    StemSnag,
    BranchSnag,
    BlackCarbon,
}

impl DomPool {
    pub const ALL: [DomPool; NUM_DOM_POOLS] = [
        DomPool::VeryFastAg,
        DomPool::VeryFastBg,
        DomPool::FastAg,
        DomPool::FastBg,
        DomPool::Medium,
        DomPool::SlowAg,
        DomPool::SlowBg,
        DomPool::StemSnag,
        DomPool::BranchSnag,
        DomPool::BlackCarbon,
    ];

    /// Row index of this pool in a `[NUM_DOM_POOLS × n_species]` matrix.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<DomPool> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            DomPool::VeryFastAg => "VeryFastAG",
            DomPool::VeryFastBg => "VeryFastBG",
            DomPool::FastAg => "FastAG",
            DomPool::FastBg => "FastBG",
            DomPool::Medium => "Medium",
            DomPool::SlowAg => "SlowAG",
            DomPool::SlowBg => "SlowBG",
            DomPool::StemSnag => "StemSnag",
            DomPool::BranchSnag => "BranchSnag",
            DomPool::BlackCarbon => "BlackCarbon",
        }
    }
}

impl fmt::Display for DomPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Live biomass components, in matrix-row order.
///
/// `Merchantable` is the commercially usable stem wood; `Other` is the
/// remaining above-ground wood (branches, tops, bark); `SubMerchantable`
/// is stem wood in cohorts too young to carry merchantable stems.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiomassPool {
    Merchantable,
    Foliage,
    Other,
    SubMerchantable,
    CoarseRoot,
    FineRoot,
}

impl BiomassPool {
    pub const ALL: [BiomassPool; NUM_BIOMASS_POOLS] = [
        BiomassPool::Merchantable,
        BiomassPool::Foliage,
        BiomassPool::Other,
        BiomassPool::SubMerchantable,
        BiomassPool::CoarseRoot,
        BiomassPool::FineRoot,
    ];

    /// Row index of this component in a `[NUM_BIOMASS_POOLS × n_species]`
    /// matrix.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<BiomassPool> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            BiomassPool::Merchantable => "Merchantable",
            BiomassPool::Foliage => "Foliage",
            BiomassPool::Other => "Other",
            BiomassPool::SubMerchantable => "SubMerchantable",
            BiomassPool::CoarseRoot => "CoarseRoot",
            BiomassPool::FineRoot => "FineRoot",
        }
    }
}

impl fmt::Display for BiomassPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_pool_indices_match_matrix_rows() {
        for (row, pool) in DomPool::ALL.iter().enumerate() {
            assert_eq!(pool.index(), row, "{} is out of order", pool);
            assert_eq!(DomPool::from_index(row), Some(*pool));
        }
        assert_eq!(DomPool::from_index(NUM_DOM_POOLS), None);
    }

    #[test]
    fn biomass_pool_indices_match_matrix_rows() {
        for (row, pool) in BiomassPool::ALL.iter().enumerate() {
            assert_eq!(pool.index(), row, "{} is out of order", pool);
            assert_eq!(BiomassPool::from_index(row), Some(*pool));
        }
        assert_eq!(BiomassPool::from_index(NUM_BIOMASS_POOLS), None);
    }

    #[test]
    fn slow_pools_follow_the_fast_and_medium_pools() {
        // The spin-up convergence test keys on these two rows.
        assert_eq!(DomPool::SlowAg.index(), 5);
        assert_eq!(DomPool::SlowBg.index(), 6);
    }
}

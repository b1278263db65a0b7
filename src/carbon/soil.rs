//! The dead organic matter (DOM) engine.
//!
//! Each site carries a `[pool × species]` carbon matrix for the ten DOM
//! pools plus a staging matrix of this year's biomass losses by component.
//! Mortality and turnover are collected into the staging matrix as the
//! cohorts grow; once a year [`SoilState::process_soils`] drains it
//! through the decay network and closes the site's carbon budget.
//!
//! Pool arithmetic follows the CBM-style cascade: litter inputs land in
//! the very fast / fast / snag pools, decay losses split between the
//! atmosphere and the slow pools, and the slow pools respire everything
//! they lose. Fine and coarse root litter is split evenly between the
//! above- and below-ground members of its pool pair.

use crate::carbon::roots::root_biomass;
use crate::disturbance::{DisturbanceEvent, DisturbanceKind, TransferOutcome};
use crate::parameters::species::SpeciesTraits;
use crate::parameters::ForcsParameters;
use forcs_core::errors::{ForcsError, ForcsResult};
use forcs_core::pools::{
    BiomassPool, DomPool, BIOMASS_TO_CARBON, NUM_BIOMASS_POOLS, NUM_DOM_POOLS,
};
use forcs_core::series::Year;
use forcs_core::table::{EcoregionId, SpeciesId};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Reference temperature for decay rates, °C.
const DECAY_TEMP_REF: f64 = 10.0;

/// Share of fine root litter entering the above-ground very fast pool.
const FINE_ROOT_AG_RATIO: f64 = 0.5;

/// Share of coarse root litter entering the above-ground fast pool.
const COARSE_ROOT_AG_RATIO: f64 = 0.5;

/// Where a parcel of reported mortality is routed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LitterDestination {
    /// Above-ground wood and foliage entering the litter network.
    Aboveground,
    /// Root mortality entering the below-ground litter pools.
    Belowground,
    /// Standing live wood recorded at the end of spin-up growth.
    LiveWood,
    /// Standing live roots recorded at the end of spin-up growth.
    LiveRoots,
    /// Biomass of the numbered initial snag record.
    InitialSnag(usize),
}

/// Whether a root biomass report precedes or follows this year's growth.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RootPhase {
    PreGrowth,
    PostGrowth,
}

/// Which phase of the run a soil pass belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SoilPass {
    /// Iterative spin-up replay; dynamics run, no summary.
    Spinup,
    /// A regular simulated year.
    Normal,
    /// The final initialisation pass that materialises initial snags.
    FinalInit,
}

/// Annual carbon transfers into and out of the site, split by whether a
/// disturbance caused them. All values are g C m⁻².
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferTotals {
    /// Mortality and turnover entering DOM outside any disturbance.
    pub undisturbed_to_dom: f64,
    /// Decay losses to the atmosphere (heterotrophic respiration).
    pub undisturbed_to_air: f64,
    /// Disturbance losses routed into the DOM network.
    pub disturbed_to_dom: f64,
    /// Disturbance losses to the atmosphere.
    pub disturbed_to_air: f64,
    /// Disturbance losses to the forest product sector.
    pub disturbed_to_fps: f64,
}

/// The site-year carbon budget produced by a normal soil pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnualFluxes {
    /// Net primary production, floored at zero.
    pub npp: f64,
    /// Net ecosystem production: NPP minus heterotrophic respiration.
    pub nep: f64,
    /// Net biome production: NEP minus disturbance losses to FPS and air.
    pub nbp: f64,
    /// Heterotrophic respiration.
    pub rh: f64,
    /// Carbon removed to the forest product sector this year.
    pub to_fps: f64,
    /// Above-ground live carbon at the end of the year.
    pub aboveground_c: f64,
    /// Below-ground (root) live carbon at the end of the year.
    pub belowground_c: f64,
    /// Change in total live carbon since the end of last year.
    pub delta_biomass_c: f64,
    /// Change in total live carbon over this year's growth alone.
    pub net_growth_c: f64,
    /// Carbon in the very fast litter pools.
    pub litter_c: f64,
    /// Carbon in the remaining DOM pools.
    pub deadwood_c: f64,
}

impl AnnualFluxes {
    /// Total live carbon, above and below ground.
    pub fn biomass_c(&self) -> f64 {
        self.aboveground_c + self.belowground_c
    }

    /// Total dead organic matter carbon.
    pub fn soil_c(&self) -> f64 {
        self.litter_c + self.deadwood_c
    }
}

/// Proportion of dying stem wood that is merchantable and therefore
/// becomes a stem snag; the remainder goes to branch snags.
///
/// Zero below the species' minimum merchantable age; above it the
/// proportion follows the saturating curve `a·(1 − bᵃᵍᵉ)`. A curve
/// parameterisation that escapes [0, 1] is a fatal configuration error.
pub fn dead_stem_to_snag_rate(
    traits: &SpeciesTraits,
    species_name: &str,
    age: u16,
) -> ForcsResult<f64> {
    if age < traits.merch_stems_min_age {
        return Ok(0.0);
    }
    let prop = traits.merch_curve_a * (1.0 - traits.merch_curve_b.powi(age as i32));
    if !(0.0..=1.0).contains(&prop) {
        return Err(ForcsError::MerchProportion {
            species: species_name.to_string(),
            age,
            value: prop,
        });
    }
    Ok(prop)
}

/// Temperature modifier applied to base decay rates.
pub fn temp_modifier(temperature: f64, q10: f64) -> f64 {
    ((temperature - DECAY_TEMP_REF) * q10.ln() * 0.1).exp()
}

/// Per-site DOM state and annual accounting.
///
/// The struct is fully serializable so a site can be snapshotted and
/// restored (or cloned as a template for identical initial communities)
/// without replaying its spin-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilState {
    n_species: usize,
    /// `[NUM_DOM_POOLS × n_species]` carbon matrix.
    pools: Array2<f64>,
    /// This year's biomass carbon losses by component, pending processing.
    net_c_loss: Array2<f64>,
    /// Standing live carbon by component, recorded at the end of spin-up
    /// growth and consumed by the spin-up kill.
    live_biomass: Array2<f64>,
    /// Litter inputs by component, species and stand age; the spin-up
    /// replay tape. Age 0 doubles as the current-year slot after spin-up.
    litter_history: Array3<f64>,
    /// Biomass (not carbon) of each initial snag record, seeded when its
    /// cohort is killed at the end of spin-up growth.
    snag_wood: Vec<f64>,
    snag_nonwood: Vec<f64>,
    snag_seeded: Vec<bool>,
    init_snag_present: bool,
    species_present: Vec<bool>,
    decay_rates: Array2<f64>,
    carbon_to_air: [f64; NUM_DOM_POOLS],
    carbon_to_slow: [f64; NUM_DOM_POOLS],
    total_dom: [f64; NUM_DOM_POOLS],
    /// Stem snag carbon migrated to Medium this year (diagnostic).
    snag_to_medium: f64,
    /// Branch snag carbon migrated to FastAG this year (diagnostic).
    branch_snag_to_fast: f64,
    transfers: TransferTotals,
    disturbed: [bool; DisturbanceKind::ALL.len()],
    old_biomass_c: f64,
    pre_growth_root_biomass: f64,
    post_growth_root_biomass: f64,
    litter_mass: f64,
    deadwood_mass: f64,
    /// Set for the year whose growth pass must kill the cohorts named by
    /// the initial snag records.
    pub kill_now: bool,
    /// Oldest initial cohort age; bounds the spin-up replay.
    pub last_age: u16,
    last_soil_pass: bool,
}

impl SoilState {
    /// A fresh site in the given ecoregion, with the DOM pools at their
    /// configured initial amounts.
    pub fn new(params: &ForcsParameters, ecoregion: EcoregionId) -> Self {
        let n_species = params.catalog.n_species();
        let history_depth = params.max_longevity() as usize + 1;
        let n_snags = params.snags.len();

        let mut pools = Array2::zeros((NUM_DOM_POOLS, n_species));
        for species in params.catalog.species() {
            let cells = params.dom_pools(ecoregion, species);
            for pool in DomPool::ALL {
                pools[[pool.index(), species.0]] = cells[pool.index()].initial_amount;
            }
        }

        Self {
            n_species,
            pools,
            net_c_loss: Array2::zeros((NUM_BIOMASS_POOLS, n_species)),
            live_biomass: Array2::zeros((NUM_BIOMASS_POOLS, n_species)),
            litter_history: Array3::zeros((NUM_BIOMASS_POOLS, n_species, history_depth)),
            snag_wood: vec![0.0; n_snags],
            snag_nonwood: vec![0.0; n_snags],
            snag_seeded: vec![false; n_snags],
            init_snag_present: false,
            species_present: vec![false; n_species],
            decay_rates: Array2::zeros((NUM_DOM_POOLS, n_species)),
            carbon_to_air: [0.0; NUM_DOM_POOLS],
            carbon_to_slow: [0.0; NUM_DOM_POOLS],
            total_dom: [0.0; NUM_DOM_POOLS],
            snag_to_medium: 0.0,
            branch_snag_to_fast: 0.0,
            transfers: TransferTotals::default(),
            disturbed: [false; DisturbanceKind::ALL.len()],
            old_biomass_c: 0.0,
            pre_growth_root_biomass: 0.0,
            post_growth_root_biomass: 0.0,
            litter_mass: 0.0,
            deadwood_mass: 0.0,
            kill_now: false,
            last_age: 0,
            last_soil_pass: false,
        }
    }

    pub fn pool(&self, pool: DomPool, species: SpeciesId) -> f64 {
        self.pools[[pool.index(), species.0]]
    }

    /// Pool carbon summed across species.
    pub fn total_pool(&self, pool: DomPool) -> f64 {
        self.pools.row(pool.index()).sum()
    }

    /// All DOM carbon on the site.
    pub fn total_dom_c(&self) -> f64 {
        self.pools.sum()
    }

    pub fn add_dom_carbon(&mut self, pool: DomPool, species: SpeciesId, amount: f64) {
        self.pools[[pool.index(), species.0]] += amount;
    }

    /// Pending (unprocessed) carbon loss for one biomass component.
    pub fn pending_loss(&self, component: BiomassPool, species: SpeciesId) -> f64 {
        self.net_c_loss[[component.index(), species.0]]
    }

    pub fn mark_present(&mut self, species: SpeciesId) {
        self.species_present[species.0] = true;
    }

    pub fn species_present(&self, species: SpeciesId) -> bool {
        self.species_present[species.0]
    }

    pub fn transfers(&self) -> &TransferTotals {
        &self.transfers
    }

    pub fn litter_mass(&self) -> f64 {
        self.litter_mass
    }

    pub fn deadwood_mass(&self) -> f64 {
        self.deadwood_mass
    }

    pub(crate) fn init_snag_present(&self) -> bool {
        self.init_snag_present
    }

    pub(crate) fn snag_seeded(&self, idx: usize) -> bool {
        self.snag_seeded[idx]
    }

    pub(crate) fn snag_biomass(&self, idx: usize) -> (f64, f64) {
        (self.snag_wood[idx], self.snag_nonwood[idx])
    }

    /// Stages the litter recorded for one cohort age as this pass's
    /// inputs. The final initialisation pass consumes the tape; the
    /// iterative spin-up replays it unchanged.
    pub(crate) fn replay_history(&mut self, species: SpeciesId, age: usize, consume: bool) {
        for component in BiomassPool::ALL {
            self.net_c_loss[[component.index(), species.0]] =
                self.litter_history[[component.index(), species.0, age]];
            if consume {
                self.litter_history[[component.index(), species.0, age]] = 0.0;
            }
        }
    }

    /// Live merchantable stem carbon recorded during spin-up growth.
    pub(crate) fn live_wood_c(&self, species: SpeciesId) -> f64 {
        self.live_biomass[[BiomassPool::Merchantable.index(), species.0]]
    }

    /// Live carbon in every other component recorded during spin-up
    /// growth.
    pub(crate) fn live_nonwood_c(&self, species: SpeciesId) -> f64 {
        BiomassPool::ALL
            .iter()
            .filter(|component| **component != BiomassPool::Merchantable)
            .map(|component| self.live_biomass[[component.index(), species.0]])
            .sum()
    }

    pub(crate) fn clear_snag_scratch(&mut self) {
        self.snag_wood.iter_mut().for_each(|v| *v = 0.0);
        self.snag_nonwood.iter_mut().for_each(|v| *v = 0.0);
        self.snag_seeded.iter_mut().for_each(|v| *v = false);
    }

    pub(crate) fn set_last_soil_pass(&mut self, on: bool) {
        self.last_soil_pass = on;
    }

    /// Records one cohort's root biomass (g m⁻²) for the summary budget.
    pub fn collect_root_biomass(&mut self, all_roots: f64, phase: RootPhase) {
        match phase {
            RootPhase::PreGrowth => self.pre_growth_root_biomass += all_roots,
            RootPhase::PostGrowth => self.post_growth_root_biomass += all_roots,
        }
    }

    /// Refreshes the applied decay rates for one species column.
    ///
    /// Temperature scales every pool except BlackCarbon, whose configured
    /// rate is applied as-is.
    pub fn calculate_decay_rates(
        &mut self,
        params: &ForcsParameters,
        ecoregion: EcoregionId,
        species: SpeciesId,
        temperature: f64,
    ) {
        let cells = params.dom_pools(ecoregion, species);
        for pool in DomPool::ALL {
            let cell = &cells[pool.index()];
            let rate = if pool == DomPool::BlackCarbon {
                cell.decay_rate
            } else {
                cell.decay_rate * temp_modifier(temperature, cell.q10)
            };
            self.decay_rates[[pool.index(), species.0]] = rate;
        }
    }

    /// Collects mortality or turnover reported by the growth engine.
    ///
    /// `mortality_wood` and `mortality_nonwood` are biomass; conversion to
    /// carbon happens here. During spin-up (`year == 0`) inputs are also
    /// recorded on the replay tape at the cohort's age.
    pub fn collect_biomass_mortality(
        &mut self,
        params: &ForcsParameters,
        species: SpeciesId,
        age: u16,
        mortality_wood: f64,
        mortality_nonwood: f64,
        destination: LitterDestination,
        year: Year,
    ) -> ForcsResult<()> {
        self.species_present[species.0] = true;

        // Zero-mortality calls only mark presence (used when a cohort
        // establishes during spin-up).
        if mortality_wood == 0.0 && mortality_nonwood == 0.0 {
            return Ok(());
        }

        let nonwood_c = mortality_nonwood * BIOMASS_TO_CARBON;
        let wood_c = mortality_wood * BIOMASS_TO_CARBON;
        let idx_age = if year == 0 { age as usize } else { 0 };

        let mut prop_stem = 0.0;
        if mortality_wood > 0.0 {
            prop_stem = dead_stem_to_snag_rate(
                params.traits(species),
                params.catalog.species_name(species),
                age,
            )?;
        }

        let sp = species.0;
        match destination {
            LitterDestination::Aboveground => {
                self.net_c_loss[[BiomassPool::Foliage.index(), sp]] += nonwood_c;
                self.litter_history[[BiomassPool::Foliage.index(), sp, idx_age]] += nonwood_c;
                if mortality_wood > 0.0 {
                    let merch = wood_c * prop_stem;
                    let other = wood_c * (1.0 - prop_stem);
                    self.net_c_loss[[BiomassPool::Merchantable.index(), sp]] += merch;
                    self.net_c_loss[[BiomassPool::Other.index(), sp]] += other;
                    self.litter_history[[BiomassPool::Merchantable.index(), sp, idx_age]] += merch;
                    self.litter_history[[BiomassPool::Other.index(), sp, idx_age]] += other;
                }
            }
            LitterDestination::Belowground => {
                self.net_c_loss[[BiomassPool::FineRoot.index(), sp]] += nonwood_c;
                self.net_c_loss[[BiomassPool::CoarseRoot.index(), sp]] += wood_c;
                self.litter_history[[BiomassPool::FineRoot.index(), sp, idx_age]] += nonwood_c;
                self.litter_history[[BiomassPool::CoarseRoot.index(), sp, idx_age]] += wood_c;
            }
            LitterDestination::LiveWood if year == 0 => {
                self.live_biomass[[BiomassPool::Merchantable.index(), sp]] += wood_c * prop_stem;
                self.live_biomass[[BiomassPool::Other.index(), sp]] +=
                    wood_c * (1.0 - prop_stem);
            }
            LitterDestination::LiveRoots if year == 0 => {
                self.live_biomass[[BiomassPool::FineRoot.index(), sp]] += nonwood_c;
                self.live_biomass[[BiomassPool::CoarseRoot.index(), sp]] += wood_c;
            }
            LitterDestination::InitialSnag(idx) if year == 0 => {
                // Kept as biomass: the disturbance transfer that consumes
                // these records does its own carbon conversion.
                self.snag_wood[idx] += mortality_wood;
                self.snag_nonwood[idx] += mortality_nonwood;
                self.snag_seeded[idx] = true;
                self.init_snag_present = true;
            }
            // Live and snag recordings outside spin-up are dropped.
            _ => {}
        }

        if matches!(
            destination,
            LitterDestination::Aboveground | LitterDestination::Belowground
        ) {
            self.transfers.undisturbed_to_dom += nonwood_c + wood_c;
        }
        Ok(())
    }

    /// Applies a disturbance's biomass-side transfer for one cohort.
    ///
    /// `wood` and `nonwood` are the cohort biomass being removed; roots
    /// are derived from their sum. Returns `NoMatrix` when the event has
    /// no configured matrix (including fire severity 0).
    pub fn disturbance_impacts_biomass(
        &mut self,
        params: &ForcsParameters,
        ecoregion: EcoregionId,
        event: &DisturbanceEvent,
        species: SpeciesId,
        age: u16,
        wood: f64,
        nonwood: f64,
    ) -> ForcsResult<TransferOutcome> {
        self.disturbed[event.kind.index()] = true;
        self.species_present[species.0] = true;

        let matrix = match params.disturbances.biomass_matrix(event) {
            Some(matrix) => matrix,
            None => return Ok(TransferOutcome::NoMatrix),
        };

        let roots = root_biomass(params.root_allocation(ecoregion, species), wood + nonwood);
        let coarse_root_c = roots.coarse * BIOMASS_TO_CARBON;
        let fine_root_c = roots.fine * BIOMASS_TO_CARBON;
        let nonwood_c = nonwood * BIOMASS_TO_CARBON;
        let wood_c = wood * BIOMASS_TO_CARBON;

        let mut prop_stem = 0.0;
        if wood_c > 0.0 {
            prop_stem = dead_stem_to_snag_rate(
                params.traits(species),
                params.catalog.species_name(species),
                age,
            )?;
        }

        for pool in BiomassPool::ALL {
            let amount_c = match pool {
                BiomassPool::Merchantable => wood_c * prop_stem,
                BiomassPool::Foliage => nonwood_c,
                BiomassPool::Other => wood_c * (1.0 - prop_stem),
                BiomassPool::SubMerchantable => continue,
                BiomassPool::CoarseRoot => coarse_root_c,
                BiomassPool::FineRoot => fine_root_c,
            };
            let transfer = matrix.get(pool);
            self.net_c_loss[[pool.index(), species.0]] += amount_c * transfer.to_dom;
            self.transfers.disturbed_to_dom += amount_c * transfer.to_dom;
            self.transfers.disturbed_to_air += amount_c * transfer.to_air;
            self.transfers.disturbed_to_fps += amount_c * transfer.to_fps;
        }
        Ok(TransferOutcome::Applied)
    }

    /// Applies a disturbance's DOM-side transfer across every species
    /// that has ever been on the site.
    ///
    /// Snag pools may additionally shed carbon "to DOM": stem snags fall
    /// into `Medium`, branch snags into `FastAG`. Other pools are already
    /// on the ground, so only their air and FPS proportions apply.
    pub fn disturbance_impacts_dom(
        &mut self,
        params: &ForcsParameters,
        event: &DisturbanceEvent,
    ) -> TransferOutcome {
        self.disturbed[event.kind.index()] = true;

        let matrix = match params.disturbances.dom_matrix(event) {
            Some(matrix) => matrix,
            None => return TransferOutcome::NoMatrix,
        };

        for sp in 0..self.n_species {
            if !self.species_present[sp] {
                continue;
            }
            for pool in DomPool::ALL {
                let held = self.pools[[pool.index(), sp]];
                let transfer = matrix.get(pool);
                let loss = held * transfer.to_air;
                let to_fps = held * transfer.to_fps;
                let mut to_floor = 0.0;

                match pool {
                    DomPool::StemSnag => {
                        to_floor = held * transfer.to_dom;
                        self.pools[[DomPool::Medium.index(), sp]] += to_floor;
                    }
                    DomPool::BranchSnag => {
                        to_floor = held * transfer.to_dom;
                        self.pools[[DomPool::FastAg.index(), sp]] += to_floor;
                    }
                    _ => {}
                }

                self.transfers.disturbed_to_air += loss;
                self.transfers.disturbed_to_fps += to_fps;

                let cell = &mut self.pools[[pool.index(), sp]];
                *cell -= loss + to_fps + to_floor;
                if *cell < 0.0 {
                    *cell = 0.0;
                }
            }
        }
        TransferOutcome::Applied
    }

    /// One year of decay for one species column.
    ///
    /// Drains the staged `net_c_loss` inputs through the pool cascade.
    /// Every section is guarded so empty pools with no input stay
    /// bit-identical, including zero-decay pools.
    pub fn do_soil_dynamics(&mut self, params: &ForcsParameters, species: SpeciesId) {
        let sp = species.0;
        let prop_air = &params.soil.prop_to_air;
        // Decay output bound for the two slow pools, above then below.
        let mut to_slow = [0.0_f64; 2];
        let mut branch_snag_input = 0.0;
        self.branch_snag_to_fast = 0.0;
        self.snag_to_medium = 0.0;

        // === Very fast pools: foliage and fine root litter ===
        if self.net_c_loss[[BiomassPool::Foliage.index(), sp]] > 0.0
            || self.net_c_loss[[BiomassPool::FineRoot.index(), sp]] > 0.0
            || self.pools[[DomPool::VeryFastAg.index(), sp]] > 0.0
            || self.pools[[DomPool::VeryFastBg.index(), sp]] > 0.0
        {
            let above_c = self.net_c_loss[[BiomassPool::Foliage.index(), sp]];
            let below_c = self.net_c_loss[[BiomassPool::FineRoot.index(), sp]];
            self.pools[[DomPool::VeryFastAg.index(), sp]] +=
                above_c + FINE_ROOT_AG_RATIO * below_c;
            self.pools[[DomPool::VeryFastBg.index(), sp]] +=
                (1.0 - FINE_ROOT_AG_RATIO) * below_c;

            let lost_ag = self.decay_pool(DomPool::VeryFastAg, sp);
            let lost_bg = self.decay_pool(DomPool::VeryFastBg, sp);

            self.split_decay_loss(DomPool::VeryFastAg, lost_ag, prop_air, &mut to_slow[0]);
            self.split_decay_loss(DomPool::VeryFastBg, lost_bg, prop_air, &mut to_slow[1]);
        }

        // === Fast pools: branch, top and coarse root litter ===
        if self.net_c_loss[[BiomassPool::SubMerchantable.index(), sp]] > 0.0
            || self.net_c_loss[[BiomassPool::Other.index(), sp]] > 0.0
            || self.net_c_loss[[BiomassPool::CoarseRoot.index(), sp]] > 0.0
            || self.pools[[DomPool::FastAg.index(), sp]] > 0.0
            || self.pools[[DomPool::FastBg.index(), sp]] > 0.0
            || self.pools[[DomPool::BranchSnag.index(), sp]] > 0.0
        {
            // Branch snags fall before this year's input lands.
            self.branch_snag_to_fast = self.pools[[DomPool::BranchSnag.index(), sp]]
                * params.soil.prop_branch_snag_to_fast_ag;
            self.pools[[DomPool::BranchSnag.index(), sp]] -= self.branch_snag_to_fast;

            let above_c = self.net_c_loss[[BiomassPool::SubMerchantable.index(), sp]]
                + self.net_c_loss[[BiomassPool::Other.index(), sp]];
            let below_c = self.net_c_loss[[BiomassPool::CoarseRoot.index(), sp]];

            let prop_non_merch = params.traits(species).prop_non_merch;
            branch_snag_input = above_c * (1.0 - prop_non_merch);

            self.pools[[DomPool::FastAg.index(), sp]] += above_c * prop_non_merch
                + COARSE_ROOT_AG_RATIO * below_c
                + self.branch_snag_to_fast;
            self.pools[[DomPool::FastBg.index(), sp]] += (1.0 - COARSE_ROOT_AG_RATIO) * below_c;

            let lost_ag = self.decay_pool(DomPool::FastAg, sp);
            let lost_bg = self.decay_pool(DomPool::FastBg, sp);

            self.split_decay_loss(DomPool::FastAg, lost_ag, prop_air, &mut to_slow[0]);
            self.split_decay_loss(DomPool::FastBg, lost_bg, prop_air, &mut to_slow[1]);
        }

        // === Snag pools: dead stems and branches still standing ===
        if self.net_c_loss[[BiomassPool::Merchantable.index(), sp]] > 0.0
            || self.pools[[DomPool::StemSnag.index(), sp]] > 0.0
            || self.pools[[DomPool::BranchSnag.index(), sp]] > 0.0
            || branch_snag_input > 0.0
        {
            // Stem snags fall to Medium before the new kill arrives.
            self.snag_to_medium = self.pools[[DomPool::StemSnag.index(), sp]]
                * params.soil.prop_stem_snag_to_medium;
            self.pools[[DomPool::StemSnag.index(), sp]] -= self.snag_to_medium;

            self.pools[[DomPool::StemSnag.index(), sp]] +=
                self.net_c_loss[[BiomassPool::Merchantable.index(), sp]];
            self.pools[[DomPool::BranchSnag.index(), sp]] += branch_snag_input;

            let stem_lost = self.decay_pool(DomPool::StemSnag, sp);
            let branch_lost = self.decay_pool(DomPool::BranchSnag, sp);

            self.split_decay_loss(DomPool::StemSnag, stem_lost, prop_air, &mut to_slow[0]);
            self.split_decay_loss(DomPool::BranchSnag, branch_lost, prop_air, &mut to_slow[0]);
        }

        // === Medium pool: fallen stems ===
        if self.snag_to_medium > 0.0 || self.pools[[DomPool::Medium.index(), sp]] > 0.0 {
            self.pools[[DomPool::Medium.index(), sp]] += self.snag_to_medium;
            let lost = self.decay_pool(DomPool::Medium, sp);
            self.split_decay_loss(DomPool::Medium, lost, prop_air, &mut to_slow[0]);
        }

        // === Black carbon: decays only, nothing flows in ===
        if self.pools[[DomPool::BlackCarbon.index(), sp]] > 0.0 {
            let lost = self.decay_pool(DomPool::BlackCarbon, sp);
            self.split_decay_loss(DomPool::BlackCarbon, lost, prop_air, &mut to_slow[0]);
        }

        // === Slow pools: receive the cascade, respire everything lost ===
        if self.pools[[DomPool::SlowAg.index(), sp]] > 0.0
            || self.pools[[DomPool::SlowBg.index(), sp]] > 0.0
            || to_slow[0] > 0.0
            || to_slow[1] > 0.0
        {
            self.pools[[DomPool::SlowAg.index(), sp]] += to_slow[0];
            let lost_ag = self.decay_pool(DomPool::SlowAg, sp);

            self.pools[[DomPool::SlowBg.index(), sp]] += to_slow[1];
            let lost_bg = self.decay_pool(DomPool::SlowBg, sp);

            self.carbon_to_air[DomPool::SlowAg.index()] = lost_ag;
            self.carbon_to_air[DomPool::SlowBg.index()] = lost_bg;
        }

        self.do_pool_bio_mixing(sp, params.soil.prop_slow_ag_to_slow_bg);

        for pool in DomPool::ALL {
            let cell = &mut self.pools[[pool.index(), sp]];
            if *cell < 0.0 {
                log::warn!("{} went negative ({:e}); clamping to zero", pool, *cell);
                *cell = 0.0;
            }
            self.total_dom[pool.index()] += *cell;
        }
    }

    /// Removes this year's decay loss from a pool and returns it.
    fn decay_pool(&mut self, pool: DomPool, sp: usize) -> f64 {
        let lost = self.pools[[pool.index(), sp]] * self.decay_rates[[pool.index(), sp]];
        self.pools[[pool.index(), sp]] -= lost;
        lost
    }

    /// Splits a decay loss between the atmosphere and a slow pool bound.
    fn split_decay_loss(
        &mut self,
        pool: DomPool,
        lost: f64,
        prop_air: &[f64; NUM_DOM_POOLS],
        slow_bound: &mut f64,
    ) {
        let to_air = lost * prop_air[pool.index()];
        self.carbon_to_air[pool.index()] += to_air;
        self.carbon_to_slow[pool.index()] += lost - to_air;
        *slow_bound += lost - to_air;
    }

    /// One-way humification mixing from SlowAG down into SlowBG.
    fn do_pool_bio_mixing(&mut self, sp: usize, rate: f64) {
        let slow_ag = self.pools[[DomPool::SlowAg.index(), sp]];
        self.carbon_to_slow[DomPool::SlowAg.index()] += slow_ag * rate;
        self.pools[[DomPool::SlowBg.index(), sp]] += slow_ag * rate;
        self.pools[[DomPool::SlowAg.index(), sp]] = slow_ag * (1.0 - rate);
    }

    /// Runs the annual soil pass over every species and, in normal years,
    /// closes the site's carbon budget.
    ///
    /// `total_biomass` is the site's above-ground live biomass after
    /// growth and `pre_growth_biomass` the value before it, both g m⁻².
    /// Dynamics are withheld during the spin-up growth phase (`year == 0`
    /// with a `Normal` pass): litter only accumulates on the replay tape
    /// until the spin-up and final passes consume it.
    pub fn process_soils(
        &mut self,
        params: &ForcsParameters,
        ecoregion: EcoregionId,
        temperature: f64,
        year: Year,
        pass: SoilPass,
        total_biomass: f64,
        pre_growth_biomass: f64,
    ) -> Option<AnnualFluxes> {
        self.litter_mass = 0.0;
        self.deadwood_mass = 0.0;

        for species in params.catalog.species() {
            let sp = species.0;
            if !self.species_present[sp] {
                // First projected year and the final pass scrub pools of
                // species that never appeared.
                if year == 1 || pass == SoilPass::FinalInit {
                    for pool in DomPool::ALL {
                        self.pools[[pool.index(), sp]] = 0.0;
                    }
                }
                continue;
            }
            if year == 0 && self.last_age == 0 {
                for component in BiomassPool::ALL {
                    self.live_biomass[[component.index(), sp]] = 0.0;
                }
            }

            self.calculate_decay_rates(params, ecoregion, species, temperature);
            self.carbon_to_air = [0.0; NUM_DOM_POOLS];
            self.carbon_to_slow = [0.0; NUM_DOM_POOLS];
            self.total_dom = [0.0; NUM_DOM_POOLS];

            let run_dynamics = year > 0
                || (year == 0 && (self.last_soil_pass || pass == SoilPass::Spinup));
            if run_dynamics {
                self.do_soil_dynamics(params, species);
            }

            self.litter_mass += self.total_dom[DomPool::VeryFastAg.index()]
                + self.total_dom[DomPool::VeryFastBg.index()];
            for pool in DomPool::ALL {
                self.transfers.undisturbed_to_air += self.carbon_to_air[pool.index()];
                if pool.index() >= 2 {
                    self.deadwood_mass += self.total_dom[pool.index()];
                }
            }

            // The staged inputs are consumed; clear them for next year.
            for component in BiomassPool::ALL {
                self.net_c_loss[[component.index(), sp]] = 0.0;
                if year > 0 {
                    self.litter_history[[component.index(), sp, 0]] = 0.0;
                }
            }
        }

        let fluxes = if pass == SoilPass::Normal {
            self.summary(year, total_biomass, pre_growth_biomass)
        } else {
            None
        };

        self.disturbed = [false; DisturbanceKind::ALL.len()];
        self.transfers = TransferTotals::default();
        fluxes
    }

    /// Closes the annual budget. Year 0 only rebaselines the biomass
    /// bookkeeping; no fluxes are reported for spin-up growth years.
    fn summary(
        &mut self,
        year: Year,
        total_biomass: f64,
        pre_growth_biomass: f64,
    ) -> Option<AnnualFluxes> {
        let belowground_c = self.post_growth_root_biomass * BIOMASS_TO_CARBON;
        let aboveground_c = total_biomass * BIOMASS_TO_CARBON;
        let total_c = aboveground_c + belowground_c;
        let pre_growth_c =
            (pre_growth_biomass + self.pre_growth_root_biomass) * BIOMASS_TO_CARBON;

        let fluxes = if year > 0 {
            let delta_biomass_c = total_c - self.old_biomass_c;
            let net_growth_c = total_c - pre_growth_c;
            let npp = (net_growth_c + self.transfers.undisturbed_to_dom).max(0.0);
            let rh = self.transfers.undisturbed_to_air;
            let nep = npp - rh;
            let nbp = nep - self.transfers.disturbed_to_fps - self.transfers.disturbed_to_air;
            Some(AnnualFluxes {
                npp,
                nep,
                nbp,
                rh,
                to_fps: self.transfers.disturbed_to_fps,
                aboveground_c,
                belowground_c,
                delta_biomass_c,
                net_growth_c,
                litter_c: self.litter_mass,
                deadwood_c: self.deadwood_mass,
            })
        } else {
            None
        };

        self.old_biomass_c = total_c;
        self.pre_growth_root_biomass = 0.0;
        self.post_growth_root_biomass = 0.0;
        fluxes
    }
}

//! Annual cohort growth and mortality.
//!
//! The growth model follows Scheller & Mladenoff (2004): each cohort's
//! actual ANPP is its maximum ANPP scaled by how close the cohort sits to
//! its potential biomass and by its competitive share of the site, with
//! age-related mortality following an exponential curve towards the
//! species' longevity and development-related mortality a Michaelis-Menten
//! function of the same biomass ratio. Every gram of mortality, turnover
//! and litterfall produced here is reported to the soil engine, which is
//! what closes the site's carbon budget.

use crate::carbon::roots::{root_biomass, root_turnover};
use crate::carbon::soil::{LitterDestination, RootPhase, SoilState};
use crate::disturbance::DisturbanceEvent;
use crate::parameters::dynamics::AnnualTables;
use crate::parameters::ForcsParameters;
use forcs_core::errors::{ForcsError, ForcsResult};
use forcs_core::series::Year;
use forcs_core::table::{EcoregionId, SpeciesId};

/// Fraction of ANPP allocated to foliage (Niklas & Enquist 2002).
pub const LEAF_FRACTION: f64 = 0.35;

/// Exponent applied to cohort biomass when computing competitive shares.
const COMPETITION_POWER: f64 = 0.95;

/// Fraction of a standing cohort's biomass treated as foliage when the
/// whole cohort dies at once.
pub(crate) const STANDING_NONWOODY_FRACTION: f64 = 0.1;

/// One even-aged cohort of a species on a site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cohort {
    pub species: SpeciesId,
    pub age: u16,
    /// Above-ground biomass, g m⁻².
    pub biomass: f64,
}

/// Site-level inputs to one cohort's annual change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthContext {
    pub year: Year,
    /// Total above-ground live biomass on the site, g m⁻².
    pub site_biomass: f64,
    /// Last year's total site mortality; floors potential biomass so a
    /// site cannot lose growing space to its own turnover.
    pub prev_year_site_mortality: f64,
    /// Remaining site capacity after harvest, 1.0 when unharvested.
    pub capacity_remaining: f64,
    /// External growth reduction in [0, 1), 0 when none.
    pub growth_reduction: f64,
    /// Defoliation intensity in [0, 1], 0 when none.
    pub defoliation: f64,
}

impl Default for GrowthContext {
    fn default() -> Self {
        Self {
            year: 1,
            site_biomass: 0.0,
            prev_year_site_mortality: 0.0,
            capacity_remaining: 1.0,
            growth_reduction: 0.0,
            defoliation: 0.0,
        }
    }
}

/// What one cohort did this year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthOutcome {
    /// Signed biomass change, truncated to whole grams. A value of
    /// `-biomass` means the cohort died.
    pub delta_biomass: f64,
    pub actual_anpp: f64,
    pub age_mortality: f64,
    pub growth_mortality: f64,
    /// Woody standing mortality, excluding annual leaf litter.
    pub woody_mortality: f64,
}

/// Computes annual biomass change for cohorts of one site.
pub struct GrowthEngine<'a> {
    params: &'a ForcsParameters,
    tables: &'a AnnualTables,
    ecoregion: EcoregionId,
}

impl<'a> GrowthEngine<'a> {
    pub fn new(
        params: &'a ForcsParameters,
        tables: &'a AnnualTables,
        ecoregion: EcoregionId,
    ) -> Self {
        Self {
            params,
            tables,
            ecoregion,
        }
    }

    /// One cohort's annual change: growth, mortality, litterfall and root
    /// turnover, all reported to `soil`.
    ///
    /// `neighbours` is every cohort on the site including this one; the
    /// cohort's own entry is recognised by species and age and counted
    /// exactly once in the competition index.
    pub fn compute_annual_change(
        &self,
        cohort: &Cohort,
        neighbours: &[Cohort],
        ctx: &GrowthContext,
        soil: &mut SoilState,
    ) -> ForcsResult<GrowthOutcome> {
        // Pre-growth root stocks feed the summary budget and must be
        // captured before any growth or mortality.
        let allocation = self.params.root_allocation(self.ecoregion, cohort.species);
        let pre_growth_roots = root_biomass(allocation, cohort.biomass);
        soil.collect_root_biomass(pre_growth_roots.total(), RootPhase::PreGrowth);

        let age_mortality = self.age_mortality(cohort, ctx.year);

        let competition = competition_index(cohort, neighbours);
        let mut actual_anpp = self.actual_anpp(cohort, competition, ctx);

        // Age mortality is discounted from ANPP to avoid double-counting
        // it as both lost growth and lost biomass. ANPP stays positive.
        actual_anpp = (actual_anpp - age_mortality).max(1.0);

        let mut growth_mortality = self.growth_mortality(cohort, competition, ctx);
        growth_mortality = (growth_mortality - age_mortality).max(0.0);
        growth_mortality = growth_mortality.min(actual_anpp);

        let total_mortality = age_mortality + growth_mortality;
        if total_mortality > cohort.biomass {
            return Err(ForcsError::MortalityExceedsBiomass {
                species: self
                    .params
                    .catalog
                    .species_name(cohort.species)
                    .to_string(),
                age: cohort.age,
                mortality: total_mortality,
                biomass: cohort.biomass,
            });
        }

        let mut defoliation_loss = 0.0;
        if ctx.defoliation > 0.0 {
            defoliation_loss = actual_anpp * LEAF_FRACTION * ctx.defoliation;
            // Defoliation only touches the DOM side; the eaten foliage
            // leaves the site rather than entering the litter pools.
            soil.disturbance_impacts_dom(self.params, &DisturbanceEvent::from_label("defol"));
        }

        let mut delta_biomass = (actual_anpp - total_mortality - defoliation_loss).trunc();
        let new_biomass = cohort.biomass + delta_biomass;

        let woody_mortality =
            self.update_dead_biomass(cohort, actual_anpp, total_mortality, new_biomass, ctx, soil)?;

        // In the designated kill-off year of initialisation, cohorts that
        // match an initial snag record die standing. Records are ordered
        // by age, so the scan can stop at the first older record.
        if soil.kill_now && !self.params.snags.is_empty() {
            for (idx, record) in self.params.snags.iter().enumerate() {
                if cohort.age == record.age_at_death && cohort.species == record.species {
                    delta_biomass = -cohort.biomass;
                    let foliar = cohort.biomass * STANDING_NONWOODY_FRACTION;
                    let wood = cohort.biomass - foliar;
                    soil.collect_biomass_mortality(
                        self.params,
                        cohort.species,
                        cohort.age,
                        wood,
                        foliar,
                        LitterDestination::InitialSnag(idx),
                        ctx.year,
                    )?;
                }
                if record.age_at_death > cohort.age {
                    break;
                }
            }
        }

        if delta_biomass > -cohort.biomass {
            let post_growth_roots = root_biomass(allocation, new_biomass);
            soil.collect_root_biomass(post_growth_roots.total(), RootPhase::PostGrowth);
        }

        Ok(GrowthOutcome {
            delta_biomass,
            actual_anpp,
            age_mortality,
            growth_mortality,
            woody_mortality,
        })
    }

    /// Mortality caused by the cohort's age: an exponential climb towards
    /// complete turnover at the species' longevity.
    fn age_mortality(&self, cohort: &Cohort, year: Year) -> f64 {
        let traits = self.params.traits(cohort.species);
        let max_age = f64::from(traits.longevity);
        let d = traits.mortality_curve_shape;

        let mut m_age =
            cohort.biomass * (f64::from(cohort.age) / max_age * d).exp() / d.exp();
        m_age = m_age.min(cohort.biomass);

        let fraction = self.params.spinup.spinup_mortality_fraction;
        if year <= 0 && fraction > 0.0 {
            m_age += cohort.biomass * fraction;
        }
        m_age
    }

    /// Actual ANPP, equation 4 of Scheller & Mladenoff (2004), with the
    /// cohort's competitive share capping the growing space it can claim.
    fn actual_anpp(&self, cohort: &Cohort, competition: f64, ctx: &GrowthContext) -> f64 {
        let key = (self.ecoregion, cohort.species);
        let max_anpp = self.tables.max_anpp[key];
        let max_biomass = self.tables.max_biomass[key];
        let shape = self.params.traits(cohort.species).growth_curve_shape;

        let mut potential_biomass = (max_biomass - ctx.site_biomass + cohort.biomass).max(1.0);

        // New space opened by mortality is usable immediately, except
        // where a harvest has reduced the site's capacity.
        if ctx.capacity_remaining >= 1.0 {
            potential_biomass = potential_biomass.max(ctx.prev_year_site_mortality);
        }

        let b_ap = (cohort.biomass / potential_biomass).min(1.0);
        let b_pm = competition.min(1.0);

        let mut anpp =
            max_anpp * std::f64::consts::E * b_ap.powf(shape) * (-b_ap.powf(shape)).exp() * b_pm;
        anpp = anpp.min(max_anpp * b_pm);
        if ctx.growth_reduction > 0.0 {
            anpp *= 1.0 - ctx.growth_reduction;
        }
        anpp
    }

    /// Development-related mortality: self-thinning and the loss of
    /// branches and twigs, as a Michaelis-Menten function of the biomass
    /// ratio (Scheller et al. 2010).
    fn growth_mortality(&self, cohort: &Cohort, competition: f64, ctx: &GrowthContext) -> f64 {
        let key = (self.ecoregion, cohort.species);
        let max_anpp = self.tables.max_anpp[key];
        let max_biomass = self.tables.max_biomass[key];

        let mut potential_biomass = (max_biomass - ctx.site_biomass + cohort.biomass).max(1.0);
        if ctx.capacity_remaining >= 1.0 {
            potential_biomass = potential_biomass.max(ctx.prev_year_site_mortality);
        }
        let b_ap = (cohort.biomass / potential_biomass).min(1.0);
        let b_pm = competition.min(1.0);

        let mut m_bio = if b_ap > 1.0 {
            max_anpp * b_pm
        } else {
            max_anpp * (2.0 * b_ap) / (1.0 + b_ap) * b_pm
        };
        m_bio = m_bio.min(cohort.biomass);
        m_bio = m_bio.min(max_anpp * b_pm);
        if ctx.growth_reduction > 0.0 {
            m_bio *= 1.0 - ctx.growth_reduction;
        }
        m_bio
    }

    /// Routes this year's litterfall, standing mortality and root
    /// turnover into the soil engine. Returns the woody share of standing
    /// mortality, excluding annual leaf litter.
    fn update_dead_biomass(
        &self,
        cohort: &Cohort,
        actual_anpp: f64,
        total_mortality: f64,
        new_biomass: f64,
        ctx: &GrowthContext,
        soil: &mut SoilState,
    ) -> ForcsResult<f64> {
        let species = cohort.species;
        let traits = self.params.traits(species);
        let allocation = self.params.root_allocation(self.ecoregion, species);

        // This year's foliage goes straight to the forest floor.
        let annual_leaf_anpp = actual_anpp * LEAF_FRACTION;

        // The rest of the mortality comes off standing biomass accrued in
        // previous years, split between wood and foliage in proportion to
        // the standing stocks (Niklas & Enquist 2002). Standing foliage
        // is approximated from leaf longevity, assuming ANPP has been
        // steady for the last few years.
        let standing_mortality = total_mortality - annual_leaf_anpp;
        let standing_nonwood = annual_leaf_anpp * traits.leaf_longevity - annual_leaf_anpp;

        let fraction_nonwood = if new_biomass > 0.0 {
            standing_nonwood / new_biomass
        } else {
            0.0
        };
        let mortality_nonwood = (standing_mortality * fraction_nonwood).max(0.0);
        let mortality_wood = (standing_mortality - mortality_nonwood).max(0.0);

        soil.collect_biomass_mortality(
            self.params,
            species,
            cohort.age,
            mortality_wood,
            mortality_nonwood + annual_leaf_anpp,
            LitterDestination::Aboveground,
            ctx.year,
        )?;

        let turnover = root_turnover(allocation, new_biomass);
        soil.collect_biomass_mortality(
            self.params,
            species,
            cohort.age,
            turnover.coarse,
            turnover.fine,
            LitterDestination::Belowground,
            ctx.year,
        )?;

        // A shrinking cohort sheds root biomass too. The decline is
        // allocated by the pre-decline coarse/fine proportions so that a
        // bin change cannot empty one pool while inflating the other.
        if new_biomass < cohort.biomass {
            let pre_roots = root_biomass(allocation, cohort.biomass);
            let post_roots = root_biomass(allocation, new_biomass);
            let decline = pre_roots.total() - post_roots.total();
            if decline > 0.0 {
                let diff_fine = pre_roots.fine / pre_roots.total() * decline;
                let diff_coarse = decline - diff_fine;
                soil.collect_biomass_mortality(
                    self.params,
                    species,
                    cohort.age,
                    diff_coarse,
                    diff_fine,
                    LitterDestination::Belowground,
                    ctx.year,
                )?;
                if ctx.year > 0
                    && (pre_roots.coarse < post_roots.coarse || pre_roots.fine < post_roots.fine)
                {
                    log::debug!(
                        "root allocation shifted while biomass declined: coarse {} -> {}, fine {} -> {}",
                        pre_roots.coarse,
                        post_roots.coarse,
                        pre_roots.fine,
                        post_roots.fine
                    );
                }
            } else if ctx.year > 0 {
                log::debug!(
                    "above-ground biomass declined {} -> {} but root biomass rose {} -> {}",
                    cohort.biomass,
                    new_biomass,
                    pre_roots.total(),
                    post_roots.total()
                );
            }
        }

        // During spin-up growth the standing stocks themselves are
        // recorded, so the initial fire replay knows the live biomass it
        // is burning.
        if ctx.year == 0 {
            let standing_wood = (new_biomass - standing_nonwood).max(0.0);
            soil.collect_biomass_mortality(
                self.params,
                species,
                cohort.age,
                standing_wood,
                standing_nonwood,
                LitterDestination::LiveWood,
                ctx.year,
            )?;
            let standing_turnover = root_turnover(allocation, standing_wood + standing_nonwood);
            soil.collect_biomass_mortality(
                self.params,
                species,
                cohort.age,
                standing_turnover.coarse,
                standing_turnover.fine,
                LitterDestination::LiveRoots,
                ctx.year,
            )?;
        }

        Ok(mortality_wood)
    }

    /// Initial biomass of a newly established cohort: maximum ANPP scaled
    /// down exponentially by the established biomass already on the site.
    ///
    /// Cohorts of age 1 or less are excluded from the established biomass
    /// so that a one-year timestep does not let this year's seedlings
    /// suppress each other.
    pub fn initial_biomass(&self, species: SpeciesId, cohorts: &[Cohort]) -> f64 {
        let established: f64 = cohorts
            .iter()
            .filter(|c| c.age > 1)
            .map(|c| c.biomass)
            .sum();
        let key = (self.ecoregion, species);
        let max_anpp = self.tables.max_anpp[key];
        let b_max = self.tables.b_max[self.ecoregion.0];

        let scale = if b_max > 0.0 {
            (-1.6 * established / b_max).exp()
        } else {
            1.0
        };
        (max_anpp * scale).min(max_anpp).max(2.0).trunc()
    }

    /// Standing foliage of a cohort given its current ANPP, bounded to
    /// [2.5%, leaf fraction] of its biomass.
    pub fn standing_leaf_biomass(&self, cohort: &Cohort, actual_anpp: f64) -> f64 {
        let leaf_longevity = self.params.traits(cohort.species).leaf_longevity;
        let nonwoody = actual_anpp * LEAF_FRACTION * leaf_longevity;
        nonwoody
            .max(cohort.biomass * 0.025)
            .min(cohort.biomass * LEAF_FRACTION)
    }
}

/// The cohort's competitive fraction of the site: its biomass raised to
/// [`COMPETITION_POWER`] over the same sum across all cohorts. The
/// cohort's own entry in `neighbours` is skipped so it is counted once.
fn competition_index(cohort: &Cohort, neighbours: &[Cohort]) -> f64 {
    let own = cohort.biomass.powf(COMPETITION_POWER).max(1.0);
    let mut total = own;
    for other in neighbours {
        if other.species == cohort.species && other.age == cohort.age {
            continue;
        }
        total += other.biomass.powf(COMPETITION_POWER).max(1.0);
    }
    own / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::dynamics::MeanSampler;
    use crate::parameters::snags::SnagRecord;
    use crate::parameters::tests::{single_species_params, two_species_params};
    use approx::assert_relative_eq;
    use forcs_core::pools::{BiomassPool, DomPool};

    const ECO: EcoregionId = EcoregionId(0);
    const SP: SpeciesId = SpeciesId(0);

    fn tables_for(params: &ForcsParameters, year: Year) -> AnnualTables {
        let mut tables = AnnualTables::new(&params.catalog);
        tables.update(params, year, &mut MeanSampler);
        tables
    }

    fn shape_one(params: &mut ForcsParameters) {
        params.species[SP].growth_curve_shape = 1.0;
        params.species[SP].mortality_curve_shape = 5.0;
    }

    #[test]
    fn a_young_cohort_grows_by_the_expected_amount() {
        let mut params = single_species_params();
        shape_one(&mut params);
        let tables = tables_for(&params, 1);
        let engine = GrowthEngine::new(&params, &tables, ECO);
        let mut soil = SoilState::new(&params, ECO);

        let cohort = Cohort {
            species: SP,
            age: 10,
            biomass: 100.0,
        };
        let ctx = GrowthContext {
            site_biomass: 100.0,
            ..GrowthContext::default()
        };
        let outcome = engine
            .compute_annual_change(&cohort, &[cohort], &ctx, &mut soil)
            .unwrap();

        // maxANPP 500, maxB 10000: B_AP = 0.01, competition 1.0.
        assert_relative_eq!(outcome.actual_anpp, 12.345272715, epsilon = 1e-6);
        assert_relative_eq!(
            outcome.age_mortality + outcome.growth_mortality,
            9.900990099,
            epsilon = 1e-6
        );
        assert_eq!(outcome.delta_biomass, 2.0);
    }

    #[test]
    fn age_mortality_consumes_the_whole_cohort_at_longevity() {
        let params = single_species_params();
        let tables = tables_for(&params, 1);
        let engine = GrowthEngine::new(&params, &tables, ECO);

        let cohort = Cohort {
            species: SP,
            age: params.species[SP].longevity,
            biomass: 500.0,
        };
        assert_relative_eq!(engine.age_mortality(&cohort, 1), 500.0);
    }

    #[test]
    fn spinup_mortality_fraction_can_push_mortality_past_biomass() {
        let mut params = single_species_params();
        shape_one(&mut params);
        params.spinup.spinup_mortality_fraction = 0.5;
        let tables = tables_for(&params, 0);
        let engine = GrowthEngine::new(&params, &tables, ECO);
        let mut soil = SoilState::new(&params, ECO);

        let cohort = Cohort {
            species: SP,
            age: params.species[SP].longevity,
            biomass: 100.0,
        };
        let ctx = GrowthContext {
            year: 0,
            site_biomass: 100.0,
            ..GrowthContext::default()
        };
        let err = engine
            .compute_annual_change(&cohort, &[cohort], &ctx, &mut soil)
            .unwrap_err();
        assert!(matches!(err, ForcsError::MortalityExceedsBiomass { .. }));
    }

    #[test]
    fn mortality_enters_the_litter_staging_matrix() {
        let mut params = single_species_params();
        shape_one(&mut params);
        let tables = tables_for(&params, 1);
        let engine = GrowthEngine::new(&params, &tables, ECO);
        let mut soil = SoilState::new(&params, ECO);

        let cohort = Cohort {
            species: SP,
            age: 10,
            biomass: 100.0,
        };
        let ctx = GrowthContext {
            site_biomass: 100.0,
            ..GrowthContext::default()
        };
        engine
            .compute_annual_change(&cohort, &[cohort], &ctx, &mut soil)
            .unwrap();

        // Foliage litter and fine root turnover are both staged.
        assert!(soil.pending_loss(BiomassPool::Foliage, SP) > 0.0);
        assert!(soil.pending_loss(BiomassPool::FineRoot, SP) > 0.0);
        assert!(soil.species_present(SP));
    }

    #[test]
    fn competition_splits_growing_space_between_cohorts() {
        let big = Cohort {
            species: SP,
            age: 50,
            biomass: 5000.0,
        };
        let small = Cohort {
            species: SpeciesId(1),
            age: 10,
            biomass: 100.0,
        };
        let site = [big, small];

        let big_share = competition_index(&big, &site);
        let small_share = competition_index(&small, &site);
        assert!(big_share > small_share);
        assert_relative_eq!(big_share + small_share, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn a_lone_cohort_faces_no_competition() {
        let cohort = Cohort {
            species: SP,
            age: 10,
            biomass: 100.0,
        };
        assert_relative_eq!(competition_index(&cohort, &[cohort]), 1.0);
    }

    #[test]
    fn growth_reduction_scales_anpp_down() {
        let mut params = single_species_params();
        shape_one(&mut params);
        let tables = tables_for(&params, 1);
        let engine = GrowthEngine::new(&params, &tables, ECO);

        let cohort = Cohort {
            species: SP,
            age: 10,
            biomass: 100.0,
        };
        let base = GrowthContext {
            site_biomass: 100.0,
            ..GrowthContext::default()
        };
        let reduced = GrowthContext {
            growth_reduction: 0.5,
            ..base
        };
        let full = engine.actual_anpp(&cohort, 1.0, &base);
        let half = engine.actual_anpp(&cohort, 1.0, &reduced);
        assert_relative_eq!(half, full * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn defoliation_shaves_the_biomass_increment() {
        let mut params = single_species_params();
        shape_one(&mut params);
        let tables = tables_for(&params, 1);
        let engine = GrowthEngine::new(&params, &tables, ECO);

        let cohort = Cohort {
            species: SP,
            age: 10,
            biomass: 100.0,
        };
        let calm = GrowthContext {
            site_biomass: 100.0,
            ..GrowthContext::default()
        };
        let eaten = GrowthContext {
            defoliation: 1.0,
            ..calm
        };

        let mut soil = SoilState::new(&params, ECO);
        let undisturbed = engine
            .compute_annual_change(&cohort, &[cohort], &calm, &mut soil)
            .unwrap();
        let mut soil = SoilState::new(&params, ECO);
        let defoliated = engine
            .compute_annual_change(&cohort, &[cohort], &eaten, &mut soil)
            .unwrap();
        assert!(defoliated.delta_biomass < undisturbed.delta_biomass);
    }

    #[test]
    fn kill_now_seeds_the_matching_snag_record() {
        let mut params = two_species_params();
        shape_one(&mut params);
        params.snags = crate::parameters::snags::InitialSnags::new(vec![SnagRecord {
            species: SP,
            age_at_death: 40,
            time_since_death: 10,
            disturbance: "fire".to_string(),
        }]);
        let tables = tables_for(&params, 0);
        let engine = GrowthEngine::new(&params, &tables, ECO);
        let mut soil = SoilState::new(&params, ECO);
        soil.kill_now = true;

        let doomed = Cohort {
            species: SP,
            age: 40,
            biomass: 2000.0,
        };
        let ctx = GrowthContext {
            year: 0,
            site_biomass: 2000.0,
            ..GrowthContext::default()
        };
        let outcome = engine
            .compute_annual_change(&doomed, &[doomed], &ctx, &mut soil)
            .unwrap();

        assert_eq!(outcome.delta_biomass, -2000.0);
        assert!(soil.snag_seeded(0));
        let (wood, nonwood) = soil.snag_biomass(0);
        assert_relative_eq!(wood, 1800.0);
        assert_relative_eq!(nonwood, 200.0);

        // A cohort of the other species is untouched.
        let mut soil = SoilState::new(&params, ECO);
        soil.kill_now = true;
        let spared = Cohort {
            species: SpeciesId(1),
            age: 40,
            biomass: 2000.0,
        };
        let outcome = engine
            .compute_annual_change(&spared, &[spared], &ctx, &mut soil)
            .unwrap();
        assert!(outcome.delta_biomass > -2000.0);
        assert!(!soil.snag_seeded(0));
    }

    #[test]
    fn spinup_growth_records_standing_stocks() {
        let mut params = single_species_params();
        shape_one(&mut params);
        let tables = tables_for(&params, 0);
        let engine = GrowthEngine::new(&params, &tables, ECO);
        let mut soil = SoilState::new(&params, ECO);

        let cohort = Cohort {
            species: SP,
            age: 30,
            biomass: 3000.0,
        };
        let ctx = GrowthContext {
            year: 0,
            site_biomass: 3000.0,
            ..GrowthContext::default()
        };
        engine
            .compute_annual_change(&cohort, &[cohort], &ctx, &mut soil)
            .unwrap();

        // Standing stocks are staged without flowing into the DOM pools.
        assert!(soil.live_wood_c(SP) > 0.0);
        assert_eq!(soil.total_pool(DomPool::VeryFastAg), 0.0);
    }

    #[test]
    fn initial_biomass_declines_with_established_biomass() {
        let params = single_species_params();
        let tables = tables_for(&params, 1);
        let engine = GrowthEngine::new(&params, &tables, ECO);

        let empty = engine.initial_biomass(SP, &[]);
        assert_eq!(empty, 500.0);

        let crowded = engine.initial_biomass(
            SP,
            &[Cohort {
                species: SP,
                age: 50,
                biomass: 8000.0,
            }],
        );
        assert!(crowded < empty);
        assert!(crowded >= 2.0);

        // Seedlings of age 1 do not count as established biomass.
        let seedlings = engine.initial_biomass(
            SP,
            &[Cohort {
                species: SP,
                age: 1,
                biomass: 400.0,
            }],
        );
        assert_eq!(seedlings, 500.0);
    }

    #[test]
    fn standing_leaf_biomass_is_clamped_to_the_cohort() {
        let params = single_species_params();
        let tables = tables_for(&params, 1);
        let engine = GrowthEngine::new(&params, &tables, ECO);

        let cohort = Cohort {
            species: SP,
            age: 10,
            biomass: 100.0,
        };
        // Enormous ANPP cannot put more than the leaf fraction on the stem.
        assert_relative_eq!(engine.standing_leaf_biomass(&cohort, 1e6), 35.0);
        // Tiny ANPP still leaves the 2.5% floor standing.
        assert_relative_eq!(engine.standing_leaf_biomass(&cohort, 0.0), 2.5);
    }
}

//! Carbon balance tests for the stand engine.
//!
//! These tests verify that the accounting identities hold end to end:
//! - disturbance transfers split carbon exactly by their matrices
//! - NEP equals the change in live plus dead carbon in undisturbed years
//! - NBP subtracts exactly what disturbances exported
//! - the soil spin-up converges and its state survives a snapshot

use approx::assert_relative_eq;
use forcs::carbon::soil::SoilState;
use forcs::disturbance::DisturbanceEvent;
use forcs::parameters::disturbance::PoolTransfer;
use forcs::parameters::dynamics::{AnnualTables, AnppEntry, MeanSampler};
use forcs::parameters::ForcsParameters;
use forcs::stand::{initialize_stand, HostInfluences, InitialCohort, Stand};
use forcs_core::pools::{BiomassPool, DomPool};
use forcs_core::table::{Catalog, EcoregionId, SpeciesId};

const ECO: EcoregionId = EcoregionId(0);
const SP: SpeciesId = SpeciesId(0);

/// A one-species boreal parameter set with every required series filled.
fn boreal_params() -> ForcsParameters {
    let catalog = Catalog::new(["Pinus banksiana"], ["upland"]);
    let mut params = ForcsParameters::with_defaults(catalog);

    let decay_rates = [0.355, 0.5, 0.14, 0.15, 0.015, 0.015, 0.0033, 0.02, 0.07, 0.0];
    for pool in DomPool::ALL {
        params.soil.pools[(ECO, SP)][pool.index()].decay_rate = decay_rates[pool.index()];
    }

    params.growth.max_anpp[(ECO, SP)] = [(
        0,
        AnppEntry {
            mean: 500.0,
            std_dev: 0.0,
        },
    )]
    .into_iter()
    .collect();
    params.growth.max_biomass[(ECO, SP)] = [(0, 10000.0)].into_iter().collect();
    params.growth.establish_prob[(ECO, SP)] = [(0, 0.9)].into_iter().collect();
    params.climate.temperature[0] = [(0, 5.0)].into_iter().collect();

    params.validate().unwrap();
    params
}

fn grown_stand(params: &ForcsParameters, age: u16) -> (Stand, AnnualTables) {
    let mut tables = AnnualTables::new(&params.catalog);
    let (stand, result) = initialize_stand(
        params,
        ECO,
        &[InitialCohort { species: SP, age }],
        &mut tables,
        &mut MeanSampler,
    )
    .unwrap();
    assert!(result.converged);
    tables.update(params, 1, &mut MeanSampler);
    (stand, tables)
}

mod disturbance_transfers {
    use super::*;

    /// Severity-3 fire with a 0.6/0.3/0.05 matrix on 100 g C of
    /// merchantable stem wood: 30 staged for DOM, 5 exported to the
    /// product sector, 60 lost to the atmosphere.
    #[test]
    fn fire_matrix_splits_merchantable_carbon_exactly() {
        let mut params = boreal_params();
        // A saturated merch curve makes all stem wood merchantable.
        params.species[SP].merch_curve_a = 1.0;
        params.species[SP].merch_curve_b = 0.0;
        params.disturbances.fire_biomass[2]
            .set(BiomassPool::Merchantable, PoolTransfer::new(0.6, 0.3, 0.05));

        let mut soil = SoilState::new(&params, ECO);
        let event = DisturbanceEvent::fire(3);
        // 200 g biomass of pure stem wood is 100 g C.
        soil.disturbance_impacts_biomass(&params, ECO, &event, SP, 50, 200.0, 0.0)
            .unwrap();

        assert_relative_eq!(soil.pending_loss(BiomassPool::Merchantable, SP), 30.0);
        let transfers = soil.transfers();
        assert_relative_eq!(transfers.disturbed_to_dom, 30.0);
        assert_relative_eq!(transfers.disturbed_to_fps, 5.0);
        assert_relative_eq!(transfers.disturbed_to_air, 60.0);
    }

    #[test]
    fn transfers_never_move_more_carbon_than_the_pool_holds() {
        let mut params = boreal_params();
        for pool in BiomassPool::ALL {
            params.disturbances.fire_biomass[0].set(pool, PoolTransfer::new(0.5, 0.4, 0.1));
        }

        let mut soil = SoilState::new(&params, ECO);
        let event = DisturbanceEvent::fire(1);
        soil.disturbance_impacts_biomass(&params, ECO, &event, SP, 50, 900.0, 100.0)
            .unwrap();

        // Killed biomass plus derived roots, as carbon.
        let killed_c = (1000.0 + 1000.0 * 0.25) * 0.5;
        let transfers = soil.transfers();
        let moved =
            transfers.disturbed_to_dom + transfers.disturbed_to_air + transfers.disturbed_to_fps;
        assert!(moved <= killed_c + 1e-9);
        assert_relative_eq!(moved, killed_c, epsilon = 1e-9);
    }
}

mod annual_budget {
    use super::*;

    /// In an undisturbed year, NEP must equal the change of total carbon
    /// on the site (live + litter + deadwood).
    #[test]
    fn nep_matches_the_site_carbon_delta() {
        let params = boreal_params();
        let (mut stand, tables) = grown_stand(&params, 40);

        let first = stand
            .grow_year(&params, &tables, 1, &HostInfluences::default())
            .unwrap()
            .unwrap();
        let second = stand
            .grow_year(&params, &tables, 2, &HostInfluences::default())
            .unwrap()
            .unwrap();

        let delta = (second.biomass_c() - first.biomass_c()) + (second.soil_c() - first.soil_c());
        assert_relative_eq!(second.nep, delta, epsilon = 1e-6);
        assert_relative_eq!(second.nbp, second.nep, epsilon = 1e-9);
    }

    /// NBP must fall below NEP by exactly the disturbance exports.
    #[test]
    fn nbp_subtracts_disturbance_exports() {
        let mut params = boreal_params();
        for pool in BiomassPool::ALL {
            params.disturbances.fire_biomass[2].set(pool, PoolTransfer::new(0.6, 0.3, 0.05));
        }
        let (mut stand, tables) = grown_stand(&params, 40);
        let killed_biomass = stand.cohorts()[0].biomass;

        let event = DisturbanceEvent::fire(3);
        stand
            .on_cohort_mortality(&params, 0, Some(&event), 1.0, 1)
            .unwrap();
        let fluxes = stand
            .grow_year(&params, &tables, 1, &HostInfluences::default())
            .unwrap()
            .unwrap();

        // Wood, foliage and derived roots all share the same matrix.
        let killed_c = killed_biomass * 1.25 * 0.5;
        assert_relative_eq!(fluxes.to_fps, killed_c * 0.05, epsilon = 1e-9);
        assert_relative_eq!(
            fluxes.nbp,
            fluxes.nep - killed_c * 0.05 - killed_c * 0.6,
            epsilon = 1e-9
        );
    }

    #[test]
    fn growth_is_reported_through_npp() {
        let params = boreal_params();
        let (mut stand, tables) = grown_stand(&params, 20);

        let fluxes = stand
            .grow_year(&params, &tables, 1, &HostInfluences::default())
            .unwrap()
            .unwrap();

        // A 21-year-old stand is still accumulating carbon.
        assert!(fluxes.npp > 0.0);
        assert!(fluxes.net_growth_c > 0.0);
        assert!(fluxes.rh > 0.0);
    }
}

mod initialisation {
    use super::*;

    #[test]
    fn spinup_converges_within_the_configured_budget() {
        let mut params = boreal_params();
        params.spinup.tolerance = 0.01;
        params.spinup.max_iterations = 50;

        let mut tables = AnnualTables::new(&params.catalog);
        let (stand, result) = initialize_stand(
            &params,
            ECO,
            &[InitialCohort { species: SP, age: 80 }],
            &mut tables,
            &mut MeanSampler,
        )
        .unwrap();

        assert!(result.converged);
        assert!(result.iterations <= 50);
        assert!(stand.soil().total_pool(DomPool::SlowAg) > 0.0);
        assert!(stand.soil().total_pool(DomPool::SlowBg) > 0.0);
    }

    #[test]
    fn every_pool_is_non_negative_after_initialisation_and_a_year() {
        let params = boreal_params();
        let (mut stand, tables) = grown_stand(&params, 60);
        stand
            .grow_year(&params, &tables, 1, &HostInfluences::default())
            .unwrap();

        for pool in DomPool::ALL {
            assert!(stand.soil().total_pool(pool) >= 0.0);
        }
    }

    #[test]
    fn a_soil_snapshot_restores_to_identical_state() {
        let params = boreal_params();
        let (stand, _tables) = grown_stand(&params, 40);

        let encoded = serde_json::to_string(stand.soil()).unwrap();
        let restored: SoilState = serde_json::from_str(&encoded).unwrap();

        assert_relative_eq!(
            restored.total_dom_c(),
            stand.soil().total_dom_c(),
            epsilon = 1e-9
        );
        for pool in DomPool::ALL {
            assert_relative_eq!(
                restored.total_pool(pool),
                stand.soil().total_pool(pool),
                epsilon = 1e-9
            );
        }
        assert_eq!(serde_json::to_string(&restored).unwrap(), encoded);
    }
}

//! Dense parameter tables keyed by species and ecoregion.
//!
//! The host model hands species and ecoregions over by name once, at load
//! time; everything after that works with small index handles into dense
//! storage. A `Catalog` owns the name ↔ index mapping, and the two table
//! types below are thin dense containers indexed by those handles.

use crate::errors::{ForcsError, ForcsResult};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Handle for a species in a [`Catalog`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub usize);

/// Handle for an ecoregion in a [`Catalog`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EcoregionId(pub usize);

/// The species and ecoregion names a parameter set covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    species: Vec<String>,
    ecoregions: Vec<String>,
}

impl Catalog {
    pub fn new(
        species: impl IntoIterator<Item = impl Into<String>>,
        ecoregions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            species: species.into_iter().map(Into::into).collect(),
            ecoregions: ecoregions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    pub fn n_ecoregions(&self) -> usize {
        self.ecoregions.len()
    }

    pub fn species_id(&self, name: &str) -> ForcsResult<SpeciesId> {
        self.species
            .iter()
            .position(|s| s == name)
            .map(SpeciesId)
            .ok_or_else(|| ForcsError::UnknownName {
                kind: "species".to_string(),
                name: name.to_string(),
            })
    }

    pub fn ecoregion_id(&self, name: &str) -> ForcsResult<EcoregionId> {
        self.ecoregions
            .iter()
            .position(|e| e == name)
            .map(EcoregionId)
            .ok_or_else(|| ForcsError::UnknownName {
                kind: "ecoregion".to_string(),
                name: name.to_string(),
            })
    }

    pub fn species_name(&self, id: SpeciesId) -> &str {
        &self.species[id.0]
    }

    pub fn ecoregion_name(&self, id: EcoregionId) -> &str {
        &self.ecoregions[id.0]
    }

    pub fn species(&self) -> impl Iterator<Item = SpeciesId> {
        (0..self.species.len()).map(SpeciesId)
    }

    pub fn ecoregions(&self) -> impl Iterator<Item = EcoregionId> {
        (0..self.ecoregions.len()).map(EcoregionId)
    }
}

/// One value per species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable<T> {
    values: Vec<T>,
}

impl<T: Clone> SpeciesTable<T> {
    pub fn filled(catalog: &Catalog, value: T) -> Self {
        Self {
            values: vec![value; catalog.n_species()],
        }
    }
}

impl<T> SpeciesTable<T> {
    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &T)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (SpeciesId(i), v))
    }
}

impl<T> Index<SpeciesId> for SpeciesTable<T> {
    type Output = T;

    fn index(&self, id: SpeciesId) -> &T {
        &self.values[id.0]
    }
}

impl<T> IndexMut<SpeciesId> for SpeciesTable<T> {
    fn index_mut(&mut self, id: SpeciesId) -> &mut T {
        &mut self.values[id.0]
    }
}

/// One value per (ecoregion, species) pair, stored row-major by ecoregion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoSpeciesTable<T> {
    n_species: usize,
    values: Vec<T>,
}

impl<T: Clone> EcoSpeciesTable<T> {
    pub fn filled(catalog: &Catalog, value: T) -> Self {
        Self {
            n_species: catalog.n_species(),
            values: vec![value; catalog.n_ecoregions() * catalog.n_species()],
        }
    }
}

impl<T> EcoSpeciesTable<T> {
    fn offset(&self, ecoregion: EcoregionId, species: SpeciesId) -> usize {
        ecoregion.0 * self.n_species + species.0
    }
}

impl<T> Index<(EcoregionId, SpeciesId)> for EcoSpeciesTable<T> {
    type Output = T;

    fn index(&self, (ecoregion, species): (EcoregionId, SpeciesId)) -> &T {
        &self.values[self.offset(ecoregion, species)]
    }
}

impl<T> IndexMut<(EcoregionId, SpeciesId)> for EcoSpeciesTable<T> {
    fn index_mut(&mut self, (ecoregion, species): (EcoregionId, SpeciesId)) -> &mut T {
        let offset = self.offset(ecoregion, species);
        &mut self.values[offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boreal_catalog() -> Catalog {
        Catalog::new(
            ["Pinus banksiana", "Picea mariana"],
            ["upland", "lowland", "riparian"],
        )
    }

    #[test]
    fn catalog_resolves_names_to_handles() {
        let catalog = boreal_catalog();
        assert_eq!(
            catalog.species_id("Picea mariana").unwrap(),
            SpeciesId(1)
        );
        assert_eq!(catalog.ecoregion_id("riparian").unwrap(), EcoregionId(2));
        assert_eq!(catalog.species_name(SpeciesId(0)), "Pinus banksiana");
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let catalog = boreal_catalog();
        let err = catalog.species_id("Fagus grandifolia").unwrap_err();
        assert!(err.to_string().contains("Fagus grandifolia"));
    }

    #[test]
    fn eco_species_table_cells_are_independent() {
        let catalog = boreal_catalog();
        let mut table = EcoSpeciesTable::filled(&catalog, 0.0_f64);
        let upland = catalog.ecoregion_id("upland").unwrap();
        let lowland = catalog.ecoregion_id("lowland").unwrap();
        let pine = catalog.species_id("Pinus banksiana").unwrap();
        let spruce = catalog.species_id("Picea mariana").unwrap();

        table[(upland, spruce)] = 2.5;
        table[(lowland, pine)] = 7.0;

        assert_eq!(table[(upland, spruce)], 2.5);
        assert_eq!(table[(lowland, pine)], 7.0);
        assert_eq!(table[(upland, pine)], 0.0);
        assert_eq!(table[(lowland, spruce)], 0.0);
    }

    #[test]
    fn tables_survive_a_serde_round_trip() {
        let catalog = boreal_catalog();
        let mut table = EcoSpeciesTable::filled(&catalog, 0.0_f64);
        table[(EcoregionId(1), SpeciesId(1))] = 0.1875;

        let encoded = serde_json::to_string(&table).unwrap();
        let decoded: EcoSpeciesTable<f64> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, table);
    }
}

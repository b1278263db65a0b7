//! Initial standing-dead (snag) records.
//!
//! Sites can start the run with standing dead stems left by disturbances
//! that predate the simulation. Each record names the species, how old the
//! stems were when they died, how long ago that was, and which disturbance
//! killed them; the spin-up replays the kill at the right point in stand
//! history so the snag pools are populated consistently with the litter
//! pools.

use forcs_core::errors::{ForcsError, ForcsResult};
use forcs_core::table::{Catalog, SpeciesId};
use serde::{Deserialize, Serialize};

/// Capacity of the initial snag table.
pub const MAX_SNAG_RECORDS: usize = 1000;

/// Largest age (years) accepted for either snag age field.
pub const MAX_SNAG_AGE: u16 = 999;

/// One cohort of standing dead stems present at the start of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnagRecord {
    pub species: SpeciesId,
    /// Cohort age at death, years.
    pub age_at_death: u16,
    /// Years elapsed between the kill and the start of the run.
    pub time_since_death: u16,
    /// Label of the disturbance that killed the cohort; resolved to a
    /// transfer matrix when the snags are materialised.
    pub disturbance: String,
}

/// The initial snag table for a parameter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialSnags {
    records: Vec<SnagRecord>,
}

impl InitialSnags {
    pub fn new(records: Vec<SnagRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnagRecord> {
        self.records.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&SnagRecord> {
        self.records.get(idx)
    }

    pub fn validate(&self, catalog: &Catalog) -> ForcsResult<()> {
        if self.records.len() > MAX_SNAG_RECORDS {
            return Err(ForcsError::SnagCapacity {
                max: MAX_SNAG_RECORDS,
            });
        }
        for record in &self.records {
            if record.species.0 >= catalog.n_species() {
                return Err(ForcsError::UnknownName {
                    kind: "species".to_string(),
                    name: format!("index {}", record.species.0),
                });
            }
            for (what, value) in [
                ("age at death", record.age_at_death),
                ("time since death", record.time_since_death),
            ] {
                if value > MAX_SNAG_AGE {
                    return Err(ForcsError::OutOfRange {
                        name: format!(
                            "snag {} for {}",
                            what,
                            catalog.species_name(record.species)
                        ),
                        value: value as f64,
                        min: 0.0,
                        max: MAX_SNAG_AGE as f64,
                    });
                }
            }
        }
        Ok(())
    }
}

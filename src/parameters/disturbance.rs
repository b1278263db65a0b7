//! Disturbance transfer matrices.
//!
//! A disturbance moves carbon out of the live biomass components and the
//! DOM pools in three directions at once: to the atmosphere, to the DOM
//! network (or, for DOM pools, to a faster floor pool), and to the forest
//! product sector (FPS). Fire carries one matrix per severity class;
//! every other disturbance is looked up by its label.

use crate::disturbance::{DisturbanceEvent, DisturbanceKind, FIRE_SEVERITY_COUNT};
use forcs_core::errors::{ForcsError, ForcsResult};
use forcs_core::pools::{BiomassPool, DomPool, NUM_BIOMASS_POOLS, NUM_DOM_POOLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three-way split a disturbance applies to one pool.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolTransfer {
    pub to_air: f64,
    pub to_dom: f64,
    pub to_fps: f64,
}

impl PoolTransfer {
    pub const NONE: PoolTransfer = PoolTransfer {
        to_air: 0.0,
        to_dom: 0.0,
        to_fps: 0.0,
    };

    pub fn new(to_air: f64, to_dom: f64, to_fps: f64) -> Self {
        Self {
            to_air,
            to_dom,
            to_fps,
        }
    }

    fn validate(&self, table: &str, pool: &str) -> ForcsResult<()> {
        for (what, value) in [
            ("to air", self.to_air),
            ("to DOM", self.to_dom),
            ("to FPS", self.to_fps),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ForcsError::OutOfRange {
                    name: format!("{} proportion {} for {}", table, what, pool),
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        let total = self.to_air + self.to_dom + self.to_fps;
        if total > 1.0 + 1e-9 {
            return Err(ForcsError::ProportionSum {
                table: table.to_string(),
                pool: pool.to_string(),
                total,
            });
        }
        Ok(())
    }
}

/// Transfers for the six live biomass components under one disturbance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BiomassTransferMatrix {
    transfers: [PoolTransfer; NUM_BIOMASS_POOLS],
}

impl BiomassTransferMatrix {
    pub fn get(&self, pool: BiomassPool) -> &PoolTransfer {
        &self.transfers[pool.index()]
    }

    pub fn set(&mut self, pool: BiomassPool, transfer: PoolTransfer) {
        self.transfers[pool.index()] = transfer;
    }

    fn validate(&self, table: &str) -> ForcsResult<()> {
        for pool in BiomassPool::ALL {
            self.transfers[pool.index()].validate(table, pool.label())?;
        }
        Ok(())
    }
}

/// Transfers for the ten DOM pools under one disturbance.
///
/// For DOM pools, `to_dom` means "to the matching floor pool": stem snags
/// fall to `Medium`, branch snags to `FastAG`; every other pool treats it
/// as zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DomTransferMatrix {
    transfers: [PoolTransfer; NUM_DOM_POOLS],
}

impl DomTransferMatrix {
    pub fn get(&self, pool: DomPool) -> &PoolTransfer {
        &self.transfers[pool.index()]
    }

    pub fn set(&mut self, pool: DomPool, transfer: PoolTransfer) {
        self.transfers[pool.index()] = transfer;
    }

    fn validate(&self, table: &str) -> ForcsResult<()> {
        for pool in DomPool::ALL {
            self.transfers[pool.index()].validate(table, pool.label())?;
        }
        Ok(())
    }
}

/// All transfer matrices for a parameter set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisturbanceMatrices {
    /// Biomass-side fire matrices, indexed by severity − 1.
    pub fire_biomass: [BiomassTransferMatrix; FIRE_SEVERITY_COUNT],
    /// DOM-side fire matrices, indexed by severity − 1.
    pub fire_dom: [DomTransferMatrix; FIRE_SEVERITY_COUNT],
    /// Biomass-side matrices for named disturbances (harvest, wind, ...).
    pub other_biomass: BTreeMap<String, BiomassTransferMatrix>,
    /// DOM-side matrices for named disturbances.
    pub other_dom: BTreeMap<String, DomTransferMatrix>,
}

impl DisturbanceMatrices {
    /// The biomass matrix for an event, or `None` when the event has no
    /// configured effect (fire severity 0, unknown label).
    pub fn biomass_matrix(&self, event: &DisturbanceEvent) -> Option<&BiomassTransferMatrix> {
        match event.kind {
            DisturbanceKind::Fire => {
                let severity = event.fire_severity as usize;
                if (1..=FIRE_SEVERITY_COUNT).contains(&severity) {
                    Some(&self.fire_biomass[severity - 1])
                } else {
                    None
                }
            }
            _ => self
                .other_biomass
                .iter()
                .find(|(label, _)| label.eq_ignore_ascii_case(&event.label))
                .map(|(_, matrix)| matrix),
        }
    }

    /// The DOM matrix for an event, with the same lookup rules as
    /// [`Self::biomass_matrix`].
    pub fn dom_matrix(&self, event: &DisturbanceEvent) -> Option<&DomTransferMatrix> {
        match event.kind {
            DisturbanceKind::Fire => {
                let severity = event.fire_severity as usize;
                if (1..=FIRE_SEVERITY_COUNT).contains(&severity) {
                    Some(&self.fire_dom[severity - 1])
                } else {
                    None
                }
            }
            _ => self
                .other_dom
                .iter()
                .find(|(label, _)| label.eq_ignore_ascii_case(&event.label))
                .map(|(_, matrix)| matrix),
        }
    }

    pub fn validate(&self) -> ForcsResult<()> {
        for (severity, matrix) in self.fire_biomass.iter().enumerate() {
            matrix.validate(&format!("fire severity {} biomass", severity + 1))?;
        }
        for (severity, matrix) in self.fire_dom.iter().enumerate() {
            matrix.validate(&format!("fire severity {} DOM", severity + 1))?;
        }
        for (label, matrix) in &self.other_biomass {
            matrix.validate(&format!("{} biomass", label))?;
        }
        for (label, matrix) in &self.other_dom {
            matrix.validate(&format!("{} DOM", label))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportions_summing_past_one_are_rejected() {
        let mut matrix = BiomassTransferMatrix::default();
        matrix.set(
            BiomassPool::Merchantable,
            PoolTransfer::new(0.6, 0.3, 0.2),
        );
        let err = matrix.validate("harvest biomass").unwrap_err();
        assert!(matches!(err, ForcsError::ProportionSum { .. }));
    }

    #[test]
    fn fire_matrices_are_selected_by_severity() {
        let mut matrices = DisturbanceMatrices::default();
        matrices.fire_biomass[2].set(BiomassPool::Foliage, PoolTransfer::new(0.9, 0.1, 0.0));

        let event = DisturbanceEvent::fire(3);
        let matrix = matrices.biomass_matrix(&event).unwrap();
        assert_eq!(matrix.get(BiomassPool::Foliage).to_air, 0.9);
    }

    #[test]
    fn fire_severity_zero_has_no_matrix() {
        let matrices = DisturbanceMatrices::default();
        assert!(matrices.biomass_matrix(&DisturbanceEvent::fire(0)).is_none());
        assert!(matrices.dom_matrix(&DisturbanceEvent::fire(6)).is_none());
    }

    #[test]
    fn named_lookup_is_case_insensitive() {
        let mut matrices = DisturbanceMatrices::default();
        matrices
            .other_biomass
            .insert("harvest".to_string(), BiomassTransferMatrix::default());

        let event = DisturbanceEvent::from_label("Harvest");
        assert!(matrices.biomass_matrix(&event).is_some());
    }

    #[test]
    fn unknown_labels_have_no_matrix() {
        let matrices = DisturbanceMatrices::default();
        let event = DisturbanceEvent::from_label("ice storm");
        assert!(matrices.biomass_matrix(&event).is_none());
        assert!(matrices.dom_matrix(&event).is_none());
    }
}

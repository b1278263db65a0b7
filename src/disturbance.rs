//! Disturbance events and their effects on standing biomass.
//!
//! The host model reports disturbances as free-text labels such as
//! `"disturbance:fire"` or `"harvest"`. A label is resolved into a
//! [`DisturbanceKind`] once, when the event enters the engine, so that the
//! hot paths match on an enum instead of re-parsing strings. The original
//! label is kept alongside the kind because named transfer matrices are
//! looked up by it.

use crate::parameters::species::SpeciesTraits;
use serde::{Deserialize, Serialize};

/// Number of recognised fire severity levels (1-based).
pub const FIRE_SEVERITY_COUNT: usize = 5;

/// Broad disturbance categories recognised by the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisturbanceKind {
    None,
    Fire,
    Harvest,
    Wind,
    Insect,
    Drought,
    Defoliation,
    Other,
    LandUse,
}

impl DisturbanceKind {
    pub const ALL: [DisturbanceKind; 9] = [
        DisturbanceKind::None,
        DisturbanceKind::Fire,
        DisturbanceKind::Harvest,
        DisturbanceKind::Wind,
        DisturbanceKind::Insect,
        DisturbanceKind::Drought,
        DisturbanceKind::Defoliation,
        DisturbanceKind::Other,
        DisturbanceKind::LandUse,
    ];

    /// Substrings that identify this kind inside a host label.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            DisturbanceKind::None => &["none"],
            DisturbanceKind::Fire => &["fire"],
            DisturbanceKind::Harvest => &["harvest"],
            DisturbanceKind::Wind => &["wind"],
            DisturbanceKind::Insect => &["bda", "insect"],
            DisturbanceKind::Drought => &["drought"],
            DisturbanceKind::Defoliation => &["defol"],
            DisturbanceKind::Other => &["other"],
            DisturbanceKind::LandUse => &["land use", "land-use"],
        }
    }

    /// Resolves a free-text label into a kind.
    ///
    /// Later entries in [`DisturbanceKind::ALL`] win when a label matches
    /// more than one keyword; an unrecognised label maps to `None`.
    pub fn resolve(label: &str) -> DisturbanceKind {
        let lowered = label.to_ascii_lowercase();
        for kind in Self::ALL.iter().rev() {
            if kind.keywords().iter().any(|k| lowered.contains(k)) {
                return *kind;
            }
        }
        DisturbanceKind::None
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A single disturbance event as seen by the carbon engine.
///
/// `label` keeps the host's sub-type text (minus any `"prefix:"`) for
/// named-matrix lookup; `fire_severity` is meaningful only when the kind is
/// `Fire` and must be 1..=5 for the event to have any effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisturbanceEvent {
    pub kind: DisturbanceKind,
    pub label: String,
    pub fire_severity: u8,
}

impl DisturbanceEvent {
    /// Builds an event from a host label such as `"disturbance:harvest"`.
    pub fn from_label(label: &str) -> Self {
        let trimmed = match label.find(':') {
            Some(idx) if idx + 1 < label.len() => &label[idx + 1..],
            _ => label,
        };
        DisturbanceEvent {
            kind: DisturbanceKind::resolve(trimmed),
            label: trimmed.to_string(),
            fire_severity: 0,
        }
    }

    /// A fire event at the given severity (1..=5; 0 means "no effect").
    pub fn fire(severity: u8) -> Self {
        DisturbanceEvent {
            kind: DisturbanceKind::Fire,
            label: "fire".to_string(),
            fire_severity: severity,
        }
    }
}

/// Result of applying a disturbance transfer.
///
/// An event whose label has no transfer matrix configured is a deliberate
/// no-op, not an error; callers that care can branch on `NoMatrix`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    Applied,
    NoMatrix,
}

/// Fraction of a surviving cohort's foliage lost to crown scorch.
///
/// Only epicormic resprouters scorch rather than die outright; the scorched
/// fraction scales with how far the fire severity exceeds the species' fire
/// tolerance and with the cohort's remaining lifespan.
pub fn crown_scorch(traits: &SpeciesTraits, age: u16, severity: u8) -> f64 {
    if !traits.epicormic {
        return 0.0;
    }
    let difference = severity as i32 - traits.fire_tolerance as i32;
    let age_fraction = 1.0 - age as f64 / traits.longevity as f64;
    if difference < 0 {
        0.5 * age_fraction
    } else if difference == 0 {
        0.75 * age_fraction
    } else {
        age_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_to_kinds() {
        assert_eq!(DisturbanceKind::resolve("fire"), DisturbanceKind::Fire);
        assert_eq!(
            DisturbanceKind::resolve("Harvest"),
            DisturbanceKind::Harvest
        );
        assert_eq!(DisturbanceKind::resolve("bda"), DisturbanceKind::Insect);
        assert_eq!(
            DisturbanceKind::resolve("defoliation"),
            DisturbanceKind::Defoliation
        );
        assert_eq!(
            DisturbanceKind::resolve("something else"),
            DisturbanceKind::None
        );
    }

    #[test]
    fn prefixed_labels_keep_the_subtype_text() {
        let event = DisturbanceEvent::from_label("disturbance:fire");
        assert_eq!(event.kind, DisturbanceKind::Fire);
        assert_eq!(event.label, "fire");

        let bare = DisturbanceEvent::from_label("wind");
        assert_eq!(bare.kind, DisturbanceKind::Wind);
        assert_eq!(bare.label, "wind");
    }

    #[test]
    fn trailing_colon_is_not_stripped_into_an_empty_label() {
        let event = DisturbanceEvent::from_label("fire:");
        assert_eq!(event.kind, DisturbanceKind::Fire);
        assert_eq!(event.label, "fire:");
    }

    fn epicormic_species() -> SpeciesTraits {
        SpeciesTraits {
            longevity: 100,
            fire_tolerance: 2,
            epicormic: true,
            ..SpeciesTraits::default()
        }
    }

    #[test]
    fn crown_scorch_scales_with_severity_and_age() {
        let traits = epicormic_species();
        // Age 50 of 100 -> age fraction 0.5.
        assert_eq!(crown_scorch(&traits, 50, 1), 0.25); // below tolerance
        assert_eq!(crown_scorch(&traits, 50, 2), 0.375); // at tolerance
        assert_eq!(crown_scorch(&traits, 50, 4), 0.5); // above tolerance
    }

    #[test]
    fn non_epicormic_species_do_not_scorch() {
        let traits = SpeciesTraits {
            epicormic: false,
            ..epicormic_species()
        };
        assert_eq!(crown_scorch(&traits, 50, 5), 0.0);
    }

    #[test]
    fn scorch_fraction_shrinks_to_zero_at_longevity() {
        let traits = epicormic_species();
        assert_eq!(crown_scorch(&traits, 100, 5), 0.0);
    }
}

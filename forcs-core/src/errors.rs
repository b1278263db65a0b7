use thiserror::Error;

/// Error type for configuration and invariant failures.
///
/// Configuration variants are raised once while a parameter set is loaded
/// and validated; the run must not start with a partially valid set.
/// Invariant variants are raised mid-run when the arithmetic produces a
/// state that would silently corrupt the carbon accounts, and abort the
/// run at the site/year boundary.
#[derive(Error, Debug)]
pub enum ForcsError {
    #[error("{0}")]
    Error(String),
    #[error("{name} = {value} is not between {min:.1} and {max:.1}")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{table} transfer proportions for {pool} sum to {total}, which exceeds 1.0")]
    ProportionSum {
        table: String,
        pool: String,
        total: f64,
    },
    #[error("unknown {kind} name: {name}")]
    UnknownName { kind: String, name: String },
    #[error("no {variable} entries for ecoregion {ecoregion}, species {species}")]
    EmptySeries {
        variable: String,
        ecoregion: String,
        species: String,
    },
    #[error("mortality {mortality} exceeds biomass {biomass} for {species} cohort aged {age}")]
    MortalityExceedsBiomass {
        species: String,
        age: u16,
        mortality: f64,
        biomass: f64,
    },
    #[error("merchantable stem proportion {value} for {species} at age {age} is outside [0, 1]")]
    MerchProportion {
        species: String,
        age: u16,
        value: f64,
    },
    #[error("negative mortality partition: wood = {wood}, non-wood = {nonwood}")]
    NegativeMortality { wood: f64, nonwood: f64 },
    #[error("root allocation for ecoregion {ecoregion}, species {species} has more than {max} bins")]
    TooManyRootBins {
        ecoregion: String,
        species: String,
        max: usize,
    },
    #[error("initial snag records exceed the {max}-record capacity")]
    SnagCapacity { max: usize },
}

/// Convenience type for `Result<T, ForcsError>`.
pub type ForcsResult<T> = Result<T, ForcsError>;

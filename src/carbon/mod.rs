//! The carbon accounting engine.
//!
//! Four pieces cooperate over a shared [`soil::SoilState`]:
//!
//! * [`growth`] computes each cohort's annual biomass change and reports
//!   every gram of mortality to the soil engine,
//! * [`roots`] derives root stocks and turnover from above-ground biomass,
//! * [`soil`] decays the dead organic matter network and closes the
//!   annual carbon budget,
//! * [`spinup`] replays stand history until the slow pools stabilise.

pub mod growth;
pub mod roots;
pub mod soil;
pub mod spinup;

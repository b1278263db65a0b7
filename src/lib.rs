//! Stand-level forest carbon accounting.
//!
//! `forcs` models one forest site as a set of even-aged species cohorts
//! over a network of ten dead organic matter (DOM) pools. Each simulated
//! year the [`stand`] orchestrator grows every cohort ([`carbon::growth`]),
//! feeds the resulting mortality, litterfall and root turnover into the
//! soil engine ([`carbon::soil`]) and closes the site's carbon budget,
//! reporting NPP, NEP and NBP alongside the live and dead carbon stocks.
//!
//! Before the first simulated year, [`stand::initialize_stand`] grows the
//! initial community from bare ground, spins the recorded litter history
//! through the decay cascade until the slow pools converge
//! ([`carbon::spinup`]) and materialises any configured initial snags.
//!
//! The crate is an engine, not a model harness: reproduction, disturbance
//! scheduling, random number generation and all I/O belong to the host.
//! Disturbances enter through [`stand::Stand::on_cohort_mortality`] and
//! [`stand::Stand::apply_dom_disturbance`]; stochastic ANPP enters through
//! the [`parameters::dynamics::AnppSampler`] seam.
//!
//! Parameters are loaded from TOML into [`parameters::ForcsParameters`]
//! and validated as a whole before a run starts. Core types (pool
//! enumerations, year series, species/ecoregion tables, errors) live in
//! the `forcs-core` crate.

pub mod carbon;
pub mod disturbance;
pub mod parameters;
pub mod stand;

//! Scenario driver for `cogsim_core`: agent placement, the stock scenario
//! scripts, dataset export and report printing.

pub mod config;
pub mod placement;
pub mod report;
pub mod scenarios;

pub use config::ScenarioFile;

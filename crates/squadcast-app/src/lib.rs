// Squadcast application library: configuration, data loading and reporting
// around the squad optimiser.

pub mod config;
pub mod data;
pub mod report;

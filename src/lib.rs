pub mod clean;
pub mod config;
pub mod dataset;
pub mod output;
pub mod report;
pub mod stats;

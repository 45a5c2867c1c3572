//! UAV CLI - Command line tools for mission deconfliction.
//!
//! This crate wires the core detector and route engine to files:
//! - loader: reads primary mission and simulated traffic JSON
//! - config: tolerances from the environment
//! - pipeline: detect once, reroute once per conflict batch

pub mod config;
pub mod loader;
pub mod pipeline;

pub use loader::load_flight_data;
pub use pipeline::{run_pipeline, RunReport};

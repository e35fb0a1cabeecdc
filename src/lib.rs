//! fleet-planner core
//!
//! Compiles route-optimization requests from tabular order/vehicle data via
//! a placeholder-driven payload template, submits them to an external
//! solver, and maps the response into per-vehicle itineraries enriched with
//! inter-stop direction segments.

pub mod model;
pub mod error;
pub mod template;
pub mod assemble;
pub mod matcher;
pub mod solver;
pub mod directions;
pub mod mapper;
pub mod pipeline;

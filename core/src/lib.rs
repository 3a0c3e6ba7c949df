//! Workload engine: turns annual volumes into per-task daily workload,
//! hours and full-time equivalents for postal centres.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod fte;
pub mod model;
pub mod normalize;
pub mod params;
pub mod reference;
pub mod resolver;
pub mod rules;
pub mod store;
pub mod trace;
pub mod types;
pub mod variant;
pub mod volume;

pub use engine::WorkloadEngine;
pub use error::{WorkloadError, WorkloadResult};

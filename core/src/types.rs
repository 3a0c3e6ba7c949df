//! Shared primitive types used across the engine.

/// Row identifiers as stored in the reference tables.
pub type CentreId = i64;
pub type PositionId = i64;
pub type TaskId = i64;
pub type DirectionId = i64;
pub type CategoryId = i64;
pub type FluxId = i64;
pub type SensId = i64;
pub type SegmentId = i64;

/// Working days per year when nothing else is supplied.
pub const DEFAULT_WORKING_DAYS: f64 = 264.0;

/// Working days per month, used by seasonality and monthly archetypes.
pub const MONTHLY_WORKING_DAYS: f64 = 22.0;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

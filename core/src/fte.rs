//! Hours → full-time equivalents.
//!
//! RULE: FTE depends only on total hours and the capacity parameters.
//! Rounding is half-up, except that anything at or below 0.1 FTE rounds
//! to zero.

use crate::params::EngineParams;
use serde::{Deserialize, Serialize};

/// At or below this many FTE the rounded figure is zero.
pub const FTE_ROUNDING_FLOOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FteFigures {
    pub heures_nettes: f64,
    pub fte_calcule: f64,
    pub fte_arrondi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FteCalculator {
    heures_par_jour: f64,
    idle_minutes: f64,
}

impl FteCalculator {
    pub fn new(heures_par_jour: f64, idle_minutes: f64) -> Self {
        Self {
            heures_par_jour,
            idle_minutes,
        }
    }

    pub fn from_params(params: &EngineParams) -> Self {
        Self::new(params.heures_par_jour(), params.idle_minutes())
    }

    /// Productive hours per agent per day.
    pub fn heures_nettes(&self) -> f64 {
        (self.heures_par_jour - self.idle_minutes / 60.0).max(0.0)
    }

    /// False when an agent has no productive hour, so every FTE is 0.
    pub fn has_capacity(&self) -> bool {
        self.heures_nettes() > 0.0
    }

    pub fn compute(&self, total_hours: f64) -> FteFigures {
        let heures_nettes = self.heures_nettes();
        let fte_calcule = if heures_nettes > 0.0 {
            total_hours / heures_nettes
        } else {
            0.0
        };
        FteFigures {
            heures_nettes,
            fte_calcule,
            fte_arrondi: round_fte(fte_calcule),
        }
    }
}

pub fn round_fte(fte: f64) -> f64 {
    if !fte.is_finite() || fte <= FTE_ROUNDING_FLOOR {
        0.0
    } else {
        (fte + 0.5).floor()
    }
}

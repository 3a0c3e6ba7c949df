//! Aggregation of task outcomes into position, centre, direction and
//! national results.
//!
//! RULES:
//!   - A centre's total hours are the sum of its positions' hours.
//!   - Directions and the nation sum their centres; labels pass through.
//!   - Non-computed tasks still appear in `details_taches` with zero hours.
//!   - Target headcount: a surplus is absorbed by APS first, then MOD.
//!     A deficit grows MOD only. MOI is held at its current value.

use crate::{
    fte::{FteCalculator, FteFigures},
    model::{Centre, Direction, Position, RoleType, TaskRow},
    rules::TaskOutcome,
    trace::{TaskStatus, TraceStep},
    types::{CategoryId, CentreId, DirectionId, PositionId, TaskId},
    variant::Archetype,
};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Staff split by labour category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Headcount {
    #[serde(rename = "MOD")]
    pub direct: f64,
    #[serde(rename = "MOI")]
    pub indirect: f64,
    #[serde(rename = "APS")]
    pub aps: f64,
}

impl Headcount {
    pub fn new(direct: f64, indirect: f64, aps: f64) -> Self {
        Self {
            direct,
            indirect,
            aps,
        }
    }

    pub fn total(&self) -> f64 {
        self.direct + self.indirect + self.aps
    }

    /// Current staffing of `positions` by role type. A positive
    /// `aps_declared` replaces the APS positions' sum.
    pub fn actual(positions: &[&Position], aps_declared: Option<f64>) -> Self {
        let mut out = Self::default();
        for p in positions {
            match p.role_type {
                RoleType::Mod => out.direct += p.current_staffing,
                RoleType::Moi => out.indirect += p.current_staffing,
                RoleType::Aps => out.aps += p.current_staffing,
            }
        }
        if let Some(declared) = aps_declared.filter(|d| *d > 0.0) {
            out.aps = declared;
        }
        out
    }

    /// Headcount after moving `self` to a total of `target_total`.
    pub fn target(&self, target_total: f64) -> Self {
        let current = self.total();
        if target_total >= current {
            return Self {
                direct: self.direct + (target_total - current),
                ..*self
            };
        }
        let mut surplus = current - target_total;
        let aps_cut = surplus.min(self.aps);
        surplus -= aps_cut;
        let mod_cut = surplus.min(self.direct);
        Self {
            direct: self.direct - mod_cut,
            indirect: self.indirect,
            aps: self.aps - aps_cut,
        }
    }
}

impl Add for Headcount {
    type Output = Headcount;

    fn add(self, rhs: Headcount) -> Headcount {
        Headcount {
            direct: self.direct + rhs.direct,
            indirect: self.indirect + rhs.indirect,
            aps: self.aps + rhs.aps,
        }
    }
}

impl AddAssign for Headcount {
    fn add_assign(&mut self, rhs: Headcount) {
        *self = *self + rhs;
    }
}

/// One line of `details_taches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: TaskId,
    pub name: String,
    pub phase: String,
    pub unit: String,
    pub produit: String,
    pub base_calcul: f64,
    pub avg_sec: f64,
    /// Annual units after coefficients and conversion, before base calcul.
    pub volume_annuel: f64,
    /// Daily units.
    pub nombre_unite: f64,
    pub heures: f64,
    pub formule: String,
    pub position_id: PositionId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TraceStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TaskDetail {
    pub fn new(row: TaskRow<'_>, outcome: &TaskOutcome) -> Self {
        let task = row.task;
        Self {
            id: task.id,
            name: task.name.clone(),
            phase: task.phase.clone(),
            unit: task.unit.clone(),
            produit: task.product.clone(),
            base_calcul: task.base_calcul(),
            avg_sec: outcome.seconds_per_unit,
            volume_annuel: outcome.annual_volume,
            nombre_unite: outcome.daily_volume,
            heures: outcome.hours,
            formule: outcome.trace.formula(),
            position_id: row.position.id,
            status: outcome.status,
            source: outcome.source.clone(),
            steps: outcome.trace.steps.clone(),
            warnings: outcome.trace.warnings.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionResult {
    pub position_id: PositionId,
    pub poste_code: String,
    pub label: String,
    pub role_type: RoleType,
    pub current_staffing: f64,
    pub heures: f64,
    pub fte_calcule: f64,
    pub fte_arrondi: f64,
    pub variance: f64,
    pub tasks_computed: usize,
    pub tasks_skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentreResult {
    pub centre_id: CentreId,
    pub centre_label: String,
    pub direction_id: Option<DirectionId>,
    pub category_id: Option<CategoryId>,
    pub archetype: Archetype,
    pub total_hours: f64,
    pub heures_net_jour: f64,
    pub fte_calcule: f64,
    pub fte_arrondi: f64,
    pub actual: Headcount,
    pub target: Headcount,
    /// `fte_arrondi − actual.total()`.
    pub variance: f64,
    pub positions: Vec<PositionResult>,
    pub details_taches: Vec<TaskDetail>,
    pub warnings: Vec<String>,
}

impl CentreResult {
    pub fn position(&self, id: PositionId) -> Option<&PositionResult> {
        self.positions.iter().find(|p| p.position_id == id)
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskDetail> {
        self.details_taches.iter().find(|t| t.id == id)
    }

    pub fn summary(&self) -> CentreSummary {
        CentreSummary {
            centre_id: self.centre_id,
            label: self.centre_label.clone(),
            direction_id: self.direction_id,
            category_id: self.category_id,
            archetype: self.archetype,
            total_hours: self.total_hours,
            fte_calcule: self.fte_calcule,
            fte_arrondi: self.fte_arrondi,
            actual: self.actual,
            target: self.target,
            variance: self.variance,
            warnings: self.warnings.len(),
        }
    }
}

/// A centre inside a direction or national result, without task detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentreSummary {
    pub centre_id: CentreId,
    pub label: String,
    pub direction_id: Option<DirectionId>,
    pub category_id: Option<CategoryId>,
    pub archetype: Archetype,
    pub total_hours: f64,
    pub fte_calcule: f64,
    pub fte_arrondi: f64,
    pub actual: Headcount,
    pub target: Headcount,
    pub variance: f64,
    /// Number of warnings the centre run produced.
    pub warnings: usize,
}

/// Sums over a set of centres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_hours: f64,
    pub fte_calcule: f64,
    pub fte_arrondi: f64,
    pub actual: Headcount,
    pub target: Headcount,
    pub variance: f64,
}

impl Totals {
    pub fn of<'a>(centres: impl IntoIterator<Item = &'a CentreSummary>) -> Self {
        let mut t = Self::default();
        for c in centres {
            t.total_hours += c.total_hours;
            t.fte_calcule += c.fte_calcule;
            t.fte_arrondi += c.fte_arrondi;
            t.actual += c.actual;
            t.target += c.target;
            t.variance += c.variance;
        }
        t
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionResult {
    pub direction_id: DirectionId,
    pub label: String,
    pub centres: Vec<CentreSummary>,
    #[serde(flatten)]
    pub totals: Totals,
}

impl DirectionResult {
    pub fn new(direction: &Direction, centres: Vec<CentreSummary>) -> Self {
        Self {
            direction_id: direction.id,
            label: direction.label.clone(),
            totals: Totals::of(&centres),
            centres,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalResult {
    pub directions: Vec<DirectionResult>,
    /// Centres attached to no known direction.
    pub unassigned: Vec<CentreSummary>,
    #[serde(flatten)]
    pub totals: Totals,
}

impl NationalResult {
    pub fn new(directions: Vec<DirectionResult>, unassigned: Vec<CentreSummary>) -> Self {
        let totals = Totals::of(
            directions
                .iter()
                .flat_map(|d| d.centres.iter())
                .chain(unassigned.iter()),
        );
        Self {
            directions,
            unassigned,
            totals,
        }
    }

    pub fn centre_count(&self) -> usize {
        self.directions.iter().map(|d| d.centres.len()).sum::<usize>() + self.unassigned.len()
    }
}

// ── Centre aggregation ──────────────────────────────────────────

/// Everything needed to fold one centre's outcomes.
pub struct CentreAggregation<'a> {
    pub centre: &'a Centre,
    pub archetype: Archetype,
    pub positions: Vec<&'a Position>,
    pub fte: FteCalculator,
    /// Whether the centre's declared APS count applies (full-centre runs).
    pub use_declared_aps: bool,
}

impl CentreAggregation<'_> {
    pub fn finish(self, outcomes: &[(TaskRow<'_>, TaskOutcome)]) -> CentreResult {
        let mut warnings = Vec::new();
        if !self.fte.has_capacity() {
            let message = format!(
                "ZeroCapacity: centre {} has no productive hour per day; FTE reported as 0",
                self.centre.id
            );
            log::warn!("{message}");
            warnings.push(message);
        }

        let positions: Vec<PositionResult> = self
            .positions
            .iter()
            .map(|p| position_result(p, outcomes, &self.fte))
            .collect();

        let details_taches: Vec<TaskDetail> = outcomes
            .iter()
            .map(|(row, outcome)| {
                warnings.extend(outcome.trace.warnings.iter().cloned());
                TaskDetail::new(*row, outcome)
            })
            .collect();

        let total_hours: f64 = positions.iter().map(|p| p.heures).sum();
        let FteFigures {
            heures_nettes,
            fte_calcule,
            fte_arrondi,
        } = self.fte.compute(total_hours);

        let declared = self.use_declared_aps.then_some(self.centre.aps_declared);
        let actual = Headcount::actual(&self.positions, declared);
        let target = actual.target(fte_arrondi);

        CentreResult {
            centre_id: self.centre.id,
            centre_label: self.centre.label.clone(),
            direction_id: self.centre.direction_id,
            category_id: self.centre.category_id,
            archetype: self.archetype,
            total_hours,
            heures_net_jour: heures_nettes,
            fte_calcule,
            fte_arrondi,
            actual,
            target,
            variance: fte_arrondi - actual.total(),
            positions,
            details_taches,
            warnings,
        }
    }
}

fn position_result(
    position: &Position,
    outcomes: &[(TaskRow<'_>, TaskOutcome)],
    fte: &FteCalculator,
) -> PositionResult {
    let mut heures = 0.0;
    let mut computed = 0;
    let mut skipped = 0;
    for (_, outcome) in outcomes.iter().filter(|(row, _)| row.position.id == position.id) {
        if outcome.status == TaskStatus::Computed {
            heures += outcome.hours;
            computed += 1;
        } else {
            skipped += 1;
        }
    }
    let figures = fte.compute(heures);
    PositionResult {
        position_id: position.id,
        poste_code: position.poste_code.clone(),
        label: position.label.clone(),
        role_type: position.role_type,
        current_staffing: position.current_staffing,
        heures,
        fte_calcule: figures.fte_calcule,
        fte_arrondi: figures.fte_arrondi,
        variance: figures.fte_arrondi - position.current_staffing,
        tasks_computed: computed,
        tasks_skipped: skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surplus_is_absorbed_by_aps_then_mod() {
        let actual = Headcount::new(6.0, 0.0, 3.0);
        let target = actual.target(5.0);
        assert_eq!(target, Headcount::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn small_surplus_only_touches_aps() {
        let actual = Headcount::new(6.0, 2.0, 3.0);
        let target = actual.target(9.0);
        assert_eq!(target, Headcount::new(6.0, 2.0, 1.0));
    }

    #[test]
    fn deficit_grows_mod_only() {
        let actual = Headcount::new(4.0, 1.0, 2.0);
        let target = actual.target(10.0);
        assert_eq!(target, Headcount::new(7.0, 1.0, 2.0));
    }

    #[test]
    fn surplus_never_drives_a_category_negative() {
        let actual = Headcount::new(2.0, 3.0, 1.0);
        let target = actual.target(0.0);
        assert_eq!(target, Headcount::new(0.0, 3.0, 0.0));
    }
}

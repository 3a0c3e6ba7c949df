//! Operational entities: directions, centres, positions and tasks.
//!
//! Storage is arena-style. Tasks carry their position id, positions carry
//! their centre id; nothing holds a back-reference. `Organisation::task_rows`
//! pre-joins the three into a flat list before a computation runs.

use crate::{
    normalize::{de_opt_number, normalize_label},
    types::{CategoryId, CentreId, DirectionId, FluxId, PositionId, SegmentId, SensId, TaskId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Direction {
    pub id: DirectionId,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Centre {
    pub id: CentreId,
    pub label: String,
    pub direction_id: Option<DirectionId>,
    pub category_id: Option<CategoryId>,
    /// Centre-level auxiliary staff count.
    #[serde(default)]
    pub aps_declared: f64,
}

/// Labour category of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleType {
    Mod,
    Moi,
    Aps,
}

impl RoleType {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "MOD" => Some(Self::Mod),
            "MOI" => Some(Self::Moi),
            "APS" => Some(Self::Aps),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub id: PositionId,
    pub centre_id: CentreId,
    pub poste_code: String,
    /// Role label, e.g. "Agent opération" or "Chef de centre".
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub current_staffing: f64,
    pub role_type: RoleType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub position_id: PositionId,
    pub name: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub flux_id: Option<FluxId>,
    #[serde(default)]
    pub sens_id: Option<SensId>,
    #[serde(default)]
    pub segment_id: Option<SegmentId>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub mean_minutes: Option<f64>,
    /// Authoritative over `mean_minutes` when positive.
    #[serde(default, deserialize_with = "de_opt_number")]
    pub mean_seconds: Option<f64>,
    /// Percent multiplier, 100 ⇒ ×1.0. Absent means 100.
    #[serde(default, deserialize_with = "de_opt_number")]
    pub base_calcul_pct: Option<f64>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ordering: i64,
}

impl Task {
    pub fn base_calcul(&self) -> f64 {
        self.base_calcul_pct.unwrap_or(100.0)
    }
}

/// A task joined with its position and centre.
#[derive(Debug, Clone, Copy)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    pub position: &'a Position,
    pub centre: &'a Centre,
}

#[derive(Debug, Clone, Default)]
pub struct Organisation {
    directions: BTreeMap<DirectionId, Direction>,
    centres: BTreeMap<CentreId, Centre>,
    positions: BTreeMap<PositionId, Position>,
    tasks: Vec<Task>,
}

impl Organisation {
    pub fn new(
        directions: Vec<Direction>,
        centres: Vec<Centre>,
        positions: Vec<Position>,
        mut tasks: Vec<Task>,
    ) -> Self {
        tasks.sort_by(|a, b| {
            a.position_id
                .cmp(&b.position_id)
                .then(a.ordering.cmp(&b.ordering))
                .then(a.id.cmp(&b.id))
        });
        Self {
            directions: directions.into_iter().map(|d| (d.id, d)).collect(),
            centres: centres.into_iter().map(|c| (c.id, c)).collect(),
            positions: positions.into_iter().map(|p| (p.id, p)).collect(),
            tasks,
        }
    }

    pub fn direction(&self, id: DirectionId) -> Option<&Direction> {
        self.directions.get(&id)
    }

    pub fn directions(&self) -> impl Iterator<Item = &Direction> {
        self.directions.values()
    }

    pub fn centre(&self, id: CentreId) -> Option<&Centre> {
        self.centres.get(&id)
    }

    pub fn centres(&self) -> impl Iterator<Item = &Centre> {
        self.centres.values()
    }

    pub fn centres_in_direction(&self, id: DirectionId) -> impl Iterator<Item = &Centre> {
        self.centres
            .values()
            .filter(move |c| c.direction_id == Some(id))
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// Positions of a centre in id order.
    pub fn positions_of(&self, centre_id: CentreId) -> Vec<&Position> {
        self.positions
            .values()
            .filter(|p| p.centre_id == centre_id)
            .collect()
    }

    /// Flat pre-joined task list for one centre, ordered by position then
    /// task ordering. Tasks whose position is unknown are dropped.
    pub fn task_rows(&self, centre_id: CentreId) -> Vec<TaskRow<'_>> {
        let Some(centre) = self.centres.get(&centre_id) else {
            return Vec::new();
        };
        self.tasks
            .iter()
            .filter_map(|task| {
                let position = self.positions.get(&task.position_id)?;
                (position.centre_id == centre_id).then_some(TaskRow {
                    task,
                    position,
                    centre,
                })
            })
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

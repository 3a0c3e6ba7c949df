//! Shared fixtures for the integration tests.
//!
//! A small reference catalogue (five flux, three sens, seven segments and
//! the mapping rules the tests rely on) and builders for organisations.
#![allow(dead_code)]

use workload_core::{
    config::EngineConfig,
    engine::WorkloadEngine,
    model::{Centre, Direction, Organisation, Position, RoleType, Task},
    reference::{Flux, MappingRule, ReferenceCatalogue, Segment, Sens, UnitConversion},
    types::{CentreId, DirectionId, PositionId, TaskId},
    volume::VolumeInput,
};

pub const AMANA: i64 = 1;
pub const CO: i64 = 2;
pub const CR: i64 = 3;
pub const EBARKIA: i64 = 4;
pub const LRH: i64 = 5;

pub const ARRIVEE: i64 = 1;
pub const DEPART: i64 = 2;
pub const GUICHET: i64 = 3;

pub const GLOBAL: i64 = 1;
pub const PART: i64 = 2;
pub const PRO: i64 = 3;
pub const DIST: i64 = 4;
pub const AXES: i64 = 5;
pub const DEPOT: i64 = 6;
pub const RECUP: i64 = 7;

/// Generic test centre, direction 1.
pub const CENTRE: CentreId = 100;
pub const DIRECTION: DirectionId = 1;

pub const EPS: f64 = 1e-9;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual} (tolerance {tolerance})"
    );
}

fn code<T>(make: impl Fn(i64, String, String) -> T, rows: &[(i64, &str)]) -> Vec<T> {
    rows.iter()
        .map(|(id, code)| make(*id, code.to_string(), code.to_lowercase()))
        .collect()
}

pub fn rule(
    id: i64,
    flux: Option<i64>,
    sens: Option<i64>,
    segment: Option<i64>,
    ui_path: &str,
    priority: i64,
) -> MappingRule {
    MappingRule {
        id,
        flux_id: flux,
        sens_id: sens,
        segment_id: segment,
        keyword: None,
        ui_path: ui_path.to_string(),
        priority,
        description: String::new(),
    }
}

pub fn flux_table() -> Vec<Flux> {
    code(
        |id, code, label| Flux { id, code, label },
        &[(AMANA, "AMANA"), (CO, "CO"), (CR, "CR"), (EBARKIA, "EBARKIA"), (LRH, "LRH")],
    )
}

pub fn sens_table() -> Vec<Sens> {
    code(
        |id, code, label| Sens { id, code, label },
        &[(ARRIVEE, "ARRIVEE"), (DEPART, "DEPART"), (GUICHET, "GUICHET")],
    )
}

pub fn segment_table() -> Vec<Segment> {
    code(
        |id, code, label| Segment { id, code, label },
        &[
            (GLOBAL, "GLOBAL"),
            (PART, "PART"),
            (PRO, "PRO"),
            (DIST, "DIST"),
            (AXES, "AXES"),
            (DEPOT, "DEPOT"),
            (RECUP, "RECUP"),
        ],
    )
}

pub fn mapping_rules() -> Vec<MappingRule> {
    let mut recup = rule(8, None, Some(GUICHET), None, "guichet.recup", 20);
    recup.keyword = Some("récupération".to_string());
    vec![
        rule(1, Some(AMANA), Some(ARRIVEE), Some(GLOBAL), "flux_arrivee.amana.global", 10),
        rule(2, Some(AMANA), Some(ARRIVEE), None, "flux_arrivee.amana", 5),
        rule(3, Some(AMANA), Some(DEPART), None, "flux_depart.amana", 5),
        rule(4, Some(CO), Some(ARRIVEE), None, "flux_arrivee.co", 5),
        rule(5, Some(CO), Some(DEPART), None, "flux_depart.co", 5),
        rule(6, Some(CR), Some(ARRIVEE), None, "flux_arrivee.cr", 5),
        rule(7, None, Some(GUICHET), None, "guichet.depot", 1),
        recup,
        rule(9, Some(CO), Some(ARRIVEE), Some(PART), "flux_arrivee.co.part", 10),
    ]
}

pub fn unit_conversions() -> Vec<UnitConversion> {
    vec![UnitConversion {
        unit_code: "Lot de 10".to_string(),
        factor: 0.1,
        description: "ten items per lot".to_string(),
    }]
}

pub fn catalogue() -> ReferenceCatalogue {
    ReferenceCatalogue::new(
        flux_table(),
        sens_table(),
        segment_table(),
        mapping_rules(),
        unit_conversions(),
    )
    .expect("test catalogue")
}

pub fn directions() -> Vec<Direction> {
    vec![
        Direction { id: 1, label: "DR Casablanca".to_string() },
        Direction { id: 2, label: "DR Rabat".to_string() },
    ]
}

pub fn centre(id: CentreId, label: &str, direction: Option<DirectionId>) -> Centre {
    Centre {
        id,
        label: label.to_string(),
        direction_id: direction,
        category_id: Some(1),
        aps_declared: 0.0,
    }
}

pub fn position(
    id: PositionId,
    centre_id: CentreId,
    label: &str,
    role_type: RoleType,
    current_staffing: f64,
) -> Position {
    Position {
        id,
        centre_id,
        poste_code: format!("P{id}"),
        label: label.to_string(),
        current_staffing,
        role_type,
    }
}

/// An AMANA arrivée task of 30 s per colis, base 100.
pub fn task(id: TaskId, position_id: PositionId, name: &str) -> Task {
    Task {
        id,
        position_id,
        name: name.to_string(),
        phase: String::new(),
        unit: "Colis".to_string(),
        family: String::new(),
        product: "Amana".to_string(),
        flux_id: Some(AMANA),
        sens_id: Some(ARRIVEE),
        segment_id: Some(GLOBAL),
        mean_minutes: None,
        mean_seconds: Some(30.0),
        base_calcul_pct: Some(100.0),
        state: "Actif".to_string(),
        ordering: id,
    }
}

pub fn organisation(centres: Vec<Centre>, positions: Vec<Position>, tasks: Vec<Task>) -> Organisation {
    Organisation::new(directions(), centres, positions, tasks)
}

pub fn engine(centres: Vec<Centre>, positions: Vec<Position>, tasks: Vec<Task>) -> WorkloadEngine {
    init_logging();
    WorkloadEngine::new(
        catalogue(),
        organisation(centres, positions, tasks),
        EngineConfig::default(),
    )
    .expect("engine")
}

/// Generic centre 100 with one operational MOD position (id 10) holding
/// `tasks`.
pub fn single_position_engine(tasks: Vec<Task>) -> WorkloadEngine {
    engine(
        vec![centre(CENTRE, "Centre de test", Some(DIRECTION))],
        vec![position(10, CENTRE, "Agent opération", RoleType::Mod, 1.0)],
        tasks,
    )
}

/// `flux_arrivee AMANA GLOBAL = volume`.
pub fn amana_global(volume: f64) -> VolumeInput {
    VolumeInput::default().with_volume("AMANA", "ARRIVEE", "GLOBAL", volume)
}

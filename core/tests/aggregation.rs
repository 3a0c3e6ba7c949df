//! Position, centre, direction and national aggregation.

mod common;

use common::*;
use std::collections::BTreeMap;
use workload_core::{
    aggregate::Headcount,
    engine::WorkloadEngine,
    error::WorkloadError,
    model::{RoleType, Task},
    params::EngineParams,
    volume::VolumeInput,
};

/// A 40 h/day task (1000 colis × 144 s at 264000 a year).
fn heavy_task(id: i64, position_id: i64) -> Task {
    let mut t = task(id, position_id, "Tri colis amana");
    t.mean_seconds = Some(144.0);
    t
}

/// Direction 1: centres 100 and 200. Direction 2: centre 300.
/// Centre 400 has no direction, centre 500 an unknown one.
fn network() -> WorkloadEngine {
    engine(
        vec![
            centre(100, "Centre A", Some(1)),
            centre(200, "Centre B", Some(1)),
            centre(300, "Centre C", Some(2)),
            centre(400, "Centre D", None),
            centre(500, "Centre E", Some(7)),
        ],
        vec![
            position(10, 100, "Agent opération", RoleType::Mod, 2.0),
            position(11, 100, "Chef de quai", RoleType::Moi, 1.0),
            position(20, 200, "Trieur", RoleType::Mod, 3.0),
            position(30, 300, "Agent opération", RoleType::Mod, 1.0),
            position(40, 400, "Agent opération", RoleType::Mod, 1.0),
            position(50, 500, "Agent opération", RoleType::Mod, 1.0),
        ],
        vec![
            heavy_task(1, 10),
            task(2, 11, "Contrôle"),
            heavy_task(3, 20),
            heavy_task(4, 30),
            heavy_task(5, 40),
            heavy_task(6, 50),
        ],
    )
}

fn volumes_for(ids: &[i64]) -> BTreeMap<i64, VolumeInput> {
    ids.iter().map(|id| (*id, amana_global(264_000.0))).collect()
}

// ── Position and centre ─────────────────────────────────────────────

#[test]
fn position_run_keeps_only_that_position() {
    let engine = network();
    let result = engine
        .compute_position(100, 10, &amana_global(264_000.0), &EngineParams::default())
        .unwrap();
    assert_eq!(result.positions.len(), 1);
    assert_eq!(result.details_taches.len(), 1);
    assert_eq!(result.details_taches[0].id, 1);
    assert_close(result.total_hours, 40.0, 1e-9);
    assert_eq!(result.actual, Headcount::new(2.0, 0.0, 0.0));
}

#[test]
fn centre_figures_per_position() {
    let engine = network();
    let result = engine
        .compute_centre(100, &amana_global(264_000.0), &EngineParams::default())
        .unwrap();
    let agent = result.position(10).unwrap();
    let chef = result.position(11).unwrap();
    assert_close(agent.heures, 40.0, 1e-9);
    assert_eq!(agent.fte_arrondi, 5.0);
    assert_eq!(agent.variance, 3.0);
    assert_eq!(agent.tasks_computed, 1);
    // 1000 colis × 30 s = 8.33 h.
    assert_close(chef.heures, 1000.0 * 30.0 / 3600.0, 1e-9);
    assert_close(result.total_hours, agent.heures + chef.heures, 1e-12);
}

/// Target 6 FTE against MOD 2 + MOI 1: the deficit goes to MOD.
#[test]
fn deficit_grows_direct_labour() {
    let engine = network();
    let result = engine
        .compute_centre(100, &amana_global(264_000.0), &EngineParams::default())
        .unwrap();
    // 48.33 h ÷ 8 = 6.04 → 6.
    assert_eq!(result.fte_arrondi, 6.0);
    assert_eq!(result.actual, Headcount::new(2.0, 1.0, 0.0));
    assert_eq!(result.target, Headcount::new(5.0, 1.0, 0.0));
    assert_eq!(result.variance, 3.0);
}

#[test]
fn declared_aps_replaces_position_sum_for_centre_runs() {
    let mut declared = centre(CENTRE, "Centre de test", Some(DIRECTION));
    declared.aps_declared = 4.0;
    let engine = engine(
        vec![declared],
        vec![
            position(10, CENTRE, "Agent opération", RoleType::Mod, 1.0),
            position(11, CENTRE, "Agent de sécurité", RoleType::Aps, 1.0),
        ],
        vec![task(1, 10, "Tri colis amana")],
    );
    let centre_run = engine
        .compute_centre(CENTRE, &amana_global(10_000.0), &EngineParams::default())
        .unwrap();
    assert_eq!(centre_run.actual.aps, 4.0);

    let position_run = engine
        .compute_position(CENTRE, 11, &amana_global(10_000.0), &EngineParams::default())
        .unwrap();
    assert_eq!(position_run.actual.aps, 1.0);
}

#[test]
fn empty_volumes_give_zero_hours_not_errors() {
    let engine = network();
    let result = engine
        .compute_centre(100, &VolumeInput::default(), &EngineParams::default())
        .unwrap();
    assert_eq!(result.total_hours, 0.0);
    assert_eq!(result.fte_arrondi, 0.0);
    assert!(result.warnings.iter().any(|w| w.contains("holds no volume")));
}

// ── Lookup errors ───────────────────────────────────────────────────

#[test]
fn unknown_ids_are_errors() {
    let engine = network();
    let v = VolumeInput::default();
    let p = EngineParams::default();

    assert!(matches!(
        engine.compute_centre(999, &v, &p),
        Err(WorkloadError::CentreNotFound { centre_id: 999 })
    ));
    assert!(matches!(
        engine.compute_position(100, 999, &v, &p),
        Err(WorkloadError::PositionNotFound { position_id: 999 })
    ));
    // Position 20 exists but belongs to centre 200.
    assert!(matches!(
        engine.compute_position(100, 20, &v, &p),
        Err(WorkloadError::PositionNotFound { position_id: 20 })
    ));
    assert!(matches!(
        engine.compute_direction(9, &BTreeMap::new(), &p),
        Err(WorkloadError::DirectionNotFound { direction_id: 9 })
    ));
}

// ── Direction and national ──────────────────────────────────────────

#[test]
fn direction_sums_its_centres() {
    let engine = network();
    // Centre 200 has no volumes: it still appears, with zero hours.
    let result = engine
        .compute_direction(1, &volumes_for(&[100]), &EngineParams::default())
        .unwrap();
    assert_eq!(result.label, "DR Casablanca");
    let ids: Vec<i64> = result.centres.iter().map(|c| c.centre_id).collect();
    assert_eq!(ids, vec![100, 200]);
    assert_eq!(result.centres[1].total_hours, 0.0);
    assert_close(result.totals.total_hours, result.centres[0].total_hours, 1e-12);
    assert_eq!(result.totals.actual, Headcount::new(5.0, 1.0, 0.0));
}

#[test]
fn national_includes_unassigned_centres() {
    let engine = network();
    let result = engine
        .compute_national(&volumes_for(&[100, 200, 300, 400, 500, 999]), &EngineParams::default())
        .unwrap();
    assert_eq!(result.directions.len(), 2);
    assert_eq!(result.centre_count(), 5);
    let unassigned: Vec<i64> = result.unassigned.iter().map(|c| c.centre_id).collect();
    assert_eq!(unassigned, vec![400, 500]);

    let by_direction: f64 = result.directions.iter().map(|d| d.totals.total_hours).sum();
    let loose: f64 = result.unassigned.iter().map(|c| c.total_hours).sum();
    assert_close(result.totals.total_hours, by_direction + loose, 1e-9);
    assert_eq!(result.totals.fte_arrondi, 6.0 + 5.0 + 5.0 + 5.0 + 5.0);
}

/// Totals are flattened into the direction object on the wire.
#[test]
fn direction_json_shape() {
    let engine = network();
    let result = engine
        .compute_direction(2, &volumes_for(&[300]), &EngineParams::default())
        .unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["direction_id"], 2);
    assert_eq!(value["fte_arrondi"], 5.0);
    assert_eq!(value["actual"]["MOD"], 1.0);
    assert_eq!(value["centres"][0]["archetype"], "generic");
}

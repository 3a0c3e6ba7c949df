//! Reference scenarios with literal values.
//!
//! Each test pins one number a planner can check by hand. If one of these
//! moves, the engine's arithmetic changed.

mod common;

use common::*;
use workload_core::{
    model::RoleType,
    params::EngineParams,
    rules::step,
    volume::VolumeInput,
};

/// Minimal AMANA: 10000/an over 264 days at 30 s per colis.
#[test]
fn minimal_amana_centre() {
    let engine = single_position_engine(vec![task(1, 10, "Tri colis amana")]);
    let params = EngineParams {
        heures_par_jour: Some(8.0),
        ..EngineParams::default()
    };
    let result = engine
        .compute_centre(CENTRE, &amana_global(10_000.0), &params)
        .unwrap();

    let detail = result.task(1).unwrap();
    assert_close(detail.nombre_unite, 10_000.0 / 264.0, EPS);
    assert_close(detail.nombre_unite, 37.878_787, 1e-6);
    assert_close(detail.heures, 0.315_656_6, 1e-6);
    assert_close(result.total_hours, 0.315_656_6, 1e-6);
    assert_close(result.fte_calcule, 0.039_457, 1e-6);
    assert_eq!(result.fte_arrondi, 0.0);
    assert_eq!(detail.source.as_deref(), Some("flux_arrivee.amana.global"));
}

/// Segments part/pro/dist sum to 10000; 20 % goes to the axes.
#[test]
fn amana_axes_split() {
    let mut local = task(1, 10, "Tri distribution locale");
    local.family = "Distribution Locale".to_string();
    local.segment_id = None;
    let mut axes = task(2, 10, "Départ camion");
    axes.family = "Départ Axes".to_string();
    axes.segment_id = None;

    let engine = single_position_engine(vec![local, axes]);
    let mut volumes = VolumeInput::default()
        .with_volume("AMANA", "ARRIVEE", "PART", 5_000.0)
        .with_volume("AMANA", "ARRIVEE", "PRO", 3_000.0)
        .with_volume("AMANA", "ARRIVEE", "DIST", 2_000.0);
    volumes.scalars.pct_axes_arrivee = Some(0.2);

    let result = engine
        .compute_centre(CENTRE, &volumes, &EngineParams::default())
        .unwrap();
    assert_close(result.task(1).unwrap().volume_annuel, 8_000.0, 1e-6);
    assert_close(result.task(2).unwrap().volume_annuel, 2_000.0, 1e-6);
}

/// 10000 colis at 5 colis per sac: 2000 sacs a year, 7.575 a day.
#[test]
fn sac_conversion() {
    let mut sacs = task(1, 10, "Ouverture sacs");
    sacs.unit = "Sac".to_string();
    let engine = single_position_engine(vec![sacs]);
    let mut volumes = amana_global(10_000.0);
    volumes.scalars.colis_amana_par_sac = Some(5.0);

    let result = engine
        .compute_centre(CENTRE, &volumes, &EngineParams::default())
        .unwrap();
    let detail = result.task(1).unwrap();
    assert_close(detail.volume_annuel, 2_000.0, 1e-9);
    assert_close(detail.nombre_unite, 7.575_757, 1e-6);
    assert!(detail.steps.iter().any(|s| s.step == step::UNIT));
}

/// ED 75 %: only a quarter of AMANA stays in the centre's flow.
#[test]
fn ed_percent_retention() {
    let engine = single_position_engine(vec![task(1, 10, "Tri colis amana")]);
    let mut volumes = amana_global(10_000.0);
    volumes.scalars.ed_percent = Some(75.0);

    let result = engine
        .compute_centre(CENTRE, &volumes, &EngineParams::default())
        .unwrap();
    assert_close(result.task(1).unwrap().volume_annuel, 2_500.0, 1e-9);
}

/// 10 h of work at 50 % productivity is 20 h, 2.5 FTE, rounded to 3.
#[test]
fn productivity_doubles_hours() {
    let mut t = task(1, 10, "Tri colis amana");
    t.mean_seconds = Some(36.0);
    let engine = single_position_engine(vec![t]);
    let params = EngineParams {
        productivite: Some(50.0),
        heures_par_jour: Some(8.0),
        idle_minutes: Some(0.0),
        ..EngineParams::default()
    };

    // 264000 / 264 = 1000 colis a day × 36 s = 10 h before productivity.
    let result = engine
        .compute_centre(CENTRE, &amana_global(264_000.0), &params)
        .unwrap();
    assert_close(result.total_hours, 20.0, 1e-9);
    assert_close(result.fte_calcule, 2.5, 1e-9);
    assert_eq!(result.fte_arrondi, 3.0);
}

/// Target 5 FTE against 6 MOD + 3 APS: APS goes to 0, MOD to 5.
#[test]
fn surplus_reduction_targets() {
    let mut t = task(1, 10, "Tri colis amana");
    t.mean_seconds = Some(144.0);
    let engine = engine(
        vec![centre(CENTRE, "Centre de test", Some(DIRECTION))],
        vec![
            position(10, CENTRE, "Agent opération", RoleType::Mod, 6.0),
            position(11, CENTRE, "Agent de sécurité", RoleType::Aps, 3.0),
        ],
        vec![t],
    );

    // 1000 colis a day × 144 s = 40 h = 5 FTE at 8 h.
    let result = engine
        .compute_centre(CENTRE, &amana_global(264_000.0), &EngineParams::default())
        .unwrap();
    assert_eq!(result.fte_arrondi, 5.0);
    assert_eq!(result.actual.direct, 6.0);
    assert_eq!(result.actual.aps, 3.0);
    assert_eq!(result.target.aps, 0.0);
    assert_eq!(result.target.direct, 5.0);
    assert_eq!(result.variance, -4.0);
}

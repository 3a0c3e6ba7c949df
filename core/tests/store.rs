//! Reference store: schema, round trips through SQLite, and a full run
//! from a seeded database.

mod common;

use common::*;
use workload_core::{
    config::EngineConfig,
    engine::WorkloadEngine,
    error::WorkloadError,
    model::RoleType,
    params::EngineParams,
    store::{NewCentrePoste, NewTache, ReferenceStore, TABLES},
};

fn migrated() -> ReferenceStore {
    init_logging();
    let store = ReferenceStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn seed_reference(store: &ReferenceStore) {
    for f in flux_table() {
        store.insert_flux(&f).unwrap();
    }
    for s in sens_table() {
        store.insert_sens(&s).unwrap();
    }
    for s in segment_table() {
        store.insert_segment(&s).unwrap();
    }
    for r in mapping_rules() {
        store.insert_mapping_rule(&r).unwrap();
    }
    for u in unit_conversions() {
        store.insert_unit_conversion(&u).unwrap();
    }
}

fn tache(id: i64, centre_poste_id: i64, name: &str) -> NewTache {
    NewTache {
        id,
        centre_poste_id,
        nom_tache: name.to_string(),
        unite_mesure: "Colis".to_string(),
        produit: "Amana".to_string(),
        flux_id: Some(AMANA),
        sens_id: Some(ARRIVEE),
        segment_id: Some(GLOBAL),
        moy_sec: Some("30".to_string()),
        base_calcul: Some("100".to_string()),
        etat: "Actif".to_string(),
        ordre: id,
        ..NewTache::default()
    }
}

/// Centre 100 in direction 1, one MOD poste staffed "1", one task.
fn seed_organisation(store: &ReferenceStore) {
    for d in directions() {
        store.insert_direction(&d).unwrap();
    }
    store
        .insert_centre(&centre(CENTRE, "Centre de test", Some(DIRECTION)))
        .unwrap();
    store.insert_poste(1, "AGOP", "Agent opération", RoleType::Mod).unwrap();
    store
        .insert_centre_poste(&NewCentrePoste {
            id: 10,
            centre_id: CENTRE,
            poste_id: 1,
            effectif_actuel: Some("1".to_string()),
        })
        .unwrap();
    store.insert_tache(&tache(1, 10, "Tri colis amana")).unwrap();
}

#[test]
fn migration_is_idempotent() {
    let store = migrated();
    store.migrate().expect("second migration");
    for table in TABLES {
        assert_eq!(store.count(table).unwrap(), 0, "{table} should start empty");
    }
    assert!(store.path().is_none());
}

#[test]
fn catalogue_round_trip() {
    let store = migrated();
    seed_reference(&store);

    assert_eq!(store.count("volume_mapping_rules").unwrap(), 9);
    let rules = store.mapping_rules().unwrap();
    let recup = rules.iter().find(|r| r.id == 8).unwrap();
    assert_eq!(recup.keyword.as_deref(), Some("récupération"));
    assert!(rules.iter().filter(|r| r.id != 8).all(|r| r.keyword.is_none()));

    let catalogue = store.load_catalogue().unwrap();
    assert_eq!(catalogue.flux_code(AMANA), Some("AMANA"));
    assert_eq!(catalogue.sens_id("arrivée"), Some(ARRIVEE));
    assert_eq!(catalogue.rules()[0].id, 8);
    assert_eq!(catalogue.unit_factor("LOT DE 10"), 0.1);
}

#[test]
fn empty_reference_tables_are_a_configuration_error() {
    let store = migrated();
    assert!(matches!(
        store.load_catalogue(),
        Err(WorkloadError::Configuration { .. })
    ));
}

/// Spreadsheet-typed columns come back as numbers.
#[test]
fn loose_numeric_columns_are_coerced() {
    let store = migrated();
    seed_reference(&store);
    seed_organisation(&store);
    let mut t = tache(2, 10, "Saisie");
    t.moy_sec = None;
    t.moyenne_min = Some("0,83".to_string());
    t.base_calcul = Some("85%".to_string());
    store.insert_tache(&t).unwrap();

    let tasks = store.tasks().unwrap();
    let saisie = tasks.iter().find(|t| t.id == 2).unwrap();
    assert_eq!(saisie.mean_seconds, None);
    assert_eq!(saisie.mean_minutes, Some(0.83));
    assert_eq!(saisie.base_calcul_pct, Some(85.0));

    let positions = store.positions().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].current_staffing, 1.0);
    assert_eq!(positions[0].label, "Agent opération");
    assert_eq!(positions[0].poste_code, "AGOP");
}

#[test]
fn garbage_in_a_numeric_column_is_rejected() {
    let store = migrated();
    seed_reference(&store);
    seed_organisation(&store);
    let mut t = tache(2, 10, "Saisie");
    t.moy_sec = Some("trente".to_string());
    store.insert_tache(&t).unwrap();

    assert!(matches!(
        store.tasks(),
        Err(WorkloadError::InvalidNumber { ref field, .. }) if field == "moy_sec"
    ));
}

#[test]
fn engine_runs_from_the_store() {
    let store = migrated();
    seed_reference(&store);
    seed_organisation(&store);

    let engine = WorkloadEngine::new(
        store.load_catalogue().unwrap(),
        store.load_organisation().unwrap(),
        EngineConfig::default(),
    )
    .unwrap();
    let result = engine
        .compute_centre(CENTRE, &amana_global(10_000.0), &EngineParams::default())
        .unwrap();
    assert_eq!(result.centre_label, "Centre de test");
    assert_close(result.total_hours, 0.315_656_6, 1e-6);
    assert_eq!(result.actual.direct, 1.0);
}

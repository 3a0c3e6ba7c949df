use crate::{
    params::EngineParams,
    types::{CentreId, DEFAULT_WORKING_DAYS},
    variant::Archetype,
    volume::{VolumeScalars, DEFAULT_CR_PAR_CAISSON},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the minutes → seconds recovery table. Durations stored
/// with two decimals in minutes lose their exact seconds (0.83 min is
/// really 50 s); this table restores them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MinuteRounding {
    pub minutes: f64,
    pub seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Parameters applied beneath the payload scalars and request params.
    pub defaults: EngineParams,
    /// Role labels whose tasks are never counted.
    pub excluded_roles: Vec<String>,
    /// Task states that are ignored.
    pub excluded_states: Vec<String>,
    /// Role labels eligible to the shift multiplier.
    pub operational_roles: Vec<String>,
    /// Family tokens that take the hors-axes share.
    pub local_families: Vec<String>,
    /// Family or task-name tokens that take the axes share.
    pub axes_families: Vec<String>,
    /// Family tokens eligible to complexity × geography, together with
    /// `complexity_units`.
    pub distribution_families: Vec<String>,
    pub complexity_units: Vec<String>,
    /// Task-name tokens whose daily volume is floored.
    pub truncated_tasks: Vec<String>,
    /// Task-name tokens selecting `pct_retour`.
    pub retour_tokens: Vec<String>,
    /// Units replaced by one occurrence per working day.
    pub forfeit_units: Vec<String>,
    pub minute_rounding: Vec<MinuteRounding>,
    /// Centre id → archetype.
    pub archetypes: BTreeMap<CentreId, Archetype>,
    /// Centre label token → archetype, checked when the id is not mapped.
    pub archetype_labels: BTreeMap<String, Archetype>,
    /// Bandoeng product name → `grid_values` path.
    pub bandoeng_products: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            defaults: EngineParams {
                productivite: Some(100.0),
                heures_par_jour: Some(8.0),
                idle_minutes: Some(0.0),
                shift: Some(1.0),
                scalars: VolumeScalars {
                    nb_jours_ouvres_an: Some(DEFAULT_WORKING_DAYS),
                    cr_par_caisson: Some(DEFAULT_CR_PAR_CAISSON),
                    ..VolumeScalars::default()
                },
                ..EngineParams::default()
            },
            excluded_roles: strings(&["Chef de centre", "Chef d'agence"]),
            excluded_states: strings(&["N/A"]),
            operational_roles: strings(&[
                "AGENT OPERATION",
                "CONTROLEUR",
                "AGENT TRAITEMENT",
                "RESPONSABLE OPERATION",
                "TRIEUR",
                "MANUTENTIONNAIRE",
            ]),
            local_families: strings(&["DISTRIBUTION LOCALE", "GUICHET", "CAMION AXES"]),
            axes_families: strings(&["AXES"]),
            distribution_families: strings(&["DISTRIBUTION", "DL"]),
            complexity_units: strings(&["COURRIER"]),
            truncated_tasks: strings(&["CHARGEMENT FACTEUR", "APPEL CLIENT", "COMPTAGE COLIS"]),
            retour_tokens: strings(&["RETOUR", "ETATS NON DISTRIBUE", "ETAT NON DISTRIBUE"]),
            forfeit_units: strings(&["DEPECHE", "PART"]),
            minute_rounding: vec![
                MinuteRounding { minutes: 0.08, seconds: 5.0 },
                MinuteRounding { minutes: 0.17, seconds: 10.0 },
                MinuteRounding { minutes: 0.33, seconds: 20.0 },
                MinuteRounding { minutes: 0.42, seconds: 25.0 },
                MinuteRounding { minutes: 0.58, seconds: 35.0 },
                MinuteRounding { minutes: 0.67, seconds: 40.0 },
                MinuteRounding { minutes: 0.83, seconds: 50.0 },
                MinuteRounding { minutes: 1.17, seconds: 70.0 },
                MinuteRounding { minutes: 1.33, seconds: 80.0 },
                MinuteRounding { minutes: 1.67, seconds: 100.0 },
            ],
            archetypes: BTreeMap::from([
                (1952, Archetype::Cci),
                (2053, Archetype::Ccp),
                (1964, Archetype::Cna),
            ]),
            archetype_labels: BTreeMap::from([
                ("BANDOENG".to_string(), Archetype::Bandoeng),
                ("CNDP".to_string(), Archetype::Cndp),
            ]),
            bandoeng_products: [
                ("AMANA RECU", "amana.recu"),
                ("AMANA DEPOT", "amana.depot"),
                ("CR ARRIVE", "cr.arrive"),
                ("CO MED", "co.med"),
                ("EL BARKIA", "ebarkia"),
                ("EBARKIA", "ebarkia"),
                ("LRH", "lrh"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        }
    }
}

impl EngineConfig {
    /// Load from the data/ directory. Missing keys keep their defaults.
    /// In tests, use EngineConfig::default().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine/engine_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        log::info!(
            "engine config loaded from {path}: {} archetype centres",
            config.archetypes.len()
        );
        Ok(config)
    }

    /// Exact seconds for a duration stored in minutes.
    pub fn seconds_from_minutes(&self, minutes: f64) -> f64 {
        let rounded = (minutes * 100.0).round() / 100.0;
        self.minute_rounding
            .iter()
            .find(|r| (r.minutes - rounded).abs() < 1e-9)
            .map(|r| r.seconds)
            .unwrap_or(minutes * 60.0)
    }
}

//! Volume input model and the per-request `VolumeContext`.
//!
//! `VolumeInput` is the payload as received (codes in any casing, numbers
//! possibly as strings). `VolumeContext::new` validates and normalises it
//! once; the engine only ever reads the context.

use crate::{
    error::{WorkloadError, WorkloadResult},
    normalize::{coerce_value, de_number, de_opt_number, normalize_label, normalize_percent},
    reference::{SensCode, SEGMENT_GLOBAL},
    types::DEFAULT_WORKING_DAYS,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_CR_PAR_CAISSON: f64 = 500.0;

/// Sub-segments that fall back to their `global` sibling when empty.
pub const SUB_SEGMENTS: [&str; 4] = ["part", "pro", "dist", "axes"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeItem {
    pub flux: String,
    pub sens: String,
    pub segment: String,
    #[serde(default, deserialize_with = "de_number")]
    pub volume: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GuichetInput {
    #[serde(default, deserialize_with = "de_number")]
    pub depot: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub recup: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuichetKind {
    Depot,
    Recup,
}

/// Bulk annual inputs used by the CNA and CNDP archetypes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BulkVolumes {
    #[serde(default, deserialize_with = "de_opt_number")]
    pub collecte: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub marche_ordinaire: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub recu_region: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub global_amana: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub import: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub export: Option<f64>,
}

/// Scalar ratios and percentages. Shared by the volume payload and the
/// request parameters; `overlay` lets the latter override the former.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VolumeScalars {
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub nb_jours_ouvres_an: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub colis_amana_par_sac: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub courriers_co_par_sac: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub courriers_cr_par_sac: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub cr_par_caisson: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub colis_par_collecte: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub pct_axes_arrivee: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub pct_axes_depart: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub pct_collecte: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub pct_retour: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub pct_international: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub pct_national: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub pct_marche_ordinaire: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub ed_percent: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub taux_complexite: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub nature_geo: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number", skip_serializing_if = "Option::is_none")]
    pub pct_mois: Option<f64>,
}

impl VolumeScalars {
    /// Fields set in `top` win over fields set in `self`.
    pub fn overlay(&self, top: &VolumeScalars) -> VolumeScalars {
        macro_rules! pick {
            ($($field:ident),* $(,)?) => {
                VolumeScalars { $($field: top.$field.or(self.$field)),* }
            };
        }
        pick!(
            nb_jours_ouvres_an,
            colis_amana_par_sac,
            courriers_co_par_sac,
            courriers_cr_par_sac,
            cr_par_caisson,
            colis_par_collecte,
            pct_axes_arrivee,
            pct_axes_depart,
            pct_collecte,
            pct_retour,
            pct_international,
            pct_national,
            pct_marche_ordinaire,
            ed_percent,
            taux_complexite,
            nature_geo,
            pct_mois,
        )
    }
}

/// The volume payload for one centre.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeInput {
    #[serde(default)]
    pub volumes_flux: Vec<VolumeItem>,
    #[serde(default)]
    pub guichet: GuichetInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_values: Option<Value>,
    #[serde(default)]
    pub bulk: BulkVolumes,
    #[serde(flatten)]
    pub scalars: VolumeScalars,
}

impl VolumeInput {
    /// Convenience builder used by callers that assemble inputs in code.
    pub fn with_volume(mut self, flux: &str, sens: &str, segment: &str, volume: f64) -> Self {
        self.volumes_flux.push(VolumeItem {
            flux: flux.to_string(),
            sens: sens.to_string(),
            segment: segment.to_string(),
            volume,
        });
        self
    }

    /// Every flux volume multiplied by `factor`; guichet and bulk volumes too.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut out = self.clone();
        for item in &mut out.volumes_flux {
            item.volume *= factor;
        }
        out.guichet.depot *= factor;
        out.guichet.recup *= factor;
        for slot in [
            &mut out.bulk.collecte,
            &mut out.bulk.marche_ordinaire,
            &mut out.bulk.recu_region,
            &mut out.bulk.global_amana,
            &mut out.bulk.import,
            &mut out.bulk.export,
        ] {
            if let Some(v) = slot.as_mut() {
                *v *= factor;
            }
        }
        if let Some(grid) = out.grid_values.as_mut() {
            scale_numeric_leaves(grid, factor);
        }
        out
    }
}

fn scale_numeric_leaves(node: &mut Value, factor: f64) {
    if let Some(v) = node.as_f64() {
        *node = Value::from(v * factor);
    } else if let Value::Object(map) = node {
        map.values_mut().for_each(|v| scale_numeric_leaves(v, factor));
    }
}

/// Normalised scalars as the engine sees them. Percentages are fractions.
/// `None` coefficients are not applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficients {
    pub nb_jours_ouvres_an: f64,
    pub colis_amana_par_sac: Option<f64>,
    pub courriers_co_par_sac: Option<f64>,
    pub courriers_cr_par_sac: Option<f64>,
    pub cr_par_caisson: f64,
    pub colis_par_collecte: Option<f64>,
    pub pct_axes_arrivee: f64,
    pub pct_axes_depart: f64,
    pub pct_collecte: Option<f64>,
    pub pct_retour: Option<f64>,
    pub pct_international: Option<f64>,
    pub pct_national: Option<f64>,
    pub pct_marche_ordinaire: Option<f64>,
    pub ed_percent: f64,
    pub taux_complexite: f64,
    pub nature_geo: f64,
    pub pct_mois: Option<f64>,
}

impl Coefficients {
    pub fn from_scalars(s: &VolumeScalars) -> WorkloadResult<Self> {
        let pct = |field: &str, v: Option<f64>| v.map(|v| normalize_percent(field, v)).transpose();
        let ratio = |v: Option<f64>| v.filter(|r| r.is_finite() && *r > 0.0);
        let multiplier = |v: Option<f64>| v.filter(|r| r.is_finite() && *r >= 0.0).unwrap_or(1.0);

        let pct_international = pct("pct_international", s.pct_international)?;
        let pct_national = pct("pct_national", s.pct_national)?
            .or_else(|| pct_international.map(|i| 1.0 - i));

        Ok(Self {
            nb_jours_ouvres_an: ratio(s.nb_jours_ouvres_an).unwrap_or(DEFAULT_WORKING_DAYS),
            colis_amana_par_sac: ratio(s.colis_amana_par_sac),
            courriers_co_par_sac: ratio(s.courriers_co_par_sac),
            courriers_cr_par_sac: ratio(s.courriers_cr_par_sac),
            cr_par_caisson: ratio(s.cr_par_caisson).unwrap_or(DEFAULT_CR_PAR_CAISSON),
            colis_par_collecte: ratio(s.colis_par_collecte),
            pct_axes_arrivee: pct("pct_axes_arrivee", s.pct_axes_arrivee)?.unwrap_or(0.0),
            pct_axes_depart: pct("pct_axes_depart", s.pct_axes_depart)?.unwrap_or(0.0),
            pct_collecte: pct("pct_collecte", s.pct_collecte)?,
            pct_retour: pct("pct_retour", s.pct_retour)?,
            pct_international,
            pct_national,
            pct_marche_ordinaire: pct("pct_marche_ordinaire", s.pct_marche_ordinaire)?,
            ed_percent: pct("ed_percent", s.ed_percent)?.unwrap_or(0.0),
            taux_complexite: multiplier(s.taux_complexite),
            nature_geo: multiplier(s.nature_geo),
            pct_mois: pct("pct_mois", s.pct_mois)?,
        })
    }

    /// Axes share for a direction; the counter has no axes.
    pub fn pct_axes(&self, sens: SensCode) -> Option<f64> {
        match sens {
            SensCode::Arrivee => Some(self.pct_axes_arrivee),
            SensCode::Depart => Some(self.pct_axes_depart),
            SensCode::Guichet => None,
        }
    }

    /// Items per sac for a flux code.
    pub fn par_sac(&self, flux: &str) -> Option<f64> {
        match flux {
            "AMANA" => self.colis_amana_par_sac,
            "CO" => self.courriers_co_par_sac,
            "CR" => self.courriers_cr_par_sac,
            _ => None,
        }
    }
}

type CellKey = (String, String, String);

#[derive(Debug, Clone)]
pub struct VolumeContext {
    matrix: BTreeMap<CellKey, f64>,
    guichet: GuichetInput,
    grid: Option<Value>,
    bulk: BulkVolumes,
    coefficients: Coefficients,
    tree: Value,
}

impl VolumeContext {
    /// Validate and normalise `input`. `scalars` is the merged set of
    /// defaults, payload scalars and request overrides.
    pub fn new(input: &VolumeInput, scalars: &VolumeScalars) -> WorkloadResult<Self> {
        let mut matrix: BTreeMap<CellKey, f64> = BTreeMap::new();
        for (i, item) in input.volumes_flux.iter().enumerate() {
            check_volume(&format!("volumes_flux[{i}].volume"), item.volume)?;
            let key = (
                normalize_label(&item.flux),
                normalize_label(&item.sens),
                normalize_label(&item.segment),
            );
            *matrix.entry(key).or_insert(0.0) += item.volume;
        }
        check_volume("guichet.depot", input.guichet.depot)?;
        check_volume("guichet.recup", input.guichet.recup)?;

        let coefficients = Coefficients::from_scalars(scalars)?;
        let mut ctx = Self {
            matrix,
            guichet: input.guichet.clone(),
            grid: input.grid_values.clone(),
            bulk: input.bulk.clone(),
            coefficients,
            tree: Value::Null,
        };
        ctx.tree = ctx.build_tree(scalars)?;
        Ok(ctx)
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn bulk(&self) -> &BulkVolumes {
        &self.bulk
    }

    pub fn grid(&self) -> Option<&Value> {
        self.grid.as_ref()
    }

    /// Exact (flux, sens, segment) lookup.
    pub fn get_volume(&self, flux: &str, sens: &str, segment: &str) -> f64 {
        let key = (
            normalize_label(flux),
            normalize_label(sens),
            normalize_label(segment),
        );
        self.matrix.get(&key).copied().unwrap_or(0.0)
    }

    /// Sum of all non-GLOBAL segments for (flux, sens); GLOBAL when that
    /// sum is zero.
    pub fn get_aggregated_volume(&self, flux: &str, sens: &str) -> f64 {
        let flux = normalize_label(flux);
        let sens = normalize_label(sens);
        let segmented: f64 = self
            .matrix
            .iter()
            .filter(|((f, s, seg), _)| *f == flux && *s == sens && seg != SEGMENT_GLOBAL)
            .map(|(_, v)| *v)
            .sum();
        if segmented > 0.0 {
            segmented
        } else {
            self.matrix
                .get(&(flux, sens, SEGMENT_GLOBAL.to_string()))
                .copied()
                .unwrap_or(0.0)
        }
    }

    /// Aggregated volume of a flux over every direction.
    pub fn get_flux_total(&self, flux: &str) -> f64 {
        let flux_key = normalize_label(flux);
        let mut sens: Vec<&str> = self
            .matrix
            .keys()
            .filter(|(f, _, _)| *f == flux_key)
            .map(|(_, s, _)| s.as_str())
            .collect();
        sens.dedup();
        sens.into_iter()
            .map(|s| self.get_aggregated_volume(&flux_key, s))
            .sum()
    }

    /// Counter volume: the `guichet` section, or the GUICHET/DEPOT|RECUP
    /// cells of the matrix when the section is empty.
    pub fn get_guichet(&self, kind: GuichetKind) -> f64 {
        let (section, segment) = match kind {
            GuichetKind::Depot => (self.guichet.depot, "DEPOT"),
            GuichetKind::Recup => (self.guichet.recup, "RECUP"),
        };
        if section > 0.0 {
            return section;
        }
        self.matrix
            .iter()
            .filter(|((_, s, seg), _)| s == SensCode::Guichet.as_str() && seg == segment)
            .map(|(_, v)| *v)
            .sum()
    }

    /// Resolve a dotted `ui_path`. Keys compare case- and
    /// accent-insensitively. An object node resolves to the sum of its
    /// non-global children, or its `global` child when they sum to zero.
    pub fn resolve_path(&self, path: &str) -> Option<f64> {
        resolve_in(&self.tree, path)
    }

    fn build_tree(&self, scalars: &VolumeScalars) -> WorkloadResult<Value> {
        let mut root = Map::new();
        for ((flux, sens, segment), volume) in &self.matrix {
            let sens_key = format!("flux_{}", sens.to_lowercase());
            let flux_map = root
                .entry(sens_key)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(by_flux) = flux_map {
                let seg_map = by_flux
                    .entry(flux.to_lowercase())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(by_segment) = seg_map {
                    by_segment.insert(segment.to_lowercase(), Value::from(*volume));
                }
            }
        }
        let guichet = GuichetInput {
            depot: self.get_guichet(GuichetKind::Depot),
            recup: self.get_guichet(GuichetKind::Recup),
        };
        root.insert("guichet".into(), serde_json::to_value(&guichet)?);
        root.insert("bulk".into(), serde_json::to_value(&self.bulk)?);
        if let Some(grid) = &self.grid {
            root.insert("grid_values".into(), grid.clone());
        }
        if let Value::Object(scalar_map) = serde_json::to_value(scalars)? {
            root.extend(scalar_map);
        }
        Ok(Value::Object(root))
    }
}

fn check_volume(field: &str, value: f64) -> WorkloadResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(WorkloadError::InvalidNumber {
            field: field.to_string(),
            raw: value.to_string(),
        })
    }
}

/// Walk `path` through `root` and read the value there.
pub fn resolve_in(root: &Value, path: &str) -> Option<f64> {
    node_at(root, path).and_then(node_value)
}

/// The node at a dotted path.
pub fn node_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for part in path.split('.').map(str::trim).filter(|p| !p.is_empty()) {
        node = child(node, part)?;
    }
    Some(node)
}

/// Sum of every child named `key` below `node`; `None` when no such key
/// exists.
pub fn sum_keyed(node: &Value, key: &str) -> Option<f64> {
    let map = node.as_object()?;
    let wanted = normalize_label(key);
    let mut found = None;
    for (k, v) in map {
        let part = if normalize_label(k) == wanted {
            node_value(v)
        } else {
            sum_keyed(v, key)
        };
        if let Some(part) = part {
            found = Some(found.unwrap_or(0.0) + part);
        }
    }
    found
}

fn child<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    let map = node.as_object()?;
    if let Some(v) = map.get(key) {
        return Some(v);
    }
    let wanted = normalize_label(key);
    map.iter()
        .find(|(k, _)| normalize_label(k) == wanted)
        .map(|(_, v)| v)
}

/// Numeric value of a node. Objects follow the aggregated-volume rule.
pub fn node_value(node: &Value) -> Option<f64> {
    match node {
        Value::Object(map) => {
            let mut segmented = 0.0;
            let mut global = None;
            for (key, value) in map {
                let v = node_value(value).unwrap_or(0.0);
                if normalize_label(key) == SEGMENT_GLOBAL {
                    global = Some(v);
                } else {
                    segmented += v;
                }
            }
            if segmented > 0.0 {
                Some(segmented)
            } else {
                global.or(Some(0.0))
            }
        }
        other => coerce_value("ui_path", other).ok().flatten(),
    }
}

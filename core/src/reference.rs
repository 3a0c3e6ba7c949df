//! Reference catalogue — flux, sens, segment codes, unit factors and
//! volume mapping rules.
//!
//! The catalogue is built once and is immutable afterwards. Every code it
//! hands out is already normalised (see `normalize::normalize_label`).

use crate::{
    error::{WorkloadError, WorkloadResult},
    normalize::normalize_label,
    types::{FluxId, SegmentId, SensId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flux {
    pub id: FluxId,
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sens {
    pub id: SensId,
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub code: String,
    pub label: String,
}

/// Maps a (flux, sens, segment, keyword) signature to a `ui_path` in the
/// volume input. A `None` id is a wildcard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingRule {
    pub id: i64,
    pub flux_id: Option<FluxId>,
    pub sens_id: Option<SensId>,
    pub segment_id: Option<SegmentId>,
    #[serde(default)]
    pub keyword: Option<String>,
    pub ui_path: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitConversion {
    pub unit_code: String,
    pub factor: f64,
    #[serde(default)]
    pub description: String,
}

/// Well-known direction codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensCode {
    Arrivee,
    Depart,
    Guichet,
}

impl SensCode {
    pub fn parse(code: &str) -> Option<Self> {
        match normalize_label(code).as_str() {
            "ARRIVEE" | "ARRIVE" | "ARRIVAL" => Some(Self::Arrivee),
            "DEPART" | "DEPARTURE" => Some(Self::Depart),
            "GUICHET" => Some(Self::Guichet),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arrivee => "ARRIVEE",
            Self::Depart => "DEPART",
            Self::Guichet => "GUICHET",
        }
    }
}

pub const SEGMENT_GLOBAL: &str = "GLOBAL";

#[derive(Debug, Clone)]
pub struct ReferenceCatalogue {
    flux_code: HashMap<FluxId, String>,
    sens_code: HashMap<SensId, String>,
    segment_code: HashMap<SegmentId, String>,
    unit_factor: HashMap<String, f64>,
    rules: Vec<MappingRule>,
}

impl ReferenceCatalogue {
    /// Materialise the lookups. Rules are sorted by descending priority;
    /// equal priorities keep ascending id order so the result is stable.
    pub fn new(
        flux: Vec<Flux>,
        sens: Vec<Sens>,
        segments: Vec<Segment>,
        mut rules: Vec<MappingRule>,
        units: Vec<UnitConversion>,
    ) -> WorkloadResult<Self> {
        if flux.is_empty() {
            return Err(WorkloadError::configuration("flux table is empty"));
        }
        if sens.is_empty() {
            return Err(WorkloadError::configuration("volume_sens table is empty"));
        }
        if segments.is_empty() {
            return Err(WorkloadError::configuration("volume_segments table is empty"));
        }
        if let Some(rule) = rules.iter().find(|r| r.ui_path.trim().is_empty()) {
            return Err(WorkloadError::configuration(format!(
                "mapping rule {} has an empty ui_path",
                rule.id
            )));
        }

        let flux_code = index_codes(flux.into_iter().map(|f| (f.id, f.code)), "flux")?;
        let sens_code = index_codes(sens.into_iter().map(|s| (s.id, s.code)), "volume_sens")?;
        let segment_code =
            index_codes(segments.into_iter().map(|s| (s.id, s.code)), "volume_segments")?;

        let unit_factor = units
            .into_iter()
            .filter(|u| u.factor.is_finite())
            .map(|u| (normalize_label(&u.unit_code), u.factor))
            .collect();

        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

        log::info!(
            "reference catalogue loaded: {} flux, {} sens, {} segments, {} rules",
            flux_code.len(),
            sens_code.len(),
            segment_code.len(),
            rules.len()
        );

        Ok(Self {
            flux_code,
            sens_code,
            segment_code,
            unit_factor,
            rules,
        })
    }

    pub fn flux_code(&self, id: FluxId) -> Option<&str> {
        self.flux_code.get(&id).map(String::as_str)
    }

    pub fn sens_code(&self, id: SensId) -> Option<&str> {
        self.sens_code.get(&id).map(String::as_str)
    }

    pub fn segment_code(&self, id: SegmentId) -> Option<&str> {
        self.segment_code.get(&id).map(String::as_str)
    }

    pub fn flux_id(&self, code: &str) -> Option<FluxId> {
        let wanted = normalize_label(code);
        self.flux_code
            .iter()
            .filter(|(_, c)| **c == wanted)
            .map(|(id, _)| *id)
            .min()
    }

    pub fn sens_id(&self, code: &str) -> Option<SensId> {
        let wanted = normalize_label(code);
        self.sens_code
            .iter()
            .filter(|(_, c)| **c == wanted)
            .map(|(id, _)| *id)
            .min()
    }

    pub fn segment_id(&self, code: &str) -> Option<SegmentId> {
        let wanted = normalize_label(code);
        self.segment_code
            .iter()
            .filter(|(_, c)| **c == wanted)
            .map(|(id, _)| *id)
            .min()
    }

    /// Factor for a unit string. Unknown units yield 1.
    pub fn unit_factor(&self, unit: &str) -> f64 {
        self.unit_factor
            .get(&normalize_label(unit))
            .copied()
            .unwrap_or(1.0)
    }

    /// Mapping rules, highest priority first.
    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }
}

fn index_codes(
    rows: impl Iterator<Item = (i64, String)>,
    table: &str,
) -> WorkloadResult<HashMap<i64, String>> {
    let mut out = HashMap::new();
    for (id, code) in rows {
        let code = normalize_label(&code);
        if code.is_empty() {
            return Err(WorkloadError::configuration(format!(
                "{table} row {id} has an empty code"
            )));
        }
        if out.insert(id, code).is_some() {
            return Err(WorkloadError::configuration(format!(
                "{table} has a duplicate id {id}"
            )));
        }
    }
    Ok(out)
}

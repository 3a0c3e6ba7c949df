//! Volume resolver — picks the mapping rule for a task and reads the
//! annual volume it points to.
//!
//! Rules are scanned in catalogue order (highest priority first); the
//! first rule whose non-null criteria all match wins.

use crate::{
    model::Task,
    normalize::normalize_label,
    reference::{MappingRule, ReferenceCatalogue},
    volume::{VolumeContext, SUB_SEGMENTS},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub volume: f64,
    /// The `ui_path` actually read, kept for tracing.
    pub source: String,
    pub rule_id: i64,
}

pub struct VolumeResolver<'a> {
    catalogue: &'a ReferenceCatalogue,
    volumes: &'a VolumeContext,
}

impl<'a> VolumeResolver<'a> {
    pub fn new(catalogue: &'a ReferenceCatalogue, volumes: &'a VolumeContext) -> Self {
        Self { catalogue, volumes }
    }

    /// Highest-priority rule matching the task's signature.
    pub fn matching_rule(&self, task: &Task) -> Option<&'a MappingRule> {
        let name = normalize_label(&task.name);
        self.catalogue
            .rules()
            .iter()
            .find(|rule| rule_matches(rule, task, &name))
    }

    /// `(raw_annual_volume, source)` for the task, or `None` when no rule
    /// matches.
    pub fn resolve(&self, task: &Task) -> Option<Resolution> {
        let rule = self.matching_rule(task)?;
        let primary = self.volumes.resolve_path(&rule.ui_path).unwrap_or(0.0);
        if primary != 0.0 {
            return Some(Resolution {
                volume: primary,
                source: rule.ui_path.clone(),
                rule_id: rule.id,
            });
        }

        if let Some(sibling) = global_sibling(&rule.ui_path) {
            if let Some(v) = self.volumes.resolve_path(&sibling).filter(|v| *v != 0.0) {
                log::debug!(
                    "task {} fell back from {} to {}",
                    task.id,
                    rule.ui_path,
                    sibling
                );
                return Some(Resolution {
                    volume: v,
                    source: sibling,
                    rule_id: rule.id,
                });
            }
        }

        Some(Resolution {
            volume: 0.0,
            source: rule.ui_path.clone(),
            rule_id: rule.id,
        })
    }
}

fn rule_matches(rule: &MappingRule, task: &Task, normalized_name: &str) -> bool {
    let id_matches = |criterion: Option<i64>, value: Option<i64>| match criterion {
        None => true,
        Some(wanted) => value == Some(wanted),
    };
    if !id_matches(rule.flux_id, task.flux_id)
        || !id_matches(rule.sens_id, task.sens_id)
        || !id_matches(rule.segment_id, task.segment_id)
    {
        return false;
    }
    match rule.keyword.as_deref().map(normalize_label) {
        Some(keyword) if !keyword.is_empty() => normalized_name.contains(&keyword),
        _ => true,
    }
}

/// `flux_arrivee.amana.part` → `flux_arrivee.amana.global`,
/// `guichet.part_depot` → `guichet.global_depot`.
pub fn global_sibling(path: &str) -> Option<String> {
    let (head, last) = match path.rsplit_once('.') {
        Some((head, last)) => (Some(head), last),
        None => (None, path),
    };
    let lower = last.trim().to_lowercase();
    let replaced = SUB_SEGMENTS.iter().find_map(|sub| {
        if lower == *sub {
            Some("global".to_string())
        } else {
            lower
                .strip_prefix(&format!("{sub}_"))
                .map(|rest| format!("global_{rest}"))
        }
    })?;
    Some(match head {
        Some(head) => format!("{head}.{replaced}"),
        None => replaced,
    })
}

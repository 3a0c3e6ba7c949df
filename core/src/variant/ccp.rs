//! CCP archetype (parcel and mail processing centre).
//!
//! Amana reads the GLOBAL depot/recu cells; CO and CR read the MED
//! (departure) and arrivé aggregates. Handling units are converted with
//! the request's own `sac_input`, `caisson_input` and `courrier_input`
//! ratios, and distribution tasks are split between national and
//! international on the `pct_international` complement.

use super::{Archetype, WorkloadVariant};
use crate::{
    reference::{SensCode, SEGMENT_GLOBAL},
    rules::{contains_word, divide_by, fmt_num, scale, step, StepContext, TaskView, VolumeSelection},
    trace::Trace,
};

pub struct CcpVariant;

const DEPART_TOKENS: [&str; 3] = ["DEPOT", "MED", "DEPART"];
const ARRIVEE_TOKENS: [&str; 6] = ["RECU", "RECUS", "ARRIVE", "ARRIVEE", "ARRIVEES", "RECEPTION"];

/// Task direction: its sens id, else the tokens in its product or name.
fn direction(task: &TaskView<'_>) -> Option<SensCode> {
    if let Some(sens) = task.sens_code() {
        return Some(sens);
    }
    let text = format!("{} {}", task.product, task.name);
    if DEPART_TOKENS.iter().any(|t| contains_word(&text, t)) {
        Some(SensCode::Depart)
    } else if ARRIVEE_TOKENS.iter().any(|t| contains_word(&text, t)) {
        Some(SensCode::Arrivee)
    } else {
        None
    }
}

impl CcpVariant {
    fn is_distribution(&self, ctx: &StepContext<'_>, task: &TaskView<'_>) -> bool {
        ctx.config
            .distribution_families
            .iter()
            .any(|f| contains_word(&task.family, f))
    }
}

impl WorkloadVariant for CcpVariant {
    fn archetype(&self) -> Archetype {
        Archetype::Ccp
    }

    fn select_volume(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> VolumeSelection {
        let (Some(flux), Some(sens)) = (task.flux_code(), direction(task)) else {
            return ctx.select_volume(task, trace);
        };
        if sens == SensCode::Guichet {
            return ctx.select_volume(task, trace);
        }
        let sens = sens.as_str();
        let (volume, source) = match flux.as_str() {
            "AMANA" => {
                let global = ctx.volumes.get_volume(&flux, sens, SEGMENT_GLOBAL);
                if global > 0.0 {
                    (global, format!("AMANA/{sens}/{SEGMENT_GLOBAL}"))
                } else {
                    (
                        ctx.volumes.get_aggregated_volume(&flux, sens),
                        format!("AMANA/{sens}"),
                    )
                }
            }
            "CO" | "CR" => (
                ctx.volumes.get_aggregated_volume(&flux, sens),
                format!("{flux}/{sens}"),
            ),
            _ => return ctx.select_volume(task, trace),
        };
        trace.record(step::VOLUME, format!("{} [{source}]", fmt_num(volume)), volume);
        VolumeSelection::Resolved { volume, source }
    }

    fn secondary_coefficient(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> f64 {
        if !self.is_distribution(ctx, task) {
            return ctx.secondary_coefficient(task, trace);
        }
        let international = ctx.coefficients().pct_international;
        let factor = if task.phase.contains("INTERNATIONAL") || task.name.contains("INTERNATIONAL") {
            scale(trace, "pct_international", international)
        } else {
            scale(trace, "1 − pct_international", international.map(|i| 1.0 - i))
        };
        factor * ctx.ed_retention(task, trace)
    }

    fn convert_units(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        volume: f64,
        trace: &mut Trace,
    ) -> f64 {
        let p = &ctx.params.ccp;
        let unit = &task.unit;
        let local = if unit.contains("SAC") {
            p.sac_input.map(|r| (r, "sac_input"))
        } else if unit.contains("CAISSON") {
            p.caisson_input.map(|r| (r, "caisson_input"))
        } else if unit.contains("LIASSE") || unit.contains("PAQUET") {
            p.courrier_input.map(|r| (r, "courrier_input"))
        } else {
            None
        };
        match local {
            Some((ratio, label)) => divide_by(trace, volume, Some(ratio), label),
            None => ctx.convert_units(task, volume, trace),
        }
    }
}

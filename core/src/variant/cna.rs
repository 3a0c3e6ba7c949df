//! CNA archetype (national Amana centre).
//!
//! Four bulk annual inputs replace the flux matrix. The collecte and
//! marché ordinaire inputs are scaled by their request parameters; the
//! daily divisor is monthly, 12 × 22.

use super::{Archetype, WorkloadVariant};
use crate::{
    error::WorkloadResult,
    normalize::normalize_opt_percent,
    params::EngineParams,
    rules::{contains_word, divide_by, fmt_num, step, DayDivisor, StepContext, TaskView, VolumeSelection},
    trace::Trace,
    types::MONTHLY_WORKING_DAYS,
};

pub struct CnaVariant;

impl WorkloadVariant for CnaVariant {
    fn archetype(&self) -> Archetype {
        Archetype::Cna
    }

    fn validate(&self, params: &EngineParams) -> WorkloadResult<()> {
        normalize_opt_percent("cna.param_collecte", params.cna.param_collecte)?;
        normalize_opt_percent("cna.param_marche_ordinaire", params.cna.param_marche_ordinaire)?;
        Ok(())
    }

    fn select_volume(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> VolumeSelection {
        let bulk = ctx.volumes.bulk();
        let p = &ctx.params.cna;
        let pct = |field: &str, v: Option<f64>| normalize_opt_percent(field, v).ok().flatten();
        let text = format!("{} {} {}", task.family, task.product, task.name);

        let (raw, factor, source) = if text.contains("COLLECTE") {
            (bulk.collecte, pct("cna.param_collecte", p.param_collecte), "bulk.collecte")
        } else if text.contains("MARCHE ORDINAIRE") {
            (
                bulk.marche_ordinaire,
                pct("cna.param_marche_ordinaire", p.param_marche_ordinaire),
                "bulk.marche_ordinaire",
            )
        } else if contains_word(&text, "RECU") || contains_word(&text, "REGION") {
            (bulk.recu_region, None, "bulk.recu_region")
        } else {
            (bulk.global_amana, None, "bulk.global_amana")
        };

        let Some(raw) = raw else {
            return ctx.select_volume(task, trace);
        };
        trace.record(step::VOLUME, format!("{} [{source}]", fmt_num(raw)), raw);
        let volume = match factor {
            Some(f) => {
                trace.record(step::COEFFICIENT, format!("×{} param", fmt_num(f)), f);
                raw * f
            }
            None => raw,
        };
        VolumeSelection::Resolved {
            volume,
            source: source.to_string(),
        }
    }

    fn secondary_coefficient(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> f64 {
        ctx.ed_retention(task, trace)
    }

    fn convert_units(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        volume: f64,
        trace: &mut Trace,
    ) -> f64 {
        let c = ctx.coefficients();
        if task.unit.contains("SAC") {
            divide_by(trace, volume, c.colis_amana_par_sac, "colis amana par sac")
        } else if task.unit.contains("CAISSON") {
            divide_by(trace, volume, Some(c.cr_par_caisson), "cr par caisson")
        } else {
            ctx.convert_units(task, volume, trace)
        }
    }

    fn day_divisor(&self, _ctx: &StepContext<'_>, _task: &TaskView<'_>) -> DayDivisor {
        DayDivisor::plain(12.0 * MONTHLY_WORKING_DAYS, "12 × 22 j")
    }
}

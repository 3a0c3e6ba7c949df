//! CNDP archetype (national parcel distribution centre).
//!
//! Two scalar inputs, import and export. SAC units take the `pct_sac`
//! share before dividing by parcels per sac; COLIS units take the
//! `pct_ed` share. A CAMION unit is one run per day.

use super::{Archetype, WorkloadVariant};
use crate::{
    error::WorkloadResult,
    normalize::normalize_opt_percent,
    params::EngineParams,
    reference::SensCode,
    rules::{divide_by, fmt_num, scale, step, StepContext, TaskView, VolumeSelection},
    trace::Trace,
};

pub struct CndpVariant;

impl WorkloadVariant for CndpVariant {
    fn archetype(&self) -> Archetype {
        Archetype::Cndp
    }

    fn validate(&self, params: &EngineParams) -> WorkloadResult<()> {
        normalize_opt_percent("cndp.pct_sac", params.cndp.pct_sac)?;
        normalize_opt_percent("cndp.pct_ed", params.cndp.pct_ed)?;
        Ok(())
    }

    fn select_volume(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> VolumeSelection {
        let bulk = ctx.volumes.bulk();
        if bulk.import.is_none() && bulk.export.is_none() {
            return ctx.select_volume(task, trace);
        }
        let text = format!("{} {} {}", task.family, task.product, task.name);
        let wants_import = text.contains("IMPORT") || task.sens_code() == Some(SensCode::Arrivee);
        let wants_export = text.contains("EXPORT") || task.sens_code() == Some(SensCode::Depart);

        let (volume, source) = match (wants_import, wants_export) {
            (true, false) => (bulk.import.unwrap_or(0.0), "bulk.import"),
            (false, true) => (bulk.export.unwrap_or(0.0), "bulk.export"),
            _ => (
                bulk.import.unwrap_or(0.0) + bulk.export.unwrap_or(0.0),
                "bulk.import+export",
            ),
        };
        trace.record(step::VOLUME, format!("{} [{source}]", fmt_num(volume)), volume);
        VolumeSelection::Resolved {
            volume,
            source: source.to_string(),
        }
    }

    fn secondary_coefficient(
        &self,
        _ctx: &StepContext<'_>,
        _task: &TaskView<'_>,
        _trace: &mut Trace,
    ) -> f64 {
        1.0
    }

    fn is_forfeit(&self, ctx: &StepContext<'_>, task: &TaskView<'_>) -> bool {
        task.unit.contains("CAMION") || ctx.is_forfeit(task)
    }

    fn convert_units(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        volume: f64,
        trace: &mut Trace,
    ) -> f64 {
        let p = &ctx.params.cndp;
        let pct = |field: &str, v: Option<f64>| normalize_opt_percent(field, v).ok().flatten();
        if task.unit.contains("SAC") {
            let share = scale(trace, "pct_sac", pct("cndp.pct_sac", p.pct_sac));
            let per_sac = p.colis_par_sac.or(ctx.coefficients().colis_amana_par_sac);
            divide_by(trace, volume * share, per_sac, "colis par sac")
        } else if task.unit.contains("COLIS") {
            volume * scale(trace, "pct_ed", pct("cndp.pct_ed", p.pct_ed))
        } else {
            ctx.convert_units(task, volume, trace)
        }
    }
}

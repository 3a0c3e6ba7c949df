//! CCI archetype (international mail centre).
//!
//! Volume is selected from the task's family and product only: the
//! product names the flux (CO or CR), the family names the direction.
//! CO and CR carry their own bundle size and phase-scoped percentages.
//! Daily division is monthly: 12 months of 22 working days.

use super::{Archetype, WorkloadVariant};
use crate::{
    error::WorkloadResult,
    normalize::normalize_opt_percent,
    params::{CciParams, EngineParams},
    reference::SensCode,
    rules::{divide_by, flux_from_text, fmt_num, scale, step, DayDivisor, StepContext, TaskView, VolumeSelection},
    trace::Trace,
    types::MONTHLY_WORKING_DAYS,
};

pub struct CciVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MailFlux {
    Co,
    Cr,
}

impl MailFlux {
    fn of(task: &TaskView<'_>) -> Option<Self> {
        let code = flux_from_text(&task.product).or_else(|| task.flux.clone())?;
        match code.as_str() {
            "CO" => Some(Self::Co),
            "CR" => Some(Self::Cr),
            _ => None,
        }
    }

    fn code(self) -> &'static str {
        match self {
            Self::Co => "CO",
            Self::Cr => "CR",
        }
    }
}

/// Percent-normalised CCI parameters for one flux.
struct FluxParams {
    liasse: Option<f64>,
    retour: Option<f64>,
    reclam: Option<f64>,
    annotes: Option<f64>,
}

fn flux_params(p: &CciParams, flux: MailFlux) -> FluxParams {
    let pct = |v: Option<f64>| normalize_opt_percent("cci", v).ok().flatten();
    match flux {
        MailFlux::Co => FluxParams {
            liasse: p.nb_courrier_liasse_co,
            retour: pct(p.pct_retour_co),
            reclam: pct(p.pct_reclam_co),
            annotes: pct(p.annotes_co),
        },
        MailFlux::Cr => FluxParams {
            liasse: p.nb_courrier_liasse_cr,
            retour: pct(p.pct_retour_cr),
            reclam: pct(p.pct_reclam_cr),
            annotes: pct(p.annotes_cr),
        },
    }
}

fn sens_from_family(family: &str) -> Option<SensCode> {
    if ["ARRIVE", "RECEPTION", "IMPORT"].iter().any(|t| family.contains(t)) {
        Some(SensCode::Arrivee)
    } else if ["DEPART", "EXPORT", "EXPEDITION"].iter().any(|t| family.contains(t)) {
        Some(SensCode::Depart)
    } else {
        None
    }
}

impl WorkloadVariant for CciVariant {
    fn archetype(&self) -> Archetype {
        Archetype::Cci
    }

    fn validate(&self, params: &EngineParams) -> WorkloadResult<()> {
        let p = &params.cci;
        for (field, value) in [
            ("cci.pct_retour_co", p.pct_retour_co),
            ("cci.pct_retour_cr", p.pct_retour_cr),
            ("cci.pct_reclam_co", p.pct_reclam_co),
            ("cci.pct_reclam_cr", p.pct_reclam_cr),
            ("cci.annotes_co", p.annotes_co),
            ("cci.annotes_cr", p.annotes_cr),
        ] {
            normalize_opt_percent(field, value)?;
        }
        Ok(())
    }

    fn select_volume(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> VolumeSelection {
        let Some(flux) = MailFlux::of(task) else {
            return VolumeSelection::Unresolvable {
                reason: format!(
                    "task {} product '{}' names neither CO nor CR",
                    task.task().id,
                    task.task().product
                ),
            };
        };
        let (volume, source) = match sens_from_family(&task.family) {
            Some(sens) => (
                ctx.volumes.get_aggregated_volume(flux.code(), sens.as_str()),
                format!("{}/{}", flux.code(), sens.as_str()),
            ),
            None => (
                ctx.volumes.get_flux_total(flux.code()),
                format!("{}/*", flux.code()),
            ),
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
        let Some(flux) = MailFlux::of(task) else {
            return 1.0;
        };
        let p = flux_params(&ctx.params.cci, flux);
        let code = flux.code().to_lowercase();
        let phase = &task.phase;
        let mut factor = 1.0;
        if phase.contains("RETOUR") {
            factor *= scale(trace, &format!("pct_retour_{code}"), p.retour);
        }
        if phase.contains("ANNOTE") {
            factor *= scale(trace, &format!("annotes_{code}"), p.annotes);
        }
        if phase.contains("RECLAMATION") {
            factor *= scale(trace, &format!("pct_reclam_{code}"), p.reclam);
        }
        factor
    }

    fn convert_units(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        volume: f64,
        trace: &mut Trace,
    ) -> f64 {
        if task.unit.contains("LIASSE") {
            if let Some(flux) = MailFlux::of(task) {
                let p = flux_params(&ctx.params.cci, flux);
                let label = format!("courriers {} par liasse", flux.code().to_lowercase());
                return divide_by(trace, volume, p.liasse, &label);
            }
        }
        ctx.convert_units(task, volume, trace)
    }

    fn day_divisor(&self, _ctx: &StepContext<'_>, _task: &TaskView<'_>) -> DayDivisor {
        DayDivisor::plain(12.0 * MONTHLY_WORKING_DAYS, "12 × 22 j")
    }
}

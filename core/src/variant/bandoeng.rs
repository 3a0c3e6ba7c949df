//! Bandoeng archetype.
//!
//! Volumes come from the nested `grid_values` tree (e.g.
//! `amana.recu.gc.local`) through a product-name dictionary instead of
//! the mapping rules. The tree already separates local and axes volumes,
//! so no percentage split is applied. Coefficients are selected by phase
//! tokens rather than by family.

use super::{Archetype, WorkloadVariant};
use crate::{
    normalize::normalize_label,
    rules::{fmt_num, scale, step, AxesShare, DayDivisor, StepContext, TaskView, VolumeSelection},
    trace::Trace,
    volume::{node_at, node_value, sum_keyed},
};

pub struct BandoengVariant;

impl BandoengVariant {
    fn grid_path<'c>(&self, ctx: &'c StepContext<'_>, task: &TaskView<'_>) -> Option<&'c str> {
        ctx.config
            .bandoeng_products
            .iter()
            .find(|(product, _)| normalize_label(product) == task.product)
            .map(|(_, path)| path.as_str())
    }
}

impl WorkloadVariant for BandoengVariant {
    fn archetype(&self) -> Archetype {
        Archetype::Bandoeng
    }

    fn select_volume(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> VolumeSelection {
        let Some(path) = self.grid_path(ctx, task) else {
            // Products outside the dictionary go through the mapping rules.
            return ctx.select_volume(task, trace);
        };
        let Some(node) = ctx.volumes.grid().and_then(|grid| node_at(grid, path)) else {
            return VolumeSelection::Unresolvable {
                reason: format!(
                    "task {} product '{}' has no grid_values.{path}",
                    task.task().id,
                    task.task().product
                ),
            };
        };

        let keyed = match ctx.axes_share(task) {
            Some(AxesShare::Local) => sum_keyed(node, "local").map(|v| (v, "local")),
            Some(AxesShare::Axes) => sum_keyed(node, "axes").map(|v| (v, "axes")),
            None => None,
        };
        let (volume, source) = match keyed {
            Some((v, key)) => (v, format!("grid_values.{path}.*.{key}")),
            None => (node_value(node).unwrap_or(0.0), format!("grid_values.{path}")),
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
        let c = ctx.coefficients();
        let phase = &task.phase;
        let mut factor = 1.0;
        if phase.contains("CIRCUL_GEO") {
            factor *= ctx.complexity(trace);
        }
        if phase.contains("CIRCUL_COLLECT") {
            factor *= scale(trace, "pct_collecte", c.pct_collecte);
        }
        if phase.contains("CIRCUL_MARCH") {
            factor *= scale(trace, "pct_marche_ordinaire", c.pct_marche_ordinaire);
        }
        if phase.contains("RETOUR") {
            factor *= scale(trace, "pct_retour", c.pct_retour);
        }
        factor *= ctx.scope_coefficient(phase, trace);
        factor * ctx.ed_retention(task, trace)
    }

    fn day_divisor(&self, ctx: &StepContext<'_>, _task: &TaskView<'_>) -> DayDivisor {
        ctx.annual_or_seasonal()
    }
}

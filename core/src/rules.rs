//! Generic rule engine — the per-task pipeline.
//!
//! PIPELINE (fixed order, see `run_task`):
//!   1. Resolve raw annual volume          (variant: select_volume)
//!   2. Axes / hors-axes split             (variant: select_volume)
//!   3. Secondary coefficients             (variant: secondary_coefficient)
//!   4. Unit conversion                    (variant: convert_units / is_forfeit)
//!   5. Base-calcul percent
//!   6. Daily division                     (variant: day_divisor)
//!   7. Integer truncation
//!   8. Seconds per unit
//!   9. Productivity
//!  10. Shift multiplier                   (variant: applies_shift)
//!
//! The step primitives are methods on `StepContext`. Variants override a
//! step by overriding the matching `WorkloadVariant` method and usually
//! fall back to these primitives for everything else.

use crate::{
    config::EngineConfig,
    model::{Task, TaskRow},
    normalize::{contains_any, normalize_label},
    params::EngineParams,
    reference::{ReferenceCatalogue, SensCode},
    resolver::VolumeResolver,
    trace::{TaskStatus, Trace},
    types::{PositionId, TaskId, SECONDS_PER_HOUR},
    variant::WorkloadVariant,
    volume::{Coefficients, VolumeContext},
};

/// Trace step names.
pub mod step {
    pub const EXCLUDED: &str = "excluded";
    pub const VOLUME: &str = "volume";
    pub const AXES: &str = "axes";
    pub const COEFFICIENT: &str = "coefficient";
    pub const UNIT: &str = "unit";
    pub const FORFEIT: &str = "forfeit";
    pub const BASE_CALCUL: &str = "base_calcul";
    pub const DAYS: &str = "days";
    pub const TRUNCATE: &str = "truncate";
    pub const DURATION: &str = "duration";
    pub const HOURS: &str = "hours";
    pub const PRODUCTIVITY: &str = "productivity";
    pub const SHIFT: &str = "shift";
}

/// A task with every string it is matched on already normalised and its
/// reference ids translated to codes.
#[derive(Debug, Clone)]
pub struct TaskView<'a> {
    pub row: TaskRow<'a>,
    pub name: String,
    pub phase: String,
    pub unit: String,
    pub family: String,
    pub product: String,
    pub role: String,
    pub state: String,
    pub flux: Option<String>,
    pub sens: Option<String>,
    pub segment: Option<String>,
}

impl<'a> TaskView<'a> {
    /// Fails with a message when the task references an id the catalogue
    /// does not know.
    pub fn new(row: TaskRow<'a>, catalogue: &ReferenceCatalogue) -> Result<Self, String> {
        let task = row.task;
        let missing = |what: &str, id: i64| {
            format!("task {} '{}' references unknown {what} id {id}", task.id, task.name)
        };
        let flux = match task.flux_id {
            Some(id) => Some(catalogue.flux_code(id).ok_or_else(|| missing("flux", id))?),
            None => None,
        };
        let sens = match task.sens_id {
            Some(id) => Some(catalogue.sens_code(id).ok_or_else(|| missing("sens", id))?),
            None => None,
        };
        let segment = match task.segment_id {
            Some(id) => Some(catalogue.segment_code(id).ok_or_else(|| missing("segment", id))?),
            None => None,
        };
        Ok(Self {
            row,
            name: normalize_label(&task.name),
            phase: normalize_label(&task.phase),
            unit: normalize_label(&task.unit),
            family: normalize_label(&task.family),
            product: normalize_label(&task.product),
            role: normalize_label(&row.position.label),
            state: normalize_label(&task.state),
            flux: flux.map(str::to_string),
            sens: sens.map(str::to_string),
            segment: segment.map(str::to_string),
        })
    }

    pub fn task(&self) -> &'a Task {
        self.row.task
    }

    pub fn sens_code(&self) -> Option<SensCode> {
        self.sens.as_deref().and_then(SensCode::parse)
    }

    /// Flux code of the task, or the one its product names.
    pub fn flux_code(&self) -> Option<String> {
        if let Some(flux) = &self.flux {
            return Some(flux.clone());
        }
        flux_from_text(&self.product)
    }

    pub fn is_amana(&self) -> bool {
        self.flux_code().as_deref() == Some("AMANA")
    }
}

/// Infer a flux code from a product or family label.
pub fn flux_from_text(text: &str) -> Option<String> {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |w: &str| words.contains(&w);
    if text.contains("AMANA") {
        Some("AMANA".into())
    } else if text.contains("BARKIA") {
        Some("EBARKIA".into())
    } else if has("LRH") {
        Some("LRH".into())
    } else if has("CR") || text.contains("RECOMMANDE") {
        Some("CR".into())
    } else if has("CO") || text.contains("ORDINAIRE") {
        Some("CO".into())
    } else {
        None
    }
}

/// True when `token` appears in `text` as whole words.
pub fn contains_word(text: &str, token: &str) -> bool {
    let pad = |s: &str| {
        let spaced: String = s
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect();
        format!(" {} ", spaced.split_whitespace().collect::<Vec<_>>().join(" "))
    };
    let token = normalize_label(token);
    !token.is_empty() && pad(text).contains(&pad(&token))
}

#[derive(Debug, Clone, PartialEq)]
pub enum VolumeSelection {
    Resolved { volume: f64, source: String },
    Unresolvable { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxesShare {
    /// Hors-axes: `1 − pct_axes`.
    Local,
    /// Axes: `pct_axes`.
    Axes,
}

/// Daily volume = annual × `seasonal` ÷ `divisor`.
#[derive(Debug, Clone, PartialEq)]
pub struct DayDivisor {
    pub divisor: f64,
    pub seasonal: f64,
    pub label: String,
}

impl DayDivisor {
    pub fn plain(divisor: f64, label: impl Into<String>) -> Self {
        Self {
            divisor,
            seasonal: 1.0,
            label: label.into(),
        }
    }

    pub fn daily(&self, annual: f64) -> f64 {
        if self.divisor > 0.0 {
            annual * self.seasonal / self.divisor
        } else {
            0.0
        }
    }
}

/// Everything a pipeline step may read. Built once per centre request.
pub struct StepContext<'a> {
    pub catalogue: &'a ReferenceCatalogue,
    pub config: &'a EngineConfig,
    pub volumes: &'a VolumeContext,
    pub params: &'a EngineParams,
}

impl<'a> StepContext<'a> {
    pub fn coefficients(&self) -> &Coefficients {
        self.volumes.coefficients()
    }

    /// Reason the task is ignored, if it is.
    pub fn exclusion(&self, task: &TaskView<'_>) -> Option<String> {
        if contains_any(&task.state, &self.config.excluded_states) {
            return Some(format!("state {} ignored", task.task().state));
        }
        if contains_any(&task.role, &self.config.excluded_roles) {
            return Some(format!("role {} excluded", task.row.position.label));
        }
        None
    }

    // ── Step 1: resolution ───────────────────────────────────────

    pub fn resolve_volume(&self, task: &TaskView<'_>, trace: &mut Trace) -> VolumeSelection {
        let resolver = VolumeResolver::new(self.catalogue, self.volumes);
        match resolver.resolve(task.task()) {
            Some(resolution) => {
                if resolution.volume == 0.0 {
                    trace.warn(format!(
                        "task {} resolved to {} which holds no volume",
                        task.task().id,
                        resolution.source
                    ));
                }
                trace.record(
                    step::VOLUME,
                    format!("{} [{}]", fmt_num(resolution.volume), resolution.source),
                    resolution.volume,
                );
                VolumeSelection::Resolved {
                    volume: resolution.volume,
                    source: resolution.source,
                }
            }
            None => VolumeSelection::Unresolvable {
                reason: format!(
                    "task {} '{}' matches no volume mapping rule",
                    task.task().id,
                    task.task().name
                ),
            },
        }
    }

    // ── Step 2: axes split ───────────────────────────────────────

    pub fn axes_share(&self, task: &TaskView<'_>) -> Option<AxesShare> {
        if contains_any(&task.family, &self.config.local_families) {
            Some(AxesShare::Local)
        } else if contains_any(&task.family, &self.config.axes_families)
            || contains_any(&task.name, &self.config.axes_families)
        {
            Some(AxesShare::Axes)
        } else {
            None
        }
    }

    /// Split the (flux, sens) aggregated volume when the task belongs to an
    /// axes or hors-axes family. Other tasks keep `volume`.
    pub fn apply_axes_split(&self, task: &TaskView<'_>, volume: f64, trace: &mut Trace) -> f64 {
        let Some(share) = self.axes_share(task) else {
            return volume;
        };
        let (Some(sens), Some(flux)) = (task.sens_code(), task.flux_code()) else {
            return volume;
        };
        let Some(pct_axes) = self.coefficients().pct_axes(sens) else {
            return volume;
        };
        let aggregated = self.volumes.get_aggregated_volume(&flux, sens.as_str());
        let base = if aggregated > 0.0 { aggregated } else { volume };
        let factor = match share {
            AxesShare::Local => 1.0 - pct_axes,
            AxesShare::Axes => pct_axes,
        };
        let label = match share {
            AxesShare::Local => "hors-axes",
            AxesShare::Axes => "axes",
        };
        trace.record(
            step::AXES,
            format!("{} {flux}/{} ×{} {label}", fmt_num(base), sens.as_str(), fmt_num(factor)),
            factor,
        );
        base * factor
    }

    /// Steps 1 and 2 together.
    pub fn select_volume(&self, task: &TaskView<'_>, trace: &mut Trace) -> VolumeSelection {
        match self.resolve_volume(task, trace) {
            VolumeSelection::Resolved { volume, source } => VolumeSelection::Resolved {
                volume: self.apply_axes_split(task, volume, trace),
                source,
            },
            unresolved => unresolved,
        }
    }

    // ── Step 3: secondary coefficients ───────────────────────────

    pub fn secondary_coefficient(&self, task: &TaskView<'_>, trace: &mut Trace) -> f64 {
        let c = self.coefficients();
        let mut factor = 1.0;

        if task.family.contains("COLLECTE") {
            factor *= apply_pct(trace, "pct_collecte", c.pct_collecte);
        }
        if task.family.contains("MARCHE ORDINAIRE") {
            factor *= apply_pct(trace, "pct_marche_ordinaire", c.pct_marche_ordinaire);
        }
        if contains_any(&task.name, &self.config.retour_tokens) {
            factor *= apply_pct(trace, "pct_retour", c.pct_retour);
        }
        factor *= self.scope_coefficient(&task.phase, trace);
        if self.complexity_applies(task) {
            factor *= self.complexity(trace);
        }
        factor * self.ed_retention(task, trace)
    }

    /// International before national: the former contains the latter.
    pub fn scope_coefficient(&self, phase: &str, trace: &mut Trace) -> f64 {
        let c = self.coefficients();
        if phase.contains("INTERNATIONAL") {
            apply_pct(trace, "pct_international", c.pct_international)
        } else if phase.contains("NATIONAL") {
            apply_pct(trace, "pct_national", c.pct_national)
        } else {
            1.0
        }
    }

    /// "Distribution" itself, or a distribution-family task counted in
    /// mail units.
    pub fn complexity_applies(&self, task: &TaskView<'_>) -> bool {
        if task.name == "DISTRIBUTION" {
            return true;
        }
        let family_match = self
            .config
            .distribution_families
            .iter()
            .any(|f| contains_word(&task.family, f));
        family_match && contains_any(&task.unit, &self.config.complexity_units)
    }

    pub fn complexity(&self, trace: &mut Trace) -> f64 {
        let c = self.coefficients();
        let factor = c.taux_complexite * c.nature_geo;
        if factor != 1.0 {
            trace.record(
                step::COEFFICIENT,
                format!(
                    "×{} complexité ×{} géo",
                    fmt_num(c.taux_complexite),
                    fmt_num(c.nature_geo)
                ),
                factor,
            );
        }
        factor
    }

    /// AMANA keeps the in-sac share `1 − ed_percent`.
    pub fn ed_retention(&self, task: &TaskView<'_>, trace: &mut Trace) -> f64 {
        let ed = self.coefficients().ed_percent;
        if !task.is_amana() || ed <= 0.0 {
            return 1.0;
        }
        let factor = 1.0 - ed;
        trace.record(
            step::COEFFICIENT,
            format!("×{} (1 − ed {})", fmt_num(factor), fmt_num(ed)),
            factor,
        );
        factor
    }

    // ── Step 4: units ────────────────────────────────────────────

    pub fn is_forfeit(&self, task: &TaskView<'_>) -> bool {
        self.config
            .forfeit_units
            .iter()
            .any(|u| normalize_label(u) == task.unit)
    }

    pub fn convert_units(&self, task: &TaskView<'_>, volume: f64, trace: &mut Trace) -> f64 {
        let c = self.coefficients();
        if task.unit.contains("SAC") {
            let flux = task.flux_code().unwrap_or_default();
            return divide_by(trace, volume, c.par_sac(&flux), &format!("{} par sac", flux_label(&flux)));
        }
        if task.unit.contains("CAISSON") {
            return divide_by(trace, volume, Some(c.cr_par_caisson), "cr par caisson");
        }
        if task.unit.contains("COLLECTE") {
            return divide_by(trace, volume, c.colis_par_collecte, "colis par collecte");
        }
        let factor = self.catalogue.unit_factor(&task.unit);
        if factor != 1.0 {
            trace.record(
                step::UNIT,
                format!("×{} unité {}", fmt_num(factor), task.unit),
                factor,
            );
        }
        volume * factor
    }

    // ── Step 6: working days ─────────────────────────────────────

    pub fn day_divisor(&self, task: &TaskView<'_>) -> DayDivisor {
        if task.phase.contains("DAY_350") {
            return DayDivisor::plain(350.0, "350 j");
        }
        if task.phase.contains("DAY_24") {
            return DayDivisor::plain(24.0, "24 j");
        }
        self.annual_or_seasonal()
    }

    /// `nb_jours_ouvres_an`, or the month share over 22 days in
    /// seasonality mode.
    pub fn annual_or_seasonal(&self) -> DayDivisor {
        let c = self.coefficients();
        match c.pct_mois {
            Some(pct) => DayDivisor {
                divisor: crate::types::MONTHLY_WORKING_DAYS,
                seasonal: pct,
                label: format!("×{} mois ÷ 22 j", fmt_num(pct)),
            },
            None => DayDivisor::plain(
                c.nb_jours_ouvres_an,
                format!("{} j", fmt_num(c.nb_jours_ouvres_an)),
            ),
        }
    }

    // ── Steps 7, 8, 10 ───────────────────────────────────────────

    pub fn is_truncated(&self, task: &TaskView<'_>) -> bool {
        contains_any(&task.name, &self.config.truncated_tasks)
    }

    /// `mean_seconds` when positive, else minutes through the rounding
    /// table.
    pub fn seconds_per_unit(&self, task: &TaskView<'_>) -> f64 {
        let t = task.task();
        match (t.mean_seconds, t.mean_minutes) {
            (Some(s), _) if s > 0.0 => s,
            (_, Some(m)) if m > 0.0 => self.config.seconds_from_minutes(m),
            _ => 0.0,
        }
    }

    pub fn applies_shift(&self, task: &TaskView<'_>) -> bool {
        self.params.shift() > 1.0 && contains_any(&task.role, &self.config.operational_roles)
    }
}

fn apply_pct(trace: &mut Trace, name: &str, pct: Option<f64>) -> f64 {
    match pct {
        Some(p) => {
            trace.record(step::COEFFICIENT, format!("×{} {name}", fmt_num(p)), p);
            p
        }
        None => 1.0,
    }
}

/// Divide by a per-unit ratio; an absent ratio leaves the volume in items.
pub fn divide_by(trace: &mut Trace, volume: f64, ratio: Option<f64>, label: &str) -> f64 {
    match ratio.filter(|r| *r > 0.0) {
        Some(r) => {
            trace.record(step::UNIT, format!("÷{} {label}", fmt_num(r)), 1.0 / r);
            volume / r
        }
        None => {
            trace.warn(format!("no ratio for {label}; volume left unconverted"));
            volume
        }
    }
}

/// Multiply by a factor and record it under the coefficient step.
pub fn scale(trace: &mut Trace, label: &str, factor: Option<f64>) -> f64 {
    apply_pct(trace, label, factor)
}

fn flux_label(flux: &str) -> String {
    if flux.is_empty() {
        "items".to_string()
    } else {
        flux.to_lowercase()
    }
}

/// Up to four decimals, trailing zeros trimmed.
pub fn fmt_num(v: f64) -> String {
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    pub position_id: PositionId,
    pub status: TaskStatus,
    pub annual_volume: f64,
    pub daily_volume: f64,
    pub seconds_per_unit: f64,
    pub hours: f64,
    pub source: Option<String>,
    pub trace: Trace,
}

impl TaskOutcome {
    fn skipped(row: TaskRow<'_>, status: TaskStatus, trace: Trace) -> Self {
        Self {
            task_id: row.task.id,
            position_id: row.position.id,
            status,
            annual_volume: 0.0,
            daily_volume: 0.0,
            seconds_per_unit: 0.0,
            hours: 0.0,
            source: None,
            trace,
        }
    }
}

/// Run the full pipeline for one task with the given variant.
pub fn run_task(variant: &dyn WorkloadVariant, ctx: &StepContext<'_>, row: TaskRow<'_>) -> TaskOutcome {
    let mut trace = Trace::default();
    let task = match TaskView::new(row, ctx.catalogue) {
        Ok(view) => view,
        Err(reason) => {
            trace.warn(reason);
            return TaskOutcome::skipped(row, TaskStatus::ReferenceMissing, trace);
        }
    };
    if let Some(reason) = ctx.exclusion(&task) {
        trace.record(step::EXCLUDED, reason, 0.0);
        return TaskOutcome::skipped(row, TaskStatus::Excluded, trace);
    }

    let base = row.task.base_calcul() / 100.0;
    let mut source = None;
    let annual;
    let mut daily;

    if variant.is_forfeit(ctx, &task) {
        // One occurrence per working day, whatever the divisor.
        annual = ctx.coefficients().nb_jours_ouvres_an;
        trace.record(step::FORFEIT, format!("forfait {} = 1/j", task.unit), 1.0);
        daily = base;
        if base != 1.0 {
            trace.record(step::BASE_CALCUL, format!("×{} base", fmt_num(base)), base);
        }
    } else {
        let raw = match variant.select_volume(ctx, &task, &mut trace) {
            VolumeSelection::Resolved { volume, source: s } => {
                source = Some(s);
                volume
            }
            VolumeSelection::Unresolvable { reason } => {
                trace.warn(reason);
                return TaskOutcome::skipped(row, TaskStatus::Unresolvable, trace);
            }
        };
        let coefficient = variant.secondary_coefficient(ctx, &task, &mut trace);
        annual = variant.convert_units(ctx, &task, raw * coefficient, &mut trace);

        let based = annual * base;
        if base != 1.0 {
            trace.record(step::BASE_CALCUL, format!("×{} base", fmt_num(base)), base);
        }

        let divisor = variant.day_divisor(ctx, &task);
        daily = divisor.daily(based);
        trace.record(
            step::DAYS,
            format!("÷ {} = {}/j", divisor.label, fmt_num(daily)),
            divisor.divisor,
        );
    }

    if ctx.is_truncated(&task) {
        let floored = daily.floor();
        trace.record(step::TRUNCATE, format!("⌊{}⌋ = {}", fmt_num(daily), fmt_num(floored)), floored);
        daily = floored;
    }

    let seconds = ctx.seconds_per_unit(&task);
    if seconds <= 0.0 {
        trace.warn(format!("task {} '{}' has no duration", row.task.id, row.task.name));
    }
    trace.record(step::DURATION, format!("× {} s", fmt_num(seconds)), seconds);

    let mut hours = daily * seconds / SECONDS_PER_HOUR;
    trace.record(step::HOURS, format!("= {} h", fmt_num(hours)), hours);

    let productivite = ctx.params.productivite();
    if productivite > 0.0 && productivite != 100.0 {
        let factor = 100.0 / productivite;
        hours *= factor;
        trace.record(
            step::PRODUCTIVITY,
            format!("×100/{} productivité", fmt_num(productivite)),
            factor,
        );
    }

    if variant.applies_shift(ctx, &task) {
        let shift = ctx.params.shift();
        hours *= shift;
        trace.record(step::SHIFT, format!("×{} shift", fmt_num(shift)), shift);
    }

    log::debug!(
        "task {} [{}] {} → {:.4} h",
        row.task.id,
        variant.archetype().as_str(),
        row.task.name,
        hours
    );

    TaskOutcome {
        task_id: row.task.id,
        position_id: row.position.id,
        status: TaskStatus::Computed,
        annual_volume: annual,
        daily_volume: daily,
        seconds_per_unit: seconds,
        hours,
        source,
        trace,
    }
}

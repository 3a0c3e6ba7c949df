//! Variant trait and registry.
//!
//! RULE: every centre archetype implements WorkloadVariant.
//! A variant overrides only the pipeline steps it changes; the provided
//! methods delegate to the generic primitives on `StepContext`.
//! Dispatch is by centre id (then centre label) through the registry;
//! centres that match no archetype use the generic variant.

mod bandoeng;
mod cci;
mod ccp;
mod cna;
mod cndp;

pub use bandoeng::BandoengVariant;
pub use cci::CciVariant;
pub use ccp::CcpVariant;
pub use cna::CnaVariant;
pub use cndp::CndpVariant;

use crate::{
    config::EngineConfig,
    error::WorkloadResult,
    model::Centre,
    normalize::normalize_label,
    params::EngineParams,
    rules::{DayDivisor, StepContext, TaskView, VolumeSelection},
    trace::Trace,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Generic,
    Bandoeng,
    Cci,
    Ccp,
    Cna,
    Cndp,
}

impl Archetype {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Bandoeng => "bandoeng",
            Self::Cci => "cci",
            Self::Ccp => "ccp",
            Self::Cna => "cna",
            Self::Cndp => "cndp",
        }
    }
}

/// The contract every archetype fulfils.
pub trait WorkloadVariant: Send + Sync {
    fn archetype(&self) -> Archetype;

    /// Reject archetype parameters that are out of bounds. Called once per
    /// request, before any task runs.
    fn validate(&self, _params: &EngineParams) -> WorkloadResult<()> {
        Ok(())
    }

    /// Steps 1–2: annual volume for the task.
    fn select_volume(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> VolumeSelection {
        ctx.select_volume(task, trace)
    }

    /// Step 3: product of the applicable secondary coefficients.
    fn secondary_coefficient(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        trace: &mut Trace,
    ) -> f64 {
        ctx.secondary_coefficient(task, trace)
    }

    /// Step 4: units whose volume is one occurrence per day.
    fn is_forfeit(&self, ctx: &StepContext<'_>, task: &TaskView<'_>) -> bool {
        ctx.is_forfeit(task)
    }

    /// Step 4: convert items to handling units.
    fn convert_units(
        &self,
        ctx: &StepContext<'_>,
        task: &TaskView<'_>,
        volume: f64,
        trace: &mut Trace,
    ) -> f64 {
        ctx.convert_units(task, volume, trace)
    }

    /// Step 6: working-day divisor.
    fn day_divisor(&self, ctx: &StepContext<'_>, task: &TaskView<'_>) -> DayDivisor {
        ctx.day_divisor(task)
    }

    /// Step 10: whether the shift multiplier applies.
    fn applies_shift(&self, ctx: &StepContext<'_>, task: &TaskView<'_>) -> bool {
        ctx.applies_shift(task)
    }
}

/// The default engine: every step is the generic primitive.
pub struct GenericVariant;

impl WorkloadVariant for GenericVariant {
    fn archetype(&self) -> Archetype {
        Archetype::Generic
    }
}

pub struct VariantRegistry {
    generic: GenericVariant,
    variants: Vec<Box<dyn WorkloadVariant>>,
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl VariantRegistry {
    /// Registry with no archetype: every centre runs the generic engine.
    pub fn empty() -> Self {
        Self {
            generic: GenericVariant,
            variants: Vec::new(),
        }
    }

    /// Registry with every known archetype.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(BandoengVariant));
        registry.register(Box::new(CciVariant));
        registry.register(Box::new(CcpVariant));
        registry.register(Box::new(CnaVariant));
        registry.register(Box::new(CndpVariant));
        registry
    }

    /// Register a variant. A later registration for the same archetype
    /// replaces the earlier one.
    pub fn register(&mut self, variant: Box<dyn WorkloadVariant>) {
        let archetype = variant.archetype();
        self.variants.retain(|v| v.archetype() != archetype);
        self.variants.push(variant);
    }

    /// Archetype configured for a centre: by id, then by label token.
    pub fn archetype_for(&self, centre: &Centre, config: &EngineConfig) -> Archetype {
        if let Some(archetype) = config.archetypes.get(&centre.id) {
            return *archetype;
        }
        let label = normalize_label(&centre.label);
        config
            .archetype_labels
            .iter()
            .find(|(token, _)| {
                let token = normalize_label(token);
                !token.is_empty() && label.contains(&token)
            })
            .map(|(_, archetype)| *archetype)
            .unwrap_or(Archetype::Generic)
    }

    pub fn for_centre(&self, centre: &Centre, config: &EngineConfig) -> &dyn WorkloadVariant {
        let archetype = self.archetype_for(centre, config);
        let chosen = self
            .variants
            .iter()
            .find(|v| v.archetype() == archetype)
            .map(|v| v.as_ref());
        match chosen {
            Some(variant) => {
                log::debug!("centre {} dispatched to {}", centre.id, archetype.as_str());
                variant
            }
            None => {
                if archetype != Archetype::Generic {
                    log::warn!(
                        "centre {} maps to {} but no such variant is registered",
                        centre.id,
                        archetype.as_str()
                    );
                }
                &self.generic
            }
        }
    }
}

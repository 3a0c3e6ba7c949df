//! The workload engine: the entry point for every calculation.
//!
//! EXECUTION ORDER (per centre request):
//!   1. Merge parameters: config defaults < payload scalars < request params
//!   2. Validate the archetype parameters and build the VolumeContext
//!   3. Pre-join the centre's tasks into rows
//!   4. Run the variant pipeline on every row
//!   5. Aggregate into positions, then the centre
//!
//! RULES:
//!   - The catalogue and organisation are immutable after construction.
//!   - Each request owns its VolumeContext; nothing escapes the request.
//!   - Input validation errors raise; per-task anomalies only warn.

use crate::{
    aggregate::{CentreAggregation, CentreResult, DirectionResult, NationalResult},
    config::EngineConfig,
    error::{WorkloadError, WorkloadResult},
    fte::FteCalculator,
    model::{Centre, Organisation, Position},
    params::EngineParams,
    reference::ReferenceCatalogue,
    rules::{run_task, StepContext},
    types::{CentreId, DirectionId, PositionId},
    variant::{VariantRegistry, WorkloadVariant},
    volume::{VolumeContext, VolumeInput},
};
use std::collections::BTreeMap;

pub struct WorkloadEngine {
    catalogue:    ReferenceCatalogue,
    organisation: Organisation,
    config:       EngineConfig,
    registry:     VariantRegistry,
}

impl WorkloadEngine {
    /// Build an engine with every known archetype registered.
    pub fn new(
        catalogue: ReferenceCatalogue,
        organisation: Organisation,
        config: EngineConfig,
    ) -> WorkloadResult<Self> {
        Self::with_registry(catalogue, organisation, config, VariantRegistry::standard())
    }

    pub fn with_registry(
        catalogue: ReferenceCatalogue,
        organisation: Organisation,
        config: EngineConfig,
        registry: VariantRegistry,
    ) -> WorkloadResult<Self> {
        if let Some(rule) = catalogue.rules().iter().find(|r| r.ui_path.trim().is_empty()) {
            return Err(WorkloadError::configuration(format!(
                "mapping rule {} has an empty ui_path",
                rule.id
            )));
        }
        log::info!(
            "engine ready: {} centres, {} tasks, {} mapping rules",
            organisation.centres().count(),
            organisation.task_count(),
            catalogue.rules().len()
        );
        Ok(Self {
            catalogue,
            organisation,
            config,
            registry,
        })
    }

    pub fn catalogue(&self) -> &ReferenceCatalogue {
        &self.catalogue
    }

    pub fn organisation(&self) -> &Organisation {
        &self.organisation
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &VariantRegistry {
        &self.registry
    }

    /// One centre restricted to one of its positions.
    pub fn compute_position(
        &self,
        centre_id: CentreId,
        position_id: PositionId,
        volumes: &VolumeInput,
        params: &EngineParams,
    ) -> WorkloadResult<CentreResult> {
        let centre = self.centre(centre_id)?;
        let position = self
            .organisation
            .position(position_id)
            .filter(|p| p.centre_id == centre_id)
            .ok_or(WorkloadError::PositionNotFound { position_id })?;
        self.run_centre(centre, vec![position], Some(position_id), volumes, params)
    }

    pub fn compute_centre(
        &self,
        centre_id: CentreId,
        volumes: &VolumeInput,
        params: &EngineParams,
    ) -> WorkloadResult<CentreResult> {
        let centre = self.centre(centre_id)?;
        let positions = self.organisation.positions_of(centre_id);
        self.run_centre(centre, positions, None, volumes, params)
    }

    /// Every centre of a direction. Centres missing from
    /// `volumes_by_centre` run with an empty input.
    pub fn compute_direction(
        &self,
        direction_id: DirectionId,
        volumes_by_centre: &BTreeMap<CentreId, VolumeInput>,
        params: &EngineParams,
    ) -> WorkloadResult<DirectionResult> {
        let direction = self
            .organisation
            .direction(direction_id)
            .ok_or(WorkloadError::DirectionNotFound { direction_id })?;
        let empty = VolumeInput::default();
        let mut centres = Vec::new();
        for centre in self.organisation.centres_in_direction(direction_id) {
            let volumes = volumes_by_centre.get(&centre.id).unwrap_or(&empty);
            centres.push(self.compute_centre(centre.id, volumes, params)?.summary());
        }
        let result = DirectionResult::new(direction, centres);
        log::info!(
            "direction {direction_id} computed: {} centres, {:.2} h, {} FTE",
            result.centres.len(),
            result.totals.total_hours,
            result.totals.fte_arrondi
        );
        Ok(result)
    }

    /// Every direction, plus the centres attached to none.
    pub fn compute_national(
        &self,
        volumes_by_centre: &BTreeMap<CentreId, VolumeInput>,
        params: &EngineParams,
    ) -> WorkloadResult<NationalResult> {
        for id in volumes_by_centre.keys() {
            if self.organisation.centre(*id).is_none() {
                log::warn!("volumes supplied for unknown centre {id}; ignored");
            }
        }
        let mut directions = Vec::new();
        for direction in self.organisation.directions() {
            directions.push(self.compute_direction(direction.id, volumes_by_centre, params)?);
        }

        let empty = VolumeInput::default();
        let mut unassigned = Vec::new();
        for centre in self.organisation.centres().filter(|c| {
            c.direction_id
                .and_then(|d| self.organisation.direction(d))
                .is_none()
        }) {
            let volumes = volumes_by_centre.get(&centre.id).unwrap_or(&empty);
            unassigned.push(self.compute_centre(centre.id, volumes, params)?.summary());
        }

        let result = NationalResult::new(directions, unassigned);
        log::info!(
            "national run computed: {} centres, {:.2} h, {} FTE",
            result.centre_count(),
            result.totals.total_hours,
            result.totals.fte_arrondi
        );
        Ok(result)
    }

    // ── Internals ───────────────────────────────────────────────

    fn centre(&self, centre_id: CentreId) -> WorkloadResult<&Centre> {
        self.organisation
            .centre(centre_id)
            .ok_or(WorkloadError::CentreNotFound { centre_id })
    }

    fn run_centre(
        &self,
        centre: &Centre,
        positions: Vec<&Position>,
        only_position: Option<PositionId>,
        volumes: &VolumeInput,
        request: &EngineParams,
    ) -> WorkloadResult<CentreResult> {
        let variant = self.registry.for_centre(centre, &self.config);
        let params = self.config.defaults.overlay(request);
        variant.validate(&params)?;

        let scalars = self
            .config
            .defaults
            .scalars
            .overlay(&volumes.scalars)
            .overlay(&request.scalars);
        let context = VolumeContext::new(volumes, &scalars)?;
        let ctx = StepContext {
            catalogue: &self.catalogue,
            config: &self.config,
            volumes: &context,
            params: &params,
        };

        let rows: Vec<_> = self
            .organisation
            .task_rows(centre.id)
            .into_iter()
            .filter(|row| only_position.map_or(true, |id| row.position.id == id))
            .collect();
        let outcomes: Vec<_> = rows
            .iter()
            .map(|row| (*row, run_task(variant, &ctx, *row)))
            .collect();

        let result = CentreAggregation {
            centre,
            archetype: variant.archetype(),
            positions,
            fte: FteCalculator::from_params(&params),
            use_declared_aps: only_position.is_none(),
        }
        .finish(&outcomes);

        log::info!(
            "centre {} [{}] computed: {} tasks, {:.4} h, {:.4} FTE ({} rounded)",
            centre.id,
            result.archetype.as_str(),
            result.details_taches.len(),
            result.total_hours,
            result.fte_calcule,
            result.fte_arrondi
        );
        Ok(result)
    }
}

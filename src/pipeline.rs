//! End-to-end planning pipeline.
//!
//! Assemble the solver payload, resolve allowed vehicles, submit to the
//! solver, enrich the result with direction legs, and map it into
//! per-vehicle itineraries. The whole pipeline is blocking;
//! [`plan_in_background`] offloads it so a serving thread stays free.

use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::info;

use crate::assemble::{EntityRegistry, assemble};
use crate::directions::{self, DirectionsProvider};
use crate::error::PlanError;
use crate::mapper::{MappedPlan, map_solver_result};
use crate::matcher::match_vehicle_types;
use crate::model::PlanRequest;
use crate::solver::SolverClient;
use crate::template::Template;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Tenant/project identifier the payload is wrapped under.
    pub project_id: String,
    /// Country code passed to the directions service.
    pub country: String,
    /// Concurrent in-flight direction lookups.
    pub directions_pool_size: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            country: "uae".to_string(),
            directions_pool_size: directions::DEFAULT_POOL_SIZE,
        }
    }
}

impl PlannerConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }
}

/// The full planning pipeline over one template and a pair of external
/// collaborators.
pub struct Planner<S, D> {
    template: Template,
    registry: EntityRegistry,
    config: PlannerConfig,
    solver: S,
    directions: D,
}

impl<S, D> Planner<S, D>
where
    S: SolverClient,
    D: DirectionsProvider,
{
    pub fn new(template: Template, solver: S, directions: D, config: PlannerConfig) -> Self {
        Self {
            template,
            registry: EntityRegistry::with_defaults(),
            config,
            solver,
            directions,
        }
    }

    pub fn with_registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run one planning request end to end.
    pub fn plan(&self, request: &PlanRequest) -> Result<MappedPlan, PlanError> {
        let payload = assemble(&self.template, request, &self.registry, &self.config)?;
        let payload = match_vehicle_types(&payload)?;

        let result = self.solver.optimize(&payload)?;
        info!(routes = result.routes.len(), "solver returned");

        let legs = directions::collect_legs(&result, request, &self.config.country);
        info!(legs = legs.len(), "resolving direction legs");
        let cache = directions::resolve_directions(
            &self.directions,
            legs,
            self.config.directions_pool_size,
        )?;

        Ok(map_solver_result(&result, request, &cache)?)
    }
}

/// Run a planning request on a background thread.
///
/// The solver call is long-running and blocking; offloading it keeps the
/// calling thread free to serve other requests. The caller joins the handle
/// to receive the result or the propagated failure.
pub fn plan_in_background<S, D>(
    planner: Arc<Planner<S, D>>,
    request: PlanRequest,
) -> JoinHandle<Result<MappedPlan, PlanError>>
where
    S: SolverClient + Send + Sync + 'static,
    D: DirectionsProvider + Send + 'static,
{
    std::thread::spawn(move || planner.plan(&request))
}

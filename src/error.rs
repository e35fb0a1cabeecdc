//! Error types for payload compilation, solving, and response mapping.
//!
//! Each pipeline phase has its own error enum; [`PlanError`] is the umbrella
//! returned by the orchestrating planner. Tolerated degradations (unresolved
//! placeholders, failed direction lookups) are logged, never surfaced here.

use thiserror::Error;

/// Errors raised while loading or resolving a payload template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),

    #[error("template is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template has no 'model' object")]
    MissingModel,

    #[error("entity skeleton must contain exactly one element, found {count}")]
    SkeletonArity { count: usize },

    #[error("template references no data root")]
    NoTemplateRoot,

    #[error("template references more than one data root: {roots:?}")]
    AmbiguousTemplateRoot { roots: Vec<String> },

    #[error("empty placeholder expression")]
    EmptyPlaceholder,
}

/// Errors raised while assembling a solver request payload.
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("no entity handler registered for template key '{name}'")]
    UnknownEntity { name: String },

    #[error("no record collection named '{root}' in the input data")]
    MissingCollection { root: String },

    #[error("records collection is empty, cannot derive a planning window")]
    EmptyInput,

    #[error("malformed time window value '{value}'")]
    MalformedTimeWindow { value: String },

    #[error("payload is missing '{path}'")]
    MalformedPayload { path: &'static str },
}

/// Errors raised by the external optimization solver gateway.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("solver request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("solver returned an undecodable response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Errors raised by the directions enrichment subsystem.
///
/// Individual lookup failures are logged and excluded from the cache; only
/// conditions that prevent the whole enrichment pass end up here.
#[derive(Error, Debug)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("directions response has no usable 'directions_data' field")]
    MissingDirectionsData,

    #[error("'directions_data' string is not valid JSON: {0}")]
    MalformedDirectionsData(#[from] serde_json::Error),

    #[error("failed to build directions worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors raised while mapping a solver result into itineraries.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("invalid duration value '{value}' in solver result")]
    InvalidDuration { value: String },

    #[error("invalid timestamp '{value}' in solver result")]
    InvalidTimestamp { value: String },
}

/// Umbrella error for a full planning request.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Directions(#[from] DirectionsError),

    #[error(transparent)]
    Map(#[from] MapError),
}

impl From<TemplateError> for PlanError {
    fn from(err: TemplateError) -> Self {
        PlanError::Assemble(AssembleError::Template(err))
    }
}

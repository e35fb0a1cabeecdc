//! Gateway to the external route-optimization solver.
//!
//! The solver is a remote service: it receives the fully-assembled request
//! body and returns routes, visits, and transitions. The call is bounded by
//! an explicit timeout; exceeding it is fatal for the request and is not
//! retried.

use serde::Deserialize;
use serde_json::Value;

use crate::error::SolverError;

/// Seam for the external solver, stubbed in tests.
pub trait SolverClient {
    fn optimize(&self, payload: &Value) -> Result<SolverResult, SolverError>;
}

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSolverClient {
    config: SolverConfig,
    client: reqwest::blocking::Client,
}

impl HttpSolverClient {
    pub fn new(config: SolverConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl SolverClient for HttpSolverClient {
    fn optimize(&self, payload: &Value) -> Result<SolverResult, SolverError> {
        let url = format!("{}/v1/optimize-tours", self.config.base_url);
        let body = self
            .client
            .post(url)
            .json(payload)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())?;
        Ok(serde_json::from_str(&body)?)
    }
}

// ---------------------------------------------------------------------------
// Solver wire format
// ---------------------------------------------------------------------------

/// Raw solver result. Duration fields are strings of the form `"<integer>s"`.
#[derive(Debug, Clone, Deserialize)]
pub struct SolverResult {
    pub metrics: SolverMetrics,
    #[serde(default)]
    pub routes: Vec<SolverRoute>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverMetrics {
    pub aggregated_route_metrics: RouteMetrics,
    pub used_vehicle_count: u32,
    pub skipped_mandatory_shipment_count: u32,
    pub earliest_vehicle_start_time: String,
    pub latest_vehicle_end_time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetrics {
    pub performed_shipment_count: u32,
    pub travel_duration: String,
    pub wait_duration: String,
    pub visit_duration: String,
    pub total_duration: String,
    pub travel_distance_meters: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverRoute {
    pub vehicle_label: String,
    pub vehicle_start_time: String,
    pub vehicle_end_time: String,
    pub metrics: RouteMetrics,
    #[serde(default)]
    pub visits: Vec<SolverVisit>,
    #[serde(default)]
    pub transitions: Vec<SolverTransition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverVisit {
    pub shipment_label: String,
    /// Absent means pickup.
    #[serde(default = "default_true")]
    pub is_pickup: bool,
    pub start_time: String,
    #[serde(default)]
    pub demands: Vec<VisitDemand>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitDemand {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverTransition {
    pub travel_duration: String,
    pub travel_distance_meters: f64,
    pub wait_duration: String,
    pub total_duration: String,
    pub start_time: String,
}

fn default_true() -> bool {
    true
}

//! Directions enrichment: inter-stop path segments for mapped routes.
//!
//! For every route the solver produced, each consecutive pair of stops with
//! differing coordinates becomes one leg lookup against an external
//! directions service. Lookups run concurrently on a fixed-size worker pool;
//! individual failures are logged and excluded, so a missing leg degrades
//! the itinerary instead of failing the request.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DirectionsError;
use crate::model::{GeoPoint, PlanRequest};
use crate::solver::SolverResult;

/// Default number of concurrent in-flight direction lookups.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// One inter-stop lookup request.
#[derive(Debug, Clone, PartialEq)]
pub struct LegQuery {
    pub start_lat: f64,
    pub start_lon: f64,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub country: String,
}

impl LegQuery {
    fn key(&self) -> String {
        leg_key(
            (self.start_lat, self.start_lon),
            (self.stop_lat, self.stop_lon),
        )
    }
}

/// Seam for the external directions service, stubbed in tests.
pub trait DirectionsProvider: Sync {
    /// Ordered path points for one leg.
    fn directions_for(&self, leg: &LegQuery) -> Result<Vec<Value>, DirectionsError>;
}

#[derive(Debug, Clone)]
pub struct DirectionsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpDirectionsClient {
    config: DirectionsConfig,
    client: reqwest::blocking::Client,
}

impl HttpDirectionsClient {
    pub fn new(config: DirectionsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl DirectionsProvider for HttpDirectionsClient {
    fn directions_for(&self, leg: &LegQuery) -> Result<Vec<Value>, DirectionsError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("country", leg.country.as_str()),
                ("start_lat", &leg.start_lat.to_string()),
                ("start_lon", &leg.start_lon.to_string()),
                ("stop_lat", &leg.stop_lat.to_string()),
                ("stop_lon", &leg.stop_lon.to_string()),
                ("source", "mobile"),
                ("action", "GetAll"),
            ])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<Value>())?;

        decode_directions_data(&response)
    }
}

/// The `directions_data` field arrives either as a point array or as a
/// JSON-encoded string of one.
fn decode_directions_data(response: &Value) -> Result<Vec<Value>, DirectionsError> {
    match response.get("directions_data") {
        Some(Value::Array(points)) => Ok(points.clone()),
        Some(Value::String(encoded)) => Ok(serde_json::from_str(encoded)?),
        _ => Err(DirectionsError::MissingDirectionsData),
    }
}

/// Resolved path segment for one exact coordinate pair.
#[derive(Debug, Clone)]
pub struct DirectionEntry {
    pub leg: LegQuery,
    pub points: Vec<Value>,
}

/// Per-request cache of resolved legs, exact-tuple lookup only.
#[derive(Debug, Default)]
pub struct DirectionsCache {
    entries: Vec<DirectionEntry>,
    index: HashMap<String, usize>,
}

impl DirectionsCache {
    pub fn from_entries(entries: Vec<DirectionEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.leg.key(), position))
            .collect();
        Self { entries, index }
    }

    pub fn find(&self, start: (f64, f64), stop: (f64, f64)) -> Option<&[Value]> {
        self.index
            .get(&leg_key(start, stop))
            .map(|position| self.entries[*position].points.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn leg_key(start: (f64, f64), stop: (f64, f64)) -> String {
    format!("{},{},{},{}", start.0, start.1, stop.0, stop.1)
}

/// Collect every consecutive-stop leg across all routes: vehicle start to
/// first visit, then visit to visit. Identical coordinate pairs are skipped
/// and duplicate pairs collapse to one lookup.
pub fn collect_legs(result: &SolverResult, request: &PlanRequest, country: &str) -> Vec<LegQuery> {
    let order_locations: HashMap<&str, (GeoPoint, GeoPoint)> = request
        .records
        .iter()
        .map(|record| (record.label.as_str(), (record.pickup, record.dropoff)))
        .collect();
    let vehicle_locations: HashMap<&str, (f64, f64)> = request
        .vehicles
        .iter()
        .map(|vehicle| (vehicle.label.as_str(), (vehicle.lat, vehicle.lng)))
        .collect();

    let mut seen = HashSet::new();
    let mut legs = Vec::new();

    for route in &result.routes {
        if route.visits.is_empty() {
            continue;
        }

        let mut stops: Vec<(f64, f64)> = Vec::new();
        if let Some(start) = vehicle_locations.get(route.vehicle_label.as_str()) {
            stops.push(*start);
        }
        for visit in &route.visits {
            let Some((pickup, dropoff)) = order_locations.get(visit.shipment_label.as_str())
            else {
                warn!(
                    shipment = visit.shipment_label.as_str(),
                    "visit references unknown shipment, leg skipped"
                );
                continue;
            };
            let point = if visit.is_pickup { pickup } else { dropoff };
            stops.push((point.lat, point.lng));
        }

        for pair in stops.windows(2) {
            let (start, stop) = (pair[0], pair[1]);
            if start == stop {
                continue;
            }
            let key = leg_key(start, stop);
            if !seen.insert(key) {
                continue;
            }
            legs.push(LegQuery {
                start_lat: start.0,
                start_lon: start.1,
                stop_lat: stop.0,
                stop_lon: stop.1,
                country: country.to_string(),
            });
        }
    }

    legs
}

/// Resolve all legs concurrently on a fixed-size worker pool.
///
/// Blocks until every lookup has completed or failed. Failed lookups are
/// logged and left out of the cache.
pub fn resolve_directions<P>(
    provider: &P,
    legs: Vec<LegQuery>,
    pool_size: usize,
) -> Result<DirectionsCache, DirectionsError>
where
    P: DirectionsProvider,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(pool_size.max(1))
        .build()?;

    let entries: Vec<DirectionEntry> = pool.install(|| {
        legs.into_par_iter()
            .filter_map(|leg| match provider.directions_for(&leg) {
                Ok(points) => {
                    debug!(points = points.len(), "resolved leg");
                    Some(DirectionEntry { leg, points })
                }
                Err(err) => {
                    warn!(error = %err, "direction lookup failed, leg skipped");
                    None
                }
            })
            .collect()
    });

    Ok(DirectionsCache::from_entries(entries))
}

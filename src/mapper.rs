//! Maps a raw solver result into per-vehicle itineraries.
//!
//! Ordering follows the solver's visit order and transitions are indexed
//! positionally, so the mapping is deterministic for a fixed solver result
//! and a fixed directions cache.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::directions::DirectionsCache;
use crate::error::MapError;
use crate::model::{OrderRecord, PlanRequest, format_utc};
use crate::solver::{RouteMetrics, SolverResult, SolverTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Start,
    Pickup,
    Dropoff,
}

/// The vehicle's known start location, head of every raw itinerary.
#[derive(Debug, Clone, Serialize)]
pub struct StartStep {
    pub action_type: StepAction,
    pub lat: f64,
    pub lng: f64,
}

/// One pickup or dropoff with its timing, load, and distance fields.
#[derive(Debug, Clone, Serialize)]
pub struct StopStep {
    pub action_type: StepAction,
    pub arrival_time: String,
    pub waiting_duration: i64,
    pub checkin_time: String,
    pub checkin_duration: i64,
    pub departure_time: String,
    pub load: Option<i64>,
    pub order_name: String,
    pub lat: f64,
    pub lng: f64,
    pub customer: String,
    pub exclusive: bool,
    pub distance: f64,
}

/// One itinerary element: a stop, the vehicle start, or a spliced path
/// point from the directions service.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Step {
    Start(StartStep),
    Stop(StopStep),
    Path(Value),
}

impl Step {
    /// Coordinates of start/stop steps; spliced path points carry no
    /// splice-relevant coordinates of their own.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match self {
            Step::Start(step) => Some((step.lat, step.lng)),
            Step::Stop(step) => Some((step.lat, step.lng)),
            Step::Path(_) => None,
        }
    }

    pub fn is_pickup(&self) -> bool {
        matches!(self, Step::Stop(step) if step.action_type == StepAction::Pickup)
    }
}

/// Per-vehicle itinerary with summary metrics.
#[derive(Debug, Clone, Serialize)]
pub struct Itinerary {
    pub start_time: String,
    pub end_time: String,
    pub number_of_shipments: u32,
    pub travel_duration: i64,
    pub wait_duration: i64,
    pub load_duration: i64,
    pub total_duration: i64,
    pub total_distance: f64,
    pub steps: Vec<Step>,
}

/// Aggregate metrics across the whole plan.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateMetrics {
    pub number_of_assigned_shipments: u32,
    pub total_travel_duration: i64,
    pub total_wait_duration: i64,
    pub total_load_duration: i64,
    pub total_duration: i64,
    pub total_distance: f64,
    pub total_used_vehicles: u32,
    pub total_skipped_shipments: u32,
    pub earliest_vehicle_start_time: String,
    pub latest_vehicle_end_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappedPlan {
    pub totals: AggregateMetrics,
    pub itineraries: BTreeMap<String, Itinerary>,
}

/// Map a solver result into per-vehicle itineraries, splicing cached
/// direction points between consecutive stops.
pub fn map_solver_result(
    result: &SolverResult,
    request: &PlanRequest,
    cache: &DirectionsCache,
) -> Result<MappedPlan, MapError> {
    let order_locations: HashMap<&str, &OrderRecord> = request
        .records
        .iter()
        .map(|record| (record.label.as_str(), record))
        .collect();
    let vehicle_locations: HashMap<&str, (f64, f64)> = request
        .vehicles
        .iter()
        .map(|vehicle| (vehicle.label.as_str(), (vehicle.lat, vehicle.lng)))
        .collect();

    let totals = aggregate_metrics(result)?;
    let mut itineraries = BTreeMap::new();

    for route in &result.routes {
        if route.visits.is_empty() {
            continue;
        }

        let transitions = normalized_transitions(route.transitions.clone(), &route.visits[0].start_time);
        let mut steps: Vec<Step> = Vec::new();

        if let Some((lat, lng)) = vehicle_locations.get(route.vehicle_label.as_str()) {
            steps.push(Step::Start(StartStep {
                action_type: StepAction::Start,
                lat: *lat,
                lng: *lng,
            }));
        }

        // Zero-based sequence id == position, pairing each visit with its
        // transition of the same index.
        for (id, visit) in route.visits.iter().enumerate() {
            let Some(record) = order_locations.get(visit.shipment_label.as_str()) else {
                warn!(
                    shipment = visit.shipment_label.as_str(),
                    "visit references unknown shipment, step skipped"
                );
                continue;
            };
            let Some(transition) = transitions.get(id) else {
                warn!(
                    vehicle = route.vehicle_label.as_str(),
                    id, "no transition for visit, step skipped"
                );
                continue;
            };

            let action_type = if visit.is_pickup {
                StepAction::Pickup
            } else {
                StepAction::Dropoff
            };
            let location = if visit.is_pickup {
                record.pickup
            } else {
                record.dropoff
            };

            let arrival = parse_timestamp(&transition.start_time)?
                + Duration::seconds(duration_secs(&transition.travel_duration)?);
            let checkin_duration = record.check_in_time.parse::<i64>().unwrap_or_else(|_| {
                warn!(
                    order = record.label.as_str(),
                    value = record.check_in_time.as_str(),
                    "non-numeric check-in time, defaulting to zero"
                );
                0
            });

            steps.push(Step::Stop(StopStep {
                action_type,
                arrival_time: format_utc(arrival),
                waiting_duration: duration_secs(&transition.wait_duration)?,
                checkin_time: visit.start_time.clone(),
                checkin_duration,
                departure_time: transitions
                    .get(id + 1)
                    .map(|next| next.start_time.clone())
                    .unwrap_or_default(),
                load: visit
                    .demands
                    .first()
                    .and_then(|demand| demand.value.parse().ok()),
                order_name: visit.shipment_label.clone(),
                lat: location.lat,
                lng: location.lng,
                customer: record.customer.clone(),
                exclusive: record.exclusive,
                distance: transition.travel_distance_meters,
            }));
        }

        let steps = truncate_to_first_pickup(splice_directions(steps, cache));

        itineraries.insert(
            route.vehicle_label.clone(),
            Itinerary {
                start_time: route.vehicle_start_time.clone(),
                end_time: route.vehicle_end_time.clone(),
                number_of_shipments: route.metrics.performed_shipment_count,
                travel_duration: duration_secs(&route.metrics.travel_duration)?,
                wait_duration: duration_secs(&route.metrics.wait_duration)?,
                load_duration: duration_secs(&route.metrics.visit_duration)?,
                total_duration: duration_secs(&route.metrics.total_duration)?,
                total_distance: route.metrics.travel_distance_meters,
                steps,
            },
        );
    }

    Ok(MappedPlan { totals, itineraries })
}

fn aggregate_metrics(result: &SolverResult) -> Result<AggregateMetrics, MapError> {
    let aggregated: &RouteMetrics = &result.metrics.aggregated_route_metrics;
    Ok(AggregateMetrics {
        number_of_assigned_shipments: aggregated.performed_shipment_count,
        total_travel_duration: duration_secs(&aggregated.travel_duration)?,
        total_wait_duration: duration_secs(&aggregated.wait_duration)?,
        total_load_duration: duration_secs(&aggregated.visit_duration)?,
        total_duration: duration_secs(&aggregated.total_duration)?,
        total_distance: aggregated.travel_distance_meters,
        total_used_vehicles: result.metrics.used_vehicle_count,
        total_skipped_shipments: result.metrics.skipped_mandatory_shipment_count,
        earliest_vehicle_start_time: result.metrics.earliest_vehicle_start_time.clone(),
        latest_vehicle_end_time: result.metrics.latest_vehicle_end_time.clone(),
    })
}

/// The solver's first transition represents "already at depot", not a real
/// movement: zero its durations and distance and align its start with the
/// first visit.
fn normalized_transitions(
    mut transitions: Vec<SolverTransition>,
    first_visit_start: &str,
) -> Vec<SolverTransition> {
    if let Some(first) = transitions.first_mut() {
        first.travel_duration = "0s".to_string();
        first.travel_distance_meters = 0.0;
        first.wait_duration = "0s".to_string();
        first.total_duration = "0s".to_string();
        first.start_time = first_visit_start.to_string();
    }
    transitions
}

/// Insert cached path points between consecutive steps whose coordinates
/// differ. Identical coordinates and cache misses splice nothing.
fn splice_directions(steps: Vec<Step>, cache: &DirectionsCache) -> Vec<Step> {
    let mut spliced = Vec::with_capacity(steps.len());
    for (position, step) in steps.iter().enumerate() {
        spliced.push(step.clone());
        let Some(next) = steps.get(position + 1) else {
            continue;
        };
        let (Some(start), Some(stop)) = (step.coordinates(), next.coordinates()) else {
            continue;
        };
        if start == stop {
            continue;
        }
        if let Some(points) = cache.find(start, stop) {
            spliced.extend(points.iter().cloned().map(Step::Path));
        }
    }
    spliced
}

/// Discard everything before the first pickup; a route that never picks up
/// is kept as-is.
fn truncate_to_first_pickup(steps: Vec<Step>) -> Vec<Step> {
    match steps.iter().position(Step::is_pickup) {
        Some(first_pickup) => steps.into_iter().skip(first_pickup).collect(),
        None => steps,
    }
}

/// Seconds from a `"<integer>s"` solver duration.
fn duration_secs(raw: &str) -> Result<i64, MapError> {
    raw.strip_suffix('s')
        .and_then(|digits| digits.parse::<i64>().ok())
        .ok_or_else(|| MapError::InvalidDuration {
            value: raw.to_string(),
        })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, MapError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| MapError::InvalidTimestamp {
            value: value.to_string(),
        })
}

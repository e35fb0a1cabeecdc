//! Input data model for planning requests.
//!
//! These mirror the upstream ingestion output: flat-ish order and vehicle
//! records plus the list of customers whose shipments must not share a
//! vehicle with anyone else's.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssembleError;

/// Generic shipment category for non-exclusive customers.
pub const GENERAL_SHIPMENT_TYPE: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Delivery time window, ISO-8601 UTC bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: String,
    pub to: String,
}

/// One order to be routed: pick up at one location, drop off at another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub label: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub display_name: String,
    pub required_vehicle_type: String,
    pub time_window: TimeWindow,
    pub customer: String,
    pub capacity: i64,
    pub exclusive: bool,
    /// Required check-in duration in seconds, as a numeric string.
    pub check_in_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub label: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub capacity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusiveCustomer {
    pub customer: String,
}

/// Full input for one planning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub records: Vec<OrderRecord>,
    pub vehicles: Vec<VehicleRecord>,
    #[serde(default)]
    pub exclusive_customers: Vec<ExclusiveCustomer>,
}

/// Named record collections in JSON form, ready for placeholder resolution.
///
/// Building the set from a [`PlanRequest`] also classifies each record with
/// its `shipment_type`: the customer name for exclusive records, otherwise
/// [`GENERAL_SHIPMENT_TYPE`]. Instance-scoped on purpose so concurrent
/// requests never share flattened state.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    collections: BTreeMap<String, Vec<Value>>,
}

impl DataSet {
    pub fn from_request(request: &PlanRequest) -> Self {
        let records = request
            .records
            .iter()
            .map(|record| {
                let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
                let shipment_type = if record.exclusive {
                    record.customer.clone()
                } else {
                    GENERAL_SHIPMENT_TYPE.to_string()
                };
                if let Some(object) = value.as_object_mut() {
                    object.insert("shipment_type".to_string(), Value::String(shipment_type));
                }
                value
            })
            .collect();

        let vehicles = request
            .vehicles
            .iter()
            .enumerate()
            .map(|(position, vehicle)| {
                let mut value = serde_json::to_value(vehicle).unwrap_or(Value::Null);
                if let Some(object) = value.as_object_mut() {
                    object.insert("index".to_string(), Value::from(position as i64));
                }
                value
            })
            .collect();

        let mut collections = BTreeMap::new();
        collections.insert("records".to_string(), records);
        collections.insert("vehicles".to_string(), vehicles);
        Self { collections }
    }

    pub fn collection(&self, root: &str) -> Option<&[Value]> {
        self.collections.get(root).map(Vec::as_slice)
    }
}

/// Parse an ISO-8601 UTC timestamp as used throughout the solver exchange.
pub(crate) fn parse_utc(value: &str) -> Result<DateTime<Utc>, AssembleError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| AssembleError::MalformedTimeWindow {
            value: value.to_string(),
        })
}

/// Format a timestamp the way the solver expects: UTC, second precision.
pub(crate) fn format_utc(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(label: &str, customer: &str, exclusive: bool) -> OrderRecord {
        OrderRecord {
            label: label.to_string(),
            pickup: GeoPoint { lat: 25.1, lng: 55.2 },
            dropoff: GeoPoint { lat: 25.3, lng: 55.4 },
            display_name: format!("order {label}"),
            required_vehicle_type: "van".to_string(),
            time_window: TimeWindow {
                from: "2024-05-01T09:00:00Z".to_string(),
                to: "2024-05-01T17:00:00Z".to_string(),
            },
            customer: customer.to_string(),
            capacity: 5,
            exclusive,
            check_in_time: "120".to_string(),
        }
    }

    #[test]
    fn dataset_classifies_shipment_type() {
        let request = PlanRequest {
            records: vec![order("o1", "acme", true), order("o2", "beta", false)],
            vehicles: Vec::new(),
            exclusive_customers: vec![ExclusiveCustomer {
                customer: "acme".to_string(),
            }],
        };

        let data = DataSet::from_request(&request);
        let records = data.collection("records").unwrap();
        assert_eq!(records[0]["shipment_type"], "acme");
        assert_eq!(records[1]["shipment_type"], "general");
    }

    #[test]
    fn dataset_tags_vehicle_positions() {
        let request = PlanRequest {
            records: Vec::new(),
            vehicles: vec![
                VehicleRecord {
                    label: "van,1".to_string(),
                    lat: 25.0,
                    lng: 55.0,
                    vehicle_type: "van".to_string(),
                    capacity: 10,
                },
                VehicleRecord {
                    label: "truck,2".to_string(),
                    lat: 25.1,
                    lng: 55.1,
                    vehicle_type: "truck".to_string(),
                    capacity: 30,
                },
            ],
            exclusive_customers: Vec::new(),
        };

        let data = DataSet::from_request(&request);
        let vehicles = data.collection("vehicles").unwrap();
        assert_eq!(vehicles[0]["index"], 0);
        assert_eq!(vehicles[1]["index"], 1);
        assert_eq!(vehicles[1]["type"], "truck");
    }

    #[test]
    fn utc_round_trip_keeps_second_precision() {
        let parsed = parse_utc("2024-05-01T09:00:00Z").unwrap();
        assert_eq!(format_utc(parsed), "2024-05-01T09:00:00Z");
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        assert!(parse_utc("yesterday").is_err());
    }
}

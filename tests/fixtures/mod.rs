//! Test fixtures for fleet-planner.
//!
//! Builders for order/vehicle records, a standard payload template, and a
//! canned solver result, all around a small Dubai-area scenario.

#![allow(dead_code)]

use fleet_planner::model::{
    ExclusiveCustomer, GeoPoint, OrderRecord, PlanRequest, TimeWindow, VehicleRecord,
};
use serde_json::{Value, json};

/// Builder for order records with sensible defaults.
#[derive(Clone, Debug)]
pub struct OrderBuilder {
    record: OrderRecord,
}

impl OrderBuilder {
    pub fn new(label: &str) -> Self {
        Self {
            record: OrderRecord {
                label: label.to_string(),
                pickup: GeoPoint { lat: 25.10, lng: 55.20 },
                dropoff: GeoPoint { lat: 25.20, lng: 55.30 },
                display_name: format!("order {label}"),
                required_vehicle_type: "van".to_string(),
                time_window: TimeWindow {
                    from: "2024-05-01T09:00:00Z".to_string(),
                    to: "2024-05-01T17:00:00Z".to_string(),
                },
                customer: "acme".to_string(),
                capacity: 5,
                exclusive: false,
                check_in_time: "120".to_string(),
            },
        }
    }

    pub fn pickup(mut self, lat: f64, lng: f64) -> Self {
        self.record.pickup = GeoPoint { lat, lng };
        self
    }

    pub fn dropoff(mut self, lat: f64, lng: f64) -> Self {
        self.record.dropoff = GeoPoint { lat, lng };
        self
    }

    pub fn window(mut self, from: &str, to: &str) -> Self {
        self.record.time_window = TimeWindow {
            from: from.to_string(),
            to: to.to_string(),
        };
        self
    }

    pub fn customer(mut self, customer: &str) -> Self {
        self.record.customer = customer.to_string();
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.record.exclusive = true;
        self
    }

    pub fn vehicle_type(mut self, vehicle_type: &str) -> Self {
        self.record.required_vehicle_type = vehicle_type.to_string();
        self
    }

    pub fn capacity(mut self, capacity: i64) -> Self {
        self.record.capacity = capacity;
        self
    }

    pub fn check_in(mut self, seconds: &str) -> Self {
        self.record.check_in_time = seconds.to_string();
        self
    }

    pub fn build(self) -> OrderRecord {
        self.record
    }
}

pub fn vehicle(label: &str, vehicle_type: &str, lat: f64, lng: f64) -> VehicleRecord {
    VehicleRecord {
        label: label.to_string(),
        lat,
        lng,
        vehicle_type: vehicle_type.to_string(),
        capacity: 20,
    }
}

pub fn request(
    records: Vec<OrderRecord>,
    vehicles: Vec<VehicleRecord>,
    exclusive_customers: &[&str],
) -> PlanRequest {
    PlanRequest {
        records,
        vehicles,
        exclusive_customers: exclusive_customers
            .iter()
            .map(|customer| ExclusiveCustomer {
                customer: customer.to_string(),
            })
            .collect(),
    }
}

/// The standard payload template: one shipment skeleton over `records`, one
/// vehicle skeleton over `vehicles`.
pub fn template_document() -> Value {
    json!({
        "model": {
            "shipments": [{
                "label": "{{records.*.label}}",
                "vehicle_type": "{{records.*.required_vehicle_type}}",
                "shipmentType": "{{records.*.shipment_type}}",
                "demands": [{"type": "weight", "value": "{{records.*.capacity}}"}],
                "pickups": [{
                    "arrivalLocation": {
                        "latitude": "{{records.*.pickup.lat}}",
                        "longitude": "{{records.*.pickup.lng}}"
                    },
                    "timeWindows": [{
                        "startTime": "{{records.*.time_window.from}}",
                        "endTime": "{{records.*.time_window.to}}"
                    }],
                    "duration": "{{records.*.check_in_time}}s"
                }],
                "deliveries": [{
                    "arrivalLocation": {
                        "latitude": "{{records.*.dropoff.lat}}",
                        "longitude": "{{records.*.dropoff.lng}}"
                    }
                }]
            }],
            "vehicles": [{
                "label": "{{vehicles.*.type}},{{vehicles.*.label}}",
                "index": "{{vehicles.*.index}}",
                "startLocation": {
                    "latitude": "{{vehicles.*.lat}}",
                    "longitude": "{{vehicles.*.lng}}"
                },
                "loadLimits": {"weight": {"maxLoad": "{{vehicles.*.capacity}}"}}
            }]
        }
    })
}

/// Canned solver result: one vehicle, pickup then dropoff of one shipment.
///
/// Transition timings follow the solver convention: `visits.len() + 1`
/// transitions, the first one representing "already at depot".
pub fn single_route_result(vehicle_label: &str, shipment_label: &str) -> Value {
    json!({
        "metrics": {
            "aggregatedRouteMetrics": {
                "performedShipmentCount": 1,
                "travelDuration": "300s",
                "waitDuration": "0s",
                "visitDuration": "240s",
                "totalDuration": "540s",
                "travelDistanceMeters": 2600.0
            },
            "usedVehicleCount": 1,
            "skippedMandatoryShipmentCount": 0,
            "earliestVehicleStartTime": "2024-05-01T09:00:00Z",
            "latestVehicleEndTime": "2024-05-01T10:00:00Z"
        },
        "routes": [{
            "vehicleLabel": vehicle_label,
            "vehicleStartTime": "2024-05-01T09:00:00Z",
            "vehicleEndTime": "2024-05-01T10:00:00Z",
            "metrics": {
                "performedShipmentCount": 1,
                "travelDuration": "300s",
                "waitDuration": "0s",
                "visitDuration": "240s",
                "totalDuration": "540s",
                "travelDistanceMeters": 2600.0
            },
            "visits": [
                {
                    "shipmentLabel": shipment_label,
                    "isPickup": true,
                    "startTime": "2024-05-01T09:05:00Z",
                    "demands": [{"value": "5"}]
                },
                {
                    "shipmentLabel": shipment_label,
                    "isPickup": false,
                    "startTime": "2024-05-01T09:12:00Z",
                    "demands": [{"value": "5"}]
                }
            ],
            "transitions": [
                {
                    "travelDuration": "120s",
                    "travelDistanceMeters": 900.0,
                    "waitDuration": "30s",
                    "totalDuration": "150s",
                    "startTime": "2024-05-01T08:58:00Z"
                },
                {
                    "travelDuration": "300s",
                    "travelDistanceMeters": 2600.0,
                    "waitDuration": "0s",
                    "totalDuration": "300s",
                    "startTime": "2024-05-01T09:05:00Z"
                },
                {
                    "travelDuration": "0s",
                    "travelDistanceMeters": 0.0,
                    "waitDuration": "0s",
                    "totalDuration": "0s",
                    "startTime": "2024-05-01T09:16:00Z"
                }
            ]
        }]
    })
}

//! Payload assembly tests
//!
//! Covers entity compilation through the registry, the global planning
//! window, incompatibility constraints, and the fatal input conditions.

mod fixtures;

use fleet_planner::assemble::{EntityRegistry, assemble};
use fleet_planner::error::AssembleError;
use fleet_planner::pipeline::PlannerConfig;
use fleet_planner::template::Template;
use serde_json::json;

use fixtures::{OrderBuilder, request, template_document, vehicle};

fn config() -> PlannerConfig {
    PlannerConfig::new("projects/test-tenant")
}

#[test]
fn compiles_one_shipment_per_record() {
    let template = Template::from_value(template_document()).unwrap();
    let input = request(
        vec![
            OrderBuilder::new("o-1").build(),
            OrderBuilder::new("o-2").capacity(7).build(),
        ],
        vec![vehicle("van_a1", "van", 25.10, 55.20)],
        &[],
    );

    let payload = assemble(&template, &input, &EntityRegistry::with_defaults(), &config()).unwrap();

    let shipments = payload["model"]["shipments"].as_array().unwrap();
    assert_eq!(shipments.len(), 2);
    assert_eq!(shipments[0]["label"], "o-1");
    assert_eq!(shipments[1]["label"], "o-2");
    assert_eq!(shipments[0]["pickups"][0]["arrivalLocation"]["latitude"], 25.10);
    assert_eq!(shipments[1]["demands"][0]["value"], 7);
    assert_eq!(shipments[0]["pickups"][0]["duration"], "120s");

    let vehicles = payload["model"]["vehicles"].as_array().unwrap();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0]["label"], "van,van_a1");
    assert_eq!(vehicles[0]["index"], 0);
    assert_eq!(vehicles[0]["loadLimits"]["weight"]["maxLoad"], 20);

    assert_eq!(payload["parent"], "projects/test-tenant");
}

#[test]
fn global_window_spans_min_from_minus_lead_to_max_to() {
    let template = Template::from_value(template_document()).unwrap();
    let input = request(
        vec![
            OrderBuilder::new("o-1")
                .window("2024-05-01T09:00:00Z", "2024-05-01T17:00:00Z")
                .build(),
            OrderBuilder::new("o-2")
                .window("2024-05-01T10:00:00Z", "2024-05-01T18:00:00Z")
                .build(),
        ],
        vec![vehicle("van_a1", "van", 25.10, 55.20)],
        &[],
    );

    let payload = assemble(&template, &input, &EntityRegistry::with_defaults(), &config()).unwrap();
    assert_eq!(payload["model"]["globalStartTime"], "2024-05-01T05:00:00Z");
    assert_eq!(payload["model"]["globalEndTime"], "2024-05-01T18:00:00Z");
}

#[test]
fn incompatibilities_cover_general_and_exclusive_customers() {
    let template = Template::from_value(template_document()).unwrap();
    let input = request(
        vec![
            OrderBuilder::new("o-1").customer("A").exclusive().build(),
            OrderBuilder::new("o-2").customer("other").build(),
        ],
        vec![vehicle("van_a1", "van", 25.10, 55.20)],
        &["A", "B"],
    );

    let payload = assemble(&template, &input, &EntityRegistry::with_defaults(), &config()).unwrap();
    let incompatibilities = payload["model"]["shipmentTypeIncompatibilities"]
        .as_array()
        .unwrap();
    assert_eq!(incompatibilities.len(), 1);
    assert_eq!(incompatibilities[0]["types"], json!(["general", "A", "B"]));
    assert_eq!(
        incompatibilities[0]["incompatibility_mode"],
        "NOT_IN_SAME_VEHICLE_SIMULTANEOUSLY"
    );
}

#[test]
fn exclusive_records_are_typed_by_customer() {
    let template = Template::from_value(template_document()).unwrap();
    let input = request(
        vec![
            OrderBuilder::new("o-1").customer("A").exclusive().build(),
            OrderBuilder::new("o-2").customer("other").build(),
        ],
        vec![vehicle("van_a1", "van", 25.10, 55.20)],
        &["A"],
    );

    let payload = assemble(&template, &input, &EntityRegistry::with_defaults(), &config()).unwrap();
    let shipments = payload["model"]["shipments"].as_array().unwrap();
    assert_eq!(shipments[0]["shipmentType"], "A");
    assert_eq!(shipments[1]["shipmentType"], "general");
}

#[test]
fn empty_records_are_rejected() {
    let template = Template::from_value(template_document()).unwrap();
    let input = request(Vec::new(), vec![vehicle("van_a1", "van", 25.10, 55.20)], &[]);

    let err = assemble(&template, &input, &EntityRegistry::with_defaults(), &config()).unwrap_err();
    assert!(matches!(err, AssembleError::EmptyInput));
}

#[test]
fn malformed_time_window_is_rejected() {
    let template = Template::from_value(template_document()).unwrap();
    let input = request(
        vec![OrderBuilder::new("o-1").window("tomorrow", "later").build()],
        vec![vehicle("van_a1", "van", 25.10, 55.20)],
        &[],
    );

    let err = assemble(&template, &input, &EntityRegistry::with_defaults(), &config()).unwrap_err();
    assert!(matches!(err, AssembleError::MalformedTimeWindow { .. }));
}

#[test]
fn unregistered_entity_key_is_a_configuration_error() {
    let template = Template::from_value(json!({
        "model": {
            "drones": [{"label": "{{records.*.label}}"}]
        }
    }))
    .unwrap();
    let input = request(
        vec![OrderBuilder::new("o-1").build()],
        vec![vehicle("van_a1", "van", 25.10, 55.20)],
        &[],
    );

    let err = assemble(&template, &input, &EntityRegistry::with_defaults(), &config()).unwrap_err();
    assert!(matches!(err, AssembleError::UnknownEntity { .. }));
}

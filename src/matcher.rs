//! Vehicle-type matching over an assembled payload.
//!
//! Vehicles carry a compound `"<type>,<rest>"` label; each shipment declares
//! the vehicle type it requires. This pass derives the allowed-vehicle index
//! set per shipment and strips the transient fields the solver must not see.

use serde_json::Value;

use crate::error::AssembleError;

/// Resolve `allowed_vehicle_indices` for every shipment and strip transient
/// fields. Works on an independent deep copy; the caller's payload is left
/// untouched.
pub fn match_vehicle_types(payload: &Value) -> Result<Value, AssembleError> {
    let mut updated = payload.clone();

    let vehicle_types: Vec<(String, i64)> = vehicles(&updated)?
        .iter()
        .enumerate()
        .map(|(position, vehicle)| {
            let type_prefix = vehicle
                .get("label")
                .and_then(Value::as_str)
                .and_then(|label| label.split(',').next())
                .unwrap_or_default()
                .to_string();
            let index = vehicle
                .get("index")
                .and_then(Value::as_i64)
                .unwrap_or(position as i64);
            (type_prefix, index)
        })
        .collect();

    for shipment in shipments_mut(&mut updated)? {
        let required = shipment
            .get("vehicle_type")
            .and_then(Value::as_str)
            .map(str::to_string);
        let allowed: Vec<Value> = vehicle_types
            .iter()
            .filter(|(type_prefix, _)| Some(type_prefix.as_str()) == required.as_deref())
            .map(|(_, index)| Value::from(*index))
            .collect();

        if let Some(object) = shipment.as_object_mut() {
            object.insert("allowed_vehicle_indices".to_string(), Value::Array(allowed));
            object.remove("vehicle_type");
        }
        trim_label(shipment);
    }

    for vehicle in vehicles_mut(&mut updated)? {
        if let Some(object) = vehicle.as_object_mut() {
            object.remove("index");
        }
        trim_label(vehicle);
    }

    Ok(updated)
}

/// Keep only the first comma-separated label component.
fn trim_label(entity: &mut Value) {
    let trimmed = entity
        .get("label")
        .and_then(Value::as_str)
        .and_then(|label| label.split(',').next())
        .map(|part| part.trim().to_string());
    if let (Some(object), Some(label)) = (entity.as_object_mut(), trimmed) {
        object.insert("label".to_string(), Value::String(label));
    }
}

fn vehicles(payload: &Value) -> Result<&Vec<Value>, AssembleError> {
    payload
        .get("model")
        .and_then(|model| model.get("vehicles"))
        .and_then(Value::as_array)
        .ok_or(AssembleError::MalformedPayload {
            path: "model.vehicles",
        })
}

fn vehicles_mut(payload: &mut Value) -> Result<&mut Vec<Value>, AssembleError> {
    payload
        .get_mut("model")
        .and_then(|model| model.get_mut("vehicles"))
        .and_then(Value::as_array_mut)
        .ok_or(AssembleError::MalformedPayload {
            path: "model.vehicles",
        })
}

fn shipments_mut(payload: &mut Value) -> Result<&mut Vec<Value>, AssembleError> {
    payload
        .get_mut("model")
        .and_then(|model| model.get_mut("shipments"))
        .and_then(Value::as_array_mut)
        .ok_or(AssembleError::MalformedPayload {
            path: "model.shipments",
        })
}

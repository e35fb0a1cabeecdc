//! Solver request assembly.
//!
//! Compiles each entity declared by the template through a statically
//! registered handler, derives the global planning window and shipment
//! incompatibilities, and merges everything into one request body wrapped
//! under the tenant's project identifier.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::AssembleError;
use crate::model::{DataSet, GENERAL_SHIPMENT_TYPE, PlanRequest, format_utc, parse_utc};
use crate::pipeline::PlannerConfig;
use crate::template::{Template, resolve_entity, template_root};

/// Hours subtracted from the earliest record window to open the global
/// planning window early enough for vehicle repositioning.
const GLOBAL_START_LEAD_HOURS: i64 = 4;

const INCOMPATIBILITY_MODE: &str = "NOT_IN_SAME_VEHICLE_SIMULTANEOUSLY";

/// Compiles one template entity into its payload array.
///
/// Handlers are registered explicitly at startup; a template model key with
/// no registered handler is a configuration error.
pub trait EntityHandler {
    /// Model key this handler serves, e.g. `"shipments"`.
    fn name(&self) -> &str;

    fn compile(&self, skeleton: &[Value], data: &DataSet) -> Result<Vec<Value>, AssembleError>;
}

/// Default handler: pure placeholder resolution against the collection named
/// by the skeleton's single data root.
#[derive(Debug, Clone)]
pub struct TemplateEntity {
    name: String,
}

impl TemplateEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EntityHandler for TemplateEntity {
    fn name(&self) -> &str {
        &self.name
    }

    fn compile(&self, skeleton: &[Value], data: &DataSet) -> Result<Vec<Value>, AssembleError> {
        let root = template_root(skeleton)?;
        let records = data
            .collection(&root)
            .ok_or_else(|| AssembleError::MissingCollection { root: root.clone() })?;
        debug!(entity = self.name.as_str(), root = root.as_str(), records = records.len(), "compiling entity");
        Ok(resolve_entity(skeleton, records)?)
    }
}

/// Static entity-name → handler registry.
#[derive(Default)]
pub struct EntityRegistry {
    handlers: BTreeMap<String, Box<dyn EntityHandler + Send + Sync>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering the entities the standard template declares.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TemplateEntity::new("shipments")));
        registry.register(Box::new(TemplateEntity::new("vehicles")));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn EntityHandler + Send + Sync>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&(dyn EntityHandler + Send + Sync)> {
        self.handlers.get(name).map(Box::as_ref)
    }
}

/// Assemble one solver-ready request body from the template and input data.
pub fn assemble(
    template: &Template,
    request: &PlanRequest,
    registry: &EntityRegistry,
    config: &PlannerConfig,
) -> Result<Value, AssembleError> {
    let data = DataSet::from_request(request);
    let incompatibility = incompatibility_constraint(request);
    info!(
        types = ?incompatibility["types"],
        "derived shipment incompatibilities"
    );

    let mut model = serde_json::Map::new();
    for name in template.entity_names() {
        let handler = registry
            .get(name)
            .ok_or_else(|| AssembleError::UnknownEntity {
                name: name.to_string(),
            })?;
        let skeleton = template
            .entity_skeleton(name)
            .ok_or_else(|| AssembleError::UnknownEntity {
                name: name.to_string(),
            })?;
        let payload = handler.compile(skeleton, &data)?;
        model.insert(name.to_string(), Value::Array(payload));
    }

    let (start, end) = planning_window(request)?;
    model.insert("globalStartTime".to_string(), Value::String(format_utc(start)));
    model.insert("globalEndTime".to_string(), Value::String(format_utc(end)));
    model.insert(
        "shipmentTypeIncompatibilities".to_string(),
        Value::Array(vec![incompatibility]),
    );

    Ok(json!({
        "parent": config.project_id,
        "model": Value::Object(model),
    }))
}

/// Categories that must never share a vehicle at the same time: the generic
/// category plus every exclusive customer's name.
fn incompatibility_constraint(request: &PlanRequest) -> Value {
    let mut types = vec![GENERAL_SHIPMENT_TYPE.to_string()];
    types.extend(
        request
            .exclusive_customers
            .iter()
            .map(|entry| entry.customer.clone()),
    );
    json!({
        "types": types,
        "incompatibility_mode": INCOMPATIBILITY_MODE,
    })
}

/// Global planning window: earliest record `from` minus the lead offset,
/// latest record `to`.
fn planning_window(request: &PlanRequest) -> Result<(DateTime<Utc>, DateTime<Utc>), AssembleError> {
    if request.records.is_empty() {
        return Err(AssembleError::EmptyInput);
    }

    let mut earliest: Option<DateTime<Utc>> = None;
    let mut latest: Option<DateTime<Utc>> = None;
    for record in &request.records {
        let from = parse_utc(&record.time_window.from)?;
        let to = parse_utc(&record.time_window.to)?;
        earliest = Some(earliest.map_or(from, |current| current.min(from)));
        latest = Some(latest.map_or(to, |current| current.max(to)));
    }

    // records is non-empty, both bounds are set
    let start = earliest.ok_or(AssembleError::EmptyInput)?
        - Duration::hours(GLOBAL_START_LEAD_HOURS);
    let end = latest.ok_or(AssembleError::EmptyInput)?;
    Ok((start, end))
}

//! Placeholder resolution for payload templates.
//!
//! A template is a JSON document with a `model` object whose array-valued
//! keys each hold one skeleton element. Skeleton strings may embed
//! placeholders of the form `{{root.path.to.field}}`; a `*` path segment is
//! replaced with the current record index, so `{{records.*.pickup.lat}}`
//! resolves against the flattened entry `"<i>.pickup.lat"` of the `records`
//! collection.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::TemplateError;

/// Parsed payload template: the `model` object of the template document.
#[derive(Debug, Clone)]
pub struct Template {
    model: Map<String, Value>,
}

impl Template {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let file = File::open(path)?;
        let document: Value = serde_json::from_reader(BufReader::new(file))?;
        Self::from_value(document)
    }

    pub fn from_value(document: Value) -> Result<Self, TemplateError> {
        let model = document
            .get("model")
            .and_then(Value::as_object)
            .cloned()
            .ok_or(TemplateError::MissingModel)?;
        Ok(Self { model })
    }

    /// Keys of the model object that declare entity collections.
    pub fn entity_names(&self) -> Vec<&str> {
        self.model
            .iter()
            .filter(|(_, value)| value.is_array())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn entity_skeleton(&self, name: &str) -> Option<&[Value]> {
        self.model.get(name).and_then(Value::as_array).map(Vec::as_slice)
    }
}

/// One path segment of a parsed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    /// `*`: substituted with the current record index.
    Index,
}

/// A parsed `{{root.segment.segment}}` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub root: String,
    pub segments: Vec<PathSegment>,
}

impl Placeholder {
    pub fn parse(expr: &str) -> Result<Self, TemplateError> {
        let mut parts = expr.split('.');
        let root = parts
            .next()
            .map(str::trim)
            .filter(|root| !root.is_empty())
            .ok_or(TemplateError::EmptyPlaceholder)?;

        let segments = parts
            .map(|part| match part.trim() {
                "*" => PathSegment::Index,
                key => PathSegment::Key(key.to_string()),
            })
            .collect();

        Ok(Self {
            root: root.to_string(),
            segments,
        })
    }

    /// Dotted lookup path into a flattened collection for one record index.
    pub fn flattened_path(&self, index: usize) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                PathSegment::Index => index.to_string(),
                PathSegment::Key(key) => key.clone(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Resolve one entity skeleton against a record collection.
///
/// Produces one payload element per record. Strings that parse as finite
/// numbers after substitution are coerced to integers (no fractional part)
/// or floats. Placeholders with no resolvable value are left as literal text
/// and logged, a tolerated degradation.
pub fn resolve_entity(skeleton: &[Value], records: &[Value]) -> Result<Vec<Value>, TemplateError> {
    if skeleton.len() != 1 {
        return Err(TemplateError::SkeletonArity {
            count: skeleton.len(),
        });
    }
    template_root(skeleton)?;

    let flattened = flatten_records(records);
    let payload = (0..records.len())
        .map(|index| {
            let mut element = resolve_value(&skeleton[0], index, &flattened);
            coerce_numbers(&mut element);
            element
        })
        .collect();

    Ok(payload)
}

/// The single data root every placeholder in the skeleton must share.
pub fn template_root(skeleton: &[Value]) -> Result<String, TemplateError> {
    let mut roots = BTreeSet::new();
    for element in skeleton {
        collect_roots(element, &mut roots)?;
    }

    match roots.len() {
        0 => Err(TemplateError::NoTemplateRoot),
        1 => Ok(roots.into_iter().next().unwrap_or_default()),
        _ => Err(TemplateError::AmbiguousTemplateRoot {
            roots: roots.into_iter().collect(),
        }),
    }
}

fn collect_roots(value: &Value, roots: &mut BTreeSet<String>) -> Result<(), TemplateError> {
    match value {
        Value::Object(map) => {
            for child in map.values() {
                collect_roots(child, roots)?;
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_roots(child, roots)?;
            }
        }
        Value::String(text) => {
            for span in placeholder_spans(text) {
                let placeholder = Placeholder::parse(&text[span.expr_start..span.expr_end])?;
                roots.insert(placeholder.root);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Flatten a record collection into a dotted-path map, the record's position
/// as the leading component. Arrays are kept as leaf values.
pub fn flatten_records(records: &[Value]) -> HashMap<String, Value> {
    let mut flattened = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        flatten_into(record, index.to_string(), &mut flattened);
    }
    flattened
}

fn flatten_into(value: &Value, path: String, out: &mut HashMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(child, format!("{path}.{key}"), out);
            }
        }
        other => {
            out.insert(path, other.clone());
        }
    }
}

fn resolve_value(value: &Value, index: usize, flattened: &HashMap<String, Value>) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, child)| (key.clone(), resolve_value(child, index, flattened)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|child| resolve_value(child, index, flattened))
                .collect(),
        ),
        Value::String(text) => resolve_string(text, index, flattened),
        other => other.clone(),
    }
}

fn resolve_string(text: &str, index: usize, flattened: &HashMap<String, Value>) -> Value {
    let spans = placeholder_spans(text);
    if spans.is_empty() {
        return Value::String(text.to_string());
    }

    // A string that is exactly one placeholder substitutes the typed value.
    if spans.len() == 1 && spans[0].start == 0 && spans[0].end == text.len() {
        let span = &spans[0];
        if let Some(value) = lookup(&text[span.expr_start..span.expr_end], index, flattened) {
            return value;
        }
        warn!(placeholder = text, "placeholder has no resolvable value");
        return Value::String(text.to_string());
    }

    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in &spans {
        output.push_str(&text[cursor..span.start]);
        match lookup(&text[span.expr_start..span.expr_end], index, flattened) {
            Some(value) => output.push_str(&scalar_text(&value)),
            None => {
                warn!(
                    placeholder = &text[span.start..span.end],
                    "placeholder has no resolvable value"
                );
                output.push_str(&text[span.start..span.end]);
            }
        }
        cursor = span.end;
    }
    output.push_str(&text[cursor..]);
    Value::String(output)
}

fn lookup(expr: &str, index: usize, flattened: &HashMap<String, Value>) -> Option<Value> {
    let placeholder = Placeholder::parse(expr).ok()?;
    flattened.get(&placeholder.flattened_path(index)).cloned()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Coerce every string that parses as a finite number to a JSON number,
/// integer when there is no fractional part. Idempotent.
pub fn coerce_numbers(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                coerce_numbers(child);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                coerce_numbers(child);
            }
        }
        Value::String(text) => {
            if let Ok(number) = text.parse::<f64>() {
                if number.is_finite() {
                    *value = if number.fract() == 0.0 && number.abs() < (i64::MAX as f64) {
                        Value::from(number as i64)
                    } else {
                        Value::from(number)
                    };
                }
            }
        }
        _ => {}
    }
}

#[derive(Debug, Clone, Copy)]
struct PlaceholderSpan {
    /// Byte offset of the opening `{{`.
    start: usize,
    /// Byte offset just past the closing `}}`.
    end: usize,
    expr_start: usize,
    expr_end: usize,
}

fn placeholder_spans(text: &str) -> Vec<PlaceholderSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let expr_start = i + 2;
            if let Some(expr_end) = find_closing(bytes, expr_start) {
                spans.push(PlaceholderSpan {
                    start: i,
                    end: expr_end + 2,
                    expr_start,
                    expr_end,
                });
                i = expr_end + 2;
                continue;
            }
        }
        i += 1;
    }
    spans
}

fn find_closing(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'}' && bytes[i + 1] == b'}' {
            return Some(i);
        }
        i += 1;
    }
    None
}

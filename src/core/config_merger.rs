// src/core/config_merger.rs

use crate::core::schema::{FieldKind, Schema};
use crate::models::Configuration;
use serde_json::Value;

/// The effective configuration together with what was discarded on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub config: Configuration,
    /// One entry per unknown field per layer, as `(layer, field)`.
    pub ignored: Vec<(String, String)>,
}

/// A named configuration layer, lowest precedence first.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub name: &'a str,
    pub config: &'a Configuration,
}

impl<'a> Layer<'a> {
    pub fn new(name: &'a str, config: &'a Configuration) -> Self {
        Self { name, config }
    }
}

/// Computes the effective configuration: compiled defaults, then the global
/// file, then the local file.
///
/// Scalars and structured fields from a later layer replace earlier values.
/// List-union fields accumulate across all layers in order, without duplicates.
/// Fields absent from the schema are logged and dropped; this is never an error.
pub fn merge(schema: &Schema, global: &Configuration, local: Option<&Configuration>) -> MergeReport {
    let mut layers = vec![Layer::new("global", global)];
    if let Some(local) = local {
        layers.push(Layer::new("local", local));
    }
    merge_layers(schema, &layers)
}

/// Same as `merge`, for any number of layers. Used to apply command-line
/// overrides on top of the local file.
pub fn merge_layers(schema: &Schema, layers: &[Layer<'_>]) -> MergeReport {
    let mut report = MergeReport {
        config: schema.defaults(),
        ignored: Vec::new(),
    };

    for layer in layers {
        apply_layer(schema, &mut report, layer);
    }

    report
}

fn apply_layer(schema: &Schema, report: &mut MergeReport, layer: &Layer<'_>) {
    for (name, value) in layer.config.iter() {
        let kind = match schema.kind_of(name) {
            Some(kind) => kind,
            None => {
                log::warn!(
                    "Ignoring unknown property '{}' in the {} config file",
                    name,
                    layer.name
                );
                report.ignored.push((layer.name.to_string(), name.clone()));
                continue;
            }
        };

        let merged = match (kind, report.config.get(name), value) {
            (FieldKind::ListUnion, Some(Value::Array(current)), Value::Array(incoming)) => {
                Value::Array(union(current, incoming))
            }
            _ => value.clone(),
        };
        report.config.insert(name.clone(), merged);
    }
}

/// Ordered union: everything in `first`, then the items of `second` not seen yet.
pub fn union(first: &[Value], second: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = Vec::with_capacity(first.len() + second.len());
    for item in first.iter().chain(second) {
        if !result.contains(item) {
            result.push(item.clone());
        }
    }
    result
}

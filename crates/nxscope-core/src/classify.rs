//! Classification of thrown graph-construction errors.
//!
//! The graph bridge serializes whatever the tool threw. Newer versions throw
//! a `ProjectGraphError` that still carries a usable partial graph; that case
//! is recovered here, everything else is fatal.

use serde_json::Value;

use crate::error::NxError;

/// Discriminator of the tool's partial-graph error.
pub const PROJECT_GRAPH_ERROR: &str = "ProjectGraphError";

/// Discriminator of a plugin error wrapping one error per file.
pub const AGGREGATE_CREATE_NODES_ERROR: &str = "AggregateCreateNodesError";

/// What a thrown value turned out to be.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub is_partial_graph_error: bool,
    pub partial_graph: Option<Value>,
    pub partial_source_maps: Option<Value>,
    pub errors: Vec<NxError>,
}

/// Classify a serialized thrown value.
pub fn classify(thrown: &Value) -> Classification {
    if error_name(thrown) == Some(PROJECT_GRAPH_ERROR) {
        let errors = thrown
            .get("errors")
            .and_then(Value::as_array)
            .map(|list| list.iter().flat_map(flatten_error).collect())
            .unwrap_or_default();

        return Classification {
            is_partial_graph_error: true,
            partial_graph: non_null(thrown.get("partialProjectGraph")),
            partial_source_maps: non_null(thrown.get("partialSourceMaps")),
            errors,
        };
    }

    Classification {
        is_partial_graph_error: false,
        partial_graph: None,
        partial_source_maps: None,
        errors: vec![fatal_error(thrown)],
    }
}

fn error_name(value: &Value) -> Option<&str> {
    value.get("name").and_then(Value::as_str)
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

/// One entry per offending file; aggregate plugin errors fan out.
fn flatten_error(error: &Value) -> Vec<NxError> {
    let plugin = error.get("pluginName").and_then(Value::as_str);

    if error_name(error) == Some(AGGREGATE_CREATE_NODES_ERROR) {
        if let Some(per_file) = error.get("errors").and_then(Value::as_array) {
            return per_file
                .iter()
                .filter_map(|pair| {
                    let pair = pair.as_array()?;
                    let file = pair.first()?.as_str()?;
                    let mut entry = to_nx_error(pair.get(1).unwrap_or(&Value::Null));
                    entry.file = Some(file.to_string());
                    if entry.plugin_name.is_none() {
                        entry.plugin_name = plugin.map(str::to_string);
                    }
                    if entry.name.is_none() {
                        entry.name = Some(AGGREGATE_CREATE_NODES_ERROR.to_string());
                    }
                    Some(entry)
                })
                .collect();
        }
    }

    vec![to_nx_error(error)]
}

fn to_nx_error(value: &Value) -> NxError {
    let str_field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

    let message = str_field("message")
        .or_else(|| value.as_str().map(str::to_string))
        .unwrap_or_default();

    NxError {
        name: str_field("name"),
        message,
        stack: str_field("stack"),
        file: str_field("file"),
        plugin_name: str_field("pluginName"),
        cause: non_null(value.get("cause")),
    }
}

/// The single generic entry reported for a fatal failure.
pub fn fatal_error(thrown: &Value) -> NxError {
    match thrown {
        Value::Object(_) => {
            let mut error = to_nx_error(thrown);
            if error.message.is_empty() {
                error.message = thrown
                    .get("value")
                    .and_then(Value::as_str)
                    .unwrap_or("graph construction failed")
                    .to_string();
            }
            error
        }
        Value::String(message) => NxError::new(message.clone()),
        Value::Null => NxError::new("graph construction failed"),
        other => NxError::new(other.to_string()),
    }
}

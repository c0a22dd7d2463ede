//! Task resource rewriting for state machine definitions
//!
//! Definitions written for the real service reference Lambda functions by
//! ARNs or CloudFormation intrinsics that mean nothing to a local emulator.
//! [`rewrite`] walks a definition and points every mapped task state at a
//! locally resolvable function instead.
//!
//! Lookup is keyed by the name of the container a node sits under. For a
//! task state that is the state name, because states live under `States`
//! keyed by name:
//!
//! ```
//! use serde_json::json;
//! use stepfunctions_offline::definition::{rewrite, ResourceMapping};
//!
//! let definition = json!({
//!     "StartAt": "Hello",
//!     "States": {
//!         "Hello": {
//!             "Type": "Task",
//!             "Resource": "arn:aws:lambda:us-east-1:123456789012:function:hello",
//!             "End": true
//!         }
//!     }
//! });
//! let mapping: ResourceMapping = [("Hello", "hello-local")].into_iter().collect();
//!
//! let rewritten = rewrite(&definition, &mapping);
//! assert_eq!(rewritten["States"]["Hello"]["Resource"], "hello-local");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Substring marking a task that uses the callback (task token) integration
pub const CALLBACK_PATTERN_MARKER: &str = ".waitForTaskToken";

const RESOURCE_KEY: &str = "Resource";
const PARAMETERS_KEY: &str = "Parameters";
const FUNCTION_NAME_KEY: &str = "FunctionName";

/// Replacement resources keyed by the name of the enclosing state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceMapping(BTreeMap<String, String>);

impl ResourceMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the resource used for a state
    pub fn insert(&mut self, state: impl Into<String>, resource: impl Into<String>) {
        self.0.insert(state.into(), resource.into());
    }

    /// Replacement resource for a state, if one is mapped
    pub fn get(&self, state: &str) -> Option<&str> {
        self.0.get(state).map(String::as_str)
    }

    /// Whether no states are mapped
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of mapped states
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(state, resource)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ResourceMapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Return a copy of `tree` with mapped task resources substituted
///
/// A node is rewritten when it carries a `Resource` field and the key it
/// sits under is present in `mapping`. Callback-pattern tasks keep their
/// integration `Resource` and receive the replacement as
/// `Parameters.FunctionName`. Everything else is copied unchanged, and the
/// walk never fails: values it cannot interpret are left alone.
pub fn rewrite(tree: &Value, mapping: &ResourceMapping) -> Value {
    if mapping.is_empty() {
        return tree.clone();
    }
    rewrite_node(tree, mapping, None)
}

fn rewrite_node(node: &Value, mapping: &ResourceMapping, parent_key: Option<&str>) -> Value {
    match node {
        Value::Object(fields) => {
            let mut fields = fields.clone();

            if let Some(replacement) = parent_key.and_then(|key| mapping.get(key)) {
                substitute_resource(&mut fields, replacement);
            }

            let rewritten = fields
                .into_iter()
                .map(|(key, value)| {
                    let value = if is_container(&value) {
                        rewrite_node(&value, mapping, Some(key.as_str()))
                    } else {
                        value
                    };
                    (key, value)
                })
                .collect();
            Value::Object(rewritten)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    if is_container(item) {
                        rewrite_node(item, mapping, Some(index.to_string().as_str()))
                    } else {
                        item.clone()
                    }
                })
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

fn substitute_resource(fields: &mut Map<String, Value>, replacement: &str) {
    let is_callback = match fields.get(RESOURCE_KEY) {
        None | Some(Value::Null) => return,
        Some(Value::String(resource)) => resource.contains(CALLBACK_PATTERN_MARKER),
        Some(_) => false,
    };

    if is_callback {
        let parameters = fields
            .entry(PARAMETERS_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !parameters.is_object() {
            *parameters = Value::Object(Map::new());
        }
        if let Value::Object(parameters) = parameters {
            parameters.insert(
                FUNCTION_NAME_KEY.to_string(),
                Value::String(replacement.to_string()),
            );
        }
    } else {
        fields.insert(
            RESOURCE_KEY.to_string(),
            Value::String(replacement.to_string()),
        );
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

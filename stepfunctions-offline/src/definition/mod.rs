//! State machine definitions and their preparation for the local emulator
//!
//! Definitions come from the `stepFunctions.stateMachines` section of a
//! `serverless.yml`. Each entry is kept as an untyped JSON tree so that any
//! Amazon States Language construct survives the trip to the emulator.

mod rewriter;

pub use rewriter::{rewrite, ResourceMapping, CALLBACK_PATTERN_MARKER};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when reading state machine definitions
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DefinitionError {
    /// State machine name cannot be empty or whitespace only
    #[error("State machine name cannot be empty or whitespace only")]
    EmptyName,

    /// A state machine entry has no `definition`
    #[error("State machine '{key}' has no definition")]
    MissingDefinition {
        /// Key of the entry under `stateMachines`
        key: String,
    },

    /// A state machine entry is not a mapping
    #[error("State machine '{key}' is invalid: {reason}")]
    InvalidEntry {
        /// Key of the entry under `stateMachines`
        key: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for definition operations
pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Name a state machine is registered under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StateMachineName(String);

impl StateMachineName {
    /// Create a new state machine name, returning an error for blank input
    pub fn try_new(name: impl Into<String>) -> DefinitionResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        Ok(Self(name))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateMachineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single state machine as declared in the service configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateMachineDefinition {
    /// Key under `stepFunctions.stateMachines`
    pub key: String,
    /// Registration name (`name:` when present, otherwise the key)
    pub name: StateMachineName,
    /// Amazon States Language definition tree
    pub definition: Value,
}

impl StateMachineDefinition {
    /// Create a definition whose registration name equals its key
    pub fn new(key: impl Into<String>, definition: Value) -> DefinitionResult<Self> {
        let key = key.into();
        Ok(Self {
            name: StateMachineName::try_new(key.clone())?,
            key,
            definition,
        })
    }

    /// Copy of this definition with task resources substituted
    pub fn rewritten(&self, mapping: &ResourceMapping) -> Self {
        Self {
            key: self.key.clone(),
            name: self.name.clone(),
            definition: rewrite(&self.definition, mapping),
        }
    }

    /// Definition serialized the way the management API expects it
    pub fn definition_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.definition)
    }
}

/// All state machines of a service, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StateMachines(Vec<StateMachineDefinition>);

impl StateMachines {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state machine
    pub fn push(&mut self, definition: StateMachineDefinition) {
        self.0.push(definition);
    }

    /// Build from the `stepFunctions.stateMachines` YAML mapping
    pub fn from_yaml(state_machines: &serde_yaml::Mapping) -> DefinitionResult<Self> {
        let mut machines = Self::new();

        for (key, entry) in state_machines {
            let key = yaml_key_to_string(key);
            let entry = match entry {
                serde_yaml::Value::Mapping(entry) => entry,
                other => {
                    return Err(DefinitionError::InvalidEntry {
                        key,
                        reason: format!("expected a mapping, found {}", yaml_kind(other)),
                    })
                }
            };

            let definition = entry
                .get("definition")
                .filter(|d| !d.is_null())
                .ok_or_else(|| DefinitionError::MissingDefinition { key: key.clone() })?;

            let name = match entry.get("name") {
                Some(serde_yaml::Value::String(name)) => StateMachineName::try_new(name.clone())?,
                Some(serde_yaml::Value::Null) | None => StateMachineName::try_new(key.clone())?,
                Some(other) => {
                    return Err(DefinitionError::InvalidEntry {
                        key,
                        reason: format!("name must be a string, found {}", yaml_kind(other)),
                    })
                }
            };

            machines.push(StateMachineDefinition {
                key,
                name,
                definition: yaml_to_json(definition),
            });
        }

        Ok(machines)
    }

    /// Copy of every definition with task resources substituted
    pub fn rewritten(&self, mapping: &ResourceMapping) -> Self {
        Self(self.0.iter().map(|d| d.rewritten(mapping)).collect())
    }

    /// Look up a state machine by key or registration name
    pub fn get(&self, name: &str) -> Option<&StateMachineDefinition> {
        self.0
            .iter()
            .find(|d| d.name.as_str() == name || d.key == name)
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, StateMachineDefinition> {
        self.0.iter()
    }

    /// Number of state machines
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no state machines
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a StateMachines {
    type Item = &'a StateMachineDefinition;
    type IntoIter = std::slice::Iter<'a, StateMachineDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<StateMachineDefinition> for StateMachines {
    fn from_iter<I: IntoIterator<Item = StateMachineDefinition>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Convert a YAML tree into the equivalent JSON tree
///
/// CloudFormation short-form tags such as `!GetAtt` are dropped and their
/// value kept; non-string mapping keys are stringified.
pub fn yaml_to_json(value: &serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s.clone()),
        serde_yaml::Value::Sequence(items) => Value::Array(items.iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (yaml_key_to_string(k), yaml_to_json(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn yaml_key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

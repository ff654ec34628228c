use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of tabular input: field name to scalar.
pub type Row = serde_json::Map<String, Value>;

/// Variables visible to a condition expression.
pub type Scope = BTreeMap<String, Value>;

/// An externally supplied named value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub current_value: Value,
}

impl Variable {
    pub fn new(name: impl Into<String>, current_value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            current_value: current_value.into(),
        }
    }
}

/// Variables keyed by name; a later variable with the same name wins.
pub fn flatten_variables(variables: &[Variable]) -> Scope {
    variables
        .iter()
        .map(|v| (v.name.clone(), v.current_value.clone()))
        .collect()
}

/// Row fields first, then variables on top.
pub fn compose_scope(row: Option<&Row>, variables: &[Variable]) -> Scope {
    let mut scope = Scope::new();
    if let Some(row) = row {
        scope.extend(row.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    scope.extend(flatten_variables(variables));
    scope
}

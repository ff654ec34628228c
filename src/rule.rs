//! Binding and styling rules, as loaded from a YAML or JSON rule document.
//!
//! A document holds two lists, `bindingRules` and `stylingRules`. Each rule is
//! deserialized and validated on its own so one malformed entry is reported as a
//! diagnostic while the rest of the document still loads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Binding,
    Styling,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Binding => write!(f, "binding"),
            RuleKind::Styling => write!(f, "styling"),
        }
    }
}

/// Action fields shared by unconditional rules and conditional branches.
///
/// Keys outside the known set are kept in `unknown` so the executor can report
/// them instead of silently dropping them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_data: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_class: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_style: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_shape: Option<String>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

impl ActionSet {
    pub fn has_binding(&self) -> bool {
        self.bind_data.is_some()
    }

    pub fn has_styling(&self) -> bool {
        self.apply_class.is_some()
            || self.apply_style.is_some()
            || self.apply_text.is_some()
            || self.apply_shape.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_binding() && !self.has_styling()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub action: ActionSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElseBranch {
    #[serde(default)]
    pub action: ActionSet,
}

/// `else_if` may be written as one condition object or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElseIf {
    One(Condition),
    Many(Vec<Condition>),
}

impl ElseIf {
    pub fn as_slice(&self) -> &[Condition] {
        match self {
            ElseIf::One(c) => std::slice::from_ref(c),
            ElseIf::Many(list) => list,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_branch: Option<Condition>,
    #[serde(rename = "else_if", default, skip_serializing_if = "Option::is_none")]
    pub else_if: Option<ElseIf>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_branch: Option<ElseBranch>,
}

impl Function {
    pub fn else_if_branches(&self) -> &[Condition] {
        self.else_if.as_ref().map(ElseIf::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<Function>,
    #[serde(flatten)]
    pub actions: ActionSet,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_elements<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elements = Some(elements.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.function = Some(function);
        self
    }

    pub fn with_actions(mut self, actions: ActionSet) -> Self {
        self.actions = actions;
        self
    }

    /// Checks the structural invariants a rule must meet before evaluation.
    pub fn validate(&self, kind: RuleKind) -> Result<(), RuleError> {
        if self.name.trim().is_empty() {
            return Err(RuleError::MissingName);
        }
        if self.elements.as_ref().is_some_and(Vec::is_empty) {
            return Err(RuleError::EmptyElements);
        }
        match &self.function {
            Some(_) if !self.actions.is_empty() => Err(RuleError::ConflictingActions),
            Some(function) => validate_function(function),
            None if self.actions.is_empty() => Err(RuleError::MissingActions),
            None => match kind {
                RuleKind::Binding if !self.actions.has_binding() => {
                    Err(RuleError::WrongActionKind { kind })
                }
                RuleKind::Styling if !self.actions.has_styling() => {
                    Err(RuleError::WrongActionKind { kind })
                }
                _ => Ok(()),
            },
        }
    }
}

fn validate_function(function: &Function) -> Result<(), RuleError> {
    let Some(if_branch) = &function.if_branch else {
        return Err(RuleError::MissingIf);
    };
    if if_branch.condition.trim().is_empty() {
        return Err(RuleError::EmptyCondition {
            branch: "if".to_string(),
        });
    }
    for (i, branch) in function.else_if_branches().iter().enumerate() {
        if branch.condition.trim().is_empty() {
            return Err(RuleError::EmptyCondition {
                branch: format!("else_if[{i}]"),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("rule document could not be parsed: {0}")]
    Document(String),

    #[error("rule is malformed: {0}")]
    Malformed(String),

    #[error("rule has no name")]
    MissingName,

    #[error("`elements` is present but empty")]
    EmptyElements,

    #[error("rule has neither actions nor a function")]
    MissingActions,

    #[error("rule has both unconditional actions and a function")]
    ConflictingActions,

    #[error("function has no `if` block")]
    MissingIf,

    #[error("{branch} condition is empty")]
    EmptyCondition { branch: String },

    #[error("{kind} rule carries no {kind} actions")]
    WrongActionKind { kind: RuleKind },
}

/// A rule rejected at load time, identified by its list and position.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDiagnostic {
    pub kind: RuleKind,
    pub index: usize,
    pub name: Option<String>,
    pub error: RuleError,
}

impl fmt::Display for RuleDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} rule #{} `{}`: {}", self.kind, self.index, name, self.error),
            None => write!(f, "{} rule #{}: {}", self.kind, self.index, self.error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub binding_rules: Vec<Rule>,
    pub styling_rules: Vec<Rule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    binding_rules: Vec<Value>,
    #[serde(default)]
    styling_rules: Vec<Value>,
}

/// Loads a rule document. JSON is accepted as well since it is valid YAML.
///
/// Only an unparseable document is an error; invalid rules are dropped and
/// reported through the returned diagnostics.
pub fn load_rules(text: &str) -> Result<(RuleSet, Vec<RuleDiagnostic>), RuleError> {
    let raw: RawDocument = if text.trim().is_empty() {
        RawDocument::default()
    } else {
        serde_yaml::from_str(text).map_err(|e| RuleError::Document(e.to_string()))?
    };

    let mut diagnostics = Vec::new();
    let binding_rules = collect_rules(RuleKind::Binding, raw.binding_rules, &mut diagnostics);
    let styling_rules = collect_rules(RuleKind::Styling, raw.styling_rules, &mut diagnostics);

    tracing::debug!(
        binding = binding_rules.len(),
        styling = styling_rules.len(),
        rejected = diagnostics.len(),
        "loaded rule document"
    );

    Ok((
        RuleSet {
            binding_rules,
            styling_rules,
        },
        diagnostics,
    ))
}

fn collect_rules(
    kind: RuleKind,
    raw: Vec<Value>,
    diagnostics: &mut Vec<RuleDiagnostic>,
) -> Vec<Rule> {
    let mut rules = Vec::new();
    for (index, value) in raw.into_iter().enumerate() {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let checked = serde_json::from_value::<Rule>(value)
            .map_err(|e| RuleError::Malformed(e.to_string()))
            .and_then(|rule| rule.validate(kind).map(|()| rule));
        match checked {
            Ok(rule) => rules.push(rule),
            Err(error) => {
                let diagnostic = RuleDiagnostic {
                    kind,
                    index,
                    name,
                    error,
                };
                tracing::warn!("rejected {diagnostic}");
                diagnostics.push(diagnostic);
            }
        }
    }
    rules
}

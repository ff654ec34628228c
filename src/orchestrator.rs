//! The two-phase rule pipeline.
//!
//! Binding rules run first and fill each element's `data`; a substitution pass
//! then resolves `$token` placeholders in labels; styling rules run last and
//! evaluate their conditions against the data bound in this same cycle.

use serde::Deserialize;

use crate::action::{apply_action, substitute_tokens};
use crate::conditions::{ResolvedAction, determine_actions, select_branch};
use crate::diagram::{DataMap, DiagramMap};
use crate::rule::{Rule, RuleKind, RuleSet};
use crate::scope::{Row, Variable};
use crate::targets::resolve_targets;

/// Tabular rows and external variables for one evaluation cycle.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataInput {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl DataInput {
    pub fn new(rows: Vec<Row>, variables: Vec<Variable>) -> Self {
        Self { rows, variables }
    }
}

/// What one rule did during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTrace {
    pub kind: RuleKind,
    pub name: String,
    /// Ids of the elements the rule actually mutated, in id order.
    pub applied_to: Vec<String>,
}

/// Rules sorted by ascending priority; rules without one come last and ties
/// keep their declaration order.
pub fn sort_by_priority(rules: &[Rule]) -> Vec<&Rule> {
    let mut sorted: Vec<&Rule> = rules.iter().collect();
    sorted.sort_by_key(|r| match r.priority {
        Some(p) => (false, p),
        None => (true, 0),
    });
    sorted
}

/// Runs every rule against `map` in place and reports what each rule touched.
///
/// The map is first reset with [`DiagramMap::reset_rule_state`], so running the
/// same map again starts from its parsed labels and styling.
pub fn apply_rules(map: &mut DiagramMap, rules: &RuleSet, input: &DataInput) -> Vec<RuleTrace> {
    map.reset_rule_state();
    let mut traces = Vec::new();

    for rule in sort_by_priority(&rules.binding_rules) {
        traces.push(run_binding_rule(map, rule, input));
    }

    substitute_labels(map);

    for rule in sort_by_priority(&rules.styling_rules) {
        traces.push(run_styling_rule(map, rule));
    }

    traces
}

fn run_binding_rule(map: &mut DiagramMap, rule: &Rule, input: &DataInput) -> RuleTrace {
    let targets = resolve_targets(rule, map);
    let mut applied_to = Vec::new();

    if rule.function.is_some() {
        let matched = input.rows.iter().find_map(|row| {
            determine_actions(rule, Some(row), &input.variables).map(|branches| (row, branches))
        });
        if let Some((row, branches)) = matched {
            for id in &targets {
                if apply_branches(map, id, &branches, Some(row), &input.variables) {
                    applied_to.push(id.clone());
                }
            }
        }
    } else {
        let branches = [ResolvedAction {
            condition: "",
            action: &rule.actions,
        }];
        for id in &targets {
            if apply_branches(map, id, &branches, None, &input.variables) {
                applied_to.push(id.clone());
            }
        }
    }

    tracing::debug!(rule = %rule.name, targets = applied_to.len(), "binding rule applied");
    RuleTrace {
        kind: RuleKind::Binding,
        name: rule.name.clone(),
        applied_to,
    }
}

fn run_styling_rule(map: &mut DiagramMap, rule: &Rule) -> RuleTrace {
    let targets = resolve_targets(rule, map);
    let mut applied_to = Vec::new();

    for id in &targets {
        let applied = match &rule.function {
            Some(function) => {
                let Some(data) = map.element_data(id).filter(|d| !d.is_empty()) else {
                    continue;
                };
                let Some(branches) = select_branch(function, data) else {
                    continue;
                };
                apply_branches(map, id, &branches, None, &[])
            }
            None => {
                let branches = [ResolvedAction {
                    condition: "",
                    action: &rule.actions,
                }];
                apply_branches(map, id, &branches, None, &[])
            }
        };
        if applied {
            applied_to.push(id.clone());
        }
    }

    tracing::debug!(rule = %rule.name, targets = applied_to.len(), "styling rule applied");
    RuleTrace {
        kind: RuleKind::Styling,
        name: rule.name.clone(),
        applied_to,
    }
}

/// Applies `branches` to the element `id`; unknown ids are skipped.
fn apply_branches(
    map: &mut DiagramMap,
    id: &str,
    branches: &[ResolvedAction<'_>],
    row: Option<&Row>,
    variables: &[Variable],
) -> bool {
    let Some(mut element) = map.element_mut(id) else {
        return false;
    };
    for branch in branches {
        apply_action(branch.action, &mut element, row, variables);
    }
    true
}

/// Resolves `$token` placeholders in node text and subgraph titles from bound data.
pub fn substitute_labels(map: &mut DiagramMap) {
    for node in &mut map.nodes {
        substitute_label(&mut node.text, &node.data);
    }
    for sg in &mut map.subgraphs {
        substitute_label(&mut sg.title, &sg.data);
    }
}

fn substitute_label(label: &mut Option<String>, data: &DataMap) {
    if data.is_empty() {
        return;
    }
    if let Some(text) = label.as_mut().filter(|t| t.contains('$')) {
        *text = substitute_tokens(text, data);
    }
}

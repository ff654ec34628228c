use crate::expr_eval::evaluate;
use crate::rule::{ActionSet, Condition, Function, Rule};
use crate::scope::{Row, Scope, Variable, compose_scope};

/// Condition recorded for a taken `else` branch.
pub const ELSE_CONDITION: &str = "true";

/// A branch chosen by [`select_branch`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAction<'r> {
    pub condition: &'r str,
    pub action: &'r ActionSet,
}

impl<'r> From<&'r Condition> for ResolvedAction<'r> {
    fn from(c: &'r Condition) -> Self {
        Self {
            condition: &c.condition,
            action: &c.action,
        }
    }
}

/// Picks the first matching branch of `function`: `if`, then each `else_if` in
/// order, then `else`. Branches never accumulate.
pub fn select_branch<'r>(function: &'r Function, scope: &Scope) -> Option<Vec<ResolvedAction<'r>>> {
    let if_branch = function.if_branch.as_ref()?;
    if evaluate(&if_branch.condition, scope) {
        return Some(vec![if_branch.into()]);
    }
    if let Some(branch) = function
        .else_if_branches()
        .iter()
        .find(|b| evaluate(&b.condition, scope))
    {
        return Some(vec![branch.into()]);
    }
    function.else_branch.as_ref().map(|b| {
        vec![ResolvedAction {
            condition: ELSE_CONDITION,
            action: &b.action,
        }]
    })
}

/// Resolves a rule's function against one data row and the external variables.
/// Rules without a function resolve to nothing.
pub fn determine_actions<'r>(
    rule: &'r Rule,
    row: Option<&Row>,
    variables: &[Variable],
) -> Option<Vec<ResolvedAction<'r>>> {
    let function = rule.function.as_ref()?;
    select_branch(function, &compose_scope(row, variables))
}

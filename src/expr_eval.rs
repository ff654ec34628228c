//! Condition evaluation over a variable scope.
//!
//! Expressions are parsed into an AST and interpreted; nothing in the scope can
//! be executed. Coercions follow the usual scripting rules: `+` joins strings,
//! relational operators compare numerically unless both sides are strings, and
//! `==` is loose while `===` is strict.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

use crate::expr_ast::*;
use crate::expr_parser::parse_expression;
use crate::scope::Scope;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("`{0}` is not defined")]
    UndefinedVariable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl ExprValue {
    pub fn from_json(value: &Value) -> ExprValue {
        match value {
            Value::Null => ExprValue::Null,
            Value::Bool(b) => ExprValue::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(ExprValue::Undefined, ExprValue::Number),
            Value::String(s) => ExprValue::Str(s.clone()),
            other => ExprValue::Str(other.to_string()),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            ExprValue::Undefined | ExprValue::Null => false,
            ExprValue::Bool(b) => *b,
            ExprValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ExprValue::Str(s) => !s.is_empty(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            ExprValue::Undefined => f64::NAN,
            ExprValue::Null => 0.0,
            ExprValue::Bool(b) => f64::from(u8::from(*b)),
            ExprValue::Number(n) => *n,
            ExprValue::Str(s) => string_to_number(s.trim()),
        }
    }

    fn strict_eq(&self, other: &ExprValue) -> bool {
        match (self, other) {
            (ExprValue::Number(a), ExprValue::Number(b)) => a == b,
            _ => self == other,
        }
    }

    fn loose_eq(&self, other: &ExprValue) -> bool {
        use ExprValue as V;
        match (self, other) {
            (V::Undefined | V::Null, V::Undefined | V::Null) => true,
            (V::Undefined | V::Null, _) | (_, V::Undefined | V::Null) => false,
            (V::Number(_), V::Str(_)) | (V::Str(_), V::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (V::Bool(_), _) => V::Number(self.to_number()).loose_eq(other),
            (_, V::Bool(_)) => self.loose_eq(&V::Number(other.to_number())),
            _ => self.strict_eq(other),
        }
    }

    fn compare(&self, other: &ExprValue) -> Option<Ordering> {
        match (self, other) {
            (ExprValue::Str(a), ExprValue::Str(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprValue::Undefined => write!(f, "undefined"),
            ExprValue::Null => write!(f, "null"),
            ExprValue::Bool(b) => write!(f, "{b}"),
            ExprValue::Number(n) if n.is_nan() => write!(f, "NaN"),
            ExprValue::Number(n) if n.is_infinite() => {
                write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
            }
            ExprValue::Number(n) if *n == 0.0 => write!(f, "0"),
            ExprValue::Number(n) => write!(f, "{n}"),
            ExprValue::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Evaluates `expression` against `scope` and reduces the result to a boolean.
///
/// Never fails: syntax errors and undefined variables are logged and yield `false`.
pub fn evaluate(expression: &str, scope: &Scope) -> bool {
    match try_evaluate(expression, scope) {
        Ok(value) => value.truthy(),
        Err(e) => {
            tracing::warn!(expression, error = %e, "condition evaluation failed");
            false
        }
    }
}

pub fn try_evaluate(expression: &str, scope: &Scope) -> Result<ExprValue, EvalError> {
    let expr = parse_expression(expression).map_err(EvalError::Syntax)?;
    eval(&expr, scope)
}

pub fn eval(expr: &Expr, scope: &Scope) -> Result<ExprValue, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Undefined => ExprValue::Undefined,
            Literal::Null => ExprValue::Null,
            Literal::Bool(b) => ExprValue::Bool(*b),
            Literal::Number(n) => ExprValue::Number(*n),
            Literal::Str(s) => ExprValue::Str(s.clone()),
        }),
        Expr::Ident(name) => scope
            .get(name)
            .map(ExprValue::from_json)
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::Unary(op, operand) => {
            let value = eval(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => ExprValue::Bool(!value.truthy()),
                UnaryOp::Neg => ExprValue::Number(-value.to_number()),
                UnaryOp::Plus => ExprValue::Number(value.to_number()),
            })
        }
        Expr::Logical(op, lhs, rhs) => {
            let left = eval(lhs, scope)?;
            match (op, left.truthy()) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                _ => eval(rhs, scope),
            }
        }
        Expr::Conditional(test, then, otherwise) => {
            if eval(test, scope)?.truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = eval(lhs, scope)?;
            let right = eval(rhs, scope)?;
            Ok(binary(*op, &left, &right))
        }
    }
}

fn binary(op: BinaryOp, left: &ExprValue, right: &ExprValue) -> ExprValue {
    use ExprValue as V;
    match op {
        BinaryOp::Add => match (left, right) {
            (V::Str(_), _) | (_, V::Str(_)) => V::Str(format!("{left}{right}")),
            _ => V::Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Sub => V::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => V::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => V::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => V::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => V::Bool(left.compare(right) == Some(Ordering::Less)),
        BinaryOp::Le => V::Bool(matches!(
            left.compare(right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => V::Bool(left.compare(right) == Some(Ordering::Greater)),
        BinaryOp::Ge => V::Bool(matches!(
            left.compare(right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => V::Bool(left.loose_eq(right)),
        BinaryOp::Ne => V::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => V::Bool(left.strict_eq(right)),
        BinaryOp::StrictNe => V::Bool(!left.strict_eq(right)),
    }
}

/// Numeric reading of a string: empty is zero, `Infinity` may carry a sign,
/// and words such as `inf` or `nan` are not numbers.
fn string_to_number(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned == "Infinity" {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    if unsigned.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    text.parse().unwrap_or(f64::NAN)
}

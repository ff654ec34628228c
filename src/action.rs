use serde_json::Value;

use crate::diagram::{DataMap, ElementMut, NodeShape};
use crate::expr_eval::ExprValue;
use crate::rule::ActionSet;
use crate::scope::{Row, Variable, flatten_variables};

/// Applies every present action key to `element` in a fixed order:
/// bindData, applyClass, applyStyle, applyText, applyShape, then unknown keys.
///
/// A supplied `row` is always bound, even when the action carries no `bindData`.
pub fn apply_action(
    action: &ActionSet,
    element: &mut ElementMut<'_>,
    row: Option<&Row>,
    variables: &[Variable],
) {
    if action.bind_data.is_some() || row.is_some() {
        bind_data(
            element,
            action.bind_data.as_deref().unwrap_or(&[]),
            row,
            variables,
        );
    }
    if let Some(classes) = &action.apply_class {
        apply_class(element, classes);
    }
    if let Some(styles) = &action.apply_style {
        apply_style(element, styles);
    }
    if let Some(text) = &action.apply_text {
        apply_text(element, text);
    }
    if let Some(shape) = &action.apply_shape {
        apply_shape(element, shape);
    }
    for key in action.unknown.keys() {
        tracing::warn!(action = %key, element = element.id(), "unknown action key ignored");
    }
}

fn bind_data(element: &mut ElementMut<'_>, pairs: &[String], row: Option<&Row>, variables: &[Variable]) {
    let data = element.data_mut();
    if let Some(row) = row {
        data.extend(row.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    data.extend(flatten_variables(variables));
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                data.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
            }
            _ => tracing::warn!(entry = %pair, "bindData entry is not `key=value`"),
        }
    }
}

fn apply_class(element: &mut ElementMut<'_>, names: &[String]) {
    let classes = element.classes_mut();
    for name in names {
        classes.retain(|c| c != name);
        classes.push(name.clone());
    }
}

fn style_property(declaration: &str) -> &str {
    declaration
        .split_once(':')
        .map_or(declaration, |(property, _)| property)
        .trim()
}

/// A declaration replaces any earlier one for the same property and moves to the end.
fn apply_style(element: &mut ElementMut<'_>, declarations: &[String]) {
    let styles = element.styles_mut();
    for declaration in declarations {
        let property = style_property(declaration);
        styles.retain(|existing| style_property(existing) != property);
        styles.push(declaration.clone());
    }
}

fn apply_text(element: &mut ElementMut<'_>, text: &str) {
    let resolved = substitute_tokens(text, element.data());
    *element.label_mut() = Some(resolved);
}

fn apply_shape(element: &mut ElementMut<'_>, name: &str) {
    let Some(shape) = NodeShape::from_name(name) else {
        tracing::debug!(shape = name, element = element.id(), "unrecognized shape ignored");
        return;
    };
    if let Some(slot) = element.shape_mut() {
        *slot = shape;
    }
}

/// Renders a bound scalar the way it appears in label text.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => ExprValue::from_json(value).to_string(),
        other => other.to_string(),
    }
}

/// Replaces `$name` tokens with values from `data`; unknown tokens stay verbatim.
pub fn substitute_tokens(text: &str, data: &DataMap) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let len = after
            .char_indices()
            .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
            .map_or(after.len(), |(i, _)| i);
        let name = &after[..len];
        match data.get(name) {
            Some(value) if !name.is_empty() => out.push_str(&scalar_text(value)),
            _ => {
                out.push('$');
                out.push_str(name);
            }
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{Node, Subgraph};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn classes(names: &[&str]) -> ActionSet {
        ActionSet {
            apply_class: Some(names.iter().map(|s| s.to_string()).collect()),
            ..ActionSet::default()
        }
    }

    fn styles(decls: &[&str]) -> ActionSet {
        ActionSet {
            apply_style: Some(decls.iter().map(|s| s.to_string()).collect()),
            ..ActionSet::default()
        }
    }

    fn bind(pairs: &[&str]) -> ActionSet {
        ActionSet {
            bind_data: Some(pairs.iter().map(|s| s.to_string()).collect()),
            ..ActionSet::default()
        }
    }

    #[test]
    fn class_application_is_idempotent_but_reorders() {
        let mut node = Node::new("n");
        node.classes = vec!["x".into(), "y".into()];
        let mut el = ElementMut::Node(&mut node);
        apply_action(&classes(&["x"]), &mut el, None, &[]);
        apply_action(&classes(&["x"]), &mut el, None, &[]);
        assert_eq!(node.classes, vec!["y", "x"]);
    }

    #[test]
    fn style_override_replaces_property() {
        let mut node = Node::new("n");
        node.styles = vec!["fill:blue".into(), "stroke:black".into()];
        apply_action(&styles(&["fill:red"]), &mut ElementMut::Node(&mut node), None, &[]);
        assert_eq!(node.styles, vec!["stroke:black", "fill:red"]);
    }

    #[test]
    fn style_property_ignores_whitespace() {
        let mut node = Node::new("n");
        node.styles = vec!["fill : blue".into()];
        apply_action(&styles(&["fill:red", "color:#fff"]), &mut ElementMut::Node(&mut node), None, &[]);
        assert_eq!(node.styles, vec!["fill:red", "color:#fff"]);
    }

    #[test]
    fn explicit_pairs_win_over_row_and_variables() {
        let mut node = Node::new("n");
        let row = json!({"cpu": 10, "host": "a"}).as_object().cloned().unwrap();
        let vars = [Variable::new("cpu", 50), Variable::new("region", "eu")];
        apply_action(&bind(&["cpu=99"]), &mut ElementMut::Node(&mut node), Some(&row), &vars);
        assert_eq!(node.data["cpu"], json!("99"));
        assert_eq!(node.data["host"], json!("a"));
        assert_eq!(node.data["region"], json!("eu"));
    }

    #[test]
    fn variables_override_row_in_bind() {
        let mut node = Node::new("n");
        let row = json!({"cpu": 10}).as_object().cloned().unwrap();
        apply_action(&bind(&[]), &mut ElementMut::Node(&mut node), Some(&row), &[Variable::new("cpu", 50)]);
        assert_eq!(node.data["cpu"], json!(50));
    }

    #[test]
    fn malformed_pair_is_skipped() {
        let mut node = Node::new("n");
        apply_action(&bind(&["novalue", "a=b=c"]), &mut ElementMut::Node(&mut node), None, &[]);
        assert_eq!(node.data.len(), 1);
        assert_eq!(node.data["a"], json!("b=c"));
    }

    #[test]
    fn row_is_bound_without_bind_data() {
        let mut node = Node::new("n");
        let row = json!({"k": 1}).as_object().cloned().unwrap();
        apply_action(&classes(&["c"]), &mut ElementMut::Node(&mut node), Some(&row), &[]);
        assert_eq!(node.data["k"], json!(1));
        assert_eq!(node.classes, vec!["c"]);
    }

    #[test]
    fn text_goes_to_node_text_and_subgraph_title() {
        let action = ActionSet {
            apply_text: Some("CPU $cpu".into()),
            ..ActionSet::default()
        };
        let mut node = Node::new("n");
        node.data.insert("cpu".into(), json!(80));
        apply_action(&action, &mut ElementMut::Node(&mut node), None, &[]);
        assert_eq!(node.text.as_deref(), Some("CPU 80"));

        let mut sg = Subgraph::new("g");
        apply_action(&action, &mut ElementMut::Subgraph(&mut sg), None, &[]);
        assert_eq!(sg.title.as_deref(), Some("CPU $cpu"));
    }

    #[test]
    fn shape_whitelist() {
        let mut node = Node::new("n");
        let shape = |name: &str| ActionSet {
            apply_shape: Some(name.into()),
            ..ActionSet::default()
        };
        apply_action(&shape("hexagon"), &mut ElementMut::Node(&mut node), None, &[]);
        assert_eq!(node.shape, NodeShape::Hexagon);
        apply_action(&shape("blob"), &mut ElementMut::Node(&mut node), None, &[]);
        assert_eq!(node.shape, NodeShape::Hexagon);
    }

    #[test]
    fn unknown_keys_do_not_mutate() {
        let mut node = Node::new("n");
        let mut action = ActionSet::default();
        action.unknown.insert("applyBlink".into(), json!(true));
        apply_action(&action, &mut ElementMut::Node(&mut node), None, &[]);
        assert_eq!(node, Node::new("n"));
    }

    #[test]
    fn substitute_known_and_unknown_tokens() {
        let mut data = DataMap::new();
        data.insert("cpu".into(), json!("80"));
        data.insert("up".into(), json!(true));
        assert_eq!(substitute_tokens("CPU: $cpu%, up=$up, $mem", &data), "CPU: 80%, up=true, $mem");
        assert_eq!(substitute_tokens("cost $ 5", &data), "cost $ 5");
        assert_eq!(substitute_tokens("$cpu$cpu", &data), "8080");
    }

    #[test]
    fn numbers_in_labels_drop_trailing_zero_fraction() {
        assert_eq!(scalar_text(&json!(80.0)), "80");
        assert_eq!(scalar_text(&json!(0.5)), "0.5");
        assert_eq!(scalar_text(&json!(-3)), "-3");
        assert_eq!(scalar_text(&json!(u64::MAX)), "18446744073709551615");

        let mut data = DataMap::new();
        data.insert("cpu".into(), json!(80.0));
        assert_eq!(substitute_tokens("CPU $cpu%", &data), "CPU 80%");
    }
}

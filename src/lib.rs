pub mod action;
pub mod conditions;
pub mod diagram;
pub mod expr_ast;
pub mod expr_eval;
pub mod expr_parser;
pub mod graph_parser;
pub mod orchestrator;
pub mod rule;
pub mod scope;
pub mod serializer;
pub mod targets;

pub use orchestrator::{DataInput, RuleTrace};
pub use rule::{RuleSet, load_rules};

/// Parses a flowchart, applies `rules` with `input`, and serializes the result.
pub fn render(diagram: &str, rules: &RuleSet, input: &DataInput) -> Result<String, String> {
    render_with_trace(diagram, rules, input).map(|(text, _)| text)
}

/// Like [`render`], also returning what each rule touched.
pub fn render_with_trace(
    diagram: &str,
    rules: &RuleSet,
    input: &DataInput,
) -> Result<(String, Vec<RuleTrace>), String> {
    let trimmed = diagram.trim_start();
    if !(trimmed.starts_with("graph") || trimmed.starts_with("flowchart")) {
        let first_word = trimmed.split_whitespace().next().unwrap_or("(empty)");
        return Err(format!("unknown diagram type: {first_word}"));
    }
    let mut map = graph_parser::parse_graph(diagram)?;
    let traces = orchestrator::apply_rules(&mut map, rules, input);
    Ok((serializer::serialize(&map), traces))
}

use std::collections::HashSet;

use crate::diagram::*;

const INDENT: &str = "    ";

/// Renders a `DiagramMap` back to flowchart text that `parse_graph` accepts.
///
/// Layout: header, top-level node declarations, subgraph blocks, edges, then the
/// trailing `classDef`, `style` and `class` directives.
pub fn serialize(map: &DiagramMap) -> String {
    let mut out = Emitter::new(map);
    out.lines
        .push(format!("{} {}", map.kind.as_str(), map.direction.as_str()));

    let members: HashSet<&str> = map
        .subgraphs
        .iter()
        .flat_map(|sg| sg.member_ids.iter().map(String::as_str))
        .collect();

    for node in map.nodes.iter().filter(|n| !members.contains(n.id.as_str())) {
        out.node(node, 1);
    }
    for sg in map.subgraphs.iter().filter(|s| !members.contains(s.id.as_str())) {
        out.subgraph(sg, 1);
    }
    // Subgraphs caught in a membership cycle have no root above them.
    for sg in &map.subgraphs {
        out.subgraph(sg, 1);
    }

    let mut lines = out.lines;
    for edge in &map.edges {
        lines.push(format!("{INDENT}{}", edge_line(edge)));
    }
    for class in map.classes.iter().filter(|c| !c.styles.is_empty()) {
        lines.push(format!("{INDENT}classDef {} {}", class.id, class.styles.join(",")));
    }

    let elements = map
        .nodes
        .iter()
        .map(|n| (&n.id, &n.styles, &n.classes))
        .chain(map.subgraphs.iter().map(|s| (&s.id, &s.styles, &s.classes)));
    let mut class_lines = Vec::new();
    for (id, styles, classes) in elements {
        if !styles.is_empty() {
            lines.push(format!("{INDENT}style {id} {}", styles.join(",")));
        }
        class_lines.extend(classes.iter().map(|c| format!("{INDENT}class {id} {c}")));
    }
    lines.extend(class_lines);

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

struct Emitter<'m> {
    map: &'m DiagramMap,
    lines: Vec<String>,
    nodes_done: HashSet<&'m str>,
    subgraphs_done: HashSet<&'m str>,
}

impl<'m> Emitter<'m> {
    fn new(map: &'m DiagramMap) -> Self {
        Self {
            map,
            lines: Vec::new(),
            nodes_done: HashSet::new(),
            subgraphs_done: HashSet::new(),
        }
    }

    fn node(&mut self, node: &'m Node, depth: usize) {
        if !self.nodes_done.insert(&node.id) {
            return;
        }
        self.lines
            .push(format!("{}{}", INDENT.repeat(depth), node_declaration(node)));
    }

    fn subgraph(&mut self, sg: &'m Subgraph, depth: usize) {
        if !self.subgraphs_done.insert(&sg.id) {
            return;
        }
        let pad = INDENT.repeat(depth);
        self.lines.push(match &sg.title {
            Some(title) => format!("{pad}subgraph {} [{}]", sg.id, label_text(title)),
            None => format!("{pad}subgraph {}", sg.id),
        });
        for member in &sg.member_ids {
            if let Some(node) = self.map.node(member) {
                self.node(node, depth + 1);
            } else if let Some(child) = self.map.subgraph(member) {
                self.subgraph(child, depth + 1);
            }
        }
        self.lines.push(format!("{pad}end"));
    }
}

fn is_bare(node: &Node) -> bool {
    node.text.is_none() && node.shape == NodeShape::Square
}

/// `id`, or `id` with the shape delimiters around its label. A shaped node
/// without text uses its id as the label.
pub fn node_declaration(node: &Node) -> String {
    if is_bare(node) {
        return node.id.clone();
    }
    let label = node.text.as_deref().unwrap_or(&node.id);
    let (open, close) = node.shape.delimiters();
    format!("{}{open}{}{close}", node.id, label_text(label))
}

/// Quotes text the flowchart grammar cannot carry bare inside delimiters.
fn label_text(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text != text.trim()
        || text.chars().any(|c| {
            matches!(
                c,
                '[' | ']' | '(' | ')' | '{' | '}' | '<' | '>' | '|' | '/' | '\\' | '"' | ';'
            )
        });
    if needs_quotes {
        format!("\"{}\"", text.replace('"', "#quot;"))
    } else {
        text.to_string()
    }
}

pub fn edge_glyph(stroke: StrokeKind, arrow: ArrowKind) -> &'static str {
    use ArrowKind as A;
    use StrokeKind as S;
    match (stroke, arrow) {
        (S::Invisible, _) => "~~~",
        (S::Normal, A::Point) => "-->",
        (S::Normal, A::Open) => "---",
        (S::Normal, A::Cross) => "--x",
        (S::Normal, A::Circle) => "--o",
        (S::Normal, A::DoublePoint) => "<-->",
        (S::Normal, A::DoubleCross) => "x--x",
        (S::Normal, A::DoubleCircle) => "o--o",
        (S::Dotted, A::Point) => "-.->",
        (S::Dotted, A::Open) => "-.-",
        (S::Dotted, A::Cross) => "-.-x",
        (S::Dotted, A::Circle) => "-.-o",
        (S::Dotted, A::DoublePoint) => "<-.->",
        (S::Dotted, A::DoubleCross) => "x-.-x",
        (S::Dotted, A::DoubleCircle) => "o-.-o",
        (S::Thick, A::Point) => "==>",
        (S::Thick, A::Open) => "===",
        (S::Thick, A::Cross) => "==x",
        (S::Thick, A::Circle) => "==o",
        (S::Thick, A::DoublePoint) => "<==>",
        (S::Thick, A::DoubleCross) => "x==x",
        (S::Thick, A::DoubleCircle) => "o==o",
    }
}

fn edge_line(edge: &Edge) -> String {
    let glyph = edge_glyph(edge.stroke, edge.arrow);
    match edge.label.as_deref().filter(|l| !l.trim().is_empty()) {
        Some(label) if edge.stroke != StrokeKind::Invisible => {
            format!("{} {glyph}|{}| {}", edge.from, label.replace('|', "#124;"), edge.to)
        }
        _ => format!("{} {glyph} {}", edge.from, edge.to),
    }
}

use winnow::prelude::*;
use winnow::ascii::{line_ending, space0, space1, till_line_ending};
use winnow::combinator::{alt, eof, opt, preceded, repeat, separated};
use winnow::error::ParserError;
use winnow::token::{take_until, take_while};

use crate::diagram::*;

/// Parses flowchart text into a fresh `DiagramMap`.
pub fn parse_graph(input: &str) -> Result<DiagramMap, String> {
    let mut input = input;
    graph_diagram(&mut input).map_err(|_| {
        let context = input.lines().next().unwrap_or("").trim();
        let context_display = if context.chars().count() > 40 {
            format!("{}...", context.chars().take(40).collect::<String>())
        } else {
            context.to_string()
        };
        format!("syntax error in graph diagram: unexpected `{context_display}`")
    })
}

fn graph_diagram(input: &mut &str) -> winnow::Result<DiagramMap> {
    let _: () = repeat(0.., alt((blank_line, comment_line))).parse_next(input)?;
    space0.parse_next(input)?;
    let kind = alt((
        "flowchart".value(DiagramKind::Flowchart),
        "graph".value(DiagramKind::Graph),
    ))
    .parse_next(input)?;
    let direction = opt((space1, direction).map(|(_, d)| d))
        .parse_next(input)?
        .unwrap_or_default();
    space0.parse_next(input)?;
    opt(';').parse_next(input)?;
    opt(line_ending).parse_next(input)?;

    let mut map = DiagramMap {
        kind,
        direction,
        ..DiagramMap::default()
    };

    let lines: Vec<Option<GraphLine>> = repeat(0.., graph_line).parse_next(input)?;
    for line in lines.into_iter().flatten() {
        collect_line(line, &mut map);
    }
    drop_subgraph_endpoints(&mut map);

    if !input.trim().is_empty() {
        return Err(ParserError::from_input(input));
    }
    Ok(map)
}

#[derive(Debug, Clone, PartialEq)]
struct NodeDecl {
    id: String,
    label: Option<String>,
    shape: Option<NodeShape>,
    classes: Vec<String>,
}

#[derive(Debug)]
enum GraphLine {
    Edges(Vec<NodeDecl>, Vec<Edge>),
    Nodes(Vec<NodeDecl>),
    SubgraphBlock {
        id: String,
        title: Option<String>,
        lines: Vec<GraphLine>,
    },
    Style(String, Vec<String>),
    Class(Vec<String>, String),
    ClassDef(Vec<String>, Vec<String>),
    Direction,
}

/// Ids declared directly by a line, used for subgraph membership.
fn declared_ids(line: &GraphLine) -> Vec<String> {
    match line {
        GraphLine::Edges(decls, _) | GraphLine::Nodes(decls) => {
            decls.iter().map(|d| d.id.clone()).collect()
        }
        GraphLine::SubgraphBlock { id, .. } => vec![id.clone()],
        _ => Vec::new(),
    }
}

fn collect_line(line: GraphLine, map: &mut DiagramMap) {
    match line {
        GraphLine::Edges(decls, edges) => {
            for decl in decls {
                add_node(map, decl);
            }
            map.edges.extend(edges);
        }
        GraphLine::Nodes(decls) => {
            for decl in decls {
                add_node(map, decl);
            }
        }
        GraphLine::SubgraphBlock { id, title, lines } => {
            let mut member_ids: Vec<String> = Vec::new();
            for inner in lines {
                for member in declared_ids(&inner) {
                    if !member_ids.contains(&member) {
                        member_ids.push(member);
                    }
                }
                collect_line(inner, map);
            }
            map.subgraphs.push(Subgraph {
                id,
                title,
                member_ids,
                ..Subgraph::new("")
            });
        }
        GraphLine::Style(id, decls) => {
            if let Some(mut element) = map.element_mut(&id) {
                element.styles_mut().extend(decls);
            } else {
                let mut node = Node::new(id);
                node.styles = decls;
                map.nodes.push(node);
            }
        }
        GraphLine::Class(ids, name) => {
            for id in ids {
                if map.element_mut(&id).is_none() {
                    map.nodes.push(Node::new(id.clone()));
                }
                if let Some(mut element) = map.element_mut(&id) {
                    let classes = element.classes_mut();
                    classes.retain(|c| c != &name);
                    classes.push(name.clone());
                }
            }
        }
        GraphLine::ClassDef(names, styles) => {
            for name in names {
                match map.classes.iter_mut().find(|c| c.id == name) {
                    Some(existing) => existing.styles = styles.clone(),
                    None => map.classes.push(StyleClass {
                        id: name,
                        styles: styles.clone(),
                    }),
                }
            }
        }
        GraphLine::Direction => {}
    }
}

/// Edges may point at a subgraph by id; the bare node such a reference
/// creates must not shadow the subgraph.
fn drop_subgraph_endpoints(map: &mut DiagramMap) {
    let subgraph_ids: Vec<String> = map.subgraph_ids().map(str::to_string).collect();
    map.nodes.retain(|n| {
        !(subgraph_ids.contains(&n.id)
            && n.text.is_none()
            && n.classes.is_empty()
            && n.styles.is_empty())
    });
}

fn add_node(map: &mut DiagramMap, decl: NodeDecl) {
    if decl.label.is_none() && map.subgraph(&decl.id).is_some() && map.node(&decl.id).is_none() {
        for class in decl.classes {
            if let Some(mut element) = map.element_mut(&decl.id) {
                let classes = element.classes_mut();
                classes.retain(|c| c != &class);
                classes.push(class);
            }
        }
        return;
    }
    let index = match map.nodes.iter().position(|n| n.id == decl.id) {
        Some(i) => i,
        None => {
            map.nodes.push(Node::new(decl.id.clone()));
            map.nodes.len() - 1
        }
    };
    let node = &mut map.nodes[index];
    if node.text.is_none() {
        if let Some(label) = decl.label {
            node.text = Some(label);
            node.shape = decl.shape.unwrap_or_default();
        }
    }
    for class in decl.classes {
        node.classes.retain(|c| c != &class);
        node.classes.push(class);
    }
}

fn graph_line(input: &mut &str) -> winnow::Result<Option<GraphLine>> {
    space0.parse_next(input)?;

    if input.is_empty() || starts_with_word(input, "end") {
        return Err(ParserError::from_input(input));
    }

    let result = alt((
        blank_line.map(|_| None),
        comment_line.map(|_| None),
        subgraph_block.map(Some),
        style_line.map(Some),
        class_def_line.map(Some),
        class_line.map(Some),
        direction_line.map(Some),
        edge_line.map(Some),
        node_line.map(Some),
    ))
    .parse_next(input)?;

    Ok(result)
}

fn starts_with_word(input: &str, word: &str) -> bool {
    input.strip_prefix(word).is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
    })
}

fn line_end(input: &mut &str) -> winnow::Result<()> {
    space0.parse_next(input)?;
    opt(';').parse_next(input)?;
    space0.parse_next(input)?;
    alt((line_ending.void(), eof.void())).parse_next(input)
}

fn subgraph_block(input: &mut &str) -> winnow::Result<GraphLine> {
    "subgraph".parse_next(input)?;
    space1.parse_next(input)?;
    let (id, title) = subgraph_header.parse_next(input)?;
    line_end.parse_next(input)?;

    let mut lines: Vec<GraphLine> = Vec::new();
    loop {
        space0.parse_next(input)?;
        if starts_with_word(input, "end") {
            "end".parse_next(input)?;
            line_end.parse_next(input)?;
            break;
        }
        if input.is_empty() {
            break;
        }
        if let Some(line) = graph_line(input)? {
            lines.push(line);
        }
    }

    Ok(GraphLine::SubgraphBlock { id, title, lines })
}

fn subgraph_header(input: &mut &str) -> winnow::Result<(String, Option<String>)> {
    let bracketed = opt((identifier, space0, bracketed_title)).parse_next(input)?;
    if let Some((id, _, title)) = bracketed {
        return Ok((id.to_string(), Some(title)));
    }
    let text = take_while(1.., |c: char| c != '\n' && c != '\r' && c != ';').parse_next(input)?;
    let text = text.trim();
    let text = text.trim_matches('"');
    if text.contains(' ') {
        Ok((text.replace(' ', "_"), Some(text.to_string())))
    } else {
        Ok((text.to_string(), None))
    }
}

fn bracketed_title(input: &mut &str) -> winnow::Result<String> {
    "[".parse_next(input)?;
    let text = quoted_inner('"', "]").parse_next(input)?;
    "]".parse_next(input)?;
    Ok(text)
}

fn blank_line(input: &mut &str) -> winnow::Result<()> {
    (space0, line_ending).void().parse_next(input)
}

fn comment_line(input: &mut &str) -> winnow::Result<()> {
    (space0, "%%").parse_next(input)?;
    till_line_ending.parse_next(input)?;
    opt(line_ending).parse_next(input)?;
    Ok(())
}

fn direction(input: &mut &str) -> winnow::Result<Direction> {
    alt((
        "TD".value(Direction::TopDown),
        "TB".value(Direction::TopBottom),
        "BT".value(Direction::BottomTop),
        "LR".value(Direction::LeftRight),
        "RL".value(Direction::RightLeft),
    ))
    .parse_next(input)
}

fn direction_line(input: &mut &str) -> winnow::Result<GraphLine> {
    ("direction", space1, direction).parse_next(input)?;
    line_end.parse_next(input)?;
    Ok(GraphLine::Direction)
}

fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn id_list(input: &mut &str) -> winnow::Result<Vec<String>> {
    separated(1.., identifier.map(str::to_string), (space0, ',', space0)).parse_next(input)
}

/// Comma-separated `property:value` declarations up to the end of the line.
fn declarations(input: &mut &str) -> winnow::Result<Vec<String>> {
    let text = take_while(1.., |c: char| c != '\n' && c != '\r' && c != ';').parse_next(input)?;
    Ok(text
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect())
}

fn style_line(input: &mut &str) -> winnow::Result<GraphLine> {
    ("style", space1).parse_next(input)?;
    let id = identifier.parse_next(input)?;
    space1.parse_next(input)?;
    let decls = declarations.parse_next(input)?;
    line_end.parse_next(input)?;
    Ok(GraphLine::Style(id.to_string(), decls))
}

fn class_def_line(input: &mut &str) -> winnow::Result<GraphLine> {
    ("classDef", space1).parse_next(input)?;
    let names = id_list.parse_next(input)?;
    space1.parse_next(input)?;
    let decls = declarations.parse_next(input)?;
    line_end.parse_next(input)?;
    Ok(GraphLine::ClassDef(names, decls))
}

fn class_line(input: &mut &str) -> winnow::Result<GraphLine> {
    ("class", space1).parse_next(input)?;
    let ids = id_list.parse_next(input)?;
    space1.parse_next(input)?;
    let name = identifier.parse_next(input)?;
    line_end.parse_next(input)?;
    Ok(GraphLine::Class(ids, name.to_string()))
}

fn node_ref(input: &mut &str) -> winnow::Result<NodeDecl> {
    let id = identifier.parse_next(input)?;
    let shape_label = opt(shape_label).parse_next(input)?;
    let classes: Vec<String> =
        repeat(0.., preceded(":::", identifier).map(str::to_string)).parse_next(input)?;
    let (shape, label) = match shape_label {
        Some((shape, label)) => (Some(shape), Some(label)),
        None => (None, None),
    };
    Ok(NodeDecl {
        id: id.to_string(),
        label,
        shape,
        classes,
    })
}

fn node_group(input: &mut &str) -> winnow::Result<Vec<NodeDecl>> {
    separated(1.., node_ref, (space0, '&', space0)).parse_next(input)
}

/// Delimiter table, longest openers first. Openers shared by several shapes
/// resolve to whichever closer appears first.
const SHAPE_DELIMITERS: &[(&str, &[(&str, NodeShape)])] = &[
    ("(((", &[(")))", NodeShape::DoubleCircle)]),
    ("((", &[("))", NodeShape::Circle)]),
    ("([", &[("])", NodeShape::Stadium)]),
    ("(-", &[("-)", NodeShape::Ellipse)]),
    ("(", &[(")", NodeShape::Round)]),
    ("[[", &[("]]", NodeShape::Subroutine)]),
    ("[(", &[(")]", NodeShape::Cylinder)]),
    ("[|", &[("|]", NodeShape::Rect)]),
    (
        "[/",
        &[("/]", NodeShape::LeanRight), ("\\]", NodeShape::Trapezoid)],
    ),
    (
        "[\\",
        &[("\\]", NodeShape::LeanLeft), ("/]", NodeShape::InvTrapezoid)],
    ),
    ("[", &[("]", NodeShape::Square)]),
    ("{{", &[("}}", NodeShape::Hexagon)]),
    ("{", &[("}", NodeShape::Diamond)]),
    (">", &[("]", NodeShape::Odd)]),
];

fn shape_label(input: &mut &str) -> winnow::Result<(NodeShape, String)> {
    for &(open, closers) in SHAPE_DELIMITERS {
        let Some(after_open) = input.strip_prefix(open) else {
            continue;
        };
        let line = after_open.split(['\n', '\r']).next().unwrap_or("");
        let (label, consumed) = if let Some(quoted) = line.strip_prefix('"') {
            let Some(end) = quoted.find('"') else {
                continue;
            };
            (quoted[..end].to_string(), end + 2)
        } else {
            let nearest = closers
                .iter()
                .filter_map(|&(close, _)| line.find(close))
                .min();
            let Some(end) = nearest else {
                continue;
            };
            (line[..end].to_string(), end)
        };
        let rest = &after_open[consumed..];
        let Some(&(close, shape)) = closers.iter().find(|&&(close, _)| rest.starts_with(close))
        else {
            continue;
        };
        *input = &rest[close.len()..];
        return Ok((shape, label));
    }
    Err(ParserError::from_input(input))
}

fn quoted_inner(quote: char, closer: &'static str) -> impl FnMut(&mut &str) -> winnow::Result<String> {
    move |input: &mut &str| {
        if input.starts_with(quote) {
            let _q: char = winnow::token::any.parse_next(input)?;
            let text = take_while(0.., move |c: char| c != quote).parse_next(input)?;
            let result = text.to_string();
            let _q2: char = winnow::token::any.parse_next(input)?;
            Ok(result)
        } else {
            let text = take_until(1.., closer).parse_next(input)?;
            Ok(text.to_string())
        }
    }
}

fn edge_glyph(input: &mut &str) -> winnow::Result<(StrokeKind, ArrowKind)> {
    use ArrowKind as A;
    use StrokeKind as S;
    alt((
        alt((
            "<-->".value((S::Normal, A::DoublePoint)),
            "<-.->".value((S::Dotted, A::DoublePoint)),
            "<==>".value((S::Thick, A::DoublePoint)),
            "x--x".value((S::Normal, A::DoubleCross)),
            "x-.-x".value((S::Dotted, A::DoubleCross)),
            "x==x".value((S::Thick, A::DoubleCross)),
            "o--o".value((S::Normal, A::DoubleCircle)),
            "o-.-o".value((S::Dotted, A::DoubleCircle)),
            "o==o".value((S::Thick, A::DoubleCircle)),
        )),
        alt((
            "-.->".value((S::Dotted, A::Point)),
            "-.-o".value((S::Dotted, A::Circle)),
            "-.-x".value((S::Dotted, A::Cross)),
            "-.-".value((S::Dotted, A::Open)),
            "==>".value((S::Thick, A::Point)),
            "==o".value((S::Thick, A::Circle)),
            "==x".value((S::Thick, A::Cross)),
            "===".value((S::Thick, A::Open)),
        )),
        alt((
            "-->".value((S::Normal, A::Point)),
            "--o".value((S::Normal, A::Circle)),
            "--x".value((S::Normal, A::Cross)),
            "---".value((S::Normal, A::Open)),
            "~~~".value((S::Invisible, A::Open)),
        )),
    ))
    .parse_next(input)
}

fn edge_label(input: &mut &str) -> winnow::Result<String> {
    "|".parse_next(input)?;
    let text = take_while(1.., |c: char| c != '|' && c != '\n').parse_next(input)?;
    "|".parse_next(input)?;
    Ok(text.trim().to_string())
}

fn glyph_link(input: &mut &str) -> winnow::Result<(StrokeKind, ArrowKind, Option<String>)> {
    let (stroke, arrow) = edge_glyph.parse_next(input)?;
    let label = opt(edge_label).parse_next(input)?;
    Ok((stroke, arrow, label))
}

/// `A -- text --> B` and its thick/dotted counterparts.
fn text_link(input: &mut &str) -> winnow::Result<(StrokeKind, ArrowKind, Option<String>)> {
    use ArrowKind as A;
    use StrokeKind as S;
    let (label, (stroke, arrow)) = alt((
        preceded(
            "-- ",
            alt((
                (link_text(" -->"), " -->".value((S::Normal, A::Point))),
                (link_text(" ---"), " ---".value((S::Normal, A::Open))),
            )),
        ),
        preceded(
            "== ",
            alt((
                (link_text(" ==>"), " ==>".value((S::Thick, A::Point))),
                (link_text(" ==="), " ===".value((S::Thick, A::Open))),
            )),
        ),
        preceded(
            "-. ",
            alt((
                (link_text(" .->"), " .->".value((S::Dotted, A::Point))),
                (link_text(" .-"), " .-".value((S::Dotted, A::Open))),
            )),
        ),
    ))
    .parse_next(input)?;
    Ok((stroke, arrow, Some(label.trim().to_string())))
}

fn link_text<'s>(closer: &'static str) -> impl FnMut(&mut &'s str) -> winnow::Result<&'s str> {
    move |input: &mut &'s str| {
        take_until(1.., closer)
            .verify(|text: &str| !text.contains('\n'))
            .parse_next(input)
    }
}

fn edge_line(input: &mut &str) -> winnow::Result<GraphLine> {
    let mut group = node_group.parse_next(input)?;
    let mut decls: Vec<NodeDecl> = group.clone();
    let mut edges: Vec<Edge> = Vec::new();

    loop {
        let checkpoint = *input;
        space0.parse_next(input)?;
        let Some((stroke, arrow, label)) = opt(alt((text_link, glyph_link))).parse_next(input)?
        else {
            *input = checkpoint;
            break;
        };
        space0.parse_next(input)?;
        let targets = node_group.parse_next(input)?;
        for from in &group {
            for to in &targets {
                edges.push(Edge {
                    from: from.id.clone(),
                    to: to.id.clone(),
                    label: label.clone(),
                    stroke,
                    arrow,
                });
            }
        }
        decls.extend(targets.iter().cloned());
        group = targets;
    }

    if edges.is_empty() {
        return Err(ParserError::from_input(input));
    }
    line_end.parse_next(input)?;
    Ok(GraphLine::Edges(decls, edges))
}

fn node_line(input: &mut &str) -> winnow::Result<GraphLine> {
    let decls = node_group.parse_next(input)?;
    line_end.parse_next(input)?;
    Ok(GraphLine::Nodes(decls))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_direction_variants() {
        for (text, expected) in [
            ("TD", Direction::TopDown),
            ("TB", Direction::TopBottom),
            ("BT", Direction::BottomTop),
            ("LR", Direction::LeftRight),
            ("RL", Direction::RightLeft),
        ] {
            let mut input = text;
            assert_eq!(direction(&mut input).unwrap(), expected);
        }
    }

    #[test]
    fn parse_header_without_direction_defaults_to_td() {
        let map = parse_graph("flowchart\n    A --> B\n").unwrap();
        assert_eq!(map.kind, DiagramKind::Flowchart);
        assert_eq!(map.direction, Direction::TopDown);
    }

    #[test]
    fn parse_node_ref_with_label() {
        let mut input = "A[Start]";
        let n = node_ref(&mut input).unwrap();
        assert_eq!(n.id, "A");
        assert_eq!(n.label.as_deref(), Some("Start"));
        assert_eq!(n.shape, Some(NodeShape::Square));
    }

    #[test]
    fn parse_node_ref_without_label() {
        let mut input = "A rest";
        let n = node_ref(&mut input).unwrap();
        assert_eq!(n.id, "A");
        assert_eq!(n.label, None);
        assert_eq!(input, " rest");
    }

    #[test]
    fn parse_every_shape() {
        for shape in NodeShape::ALL {
            let (open, close) = shape.delimiters();
            let text = format!("n{open}label{close}");
            let mut input = text.as_str();
            let n = node_ref(&mut input).unwrap();
            assert_eq!(n.shape, Some(shape), "shape {}", shape.as_str());
            assert_eq!(n.label.as_deref(), Some("label"));
            assert_eq!(input, "");
        }
    }

    #[test]
    fn trapezoid_closer_does_not_leak_into_next_node() {
        let map = parse_graph("graph TD\n    A[/one\\] --> B[/two/]\n").unwrap();
        assert_eq!(map.nodes[0].shape, NodeShape::Trapezoid);
        assert_eq!(map.nodes[0].text.as_deref(), Some("one"));
        assert_eq!(map.nodes[1].shape, NodeShape::LeanRight);
    }

    #[test]
    fn parse_node_ref_with_class_shorthand() {
        let mut input = "A[Hi]:::warn";
        let n = node_ref(&mut input).unwrap();
        assert_eq!(n.classes, vec!["warn"]);
    }

    #[test]
    fn parse_quoted_label() {
        let map = parse_graph("graph TD\n    A[\"[NOTE] Hello\"] --> B\n").unwrap();
        assert_eq!(map.nodes[0].text.as_deref(), Some("[NOTE] Hello"));
    }

    #[test]
    fn parse_edge_glyphs() {
        let cases = [
            ("-->", StrokeKind::Normal, ArrowKind::Point),
            ("---", StrokeKind::Normal, ArrowKind::Open),
            ("--o", StrokeKind::Normal, ArrowKind::Circle),
            ("--x", StrokeKind::Normal, ArrowKind::Cross),
            ("<-->", StrokeKind::Normal, ArrowKind::DoublePoint),
            ("x--x", StrokeKind::Normal, ArrowKind::DoubleCross),
            ("-.->", StrokeKind::Dotted, ArrowKind::Point),
            ("-.-", StrokeKind::Dotted, ArrowKind::Open),
            ("==>", StrokeKind::Thick, ArrowKind::Point),
            ("===", StrokeKind::Thick, ArrowKind::Open),
            ("~~~", StrokeKind::Invisible, ArrowKind::Open),
        ];
        for (glyph, stroke, arrow) in cases {
            let mut input = glyph;
            assert_eq!(edge_glyph(&mut input).unwrap(), (stroke, arrow), "glyph {glyph}");
        }
    }

    #[test]
    fn parse_simple_graph() {
        let map = parse_graph("graph LR\n    A[Start] -->|go| B[End]\n").unwrap();
        assert_eq!(map.kind, DiagramKind::Graph);
        assert_eq!(map.direction, Direction::LeftRight);
        assert_eq!(map.nodes.len(), 2);
        assert_eq!(map.edges.len(), 1);
        assert_eq!(map.edges[0].label.as_deref(), Some("go"));
        assert_eq!(map.edges[0].from, "A");
        assert_eq!(map.edges[0].to, "B");
    }

    #[test]
    fn parse_text_link() {
        let map = parse_graph("graph TD\n    A -- hello world --> B\n").unwrap();
        assert_eq!(map.edges[0].label.as_deref(), Some("hello world"));
        assert_eq!(map.edges[0].arrow, ArrowKind::Point);
    }

    #[test]
    fn parse_chain_and_fan_out() {
        let map = parse_graph("graph TD\n    A --> B --> C\n    A --> D & E\n").unwrap();
        assert_eq!(map.nodes.len(), 5);
        let pairs: Vec<(&str, &str)> = map
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("B", "C"), ("A", "D"), ("A", "E")]);
    }

    #[test]
    fn later_label_fills_bare_node() {
        let map = parse_graph("graph TD\n    A --> B\n    B(Round)\n").unwrap();
        let b = map.node("B").unwrap();
        assert_eq!(b.text.as_deref(), Some("Round"));
        assert_eq!(b.shape, NodeShape::Round);
    }

    #[test]
    fn parse_subgraph_with_title() {
        let input = "graph TD\n    subgraph api [API Layer]\n        A --> B\n    end\n";
        let map = parse_graph(input).unwrap();
        assert_eq!(map.subgraphs.len(), 1);
        assert_eq!(map.subgraphs[0].id, "api");
        assert_eq!(map.subgraphs[0].title.as_deref(), Some("API Layer"));
        assert_eq!(map.subgraphs[0].member_ids, vec!["A", "B"]);
    }

    #[test]
    fn parse_subgraph_without_title() {
        let input = "graph TD\n    subgraph Backend\n        A\n    end\n";
        let map = parse_graph(input).unwrap();
        assert_eq!(map.subgraphs[0].id, "Backend");
        assert_eq!(map.subgraphs[0].title, None);
    }

    #[test]
    fn parse_nested_subgraph_membership() {
        let input = "graph TD\n    subgraph outer\n        subgraph inner\n            A\n        end\n        B\n    end\n";
        let map = parse_graph(input).unwrap();
        let outer = map.subgraph("outer").unwrap();
        assert_eq!(outer.member_ids, vec!["inner", "B"]);
        assert_eq!(map.subgraph("inner").unwrap().member_ids, vec!["A"]);
    }

    #[test]
    fn parse_style_class_and_class_def() {
        let input = "graph TD\n    A --> B\n    classDef warn fill:#f96,stroke:#333\n    class A,B warn\n    style A fill:red\n";
        let map = parse_graph(input).unwrap();
        assert_eq!(map.style_class("warn").unwrap().styles, vec!["fill:#f96", "stroke:#333"]);
        assert_eq!(map.node("A").unwrap().classes, vec!["warn"]);
        assert_eq!(map.node("B").unwrap().classes, vec!["warn"]);
        assert_eq!(map.node("A").unwrap().styles, vec!["fill:red"]);
    }

    #[test]
    fn parse_comments_and_semicolons() {
        let input = "%% leading\ngraph TD;\n    %% note\n    A --> B;\n";
        let map = parse_graph(input).unwrap();
        assert_eq!(map.edges.len(), 1);
    }

    #[test]
    fn parse_error_reports_context() {
        let err = parse_graph("graph TD\n    A --> \n").unwrap_err();
        assert!(err.contains("syntax error"), "got: {err}");
    }

    #[test]
    fn non_flowchart_is_rejected() {
        assert!(parse_graph("sequenceDiagram\n    A->>B: hi\n").is_err());
    }
}

use std::collections::BTreeMap;

use serde_json::Value;

pub type DataMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::TopDown => "TD",
            Direction::TopBottom => "TB",
            Direction::BottomTop => "BT",
            Direction::LeftRight => "LR",
            Direction::RightLeft => "RL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagramKind {
    #[default]
    Flowchart,
    Graph,
}

impl DiagramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::Flowchart => "flowchart",
            DiagramKind::Graph => "graph",
        }
    }
}

/// The fixed shape vocabulary accepted by `applyShape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeShape {
    #[default]
    Square,
    Round,
    Circle,
    Ellipse,
    Stadium,
    Subroutine,
    Rect,
    Cylinder,
    Odd,
    Diamond,
    Hexagon,
    LeanRight,
    LeanLeft,
    Trapezoid,
    InvTrapezoid,
    DoubleCircle,
}

impl NodeShape {
    pub const ALL: [NodeShape; 16] = [
        NodeShape::Square,
        NodeShape::Round,
        NodeShape::Circle,
        NodeShape::Ellipse,
        NodeShape::Stadium,
        NodeShape::Subroutine,
        NodeShape::Rect,
        NodeShape::Cylinder,
        NodeShape::Odd,
        NodeShape::Diamond,
        NodeShape::Hexagon,
        NodeShape::LeanRight,
        NodeShape::LeanLeft,
        NodeShape::Trapezoid,
        NodeShape::InvTrapezoid,
        NodeShape::DoubleCircle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeShape::Square => "square",
            NodeShape::Round => "round",
            NodeShape::Circle => "circle",
            NodeShape::Ellipse => "ellipse",
            NodeShape::Stadium => "stadium",
            NodeShape::Subroutine => "subroutine",
            NodeShape::Rect => "rect",
            NodeShape::Cylinder => "cylinder",
            NodeShape::Odd => "odd",
            NodeShape::Diamond => "diamond",
            NodeShape::Hexagon => "hexagon",
            NodeShape::LeanRight => "lean_right",
            NodeShape::LeanLeft => "lean_left",
            NodeShape::Trapezoid => "trapezoid",
            NodeShape::InvTrapezoid => "inv_trapezoid",
            NodeShape::DoubleCircle => "doublecircle",
        }
    }

    pub fn from_name(name: &str) -> Option<NodeShape> {
        NodeShape::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Opening and closing delimiters used when declaring a node of this shape.
    pub fn delimiters(&self) -> (&'static str, &'static str) {
        match self {
            NodeShape::Square => ("[", "]"),
            NodeShape::Round => ("(", ")"),
            NodeShape::Circle => ("((", "))"),
            NodeShape::Ellipse => ("(-", "-)"),
            NodeShape::Stadium => ("([", "])"),
            NodeShape::Subroutine => ("[[", "]]"),
            NodeShape::Rect => ("[|", "|]"),
            NodeShape::Cylinder => ("[(", ")]"),
            NodeShape::Odd => (">", "]"),
            NodeShape::Diamond => ("{", "}"),
            NodeShape::Hexagon => ("{{", "}}"),
            NodeShape::LeanRight => ("[/", "/]"),
            NodeShape::LeanLeft => ("[\\", "\\]"),
            NodeShape::Trapezoid => ("[/", "\\]"),
            NodeShape::InvTrapezoid => ("[\\", "/]"),
            NodeShape::DoubleCircle => ("(((", ")))"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeKind {
    #[default]
    Normal,
    Thick,
    Dotted,
    Invisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrowKind {
    #[default]
    Point,
    Open,
    Cross,
    Circle,
    DoublePoint,
    DoubleCross,
    DoubleCircle,
}

/// Rule-writable fields of an element as they were before its first
/// evaluation cycle.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Baseline {
    label: Option<String>,
    shape: NodeShape,
    classes: Vec<String>,
    styles: Vec<String>,
}

impl Baseline {
    fn capture(
        label: &Option<String>,
        shape: NodeShape,
        classes: &[String],
        styles: &[String],
    ) -> Self {
        Self {
            label: label.clone(),
            shape,
            classes: classes.to_vec(),
            styles: styles.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub text: Option<String>,
    pub shape: NodeShape,
    pub classes: Vec<String>,
    pub styles: Vec<String>,
    pub data: DataMap,
    pub(crate) baseline: Option<Baseline>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
            shape: NodeShape::default(),
            classes: Vec::new(),
            styles: Vec::new(),
            data: DataMap::new(),
            baseline: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_shape(mut self, shape: NodeShape) -> Self {
        self.shape = shape;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subgraph {
    pub id: String,
    pub title: Option<String>,
    pub member_ids: Vec<String>,
    pub classes: Vec<String>,
    pub styles: Vec<String>,
    pub data: DataMap,
    pub(crate) baseline: Option<Baseline>,
}

impl Subgraph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            member_ids: Vec::new(),
            classes: Vec::new(),
            styles: Vec::new(),
            data: DataMap::new(),
            baseline: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.member_ids = members.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub stroke: StrokeKind,
    pub arrow: ArrowKind,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
            stroke: StrokeKind::Normal,
            arrow: ArrowKind::Point,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleClass {
    pub id: String,
    pub styles: Vec<String>,
}

/// A node or subgraph, borrowed mutably for the action executor.
#[derive(Debug)]
pub enum ElementMut<'a> {
    Node(&'a mut Node),
    Subgraph(&'a mut Subgraph),
}

impl ElementMut<'_> {
    pub fn id(&self) -> &str {
        match self {
            ElementMut::Node(n) => &n.id,
            ElementMut::Subgraph(s) => &s.id,
        }
    }

    pub fn classes_mut(&mut self) -> &mut Vec<String> {
        match self {
            ElementMut::Node(n) => &mut n.classes,
            ElementMut::Subgraph(s) => &mut s.classes,
        }
    }

    pub fn styles_mut(&mut self) -> &mut Vec<String> {
        match self {
            ElementMut::Node(n) => &mut n.styles,
            ElementMut::Subgraph(s) => &mut s.styles,
        }
    }

    pub fn data(&self) -> &DataMap {
        match self {
            ElementMut::Node(n) => &n.data,
            ElementMut::Subgraph(s) => &s.data,
        }
    }

    pub fn data_mut(&mut self) -> &mut DataMap {
        match self {
            ElementMut::Node(n) => &mut n.data,
            ElementMut::Subgraph(s) => &mut s.data,
        }
    }

    /// The label slot written by `applyText`: a subgraph's title or a node's text.
    pub fn label_mut(&mut self) -> &mut Option<String> {
        match self {
            ElementMut::Node(n) => &mut n.text,
            ElementMut::Subgraph(s) => &mut s.title,
        }
    }

    /// Only nodes carry a shape.
    pub fn shape_mut(&mut self) -> Option<&mut NodeShape> {
        match self {
            ElementMut::Node(n) => Some(&mut n.shape),
            ElementMut::Subgraph(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagramMap {
    pub kind: DiagramKind,
    pub direction: Direction,
    pub nodes: Vec<Node>,
    pub subgraphs: Vec<Subgraph>,
    pub edges: Vec<Edge>,
    pub classes: Vec<StyleClass>,
}

impl DiagramMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn subgraph(&self, id: &str) -> Option<&Subgraph> {
        self.subgraphs.iter().find(|s| s.id == id)
    }

    pub fn subgraph_mut(&mut self, id: &str) -> Option<&mut Subgraph> {
        self.subgraphs.iter_mut().find(|s| s.id == id)
    }

    pub fn style_class(&self, id: &str) -> Option<&StyleClass> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Nodes shadow subgraphs sharing the same id.
    pub fn element_mut(&mut self, id: &str) -> Option<ElementMut<'_>> {
        if let Some(i) = self.nodes.iter().position(|n| n.id == id) {
            return Some(ElementMut::Node(&mut self.nodes[i]));
        }
        self.subgraph_mut(id).map(ElementMut::Subgraph)
    }

    pub fn element_data(&self, id: &str) -> Option<&DataMap> {
        self.node(id)
            .map(|n| &n.data)
            .or_else(|| self.subgraph(id).map(|s| &s.data))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn subgraph_ids(&self) -> impl Iterator<Item = &str> {
        self.subgraphs.iter().map(|s| s.id.as_str())
    }

    /// Adds a node unless one with the same id exists; the first declaration wins.
    pub fn add_node(&mut self, node: Node) {
        if self.node(&node.id).is_none() {
            self.nodes.push(node);
        }
    }

    /// Puts every element back to its state before the first evaluation cycle.
    ///
    /// The first call records text, title, shape, classes and styles of each
    /// element; later calls restore them, so `$token` templates and parsed
    /// styling come back after a cycle rewrote them. `data` is always cleared.
    /// Edits made to an element between cycles are discarded.
    pub fn reset_rule_state(&mut self) {
        for node in &mut self.nodes {
            match &node.baseline {
                Some(base) => {
                    node.text = base.label.clone();
                    node.shape = base.shape;
                    node.classes = base.classes.clone();
                    node.styles = base.styles.clone();
                }
                None => {
                    node.baseline = Some(Baseline::capture(
                        &node.text,
                        node.shape,
                        &node.classes,
                        &node.styles,
                    ));
                }
            }
            node.data.clear();
        }
        for sg in &mut self.subgraphs {
            match &sg.baseline {
                Some(base) => {
                    sg.title = base.label.clone();
                    sg.classes = base.classes.clone();
                    sg.styles = base.styles.clone();
                }
                None => {
                    sg.baseline = Some(Baseline::capture(
                        &sg.title,
                        NodeShape::default(),
                        &sg.classes,
                        &sg.styles,
                    ));
                }
            }
            sg.data.clear();
        }
    }
}

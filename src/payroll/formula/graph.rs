use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payroll::domain::{DisciplineId, PeriodId};

/// Identifier wrapper for graph nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of runtime inputs a `Variable` node may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKey {
    Occupancy,
    ClassesPerWeek,
    VenueCount,
    BackToBackCount,
    OffPeakCount,
    TierLevel,
    Reservations,
    Capacity,
    PaidReservations,
    Waitlist,
    CourtesySeats,
}

impl fmt::Display for InputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl InputKey {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Occupancy => "occupancy",
            Self::ClassesPerWeek => "classes_per_week",
            Self::VenueCount => "venue_count",
            Self::BackToBackCount => "back_to_back_count",
            Self::OffPeakCount => "off_peak_count",
            Self::TierLevel => "tier_level",
            Self::Reservations => "reservations",
            Self::Capacity => "capacity",
            Self::PaidReservations => "paid_reservations",
            Self::Waitlist => "waitlist",
            Self::CourtesySeats => "courtesy_seats",
        }
    }
}

/// Arithmetic performed by an `Operation` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Sum,
    Difference,
    Product,
    Quotient,
    Percentage,
}

impl BinaryOp {
    /// Quotient with a zero divisor evaluates to `0`, keeping the operation
    /// total so formulas never abort mid-evaluation.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Sum => a + b,
            Self::Difference => a - b,
            Self::Product => a * b,
            Self::Quotient => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            Self::Percentage => a * b / 100.0,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Sum => "+",
            Self::Difference => "-",
            Self::Product => "*",
            Self::Quotient => "/",
            Self::Percentage => "% of",
        }
    }
}

/// Relation tested by a `Comparator` node. Output is exactly `1` or `0` so
/// comparisons compose arithmetically with other nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan,
    LessThan,
    Equal,
    GreaterOrEqual,
    LessOrEqual,
}

impl Comparison {
    pub fn holds(self, a: f64, b: f64) -> bool {
        match self {
            Self::GreaterThan => a > b,
            Self::LessThan => a < b,
            Self::Equal => a == b,
            Self::GreaterOrEqual => a >= b,
            Self::LessOrEqual => a <= b,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::Equal => "=",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }
}

/// Node payload, dispatched by pattern matching during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NodeKind {
    Variable { key: InputKey },
    Number { value: f64 },
    Operation { op: BinaryOp },
    Comparator { cmp: Comparison },
    Result,
}

impl NodeKind {
    /// Input ports that must be connected for the node to evaluate.
    pub(crate) fn required_ports(&self) -> &'static [InputPort] {
        match self {
            NodeKind::Variable { .. } | NodeKind::Number { .. } => &[],
            NodeKind::Operation { .. } | NodeKind::Comparator { .. } => {
                &[InputPort::A, InputPort::B]
            }
            NodeKind::Result => &[InputPort::A],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// Input slot on the receiving side of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputPort {
    A,
    B,
}

impl InputPort {
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl fmt::Display for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Directed connection feeding the source node's value into one input port
/// of the target node. Every node exposes a single output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub port: InputPort,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GraphValidationError {
    #[error("duplicate node id '{0}'")]
    DuplicateNode(NodeId),
    #[error("edge references unknown node '{0}'")]
    UnknownNode(NodeId),
    #[error("node '{0}' is not expected to receive inputs")]
    UnexpectedInput(NodeId),
    #[error("node '{node}' already has its '{port}' input connected")]
    DuplicateInput { node: NodeId, port: InputPort },
    #[error("node '{node}' is missing its '{port}' input")]
    MissingInput { node: NodeId, port: InputPort },
    #[error("formula graph has no result node")]
    MissingResult,
    #[error("formula graph has more than one result node")]
    MultipleResults,
    #[error("formula graph contains a cycle")]
    CycleDetected,
}

/// Immutable computation graph. Edits are builder-style and return a new
/// snapshot, keeping persistence a pure serialize/deserialize step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulaGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl FormulaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn connected(mut self, source: NodeId, target: NodeId, port: InputPort) -> Self {
        self.edges.push(Edge {
            source,
            target,
            port,
        });
        self
    }

    /// Drops a node together with every edge touching it.
    pub fn without_node(mut self, id: &NodeId) -> Self {
        self.nodes.retain(|node| &node.id != id);
        self.edges
            .retain(|edge| &edge.source != id && &edge.target != id);
        self
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub(crate) fn incoming(&self, target: &NodeId, port: InputPort) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|edge| &edge.target == target && edge.port == port)
    }

    /// The single `Result` node evaluation starts from.
    pub fn result_node(&self) -> Result<&Node, GraphValidationError> {
        let mut found = None;
        for node in &self.nodes {
            if matches!(node.kind, NodeKind::Result) {
                if found.is_some() {
                    return Err(GraphValidationError::MultipleResults);
                }
                found = Some(node);
            }
        }
        found.ok_or(GraphValidationError::MissingResult)
    }

    pub fn validate(&self) -> Result<(), GraphValidationError> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(&node.id) {
                return Err(GraphValidationError::DuplicateNode(node.id.clone()));
            }
        }

        let mut occupied: HashSet<(&NodeId, InputPort)> = HashSet::new();
        for edge in &self.edges {
            if !ids.contains(&edge.source) {
                return Err(GraphValidationError::UnknownNode(edge.source.clone()));
            }
            let target = self
                .node(&edge.target)
                .ok_or_else(|| GraphValidationError::UnknownNode(edge.target.clone()))?;
            if target.kind.required_ports().is_empty() {
                return Err(GraphValidationError::UnexpectedInput(target.id.clone()));
            }
            if !occupied.insert((&edge.target, edge.port)) {
                return Err(GraphValidationError::DuplicateInput {
                    node: edge.target.clone(),
                    port: edge.port,
                });
            }
        }

        self.result_node()?;

        for node in &self.nodes {
            for port in node.kind.required_ports() {
                if self.incoming(&node.id, *port).is_none() {
                    return Err(GraphValidationError::MissingInput {
                        node: node.id.clone(),
                        port: *port,
                    });
                }
            }
        }

        self.check_acyclic()
    }

    /// Depth-first search over dependency edges with an explicit in-progress
    /// set; revisiting an in-progress node means a cycle.
    fn check_acyclic(&self) -> Result<(), GraphValidationError> {
        let mut finished: HashSet<&NodeId> = HashSet::new();
        let mut visiting: HashSet<&NodeId> = HashSet::new();

        let mut dependencies: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for edge in &self.edges {
            dependencies.entry(&edge.target).or_default().push(&edge.source);
        }

        fn visit<'a>(
            id: &'a NodeId,
            dependencies: &HashMap<&'a NodeId, Vec<&'a NodeId>>,
            visiting: &mut HashSet<&'a NodeId>,
            finished: &mut HashSet<&'a NodeId>,
        ) -> Result<(), GraphValidationError> {
            if finished.contains(id) {
                return Ok(());
            }
            if !visiting.insert(id) {
                return Err(GraphValidationError::CycleDetected);
            }
            if let Some(sources) = dependencies.get(id) {
                for source in sources {
                    visit(source, dependencies, visiting, finished)?;
                }
            }
            visiting.remove(id);
            finished.insert(id);
            Ok(())
        }

        for node in &self.nodes {
            visit(&node.id, &dependencies, &mut visiting, &mut finished)?;
        }
        Ok(())
    }
}

/// Formula as persisted by the formula store, one per (discipline, period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFormula {
    pub discipline: DisciplineId,
    pub period: PeriodId,
    pub graph: FormulaGraph,
}

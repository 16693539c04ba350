use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::graph::{
    BinaryOp, FormulaGraph, GraphValidationError, InputKey, InputPort, Node, NodeId, NodeKind,
};

/// One evaluated node, recorded in evaluation order so a reviewer can follow
/// how an amount came to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub node: NodeId,
    pub detail: String,
    pub value: f64,
}

/// Evaluation outcome: the result-node value plus the audit trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub value: f64,
    pub trace: Vec<TraceStep>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvaluationError {
    #[error("node '{node}' is missing its '{port}' input")]
    MissingInput { node: NodeId, port: InputPort },
    #[error("variable node references input '{key}' absent from the evaluation inputs")]
    UnknownVariable { key: InputKey },
    #[error(transparent)]
    Graph(#[from] GraphValidationError),
}

/// Evaluates `graph` against `inputs`, starting from the `Result` node and
/// recursively resolving input edges. Node values are memoized by id within
/// one call, so a value reused by several downstream nodes is computed once
/// and traced once. Identical graph and inputs always produce an identical
/// value and identically-shaped trace.
pub fn evaluate(
    graph: &FormulaGraph,
    inputs: &BTreeMap<InputKey, f64>,
) -> Result<Evaluation, EvaluationError> {
    let result = graph.result_node()?;

    let mut memo: HashMap<NodeId, f64> = HashMap::new();
    let mut visiting: HashSet<NodeId> = HashSet::new();
    let mut trace: Vec<TraceStep> = Vec::new();

    let value = resolve(graph, result, inputs, &mut memo, &mut visiting, &mut trace)?;

    Ok(Evaluation { value, trace })
}

fn resolve(
    graph: &FormulaGraph,
    node: &Node,
    inputs: &BTreeMap<InputKey, f64>,
    memo: &mut HashMap<NodeId, f64>,
    visiting: &mut HashSet<NodeId>,
    trace: &mut Vec<TraceStep>,
) -> Result<f64, EvaluationError> {
    if let Some(value) = memo.get(&node.id) {
        return Ok(*value);
    }
    if !visiting.insert(node.id.clone()) {
        return Err(GraphValidationError::CycleDetected.into());
    }

    let value = match &node.kind {
        NodeKind::Variable { key } => {
            let value = *inputs
                .get(key)
                .ok_or(EvaluationError::UnknownVariable { key: *key })?;
            push_step(trace, node, format!("input {} = {:.2}", key.key(), value), value);
            value
        }
        NodeKind::Number { value } => {
            push_step(trace, node, format!("constant {:.2}", value), *value);
            *value
        }
        NodeKind::Operation { op } => {
            let a = input_value(graph, node, InputPort::A, inputs, memo, visiting, trace)?;
            let b = input_value(graph, node, InputPort::B, inputs, memo, visiting, trace)?;
            let value = op.apply(a, b);
            let detail = if matches!(op, BinaryOp::Quotient) && b == 0.0 {
                format!("{:.2} / {:.2} = 0.00 (zero divisor)", a, b)
            } else {
                format!("{:.2} {} {:.2} = {:.2}", a, op.symbol(), b, value)
            };
            push_step(trace, node, detail, value);
            value
        }
        NodeKind::Comparator { cmp } => {
            let a = input_value(graph, node, InputPort::A, inputs, memo, visiting, trace)?;
            let b = input_value(graph, node, InputPort::B, inputs, memo, visiting, trace)?;
            let holds = cmp.holds(a, b);
            let value = if holds { 1.0 } else { 0.0 };
            push_step(
                trace,
                node,
                format!("{:.2} {} {:.2} -> {}", a, cmp.symbol(), b, holds),
                value,
            );
            value
        }
        NodeKind::Result => {
            let value = input_value(graph, node, InputPort::A, inputs, memo, visiting, trace)?;
            push_step(trace, node, format!("result = {:.2}", value), value);
            value
        }
    };

    visiting.remove(&node.id);
    memo.insert(node.id.clone(), value);
    Ok(value)
}

fn input_value(
    graph: &FormulaGraph,
    node: &Node,
    port: InputPort,
    inputs: &BTreeMap<InputKey, f64>,
    memo: &mut HashMap<NodeId, f64>,
    visiting: &mut HashSet<NodeId>,
    trace: &mut Vec<TraceStep>,
) -> Result<f64, EvaluationError> {
    let edge = graph
        .incoming(&node.id, port)
        .ok_or_else(|| EvaluationError::MissingInput {
            node: node.id.clone(),
            port,
        })?;
    let source = graph
        .node(&edge.source)
        .ok_or_else(|| GraphValidationError::UnknownNode(edge.source.clone()))?;
    resolve(graph, source, inputs, memo, visiting, trace)
}

fn push_step(trace: &mut Vec<TraceStep>, node: &Node, detail: String, value: f64) {
    trace.push(TraceStep {
        node: node.id.clone(),
        detail,
        value,
    });
}

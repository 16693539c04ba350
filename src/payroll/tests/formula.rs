use std::collections::BTreeMap;

use super::common::*;
use crate::payroll::formula::{
    evaluate, BinaryOp, EvaluationError, FormulaGraph, GraphValidationError, InputKey, InputPort,
    Node, NodeId, NodeKind,
};

fn node(id: &str, kind: NodeKind) -> Node {
    Node {
        id: NodeId(id.to_string()),
        kind,
    }
}

fn id(value: &str) -> NodeId {
    NodeId(value.to_string())
}

#[test]
fn comparator_output_composes_arithmetically() {
    let graph = comparator_sum_formula();
    graph.validate().expect("graph is well formed");

    let evaluation = evaluate(&graph, &BTreeMap::new()).expect("evaluation succeeds");
    assert_eq!(evaluation.value, 11.0);

    let gate_step = evaluation
        .trace
        .iter()
        .find(|step| step.node == id("gate"))
        .expect("comparator traced");
    assert_eq!(gate_step.value, 1.0);
    assert!(gate_step.detail.contains("30.00 > 20.00"));
}

#[test]
fn evaluation_is_deterministic() {
    let graph = comparator_sum_formula();
    let first = evaluate(&graph, &BTreeMap::new()).expect("first evaluation");
    let second = evaluate(&graph, &BTreeMap::new()).expect("second evaluation");

    assert_eq!(first.value, second.value);
    assert_eq!(first.trace, second.trace);
}

#[test]
fn shared_nodes_are_memoized_and_traced_once() {
    let graph = FormulaGraph::new()
        .with_node(node("five", NodeKind::Number { value: 5.0 }))
        .with_node(node("double", NodeKind::Operation { op: BinaryOp::Sum }))
        .with_node(node("payout", NodeKind::Result))
        .connected(id("five"), id("double"), InputPort::A)
        .connected(id("five"), id("double"), InputPort::B)
        .connected(id("double"), id("payout"), InputPort::A);

    let evaluation = evaluate(&graph, &BTreeMap::new()).expect("evaluation succeeds");
    assert_eq!(evaluation.value, 10.0);

    let five_steps = evaluation
        .trace
        .iter()
        .filter(|step| step.node == id("five"))
        .count();
    assert_eq!(five_steps, 1);
    assert_eq!(evaluation.trace.len(), 3);
}

#[test]
fn cycles_fail_validation_before_evaluation() {
    let graph = FormulaGraph::new()
        .with_node(node("left", NodeKind::Operation { op: BinaryOp::Sum }))
        .with_node(node("right", NodeKind::Operation { op: BinaryOp::Sum }))
        .with_node(node("payout", NodeKind::Result))
        .connected(id("left"), id("right"), InputPort::A)
        .connected(id("right"), id("left"), InputPort::A)
        .connected(id("left"), id("right"), InputPort::B)
        .connected(id("right"), id("left"), InputPort::B)
        .connected(id("left"), id("payout"), InputPort::A);

    assert_eq!(
        graph.validate(),
        Err(GraphValidationError::CycleDetected)
    );

    match evaluate(&graph, &BTreeMap::new()) {
        Err(EvaluationError::Graph(GraphValidationError::CycleDetected)) => {}
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[test]
fn missing_input_is_reported_with_node_and_port() {
    let graph = FormulaGraph::new()
        .with_node(node("one", NodeKind::Number { value: 1.0 }))
        .with_node(node("sum", NodeKind::Operation { op: BinaryOp::Sum }))
        .with_node(node("payout", NodeKind::Result))
        .connected(id("one"), id("sum"), InputPort::A)
        .connected(id("sum"), id("payout"), InputPort::A);

    assert_eq!(
        graph.validate(),
        Err(GraphValidationError::MissingInput {
            node: id("sum"),
            port: InputPort::B,
        })
    );

    match evaluate(&graph, &BTreeMap::new()) {
        Err(EvaluationError::MissingInput { node, port }) => {
            assert_eq!(node, id("sum"));
            assert_eq!(port, InputPort::B);
        }
        other => panic!("expected missing input, got {other:?}"),
    }
}

#[test]
fn unknown_variable_is_reported() {
    let graph = FormulaGraph::new()
        .with_node(node(
            "occupancy",
            NodeKind::Variable {
                key: InputKey::Occupancy,
            },
        ))
        .with_node(node("payout", NodeKind::Result))
        .connected(id("occupancy"), id("payout"), InputPort::A);

    match evaluate(&graph, &BTreeMap::new()) {
        Err(EvaluationError::UnknownVariable { key }) => {
            assert_eq!(key, InputKey::Occupancy);
        }
        other => panic!("expected unknown variable, got {other:?}"),
    }

    let mut inputs = BTreeMap::new();
    inputs.insert(InputKey::Occupancy, 82.5);
    let evaluation = evaluate(&graph, &inputs).expect("evaluation succeeds");
    assert_eq!(evaluation.value, 82.5);
}

#[test]
fn result_node_cardinality_is_enforced() {
    let none = FormulaGraph::new().with_node(node("one", NodeKind::Number { value: 1.0 }));
    assert_eq!(none.validate(), Err(GraphValidationError::MissingResult));

    let two = FormulaGraph::new()
        .with_node(node("one", NodeKind::Number { value: 1.0 }))
        .with_node(node("first", NodeKind::Result))
        .with_node(node("second", NodeKind::Result))
        .connected(id("one"), id("first"), InputPort::A)
        .connected(id("one"), id("second"), InputPort::A);
    assert_eq!(two.validate(), Err(GraphValidationError::MultipleResults));
}

#[test]
fn quotient_by_zero_evaluates_to_zero_with_note() {
    let graph = FormulaGraph::new()
        .with_node(node("twelve", NodeKind::Number { value: 12.0 }))
        .with_node(node("zero", NodeKind::Number { value: 0.0 }))
        .with_node(node(
            "ratio",
            NodeKind::Operation {
                op: BinaryOp::Quotient,
            },
        ))
        .with_node(node("payout", NodeKind::Result))
        .connected(id("twelve"), id("ratio"), InputPort::A)
        .connected(id("zero"), id("ratio"), InputPort::B)
        .connected(id("ratio"), id("payout"), InputPort::A);

    let evaluation = evaluate(&graph, &BTreeMap::new()).expect("evaluation succeeds");
    assert_eq!(evaluation.value, 0.0);
    let ratio_step = evaluation
        .trace
        .iter()
        .find(|step| step.node == id("ratio"))
        .expect("ratio traced");
    assert!(ratio_step.detail.contains("zero divisor"));
}

#[test]
fn edges_into_leaf_nodes_are_rejected() {
    let graph = FormulaGraph::new()
        .with_node(node("one", NodeKind::Number { value: 1.0 }))
        .with_node(node("two", NodeKind::Number { value: 2.0 }))
        .with_node(node("payout", NodeKind::Result))
        .connected(id("one"), id("two"), InputPort::A)
        .connected(id("two"), id("payout"), InputPort::A);

    assert_eq!(
        graph.validate(),
        Err(GraphValidationError::UnexpectedInput(id("two")))
    );
}

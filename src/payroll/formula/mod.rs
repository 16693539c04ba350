//! User-authored computation graphs and their evaluator.
//!
//! A formula is a small acyclic graph of typed nodes authored per discipline
//! and period. Evaluation is a pure function of the graph and a set of named
//! numeric inputs, producing a value plus an auditable step trace.

mod evaluator;
mod graph;

pub use evaluator::{evaluate, Evaluation, EvaluationError, TraceStep};
pub use graph::{
    BinaryOp, Comparison, Edge, FormulaGraph, GraphValidationError, InputKey, InputPort, Node,
    NodeId, NodeKind, StoredFormula,
};

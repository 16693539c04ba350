//! Instructor payroll: ingestion, computation graphs, performance tiers,
//! penalty aggregation, and payment assembly.
//!
//! The module is layered the way the run executes: class records come in via
//! `ingest`, `metrics` derives per-discipline aggregates, `category` places
//! the instructor on the tier ladder, `formula` evaluates the authored pay
//! graph per class, `penalty` converts points into a discount, and `assembly`
//! stitches the result into one payment record per instructor and period.

pub mod assembly;
pub mod blueprint;
pub mod category;
pub mod domain;
pub mod formula;
pub mod ingest;
pub mod memory;
pub mod metrics;
pub mod penalty;
pub mod report;
pub mod repository;
pub mod router;
pub mod settings;

#[cfg(test)]
mod tests;

pub use assembly::PaymentAssembler;
pub use blueprint::{standard_class_formula, standard_ladder, PayPlanBlueprint};
pub use category::{determine_category, CategoryLadder, CategoryOverrides, TierThreshold};
pub use domain::{
    Adjustment, CategoryAssignment, ClassId, ClassPayDetail, ClassRecord, Cover, DisciplineId,
    Instructor, InstructorId, InstructorMetrics, PayPeriod, PaymentRecord, PaymentStatus, Penalty,
    PenaltyKind, PeriodId,
};
pub use formula::{
    evaluate, BinaryOp, Comparison, Edge, Evaluation, EvaluationError, FormulaGraph,
    GraphValidationError, InputKey, InputPort, Node, NodeId, NodeKind, StoredFormula, TraceStep,
};
pub use ingest::{
    ensure_single_identity, ImportOptions, ImportReport, ImportRowError, PairKeep,
    ReservedNameError, ScheduleImportError, ScheduleImporter,
};
pub use metrics::compute_metrics;
pub use penalty::{assess, PenaltyAssessment, PenaltyDetail};
pub use report::{PaymentSummaryView, PayrollRunReport, RunError, RunScope};
pub use repository::{
    ClassQuery, ClassStore, FormulaStore, InstructorStore, Page, PaymentStore, StoreError,
};
pub use router::{payroll_router, ImportRequest, PayrollApi, RunRequest};
pub use settings::{OffPeakSlot, PayrollSettings};

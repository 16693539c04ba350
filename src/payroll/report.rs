use serde::Serialize;

use super::domain::{ClassId, DisciplineId, InstructorId, PaymentRecord, PeriodId};

/// Where in the batch an error was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunScope {
    Instructor {
        instructor: InstructorId,
    },
    Discipline {
        instructor: InstructorId,
        discipline: DisciplineId,
    },
    Class {
        class: ClassId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunError {
    pub scope: RunScope,
    pub message: String,
}

/// Sanitized per-payment summary for API responses and CLI rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSummaryView {
    pub instructor: InstructorId,
    pub status: &'static str,
    pub class_count: usize,
    pub base_amount: f64,
    pub bonus: f64,
    pub cover_pay: f64,
    pub penalty_amount: f64,
    pub retention: f64,
    pub final_pay: f64,
    /// True when an approved record was left untouched.
    pub no_op: bool,
}

impl PaymentSummaryView {
    pub fn from_record(record: &PaymentRecord, no_op: bool) -> Self {
        Self {
            instructor: record.instructor.clone(),
            status: record.status.label(),
            class_count: record.per_class.len(),
            base_amount: record.base_amount,
            bonus: record.bonus,
            cover_pay: record.cover_pay,
            penalty_amount: record.penalty_amount,
            retention: record.retention,
            final_pay: record.final_pay,
            no_op,
        }
    }
}

/// Batch outcome of one payroll run: a summary plus a detail list, never a
/// silent partial result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollRunReport {
    pub period: PeriodId,
    pub processed: u32,
    pub skipped: u32,
    pub error_count: u32,
    pub errors: Vec<RunError>,
    pub payments: Vec<PaymentSummaryView>,
}

impl PayrollRunReport {
    pub fn new(period: PeriodId) -> Self {
        Self {
            period,
            processed: 0,
            skipped: 0,
            error_count: 0,
            errors: Vec::new(),
            payments: Vec::new(),
        }
    }

    pub fn push_error(&mut self, scope: RunScope, message: String) {
        self.error_count += 1;
        self.errors.push(RunError { scope, message });
    }
}

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use crate::payroll::assembly::PaymentAssembler;
use crate::payroll::domain::{
    ClassId, ClassRecord, DisciplineId, Instructor, InstructorId, PayPeriod, PeriodId,
};
use crate::payroll::formula::{
    BinaryOp, Comparison, FormulaGraph, InputKey, InputPort, Node, NodeId, NodeKind,
};
use crate::payroll::memory::{
    MemoryClassStore, MemoryFormulaStore, MemoryInstructorStore, MemoryPaymentStore,
};
use crate::payroll::router::PayrollApi;
use crate::payroll::settings::PayrollSettings;

pub(super) type MemoryAssembler = PaymentAssembler<
    MemoryFormulaStore,
    MemoryClassStore,
    MemoryInstructorStore,
    MemoryPaymentStore,
>;

pub(super) type MemoryApi =
    PayrollApi<MemoryFormulaStore, MemoryClassStore, MemoryInstructorStore, MemoryPaymentStore>;

pub(super) struct Stores {
    pub(super) formulas: Arc<MemoryFormulaStore>,
    pub(super) classes: Arc<MemoryClassStore>,
    pub(super) instructors: Arc<MemoryInstructorStore>,
    pub(super) payments: Arc<MemoryPaymentStore>,
}

impl Default for Stores {
    fn default() -> Self {
        Self {
            formulas: Arc::new(MemoryFormulaStore::default()),
            classes: Arc::new(MemoryClassStore::default()),
            instructors: Arc::new(MemoryInstructorStore::default()),
            payments: Arc::new(MemoryPaymentStore::default()),
        }
    }
}

impl Stores {
    pub(super) fn assembler(&self, settings: PayrollSettings) -> MemoryAssembler {
        PaymentAssembler::new(
            self.formulas.clone(),
            self.classes.clone(),
            self.instructors.clone(),
            self.payments.clone(),
            settings,
        )
    }

    pub(super) fn api(&self, settings: PayrollSettings) -> MemoryApi {
        PayrollApi::new(
            self.formulas.clone(),
            self.classes.clone(),
            self.instructors.clone(),
            self.payments.clone(),
            settings,
        )
    }
}

pub(super) fn period() -> PayPeriod {
    PayPeriod {
        id: PeriodId("2026-07".to_string()),
        starts_on: NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid start"),
        ends_on: NaiveDate::from_ymd_opt(2026, 7, 28).expect("valid end"),
    }
}

pub(super) fn cycling() -> DisciplineId {
    DisciplineId("cycling".to_string())
}

pub(super) fn yoga() -> DisciplineId {
    DisciplineId("yoga".to_string())
}

pub(super) fn instructor(id: &str, name: &str) -> Instructor {
    Instructor {
        id: InstructorId(id.to_string()),
        name: name.to_string(),
        disciplines: vec![cycling()],
        penalties: Vec::new(),
        covers: Vec::new(),
        categories: Vec::new(),
        event_participation: false,
        guideline_compliance: true,
    }
}

pub(super) fn class(
    id: &str,
    instructor: &str,
    discipline: DisciplineId,
    day: u32,
    hour: u32,
    reservations: u32,
    capacity: u32,
) -> ClassRecord {
    let date = NaiveDate::from_ymd_opt(2026, 7, day).expect("valid date");
    ClassRecord {
        id: ClassId(id.to_string()),
        instructor: InstructorId(instructor.to_string()),
        discipline,
        period: period().id,
        week: period().week_of(date),
        venue: "Centro Alameda".to_string(),
        city: "Santiago".to_string(),
        country: "CL".to_string(),
        date,
        starts_at: NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time"),
        reservations_total: reservations,
        waitlist: 0,
        courtesy_seats: 0,
        capacity,
        paid_reservations: reservations,
        paired_multiplier: None,
        full_house_override: false,
    }
}

/// Formula paying exactly the effective reservation count, so expected
/// amounts stay obvious in assembly tests.
pub(super) fn reservations_formula() -> FormulaGraph {
    FormulaGraph::new()
        .with_node(Node {
            id: NodeId("reservations".to_string()),
            kind: NodeKind::Variable {
                key: InputKey::Reservations,
            },
        })
        .with_node(Node {
            id: NodeId("payout".to_string()),
            kind: NodeKind::Result,
        })
        .connected(
            NodeId("reservations".to_string()),
            NodeId("payout".to_string()),
            InputPort::A,
        )
}

/// Comparator feeding an arithmetic node: `(30 > 20) + 10`.
pub(super) fn comparator_sum_formula() -> FormulaGraph {
    let node = |id: &str, kind: NodeKind| Node {
        id: NodeId(id.to_string()),
        kind,
    };
    let id = |id: &str| NodeId(id.to_string());

    FormulaGraph::new()
        .with_node(node("thirty", NodeKind::Number { value: 30.0 }))
        .with_node(node("twenty", NodeKind::Number { value: 20.0 }))
        .with_node(node(
            "gate",
            NodeKind::Comparator {
                cmp: Comparison::GreaterThan,
            },
        ))
        .with_node(node("ten", NodeKind::Number { value: 10.0 }))
        .with_node(node("sum", NodeKind::Operation { op: BinaryOp::Sum }))
        .with_node(node("payout", NodeKind::Result))
        .connected(id("thirty"), id("gate"), InputPort::A)
        .connected(id("twenty"), id("gate"), InputPort::B)
        .connected(id("gate"), id("sum"), InputPort::A)
        .connected(id("ten"), id("sum"), InputPort::B)
        .connected(id("sum"), id("payout"), InputPort::A)
}

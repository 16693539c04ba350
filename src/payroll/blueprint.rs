use std::collections::BTreeMap;

use super::category::{CategoryLadder, TierThreshold};
use super::domain::{DisciplineId, PeriodId};
use super::formula::{
    BinaryOp, Comparison, FormulaGraph, InputKey, InputPort, Node, NodeId, NodeKind, StoredFormula,
};
use super::repository::{FormulaStore, StoreError};
use super::settings::PayrollSettings;

/// Ready-made pay plan so the service and demo CLI boot without external
/// formula authoring: one occupancy-driven formula and a four-tier ladder per
/// configured discipline.
#[derive(Debug, Clone)]
pub struct PayPlanBlueprint {
    disciplines: Vec<DisciplineId>,
}

impl PayPlanBlueprint {
    pub fn standard(settings: &PayrollSettings) -> Self {
        Self {
            disciplines: settings.disciplines.clone(),
        }
    }

    pub fn ladders(&self, period: &PeriodId) -> BTreeMap<DisciplineId, CategoryLadder> {
        self.disciplines
            .iter()
            .map(|discipline| {
                (
                    discipline.clone(),
                    standard_ladder(discipline.clone(), period.clone()),
                )
            })
            .collect()
    }

    /// Creates the standard formula for any configured discipline that has
    /// none stored for the period. Existing formulas are left untouched.
    pub fn seed_missing_formulas<F: FormulaStore>(
        &self,
        store: &F,
        period: &PeriodId,
    ) -> Result<u32, StoreError> {
        let mut created = 0;
        for discipline in &self.disciplines {
            if store.get(discipline, period)?.is_some() {
                continue;
            }
            store.create(StoredFormula {
                discipline: discipline.clone(),
                period: period.clone(),
                graph: standard_class_formula(),
            })?;
            created += 1;
        }
        Ok(created)
    }
}

/// Per-class pay: occupancy percent of the class rate, plus a fixed bump for
/// a sold-out room, plus a per-tier allowance.
pub fn standard_class_formula() -> FormulaGraph {
    let node = |id: &str, kind: NodeKind| Node {
        id: NodeId(id.to_string()),
        kind,
    };
    let id = |id: &str| NodeId(id.to_string());

    FormulaGraph::new()
        .with_node(node(
            "occupancy",
            NodeKind::Variable {
                key: InputKey::Occupancy,
            },
        ))
        .with_node(node("class-rate", NodeKind::Number { value: 45.0 }))
        .with_node(node(
            "base-pay",
            NodeKind::Operation {
                op: BinaryOp::Percentage,
            },
        ))
        .with_node(node(
            "reservations",
            NodeKind::Variable {
                key: InputKey::Reservations,
            },
        ))
        .with_node(node(
            "capacity",
            NodeKind::Variable {
                key: InputKey::Capacity,
            },
        ))
        .with_node(node(
            "full-house",
            NodeKind::Comparator {
                cmp: Comparison::GreaterOrEqual,
            },
        ))
        .with_node(node("full-house-rate", NodeKind::Number { value: 10.0 }))
        .with_node(node(
            "full-house-bonus",
            NodeKind::Operation {
                op: BinaryOp::Product,
            },
        ))
        .with_node(node(
            "tier-level",
            NodeKind::Variable {
                key: InputKey::TierLevel,
            },
        ))
        .with_node(node("tier-rate", NodeKind::Number { value: 5.0 }))
        .with_node(node(
            "tier-bonus",
            NodeKind::Operation {
                op: BinaryOp::Product,
            },
        ))
        .with_node(node(
            "subtotal",
            NodeKind::Operation { op: BinaryOp::Sum },
        ))
        .with_node(node("total", NodeKind::Operation { op: BinaryOp::Sum }))
        .with_node(node("payout", NodeKind::Result))
        .connected(id("occupancy"), id("base-pay"), InputPort::A)
        .connected(id("class-rate"), id("base-pay"), InputPort::B)
        .connected(id("reservations"), id("full-house"), InputPort::A)
        .connected(id("capacity"), id("full-house"), InputPort::B)
        .connected(id("full-house"), id("full-house-bonus"), InputPort::A)
        .connected(id("full-house-rate"), id("full-house-bonus"), InputPort::B)
        .connected(id("tier-level"), id("tier-bonus"), InputPort::A)
        .connected(id("tier-rate"), id("tier-bonus"), InputPort::B)
        .connected(id("base-pay"), id("subtotal"), InputPort::A)
        .connected(id("full-house-bonus"), id("subtotal"), InputPort::B)
        .connected(id("subtotal"), id("total"), InputPort::A)
        .connected(id("tier-bonus"), id("total"), InputPort::B)
        .connected(id("total"), id("payout"), InputPort::A)
}

/// Four-tier ladder ordered highest first, mirroring the studio's ambassador
/// program.
pub fn standard_ladder(discipline: DisciplineId, period: PeriodId) -> CategoryLadder {
    CategoryLadder {
        discipline,
        period,
        tiers: vec![
            TierThreshold {
                tier: "Senior Ambassador".to_string(),
                level: 4,
                min_occupancy: 85.0,
                min_classes_per_week: 6.0,
                min_venue_count: 3,
                min_back_to_back: 2.0,
                min_off_peak: 2.0,
                requires_event_participation: true,
                requires_guideline_compliance: true,
            },
            TierThreshold {
                tier: "Ambassador".to_string(),
                level: 3,
                min_occupancy: 75.0,
                min_classes_per_week: 5.0,
                min_venue_count: 2,
                min_back_to_back: 1.0,
                min_off_peak: 1.0,
                requires_event_participation: true,
                requires_guideline_compliance: true,
            },
            TierThreshold {
                tier: "Junior Ambassador".to_string(),
                level: 2,
                min_occupancy: 60.0,
                min_classes_per_week: 3.0,
                min_venue_count: 1,
                min_back_to_back: 0.0,
                min_off_peak: 0.0,
                requires_event_participation: false,
                requires_guideline_compliance: true,
            },
            TierThreshold {
                tier: "Instructor".to_string(),
                level: 1,
                min_occupancy: 0.0,
                min_classes_per_week: 0.0,
                min_venue_count: 0,
                min_back_to_back: 0.0,
                min_off_peak: 0.0,
                requires_event_participation: false,
                requires_guideline_compliance: false,
            },
        ],
    }
}

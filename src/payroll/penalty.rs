use serde::{Deserialize, Serialize};

use super::domain::{DisciplineId, Penalty, PenaltyKind};

/// Share of taught classes tolerated as penalty points before a discount
/// kicks in.
pub const PENALTY_ALLOWANCE_RATIO: f64 = 0.10;

/// Upper bound on the discount: beyond 100% the subtotal is already gone.
pub const MAX_DISCOUNT_PERCENT: f64 = 100.0;

/// Per-penalty breakdown retained for audit display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyDetail {
    pub kind: PenaltyKind,
    pub points: u32,
    pub description: String,
    pub discipline: Option<DisciplineId>,
}

/// Outcome of aggregating an instructor's active penalties for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyAssessment {
    pub points: u32,
    pub max_allowed: u32,
    pub excess: u32,
    pub discount_percent: f64,
    pub detail: Vec<PenaltyDetail>,
}

/// Converts accumulated penalty points into a discount percentage. Points up
/// to `floor(total_classes * 0.10)` are forgiven; each excess point equals
/// one percentage point of discount, capped at 100%.
pub fn assess(total_classes: usize, penalties: &[Penalty]) -> PenaltyAssessment {
    let max_allowed = (total_classes as f64 * PENALTY_ALLOWANCE_RATIO).floor() as u32;

    let active: Vec<&Penalty> = penalties.iter().filter(|penalty| penalty.active).collect();
    let points: u32 = active.iter().map(|penalty| penalty.points).sum();
    let excess = points.saturating_sub(max_allowed);
    let discount_percent = f64::from(excess).min(MAX_DISCOUNT_PERCENT);

    let detail = active
        .iter()
        .map(|penalty| PenaltyDetail {
            kind: penalty.kind,
            points: penalty.points,
            description: penalty.description.clone(),
            discipline: penalty.discipline.clone(),
        })
        .collect();

    PenaltyAssessment {
        points,
        max_allowed,
        excess,
        discount_percent,
        detail,
    }
}

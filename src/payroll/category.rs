use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CategoryAssignment, DisciplineId, InstructorId, InstructorMetrics, PeriodId};

/// Requirements an instructor must meet to hold a tier. All minimums must
/// hold simultaneously; participation flags only bind when required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub tier: String,
    pub level: u8,
    pub min_occupancy: f64,
    pub min_classes_per_week: f64,
    pub min_venue_count: u32,
    pub min_back_to_back: f64,
    pub min_off_peak: f64,
    pub requires_event_participation: bool,
    pub requires_guideline_compliance: bool,
}

impl TierThreshold {
    pub fn admits(&self, metrics: &InstructorMetrics) -> bool {
        metrics.occupancy >= self.min_occupancy
            && metrics.classes_per_week >= self.min_classes_per_week
            && metrics.venue_count >= self.min_venue_count
            && metrics.back_to_back_count >= self.min_back_to_back
            && metrics.off_peak_count >= self.min_off_peak
            && (!self.requires_event_participation || metrics.event_participation)
            && (!self.requires_guideline_compliance || metrics.guideline_compliance)
    }
}

/// Ordered tier ladder for one discipline and period, highest tier first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLadder {
    pub discipline: DisciplineId,
    pub period: PeriodId,
    pub tiers: Vec<TierThreshold>,
}

impl CategoryLadder {
    pub fn lowest(&self) -> Option<&TierThreshold> {
        self.tiers.last()
    }
}

/// Manual assignments keyed by (instructor, discipline). Passed explicitly so
/// classification stays a pure function of its arguments.
pub type CategoryOverrides = BTreeMap<(InstructorId, DisciplineId), CategoryAssignment>;

/// Classifies an instructor into a tier. A manual override is returned
/// unchanged; otherwise tiers are tried highest first and the first one whose
/// requirements all hold wins. No match falls back to the lowest tier.
///
/// Classification is monotonic in every metric: improving one metric while
/// holding the rest fixed can only move the first admitting tier upward.
pub fn determine_category(
    instructor: &InstructorId,
    discipline: &DisciplineId,
    period: &PeriodId,
    ladder: &CategoryLadder,
    metrics: &InstructorMetrics,
    overrides: &CategoryOverrides,
) -> CategoryAssignment {
    if let Some(manual) = overrides.get(&(instructor.clone(), discipline.clone())) {
        return manual.clone();
    }

    let chosen = ladder
        .tiers
        .iter()
        .find(|tier| tier.admits(metrics))
        .or_else(|| ladder.lowest());

    match chosen {
        Some(tier) => CategoryAssignment {
            instructor: instructor.clone(),
            discipline: discipline.clone(),
            period: period.clone(),
            tier: tier.tier.clone(),
            level: tier.level,
            metrics: metrics.clone(),
            manual: false,
        },
        // Ladders are authored configuration; an empty one yields the
        // sentinel tier rather than an error.
        None => CategoryAssignment {
            instructor: instructor.clone(),
            discipline: discipline.clone(),
            period: period.clone(),
            tier: "unclassified".to_string(),
            level: 0,
            metrics: metrics.clone(),
            manual: false,
        },
    }
}

use std::collections::BTreeMap;

use super::common::*;
use crate::payroll::blueprint::standard_ladder;
use crate::payroll::category::{determine_category, CategoryOverrides};
use crate::payroll::domain::{CategoryAssignment, InstructorId, InstructorMetrics};

fn metrics(
    occupancy: f64,
    classes_per_week: f64,
    venue_count: u32,
    back_to_back: f64,
    off_peak: f64,
) -> InstructorMetrics {
    InstructorMetrics {
        occupancy,
        classes_per_week,
        venue_count,
        back_to_back_count: back_to_back,
        off_peak_count: off_peak,
        event_participation: true,
        guideline_compliance: true,
    }
}

fn classify(metrics: &InstructorMetrics, overrides: &CategoryOverrides) -> CategoryAssignment {
    let ladder = standard_ladder(cycling(), period().id);
    determine_category(
        &InstructorId("inst-1".to_string()),
        &cycling(),
        &period().id,
        &ladder,
        metrics,
        overrides,
    )
}

#[test]
fn first_tier_meeting_all_requirements_wins() {
    let assignment = classify(&metrics(88.0, 6.5, 3, 2.0, 2.0), &BTreeMap::new());
    assert_eq!(assignment.tier, "Senior Ambassador");
    assert_eq!(assignment.level, 4);
    assert!(!assignment.manual);
}

#[test]
fn missing_one_requirement_drops_to_the_next_tier() {
    // Everything senior-grade except venue coverage.
    let assignment = classify(&metrics(88.0, 6.5, 2, 2.0, 2.0), &BTreeMap::new());
    assert_eq!(assignment.tier, "Ambassador");
    assert_eq!(assignment.level, 3);
}

#[test]
fn no_match_falls_back_to_the_lowest_tier() {
    let mut weak = metrics(10.0, 0.25, 0, 0.0, 0.0);
    weak.guideline_compliance = false;

    let assignment = classify(&weak, &BTreeMap::new());
    assert_eq!(assignment.tier, "Instructor");
    assert_eq!(assignment.level, 1);
}

#[test]
fn required_participation_gates_the_tier() {
    let mut no_events = metrics(88.0, 6.5, 3, 2.0, 2.0);
    no_events.event_participation = false;

    // Senior and Ambassador both require events; Junior does not.
    let assignment = classify(&no_events, &BTreeMap::new());
    assert_eq!(assignment.tier, "Junior Ambassador");
}

#[test]
fn manual_override_is_returned_unchanged() {
    let manual = CategoryAssignment {
        instructor: InstructorId("inst-1".to_string()),
        discipline: cycling(),
        period: period().id,
        tier: "Ambassador".to_string(),
        level: 3,
        metrics: metrics(10.0, 0.25, 0, 0.0, 0.0),
        manual: true,
    };
    let mut overrides: CategoryOverrides = BTreeMap::new();
    overrides.insert(
        (InstructorId("inst-1".to_string()), cycling()),
        manual.clone(),
    );

    // Metrics would classify far lower, but the override sticks.
    let assignment = classify(&metrics(10.0, 0.25, 0, 0.0, 0.0), &overrides);
    assert_eq!(assignment, manual);
}

#[test]
fn classification_is_monotonic_in_each_metric() {
    let baseline = metrics(74.0, 5.0, 2, 1.0, 1.0);
    let base_level = classify(&baseline, &BTreeMap::new()).level;

    let improvements = [
        metrics(90.0, 5.0, 2, 1.0, 1.0),
        metrics(74.0, 7.0, 2, 1.0, 1.0),
        metrics(74.0, 5.0, 4, 1.0, 1.0),
        metrics(74.0, 5.0, 2, 3.0, 1.0),
        metrics(74.0, 5.0, 2, 1.0, 3.0),
    ];

    for improved in improvements {
        let level = classify(&improved, &BTreeMap::new()).level;
        assert!(
            level >= base_level,
            "improving a single metric lowered the tier: {improved:?}"
        );
    }
}

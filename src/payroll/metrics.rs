use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveTime};

use super::domain::{ClassRecord, DisciplineId, Instructor, InstructorMetrics};
use super::settings::PayrollSettings;

/// Derives the aggregate metrics feeding tier classification and formula
/// evaluation, scoped to one instructor's classes in one period.
pub fn compute_metrics(
    classes: &[ClassRecord],
    discipline: &DisciplineId,
    instructor: &Instructor,
    settings: &PayrollSettings,
) -> InstructorMetrics {
    let weeks = settings.weeks_per_period.max(1) as f64;
    let in_discipline: Vec<&ClassRecord> = classes
        .iter()
        .filter(|class| &class.discipline == discipline)
        .collect();

    InstructorMetrics {
        occupancy: occupancy(&in_discipline),
        classes_per_week: in_discipline.len() as f64 / weeks,
        venue_count: capital_venue_count(&in_discipline, &settings.capital_city),
        back_to_back_count: back_to_back_pairs(classes, &settings.reference_discipline) as f64
            / weeks,
        off_peak_count: off_peak_classes(&in_discipline, settings) as f64 / weeks,
        event_participation: instructor.event_participation,
        guideline_compliance: instructor.guideline_compliance,
    }
}

/// `100 * total reservations / total capacity`, `0` when no capacity exists.
fn occupancy(classes: &[&ClassRecord]) -> f64 {
    let reservations: u64 = classes
        .iter()
        .map(|class| u64::from(class.reservations_total))
        .sum();
    let capacity: u64 = classes.iter().map(|class| u64::from(class.capacity)).sum();

    if capacity == 0 {
        0.0
    } else {
        100.0 * reservations as f64 / capacity as f64
    }
}

fn capital_venue_count(classes: &[&ClassRecord], capital_city: &str) -> u32 {
    let venues: BTreeSet<&str> = classes
        .iter()
        .filter(|class| class.city.eq_ignore_ascii_case(capital_city))
        .map(|class| class.venue.as_str())
        .collect();
    venues.len() as u32
}

/// Counts adjacent same-day bookings starting exactly one hour apart, only
/// within the reference discipline.
fn back_to_back_pairs(classes: &[ClassRecord], reference: &DisciplineId) -> u32 {
    let mut by_day: BTreeMap<NaiveDate, Vec<NaiveTime>> = BTreeMap::new();
    for class in classes {
        if &class.discipline == reference {
            by_day.entry(class.date).or_default().push(class.starts_at);
        }
    }

    let mut pairs = 0;
    for times in by_day.values_mut() {
        times.sort();
        for window in times.windows(2) {
            if window[1] - window[0] == Duration::hours(1) {
                pairs += 1;
            }
        }
    }
    pairs
}

fn off_peak_classes(classes: &[&ClassRecord], settings: &PayrollSettings) -> u32 {
    classes
        .iter()
        .filter(|class| settings.is_off_peak(&class.venue, &class.start_slot()))
        .count() as u32
}

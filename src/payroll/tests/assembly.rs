use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::common::*;
use crate::payroll::blueprint::standard_ladder;
use crate::payroll::category::CategoryLadder;
use crate::payroll::domain::{
    Adjustment, CategoryAssignment, ClassId, Cover, DisciplineId, InstructorId, PaymentRecord,
    PaymentStatus, Penalty, PenaltyKind,
};
use crate::payroll::formula::StoredFormula;
use crate::payroll::repository::{
    ClassStore, FormulaStore, InstructorStore, Page, PaymentStore,
};
use crate::payroll::settings::PayrollSettings;

fn ladders() -> BTreeMap<DisciplineId, CategoryLadder> {
    let mut ladders = BTreeMap::new();
    ladders.insert(cycling(), standard_ladder(cycling(), period().id));
    ladders.insert(yoga(), standard_ladder(yoga(), period().id));
    ladders
}

fn seed_formula(stores: &Stores, discipline: DisciplineId) {
    stores
        .formulas
        .create(StoredFormula {
            discipline,
            period: period().id,
            graph: reservations_formula(),
        })
        .expect("formula stored");
}

#[test]
fn base_pay_sums_per_class_evaluations() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());
    stores
        .instructors
        .create(instructor("inst-1", "Juan Perez"))
        .expect("instructor stored");
    stores
        .classes
        .create(class("c1", "inst-1", cycling(), 6, 18, 12, 20))
        .expect("class stored");
    stores
        .classes
        .create(class("c2", "inst-1", cycling(), 7, 18, 15, 20))
        .expect("class stored");

    let assembler = stores.assembler(PayrollSettings::default());
    let report = assembler
        .run_period(&period(), &ladders())
        .expect("run succeeds");

    assert_eq!(report.processed, 1);
    assert_eq!(report.error_count, 0);

    let record = stores
        .payments
        .get(&InstructorId("inst-1".to_string()), &period().id)
        .expect("payment lookup")
        .expect("payment present");
    assert_eq!(record.base_amount, 27.0);
    assert_eq!(record.per_class.len(), 2);
    assert!(record.per_class.iter().all(|detail| !detail.trace.is_empty()));
    // 27 minus 10% retention.
    assert_eq!(record.retention, 2.7);
    assert_eq!(record.final_pay, 24.3);
    assert_eq!(record.status, PaymentStatus::Pending);
}

#[test]
fn paired_classes_split_the_evaluated_amount() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());
    stores
        .instructors
        .create(instructor("inst-1", "Ana"))
        .expect("instructor stored");

    // Ingestion-half of an 18/20 paired class: 9 of 10, share 2.
    let mut shared = class("c1", "inst-1", cycling(), 6, 18, 9, 10);
    shared.paired_multiplier = Some(2);
    stores.classes.create(shared).expect("class stored");

    let assembler = stores.assembler(PayrollSettings::default());
    assembler
        .run_period(&period(), &ladders())
        .expect("run succeeds");

    let record = stores
        .payments
        .get(&InstructorId("inst-1".to_string()), &period().id)
        .expect("payment lookup")
        .expect("payment present");
    // The formula sees the recombined room (18 reservations) and the class
    // amount is halved back into this instructor's share.
    assert_eq!(record.base_amount, 9.0);
    assert!(record.per_class[0].shared);
}

#[test]
fn full_house_cover_raises_reservations_to_capacity() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());

    let mut ana = instructor("inst-1", "Ana");
    ana.covers.push(Cover {
        class_id: ClassId("c1".to_string()),
        period: period().id,
        bonus_eligible: true,
        full_house_eligible: true,
    });
    stores.instructors.create(ana).expect("instructor stored");
    stores
        .classes
        .create(class("c1", "inst-1", cycling(), 6, 18, 3, 20))
        .expect("class stored");

    let assembler = stores.assembler(PayrollSettings::default());
    assembler
        .run_period(&period(), &ladders())
        .expect("run succeeds");

    let record = stores
        .payments
        .get(&InstructorId("inst-1".to_string()), &period().id)
        .expect("payment lookup")
        .expect("payment present");
    // Reservations lifted to capacity, plus one cover at the fixed rate.
    assert_eq!(record.base_amount, 20.0);
    assert_eq!(record.cover_pay, 80.0);
}

#[test]
fn penalties_discount_the_subtotal_and_retention_follows() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());

    let mut juan = instructor("inst-1", "Juan Perez");
    juan.penalties.push(Penalty {
        points: 2,
        kind: PenaltyKind::LateCancellation,
        description: "cancelled within two hours".to_string(),
        discipline: Some(cycling()),
        applied_at: NaiveDate::from_ymd_opt(2026, 7, 10).expect("valid date"),
        active: true,
    });
    // Outside the period window, must not count.
    juan.penalties.push(Penalty {
        points: 50,
        kind: PenaltyKind::NoShow,
        description: "ancient history".to_string(),
        discipline: None,
        applied_at: NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date"),
        active: true,
    });
    stores.instructors.create(juan).expect("instructor stored");
    stores
        .classes
        .create(class("c1", "inst-1", cycling(), 6, 18, 100, 100))
        .expect("class stored");

    let assembler = stores.assembler(PayrollSettings::default());
    assembler
        .run_period(&period(), &ladders())
        .expect("run succeeds");

    let record = stores
        .payments
        .get(&InstructorId("inst-1".to_string()), &period().id)
        .expect("payment lookup")
        .expect("payment present");
    // One class allows zero points, so both points are excess: 2% of 100.
    assert_eq!(record.penalty_amount, 2.0);
    assert_eq!(record.retention, 9.8);
    assert_eq!(record.final_pay, 88.2);
}

#[test]
fn approved_records_are_never_recomputed() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());
    stores
        .instructors
        .create(instructor("inst-1", "Juan Perez"))
        .expect("instructor stored");
    stores
        .classes
        .create(class("c1", "inst-1", cycling(), 6, 18, 12, 20))
        .expect("class stored");

    let frozen = PaymentRecord {
        instructor: InstructorId("inst-1".to_string()),
        period: period().id,
        base_amount: 500.0,
        adjustment: None,
        bonus: 0.0,
        cover_pay: 0.0,
        penalty_amount: 0.0,
        retention: 0.0,
        final_pay: 500.0,
        per_class: Vec::new(),
        status: PaymentStatus::Approved,
    };
    stores
        .payments
        .create(frozen.clone())
        .expect("record stored");

    let assembler = stores.assembler(PayrollSettings::default());
    let report = assembler
        .run_period(&period(), &ladders())
        .expect("run succeeds");

    assert_eq!(report.processed, 0);
    assert_eq!(report.skipped, 1);
    assert!(report.payments[0].no_op);

    let stored = stores
        .payments
        .get(&InstructorId("inst-1".to_string()), &period().id)
        .expect("payment lookup")
        .expect("payment present");
    assert_eq!(stored, frozen);
}

#[test]
fn pending_manual_corrections_survive_recomputation() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());
    stores
        .instructors
        .create(instructor("inst-1", "Juan Perez"))
        .expect("instructor stored");
    stores
        .classes
        .create(class("c1", "inst-1", cycling(), 6, 18, 100, 100))
        .expect("class stored");

    let assembler = stores.assembler(PayrollSettings::default());
    assembler
        .run_period(&period(), &ladders())
        .expect("first run succeeds");

    let mut pending = stores
        .payments
        .get(&InstructorId("inst-1".to_string()), &period().id)
        .expect("payment lookup")
        .expect("payment present");
    pending.bonus = 50.0;
    pending.adjustment = Some(Adjustment::Percent(10.0));
    stores.payments.update(pending).expect("correction stored");

    let report = assembler
        .run_period(&period(), &ladders())
        .expect("second run succeeds");
    assert_eq!(report.processed, 1);

    let record = stores
        .payments
        .get(&InstructorId("inst-1".to_string()), &period().id)
        .expect("payment lookup")
        .expect("payment present");
    assert_eq!(record.bonus, 50.0);
    assert_eq!(record.adjustment, Some(Adjustment::Percent(10.0)));
    // subtotal 100 + 10 + 50 = 160, retention 16.
    assert_eq!(record.retention, 16.0);
    assert_eq!(record.final_pay, 144.0);
}

#[test]
fn missing_formula_zeroes_the_discipline_but_not_the_batch() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());

    let mut juan = instructor("inst-1", "Juan Perez");
    juan.disciplines.push(yoga());
    stores.instructors.create(juan).expect("instructor stored");
    stores
        .classes
        .create(class("c1", "inst-1", cycling(), 6, 18, 12, 20))
        .expect("class stored");
    stores
        .classes
        .create(class("c2", "inst-1", yoga(), 7, 9, 30, 30))
        .expect("class stored");

    let assembler = stores.assembler(PayrollSettings::default());
    let report = assembler
        .run_period(&period(), &ladders())
        .expect("run succeeds");

    assert_eq!(report.processed, 1);
    assert_eq!(report.error_count, 1);
    assert!(report.errors[0].message.contains("no formula"));

    let record = stores
        .payments
        .get(&InstructorId("inst-1".to_string()), &period().id)
        .expect("payment lookup")
        .expect("payment present");
    // Only the cycling class contributed.
    assert_eq!(record.base_amount, 12.0);
}

#[test]
fn unknown_instructor_is_recorded_and_skipped() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());
    stores
        .classes
        .create(class("c1", "ghost", cycling(), 6, 18, 12, 20))
        .expect("class stored");

    let assembler = stores.assembler(PayrollSettings::default());
    let report = assembler
        .run_period(&period(), &ladders())
        .expect("run succeeds");

    assert_eq!(report.processed, 0);
    assert_eq!(report.error_count, 1);
    assert!(report.errors[0].message.contains("unknown instructor"));
    assert!(stores
        .payments
        .list(&period().id, Page::default())
        .expect("listing")
        .is_empty());
}

#[test]
fn category_assignments_are_written_back_and_manual_ones_kept() {
    let stores = Stores::default();
    seed_formula(&stores, cycling());

    let mut juan = instructor("inst-1", "Juan Perez");
    juan.categories.push(CategoryAssignment {
        instructor: InstructorId("inst-1".to_string()),
        discipline: cycling(),
        period: period().id,
        tier: "Senior Ambassador".to_string(),
        level: 4,
        metrics: crate::payroll::domain::InstructorMetrics {
            occupancy: 0.0,
            classes_per_week: 0.0,
            venue_count: 0,
            back_to_back_count: 0.0,
            off_peak_count: 0.0,
            event_participation: false,
            guideline_compliance: false,
        },
        manual: true,
    });
    stores.instructors.create(juan).expect("instructor stored");
    stores
        .classes
        .create(class("c1", "inst-1", cycling(), 6, 18, 2, 20))
        .expect("class stored");

    let assembler = stores.assembler(PayrollSettings::default());
    assembler
        .run_period(&period(), &ladders())
        .expect("run succeeds");

    let stored = stores
        .instructors
        .get(&InstructorId("inst-1".to_string()))
        .expect("instructor lookup")
        .expect("instructor present");
    let assignment = stored
        .categories
        .iter()
        .find(|assignment| assignment.discipline == cycling())
        .expect("assignment kept");
    assert!(assignment.manual);
    assert_eq!(assignment.tier, "Senior Ambassador");
}

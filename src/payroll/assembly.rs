//! Payment assembly: drives the formula evaluator per class, folds in
//! metrics, tier, covers, penalties, manual corrections, and retention, and
//! persists one payment record per instructor and period.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::info;

use super::category::{determine_category, CategoryLadder, CategoryOverrides};
use super::domain::{
    CategoryAssignment, ClassId, ClassPayDetail, ClassRecord, DisciplineId, Instructor,
    InstructorId, PayPeriod, PaymentRecord, PaymentStatus, Penalty,
};
use super::formula::{evaluate, InputKey};
use super::metrics::compute_metrics;
use super::penalty;
use super::report::{PaymentSummaryView, PayrollRunReport, RunScope};
use super::repository::{ClassQuery, ClassStore, FormulaStore, InstructorStore, PaymentStore, StoreError};
use super::settings::PayrollSettings;

/// Orchestrates a payroll run over the external stores. Per-instructor
/// computation is pure until the final writes, so failures stay contained to
/// the record they concern.
pub struct PaymentAssembler<F, C, I, P> {
    formulas: Arc<F>,
    classes: Arc<C>,
    instructors: Arc<I>,
    payments: Arc<P>,
    settings: PayrollSettings,
}

impl<F, C, I, P> PaymentAssembler<F, C, I, P>
where
    F: FormulaStore,
    C: ClassStore,
    I: InstructorStore,
    P: PaymentStore,
{
    pub fn new(
        formulas: Arc<F>,
        classes: Arc<C>,
        instructors: Arc<I>,
        payments: Arc<P>,
        settings: PayrollSettings,
    ) -> Self {
        Self {
            formulas,
            classes,
            instructors,
            payments,
            settings,
        }
    }

    pub fn settings(&self) -> &PayrollSettings {
        &self.settings
    }

    /// Computes pay for every instructor with at least one class in the
    /// period. Row-level failures are recorded in the report and the batch
    /// continues; only the initial class lookup aborts the run.
    pub fn run_period(
        &self,
        period: &PayPeriod,
        ladders: &BTreeMap<DisciplineId, CategoryLadder>,
    ) -> Result<PayrollRunReport, StoreError> {
        let classes = self.classes.query(&ClassQuery::period(&period.id))?;

        let mut by_instructor: BTreeMap<InstructorId, Vec<ClassRecord>> = BTreeMap::new();
        for class in classes {
            by_instructor
                .entry(class.instructor.clone())
                .or_default()
                .push(class);
        }

        let mut report = PayrollRunReport::new(period.id.clone());
        for (instructor_id, their_classes) in by_instructor {
            self.assemble_instructor(&instructor_id, &their_classes, period, ladders, &mut report);
        }

        info!(
            period = %period.id.0,
            processed = report.processed,
            skipped = report.skipped,
            errors = report.error_count,
            "payroll run finished"
        );
        Ok(report)
    }

    fn assemble_instructor(
        &self,
        instructor_id: &InstructorId,
        classes: &[ClassRecord],
        period: &PayPeriod,
        ladders: &BTreeMap<DisciplineId, CategoryLadder>,
        report: &mut PayrollRunReport,
    ) {
        let existing = match self.payments.get(instructor_id, &period.id) {
            Ok(existing) => existing,
            Err(err) => {
                report.push_error(
                    RunScope::Instructor {
                        instructor: instructor_id.clone(),
                    },
                    err.to_string(),
                );
                return;
            }
        };

        // An approved record is frozen: recomputation is a reported no-op.
        if let Some(approved) = existing.as_ref().filter(|record| record.is_approved()) {
            report.skipped += 1;
            report
                .payments
                .push(PaymentSummaryView::from_record(approved, true));
            return;
        }

        let mut instructor = match self.instructors.get(instructor_id) {
            Ok(Some(instructor)) => instructor,
            Ok(None) => {
                report.push_error(
                    RunScope::Instructor {
                        instructor: instructor_id.clone(),
                    },
                    "unknown instructor referenced by class records".to_string(),
                );
                return;
            }
            Err(err) => {
                report.push_error(
                    RunScope::Instructor {
                        instructor: instructor_id.clone(),
                    },
                    err.to_string(),
                );
                return;
            }
        };

        let overrides: CategoryOverrides = instructor
            .categories
            .iter()
            .filter(|assignment| assignment.manual && assignment.period == period.id)
            .map(|assignment| {
                (
                    (assignment.instructor.clone(), assignment.discipline.clone()),
                    assignment.clone(),
                )
            })
            .collect();

        let full_house_classes: BTreeSet<ClassId> = instructor
            .covers
            .iter()
            .filter(|cover| cover.period == period.id && cover.full_house_eligible)
            .map(|cover| cover.class_id.clone())
            .collect();

        let mut by_discipline: BTreeMap<DisciplineId, Vec<&ClassRecord>> = BTreeMap::new();
        for class in classes {
            by_discipline
                .entry(class.discipline.clone())
                .or_default()
                .push(class);
        }

        let mut base_amount = 0.0;
        let mut per_class: Vec<ClassPayDetail> = Vec::new();

        for (discipline, discipline_classes) in by_discipline {
            let stored = match self.formulas.get(&discipline, &period.id) {
                Ok(Some(stored)) => stored,
                Ok(None) => {
                    report.push_error(
                        RunScope::Discipline {
                            instructor: instructor_id.clone(),
                            discipline: discipline.clone(),
                        },
                        "no formula configured for this discipline and period".to_string(),
                    );
                    continue;
                }
                Err(err) => {
                    report.push_error(
                        RunScope::Discipline {
                            instructor: instructor_id.clone(),
                            discipline: discipline.clone(),
                        },
                        err.to_string(),
                    );
                    continue;
                }
            };

            // A malformed formula aborts only this discipline's evaluation.
            if let Err(err) = stored.graph.validate() {
                report.push_error(
                    RunScope::Discipline {
                        instructor: instructor_id.clone(),
                        discipline: discipline.clone(),
                    },
                    format!("invalid formula: {err}"),
                );
                continue;
            }

            let Some(ladder) = ladders.get(&discipline) else {
                report.push_error(
                    RunScope::Discipline {
                        instructor: instructor_id.clone(),
                        discipline: discipline.clone(),
                    },
                    "no tier ladder configured for this discipline".to_string(),
                );
                continue;
            };

            let metrics = compute_metrics(classes, &discipline, &instructor, &self.settings);
            let assignment = determine_category(
                instructor_id,
                &discipline,
                &period.id,
                ladder,
                &metrics,
                &overrides,
            );
            upsert_assignment(&mut instructor, assignment.clone());

            let mut shared_inputs: BTreeMap<InputKey, f64> = BTreeMap::new();
            shared_inputs.insert(InputKey::Occupancy, metrics.occupancy);
            shared_inputs.insert(InputKey::ClassesPerWeek, metrics.classes_per_week);
            shared_inputs.insert(InputKey::VenueCount, f64::from(metrics.venue_count));
            shared_inputs.insert(InputKey::BackToBackCount, metrics.back_to_back_count);
            shared_inputs.insert(InputKey::OffPeakCount, metrics.off_peak_count);
            shared_inputs.insert(InputKey::TierLevel, f64::from(assignment.level));

            for class in discipline_classes {
                let effective =
                    EffectiveClass::from_record(class, full_house_classes.contains(&class.id));

                let mut inputs = shared_inputs.clone();
                inputs.insert(InputKey::Reservations, f64::from(effective.reservations));
                inputs.insert(InputKey::Capacity, f64::from(effective.capacity));
                inputs.insert(
                    InputKey::PaidReservations,
                    f64::from(effective.paid_reservations),
                );
                inputs.insert(InputKey::Waitlist, f64::from(class.waitlist));
                inputs.insert(InputKey::CourtesySeats, f64::from(class.courtesy_seats));

                match evaluate(&stored.graph, &inputs) {
                    Ok(evaluation) => {
                        let share = evaluation.value / f64::from(effective.share);
                        base_amount += share;
                        per_class.push(ClassPayDetail {
                            class_id: class.id.clone(),
                            discipline: discipline.clone(),
                            amount: round_cents(share),
                            shared: effective.share > 1,
                            trace: evaluation.trace,
                            note: None,
                        });
                    }
                    // Evaluation failures zero this class and move on.
                    Err(err) => {
                        report.push_error(
                            RunScope::Class {
                                class: class.id.clone(),
                            },
                            err.to_string(),
                        );
                        per_class.push(ClassPayDetail {
                            class_id: class.id.clone(),
                            discipline: discipline.clone(),
                            amount: 0.0,
                            shared: effective.share > 1,
                            trace: Vec::new(),
                            note: Some(err.to_string()),
                        });
                    }
                }
            }
        }

        if let Err(err) = self.instructors.update(instructor.clone()) {
            report.push_error(
                RunScope::Instructor {
                    instructor: instructor_id.clone(),
                },
                format!("could not persist category assignments: {err}"),
            );
        }

        let scoped_penalties: Vec<Penalty> = instructor
            .penalties
            .iter()
            .filter(|penalty| penalty.active && period.contains(penalty.applied_at))
            .cloned()
            .collect();
        let assessment = penalty::assess(classes.len(), &scoped_penalties);

        let eligible_covers = instructor
            .covers
            .iter()
            .filter(|cover| cover.period == period.id && cover.bonus_eligible)
            .count();
        let cover_pay = eligible_covers as f64 * self.settings.cover_rate;

        // Manual corrections live on the pending record and survive reruns.
        let adjustment = existing.as_ref().and_then(|record| record.adjustment);
        let bonus = existing.as_ref().map(|record| record.bonus).unwrap_or(0.0);
        let adjustment_amount = adjustment
            .map(|adjustment| adjustment.amount_against(base_amount))
            .unwrap_or(0.0);

        let subtotal = base_amount + adjustment_amount + bonus + cover_pay;
        let penalty_amount = subtotal * assessment.discount_percent / 100.0;
        let after_penalty = subtotal - penalty_amount;
        let retention = after_penalty * self.settings.retention_rate;
        let final_pay = after_penalty - retention;

        let record = PaymentRecord {
            instructor: instructor_id.clone(),
            period: period.id.clone(),
            base_amount: round_cents(base_amount),
            adjustment,
            bonus,
            cover_pay: round_cents(cover_pay),
            penalty_amount: round_cents(penalty_amount),
            retention: round_cents(retention),
            final_pay: round_cents(final_pay),
            per_class,
            status: PaymentStatus::Pending,
        };

        let write = match existing {
            Some(_) => self.payments.update(record.clone()),
            None => self.payments.create(record.clone()),
        };
        if let Err(err) = write {
            report.push_error(
                RunScope::Instructor {
                    instructor: instructor_id.clone(),
                },
                format!("could not persist payment record: {err}"),
            );
            return;
        }

        report.processed += 1;
        report
            .payments
            .push(PaymentSummaryView::from_record(&record, false));
    }
}

/// Class figures after the full-house override and paired-share scaling.
struct EffectiveClass {
    reservations: u32,
    capacity: u32,
    paid_reservations: u32,
    /// Number of instructors splitting this class, `1` for a solo class.
    share: u32,
}

impl EffectiveClass {
    fn from_record(class: &ClassRecord, cover_full_house: bool) -> Self {
        let mut reservations = class.reservations_total;
        if class.full_house_override || cover_full_house {
            reservations = class.capacity;
        }

        let share = class
            .paired_multiplier
            .filter(|multiplier| *multiplier > 1)
            .unwrap_or(1);

        Self {
            reservations: reservations * share,
            capacity: class.capacity * share,
            paid_reservations: class.paid_reservations * share,
            share,
        }
    }
}

fn upsert_assignment(instructor: &mut Instructor, assignment: CategoryAssignment) {
    if let Some(slot) = instructor.categories.iter_mut().find(|existing| {
        existing.discipline == assignment.discipline && existing.period == assignment.period
    }) {
        // Manual assignments are sticky and never overwritten automatically.
        if !slot.manual {
            *slot = assignment;
        }
    } else {
        instructor.categories.push(assignment);
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

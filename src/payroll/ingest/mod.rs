//! Spreadsheet ingestion for studio schedule exports.
//!
//! Rows are validated syntactically, instructor fields are normalized and
//! split on the reserved pairing token when two names share a class, and the
//! resulting class records land in the class store. Row-level problems are
//! collected into the import report; only infrastructure failures abort.

mod normalizer;
mod parser;

pub(crate) use normalizer::normalize_name;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{
    ClassId, ClassRecord, DisciplineId, Instructor, InstructorId, PayPeriod, PeriodId,
};
use super::repository::{ClassQuery, ClassStore, InstructorStore, StoreError};
use super::settings::PayrollSettings;
use normalizer::{contains_pairing_token, parse_instructor_field, NameParse};
use parser::{ParsedRow, RowOutcome};

#[derive(Debug)]
pub enum ScheduleImportError {
    Io(std::io::Error),
    Store(StoreError),
}

impl std::fmt::Display for ScheduleImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleImportError::Io(err) => write!(f, "failed to read schedule export: {}", err),
            ScheduleImportError::Store(err) => {
                write!(f, "could not persist schedule data: {}", err)
            }
        }
    }
}

impl std::error::Error for ScheduleImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScheduleImportError::Io(err) => Some(err),
            ScheduleImportError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ScheduleImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<StoreError> for ScheduleImportError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Raised when a name carrying the pairing token is used as a single
/// instructor identity.
#[derive(Debug, thiserror::Error)]
#[error("instructor name '{name}' contains the reserved pairing token '{token}'")]
pub struct ReservedNameError {
    pub name: String,
    pub token: String,
}

/// Rejects instructor identities that embed the pairing token.
pub fn ensure_single_identity(name: &str, token: &str) -> Result<(), ReservedNameError> {
    if contains_pairing_token(name, token) {
        return Err(ReservedNameError {
            name: name.to_string(),
            token: token.to_string(),
        });
    }
    Ok(())
}

/// Which halves of a paired class to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairKeep {
    pub first: bool,
    pub second: bool,
}

impl Default for PairKeep {
    fn default() -> Self {
        Self {
            first: true,
            second: true,
        }
    }
}

/// Import behavior switches.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Delete previously ingested classes for every (period, week) slice the
    /// export touches before inserting, enabling clean re-imports.
    pub replace_weeks: bool,
    /// Keep-flags per paired instructor field, keyed by its normalized form.
    pub keep_flags: BTreeMap<String, PairKeep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowError {
    pub row: u64,
    pub message: String,
}

/// Batch outcome of one schedule import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub period: PeriodId,
    pub rows: u32,
    pub classes_created: u32,
    pub instructors_created: u32,
    pub skipped_rows: u32,
    pub errors: Vec<ImportRowError>,
}

static CLASS_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static INSTRUCTOR_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_class_id() -> ClassId {
    let id = CLASS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ClassId(format!("class-{id:06}"))
}

fn next_instructor_id() -> InstructorId {
    let id = INSTRUCTOR_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InstructorId(format!("inst-{id:06}"))
}

/// Imports schedule exports into the class and instructor stores.
pub struct ScheduleImporter<I, C> {
    instructors: Arc<I>,
    classes: Arc<C>,
    settings: PayrollSettings,
}

impl<I, C> ScheduleImporter<I, C>
where
    I: InstructorStore,
    C: ClassStore,
{
    pub fn new(instructors: Arc<I>, classes: Arc<C>, settings: PayrollSettings) -> Self {
        Self {
            instructors,
            classes,
            settings,
        }
    }

    pub fn from_path<P: AsRef<Path>>(
        &self,
        path: P,
        period: &PayPeriod,
        options: &ImportOptions,
    ) -> Result<ImportReport, ScheduleImportError> {
        let file = std::fs::File::open(path)?;
        self.from_reader(file, period, options)
    }

    pub fn from_reader<R: Read>(
        &self,
        reader: R,
        period: &PayPeriod,
        options: &ImportOptions,
    ) -> Result<ImportReport, ScheduleImportError> {
        let outcomes = parser::parse_rows(reader);

        let mut report = ImportReport {
            period: period.id.clone(),
            rows: outcomes.len() as u32,
            classes_created: 0,
            instructors_created: 0,
            skipped_rows: 0,
            errors: Vec::new(),
        };

        if options.replace_weeks {
            self.clear_touched_weeks(&outcomes, period)?;
        }

        for outcome in outcomes {
            match outcome {
                RowOutcome::Invalid { row, message } => {
                    report.skipped_rows += 1;
                    report.errors.push(ImportRowError { row, message });
                }
                RowOutcome::Parsed(row) => self.apply_row(row, period, options, &mut report)?,
            }
        }

        Ok(report)
    }

    fn clear_touched_weeks(
        &self,
        outcomes: &[RowOutcome],
        period: &PayPeriod,
    ) -> Result<(), ScheduleImportError> {
        let weeks: BTreeSet<u32> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                RowOutcome::Parsed(row) => Some(period.week_of(row.date)),
                RowOutcome::Invalid { .. } => None,
            })
            .collect();

        for week in weeks {
            let existing = self.classes.query(&ClassQuery {
                period: period.id.clone(),
                week: Some(week),
                instructor: None,
            })?;
            for record in existing {
                self.classes.delete(&record.id)?;
            }
        }
        Ok(())
    }

    fn apply_row(
        &self,
        row: ParsedRow,
        period: &PayPeriod,
        options: &ImportOptions,
        report: &mut ImportReport,
    ) -> Result<(), ScheduleImportError> {
        let discipline = DisciplineId(normalize_name(&row.discipline_raw));
        if !self.settings.knows_discipline(&discipline) {
            report.skipped_rows += 1;
            report.errors.push(ImportRowError {
                row: row.row,
                message: format!("unknown discipline '{}'", row.discipline_raw.trim()),
            });
            return Ok(());
        }

        match parse_instructor_field(&row.instructor_raw, &self.settings.pairing_token) {
            NameParse::Single(name) => {
                if let Err(err) = ensure_single_identity(&name, &self.settings.pairing_token) {
                    report.skipped_rows += 1;
                    report.errors.push(ImportRowError {
                        row: row.row,
                        message: err.to_string(),
                    });
                    return Ok(());
                }

                let Some(instructor) = self.instructor_for(&name, &discipline, row.row, report)?
                else {
                    report.skipped_rows += 1;
                    return Ok(());
                };
                self.create_class(&row, period, &discipline, &instructor.id, None, report)?;
            }
            NameParse::Paired { first, second } => {
                let keep = options
                    .keep_flags
                    .get(&normalize_name(&row.instructor_raw))
                    .copied()
                    .unwrap_or_default();

                for (kept, name) in [(keep.first, first), (keep.second, second)] {
                    if !kept {
                        continue;
                    }
                    let Some(instructor) =
                        self.instructor_for(&name, &discipline, row.row, report)?
                    else {
                        continue;
                    };
                    self.create_class(
                        &row,
                        period,
                        &discipline,
                        &instructor.id,
                        Some(2),
                        report,
                    )?;
                }
            }
        }

        Ok(())
    }

    fn create_class(
        &self,
        row: &ParsedRow,
        period: &PayPeriod,
        discipline: &DisciplineId,
        instructor: &InstructorId,
        paired_multiplier: Option<u32>,
        report: &mut ImportReport,
    ) -> Result<(), ScheduleImportError> {
        let shared = paired_multiplier.is_some();
        let record = ClassRecord {
            id: next_class_id(),
            instructor: instructor.clone(),
            discipline: discipline.clone(),
            period: period.id.clone(),
            week: period.week_of(row.date),
            venue: row.venue.clone(),
            city: row.city.clone(),
            country: row.country.clone(),
            date: row.date,
            starts_at: row.starts_at,
            reservations_total: if shared {
                ceil_half(row.reservations_total)
            } else {
                row.reservations_total
            },
            waitlist: row.waitlist,
            courtesy_seats: row.courtesy_seats,
            capacity: if shared {
                ceil_half(row.capacity)
            } else {
                row.capacity
            },
            paid_reservations: if shared {
                ceil_half(row.paid_reservations)
            } else {
                row.paid_reservations
            },
            paired_multiplier,
            full_house_override: false,
        };

        match self.classes.create(record) {
            Ok(_) => {
                report.classes_created += 1;
                Ok(())
            }
            Err(StoreError::Conflict) => {
                report.errors.push(ImportRowError {
                    row: row.row,
                    message: "class record already exists".to_string(),
                });
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Looks up an instructor by normalized name, creating it on first
    /// sight and appending newly seen disciplines.
    fn instructor_for(
        &self,
        name: &str,
        discipline: &DisciplineId,
        row: u64,
        report: &mut ImportReport,
    ) -> Result<Option<Instructor>, ScheduleImportError> {
        let normalized = normalize_name(name);

        if let Some(mut existing) = self.instructors.get_by_name(&normalized)? {
            if !existing.disciplines.contains(discipline) {
                existing.disciplines.push(discipline.clone());
                self.instructors.update(existing.clone())?;
            }
            return Ok(Some(existing));
        }

        let candidate = Instructor {
            id: next_instructor_id(),
            name: name.to_string(),
            disciplines: vec![discipline.clone()],
            penalties: Vec::new(),
            covers: Vec::new(),
            categories: Vec::new(),
            event_participation: false,
            guideline_compliance: true,
        };

        match self.instructors.create(candidate) {
            Ok(created) => {
                report.instructors_created += 1;
                Ok(Some(created))
            }
            // Lost a race with a concurrent import of the same name.
            Err(StoreError::Conflict) => match self.instructors.get_by_name(&normalized)? {
                Some(existing) => Ok(Some(existing)),
                None => {
                    report.errors.push(ImportRowError {
                        row,
                        message: format!("duplicate instructor name '{name}'"),
                    });
                    Ok(None)
                }
            },
            Err(other) => Err(other.into()),
        }
    }
}

fn ceil_half(value: u32) -> u32 {
    value / 2 + value % 2
}

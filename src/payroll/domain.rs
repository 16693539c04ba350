use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::formula::TraceStep;

/// Identifier wrapper for instructors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstructorId(pub String);

/// Identifier wrapper for disciplines (normalized discipline name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisciplineId(pub String);

/// Identifier wrapper for pay periods.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodId(pub String);

/// Identifier wrapper for class records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub String);

/// Calendar window for one pay period, used to scope penalties and derive
/// week indexes at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    pub id: PeriodId,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

impl PayPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.starts_on && date <= self.ends_on
    }

    /// 1-based week index of `date` within the period. Dates before the
    /// period start fall into week 1.
    pub fn week_of(&self, date: NaiveDate) -> u32 {
        let days = (date - self.starts_on).num_days().max(0);
        (days / 7) as u32 + 1
    }
}

/// One taught class as ingested from the studio schedule export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: ClassId,
    pub instructor: InstructorId,
    pub discipline: DisciplineId,
    pub period: PeriodId,
    pub week: u32,
    pub venue: String,
    pub city: String,
    pub country: String,
    pub date: NaiveDate,
    pub starts_at: NaiveTime,
    pub reservations_total: u32,
    pub waitlist: u32,
    pub courtesy_seats: u32,
    pub capacity: u32,
    pub paid_reservations: u32,
    /// Share count for a jointly taught class; `None` for a solo class.
    pub paired_multiplier: Option<u32>,
    pub full_house_override: bool,
}

impl ClassRecord {
    pub fn starts_at_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.starts_at)
    }

    /// "HH:MM" start-time key used by the off-peak schedule table.
    pub fn start_slot(&self) -> String {
        self.starts_at.format("%H:%M").to_string()
    }
}

/// Disciplinary mark accumulated against an instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub points: u32,
    pub kind: PenaltyKind,
    pub description: String,
    pub discipline: Option<DisciplineId>,
    pub applied_at: NaiveDate,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    NoShow,
    LateCancellation,
    GuidelineBreach,
    EquipmentDamage,
}

impl PenaltyKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoShow => "No Show",
            Self::LateCancellation => "Late Cancellation",
            Self::GuidelineBreach => "Guideline Breach",
            Self::EquipmentDamage => "Equipment Damage",
        }
    }
}

/// Substitute-teaching event eligible for a fixed bonus payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    pub class_id: ClassId,
    pub period: PeriodId,
    pub bonus_eligible: bool,
    pub full_house_eligible: bool,
}

/// Manual correction applied on top of the computed class pay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Adjustment {
    Fixed(f64),
    Percent(f64),
}

impl Adjustment {
    /// Monetary amount this adjustment contributes given the computed base.
    pub fn amount_against(&self, base_amount: f64) -> f64 {
        match self {
            Adjustment::Fixed(amount) => *amount,
            Adjustment::Percent(percent) => base_amount * percent / 100.0,
        }
    }
}

/// Aggregate activity metrics for one instructor, one discipline, one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructorMetrics {
    pub occupancy: f64,
    pub classes_per_week: f64,
    pub venue_count: u32,
    pub back_to_back_count: f64,
    pub off_peak_count: f64,
    pub event_participation: bool,
    pub guideline_compliance: bool,
}

/// Performance tier assigned to (instructor, discipline, period). Manual
/// assignments survive automatic recomputation untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssignment {
    pub instructor: InstructorId,
    pub discipline: DisciplineId,
    pub period: PeriodId,
    pub tier: String,
    pub level: u8,
    pub metrics: InstructorMetrics,
    pub manual: bool,
}

/// Instructor master record as served by the instructor store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: InstructorId,
    pub name: String,
    pub disciplines: Vec<DisciplineId>,
    pub penalties: Vec<Penalty>,
    pub covers: Vec<Cover>,
    pub categories: Vec<CategoryAssignment>,
    pub event_participation: bool,
    pub guideline_compliance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}

/// Per-class contribution to a payment, retained for audit display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPayDetail {
    pub class_id: ClassId,
    pub discipline: DisciplineId,
    pub amount: f64,
    /// True when the amount is this instructor's share of a paired class.
    pub shared: bool,
    pub trace: Vec<TraceStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Computed pay for one instructor in one period. Mutable while `Pending`,
/// frozen once `Approved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub instructor: InstructorId,
    pub period: PeriodId,
    pub base_amount: f64,
    pub adjustment: Option<Adjustment>,
    pub bonus: f64,
    pub cover_pay: f64,
    pub penalty_amount: f64,
    pub retention: f64,
    pub final_pay: f64,
    pub per_class: Vec<ClassPayDetail>,
    pub status: PaymentStatus,
}

impl PaymentRecord {
    pub fn is_approved(&self) -> bool {
        self.status == PaymentStatus::Approved
    }
}

use serde::{Deserialize, Serialize};

use super::domain::{
    ClassId, ClassRecord, DisciplineId, Instructor, InstructorId, PaymentRecord, PeriodId,
};
use super::formula::StoredFormula;

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Filter for class lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassQuery {
    pub period: PeriodId,
    pub week: Option<u32>,
    pub instructor: Option<InstructorId>,
}

impl ClassQuery {
    pub fn period(period: &PeriodId) -> Self {
        Self {
            period: period.clone(),
            week: None,
            instructor: None,
        }
    }

    pub fn matches(&self, record: &ClassRecord) -> bool {
        record.period == self.period
            && self.week.map_or(true, |week| record.week == week)
            && self
                .instructor
                .as_ref()
                .map_or(true, |instructor| &record.instructor == instructor)
    }
}

/// Page selector for payment listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: 50,
        }
    }
}

impl Page {
    pub fn offset(&self) -> usize {
        self.number.saturating_sub(1) * self.size
    }
}

/// Storage abstraction for authored formulas, one per (discipline, period).
pub trait FormulaStore: Send + Sync {
    fn get(
        &self,
        discipline: &DisciplineId,
        period: &PeriodId,
    ) -> Result<Option<StoredFormula>, StoreError>;
    fn list(&self, period: &PeriodId) -> Result<Vec<StoredFormula>, StoreError>;
    fn create(&self, stored: StoredFormula) -> Result<(), StoreError>;
    /// Copies every formula of one period into another, returning the number
    /// copied. Existing (discipline, period) targets are left untouched.
    fn duplicate(&self, from: &PeriodId, to: &PeriodId) -> Result<u32, StoreError>;
}

/// Storage abstraction for ingested class records.
pub trait ClassStore: Send + Sync {
    fn query(&self, query: &ClassQuery) -> Result<Vec<ClassRecord>, StoreError>;
    fn create(&self, record: ClassRecord) -> Result<ClassRecord, StoreError>;
    fn delete(&self, id: &ClassId) -> Result<(), StoreError>;
}

/// Storage abstraction for instructor master records.
pub trait InstructorStore: Send + Sync {
    fn get(&self, id: &InstructorId) -> Result<Option<Instructor>, StoreError>;
    /// Lookup by normalized display name, used by ingestion to reuse
    /// identities across imports.
    fn get_by_name(&self, normalized: &str) -> Result<Option<Instructor>, StoreError>;
    fn create(&self, instructor: Instructor) -> Result<Instructor, StoreError>;
    fn update(&self, instructor: Instructor) -> Result<(), StoreError>;
}

/// Storage abstraction for payment records.
pub trait PaymentStore: Send + Sync {
    fn get(
        &self,
        instructor: &InstructorId,
        period: &PeriodId,
    ) -> Result<Option<PaymentRecord>, StoreError>;
    fn list(&self, period: &PeriodId, page: Page) -> Result<Vec<PaymentRecord>, StoreError>;
    fn create(&self, record: PaymentRecord) -> Result<(), StoreError>;
    fn update(&self, record: PaymentRecord) -> Result<(), StoreError>;
}

//! In-memory store adapters backing the demo CLI, the HTTP service default
//! wiring, and tests. Production deployments substitute database-backed
//! implementations of the same traits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    ClassId, ClassRecord, DisciplineId, Instructor, InstructorId, PaymentRecord, PeriodId,
};
use super::formula::StoredFormula;
use super::ingest::normalize_name;
use super::repository::{
    ClassQuery, ClassStore, FormulaStore, InstructorStore, Page, PaymentStore, StoreError,
};

#[derive(Default, Clone)]
pub struct MemoryFormulaStore {
    formulas: Arc<Mutex<HashMap<(DisciplineId, PeriodId), StoredFormula>>>,
}

impl FormulaStore for MemoryFormulaStore {
    fn get(
        &self,
        discipline: &DisciplineId,
        period: &PeriodId,
    ) -> Result<Option<StoredFormula>, StoreError> {
        let guard = self.formulas.lock().expect("formula mutex poisoned");
        Ok(guard.get(&(discipline.clone(), period.clone())).cloned())
    }

    fn list(&self, period: &PeriodId) -> Result<Vec<StoredFormula>, StoreError> {
        let guard = self.formulas.lock().expect("formula mutex poisoned");
        let mut formulas: Vec<StoredFormula> = guard
            .values()
            .filter(|stored| &stored.period == period)
            .cloned()
            .collect();
        formulas.sort_by(|a, b| a.discipline.cmp(&b.discipline));
        Ok(formulas)
    }

    fn create(&self, stored: StoredFormula) -> Result<(), StoreError> {
        let mut guard = self.formulas.lock().expect("formula mutex poisoned");
        let key = (stored.discipline.clone(), stored.period.clone());
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        guard.insert(key, stored);
        Ok(())
    }

    fn duplicate(&self, from: &PeriodId, to: &PeriodId) -> Result<u32, StoreError> {
        let mut guard = self.formulas.lock().expect("formula mutex poisoned");
        let sources: Vec<StoredFormula> = guard
            .values()
            .filter(|stored| &stored.period == from)
            .cloned()
            .collect();

        let mut copied = 0;
        for source in sources {
            let key = (source.discipline.clone(), to.clone());
            if guard.contains_key(&key) {
                continue;
            }
            guard.insert(
                key,
                StoredFormula {
                    discipline: source.discipline,
                    period: to.clone(),
                    graph: source.graph,
                },
            );
            copied += 1;
        }
        Ok(copied)
    }
}

#[derive(Default, Clone)]
pub struct MemoryClassStore {
    classes: Arc<Mutex<HashMap<ClassId, ClassRecord>>>,
}

impl ClassStore for MemoryClassStore {
    fn query(&self, query: &ClassQuery) -> Result<Vec<ClassRecord>, StoreError> {
        let guard = self.classes.lock().expect("class mutex poisoned");
        let mut records: Vec<ClassRecord> = guard
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.starts_at_datetime()
                .cmp(&b.starts_at_datetime())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    fn create(&self, record: ClassRecord) -> Result<ClassRecord, StoreError> {
        let mut guard = self.classes.lock().expect("class mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn delete(&self, id: &ClassId) -> Result<(), StoreError> {
        let mut guard = self.classes.lock().expect("class mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[derive(Default, Clone)]
pub struct MemoryInstructorStore {
    instructors: Arc<Mutex<HashMap<InstructorId, Instructor>>>,
}

impl InstructorStore for MemoryInstructorStore {
    fn get(&self, id: &InstructorId) -> Result<Option<Instructor>, StoreError> {
        let guard = self.instructors.lock().expect("instructor mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn get_by_name(&self, normalized: &str) -> Result<Option<Instructor>, StoreError> {
        let guard = self.instructors.lock().expect("instructor mutex poisoned");
        Ok(guard
            .values()
            .find(|instructor| normalize_name(&instructor.name) == normalized)
            .cloned())
    }

    fn create(&self, instructor: Instructor) -> Result<Instructor, StoreError> {
        let mut guard = self.instructors.lock().expect("instructor mutex poisoned");
        let normalized = normalize_name(&instructor.name);
        if guard
            .values()
            .any(|existing| normalize_name(&existing.name) == normalized)
        {
            return Err(StoreError::Conflict);
        }
        guard.insert(instructor.id.clone(), instructor.clone());
        Ok(instructor)
    }

    fn update(&self, instructor: Instructor) -> Result<(), StoreError> {
        let mut guard = self.instructors.lock().expect("instructor mutex poisoned");
        if !guard.contains_key(&instructor.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(instructor.id.clone(), instructor);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryPaymentStore {
    payments: Arc<Mutex<HashMap<(InstructorId, PeriodId), PaymentRecord>>>,
}

impl PaymentStore for MemoryPaymentStore {
    fn get(
        &self,
        instructor: &InstructorId,
        period: &PeriodId,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let guard = self.payments.lock().expect("payment mutex poisoned");
        Ok(guard.get(&(instructor.clone(), period.clone())).cloned())
    }

    fn list(&self, period: &PeriodId, page: Page) -> Result<Vec<PaymentRecord>, StoreError> {
        let guard = self.payments.lock().expect("payment mutex poisoned");
        let mut records: Vec<PaymentRecord> = guard
            .values()
            .filter(|record| &record.period == period)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.instructor.cmp(&b.instructor));
        Ok(records
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .collect())
    }

    fn create(&self, record: PaymentRecord) -> Result<(), StoreError> {
        let mut guard = self.payments.lock().expect("payment mutex poisoned");
        let key = (record.instructor.clone(), record.period.clone());
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        guard.insert(key, record);
        Ok(())
    }

    fn update(&self, record: PaymentRecord) -> Result<(), StoreError> {
        let mut guard = self.payments.lock().expect("payment mutex poisoned");
        let key = (record.instructor.clone(), record.period.clone());
        if !guard.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        guard.insert(key, record);
        Ok(())
    }
}

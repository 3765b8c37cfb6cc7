//! In-process ingestion store
//!
//! Enforces the same primary key and foreign key rules as the database
//! schema. Used by tests and when the server runs with `DATABASE_SKIP=true`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use hire_common::types::{Department, HiredEmployee, Job, Record, TableKind};

use super::{IngestStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    departments: BTreeMap<i32, Department>,
    jobs: BTreeMap<i32, Job>,
    hired_employees: BTreeMap<i32, HiredEmployee>,
}

impl Tables {
    fn contains(&self, kind: TableKind, id: i32) -> bool {
        match kind {
            TableKind::Departments => self.departments.contains_key(&id),
            TableKind::Jobs => self.jobs.contains_key(&id),
            TableKind::HiredEmployees => self.hired_employees.contains_key(&id),
        }
    }

    fn len(&self, kind: TableKind) -> usize {
        match kind {
            TableKind::Departments => self.departments.len(),
            TableKind::Jobs => self.jobs.len(),
            TableKind::HiredEmployees => self.hired_employees.len(),
        }
    }

    /// All key checks run before the single map insert, so a rejected
    /// record leaves every table untouched
    fn insert(&mut self, record: &Record) -> Result<(), StoreError> {
        let kind = record.kind();
        if self.contains(kind, record.id()) {
            return Err(StoreError::UniqueViolation(format!(
                "Key (id)=({}) already exists in {}",
                record.id(),
                kind
            )));
        }

        match record {
            Record::Department(d) => {
                self.departments.insert(d.id, d.clone());
            },
            Record::Job(j) => {
                self.jobs.insert(j.id, j.clone());
            },
            Record::HiredEmployee(e) => {
                if !self.departments.contains_key(&e.department_id) {
                    return Err(StoreError::ForeignKeyViolation(format!(
                        "Key (department_id)=({}) is not present in table \"departments\"",
                        e.department_id
                    )));
                }
                if !self.jobs.contains_key(&e.job_id) {
                    return Err(StoreError::ForeignKeyViolation(format!(
                        "Key (job_id)=({}) is not present in table \"jobs\"",
                        e.job_id
                    )));
                }
                self.hired_employees.insert(e.id, e.clone());
            },
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: Mutex<HashMap<(TableKind, i32), StoreError>>,
    unavailable: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert of `(kind, id)` fail with `error`
    pub fn fail_insert(&self, kind: TableKind, id: i32, error: StoreError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert((kind, id), error);
        }
    }

    /// Make every call fail as if the database were down; `None` restores it
    pub fn set_unavailable(&self, reason: Option<String>) {
        if let Ok(mut unavailable) = self.unavailable.lock() {
            *unavailable = reason;
        }
    }

    pub fn count(&self, kind: TableKind) -> usize {
        self.tables.lock().map(|t| t.len(kind)).unwrap_or(0)
    }

    pub fn contains(&self, kind: TableKind, id: i32) -> bool {
        self.tables.lock().map(|t| t.contains(kind, id)).unwrap_or(false)
    }

    pub fn department(&self, id: i32) -> Option<Department> {
        self.tables.lock().ok()?.departments.get(&id).cloned()
    }

    pub fn job(&self, id: i32) -> Option<Job> {
        self.tables.lock().ok()?.jobs.get(&id).cloned()
    }

    pub fn hired_employee(&self, id: i32) -> Option<HiredEmployee> {
        self.tables.lock().ok()?.hired_employees.get(&id).cloned()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        match self.unavailable.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(reason) => Err(StoreError::Unavailable(reason.clone())),
                None => Ok(()),
            },
            Err(_) => Err(StoreError::Unavailable("memory store lock poisoned".into())),
        }
    }

    fn lock_tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn injected_failure(&self, record: &Record) -> Option<StoreError> {
        self.failures
            .lock()
            .ok()?
            .get(&(record.kind(), record.id()))
            .cloned()
    }
}

#[async_trait]
impl IngestStore for MemoryStore {
    async fn existing_ids(&self, kind: TableKind, ids: &[i64]) -> Result<HashSet<i64>, StoreError> {
        self.check_available()?;
        let tables = self.lock_tables()?;

        Ok(ids
            .iter()
            .copied()
            .filter(|id| i32::try_from(*id).is_ok_and(|id| tables.contains(kind, id)))
            .collect())
    }

    async fn insert_record(&self, record: &Record) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(error) = self.injected_failure(record) {
            return Err(error);
        }

        self.lock_tables()?.insert(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn department(id: i32) -> Record {
        Record::Department(Department {
            id,
            name: format!("Dept {id}"),
        })
    }

    fn job(id: i32) -> Record {
        Record::Job(Job {
            id,
            title: format!("Job {id}"),
        })
    }

    fn employee(id: i32, department_id: i32, job_id: i32) -> Record {
        Record::HiredEmployee(HiredEmployee {
            id,
            name: "Ana".to_string(),
            hired_at: Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).unwrap(),
            department_id,
            job_id,
        })
    }

    #[tokio::test]
    async fn test_insert_and_existing_ids() {
        let store = MemoryStore::new();
        store.insert_record(&department(1)).await.unwrap();
        store.insert_record(&department(2)).await.unwrap();

        let existing = store
            .existing_ids(TableKind::Departments, &[1, 3, 2, i64::MAX])
            .await
            .unwrap();
        assert_eq!(existing, HashSet::from([1, 2]));
        assert_eq!(store.count(TableKind::Departments), 2);
    }

    #[tokio::test]
    async fn test_unique_violation() {
        let store = MemoryStore::new();
        store.insert_record(&job(5)).await.unwrap();

        let err = store.insert_record(&job(5)).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert_eq!(store.count(TableKind::Jobs), 1);
    }

    #[tokio::test]
    async fn test_foreign_key_violation_leaves_no_row() {
        let store = MemoryStore::new();
        store.insert_record(&department(1)).await.unwrap();

        let err = store.insert_record(&employee(10, 1, 7)).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
        assert!(err.to_string().contains("foreign key"));
        assert!(!store.contains(TableKind::HiredEmployees, 10));

        store.insert_record(&job(7)).await.unwrap();
        store.insert_record(&employee(10, 1, 7)).await.unwrap();
        assert!(store.hired_employee(10).is_some());
    }

    #[tokio::test]
    async fn test_rejected_inserts_leave_counts_unchanged() {
        let store = MemoryStore::new();
        for id in 1..=3 {
            store.insert_record(&department(id)).await.unwrap();
            store.insert_record(&job(id)).await.unwrap();
        }
        store.insert_record(&employee(1, 1, 1)).await.unwrap();

        let rejected = [
            employee(2, 9, 1),
            employee(3, 1, 9),
            employee(1, 2, 2),
            department(2),
            job(3),
        ];
        for record in &rejected {
            assert!(store.insert_record(record).await.is_err());
        }

        assert_eq!(store.count(TableKind::Departments), 3);
        assert_eq!(store.count(TableKind::Jobs), 3);
        assert_eq!(store.count(TableKind::HiredEmployees), 1);
        assert_eq!(store.hired_employee(1).unwrap().department_id, 1);
        assert_eq!(store.department(2).unwrap().name, "Dept 2");
    }

    #[tokio::test]
    async fn test_insert_into_large_table() {
        let store = MemoryStore::new();
        for id in 1..=20_000 {
            store.insert_record(&job(id)).await.unwrap();
        }

        let started = std::time::Instant::now();
        for id in 20_001..=22_000 {
            store.insert_record(&job(id)).await.unwrap();
        }
        let elapsed = started.elapsed();

        assert_eq!(store.count(TableKind::Jobs), 22_000);
        assert!(
            elapsed < std::time::Duration::from_secs(2),
            "2000 inserts into a 20k-row table took {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_injected_failure_and_outage() {
        let store = MemoryStore::new();
        store.fail_insert(TableKind::Jobs, 2, StoreError::Database("disk full".into()));

        assert!(store.insert_record(&job(1)).await.is_ok());
        assert!(matches!(
            store.insert_record(&job(2)).await,
            Err(StoreError::Database(_))
        ));

        store.set_unavailable(Some("connection refused".into()));
        assert!(matches!(
            store.existing_ids(TableKind::Jobs, &[1]).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_unavailable(None);
        assert!(store.job(1).is_some());
    }
}

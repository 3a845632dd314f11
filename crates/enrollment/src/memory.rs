//! An in-memory transactional store.
//!
//! Transactions are serializable: `begin` takes the store's async mutex and
//! holds it until the transaction is committed, rolled back or dropped. Writes
//! go to a working copy of the state that replaces the shared state only on
//! commit. Used by tests and local demos that run without PostgreSQL.

use crate::error::StoreError;
use crate::store::{EnrollmentStore, EnrollmentTransaction};
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Enrollment, NewEnrollment, Student, Subject};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A step at which the store should simulate a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertEnrollment,
    TakeSeat,
    Commit,
}

impl FailPoint {
    fn code(self) -> u8 {
        match self {
            FailPoint::InsertEnrollment => 1,
            FailPoint::TakeSeat => 2,
            FailPoint::Commit => 3,
        }
    }
}

/// A simulated backend error raised at a `FailPoint`.
#[derive(Debug, thiserror::Error)]
#[error("injected failure at {0:?}")]
pub struct InjectedFailure(pub FailPoint);

/// The full contents of the in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub students: BTreeMap<i32, Student>,
    pub subjects: BTreeMap<i32, Subject>,
    pub enrollments: BTreeMap<i32, Enrollment>,
    next_enrollment_id: i32,
}

impl MemoryState {
    fn find_pair(&self, student_profile_id: i32, subject_id: i32) -> Option<&Enrollment> {
        self.enrollments
            .values()
            .find(|e| e.student_profile_id == student_profile_id && e.subject_id == subject_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_point: Arc<AtomicU8>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_student(&self, student: Student) {
        self.state.lock().await.students.insert(student.id, student);
    }

    pub async fn insert_subject(&self, subject: Subject) {
        self.state.lock().await.subjects.insert(subject.id, subject);
    }

    pub async fn subject(&self, subject_id: i32) -> Option<Subject> {
        self.state.lock().await.subjects.get(&subject_id).cloned()
    }

    pub async fn enrollments(&self) -> Vec<Enrollment> {
        self.state.lock().await.enrollments.values().cloned().collect()
    }

    /// A consistent copy of everything in the store.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Makes every transaction begun from now on fail at `point`.
    /// Pass `None` to clear.
    pub fn set_fail_point(&self, point: Option<FailPoint>) {
        self.fail_point
            .store(point.map_or(0, FailPoint::code), Ordering::SeqCst);
    }

    fn current_fail_point(&self) -> Option<FailPoint> {
        match self.fail_point.load(Ordering::SeqCst) {
            1 => Some(FailPoint::InsertEnrollment),
            2 => Some(FailPoint::TakeSeat),
            3 => Some(FailPoint::Commit),
            _ => None,
        }
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_point: Option<FailPoint>,
}

impl MemoryTransaction {
    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.fail_point == Some(point) {
            return Err(StoreError::backend(InjectedFailure(point)));
        }
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction {
            guard,
            working,
            fail_point: self.current_fail_point(),
        })
    }
}

#[async_trait]
impl EnrollmentTransaction for MemoryTransaction {
    async fn find_student(&mut self, user_id: i32) -> Result<Option<Student>, StoreError> {
        Ok(self.working.students.get(&user_id).cloned())
    }

    async fn find_subject_for_update(
        &mut self,
        subject_id: i32,
    ) -> Result<Option<Subject>, StoreError> {
        // The whole store is already locked by this transaction.
        Ok(self.working.subjects.get(&subject_id).cloned())
    }

    async fn find_enrollment(
        &mut self,
        student_profile_id: i32,
        subject_id: i32,
    ) -> Result<Option<Enrollment>, StoreError> {
        Ok(self
            .working
            .find_pair(student_profile_id, subject_id)
            .cloned())
    }

    async fn insert_enrollment(&mut self, new: NewEnrollment) -> Result<Enrollment, StoreError> {
        self.check(FailPoint::InsertEnrollment)?;
        if self
            .working
            .find_pair(new.student_profile_id, new.subject_id)
            .is_some()
        {
            return Err(StoreError::UniqueViolation(format!(
                "enrollment ({}, {}) already exists",
                new.student_profile_id, new.subject_id
            )));
        }

        self.working.next_enrollment_id += 1;
        let enrollment = Enrollment {
            id: self.working.next_enrollment_id,
            student_profile_id: new.student_profile_id,
            subject_id: new.subject_id,
            status: new.status,
            created_at: Utc::now(),
        };
        self.working
            .enrollments
            .insert(enrollment.id, enrollment.clone());
        Ok(enrollment)
    }

    async fn take_seat(&mut self, subject_id: i32) -> Result<bool, StoreError> {
        self.check(FailPoint::TakeSeat)?;
        match self.working.subjects.get_mut(&subject_id) {
            Some(subject) if subject.capacity > 0 => {
                subject.capacity -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.check(FailPoint::Commit)?;
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{EnrollmentStatus, Role, UserStatus};

    fn subject(id: i32, capacity: i32) -> Subject {
        Subject {
            id,
            name: format!("Subject {}", id),
            capacity,
            career_id: None,
            teacher_id: None,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_publishes_nothing() {
        let store = InMemoryStore::new();
        store.insert_subject(subject(1, 2)).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_enrollment(NewEnrollment::enrolled(10, 1)).await.unwrap();
            assert!(tx.take_seat(1).await.unwrap());
        }

        assert!(store.enrollments().await.is_empty());
        assert_eq!(store.subject(1).await.unwrap().capacity, 2);
    }

    #[tokio::test]
    async fn commit_publishes_working_copy() {
        let store = InMemoryStore::new();
        store.insert_subject(subject(1, 1)).await;

        let mut tx = store.begin().await.unwrap();
        let created = tx.insert_enrollment(NewEnrollment::enrolled(10, 1)).await.unwrap();
        assert!(tx.take_seat(1).await.unwrap());
        tx.commit().await.unwrap();

        let enrollments = store.enrollments().await;
        assert_eq!(enrollments, vec![created]);
        assert_eq!(enrollments[0].status, EnrollmentStatus::Enrolled);
        assert_eq!(store.subject(1).await.unwrap().capacity, 0);
    }

    #[tokio::test]
    async fn take_seat_stops_at_zero() {
        let store = InMemoryStore::new();
        store.insert_subject(subject(1, 0)).await;

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.take_seat(1).await.unwrap());
        assert!(!tx.take_seat(99).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.subject(1).await.unwrap().capacity, 0);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_unique_violation() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_enrollment(NewEnrollment::enrolled(10, 1)).await.unwrap();
        let err = tx
            .insert_enrollment(NewEnrollment::enrolled(10, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn fail_point_applies_to_new_transactions() {
        let store = InMemoryStore::new();
        store
            .insert_student(Student {
                id: 1,
                profile_id: Some(10),
                name: "Grace".to_string(),
                email: "grace@example.edu".to_string(),
                role: Role::Student,
                status: UserStatus::Active,
                career_id: None,
            })
            .await;
        store.set_fail_point(Some(FailPoint::InsertEnrollment));

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_student(1).await.unwrap().is_some());
        let err = tx
            .insert_enrollment(NewEnrollment::enrolled(10, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        drop(tx);

        store.set_fail_point(None);
        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_enrollment(NewEnrollment::enrolled(10, 1)).await.is_ok());
    }
}

use crate::error::StoreError;
use async_trait::async_trait;
use core_types::{Enrollment, NewEnrollment, Student, Subject};

/// A store that can open atomic, multi-statement transactions.
///
/// Implementations must guarantee that writes made through a transaction are
/// either all published by `commit` or none of them are, including when the
/// transaction is dropped without being committed.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    type Tx: EnrollmentTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// The typed operations available inside one enrollment transaction.
#[async_trait]
pub trait EnrollmentTransaction: Send + Sized {
    /// Loads a user by id together with its student profile, if any.
    async fn find_student(&mut self, user_id: i32) -> Result<Option<Student>, StoreError>;

    /// Loads a subject and locks it until the transaction ends, so no
    /// concurrent transaction can change its capacity in the meantime.
    async fn find_subject_for_update(
        &mut self,
        subject_id: i32,
    ) -> Result<Option<Subject>, StoreError>;

    async fn find_enrollment(
        &mut self,
        student_profile_id: i32,
        subject_id: i32,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// Inserts an enrollment. A duplicate (profile, subject) pair is reported
    /// as `StoreError::UniqueViolation`.
    async fn insert_enrollment(&mut self, new: NewEnrollment) -> Result<Enrollment, StoreError>;

    /// Atomically decrements the subject's capacity if it is above zero.
    ///
    /// Returns `false`, leaving capacity untouched, when no seat was left.
    async fn take_seat(&mut self, subject_id: i32) -> Result<bool, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

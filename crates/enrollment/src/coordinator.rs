use crate::error::{EnrollmentError, StoreError};
use crate::store::{EnrollmentStore, EnrollmentTransaction};
use core_types::{Enrollment, NewEnrollment};

/// Enrolls students into subjects while keeping two invariants:
/// a subject's capacity never drops below zero, and a student profile is
/// enrolled in a given subject at most once.
///
/// The coordinator holds no state of its own. Every call opens a fresh
/// transaction on the store, and every check and write happens inside it.
#[derive(Debug, Clone)]
pub struct EnrollmentCoordinator<S> {
    store: S,
}

impl<S: EnrollmentStore> EnrollmentCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Enrolls the student identified by the user id `student_id` into `subject_id`.
    ///
    /// On success exactly one enrollment has been inserted and the subject's
    /// capacity has dropped by one. On any error the transaction is rolled
    /// back and nothing has changed.
    #[tracing::instrument(name = "enroll", skip(self))]
    pub async fn enroll(
        &self,
        student_id: i32,
        subject_id: i32,
    ) -> Result<Enrollment, EnrollmentError> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(EnrollmentError::internal("Failed to start the enrollment transaction"))?;

        match enroll_within(&mut tx, student_id, subject_id).await {
            Ok(enrollment) => {
                tx.commit()
                    .await
                    .map_err(EnrollmentError::internal("Failed to commit the enrollment"))?;
                tracing::info!(
                    enrollment_id = enrollment.id,
                    student_profile_id = enrollment.student_profile_id,
                    "Student enrolled."
                );
                Ok(enrollment)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = ?rollback_err, "Failed to roll back enrollment transaction.");
                }
                if err.is_internal() {
                    tracing::error!(error = ?err, "Enrollment failed.");
                } else {
                    tracing::warn!(reason = %err, "Enrollment rejected.");
                }
                Err(err)
            }
        }
    }
}

/// The checks and writes of one enrollment, in order. Must run inside `tx`.
async fn enroll_within<T: EnrollmentTransaction>(
    tx: &mut T,
    student_id: i32,
    subject_id: i32,
) -> Result<Enrollment, EnrollmentError> {
    // --- 1. Student must exist, be active, and hold a student profile ---
    let student = tx
        .find_student(student_id)
        .await
        .map_err(EnrollmentError::internal("Failed to load the student"))?;
    let profile_id = student
        .as_ref()
        .and_then(|s| s.enrollable_profile())
        .ok_or_else(|| {
            EnrollmentError::PreconditionFailed(format!(
                "Student {} not found or not active",
                student_id
            ))
        })?;

    // --- 2. Subject must exist (and is locked from here on) ---
    let subject = tx
        .find_subject_for_update(subject_id)
        .await
        .map_err(EnrollmentError::internal("Failed to load the subject"))?
        .ok_or_else(|| EnrollmentError::NotFound(format!("Subject {} not found", subject_id)))?;

    // --- 3. No duplicate enrollment ---
    // A repeated pair is a conflict even when the subject is already full.
    let existing = tx
        .find_enrollment(profile_id, subject_id)
        .await
        .map_err(EnrollmentError::internal("Failed to check for an existing enrollment"))?;
    if existing.is_some() {
        return Err(duplicate(student_id, subject_id));
    }

    // --- 4. Seats must remain ---
    if !subject.has_open_seats() {
        return Err(EnrollmentError::PreconditionFailed(format!(
            "Subject {} has no capacity left",
            subject_id
        )));
    }

    // --- 5. Insert ---
    let enrollment = tx
        .insert_enrollment(NewEnrollment::enrolled(profile_id, subject_id))
        .await
        .map_err(|e| match e {
            // A concurrent insert slipped past step 3; the constraint caught it.
            StoreError::UniqueViolation(_) => duplicate(student_id, subject_id),
            other => EnrollmentError::internal("Failed to create the enrollment")(other),
        })?;

    // --- 6. Take the seat ---
    let seat_taken = tx
        .take_seat(subject_id)
        .await
        .map_err(EnrollmentError::internal("Failed to update subject capacity"))?;
    if !seat_taken {
        return Err(EnrollmentError::PreconditionFailed(format!(
            "Subject {} has no capacity left",
            subject_id
        )));
    }

    Ok(enrollment)
}

fn duplicate(student_id: i32, subject_id: i32) -> EnrollmentError {
    EnrollmentError::Conflict(format!(
        "Student {} is already enrolled in subject {}",
        student_id, subject_id
    ))
}

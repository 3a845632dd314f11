use crate::error::store_error;
use async_trait::async_trait;
use core_types::{Enrollment, NewEnrollment, Student, Subject};
use enrollment::{EnrollmentStore, EnrollmentTransaction, StoreError};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::Transaction;

/// Loads a user with its profile and share-locks the user row, so its status
/// cannot change between this check and the commit.
const FIND_STUDENT_SQL: &str = r#"
    SELECT u.id, sp.id AS profile_id, u.name, u.email, u.role, u.status, sp.career_id
    FROM users AS u
    LEFT JOIN student_profiles AS sp ON sp.user_id = u.id
    WHERE u.id = $1
    FOR SHARE OF u
"#;

/// The PostgreSQL implementation of the enrollment store.
///
/// Capacity is protected twice: the subject row is locked with
/// `SELECT ... FOR UPDATE` when it is read, and the decrement itself is
/// conditional on `capacity > 0`. The `(student_profile_id, subject_id)`
/// unique constraint backs the duplicate check.
#[derive(Debug, Clone)]
pub struct PgEnrollmentStore {
    pool: PgPool,
}

impl PgEnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One open enrollment transaction. Dropping it without `commit` rolls back.
pub struct PgEnrollmentTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    type Tx = PgEnrollmentTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(PgEnrollmentTransaction { tx })
    }
}

#[async_trait]
impl EnrollmentTransaction for PgEnrollmentTransaction {
    async fn find_student(&mut self, user_id: i32) -> Result<Option<Student>, StoreError> {
        sqlx::query_as::<_, Student>(FIND_STUDENT_SQL)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)
    }

    async fn find_subject_for_update(
        &mut self,
        subject_id: i32,
    ) -> Result<Option<Subject>, StoreError> {
        sqlx::query_as::<_, Subject>(
            "SELECT id, name, capacity, career_id, teacher_id FROM subjects WHERE id = $1 FOR UPDATE",
        )
        .bind(subject_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)
    }

    async fn find_enrollment(
        &mut self,
        student_profile_id: i32,
        subject_id: i32,
    ) -> Result<Option<Enrollment>, StoreError> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, student_profile_id, subject_id, status, created_at
            FROM student_subjects
            WHERE student_profile_id = $1 AND subject_id = $2
            "#,
        )
        .bind(student_profile_id)
        .bind(subject_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)
    }

    async fn insert_enrollment(&mut self, new: NewEnrollment) -> Result<Enrollment, StoreError> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO student_subjects (student_profile_id, subject_id, status)
            VALUES ($1, $2, $3)
            RETURNING id, student_profile_id, subject_id, status, created_at
            "#,
        )
        .bind(new.student_profile_id)
        .bind(new.subject_id)
        .bind(new.status)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error)
    }

    async fn take_seat(&mut self, subject_id: i32) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE subjects SET capacity = capacity - 1 WHERE id = $1 AND capacity > 0")
                .bind(subject_id)
                .execute(&mut *self.tx)
                .await
                .map_err(store_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_lookup_locks_only_the_user_row() {
        let sql = FIND_STUDENT_SQL.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(sql.ends_with("WHERE u.id = $1 FOR SHARE OF u"), "{}", sql);
    }
}

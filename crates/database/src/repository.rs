use crate::error::{classify, DbError};
use core_types::{
    Career, Enrollment, EnrollmentStatus, NewCareer, NewEnrollment, NewStudent, NewSubject,
    NewTeacher, Page, PageRequest, Role, Student, StudentChanges, Subject, Teacher, UserStatus,
};
use sqlx::postgres::PgPool;

const STUDENT_SELECT: &str = r#"
    SELECT u.id, sp.id AS profile_id, u.name, u.email, u.role, u.status, sp.career_id
    FROM users AS u
    LEFT JOIN student_profiles AS sp ON sp.user_id = u.id
"#;

const TEACHER_SELECT: &str = r#"
    SELECT u.id, tp.id AS profile_id, u.name, u.email, u.status
    FROM users AS u
    JOIN teacher_profiles AS tp ON tp.user_id = u.id
"#;

const ENROLLMENT_COLUMNS: &str = "id, student_profile_id, subject_id, status, created_at";

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries of the CRUD surface.
///
/// Enrollment through the capacity-checking workflow does not go through here;
/// see `PgEnrollmentStore`.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==========================================================================
    // Students
    // ==========================================================================

    /// Creates the user account and its student profile in one transaction.
    pub async fn create_student(&self, input: &NewStudent) -> Result<Student, DbError> {
        let mut tx = self.pool.begin().await?;

        let user_id: i32 = sqlx::query_scalar(
            "INSERT INTO users (name, email, role, status) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(Role::Student)
        .bind(input.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        let profile_id: i32 = sqlx::query_scalar(
            "INSERT INTO student_profiles (user_id, career_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(input.career_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        tx.commit().await?;

        Ok(Student {
            id: user_id,
            profile_id: Some(profile_id),
            name: input.name.clone(),
            email: input.email.clone(),
            role: Role::Student,
            status: input.status,
            career_id: input.career_id,
        })
    }

    pub async fn list_students(&self, page: PageRequest) -> Result<Page<Student>, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(Role::Student)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!("{} WHERE u.role = $1 ORDER BY u.id LIMIT $2 OFFSET $3", STUDENT_SELECT);
        let students = sqlx::query_as::<_, Student>(&sql)
            .bind(Role::Student)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(students, total, page))
    }

    /// Fetches a student by user id.
    pub async fn get_student(&self, user_id: i32) -> Result<Student, DbError> {
        let sql = format!("{} WHERE u.id = $1 AND u.role = $2", STUDENT_SELECT);
        sqlx::query_as::<_, Student>(&sql)
            .bind(user_id)
            .bind(Role::Student)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    pub async fn update_student(
        &self,
        user_id: i32,
        changes: &StudentChanges,
    ) -> Result<Student, DbError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                status = COALESCE($4, status)
            WHERE id = $1 AND role = $5
            "#,
        )
        .bind(user_id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.status)
        .bind(Role::Student)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        if let Some(career_id) = changes.career_id {
            sqlx::query("UPDATE student_profiles SET career_id = $2 WHERE user_id = $1")
                .bind(user_id)
                .bind(career_id)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }

        tx.commit().await?;
        self.get_student(user_id).await
    }

    /// Removes the student; the profile and its enrollments cascade.
    pub async fn delete_student(&self, user_id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND role = $2")
            .bind(user_id)
            .bind(Role::Student)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // ==========================================================================
    // Teachers
    // ==========================================================================

    pub async fn create_teacher(&self, input: &NewTeacher) -> Result<Teacher, DbError> {
        let mut tx = self.pool.begin().await?;

        let user_id: i32 = sqlx::query_scalar(
            "INSERT INTO users (name, email, role, status) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(Role::Teacher)
        .bind(input.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        let profile_id: i32 =
            sqlx::query_scalar("INSERT INTO teacher_profiles (user_id) VALUES ($1) RETURNING id")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(classify)?;

        tx.commit().await?;

        Ok(Teacher {
            id: user_id,
            profile_id,
            name: input.name.clone(),
            email: input.email.clone(),
            status: input.status,
        })
    }

    /// Lists teachers, optionally only those with the given account status.
    pub async fn list_teachers(
        &self,
        page: PageRequest,
        status: Option<UserStatus>,
    ) -> Result<Page<Teacher>, DbError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM users AS u
            JOIN teacher_profiles AS tp ON tp.user_id = u.id
            WHERE ($1::user_status IS NULL OR u.status = $1)
            "#,
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "{} WHERE ($1::user_status IS NULL OR u.status = $1) ORDER BY u.id LIMIT $2 OFFSET $3",
            TEACHER_SELECT
        );
        let teachers = sqlx::query_as::<_, Teacher>(&sql)
            .bind(status)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(teachers, total, page))
    }

    pub async fn get_teacher(&self, user_id: i32) -> Result<Teacher, DbError> {
        let sql = format!("{} WHERE u.id = $1", TEACHER_SELECT);
        sqlx::query_as::<_, Teacher>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    /// Removes the teacher. Subjects they taught are left unassigned.
    pub async fn delete_teacher(&self, user_id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND role = $2")
            .bind(user_id)
            .bind(Role::Teacher)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // ==========================================================================
    // Careers
    // ==========================================================================

    pub async fn create_career(&self, input: &NewCareer) -> Result<Career, DbError> {
        sqlx::query_as::<_, Career>(
            "INSERT INTO careers (name, description) VALUES ($1, $2) RETURNING id, name, description",
        )
        .bind(&input.name)
        .bind(input.description.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn list_careers(&self, page: PageRequest) -> Result<Page<Career>, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM careers")
            .fetch_one(&self.pool)
            .await?;
        let careers = sqlx::query_as::<_, Career>(
            "SELECT id, name, description FROM careers ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit_i64())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(Page::new(careers, total, page))
    }

    // ==========================================================================
    // Subjects
    // ==========================================================================

    pub async fn create_subject(&self, input: &NewSubject) -> Result<Subject, DbError> {
        sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (name, capacity, career_id, teacher_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, capacity, career_id, teacher_id
            "#,
        )
        .bind(&input.name)
        .bind(input.capacity)
        .bind(input.career_id)
        .bind(input.teacher_id)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn list_subjects(&self, page: PageRequest) -> Result<Page<Subject>, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subjects")
            .fetch_one(&self.pool)
            .await?;
        let subjects = sqlx::query_as::<_, Subject>(
            "SELECT id, name, capacity, career_id, teacher_id FROM subjects ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit_i64())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(Page::new(subjects, total, page))
    }

    pub async fn get_subject(&self, subject_id: i32) -> Result<Subject, DbError> {
        sqlx::query_as::<_, Subject>(
            "SELECT id, name, capacity, career_id, teacher_id FROM subjects WHERE id = $1",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)
    }

    /// Assigns a teacher profile to a subject, or clears the assignment with `None`.
    pub async fn assign_teacher(
        &self,
        subject_id: i32,
        teacher_profile_id: Option<i32>,
    ) -> Result<Subject, DbError> {
        sqlx::query_as::<_, Subject>(
            r#"
            UPDATE subjects SET teacher_id = $2
            WHERE id = $1
            RETURNING id, name, capacity, career_id, teacher_id
            "#,
        )
        .bind(subject_id)
        .bind(teacher_profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or(DbError::NotFound)
    }

    // ==========================================================================
    // Enrollments
    // ==========================================================================

    /// Inserts an enrollment row as-is. Capacity is not touched; use the
    /// enrollment coordinator for seat-checked enrollment.
    pub async fn create_enrollment(&self, input: &NewEnrollment) -> Result<Enrollment, DbError> {
        let sql = format!(
            "INSERT INTO student_subjects (student_profile_id, subject_id, status) VALUES ($1, $2, $3) RETURNING {}",
            ENROLLMENT_COLUMNS
        );
        sqlx::query_as::<_, Enrollment>(&sql)
            .bind(input.student_profile_id)
            .bind(input.subject_id)
            .bind(input.status)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    pub async fn list_enrollments(&self, page: PageRequest) -> Result<Page<Enrollment>, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_subjects")
            .fetch_one(&self.pool)
            .await?;
        let sql = format!(
            "SELECT {} FROM student_subjects ORDER BY id LIMIT $1 OFFSET $2",
            ENROLLMENT_COLUMNS
        );
        let enrollments = sqlx::query_as::<_, Enrollment>(&sql)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(Page::new(enrollments, total, page))
    }

    pub async fn get_enrollment(&self, enrollment_id: i32) -> Result<Enrollment, DbError> {
        let sql = format!("SELECT {} FROM student_subjects WHERE id = $1", ENROLLMENT_COLUMNS);
        sqlx::query_as::<_, Enrollment>(&sql)
            .bind(enrollment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    pub async fn update_enrollment_status(
        &self,
        enrollment_id: i32,
        status: EnrollmentStatus,
    ) -> Result<Enrollment, DbError> {
        let sql = format!(
            "UPDATE student_subjects SET status = $2 WHERE id = $1 RETURNING {}",
            ENROLLMENT_COLUMNS
        );
        sqlx::query_as::<_, Enrollment>(&sql)
            .bind(enrollment_id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    pub async fn delete_enrollment(&self, enrollment_id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM student_subjects WHERE id = $1")
            .bind(enrollment_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

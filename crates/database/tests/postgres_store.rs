//! Runs the enrollment coordinator against a real PostgreSQL database.
//!
//! Ignored by default. Run with a scratch database:
//! `DATABASE_URL=postgres://... cargo test -p database -- --ignored`

use configuration::DatabaseSettings;
use core_types::{EnrollmentStatus, NewStudent, NewSubject, UserStatus};
use database::{connect, run_migrations, DbRepository, PgEnrollmentStore};
use enrollment::{
    EnrollmentCoordinator, EnrollmentError, EnrollmentStore, EnrollmentTransaction,
};
use futures::future::join_all;

async fn repository() -> DbRepository {
    let pool = connect(&DatabaseSettings::default())
        .await
        .expect("DATABASE_URL must point at a scratch database");
    run_migrations(&pool).await.expect("migrations");
    DbRepository::new(pool)
}

fn unique_email(tag: &str, n: usize) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}-{}@example.edu", tag, n, nanos)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn enroll_updates_capacity_and_rejects_duplicates() {
    let repo = repository().await;
    let coordinator = EnrollmentCoordinator::new(PgEnrollmentStore::new(repo.pool().clone()));

    let student = repo
        .create_student(&NewStudent {
            name: "Ada".to_string(),
            email: unique_email("ada", 0),
            status: UserStatus::Active,
            career_id: None,
        })
        .await
        .unwrap();
    let subject = repo
        .create_subject(&NewSubject {
            name: "Compilers".to_string(),
            capacity: 1,
            career_id: None,
            teacher_id: None,
        })
        .await
        .unwrap();

    let enrollment = coordinator.enroll(student.id, subject.id).await.unwrap();
    assert_eq!(enrollment.status, EnrollmentStatus::Enrolled);
    assert_eq!(repo.get_subject(subject.id).await.unwrap().capacity, 0);

    let err = coordinator.enroll(student.id, subject.id).await.unwrap_err();
    assert!(matches!(err, EnrollmentError::Conflict(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_enrollments_never_overbook() {
    const ATTEMPTS: usize = 8;
    let repo = repository().await;
    let coordinator = EnrollmentCoordinator::new(PgEnrollmentStore::new(repo.pool().clone()));

    let subject = repo
        .create_subject(&NewSubject {
            name: "Operating Systems".to_string(),
            capacity: 3,
            career_id: None,
            teacher_id: None,
        })
        .await
        .unwrap();

    let mut student_ids = Vec::new();
    for n in 0..ATTEMPTS {
        let student = repo
            .create_student(&NewStudent {
                name: format!("Student {}", n),
                email: unique_email("race", n),
                status: UserStatus::Active,
                career_id: None,
            })
            .await
            .unwrap();
        student_ids.push(student.id);
    }

    let tasks: Vec<_> = student_ids
        .into_iter()
        .map(|student_id| {
            let coordinator = coordinator.clone();
            let subject_id = subject.id;
            tokio::spawn(async move { coordinator.enroll(student_id, subject_id).await })
        })
        .collect();
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(EnrollmentError::PreconditionFailed(_))))
            .count(),
        ATTEMPTS - 3
    );
    assert_eq!(repo.get_subject(subject.id).await.unwrap().capacity, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn student_row_stays_locked_until_the_transaction_ends() {
    let repo = repository().await;
    let store = PgEnrollmentStore::new(repo.pool().clone());

    let student = repo
        .create_student(&NewStudent {
            name: "Grace".to_string(),
            email: unique_email("grace", 0),
            status: UserStatus::Active,
            career_id: None,
        })
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let loaded = tx.find_student(student.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, UserStatus::Active);

    // A concurrent deactivation must wait for the enrollment transaction.
    let mut other = repo.pool().begin().await.unwrap();
    sqlx::query("SET LOCAL lock_timeout = '200ms'")
        .execute(&mut *other)
        .await
        .unwrap();
    let blocked = sqlx::query("UPDATE users SET status = 'inactive' WHERE id = $1")
        .bind(student.id)
        .execute(&mut *other)
        .await;
    assert!(blocked.is_err(), "status update should hit the lock timeout");
    other.rollback().await.unwrap();

    tx.rollback().await.unwrap();

    let updated = sqlx::query("UPDATE users SET status = 'inactive' WHERE id = $1")
        .bind(student.id)
        .execute(repo.pool())
        .await
        .unwrap();
    assert_eq!(updated.rows_affected(), 1);
}

use crate::enums::{EnrollmentStatus, Role, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A student as seen by the rest of the system: the user account joined with
/// its (optional) student profile.
///
/// `id` is the user id. `profile_id` is the foreign-key anchor for enrollments
/// and is `None` when the user has no student profile yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i32,
    pub profile_id: Option<i32>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub career_id: Option<i32>,
}

impl Student {
    /// Returns the profile id if this user is allowed to enroll in subjects:
    /// an active account, bearing the student role, that owns a student profile.
    pub fn enrollable_profile(&self) -> Option<i32> {
        if self.status == UserStatus::Active && self.role == Role::Student {
            self.profile_id
        } else {
            None
        }
    }
}

/// A teacher: the user account joined with its teacher profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub id: i32,
    pub profile_id: i32,
    pub name: String,
    pub email: String,
    pub status: UserStatus,
}

/// An academic career (degree programme) that groups students and subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Career {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// A subject offered to students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: i32,
    pub name: String,
    /// Remaining open seats. Never negative.
    pub capacity: i32,
    pub career_id: Option<i32>,
    /// The teacher profile assigned to teach this subject, if any.
    pub teacher_id: Option<i32>,
}

impl Subject {
    pub fn has_open_seats(&self) -> bool {
        self.capacity > 0
    }
}

/// The join record between a student profile and a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: i32,
    pub student_profile_id: i32,
    pub subject_id: i32,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
}

/// The data needed to insert a new enrollment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub student_profile_id: i32,
    pub subject_id: i32,
    pub status: EnrollmentStatus,
}

impl NewEnrollment {
    pub fn enrolled(student_profile_id: i32, subject_id: i32) -> Self {
        Self {
            student_profile_id,
            subject_id,
            status: EnrollmentStatus::Enrolled,
        }
    }
}

/// Input for registering a new student (user account plus student profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    #[serde(default = "default_status")]
    pub status: UserStatus,
    #[serde(default)]
    pub career_id: Option<i32>,
}

/// A partial update of a student. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<UserStatus>,
    pub career_id: Option<i32>,
}

/// Input for registering a new teacher (user account plus teacher profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
    #[serde(default = "default_status")]
    pub status: UserStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCareer {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub capacity: i32,
    #[serde(default)]
    pub career_id: Option<i32>,
    #[serde(default)]
    pub teacher_id: Option<i32>,
}

fn default_status() -> UserStatus {
    UserStatus::Active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(role: Role, status: UserStatus, profile_id: Option<i32>) -> Student {
        Student {
            id: 7,
            profile_id,
            name: "Ada".to_string(),
            email: "ada@example.edu".to_string(),
            role,
            status,
            career_id: None,
        }
    }

    #[test]
    fn new_student_defaults_to_active() {
        let input: NewStudent =
            serde_json::from_str(r#"{ "name": "Ada", "email": "ada@example.edu" }"#).unwrap();
        assert_eq!(input.status, UserStatus::Active);
        assert_eq!(input.career_id, None);
    }

    #[test]
    fn only_active_students_with_a_profile_can_enroll() {
        assert_eq!(student(Role::Student, UserStatus::Active, Some(70)).enrollable_profile(), Some(70));
        assert_eq!(student(Role::Student, UserStatus::Inactive, Some(70)).enrollable_profile(), None);
        assert_eq!(student(Role::Teacher, UserStatus::Active, Some(70)).enrollable_profile(), None);
        assert_eq!(student(Role::Student, UserStatus::Active, None).enrollable_profile(), None);
    }
}

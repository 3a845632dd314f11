pub mod enums;
pub mod error;
pub mod pagination;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{EnrollmentStatus, Role, UserStatus};
pub use error::CoreError;
pub use pagination::{Page, PageQuery, PageRequest};
pub use structs::{
    Career, Enrollment, NewCareer, NewEnrollment, NewStudent, NewSubject, NewTeacher, Student,
    StudentChanges, Subject, Teacher,
};

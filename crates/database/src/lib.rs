//! # Campus Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! PostgreSQL database holding users, profiles, careers, subjects and
//! enrollments.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** This crate encapsulates all database-specific logic. It
//!   provides a clean, abstract API to the rest of the application, hiding
//!   the underlying SQL and database implementation details.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and it uses a
//!   connection pool (`PgPool`) for concurrent database access.
//! - **Store Implementation:** `PgEnrollmentStore` implements the enrollment
//!   crate's transactional store contract with row locks and a conditional
//!   capacity decrement.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: A utility to apply database migrations, ensuring the schema is up-to-date.
//! - `DbRepository`: The CRUD data access methods (students, teachers, careers,
//!   subjects, enrollments).
//! - `PgEnrollmentStore`: The transactional store used by the enrollment coordinator.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod enrollment_store;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use enrollment_store::{PgEnrollmentStore, PgEnrollmentTransaction};
pub use error::DbError;
pub use repository::DbRepository;

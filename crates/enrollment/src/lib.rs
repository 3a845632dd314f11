//! # Campus Enrollment Crate
//!
//! This crate owns the one piece of real business logic in the system: enrolling
//! a student into a subject without overbooking it and without creating a
//! duplicate enrollment.
//!
//! ## Architectural Principles
//!
//! - **Store Abstraction:** The `EnrollmentCoordinator` talks only to the
//!   `EnrollmentStore` / `EnrollmentTransaction` traits. The PostgreSQL
//!   implementation lives in the `database` crate; an `InMemoryStore` lives here.
//! - **Everything In One Transaction:** The capacity check, the duplicate check
//!   and both writes run inside a single transaction. Stores lock the subject
//!   when it is read and only decrement capacity while it is above zero.
//! - **Typed Failures:** Callers get an `EnrollmentError` they can match on
//!   instead of a stringly-typed error.
//!
//! ## Public API
//!
//! - `EnrollmentCoordinator`: runs the enrollment workflow.
//! - `EnrollmentStore`, `EnrollmentTransaction`: the store contract.
//! - `InMemoryStore`: a serializable in-memory store.
//! - `EnrollmentError`, `StoreError`: the error types of this crate.

// Declare the modules that constitute this crate.
pub mod coordinator;
pub mod error;
pub mod memory;
pub mod store;

// Re-export the key components to provide a clean, public-facing API.
pub use coordinator::EnrollmentCoordinator;
pub use error::{EnrollmentError, StoreError};
pub use memory::{FailPoint, InMemoryStore};
pub use store::{EnrollmentStore, EnrollmentTransaction};

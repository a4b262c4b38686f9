//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for goals.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Goal::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod goal_repo;

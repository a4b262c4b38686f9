//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own the serialization boundary and change notification for callers.

pub mod goal_store;

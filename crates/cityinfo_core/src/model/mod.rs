//! Domain model for cities and their points of interest.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the pure field validator applied to every write.
//!
//! # Invariants
//! - Every point of interest is identified by a store-wide unique id.
//! - Deletion is a hard delete; ids of deleted rows are never handed out again
//!   while a larger id remains in the store.

pub mod city;
pub mod validation;

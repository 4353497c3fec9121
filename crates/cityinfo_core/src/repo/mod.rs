//! City store contract and its two backends.
//!
//! # Responsibility
//! - Define the backend-agnostic `CityRepository` contract.
//! - Provide a memory-resident store and a SQLite-backed store.
//!
//! # Invariants
//! - Absence is reported as `None`/`false`, never as an error.
//! - `RepoError` is reserved for infrastructure faults.
//! - Both backends list cities by name ascending, ties broken by id.

pub mod city_repo;
pub mod memory_repo;
pub mod seed;

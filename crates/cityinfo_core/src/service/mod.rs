//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validator, patch engine and store calls into use-case APIs.
//! - Keep transport layers decoupled from storage details.

pub mod point_of_interest_service;

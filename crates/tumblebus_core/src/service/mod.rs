//! Use-case services over the repositories.
//!
//! # Responsibility
//! - Orchestrate multi-step repository flows for external callers.
//! - Keep callers decoupled from store details.

pub mod enrollment_service;

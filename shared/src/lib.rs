//! Shared types and domain logic for the Print Shop Estimation Platform
//!
//! This crate contains the data model, the operation formula evaluator and
//! the pure estimation engine, shared between the backend and its tests.
//! Everything here is free of I/O; persistence lives in the backend crate.

pub mod estimation;
pub mod models;
pub mod validation;

pub use estimation::*;
pub use models::*;
pub use validation::*;

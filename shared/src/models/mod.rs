//! Domain models for the Print Shop Estimation Platform

pub mod client;
pub mod job;
pub mod operation;
pub mod paper;

pub use client::*;
pub use job::*;
pub use operation::*;
pub use paper::*;

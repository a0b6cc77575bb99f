//! HTTP handlers: thin JSON glue over the service layer

pub mod catalog;
pub mod client;
pub mod estimation;
pub mod job;
pub mod operation;

pub use catalog::*;
pub use client::*;
pub use estimation::*;
pub use job::*;
pub use operation::*;

//! Business logic services

pub mod catalog;
pub mod client;
pub mod estimation;
pub mod job;
pub mod operation;
pub mod reporting;
pub mod sequence;

use crate::error::{AppError, AppResult};

/// Map a field-level validation result onto the API error type.
pub(crate) fn check_field(field: &str, result: Result<(), &'static str>) -> AppResult<()> {
    result.map_err(|message| AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    })
}

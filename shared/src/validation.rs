//! Validation helpers shared by the API boundary and tests

use rust_decimal::Decimal;

// ============================================================================
// Job parameter validations
// ============================================================================

/// Validate a target output quantity.
pub fn validate_quantity(quantity: u32) -> Result<(), &'static str> {
    if quantity == 0 {
        return Err("Quantity must be at least 1");
    }
    Ok(())
}

/// Validate items-per-sheet.
pub fn validate_n_up(n_up: u32) -> Result<(), &'static str> {
    if n_up == 0 {
        return Err("N-up must be at least 1");
    }
    Ok(())
}

/// Validate a front or back color count (0-12 per side).
pub fn validate_color_count(colors: u32) -> Result<(), &'static str> {
    if colors > 12 {
        return Err("Color count must be between 0 and 12");
    }
    Ok(())
}

/// Validate custom end-size dimensions: both present and positive, or both
/// absent (a catalog size is used instead).
pub fn validate_custom_end_size(
    width_cm: Option<Decimal>,
    height_cm: Option<Decimal>,
) -> Result<(), &'static str> {
    match (width_cm, height_cm) {
        (None, None) => Ok(()),
        (Some(w), Some(h)) => {
            if w <= Decimal::ZERO || h <= Decimal::ZERO {
                Err("Custom end size dimensions must be positive")
            } else {
                Ok(())
            }
        }
        _ => Err("Custom end size requires both width and height"),
    }
}

// ============================================================================
// Operation definition validations
// ============================================================================

/// Validate an operation's quantity-transform configuration. Divisor and
/// multiplier are each at least 1 and at most one of them is above 1;
/// cutting and binding are distinct operations, never one formula.
pub fn validate_transform_config(divides_by: u32, multiplies_by: u32) -> Result<(), &'static str> {
    if divides_by == 0 || multiplies_by == 0 {
        return Err("Quantity divisor and multiplier must be at least 1");
    }
    if divides_by > 1 && multiplies_by > 1 {
        return Err("An operation cannot both divide and multiply quantity");
    }
    Ok(())
}

/// Validate a waste percentage (a fraction of the print run, 0 to 1).
pub fn validate_waste_percentage(waste_percentage: Decimal) -> Result<(), &'static str> {
    if waste_percentage < Decimal::ZERO || waste_percentage > Decimal::ONE {
        return Err("Waste percentage must be between 0 and 1");
    }
    Ok(())
}

/// Validate a price constant.
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Prices cannot be negative");
    }
    Ok(())
}

// ============================================================================
// General validations
// ============================================================================

/// Validate email format (basic check).
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn quantity_and_n_up_must_be_positive() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_n_up(0).is_err());
        assert!(validate_n_up(2).is_ok());
    }

    #[test]
    fn color_count_capped_at_twelve() {
        assert!(validate_color_count(0).is_ok());
        assert!(validate_color_count(12).is_ok());
        assert!(validate_color_count(13).is_err());
    }

    #[test]
    fn custom_end_size_needs_both_dimensions() {
        let w = Decimal::from_str("15.0").ok();
        assert!(validate_custom_end_size(None, None).is_ok());
        assert!(validate_custom_end_size(w, w).is_ok());
        assert!(validate_custom_end_size(w, None).is_err());
        assert!(validate_custom_end_size(Some(Decimal::ZERO), w).is_err());
    }

    #[test]
    fn transform_config_rejects_combined_divide_and_multiply() {
        assert!(validate_transform_config(1, 1).is_ok());
        assert!(validate_transform_config(4, 1).is_ok());
        assert!(validate_transform_config(1, 4).is_ok());
        assert!(validate_transform_config(2, 2).is_err());
        assert!(validate_transform_config(0, 1).is_err());
    }

    #[test]
    fn waste_percentage_is_a_fraction() {
        assert!(validate_waste_percentage(Decimal::ZERO).is_ok());
        assert!(validate_waste_percentage(Decimal::from_str("0.05").unwrap()).is_ok());
        assert!(validate_waste_percentage(Decimal::from_str("1.5").unwrap()).is_err());
        assert!(validate_waste_percentage(Decimal::from_str("-0.1").unwrap()).is_err());
    }
}

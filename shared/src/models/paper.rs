//! Paper catalog models: types and sizes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Paper stock with weight and pricing. Reference data, read-only to the
/// estimation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperType {
    pub id: Uuid,
    pub name: String,
    /// Weight in grams per square meter
    pub weight_gsm: u32,
    /// Purchase price per kilogram
    pub price_per_kg: Decimal,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sheet size. A size may be sub-cut from a larger purchased sheet via the
/// parent relation, e.g. four A3 printing sheets from one A1 selling sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSize {
    pub id: Uuid,
    pub name: String,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
    pub parent_size_id: Option<Uuid>,
    /// How many sheets of this size one parent sheet yields
    pub parts_of_parent: u32,
    /// Standard industry size (A4, A3, ...)
    pub is_standard: bool,
    pub description: Option<String>,
}

impl PaperSize {
    /// Area in square meters.
    pub fn area_m2(&self) -> Decimal {
        self.width_cm * self.height_cm / Decimal::from(10_000)
    }

    /// Area in square centimeters.
    pub fn area_cm2(&self) -> Decimal {
        self.width_cm * self.height_cm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn a3() -> PaperSize {
        PaperSize {
            id: Uuid::new_v4(),
            name: "A3".to_string(),
            width_cm: Decimal::from_str("29.7").unwrap(),
            height_cm: Decimal::from_str("42.0").unwrap(),
            parent_size_id: None,
            parts_of_parent: 1,
            is_standard: true,
            description: None,
        }
    }

    #[test]
    fn area_conversions() {
        let size = a3();
        assert_eq!(size.area_cm2(), Decimal::from_str("1247.40").unwrap());
        assert_eq!(size.area_m2(), Decimal::from_str("0.124740").unwrap());
    }
}

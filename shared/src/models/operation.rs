//! Operation definitions and the cost/time formula evaluator

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Category for organizing operations (Cutting, Printing, Finishing, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Hex color code for UI display
    pub color: String,
    pub sort_order: i32,
}

/// Master operation definition: a named, configurable formula template.
///
/// Shop administrators create and edit these; the engine only reads them and
/// freezes a snapshot into each job operation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,

    // Pricing constants
    /// Fixed setup cost per invocation
    pub makeready_price: Decimal,
    /// Linear cost per processed sheet
    pub price_per_sheet: Decimal,
    /// Per-color plate cost (color operations only)
    pub plate_price: Decimal,

    // Waste model
    /// Flat waste sheet count added per run
    pub base_waste_sheets: u32,
    /// Fraction of the print run lost to spoilage (e.g. 0.02)
    pub waste_percentage: Decimal,

    // Time model
    pub makeready_time_minutes: u32,
    /// Per-color cleaning minutes (color operations only)
    pub cleaning_time_minutes: u32,
    /// Throughput; 0 means no throughput-based time
    pub sheets_per_minute: u32,

    // Quantity transform
    /// Divide quantity by this (binding N pages into 1 unit); 1 = no-op
    pub divides_quantity_by: u32,
    /// Multiply quantity by this (cutting into N pieces); 1 = no-op
    pub multiplies_quantity_by: u32,

    /// Cost and waste scale with the job's color count
    pub uses_colors: bool,
    /// Cleaning time counts front colors only
    pub uses_front_colors_only: bool,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OperationDefinition {
    /// Freeze the formula constants for storage on a job operation row.
    pub fn snapshot(&self) -> OperationSnapshot {
        OperationSnapshot {
            operation_name: self.name.clone(),
            makeready_price: self.makeready_price,
            price_per_sheet: self.price_per_sheet,
            plate_price: self.plate_price,
            base_waste_sheets: self.base_waste_sheets,
            waste_percentage: self.waste_percentage,
            makeready_time_minutes: self.makeready_time_minutes,
            cleaning_time_minutes: self.cleaning_time_minutes,
            sheets_per_minute: self.sheets_per_minute,
            divides_quantity_by: self.divides_quantity_by,
            multiplies_quantity_by: self.multiplies_quantity_by,
            uses_colors: self.uses_colors,
            uses_front_colors_only: self.uses_front_colors_only,
        }
    }
}

/// Frozen copy of an operation's formula constants, taken when the operation
/// is attached to a job and refreshed on every recalculation. Later edits to
/// the master definition do not change rows that were already calculated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    pub operation_name: String,
    pub makeready_price: Decimal,
    pub price_per_sheet: Decimal,
    pub plate_price: Decimal,
    pub base_waste_sheets: u32,
    pub waste_percentage: Decimal,
    pub makeready_time_minutes: u32,
    pub cleaning_time_minutes: u32,
    pub sheets_per_minute: u32,
    pub divides_quantity_by: u32,
    pub multiplies_quantity_by: u32,
    pub uses_colors: bool,
    pub uses_front_colors_only: bool,
}

/// Per-instance transform override attached to a single job operation,
/// e.g. "cut into 4 pieces" on this step only.
///
/// Stored as JSON (`{"cut_pieces": 4}` or `{"divide_by": 2}`) and parsed into
/// this enum at the API boundary; both keys at once is a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OverrideSpec", into = "OverrideSpec")]
pub enum StepOverride {
    /// Overrides the static multiplier
    CutInto { pieces: u32 },
    /// Overrides the static divisor
    DivideBy { divisor: u32 },
}

/// Wire format for [`StepOverride`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OverrideSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    cut_pieces: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    divide_by: Option<u32>,
}

impl TryFrom<OverrideSpec> for StepOverride {
    type Error = String;

    fn try_from(spec: OverrideSpec) -> Result<Self, Self::Error> {
        match (spec.cut_pieces, spec.divide_by) {
            (Some(_), Some(_)) => {
                Err("cut_pieces and divide_by are mutually exclusive".to_string())
            }
            (Some(0), None) | (None, Some(0)) => {
                Err("override value must be at least 1".to_string())
            }
            (Some(pieces), None) => Ok(StepOverride::CutInto { pieces }),
            (None, Some(divisor)) => Ok(StepOverride::DivideBy { divisor }),
            (None, None) => Err("expected cut_pieces or divide_by".to_string()),
        }
    }
}

impl From<StepOverride> for OverrideSpec {
    fn from(value: StepOverride) -> Self {
        match value {
            StepOverride::CutInto { pieces } => OverrideSpec {
                cut_pieces: Some(pieces),
                divide_by: None,
            },
            StepOverride::DivideBy { divisor } => OverrideSpec {
                cut_pieces: None,
                divide_by: Some(divisor),
            },
        }
    }
}

/// Job-level inputs to a single formula evaluation.
///
/// `print_run` is the sheet count before any per-operation waste;
/// `current_quantity` is whatever the previous step handed forward.
#[derive(Debug, Clone, Copy)]
pub struct JobContext {
    pub quantity: u64,
    pub n_up: u32,
    pub colors_front: u32,
    pub colors_back: u32,
    pub print_run: u64,
    pub current_quantity: u64,
}

impl JobContext {
    pub fn total_colors(&self) -> u32 {
        self.colors_front + self.colors_back
    }
}

/// Result of a cost evaluation for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct CostOutcome {
    pub total_cost: Decimal,
    pub waste_sheets: u64,
    pub processing_quantity: u64,
    pub quantity_after: u64,
}

/// Formula evaluation failure for a single step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("waste of {waste} sheets exceeds the {current} sheets entering this step")]
    WasteExceedsQuantity { waste: u64, current: u64 },

    #[error("calculated value does not fit an integer sheet count")]
    NotRepresentable,
}

impl OperationSnapshot {
    /// Waste sheets for this step. Percentage waste is always taken against
    /// the print run, never against the quantity flowing through the step;
    /// color operations spoil sheets once per plate. Shared by the cost and
    /// time formulas and by the backward purchase estimate.
    pub fn waste_sheets(&self, ctx: &JobContext) -> Result<u64, FormulaError> {
        if self.base_waste_sheets == 0 && self.waste_percentage.is_zero() {
            return Ok(0);
        }

        let mut waste = Decimal::from(self.base_waste_sheets)
            + self.waste_percentage * Decimal::from(ctx.print_run);
        if self.uses_colors {
            waste *= Decimal::from(ctx.total_colors());
        }
        waste.trunc().to_u64().ok_or(FormulaError::NotRepresentable)
    }

    /// Evaluate the cost formula for one step.
    ///
    /// Color printing: `colors × (makeready + plate + processing × price)`.
    /// Everything else: `makeready + processing × price`, with the linear term
    /// scaled by a `cut_pieces` override when present (more output pieces cost
    /// proportionally more to process the same input sheets).
    pub fn calculate_cost(
        &self,
        ctx: &JobContext,
        parameters: Option<StepOverride>,
    ) -> Result<CostOutcome, FormulaError> {
        let waste_sheets = self.waste_sheets(ctx)?;
        let processing_quantity = ctx.current_quantity + waste_sheets;
        let processing = Decimal::from(processing_quantity);

        let total_cost = if self.uses_colors {
            Decimal::from(ctx.total_colors())
                * (self.makeready_price + self.plate_price + processing * self.price_per_sheet)
        } else {
            let mut linear = processing * self.price_per_sheet;
            if let Some(StepOverride::CutInto { pieces }) = parameters {
                linear *= Decimal::from(pieces);
            }
            self.makeready_price + linear
        };

        let remaining = ctx
            .current_quantity
            .checked_sub(waste_sheets)
            .ok_or(FormulaError::WasteExceedsQuantity {
                waste: waste_sheets,
                current: ctx.current_quantity,
            })?;
        let quantity_after = self.transform_quantity(remaining, parameters);

        Ok(CostOutcome {
            total_cost,
            waste_sheets,
            processing_quantity,
            quantity_after,
        })
    }

    /// Evaluate the time formula for one step, in whole minutes.
    ///
    /// Must be called with the same context as [`calculate_cost`] so the two
    /// evaluations agree on waste and processing quantity.
    pub fn calculate_time(
        &self,
        ctx: &JobContext,
        _parameters: Option<StepOverride>,
    ) -> Result<u32, FormulaError> {
        let waste_sheets = self.waste_sheets(ctx)?;
        let processing_quantity = ctx.current_quantity + waste_sheets;

        let mut minutes = Decimal::from(self.makeready_time_minutes);

        if self.uses_colors {
            let cleaning_colors = if self.uses_front_colors_only {
                ctx.colors_front
            } else {
                ctx.total_colors()
            };
            minutes += Decimal::from(cleaning_colors) * Decimal::from(self.cleaning_time_minutes);
            if self.sheets_per_minute > 0 {
                minutes += Decimal::from(ctx.total_colors())
                    * (Decimal::from(processing_quantity) / Decimal::from(self.sheets_per_minute));
            }
        } else if self.sheets_per_minute > 0 {
            minutes += Decimal::from(processing_quantity) / Decimal::from(self.sheets_per_minute);
        }

        minutes.trunc().to_u32().ok_or(FormulaError::NotRepresentable)
    }

    /// Apply the quantity transform after waste has been deducted. Dynamic
    /// parameters always win over the static configuration; exactly one of
    /// the four outcomes applies.
    fn transform_quantity(&self, remaining: u64, parameters: Option<StepOverride>) -> u64 {
        match parameters {
            Some(StepOverride::CutInto { pieces }) => remaining * u64::from(pieces),
            Some(StepOverride::DivideBy { divisor }) => remaining / u64::from(divisor),
            None => {
                if self.multiplies_quantity_by > 1 {
                    remaining * u64::from(self.multiplies_quantity_by)
                } else if self.divides_quantity_by > 1 {
                    remaining / u64::from(self.divides_quantity_by)
                } else {
                    remaining
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn plain_snapshot() -> OperationSnapshot {
        OperationSnapshot {
            operation_name: "Die-cutting".to_string(),
            makeready_price: dec("25.00"),
            price_per_sheet: dec("0.05"),
            plate_price: Decimal::ZERO,
            base_waste_sheets: 0,
            waste_percentage: Decimal::ZERO,
            makeready_time_minutes: 15,
            cleaning_time_minutes: 0,
            sheets_per_minute: 50,
            divides_quantity_by: 1,
            multiplies_quantity_by: 1,
            uses_colors: false,
            uses_front_colors_only: false,
        }
    }

    fn ctx(current_quantity: u64) -> JobContext {
        JobContext {
            quantity: 1000,
            n_up: 2,
            colors_front: 4,
            colors_back: 1,
            print_run: 500,
            current_quantity,
        }
    }

    #[test]
    fn neutral_operation_passes_quantity_through() {
        let op = plain_snapshot();
        let outcome = op.calculate_cost(&ctx(500), None).unwrap();

        assert_eq!(outcome.waste_sheets, 0);
        assert_eq!(outcome.processing_quantity, 500);
        assert_eq!(outcome.quantity_after, 500);
        assert_eq!(outcome.total_cost, dec("25.00") + dec("0.05") * dec("500"));
    }

    #[test]
    fn color_operation_scales_every_term_by_color_count() {
        let mut op = plain_snapshot();
        op.operation_name = "Offset printing".to_string();
        op.plate_price = dec("12.00");
        op.uses_colors = true;

        // 4 front + 1 back = 5 colors
        let outcome = op.calculate_cost(&ctx(500), None).unwrap();
        let expected =
            Decimal::from(5) * (dec("25.00") + dec("12.00") + Decimal::from(500) * dec("0.05"));
        assert_eq!(outcome.total_cost, expected);
    }

    #[test]
    fn color_waste_multiplied_per_plate() {
        let mut op = plain_snapshot();
        op.uses_colors = true;
        op.base_waste_sheets = 10;

        let outcome = op.calculate_cost(&ctx(500), None).unwrap();
        // 10 base sheets × 5 colors
        assert_eq!(outcome.waste_sheets, 50);
        assert_eq!(outcome.processing_quantity, 550);
        assert_eq!(outcome.quantity_after, 450);
    }

    #[test]
    fn percentage_waste_is_based_on_print_run_not_current_quantity() {
        let mut op = plain_snapshot();
        op.waste_percentage = dec("0.02");

        // current quantity differs from print run on purpose
        let outcome = op.calculate_cost(&ctx(2000), None).unwrap();
        assert_eq!(outcome.waste_sheets, 10); // 2% of 500, not of 2000
    }

    #[test]
    fn cut_pieces_override_scales_linear_cost_and_output() {
        let op = plain_snapshot();
        let base = op.calculate_cost(&ctx(500), None).unwrap();
        let cut = op
            .calculate_cost(&ctx(500), Some(StepOverride::CutInto { pieces: 4 }))
            .unwrap();

        assert_eq!(cut.quantity_after, base.quantity_after * 4);
        assert_eq!(
            cut.total_cost - op.makeready_price,
            (base.total_cost - op.makeready_price) * Decimal::from(4)
        );
    }

    #[test]
    fn divide_by_override_floors_and_beats_static_config() {
        let mut op = plain_snapshot();
        op.multiplies_quantity_by = 2;

        let outcome = op
            .calculate_cost(&ctx(501), Some(StepOverride::DivideBy { divisor: 4 }))
            .unwrap();
        assert_eq!(outcome.quantity_after, 125);
    }

    #[test]
    fn static_divisor_applies_when_no_override() {
        let mut op = plain_snapshot();
        op.divides_quantity_by = 4;

        let outcome = op.calculate_cost(&ctx(500), None).unwrap();
        assert_eq!(outcome.quantity_after, 125);
    }

    #[test]
    fn waste_larger_than_incoming_quantity_is_an_error() {
        let mut op = plain_snapshot();
        op.base_waste_sheets = 600;

        let err = op.calculate_cost(&ctx(500), None).unwrap_err();
        assert_eq!(
            err,
            FormulaError::WasteExceedsQuantity {
                waste: 600,
                current: 500
            }
        );
    }

    #[test]
    fn time_includes_cleaning_and_throughput_per_color() {
        let mut op = plain_snapshot();
        op.uses_colors = true;
        op.cleaning_time_minutes = 5;
        op.sheets_per_minute = 100;

        // 15 + 5×5 cleaning + 5 × (500/100) = 65
        let minutes = op.calculate_time(&ctx(500), None).unwrap();
        assert_eq!(minutes, 65);
    }

    #[test]
    fn front_colors_only_limits_cleaning() {
        let mut op = plain_snapshot();
        op.uses_colors = true;
        op.uses_front_colors_only = true;
        op.cleaning_time_minutes = 5;
        op.sheets_per_minute = 0;

        // 15 + 4×5 cleaning, no throughput term
        let minutes = op.calculate_time(&ctx(500), None).unwrap();
        assert_eq!(minutes, 35);
    }

    #[test]
    fn zero_throughput_skips_the_term() {
        let mut op = plain_snapshot();
        op.sheets_per_minute = 0;

        let minutes = op.calculate_time(&ctx(500), None).unwrap();
        assert_eq!(minutes, 15);
    }

    #[test]
    fn time_truncates_to_whole_minutes() {
        let mut op = plain_snapshot();
        op.sheets_per_minute = 7;

        // 500 / 7 = 71.43 → 15 + 71
        let minutes = op.calculate_time(&ctx(500), None).unwrap();
        assert_eq!(minutes, 86);
    }

    #[test]
    fn override_parsing_rejects_both_keys() {
        let err = serde_json::from_str::<StepOverride>(r#"{"cut_pieces": 4, "divide_by": 2}"#);
        assert!(err.is_err());
    }

    #[test]
    fn override_parsing_rejects_empty_object() {
        assert!(serde_json::from_str::<StepOverride>("{}").is_err());
    }

    #[test]
    fn override_round_trips_through_json() {
        let ovr = StepOverride::CutInto { pieces: 4 };
        let json = serde_json::to_value(ovr).unwrap();
        assert_eq!(json, serde_json::json!({"cut_pieces": 4}));
        let back: StepOverride = serde_json::from_value(json).unwrap();
        assert_eq!(back, ovr);
    }
}

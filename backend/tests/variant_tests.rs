//! Quantity-variant tests for the Print Shop Estimation Platform
//!
//! Variants are pure re-runs of the engine at alternate quantities; nothing
//! they do may leak back into the primary parameters.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::estimation::{estimate, estimate_variant, JobParameters, SequencedStep};
use shared::models::operation::{OperationSnapshot, StepOverride};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn printing_and_cutting() -> Vec<SequencedStep> {
    let printing = OperationSnapshot {
        operation_name: "Offset printing".to_string(),
        makeready_price: dec("40.00"),
        price_per_sheet: dec("0.04"),
        plate_price: dec("12.00"),
        base_waste_sheets: 20,
        waste_percentage: dec("0.01"),
        makeready_time_minutes: 20,
        cleaning_time_minutes: 5,
        sheets_per_minute: 120,
        divides_quantity_by: 1,
        multiplies_quantity_by: 1,
        uses_colors: true,
        uses_front_colors_only: false,
    };
    let cutting = OperationSnapshot {
        operation_name: "Cutting".to_string(),
        makeready_price: dec("10.00"),
        price_per_sheet: dec("0.01"),
        plate_price: Decimal::ZERO,
        base_waste_sheets: 5,
        waste_percentage: Decimal::ZERO,
        makeready_time_minutes: 10,
        cleaning_time_minutes: 0,
        sheets_per_minute: 200,
        divides_quantity_by: 1,
        multiplies_quantity_by: 1,
        uses_colors: false,
        uses_front_colors_only: false,
    };

    vec![
        SequencedStep {
            sequence_order: 1,
            snapshot: printing,
            parameters: None,
        },
        SequencedStep {
            sequence_order: 2,
            snapshot: cutting,
            parameters: Some(StepOverride::CutInto { pieces: 2 }),
        },
    ]
}

fn params(quantity: u64) -> JobParameters {
    JobParameters {
        quantity,
        n_up: 2,
        colors_front: 4,
        colors_back: 0,
        parts_of_selling_size: 1,
        selling_size_area_m2: dec("0.5"),
        paper_weight_gsm: 130,
        paper_price_per_kg: dec("3.20"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A variant run never mutates the parameters it was derived from
    #[test]
    fn variant_leaves_primary_parameters_untouched(
        primary in 100u64..50_000,
        alternate in 100u64..50_000,
    ) {
        let steps = printing_and_cutting();
        let p = params(primary);
        let before = p.clone();

        let _ = estimate_variant(&p, alternate, &steps);

        prop_assert_eq!(p.quantity, before.quantity);
        prop_assert_eq!(p.n_up, before.n_up);
        prop_assert_eq!(p.paper_price_per_kg, before.paper_price_per_kg);
    }

    /// A variant at the primary quantity reproduces the primary estimate
    #[test]
    fn variant_at_primary_quantity_matches_estimate(
        quantity in 100u64..50_000,
    ) {
        let steps = printing_and_cutting();
        let p = params(quantity);

        let full = estimate(&p, &steps).unwrap();
        let variant = estimate_variant(&p, quantity, &steps).unwrap();

        prop_assert_eq!(variant.total_cost, full.total_cost);
        prop_assert_eq!(variant.paper_cost, full.paper.paper_cost);
        prop_assert_eq!(variant.operations_cost, full.operations_cost);
        prop_assert_eq!(variant.total_time_minutes, full.total_time_minutes);
        prop_assert_eq!(variant.sheets_to_buy, full.paper.sheets_to_buy);
    }

    /// Cost per piece times quantity recovers the total cost
    #[test]
    fn cost_per_piece_is_total_over_quantity(
        quantity in 100u64..50_000,
    ) {
        let steps = printing_and_cutting();
        let variant = estimate_variant(&params(1000), quantity, &steps).unwrap();

        prop_assert_eq!(
            variant.cost_per_piece,
            variant.total_cost / Decimal::from(quantity)
        );
    }
}

// ============================================================================
// Unit tests
// ============================================================================

#[test]
fn larger_runs_cost_less_per_piece() {
    // Makeready is fixed, so unit cost falls as the run grows.
    let steps = printing_and_cutting();
    let p = params(1000);

    let small = estimate_variant(&p, 500, &steps).unwrap();
    let large = estimate_variant(&p, 5000, &steps).unwrap();

    assert!(large.cost_per_piece < small.cost_per_piece);
}

#[test]
fn variant_failure_does_not_poison_later_runs() {
    // The multiplier deflates the purchase below the printing step's own
    // waste, so this variant run fails.
    let mut steps = printing_and_cutting();
    steps[0].snapshot.base_waste_sheets = 600;
    steps[0].snapshot.multiplies_quantity_by = 4;

    let p = params(1000);
    assert!(estimate_variant(&p, 10, &steps).is_err());

    // The same parameters still work with a sane sequence.
    let sane = printing_and_cutting();
    assert!(estimate_variant(&p, 10, &sane).is_ok());
}

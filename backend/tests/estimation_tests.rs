//! Estimation engine tests for the Print Shop Estimation Platform
//!
//! Property tests over the pure engine: paper planning, the backward waste
//! pass and the forward fold over the operation sequence.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::estimation::{estimate, plan_paper, JobParameters, SequencedStep};
use shared::models::operation::OperationSnapshot;

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn snapshot(
    name: &str,
    base_waste: u32,
    waste_percent: u32,
    transform: (u32, u32),
    uses_colors: bool,
) -> OperationSnapshot {
    OperationSnapshot {
        operation_name: name.to_string(),
        makeready_price: dec("25.00"),
        price_per_sheet: dec("0.05"),
        plate_price: dec("12.00"),
        base_waste_sheets: base_waste,
        waste_percentage: Decimal::from(waste_percent) / Decimal::from(100),
        makeready_time_minutes: 15,
        cleaning_time_minutes: 5,
        sheets_per_minute: 60,
        divides_quantity_by: transform.0,
        multiplies_quantity_by: transform.1,
        uses_colors,
        uses_front_colors_only: false,
    }
}

fn params(quantity: u64, n_up: u32, parts: u32) -> JobParameters {
    JobParameters {
        quantity,
        n_up,
        colors_front: 4,
        colors_back: 1,
        parts_of_selling_size: parts,
        selling_size_area_m2: dec("0.5"),
        paper_weight_gsm: 80,
        paper_price_per_kg: dec("2.50"),
    }
}

/// Strategy for one operation step, biased toward realistic configurations
fn arb_step(order: u32) -> impl Strategy<Value = SequencedStep> {
    (
        0u32..30,
        0u32..4,
        prop_oneof![
            Just((1u32, 1u32)),
            (2u32..5).prop_map(|d| (d, 1)),
            (2u32..5).prop_map(|m| (1, m)),
        ],
        any::<bool>(),
    )
        .prop_map(move |(base_waste, waste_percent, transform, uses_colors)| SequencedStep {
            sequence_order: order,
            snapshot: snapshot("Operation", base_waste, waste_percent, transform, uses_colors),
            parameters: None,
        })
}

fn arb_sequence() -> impl Strategy<Value = Vec<SequencedStep>> {
    prop::collection::vec(arb_step(0), 1..5).prop_map(|mut steps| {
        for (index, step) in steps.iter_mut().enumerate() {
            step.sequence_order = index as u32 + 1;
        }
        steps
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The print run is the smallest sheet count that yields the quantity
    #[test]
    fn print_run_is_minimal_cover(
        quantity in 1u64..500_000,
        n_up in 1u32..32,
    ) {
        let plan = plan_paper(&params(quantity, n_up, 1), &[]);

        prop_assert!(plan.print_run * u64::from(n_up) >= quantity);
        prop_assert!((plan.print_run - 1) * u64::from(n_up) < quantity);
    }

    /// Purchased parent sheets always cover the print run plus the waste
    /// allowance, whatever the nesting factor
    #[test]
    fn purchase_covers_print_run_and_waste(
        quantity in 1u64..200_000,
        n_up in 1u32..16,
        parts in 1u32..12,
        steps in arb_sequence(),
    ) {
        let plan = plan_paper(&params(quantity, n_up, parts), &steps);

        prop_assert!(
            plan.sheets_to_buy * u64::from(parts) >= plan.print_run + plan.waste_sheets,
            "bought {} x {} parts < print run {} + waste {}",
            plan.sheets_to_buy, parts, plan.print_run, plan.waste_sheets
        );
    }

    /// Paper cost scales linearly with the purchase
    #[test]
    fn paper_cost_follows_weight(
        quantity in 1u64..200_000,
        n_up in 1u32..16,
    ) {
        let p = params(quantity, n_up, 1);
        let plan = plan_paper(&p, &[]);

        let expected_weight = p.selling_size_area_m2
            * Decimal::from(p.paper_weight_gsm)
            * Decimal::from(plan.sheets_to_buy)
            / Decimal::from(1000);
        prop_assert_eq!(plan.paper_weight_kg, expected_weight);
        prop_assert_eq!(plan.paper_cost, expected_weight * p.paper_price_per_kg);
    }

    /// Running the engine twice over unchanged inputs gives identical results,
    /// success or failure
    #[test]
    fn estimate_is_deterministic(
        quantity in 1u64..100_000,
        n_up in 1u32..8,
        steps in arb_sequence(),
    ) {
        let p = params(quantity, n_up, 1);

        let first = estimate(&p, &steps);
        let second = estimate(&p, &steps);
        prop_assert_eq!(first, second);
    }

    /// Each step hands exactly its output quantity to the next one
    #[test]
    fn quantity_threads_through_the_sequence(
        quantity in 1u64..100_000,
        n_up in 1u32..8,
        steps in arb_sequence(),
    ) {
        let p = params(quantity, n_up, 1);

        if let Ok(result) = estimate(&p, &steps) {
            prop_assert_eq!(result.steps[0].quantity_before, result.paper.sheets_to_buy);
            for pair in result.steps.windows(2) {
                prop_assert_eq!(pair[0].quantity_after, pair[1].quantity_before);
            }
        }
    }

    /// Totals are the sum of the parts
    #[test]
    fn totals_add_up(
        quantity in 1u64..100_000,
        n_up in 1u32..8,
        steps in arb_sequence(),
    ) {
        let p = params(quantity, n_up, 1);

        if let Ok(result) = estimate(&p, &steps) {
            let step_costs: Decimal = result.steps.iter().map(|s| s.total_cost).sum();
            let step_minutes: u64 = result
                .steps
                .iter()
                .map(|s| u64::from(s.total_time_minutes))
                .sum();

            prop_assert_eq!(result.operations_cost, step_costs);
            prop_assert_eq!(result.total_time_minutes, step_minutes);
            prop_assert_eq!(
                result.total_material_cost,
                result.operations_cost + result.paper.paper_cost
            );
            prop_assert_eq!(
                result.total_cost,
                result.total_material_cost
                    + result.total_labor_cost
                    + result.total_outsourcing_cost
            );
        }
    }
}

// ============================================================================
// Unit tests
// ============================================================================

#[test]
fn reference_scenario_quantity_1000_two_up() {
    // 1000 pieces at 2-up, one die-cutting step with 30 base waste sheets:
    // print run 500, buy 530, process 560, deliver 500.
    let steps = vec![SequencedStep {
        sequence_order: 1,
        snapshot: snapshot("Die-cutting", 30, 0, (1, 1), false),
        parameters: None,
    }];
    let p = params(1000, 2, 1);

    let result = estimate(&p, &steps).unwrap();
    assert_eq!(result.paper.print_run, 500);
    assert_eq!(result.paper.sheets_to_buy, 530);
    assert_eq!(result.steps[0].processing_quantity, 560);
    assert_eq!(result.steps[0].quantity_after, 500);
}

#[test]
fn binding_inflates_purchase_then_delivers_the_target() {
    // A 4-page binding needs four sheets per finished unit, so the purchase
    // is four times the print run.
    let steps = vec![SequencedStep {
        sequence_order: 1,
        snapshot: snapshot("Binding", 0, 0, (4, 1), false),
        parameters: None,
    }];
    let p = params(1000, 2, 1);

    let result = estimate(&p, &steps).unwrap();
    assert_eq!(result.paper.sheets_to_buy, 2000);
    assert_eq!(result.steps[0].quantity_after, 500);
}

#[test]
fn empty_sequence_reports_a_configuration_failure() {
    let err = estimate(&params(1000, 2, 1), &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "No operations defined for this job. Please add operations first."
    );
}

#[test]
fn failing_step_is_named_in_the_error() {
    // A multiplying step deflates the backward requirement below the print
    // run, so the purchase cannot provision its waste.
    let steps = vec![SequencedStep {
        sequence_order: 1,
        snapshot: snapshot("Laminating", 600, 0, (1, 4), false),
        parameters: None,
    }];

    let err = estimate(&params(1000, 2, 1), &steps).unwrap_err();
    assert!(err.to_string().contains("\"Laminating\""));
}

#[test]
fn transform_free_waste_is_provisioned_not_fatal() {
    // Without a transform the backward pass adds the full waste to the
    // purchase, so even an extreme allowance survives the forward fold.
    let steps = vec![SequencedStep {
        sequence_order: 1,
        snapshot: snapshot("Laminating", 1_000_000, 0, (1, 1), false),
        parameters: None,
    }];

    let result = estimate(&params(1000, 2, 1), &steps).unwrap();
    assert_eq!(result.paper.sheets_to_buy, 1_000_500);
    assert_eq!(result.steps[0].quantity_after, 500);
}

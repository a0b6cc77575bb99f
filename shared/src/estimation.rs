//! Sequential estimation engine.
//!
//! Pure functions over job parameters and an ordered operation sequence.
//! The backend wraps these with persistence; keeping the engine free of
//! I/O and instance state means the same code serves the primary job
//! calculation, the backward purchase estimate and every quantity variant.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::operation::{
    CostOutcome, FormulaError, JobContext, OperationSnapshot, StepOverride,
};

/// Everything the engine needs to know about a job, detached from storage.
#[derive(Debug, Clone)]
pub struct JobParameters {
    /// Target output quantity
    pub quantity: u64,
    /// Items per printing sheet
    pub n_up: u32,
    pub colors_front: u32,
    pub colors_back: u32,
    /// Printing sheets cut from one purchased parent sheet
    pub parts_of_selling_size: u32,
    /// Area of the purchased parent sheet in m²
    pub selling_size_area_m2: Decimal,
    pub paper_weight_gsm: u32,
    pub paper_price_per_kg: Decimal,
}

impl JobParameters {
    /// Same parameters at a different target quantity, for variant runs.
    pub fn at_quantity(&self, quantity: u64) -> JobParameters {
        JobParameters {
            quantity,
            ..self.clone()
        }
    }
}

/// One entry of the ordered operation sequence as the engine sees it.
#[derive(Debug, Clone)]
pub struct SequencedStep {
    pub sequence_order: u32,
    pub snapshot: OperationSnapshot,
    pub parameters: Option<StepOverride>,
}

/// Output of the paper-requirement phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperPlan {
    /// Sheets to print before operation waste: ceil(quantity / n_up)
    pub print_run: u64,
    /// Waste allowance from the backward pass
    pub waste_sheets: u64,
    /// Parent sheets to purchase
    pub sheets_to_buy: u64,
    pub paper_weight_kg: Decimal,
    pub paper_cost: Decimal,
}

/// Per-step results carried in a successful estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub sequence_order: u32,
    pub operation_name: String,
    pub quantity_before: u64,
    pub quantity_after: u64,
    pub waste_sheets: u64,
    pub processing_quantity: u64,
    pub total_cost: Decimal,
    pub total_time_minutes: u32,
    pub colors_used: u32,
}

/// A complete, successful estimate for one quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub paper: PaperPlan,
    pub steps: Vec<StepOutcome>,
    pub operations_cost: Decimal,
    pub total_material_cost: Decimal,
    /// Reserved for future formula types, currently always zero
    pub total_labor_cost: Decimal,
    /// Reserved for future formula types, currently always zero
    pub total_outsourcing_cost: Decimal,
    pub total_cost: Decimal,
    pub total_time_minutes: u64,
    pub total_time_formatted: String,
}

/// Structured estimation failure. Neither case is a programming error; both
/// are reported to the caller as a result payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    #[error("No operations defined for this job. Please add operations first.")]
    NoOperations,

    #[error("Error calculating operation \"{operation}\": {source}")]
    Step {
        operation: String,
        #[source]
        source: FormulaError,
    },
}

/// Compute the paper requirements for a job.
///
/// The purchase quantity must cover not only the print run but also the
/// waste every downstream operation will consume, so the sequence is walked
/// backward first (see [`estimate_waste_allowance`]).
pub fn plan_paper(params: &JobParameters, steps: &[SequencedStep]) -> PaperPlan {
    let print_run = div_ceil(params.quantity, u64::from(params.n_up.max(1)));
    let waste_sheets = estimate_waste_allowance(params, print_run, steps);
    let total_printing_sheets = print_run + waste_sheets;
    let sheets_to_buy = div_ceil(
        total_printing_sheets,
        u64::from(params.parts_of_selling_size.max(1)),
    );

    let paper_weight_kg = params.selling_size_area_m2
        * Decimal::from(params.paper_weight_gsm)
        * Decimal::from(sheets_to_buy)
        / Decimal::from(1000);
    let paper_cost = paper_weight_kg * params.paper_price_per_kg;

    PaperPlan {
        print_run,
        waste_sheets,
        sheets_to_buy,
        paper_weight_kg,
        paper_cost,
    }
}

/// Walk the sequence in reverse to find how many extra sheets must enter the
/// first operation for `print_run` sheets to survive the whole chain.
///
/// Each step's waste is added to the running requirement, then the step's
/// static quantity transform is inverted: an operation that divides forward
/// multiplies the requirement backward and vice versa. With no operations a
/// flat 5% allowance is used.
///
/// The percentage base stays the print run even though the purchase estimate
/// itself adds a waste allowance on top of it; the forward pass deducts the
/// same per-step waste again. That mirrors the shop's established accounting
/// and is deliberately left as-is.
pub fn estimate_waste_allowance(
    params: &JobParameters,
    print_run: u64,
    steps: &[SequencedStep],
) -> u64 {
    if steps.is_empty() {
        return print_run / 20;
    }

    let mut current = print_run;
    for step in steps.iter().rev() {
        let snapshot = &step.snapshot;
        // Waste depends only on the print run and colors, so the running
        // requirement stands in for the current quantity here.
        let ctx = JobContext {
            quantity: params.quantity,
            n_up: params.n_up,
            colors_front: params.colors_front,
            colors_back: params.colors_back,
            print_run,
            current_quantity: current,
        };
        let waste = snapshot.waste_sheets(&ctx).unwrap_or(0);
        current += waste;

        if snapshot.divides_quantity_by > 1 {
            current *= u64::from(snapshot.divides_quantity_by);
        } else if snapshot.multiplies_quantity_by > 1 {
            current /= u64::from(snapshot.multiplies_quantity_by);
        }
    }

    current.saturating_sub(print_run)
}

/// Run the full estimate: paper phase, then a forward fold over the ordered
/// operation sequence, threading the running quantity and totals explicitly.
pub fn estimate(params: &JobParameters, steps: &[SequencedStep]) -> Result<Estimate, EstimateError> {
    let paper = plan_paper(params, steps);

    if steps.is_empty() {
        return Err(EstimateError::NoOperations);
    }

    let mut current_quantity = paper.sheets_to_buy;
    let mut operations_cost = Decimal::ZERO;
    let mut total_minutes: u64 = 0;
    let mut outcomes = Vec::with_capacity(steps.len());

    for step in steps {
        let ctx = JobContext {
            quantity: params.quantity,
            n_up: params.n_up,
            colors_front: params.colors_front,
            colors_back: params.colors_back,
            print_run: paper.print_run,
            current_quantity,
        };

        let step_error = |source| EstimateError::Step {
            operation: step.snapshot.operation_name.clone(),
            source,
        };

        let CostOutcome {
            total_cost,
            waste_sheets,
            processing_quantity,
            quantity_after,
        } = step
            .snapshot
            .calculate_cost(&ctx, step.parameters)
            .map_err(step_error)?;
        // Same context for both evaluations so waste and processing agree.
        let minutes = step
            .snapshot
            .calculate_time(&ctx, step.parameters)
            .map_err(step_error)?;

        let colors_used = if step.snapshot.uses_colors {
            params.colors_front + params.colors_back
        } else {
            0
        };

        outcomes.push(StepOutcome {
            sequence_order: step.sequence_order,
            operation_name: step.snapshot.operation_name.clone(),
            quantity_before: current_quantity,
            quantity_after,
            waste_sheets,
            processing_quantity,
            total_cost,
            total_time_minutes: minutes,
            colors_used,
        });

        operations_cost += total_cost;
        total_minutes += u64::from(minutes);
        current_quantity = quantity_after;
    }

    let total_material_cost = operations_cost + paper.paper_cost;
    let total_labor_cost = Decimal::ZERO;
    let total_outsourcing_cost = Decimal::ZERO;
    let total_cost = total_material_cost + total_labor_cost + total_outsourcing_cost;

    Ok(Estimate {
        paper,
        steps: outcomes,
        operations_cost,
        total_material_cost,
        total_labor_cost,
        total_outsourcing_cost,
        total_cost,
        total_time_minutes: total_minutes,
        total_time_formatted: format_minutes(total_minutes),
    })
}

/// Result bundle for one quantity variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEstimate {
    pub quantity: u64,
    pub total_cost: Decimal,
    pub paper_cost: Decimal,
    pub operations_cost: Decimal,
    pub cost_per_piece: Decimal,
    pub total_time_minutes: u64,
    pub print_run: u64,
    pub waste_sheets: u64,
    pub sheets_to_buy: u64,
    pub paper_weight_kg: Decimal,
    pub steps: Vec<StepOutcome>,
}

/// Re-run the engine at an alternate quantity.
///
/// Operates on a value copy of the parameters, so the job the caller loaded
/// them from is never touched, even when the calculation fails partway.
pub fn estimate_variant(
    params: &JobParameters,
    quantity: u64,
    steps: &[SequencedStep],
) -> Result<VariantEstimate, EstimateError> {
    let variant_params = params.at_quantity(quantity);
    let result = estimate(&variant_params, steps)?;

    let cost_per_piece = if quantity > 0 {
        result.total_cost / Decimal::from(quantity)
    } else {
        Decimal::ZERO
    };

    Ok(VariantEstimate {
        quantity,
        total_cost: result.total_cost,
        paper_cost: result.paper.paper_cost,
        operations_cost: result.operations_cost,
        cost_per_piece,
        total_time_minutes: result.total_time_minutes,
        print_run: result.paper.print_run,
        waste_sheets: result.paper.waste_sheets,
        sheets_to_buy: result.paper.sheets_to_buy,
        paper_weight_kg: result.paper.paper_weight_kg,
        steps: result.steps,
    })
}

/// Human-readable duration: "45 minutes", "2 hours", "1h 30m".
pub fn format_minutes(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{} minutes", minutes);
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining == 0 {
        format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else {
        format!("{}h {}m", hours, remaining)
    }
}

fn div_ceil(value: u64, divisor: u64) -> u64 {
    value / divisor + u64::from(value % divisor > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn snapshot(name: &str) -> OperationSnapshot {
        OperationSnapshot {
            operation_name: name.to_string(),
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

    fn step(order: u32, snapshot: OperationSnapshot) -> SequencedStep {
        SequencedStep {
            sequence_order: order,
            snapshot,
            parameters: None,
        }
    }

    fn params(quantity: u64) -> JobParameters {
        JobParameters {
            quantity,
            n_up: 2,
            colors_front: 4,
            colors_back: 1,
            parts_of_selling_size: 1,
            selling_size_area_m2: dec("0.5"),
            paper_weight_gsm: 80,
            paper_price_per_kg: dec("2.50"),
        }
    }

    #[test]
    fn empty_sequence_uses_flat_five_percent_waste() {
        let plan = plan_paper(&params(1000), &[]);
        assert_eq!(plan.print_run, 500);
        assert_eq!(plan.waste_sheets, 25);
        assert_eq!(plan.sheets_to_buy, 525);
    }

    #[test]
    fn end_to_end_single_operation_scenario() {
        // quantity 1000, n_up 2 → print run 500; one operation with 30 base
        // waste sheets and no transform.
        let mut op = snapshot("Die-cutting");
        op.base_waste_sheets = 30;

        let steps = vec![step(1, op)];
        let p = params(1000);

        let plan = plan_paper(&p, &steps);
        assert_eq!(plan.print_run, 500);
        assert_eq!(plan.waste_sheets, 30);
        assert_eq!(plan.sheets_to_buy, 530);

        let result = estimate(&p, &steps).unwrap();
        let s = &result.steps[0];
        assert_eq!(s.quantity_before, 530);
        assert_eq!(s.waste_sheets, 30);
        assert_eq!(s.processing_quantity, 560);
        // 530 - 30 lands exactly back on the print run
        assert_eq!(s.quantity_after, 500);
        assert_eq!(s.total_cost, dec("25.00") + Decimal::from(560) * dec("0.05"));
    }

    #[test]
    fn backward_pass_inflates_purchase_for_dividing_operations() {
        // Binding 4 pages into 1 unit: to deliver 500 after the division,
        // 2000 sheets must enter it.
        let mut binder = snapshot("Binding");
        binder.divides_quantity_by = 4;

        let p = params(1000);
        let steps = vec![step(1, binder)];
        let plan = plan_paper(&p, &steps);

        assert_eq!(plan.print_run, 500);
        assert_eq!(plan.waste_sheets, 1500);
        assert_eq!(plan.sheets_to_buy, 2000);

        let result = estimate(&p, &steps).unwrap();
        assert_eq!(result.steps[0].quantity_after, 500);
    }

    #[test]
    fn backward_pass_deflates_purchase_for_multiplying_operations() {
        let mut cutter = snapshot("Cutting");
        cutter.multiplies_quantity_by = 4;

        let p = params(1000);
        let steps = vec![step(1, cutter)];
        let plan = plan_paper(&p, &steps);

        // The backward division would call for only 125 starting sheets, but
        // the purchase never drops below the print run itself.
        assert_eq!(plan.waste_sheets, 0);
        assert_eq!(plan.sheets_to_buy, 500);
    }

    #[test]
    fn parent_sheet_nesting_rounds_purchase_up() {
        let mut p = params(1000);
        p.parts_of_selling_size = 4;

        let mut op = snapshot("Printing");
        op.base_waste_sheets = 30;
        let plan = plan_paper(&p, &[step(1, op)]);

        // ceil(530 / 4) = 133 parent sheets
        assert_eq!(plan.sheets_to_buy, 133);
    }

    #[test]
    fn paper_weight_and_cost_follow_the_purchase() {
        let plan = plan_paper(&params(1000), &[]);
        // 0.5 m² × 80 gsm × 525 sheets / 1000 = 21 kg, at 2.50/kg
        assert_eq!(plan.paper_weight_kg, dec("21.0"));
        assert_eq!(plan.paper_cost, dec("52.5"));
    }

    #[test]
    fn no_operations_is_a_structured_failure() {
        let err = estimate(&params(1000), &[]).unwrap_err();
        assert_eq!(err, EstimateError::NoOperations);
    }

    #[test]
    fn step_failure_names_the_operation() {
        // The multiplier deflates the backward requirement below the print
        // run, so the purchase cannot cover this step's waste.
        let mut op = snapshot("Laminating");
        op.base_waste_sheets = 600;
        op.multiplies_quantity_by = 4;

        let err = estimate(&params(1000), &[step(1, op)]).unwrap_err();
        match err {
            EstimateError::Step { operation, .. } => assert_eq!(operation, "Laminating"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn backward_pass_provisions_transform_free_waste() {
        // Without a transform the purchase absorbs even extreme waste, so
        // the forward pass lands exactly back on the print run.
        let mut op = snapshot("Laminating");
        op.base_waste_sheets = 100_000;

        let result = estimate(&params(1000), &[step(1, op)]).unwrap();
        assert_eq!(result.paper.sheets_to_buy, 100_500);
        assert_eq!(result.steps[0].quantity_after, 500);
    }

    #[test]
    fn estimate_is_idempotent_for_unchanged_inputs() {
        let mut printing = snapshot("Offset printing");
        printing.uses_colors = true;
        printing.plate_price = dec("12.00");
        printing.base_waste_sheets = 20;
        printing.waste_percentage = dec("0.01");
        let mut cutting = snapshot("Cutting");
        cutting.multiplies_quantity_by = 2;

        let steps = vec![step(1, printing), step(2, cutting)];
        let p = params(1000);

        let first = estimate(&p, &steps).unwrap();
        let second = estimate(&p, &steps).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn quantity_threads_forward_between_steps() {
        let mut cutter = snapshot("Cutting");
        cutter.multiplies_quantity_by = 2;
        let trimmer = snapshot("Trimming");

        let result = estimate(&params(1000), &[step(1, cutter), step(2, trimmer)]).unwrap();
        assert_eq!(result.steps[0].quantity_after, result.steps[1].quantity_before);
    }

    #[test]
    fn variant_run_leaves_parameters_untouched() {
        let steps = vec![step(1, snapshot("Printing"))];
        let p = params(1000);

        let variant = estimate_variant(&p, 2000, &steps).unwrap();
        assert_eq!(variant.quantity, 2000);
        assert_eq!(variant.print_run, 1000);
        // The caller's parameters still describe the primary quantity.
        assert_eq!(p.quantity, 1000);
    }

    #[test]
    fn variant_cost_per_piece() {
        let steps = vec![step(1, snapshot("Printing"))];
        let variant = estimate_variant(&params(1000), 2000, &steps).unwrap();
        assert_eq!(
            variant.cost_per_piece,
            variant.total_cost / Decimal::from(2000)
        );
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_minutes(45), "45 minutes");
        assert_eq!(format_minutes(60), "1 hour");
        assert_eq!(format_minutes(120), "2 hours");
        assert_eq!(format_minutes(90), "1h 30m");
    }
}

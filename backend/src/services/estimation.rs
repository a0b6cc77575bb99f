//! Estimation service: persistence wrapper around the pure engine
//!
//! Engine failures (no operations, a step consuming more than it receives)
//! are business outcomes, not HTTP errors; they come back as structured
//! result payloads and leave the job's status untouched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::job::{JobRow, JobVariantRow};
use shared::estimation::{
    estimate, estimate_variant, plan_paper, Estimate, JobParameters, SequencedStep,
    VariantEstimate,
};
use shared::models::job::{Job, JobVariant};
use shared::models::operation::{OperationSnapshot, StepOverride};

/// Estimation service running the engine against persisted jobs
#[derive(Clone)]
pub struct EstimationService {
    db: PgPool,
}

/// Outcome of a full job calculation
#[derive(Debug, Serialize)]
pub struct CalculationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<Estimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
}

/// Outcome of a single variant preview
#[derive(Debug, Serialize)]
pub struct VariantResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantEstimate>,
}

/// Outcome of a calculate-all-variants run; partial failure is reported,
/// not fatal
#[derive(Debug, Serialize)]
pub struct VariantBatchResult {
    pub variants: Vec<JobVariant>,
    pub failed: Vec<FailedVariant>,
}

/// One quantity the batch run could not estimate
#[derive(Debug, Serialize)]
pub struct FailedVariant {
    pub quantity: u32,
    pub error: String,
}

/// Input for a variant preview
#[derive(Debug, Deserialize)]
pub struct VariantPreviewInput {
    pub quantity: u32,
}

/// Input for a calculate-all-variants run
#[derive(Debug, Deserialize)]
pub struct CalculateVariantsInput {
    pub quantities: Vec<u32>,
}

/// Joined row: a job operation with the current constants of its master
/// operation, used to refresh the frozen snapshot on recalculation
#[derive(Debug, sqlx::FromRow)]
struct StepRow {
    id: Uuid,
    sequence_order: i32,
    parameters: Option<serde_json::Value>,
    operation_name: String,
    makeready_price: Decimal,
    price_per_sheet: Decimal,
    plate_price: Decimal,
    base_waste_sheets: i32,
    waste_percentage: Decimal,
    makeready_time_minutes: i32,
    cleaning_time_minutes: i32,
    sheets_per_minute: i32,
    divides_quantity_by: i32,
    multiplies_quantity_by: i32,
    uses_colors: bool,
    uses_front_colors_only: bool,
}

impl StepRow {
    fn snapshot(&self) -> OperationSnapshot {
        OperationSnapshot {
            operation_name: self.operation_name.clone(),
            makeready_price: self.makeready_price,
            price_per_sheet: self.price_per_sheet,
            plate_price: self.plate_price,
            base_waste_sheets: self.base_waste_sheets as u32,
            waste_percentage: self.waste_percentage,
            makeready_time_minutes: self.makeready_time_minutes as u32,
            cleaning_time_minutes: self.cleaning_time_minutes as u32,
            sheets_per_minute: self.sheets_per_minute as u32,
            divides_quantity_by: self.divides_quantity_by as u32,
            multiplies_quantity_by: self.multiplies_quantity_by as u32,
            uses_colors: self.uses_colors,
            uses_front_colors_only: self.uses_front_colors_only,
        }
    }

    fn sequenced_step(&self) -> SequencedStep {
        let parameters: Option<StepOverride> = self
            .parameters
            .clone()
            .and_then(|value| serde_json::from_value(value).ok());
        SequencedStep {
            sequence_order: self.sequence_order as u32,
            snapshot: self.snapshot(),
            parameters,
        }
    }
}

impl EstimationService {
    /// Create a new EstimationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Run the full calculation for a job and persist the results.
    ///
    /// Paper figures are written even when the operation pass fails, matching
    /// how an estimator works: the purchase estimate stands on its own. On a
    /// successful pass every step's snapshot is refreshed from its master
    /// operation, per-step results and job totals are written, and the job
    /// moves to `calculated`.
    pub async fn calculate_job(&self, job_id: Uuid) -> AppResult<CalculationResult> {
        let mut tx = self.db.begin().await?;

        let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

        let params = self.load_parameters(&mut tx, &job).await?;
        let step_rows = self.load_steps(&mut tx, job_id).await?;
        let steps: Vec<SequencedStep> = step_rows.iter().map(StepRow::sequenced_step).collect();

        let plan = plan_paper(&params, &steps);
        sqlx::query(
            r#"
            UPDATE jobs SET
                print_run = $2, waste_sheets = $3, sheets_to_buy = $4,
                paper_weight_kg = $5, paper_cost = $6, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(plan.print_run as i32)
        .bind(plan.waste_sheets as i32)
        .bind(plan.sheets_to_buy as i32)
        .bind(plan.paper_weight_kg)
        .bind(plan.paper_cost)
        .execute(&mut *tx)
        .await?;

        let result = match estimate(&params, &steps) {
            Err(err) => {
                // Keep the paper figures, report the failure, leave the
                // status alone.
                tx.commit().await?;
                tracing::info!(%job_id, error = %err, "Job calculation failed");
                return Ok(CalculationResult {
                    success: false,
                    error: Some(err.to_string()),
                    estimate: None,
                    job: None,
                });
            }
            Ok(result) => result,
        };

        for (row, outcome) in step_rows.iter().zip(&result.steps) {
            let snapshot = row.snapshot();
            sqlx::query(
                r#"
                UPDATE job_operations SET
                    operation_name = $2, makeready_price = $3, price_per_sheet = $4,
                    plate_price = $5, base_waste_sheets = $6, waste_percentage = $7,
                    makeready_time_minutes = $8, cleaning_time_minutes = $9,
                    sheets_per_minute = $10, divides_quantity_by = $11,
                    multiplies_quantity_by = $12, uses_colors = $13,
                    uses_front_colors_only = $14,
                    quantity_before = $15, quantity_after = $16, waste_sheets = $17,
                    processing_quantity = $18, total_cost = $19,
                    total_time_minutes = $20, colors_used = $21
                WHERE id = $1
                "#,
            )
            .bind(row.id)
            .bind(&snapshot.operation_name)
            .bind(snapshot.makeready_price)
            .bind(snapshot.price_per_sheet)
            .bind(snapshot.plate_price)
            .bind(snapshot.base_waste_sheets as i32)
            .bind(snapshot.waste_percentage)
            .bind(snapshot.makeready_time_minutes as i32)
            .bind(snapshot.cleaning_time_minutes as i32)
            .bind(snapshot.sheets_per_minute as i32)
            .bind(snapshot.divides_quantity_by as i32)
            .bind(snapshot.multiplies_quantity_by as i32)
            .bind(snapshot.uses_colors)
            .bind(snapshot.uses_front_colors_only)
            .bind(outcome.quantity_before as i32)
            .bind(outcome.quantity_after as i32)
            .bind(outcome.waste_sheets as i32)
            .bind(outcome.processing_quantity as i32)
            .bind(outcome.total_cost)
            .bind(outcome.total_time_minutes as i32)
            .bind(outcome.colors_used as i32)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs SET
                total_material_cost = $2, total_labor_cost = $3,
                total_outsourcing_cost = $4, total_cost = $5,
                total_time_minutes = $6,
                status = 'calculated', calculated_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(result.total_material_cost)
        .bind(result.total_labor_cost)
        .bind(result.total_outsourcing_cost)
        .bind(result.total_cost)
        .bind(result.total_time_minutes as i32)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(%job_id, total_cost = %result.total_cost, "Job calculated");

        Ok(CalculationResult {
            success: true,
            error: None,
            estimate: Some(result),
            job: Some(updated.into()),
        })
    }

    /// Preview the estimate at an alternate quantity without persisting
    /// anything. The stored job is never touched, even on failure.
    pub async fn calculate_variant(
        &self,
        job_id: Uuid,
        input: VariantPreviewInput,
    ) -> AppResult<VariantResult> {
        if input.quantity == 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be at least 1".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

        let params = self.load_parameters(&mut tx, &job).await?;
        let step_rows = self.load_steps(&mut tx, job_id).await?;
        let steps: Vec<SequencedStep> = step_rows.iter().map(StepRow::sequenced_step).collect();
        tx.commit().await?;

        Ok(match estimate_variant(&params, u64::from(input.quantity), &steps) {
            Ok(variant) => VariantResult {
                success: true,
                error: None,
                variant: Some(variant),
            },
            Err(err) => VariantResult {
                success: false,
                error: Some(err.to_string()),
                variant: None,
            },
        })
    }

    /// Recreate the job's saved variant table for the given quantities.
    /// Existing variants are replaced wholesale; quantities that fail are
    /// collected and reported alongside the successes.
    pub async fn calculate_all_variants(
        &self,
        job_id: Uuid,
        input: CalculateVariantsInput,
    ) -> AppResult<VariantBatchResult> {
        if input.quantities.is_empty() {
            return Err(AppError::ValidationError(
                "At least one quantity is required".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

        let params = self.load_parameters(&mut tx, &job).await?;
        let step_rows = self.load_steps(&mut tx, job_id).await?;
        let steps: Vec<SequencedStep> = step_rows.iter().map(StepRow::sequenced_step).collect();

        sqlx::query("DELETE FROM job_variants WHERE job_id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        let mut quantities = input.quantities;
        quantities.sort_unstable();
        quantities.dedup();

        let mut variants = Vec::new();
        let mut failed = Vec::new();

        for quantity in quantities {
            if quantity == 0 {
                failed.push(FailedVariant {
                    quantity,
                    error: "Quantity must be at least 1".to_string(),
                });
                continue;
            }

            match estimate_variant(&params, u64::from(quantity), &steps) {
                Ok(variant) => {
                    let row = sqlx::query_as::<_, JobVariantRow>(
                        r#"
                        INSERT INTO job_variants
                            (job_id, quantity, total_cost, paper_cost, operations_cost,
                             total_time_minutes, print_run, waste_sheets, sheets_to_buy,
                             paper_weight_kg)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                        RETURNING *
                        "#,
                    )
                    .bind(job_id)
                    .bind(quantity as i32)
                    .bind(variant.total_cost)
                    .bind(variant.paper_cost)
                    .bind(variant.operations_cost)
                    .bind(variant.total_time_minutes as i32)
                    .bind(variant.print_run as i32)
                    .bind(variant.waste_sheets as i32)
                    .bind(variant.sheets_to_buy as i32)
                    .bind(variant.paper_weight_kg)
                    .fetch_one(&mut *tx)
                    .await?;
                    variants.push(row.into());
                }
                Err(err) => failed.push(FailedVariant {
                    quantity,
                    error: err.to_string(),
                }),
            }
        }

        tx.commit().await?;
        tracing::info!(
            %job_id,
            saved = variants.len(),
            failed = failed.len(),
            "Variant table recalculated"
        );

        Ok(VariantBatchResult { variants, failed })
    }

    /// Assemble the engine's parameter bundle from the job and its catalog
    /// references
    async fn load_parameters(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: &JobRow,
    ) -> AppResult<JobParameters> {
        let (weight_gsm, price_per_kg, width_cm, height_cm) =
            sqlx::query_as::<_, (i32, Decimal, Decimal, Decimal)>(
                r#"
                SELECT pt.weight_gsm, pt.price_per_kg, ps.width_cm, ps.height_cm
                FROM paper_types pt, paper_sizes ps
                WHERE pt.id = $1 AND ps.id = $2
                "#,
            )
            .bind(job.paper_type_id)
            .bind(job.selling_size_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Paper catalog entry".to_string()))?;

        Ok(JobParameters {
            quantity: job.quantity as u64,
            n_up: job.n_up as u32,
            colors_front: job.colors_front as u32,
            colors_back: job.colors_back as u32,
            parts_of_selling_size: job.parts_of_selling_size as u32,
            selling_size_area_m2: width_cm * height_cm / Decimal::from(10_000),
            paper_weight_gsm: weight_gsm as u32,
            paper_price_per_kg: price_per_kg,
        })
    }

    /// Load the job's steps joined with the current master constants
    async fn load_steps(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
    ) -> AppResult<Vec<StepRow>> {
        let rows = sqlx::query_as::<_, StepRow>(
            r#"
            SELECT jo.id, jo.sequence_order, jo.parameters,
                   o.name AS operation_name,
                   o.makeready_price, o.price_per_sheet, o.plate_price,
                   o.base_waste_sheets, o.waste_percentage,
                   o.makeready_time_minutes, o.cleaning_time_minutes, o.sheets_per_minute,
                   o.divides_quantity_by, o.multiplies_quantity_by,
                   o.uses_colors, o.uses_front_colors_only
            FROM job_operations jo
            JOIN operations o ON o.id = jo.operation_id
            WHERE jo.job_id = $1
            ORDER BY jo.sequence_order
            "#,
        )
        .bind(job_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows)
    }
}

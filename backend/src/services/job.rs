//! Job management service: creation, templates, job numbers and the
//! status workflow

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::services::check_field;
use shared::models::job::{next_job_number, Job, JobOperation, JobStatus, JobVariant, OrderType};
use shared::models::operation::{OperationSnapshot, StepOverride};
use shared::validation::{
    validate_color_count, validate_custom_end_size, validate_n_up, validate_quantity,
};

/// Job service for managing estimation jobs and templates
#[derive(Clone)]
pub struct JobService {
    db: PgPool,
    job_number_retries: u32,
}

/// Database row for a job
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JobRow {
    pub id: Uuid,
    pub job_number: Option<String>,
    pub client_id: Uuid,
    pub order_type: String,
    pub order_name: String,
    pub quantity: i32,
    pub paper_type_id: Uuid,
    pub end_size_id: Option<Uuid>,
    pub custom_end_width_cm: Option<Decimal>,
    pub custom_end_height_cm: Option<Decimal>,
    pub printing_size_id: Uuid,
    pub selling_size_id: Uuid,
    pub parts_of_selling_size: i32,
    pub n_up: i32,
    pub colors_front: i32,
    pub colors_back: i32,
    pub special_colors: i32,
    pub notes: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub print_run: Option<i32>,
    pub waste_sheets: Option<i32>,
    pub sheets_to_buy: Option<i32>,
    pub paper_weight_kg: Option<Decimal>,
    pub paper_cost: Option<Decimal>,
    pub total_material_cost: Option<Decimal>,
    pub total_labor_cost: Option<Decimal>,
    pub total_outsourcing_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub total_time_minutes: Option<i32>,
    pub status: String,
    pub is_template: bool,
    pub template_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub calculated_at: Option<DateTime<Utc>>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            job_number: row.job_number,
            client_id: row.client_id,
            order_type: OrderType::from_str(&row.order_type).unwrap_or(OrderType::Other),
            order_name: row.order_name,
            quantity: row.quantity as u32,
            paper_type_id: row.paper_type_id,
            end_size_id: row.end_size_id,
            custom_end_width_cm: row.custom_end_width_cm,
            custom_end_height_cm: row.custom_end_height_cm,
            printing_size_id: row.printing_size_id,
            selling_size_id: row.selling_size_id,
            parts_of_selling_size: row.parts_of_selling_size as u32,
            n_up: row.n_up as u32,
            colors_front: row.colors_front as u32,
            colors_back: row.colors_back as u32,
            special_colors: row.special_colors as u32,
            notes: row.notes,
            deadline: row.deadline,
            print_run: row.print_run.map(|v| v as u32),
            waste_sheets: row.waste_sheets.map(|v| v as u32),
            sheets_to_buy: row.sheets_to_buy.map(|v| v as u32),
            paper_weight_kg: row.paper_weight_kg,
            paper_cost: row.paper_cost,
            total_material_cost: row.total_material_cost,
            total_labor_cost: row.total_labor_cost,
            total_outsourcing_cost: row.total_outsourcing_cost,
            total_cost: row.total_cost,
            total_time_minutes: row.total_time_minutes.map(|v| v as u32),
            status: JobStatus::from_str(&row.status).unwrap_or(JobStatus::Draft),
            is_template: row.is_template,
            template_name: row.template_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            calculated_at: row.calculated_at,
        }
    }
}

/// Database row for a job operation
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JobOperationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub operation_id: Uuid,
    pub sequence_order: i32,
    pub operation_name: String,
    pub makeready_price: Decimal,
    pub price_per_sheet: Decimal,
    pub plate_price: Decimal,
    pub base_waste_sheets: i32,
    pub waste_percentage: Decimal,
    pub makeready_time_minutes: i32,
    pub cleaning_time_minutes: i32,
    pub sheets_per_minute: i32,
    pub divides_quantity_by: i32,
    pub multiplies_quantity_by: i32,
    pub uses_colors: bool,
    pub uses_front_colors_only: bool,
    pub parameters: Option<serde_json::Value>,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub waste_sheets: i32,
    pub processing_quantity: i32,
    pub total_cost: Decimal,
    pub total_time_minutes: i32,
    pub colors_used: i32,
    pub created_at: DateTime<Utc>,
}

impl JobOperationRow {
    pub(crate) fn snapshot(&self) -> OperationSnapshot {
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

    pub(crate) fn override_parameters(&self) -> Option<StepOverride> {
        self.parameters
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

impl From<JobOperationRow> for JobOperation {
    fn from(row: JobOperationRow) -> Self {
        let snapshot = row.snapshot();
        let parameters = row.override_parameters();
        JobOperation {
            id: row.id,
            job_id: row.job_id,
            operation_id: row.operation_id,
            sequence_order: row.sequence_order as u32,
            snapshot,
            parameters,
            quantity_before: row.quantity_before as u32,
            quantity_after: row.quantity_after as u32,
            waste_sheets: row.waste_sheets as u32,
            processing_quantity: row.processing_quantity as u32,
            total_cost: row.total_cost,
            total_time_minutes: row.total_time_minutes as u32,
            colors_used: row.colors_used as u32,
            created_at: row.created_at,
        }
    }
}

/// Database row for a job variant
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JobVariantRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub quantity: i32,
    pub total_cost: Decimal,
    pub paper_cost: Decimal,
    pub operations_cost: Decimal,
    pub total_time_minutes: i32,
    pub print_run: i32,
    pub waste_sheets: i32,
    pub sheets_to_buy: i32,
    pub paper_weight_kg: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<JobVariantRow> for JobVariant {
    fn from(row: JobVariantRow) -> Self {
        JobVariant {
            id: row.id,
            job_id: row.job_id,
            quantity: row.quantity as u32,
            total_cost: row.total_cost,
            paper_cost: row.paper_cost,
            operations_cost: row.operations_cost,
            total_time_minutes: row.total_time_minutes as u32,
            print_run: row.print_run as u32,
            waste_sheets: row.waste_sheets as u32,
            sheets_to_buy: row.sheets_to_buy as u32,
            paper_weight_kg: row.paper_weight_kg,
            created_at: row.created_at,
        }
    }
}

/// Input for creating a job or template
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobInput {
    pub client_id: Uuid,
    pub order_type: OrderType,
    pub order_name: String,
    pub quantity: u32,
    pub paper_type_id: Uuid,
    pub end_size_id: Option<Uuid>,
    pub custom_end_width_cm: Option<Decimal>,
    pub custom_end_height_cm: Option<Decimal>,
    pub printing_size_id: Uuid,
    pub selling_size_id: Uuid,
    #[serde(default = "default_one")]
    pub parts_of_selling_size: u32,
    #[serde(default = "default_one")]
    pub n_up: u32,
    #[serde(default = "default_front_colors")]
    pub colors_front: u32,
    #[serde(default)]
    pub colors_back: u32,
    #[serde(default)]
    pub special_colors: u32,
    pub notes: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// Required when creating a template
    pub template_name: Option<String>,
}

fn default_one() -> u32 {
    1
}

fn default_front_colors() -> u32 {
    4
}

/// Overrides applied when instantiating a job from a template
#[derive(Debug, Deserialize)]
pub struct CreateFromTemplateInput {
    pub client_id: Option<Uuid>,
    pub order_name: Option<String>,
    pub quantity: Option<u32>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Input for updating job parameters; omitted fields keep their value
#[derive(Debug, Deserialize)]
pub struct UpdateJobInput {
    pub client_id: Option<Uuid>,
    pub order_type: Option<OrderType>,
    pub order_name: Option<String>,
    pub quantity: Option<u32>,
    pub paper_type_id: Option<Uuid>,
    pub end_size_id: Option<Uuid>,
    pub custom_end_width_cm: Option<Decimal>,
    pub custom_end_height_cm: Option<Decimal>,
    pub printing_size_id: Option<Uuid>,
    pub selling_size_id: Option<Uuid>,
    pub parts_of_selling_size: Option<u32>,
    pub n_up: Option<u32>,
    pub colors_front: Option<u32>,
    pub colors_back: Option<u32>,
    pub special_colors: Option<u32>,
    pub notes: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Input for a manual status transition
#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: JobStatus,
}

/// Query filter for job listings
#[derive(Debug, Default, Deserialize)]
pub struct JobListFilter {
    pub status: Option<JobStatus>,
    pub client_id: Option<Uuid>,
    pub order_type: Option<OrderType>,
}

impl JobService {
    /// Create a new JobService instance
    pub fn new(db: PgPool, job_number_retries: u32) -> Self {
        Self {
            db,
            job_number_retries,
        }
    }

    fn validate_input(input: &CreateJobInput) -> AppResult<()> {
        check_field("quantity", validate_quantity(input.quantity))?;
        check_field("n_up", validate_n_up(input.n_up))?;
        check_field("colors_front", validate_color_count(input.colors_front))?;
        check_field("colors_back", validate_color_count(input.colors_back))?;
        check_field(
            "custom_end_width_cm",
            validate_custom_end_size(input.custom_end_width_cm, input.custom_end_height_cm),
        )?;
        if input.parts_of_selling_size == 0 {
            return Err(AppError::Validation {
                field: "parts_of_selling_size".to_string(),
                message: "Parts of selling size must be at least 1".to_string(),
            });
        }
        if input.order_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "order_name".to_string(),
                message: "Order name is required".to_string(),
            });
        }
        Ok(())
    }

    /// Create a new job with an auto-generated year-scoped job number
    pub async fn create_job(&self, input: CreateJobInput) -> AppResult<Job> {
        Self::validate_input(&input)?;
        let row = self.insert_numbered_job(&input).await?;
        tracing::info!(job_number = ?row.job_number, "Created job");
        Ok(row.into())
    }

    /// Create a reusable template. Templates carry no job number and never
    /// enter the status workflow.
    pub async fn create_template(&self, input: CreateJobInput) -> AppResult<Job> {
        Self::validate_input(&input)?;
        let template_name = input
            .template_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::Validation {
                field: "template_name".to_string(),
                message: "Template name is required".to_string(),
            })?;

        let row = self
            .insert_job(None, &input, true, Some(&template_name))
            .await?;
        Ok(row.into())
    }

    /// Instantiate a new job from a template, applying the given overrides
    pub async fn create_from_template(
        &self,
        template_id: Uuid,
        input: CreateFromTemplateInput,
    ) -> AppResult<Job> {
        let template = self.fetch_row(template_id).await?;
        if !template.is_template {
            return Err(AppError::NotFound("Template".to_string()));
        }

        let job_input = CreateJobInput {
            client_id: input.client_id.unwrap_or(template.client_id),
            order_type: OrderType::from_str(&template.order_type).unwrap_or(OrderType::Other),
            order_name: input.order_name.unwrap_or_else(|| template.order_name.clone()),
            quantity: input.quantity.unwrap_or(template.quantity as u32),
            paper_type_id: template.paper_type_id,
            end_size_id: template.end_size_id,
            custom_end_width_cm: template.custom_end_width_cm,
            custom_end_height_cm: template.custom_end_height_cm,
            printing_size_id: template.printing_size_id,
            selling_size_id: template.selling_size_id,
            parts_of_selling_size: template.parts_of_selling_size as u32,
            n_up: template.n_up as u32,
            colors_front: template.colors_front as u32,
            colors_back: template.colors_back as u32,
            special_colors: template.special_colors as u32,
            notes: template.notes.clone(),
            deadline: input.deadline,
            template_name: None,
        };
        Self::validate_input(&job_input)?;

        let row = self.insert_numbered_job(&job_input).await?;

        // The template's operation sequence comes along with its overrides
        sqlx::query(
            r#"
            INSERT INTO job_operations
                (job_id, operation_id, sequence_order,
                 operation_name, makeready_price, price_per_sheet, plate_price,
                 base_waste_sheets, waste_percentage,
                 makeready_time_minutes, cleaning_time_minutes, sheets_per_minute,
                 divides_quantity_by, multiplies_quantity_by,
                 uses_colors, uses_front_colors_only, parameters)
            SELECT $1, operation_id, sequence_order,
                   operation_name, makeready_price, price_per_sheet, plate_price,
                   base_waste_sheets, waste_percentage,
                   makeready_time_minutes, cleaning_time_minutes, sheets_per_minute,
                   divides_quantity_by, multiplies_quantity_by,
                   uses_colors, uses_front_colors_only, parameters
            FROM job_operations
            WHERE job_id = $2
            "#,
        )
        .bind(row.id)
        .bind(template_id)
        .execute(&self.db)
        .await?;

        tracing::info!(job_number = ?row.job_number, %template_id, "Created job from template");
        Ok(row.into())
    }

    /// Insert a job, generating its number with retries on collision
    async fn insert_numbered_job(&self, input: &CreateJobInput) -> AppResult<JobRow> {
        let year = Utc::now().year();

        for _ in 0..=self.job_number_retries {
            let existing: Vec<String> =
                sqlx::query_scalar("SELECT job_number FROM jobs WHERE job_number LIKE $1")
                    .bind(format!("JOB-{}-%", year))
                    .fetch_all(&self.db)
                    .await?;
            let number = next_job_number(year, existing.iter().map(String::as_str));

            match self.insert_job(Some(&number), input, false, None).await {
                Ok(row) => return Ok(row),
                Err(AppError::DatabaseError(err)) if is_unique_violation(&err) => {
                    tracing::warn!(number, "Job number collision, retrying");
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        // Concurrent creators kept winning the sequential number; fall back
        // to a random suffix rather than failing the request.
        let fallback = format!("JOB-{}-{}", year, &Uuid::new_v4().simple().to_string()[..8]);
        tracing::warn!(fallback, "Assigning fallback job number");
        self.insert_job(Some(&fallback), input, false, None).await
    }

    async fn insert_job(
        &self,
        job_number: Option<&str>,
        input: &CreateJobInput,
        is_template: bool,
        template_name: Option<&str>,
    ) -> AppResult<JobRow> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs
                (job_number, client_id, order_type, order_name, quantity,
                 paper_type_id, end_size_id, custom_end_width_cm, custom_end_height_cm,
                 printing_size_id, selling_size_id, parts_of_selling_size,
                 n_up, colors_front, colors_back, special_colors,
                 notes, deadline, is_template, template_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING *
            "#,
        )
        .bind(job_number)
        .bind(input.client_id)
        .bind(input.order_type.as_str())
        .bind(&input.order_name)
        .bind(input.quantity as i32)
        .bind(input.paper_type_id)
        .bind(input.end_size_id)
        .bind(input.custom_end_width_cm)
        .bind(input.custom_end_height_cm)
        .bind(input.printing_size_id)
        .bind(input.selling_size_id)
        .bind(input.parts_of_selling_size as i32)
        .bind(input.n_up as i32)
        .bind(input.colors_front as i32)
        .bind(input.colors_back as i32)
        .bind(input.special_colors as i32)
        .bind(&input.notes)
        .bind(input.deadline)
        .bind(is_template)
        .bind(template_name)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    pub(crate) async fn fetch_row(&self, job_id: Uuid) -> AppResult<JobRow> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Job".to_string()))
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: Uuid) -> AppResult<Job> {
        Ok(self.fetch_row(job_id).await?.into())
    }

    /// List jobs matching a filter, newest first
    pub async fn list_jobs(&self, filter: JobListFilter) -> AppResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            WHERE is_template = FALSE
              AND ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::text IS NULL OR order_type = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.client_id)
        .bind(filter.order_type.map(|t| t.as_str()))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Job::from).collect())
    }

    /// List templates
    pub async fn list_templates(&self) -> AppResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE is_template = TRUE ORDER BY template_name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Job::from).collect())
    }

    /// Update job parameters. Calculated figures are left as they are until
    /// the next recalculation.
    pub async fn update_job(&self, job_id: Uuid, input: UpdateJobInput) -> AppResult<Job> {
        if let Some(quantity) = input.quantity {
            check_field("quantity", validate_quantity(quantity))?;
        }
        if let Some(n_up) = input.n_up {
            check_field("n_up", validate_n_up(n_up))?;
        }
        if let Some(colors) = input.colors_front {
            check_field("colors_front", validate_color_count(colors))?;
        }
        if let Some(colors) = input.colors_back {
            check_field("colors_back", validate_color_count(colors))?;
        }

        let current = self.fetch_row(job_id).await?;
        let width = input.custom_end_width_cm.or(current.custom_end_width_cm);
        let height = input.custom_end_height_cm.or(current.custom_end_height_cm);
        check_field("custom_end_width_cm", validate_custom_end_size(width, height))?;

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs SET
                client_id = COALESCE($2, client_id),
                order_type = COALESCE($3, order_type),
                order_name = COALESCE($4, order_name),
                quantity = COALESCE($5, quantity),
                paper_type_id = COALESCE($6, paper_type_id),
                end_size_id = COALESCE($7, end_size_id),
                custom_end_width_cm = COALESCE($8, custom_end_width_cm),
                custom_end_height_cm = COALESCE($9, custom_end_height_cm),
                printing_size_id = COALESCE($10, printing_size_id),
                selling_size_id = COALESCE($11, selling_size_id),
                parts_of_selling_size = COALESCE($12, parts_of_selling_size),
                n_up = COALESCE($13, n_up),
                colors_front = COALESCE($14, colors_front),
                colors_back = COALESCE($15, colors_back),
                special_colors = COALESCE($16, special_colors),
                notes = COALESCE($17, notes),
                deadline = COALESCE($18, deadline),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(input.client_id)
        .bind(input.order_type.map(|t| t.as_str()))
        .bind(&input.order_name)
        .bind(input.quantity.map(|v| v as i32))
        .bind(input.paper_type_id)
        .bind(input.end_size_id)
        .bind(input.custom_end_width_cm)
        .bind(input.custom_end_height_cm)
        .bind(input.printing_size_id)
        .bind(input.selling_size_id)
        .bind(input.parts_of_selling_size.map(|v| v as i32))
        .bind(input.n_up.map(|v| v as i32))
        .bind(input.colors_front.map(|v| v as i32))
        .bind(input.colors_back.map(|v| v as i32))
        .bind(input.special_colors.map(|v| v as i32))
        .bind(&input.notes)
        .bind(input.deadline)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

        Ok(row.into())
    }

    /// Delete a job; its operations and variants cascade
    pub async fn delete_job(&self, job_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Job".to_string()));
        }
        Ok(())
    }

    /// Apply a manual status transition, validated against the workflow
    pub async fn update_status(&self, job_id: Uuid, input: UpdateStatusInput) -> AppResult<Job> {
        let current = self.fetch_row(job_id).await?;
        let from = JobStatus::from_str(&current.status).unwrap_or(JobStatus::Draft);

        if !from.can_transition_to(input.status) {
            return Err(AppError::InvalidStateTransition {
                from: from.to_string(),
                to: input.status.to_string(),
            });
        }

        let row = sqlx::query_as::<_, JobRow>(
            "UPDATE jobs SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(job_id)
        .bind(input.status.as_str())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%job_id, from = %from, to = %input.status, "Job status changed");
        Ok(row.into())
    }

    /// List a job's operation sequence in execution order
    pub async fn list_operations(&self, job_id: Uuid) -> AppResult<Vec<JobOperation>> {
        self.fetch_row(job_id).await?;

        let rows = sqlx::query_as::<_, JobOperationRow>(
            "SELECT * FROM job_operations WHERE job_id = $1 ORDER BY sequence_order",
        )
        .bind(job_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(JobOperation::from).collect())
    }

    /// List a job's saved quantity variants
    pub async fn list_variants(&self, job_id: Uuid) -> AppResult<Vec<JobVariant>> {
        self.fetch_row(job_id).await?;

        let rows = sqlx::query_as::<_, JobVariantRow>(
            "SELECT * FROM job_variants WHERE job_id = $1 ORDER BY quantity",
        )
        .bind(job_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(JobVariant::from).collect())
    }
}

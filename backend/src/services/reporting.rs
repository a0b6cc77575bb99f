//! Reporting service: price-table export for client quotes

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::job::{JobRow, JobVariantRow};
use shared::models::job::JobVariant;

/// Reporting service for exports derived from calculated jobs
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// A rendered price table ready to send as a CSV attachment
#[derive(Debug)]
pub struct PriceTableExport {
    pub filename: String,
    pub content: String,
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Render a job's saved quantity variants as a CSV price table
    pub async fn price_table_csv(&self, job_id: Uuid) -> AppResult<PriceTableExport> {
        let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

        let variants: Vec<JobVariant> = sqlx::query_as::<_, JobVariantRow>(
            "SELECT * FROM job_variants WHERE job_id = $1 ORDER BY quantity",
        )
        .bind(job_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(JobVariant::from)
        .collect();

        if variants.is_empty() {
            return Err(AppError::ValidationError(
                "No variants have been calculated for this job".to_string(),
            ));
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "Quantity",
                "Total Cost",
                "Cost Per Piece",
                "Paper Cost",
                "Operations Cost",
                "Production Time (min)",
                "Print Run",
                "Waste Sheets",
                "Sheets To Buy",
                "Paper Weight (kg)",
            ])
            .map_err(|err| AppError::Internal(err.to_string()))?;

        for variant in &variants {
            writer
                .write_record([
                    variant.quantity.to_string(),
                    variant.total_cost.round_dp(2).to_string(),
                    variant.cost_per_piece().round_dp(2).to_string(),
                    variant.paper_cost.round_dp(2).to_string(),
                    variant.operations_cost.round_dp(2).to_string(),
                    variant.total_time_minutes.to_string(),
                    variant.print_run.to_string(),
                    variant.waste_sheets.to_string(),
                    variant.sheets_to_buy.to_string(),
                    variant.paper_weight_kg.round_dp(3).to_string(),
                ])
                .map_err(|err| AppError::Internal(err.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| AppError::Internal(err.to_string()))?;
        let content =
            String::from_utf8(bytes).map_err(|err| AppError::Internal(err.to_string()))?;

        let label = job.job_number.as_deref().unwrap_or("template");
        Ok(PriceTableExport {
            filename: format!("{}-price-table.csv", label),
            content,
        })
    }
}

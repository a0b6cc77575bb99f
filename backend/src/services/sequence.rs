//! Operation sequence manager: add, remove and reorder the steps of a job
//!
//! Every mutation runs in a transaction holding a row lock on the job, and
//! renumbering goes through a high offset so `(job_id, sequence_order)`
//! stays unique at every intermediate state.

use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::job::JobOperationRow;
use crate::services::operation::OperationRow;
use shared::models::job::JobOperation;
use shared::models::operation::StepOverride;

/// Orders far above any real sequence, used for collision-free renumbering
const RENUMBER_OFFSET: i32 = 1_000_000;

/// Sequence service for a job's ordered operation list
#[derive(Clone)]
pub struct SequenceService {
    db: PgPool,
}

/// Input for attaching an operation to a job
#[derive(Debug, Deserialize)]
pub struct AddOperationInput {
    pub operation_id: Uuid,
    /// 1-based position; appended when omitted
    pub position: Option<u32>,
    pub parameters: Option<StepOverride>,
}

/// Input for reordering a job's operations
#[derive(Debug, Deserialize)]
pub struct ReorderInput {
    /// Every current job operation ID, in the desired execution order
    pub ordered_ids: Vec<Uuid>,
}

impl SequenceService {
    /// Create a new SequenceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn lock_job(&self, tx: &mut Transaction<'_, Postgres>, job_id: Uuid) -> AppResult<()> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Job".to_string()))?;
        Ok(())
    }

    /// Attach a master operation to a job, snapshotting its formula constants.
    /// Without a position the step is appended; with one, later steps shift up.
    pub async fn add_operation(
        &self,
        job_id: Uuid,
        input: AddOperationInput,
    ) -> AppResult<JobOperation> {
        let mut tx = self.db.begin().await?;
        self.lock_job(&mut tx, job_id).await?;

        let operation = sqlx::query_as::<_, OperationRow>(
            "SELECT * FROM operations WHERE id = $1 AND is_active = TRUE",
        )
        .bind(input.operation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Operation".to_string()))?;

        let max_order: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(sequence_order) FROM job_operations WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_one(&mut *tx)
        .await?;
        let max_order = max_order.unwrap_or(0) as u32;

        let position = insert_position(input.position, max_order) as i32;

        if position <= max_order as i32 {
            sqlx::query(
                r#"
                UPDATE job_operations
                SET sequence_order = sequence_order + $3
                WHERE job_id = $1 AND sequence_order >= $2
                "#,
            )
            .bind(job_id)
            .bind(position)
            .bind(RENUMBER_OFFSET)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE job_operations
                SET sequence_order = sequence_order - $2 + 1
                WHERE job_id = $1 AND sequence_order > $2
                "#,
            )
            .bind(job_id)
            .bind(RENUMBER_OFFSET)
            .execute(&mut *tx)
            .await?;
        }

        let parameters = input
            .parameters
            .map(serde_json::to_value)
            .transpose()
            .map_err(|err| AppError::Internal(err.to_string()))?;

        let row = sqlx::query_as::<_, JobOperationRow>(
            r#"
            INSERT INTO job_operations
                (job_id, operation_id, sequence_order,
                 operation_name, makeready_price, price_per_sheet, plate_price,
                 base_waste_sheets, waste_percentage,
                 makeready_time_minutes, cleaning_time_minutes, sheets_per_minute,
                 divides_quantity_by, multiplies_quantity_by,
                 uses_colors, uses_front_colors_only, parameters)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(operation.id)
        .bind(position)
        .bind(&operation.name)
        .bind(operation.makeready_price)
        .bind(operation.price_per_sheet)
        .bind(operation.plate_price)
        .bind(operation.base_waste_sheets)
        .bind(operation.waste_percentage)
        .bind(operation.makeready_time_minutes)
        .bind(operation.cleaning_time_minutes)
        .bind(operation.sheets_per_minute)
        .bind(operation.divides_quantity_by)
        .bind(operation.multiplies_quantity_by)
        .bind(operation.uses_colors)
        .bind(operation.uses_front_colors_only)
        .bind(parameters)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Detach a step and close the gap it leaves, restoring a dense 1..N order
    pub async fn remove_operation(&self, job_id: Uuid, job_operation_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        self.lock_job(&mut tx, job_id).await?;

        let removed_order: i32 = sqlx::query_scalar(
            "DELETE FROM job_operations WHERE id = $1 AND job_id = $2 RETURNING sequence_order",
        )
        .bind(job_operation_id)
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Job operation".to_string()))?;

        sqlx::query(
            r#"
            UPDATE job_operations
            SET sequence_order = sequence_order + $3
            WHERE job_id = $1 AND sequence_order > $2
            "#,
        )
        .bind(job_id)
        .bind(removed_order)
        .bind(RENUMBER_OFFSET)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE job_operations
            SET sequence_order = sequence_order - $2 - 1
            WHERE job_id = $1 AND sequence_order > $2
            "#,
        )
        .bind(job_id)
        .bind(RENUMBER_OFFSET)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Rearrange a job's steps. The ID list must be exactly the job's current
    /// set; on any mismatch nothing changes and a validation error is returned.
    pub async fn reorder_operations(
        &self,
        job_id: Uuid,
        input: ReorderInput,
    ) -> AppResult<Vec<JobOperation>> {
        let mut tx = self.db.begin().await?;
        self.lock_job(&mut tx, job_id).await?;

        let current: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM job_operations WHERE job_id = $1 ORDER BY sequence_order",
        )
        .bind(job_id)
        .fetch_all(&mut *tx)
        .await?;

        validate_reorder(&current, &input.ordered_ids)
            .map_err(|message| AppError::ValidationError(message.to_string()))?;

        sqlx::query(
            "UPDATE job_operations SET sequence_order = sequence_order + $2 WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(RENUMBER_OFFSET)
        .execute(&mut *tx)
        .await?;

        for (index, id) in input.ordered_ids.iter().enumerate() {
            sqlx::query(
                "UPDATE job_operations SET sequence_order = $3 WHERE id = $1 AND job_id = $2",
            )
            .bind(id)
            .bind(job_id)
            .bind(index as i32 + 1)
            .execute(&mut *tx)
            .await?;
        }

        let rows = sqlx::query_as::<_, JobOperationRow>(
            "SELECT * FROM job_operations WHERE job_id = $1 ORDER BY sequence_order",
        )
        .bind(job_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rows.into_iter().map(JobOperation::from).collect())
    }
}

/// Resolve the 1-based insert position: append when unspecified, clamp into
/// the valid range otherwise.
fn insert_position(requested: Option<u32>, max_order: u32) -> u32 {
    match requested {
        None => max_order + 1,
        Some(position) => position.clamp(1, max_order + 1),
    }
}

/// Check that a reorder request names exactly the current step IDs, each once
fn validate_reorder(current: &[Uuid], requested: &[Uuid]) -> Result<(), &'static str> {
    if requested.len() != current.len() {
        return Err("Reorder must include every operation of the job exactly once");
    }
    let mut seen = std::collections::HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(id) {
            return Err("Reorder contains duplicate operation IDs");
        }
        if !current.contains(id) {
            return Err("Reorder references an operation not on this job");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_when_no_position_given() {
        assert_eq!(insert_position(None, 0), 1);
        assert_eq!(insert_position(None, 3), 4);
    }

    #[test]
    fn position_clamped_into_valid_range() {
        assert_eq!(insert_position(Some(0), 3), 1);
        assert_eq!(insert_position(Some(2), 3), 2);
        assert_eq!(insert_position(Some(99), 3), 4);
    }

    #[test]
    fn reorder_accepts_a_permutation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert!(validate_reorder(&[a, b, c], &[c, a, b]).is_ok());
    }

    #[test]
    fn reorder_rejects_missing_and_extra_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        assert!(validate_reorder(&[a, b], &[a]).is_err());
        assert!(validate_reorder(&[a, b], &[a, stranger]).is_err());
        assert!(validate_reorder(&[a, b], &[a, b, stranger]).is_err());
    }

    #[test]
    fn reorder_rejects_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_reorder(&[a, b], &[a, a]).is_err());
    }
}

//! Paper catalog service: paper types and sizes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult};
use crate::services::check_field;
use shared::models::paper::{PaperSize, PaperType};
use shared::validation::validate_price;

/// Catalog service for paper stock reference data
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Database row for a paper type
#[derive(Debug, sqlx::FromRow)]
struct PaperTypeRow {
    id: Uuid,
    name: String,
    weight_gsm: i32,
    price_per_kg: Decimal,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaperTypeRow> for PaperType {
    fn from(row: PaperTypeRow) -> Self {
        PaperType {
            id: row.id,
            name: row.name,
            weight_gsm: row.weight_gsm as u32,
            price_per_kg: row.price_per_kg,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a paper size
#[derive(Debug, sqlx::FromRow)]
struct PaperSizeRow {
    id: Uuid,
    name: String,
    width_cm: Decimal,
    height_cm: Decimal,
    parent_size_id: Option<Uuid>,
    parts_of_parent: i32,
    is_standard: bool,
    description: Option<String>,
}

impl From<PaperSizeRow> for PaperSize {
    fn from(row: PaperSizeRow) -> Self {
        PaperSize {
            id: row.id,
            name: row.name,
            width_cm: row.width_cm,
            height_cm: row.height_cm,
            parent_size_id: row.parent_size_id,
            parts_of_parent: row.parts_of_parent as u32,
            is_standard: row.is_standard,
            description: row.description,
        }
    }
}

/// Input for creating a paper type
#[derive(Debug, Deserialize)]
pub struct CreatePaperTypeInput {
    pub name: String,
    pub weight_gsm: u32,
    pub price_per_kg: Decimal,
    pub description: Option<String>,
}

/// Input for updating a paper type
#[derive(Debug, Deserialize)]
pub struct UpdatePaperTypeInput {
    pub name: Option<String>,
    pub weight_gsm: Option<u32>,
    pub price_per_kg: Option<Decimal>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Input for creating a paper size
#[derive(Debug, Deserialize)]
pub struct CreatePaperSizeInput {
    pub name: String,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
    pub parent_size_id: Option<Uuid>,
    #[serde(default = "default_parts")]
    pub parts_of_parent: u32,
    #[serde(default)]
    pub is_standard: bool,
    pub description: Option<String>,
}

fn default_parts() -> u32 {
    1
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Paper types
    // ------------------------------------------------------------------

    /// Create a paper type
    pub async fn create_paper_type(&self, input: CreatePaperTypeInput) -> AppResult<PaperType> {
        if input.weight_gsm == 0 {
            return Err(AppError::Validation {
                field: "weight_gsm".to_string(),
                message: "Paper weight must be positive".to_string(),
            });
        }
        check_field("price_per_kg", validate_price(input.price_per_kg))?;

        let row = sqlx::query_as::<_, PaperTypeRow>(
            r#"
            INSERT INTO paper_types (name, weight_gsm, price_per_kg, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(input.weight_gsm as i32)
        .bind(input.price_per_kg)
        .bind(&input.description)
        .fetch_one(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::DuplicateEntry(format!("Paper type '{}' already exists", input.name))
            } else {
                err.into()
            }
        })?;

        Ok(row.into())
    }

    /// List paper types
    pub async fn list_paper_types(&self, include_inactive: bool) -> AppResult<Vec<PaperType>> {
        let rows = sqlx::query_as::<_, PaperTypeRow>(
            r#"
            SELECT * FROM paper_types
            WHERE is_active = TRUE OR $1
            ORDER BY name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(PaperType::from).collect())
    }

    /// Get a paper type by ID
    pub async fn get_paper_type(&self, paper_type_id: Uuid) -> AppResult<PaperType> {
        let row = sqlx::query_as::<_, PaperTypeRow>("SELECT * FROM paper_types WHERE id = $1")
            .bind(paper_type_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Paper type".to_string()))?;

        Ok(row.into())
    }

    /// Update a paper type
    pub async fn update_paper_type(
        &self,
        paper_type_id: Uuid,
        input: UpdatePaperTypeInput,
    ) -> AppResult<PaperType> {
        if let Some(price) = input.price_per_kg {
            check_field("price_per_kg", validate_price(price))?;
        }
        if input.weight_gsm == Some(0) {
            return Err(AppError::Validation {
                field: "weight_gsm".to_string(),
                message: "Paper weight must be positive".to_string(),
            });
        }

        let row = sqlx::query_as::<_, PaperTypeRow>(
            r#"
            UPDATE paper_types SET
                name = COALESCE($2, name),
                weight_gsm = COALESCE($3, weight_gsm),
                price_per_kg = COALESCE($4, price_per_kg),
                description = COALESCE($5, description),
                is_active = COALESCE($6, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(paper_type_id)
        .bind(&input.name)
        .bind(input.weight_gsm.map(|w| w as i32))
        .bind(input.price_per_kg)
        .bind(&input.description)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Paper type".to_string()))?;

        Ok(row.into())
    }

    /// Delete a paper type. Fails while jobs still reference it.
    pub async fn delete_paper_type(&self, paper_type_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM paper_types WHERE id = $1")
            .bind(paper_type_id)
            .execute(&self.db)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    AppError::Conflict {
                        resource: "Paper type".to_string(),
                        message: "Paper type is used by existing jobs".to_string(),
                    }
                } else {
                    err.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Paper type".to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Paper sizes
    // ------------------------------------------------------------------

    /// Create a paper size
    pub async fn create_paper_size(&self, input: CreatePaperSizeInput) -> AppResult<PaperSize> {
        if input.width_cm <= Decimal::ZERO || input.height_cm <= Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Paper size dimensions must be positive".to_string(),
            ));
        }
        if input.parts_of_parent == 0 {
            return Err(AppError::Validation {
                field: "parts_of_parent".to_string(),
                message: "Parts of parent must be at least 1".to_string(),
            });
        }
        if let Some(parent_id) = input.parent_size_id {
            // Parent must exist before the FK insert attempt
            self.get_paper_size(parent_id).await.map_err(|_| {
                AppError::Validation {
                    field: "parent_size_id".to_string(),
                    message: "Parent paper size does not exist".to_string(),
                }
            })?;
        }

        let row = sqlx::query_as::<_, PaperSizeRow>(
            r#"
            INSERT INTO paper_sizes
                (name, width_cm, height_cm, parent_size_id, parts_of_parent, is_standard, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(input.width_cm)
        .bind(input.height_cm)
        .bind(input.parent_size_id)
        .bind(input.parts_of_parent as i32)
        .bind(input.is_standard)
        .bind(&input.description)
        .fetch_one(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::DuplicateEntry(format!("Paper size '{}' already exists", input.name))
            } else {
                err.into()
            }
        })?;

        Ok(row.into())
    }

    /// List paper sizes
    pub async fn list_paper_sizes(&self) -> AppResult<Vec<PaperSize>> {
        let rows =
            sqlx::query_as::<_, PaperSizeRow>("SELECT * FROM paper_sizes ORDER BY name")
                .fetch_all(&self.db)
                .await?;

        Ok(rows.into_iter().map(PaperSize::from).collect())
    }

    /// Get a paper size by ID
    pub async fn get_paper_size(&self, paper_size_id: Uuid) -> AppResult<PaperSize> {
        let row = sqlx::query_as::<_, PaperSizeRow>("SELECT * FROM paper_sizes WHERE id = $1")
            .bind(paper_size_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Paper size".to_string()))?;

        Ok(row.into())
    }

    /// Delete a paper size. Fails while jobs still reference it.
    pub async fn delete_paper_size(&self, paper_size_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM paper_sizes WHERE id = $1")
            .bind(paper_size_id)
            .execute(&self.db)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    AppError::Conflict {
                        resource: "Paper size".to_string(),
                        message: "Paper size is used by existing jobs".to_string(),
                    }
                } else {
                    err.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Paper size".to_string()));
        }
        Ok(())
    }
}

//! Operation library service: categories and master operation definitions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult};
use crate::services::check_field;
use shared::models::operation::{OperationCategory, OperationDefinition};
use shared::validation::{validate_price, validate_transform_config, validate_waste_percentage};

/// Operation service for managing the configurable operation library
#[derive(Clone)]
pub struct OperationService {
    db: PgPool,
}

/// Database row for an operation category
#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    color: String,
    sort_order: i32,
}

impl From<CategoryRow> for OperationCategory {
    fn from(row: CategoryRow) -> Self {
        OperationCategory {
            id: row.id,
            name: row.name,
            description: row.description,
            color: row.color,
            sort_order: row.sort_order,
        }
    }
}

/// Database row for a master operation definition. Shared with the sequence
/// and estimation services, which snapshot these constants into job rows.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OperationRow {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
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
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OperationRow> for OperationDefinition {
    fn from(row: OperationRow) -> Self {
        OperationDefinition {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            description: row.description,
            makeready_price: row.makeready_price,
            price_per_sheet: row.price_per_sheet,
            plate_price: row.plate_price,
            base_waste_sheets: row.base_waste_sheets as u32,
            waste_percentage: row.waste_percentage,
            makeready_time_minutes: row.makeready_time_minutes as u32,
            cleaning_time_minutes: row.cleaning_time_minutes as u32,
            sheets_per_minute: row.sheets_per_minute as u32,
            divides_quantity_by: row.divides_quantity_by as u32,
            multiplies_quantity_by: row.multiplies_quantity_by as u32,
            uses_colors: row.uses_colors,
            uses_front_colors_only: row.uses_front_colors_only,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating an operation category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_color() -> String {
    "#007bff".to_string()
}

/// Input for creating a master operation definition
#[derive(Debug, Deserialize)]
pub struct CreateOperationInput {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub makeready_price: Decimal,
    #[serde(default)]
    pub price_per_sheet: Decimal,
    #[serde(default)]
    pub plate_price: Decimal,
    #[serde(default)]
    pub base_waste_sheets: u32,
    #[serde(default)]
    pub waste_percentage: Decimal,
    #[serde(default)]
    pub makeready_time_minutes: u32,
    #[serde(default)]
    pub cleaning_time_minutes: u32,
    #[serde(default = "default_one")]
    pub sheets_per_minute: u32,
    #[serde(default = "default_one")]
    pub divides_quantity_by: u32,
    #[serde(default = "default_one")]
    pub multiplies_quantity_by: u32,
    #[serde(default)]
    pub uses_colors: bool,
    #[serde(default)]
    pub uses_front_colors_only: bool,
}

fn default_one() -> u32 {
    1
}

/// Input for updating a master operation definition
#[derive(Debug, Deserialize)]
pub struct UpdateOperationInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub makeready_price: Option<Decimal>,
    pub price_per_sheet: Option<Decimal>,
    pub plate_price: Option<Decimal>,
    pub base_waste_sheets: Option<u32>,
    pub waste_percentage: Option<Decimal>,
    pub makeready_time_minutes: Option<u32>,
    pub cleaning_time_minutes: Option<u32>,
    pub sheets_per_minute: Option<u32>,
    pub divides_quantity_by: Option<u32>,
    pub multiplies_quantity_by: Option<u32>,
    pub uses_colors: Option<bool>,
    pub uses_front_colors_only: Option<bool>,
    pub is_active: Option<bool>,
}

impl OperationService {
    /// Create a new OperationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// Create an operation category
    pub async fn create_category(&self, input: CreateCategoryInput) -> AppResult<OperationCategory> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO operation_categories (name, description, color, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.color)
        .bind(input.sort_order)
        .fetch_one(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::DuplicateEntry(format!("Category '{}' already exists", input.name))
            } else {
                err.into()
            }
        })?;

        Ok(row.into())
    }

    /// List categories in display order
    pub async fn list_categories(&self) -> AppResult<Vec<OperationCategory>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT * FROM operation_categories ORDER BY sort_order, name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(OperationCategory::from).collect())
    }

    /// Delete a category. Fails while operations still reference it.
    pub async fn delete_category(&self, category_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM operation_categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    AppError::Conflict {
                        resource: "Operation category".to_string(),
                        message: "Category still contains operations".to_string(),
                    }
                } else {
                    err.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Operation category".to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Operation definitions
    // ------------------------------------------------------------------

    /// Create a master operation definition
    pub async fn create_operation(
        &self,
        input: CreateOperationInput,
    ) -> AppResult<OperationDefinition> {
        check_field("makeready_price", validate_price(input.makeready_price))?;
        check_field("price_per_sheet", validate_price(input.price_per_sheet))?;
        check_field("plate_price", validate_price(input.plate_price))?;
        check_field(
            "waste_percentage",
            validate_waste_percentage(input.waste_percentage),
        )?;
        check_field(
            "divides_quantity_by",
            validate_transform_config(input.divides_quantity_by, input.multiplies_quantity_by),
        )?;

        let row = sqlx::query_as::<_, OperationRow>(
            r#"
            INSERT INTO operations
                (category_id, name, description,
                 makeready_price, price_per_sheet, plate_price,
                 base_waste_sheets, waste_percentage,
                 makeready_time_minutes, cleaning_time_minutes, sheets_per_minute,
                 divides_quantity_by, multiplies_quantity_by,
                 uses_colors, uses_front_colors_only)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.makeready_price)
        .bind(input.price_per_sheet)
        .bind(input.plate_price)
        .bind(input.base_waste_sheets as i32)
        .bind(input.waste_percentage)
        .bind(input.makeready_time_minutes as i32)
        .bind(input.cleaning_time_minutes as i32)
        .bind(input.sheets_per_minute as i32)
        .bind(input.divides_quantity_by as i32)
        .bind(input.multiplies_quantity_by as i32)
        .bind(input.uses_colors)
        .bind(input.uses_front_colors_only)
        .fetch_one(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::DuplicateEntry(format!(
                    "Operation '{}' already exists in this category",
                    input.name
                ))
            } else if is_foreign_key_violation(&err) {
                AppError::Validation {
                    field: "category_id".to_string(),
                    message: "Operation category does not exist".to_string(),
                }
            } else {
                err.into()
            }
        })?;

        Ok(row.into())
    }

    /// List operations, optionally restricted to one category
    pub async fn list_operations(
        &self,
        category_id: Option<Uuid>,
        include_inactive: bool,
    ) -> AppResult<Vec<OperationDefinition>> {
        let rows = sqlx::query_as::<_, OperationRow>(
            r#"
            SELECT * FROM operations
            WHERE ($1::uuid IS NULL OR category_id = $1)
              AND (is_active = TRUE OR $2)
            ORDER BY name
            "#,
        )
        .bind(category_id)
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(OperationDefinition::from).collect())
    }

    /// Get an operation definition by ID
    pub async fn get_operation(&self, operation_id: Uuid) -> AppResult<OperationDefinition> {
        let row = sqlx::query_as::<_, OperationRow>("SELECT * FROM operations WHERE id = $1")
            .bind(operation_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Operation".to_string()))?;

        Ok(row.into())
    }

    /// Update an operation definition. Existing job rows keep their frozen
    /// snapshot until the job is recalculated.
    pub async fn update_operation(
        &self,
        operation_id: Uuid,
        input: UpdateOperationInput,
    ) -> AppResult<OperationDefinition> {
        for (field, price) in [
            ("makeready_price", input.makeready_price),
            ("price_per_sheet", input.price_per_sheet),
            ("plate_price", input.plate_price),
        ] {
            if let Some(price) = price {
                check_field(field, validate_price(price))?;
            }
        }
        if let Some(pct) = input.waste_percentage {
            check_field("waste_percentage", validate_waste_percentage(pct))?;
        }

        let current = self.get_operation(operation_id).await?;
        let divides = input.divides_quantity_by.unwrap_or(current.divides_quantity_by);
        let multiplies = input
            .multiplies_quantity_by
            .unwrap_or(current.multiplies_quantity_by);
        check_field(
            "divides_quantity_by",
            validate_transform_config(divides, multiplies),
        )?;

        let row = sqlx::query_as::<_, OperationRow>(
            r#"
            UPDATE operations SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                makeready_price = COALESCE($4, makeready_price),
                price_per_sheet = COALESCE($5, price_per_sheet),
                plate_price = COALESCE($6, plate_price),
                base_waste_sheets = COALESCE($7, base_waste_sheets),
                waste_percentage = COALESCE($8, waste_percentage),
                makeready_time_minutes = COALESCE($9, makeready_time_minutes),
                cleaning_time_minutes = COALESCE($10, cleaning_time_minutes),
                sheets_per_minute = COALESCE($11, sheets_per_minute),
                divides_quantity_by = $12,
                multiplies_quantity_by = $13,
                uses_colors = COALESCE($14, uses_colors),
                uses_front_colors_only = COALESCE($15, uses_front_colors_only),
                is_active = COALESCE($16, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(operation_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.makeready_price)
        .bind(input.price_per_sheet)
        .bind(input.plate_price)
        .bind(input.base_waste_sheets.map(|v| v as i32))
        .bind(input.waste_percentage)
        .bind(input.makeready_time_minutes.map(|v| v as i32))
        .bind(input.cleaning_time_minutes.map(|v| v as i32))
        .bind(input.sheets_per_minute.map(|v| v as i32))
        .bind(divides as i32)
        .bind(multiplies as i32)
        .bind(input.uses_colors)
        .bind(input.uses_front_colors_only)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Operation".to_string()))?;

        Ok(row.into())
    }

    /// Delete an operation definition. Fails while job operations reference it.
    pub async fn delete_operation(&self, operation_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM operations WHERE id = $1")
            .bind(operation_id)
            .execute(&self.db)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    AppError::Conflict {
                        resource: "Operation".to_string(),
                        message: "Operation is used by existing jobs".to_string(),
                    }
                } else {
                    err.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Operation".to_string()));
        }
        Ok(())
    }
}

//! Client management service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_foreign_key_violation, AppError, AppResult};
use crate::services::check_field;
use shared::models::client::{Client, ClientStats};
use shared::validation::validate_email;

/// Client service for managing print-shop clients
#[derive(Clone)]
pub struct ClientService {
    db: PgPool,
}

/// Database row for a client
#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: Uuid,
    company_name: String,
    contact_person: Option<String>,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    notes: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            company_name: row.company_name,
            contact_person: row.contact_person,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            notes: row.notes,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a client
#[derive(Debug, Deserialize)]
pub struct CreateClientInput {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating a client; omitted fields keep their current value
#[derive(Debug, Deserialize)]
pub struct UpdateClientInput {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl ClientService {
    /// Create a new ClientService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a new client
    pub async fn create_client(&self, input: CreateClientInput) -> AppResult<Client> {
        if input.company_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "company_name".to_string(),
                message: "Company name is required".to_string(),
            });
        }
        check_field("email", validate_email(&input.email))?;

        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            INSERT INTO clients (company_name, contact_person, email, phone, address, city, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.company_name)
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// List clients, optionally including deactivated ones
    pub async fn list_clients(&self, include_inactive: bool) -> AppResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT * FROM clients
            WHERE is_active = TRUE OR $1
            ORDER BY company_name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Client::from).collect())
    }

    /// Get a client by ID
    pub async fn get_client(&self, client_id: Uuid) -> AppResult<Client> {
        let row = sqlx::query_as::<_, ClientRow>("SELECT * FROM clients WHERE id = $1")
            .bind(client_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

        Ok(row.into())
    }

    /// Update a client
    pub async fn update_client(
        &self,
        client_id: Uuid,
        input: UpdateClientInput,
    ) -> AppResult<Client> {
        if let Some(email) = &input.email {
            check_field("email", validate_email(email))?;
        }

        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            UPDATE clients SET
                company_name = COALESCE($2, company_name),
                contact_person = COALESCE($3, contact_person),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                city = COALESCE($7, city),
                notes = COALESCE($8, notes),
                is_active = COALESCE($9, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(&input.company_name)
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.notes)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

        Ok(row.into())
    }

    /// Delete a client. Fails while jobs still reference it.
    pub async fn delete_client(&self, client_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(client_id)
            .execute(&self.db)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    AppError::Conflict {
                        resource: "Client".to_string(),
                        message: "Client still has jobs and cannot be deleted".to_string(),
                    }
                } else {
                    err.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Client".to_string()));
        }
        Ok(())
    }

    /// Aggregate job count and revenue for a client. Revenue is `None` until
    /// the client has at least one calculated job.
    pub async fn get_client_stats(&self, client_id: Uuid) -> AppResult<ClientStats> {
        self.get_client(client_id).await?;

        let (jobs_count, total_revenue) = sqlx::query_as::<_, (i64, Option<Decimal>)>(
            r#"
            SELECT COUNT(*), SUM(total_cost)
            FROM jobs
            WHERE client_id = $1 AND is_template = FALSE
            "#,
        )
        .bind(client_id)
        .fetch_one(&self.db)
        .await?;

        Ok(ClientStats {
            jobs_count,
            total_revenue,
        })
    }
}

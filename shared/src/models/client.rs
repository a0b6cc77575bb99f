//! Client models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A print-shop client that jobs are estimated for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate figures for one client.
///
/// `total_revenue` is `None` when the client has no calculated jobs yet,
/// which is a different statement than a revenue of zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStats {
    pub jobs_count: i64,
    pub total_revenue: Option<Decimal>,
}

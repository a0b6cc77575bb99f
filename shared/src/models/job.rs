//! Job, job operation and quantity-variant models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::operation::{OperationSnapshot, StepOverride};

/// Workflow status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    Calculated,
    WaitingManager,
    WaitingClient,
    Approved,
    Urgent,
    Finished,
    Rejected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Calculated => "calculated",
            JobStatus::WaitingManager => "waiting_manager",
            JobStatus::WaitingClient => "waiting_client",
            JobStatus::Approved => "approved",
            JobStatus::Urgent => "urgent",
            JobStatus::Finished => "finished",
            JobStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(JobStatus::Draft),
            "calculated" => Some(JobStatus::Calculated),
            "waiting_manager" => Some(JobStatus::WaitingManager),
            "waiting_client" => Some(JobStatus::WaitingClient),
            "approved" => Some(JobStatus::Approved),
            "urgent" => Some(JobStatus::Urgent),
            "finished" => Some(JobStatus::Finished),
            "rejected" => Some(JobStatus::Rejected),
            _ => None,
        }
    }

    /// Whether a manual transition to `next` is allowed. The engine is the
    /// only path into `Calculated`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Calculated, WaitingManager)
                | (Calculated, Rejected)
                | (WaitingManager, WaitingClient)
                | (WaitingManager, Rejected)
                | (WaitingClient, Approved)
                | (WaitingClient, Rejected)
                | (Approved, Urgent)
                | (Approved, Finished)
                | (Urgent, Finished)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of printed product ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Book,
    Box,
    Poster,
    Flyer,
    Label,
    BusinessCard,
    Brochure,
    Catalog,
    Other,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Book => "book",
            OrderType::Box => "box",
            OrderType::Poster => "poster",
            OrderType::Flyer => "flyer",
            OrderType::Label => "label",
            OrderType::BusinessCard => "business_card",
            OrderType::Brochure => "brochure",
            OrderType::Catalog => "catalog",
            OrderType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "book" => Some(OrderType::Book),
            "box" => Some(OrderType::Box),
            "poster" => Some(OrderType::Poster),
            "flyer" => Some(OrderType::Flyer),
            "label" => Some(OrderType::Label),
            "business_card" => Some(OrderType::BusinessCard),
            "brochure" => Some(OrderType::Brochure),
            "catalog" => Some(OrderType::Catalog),
            "other" => Some(OrderType::Other),
            _ => None,
        }
    }
}

/// One estimation request: parameters in, calculated figures out.
///
/// The calculated fields are written only by the estimation engine; a row
/// flagged as a template carries no job number and serves purely as a
/// field-value donor for new jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_number: Option<String>,
    pub client_id: Uuid,
    pub order_type: OrderType,
    pub order_name: String,
    pub quantity: u32,

    // Paper selections
    pub paper_type_id: Uuid,
    pub end_size_id: Option<Uuid>,
    pub custom_end_width_cm: Option<Decimal>,
    pub custom_end_height_cm: Option<Decimal>,
    pub printing_size_id: Uuid,
    pub selling_size_id: Uuid,
    /// How many printing sheets one purchased parent sheet yields
    pub parts_of_selling_size: u32,

    // Production settings
    /// Items per printing sheet
    pub n_up: u32,
    pub colors_front: u32,
    pub colors_back: u32,
    pub special_colors: u32,

    pub notes: Option<String>,
    pub deadline: Option<DateTime<Utc>>,

    // Calculated paper figures
    pub print_run: Option<u32>,
    pub waste_sheets: Option<u32>,
    pub sheets_to_buy: Option<u32>,
    pub paper_weight_kg: Option<Decimal>,
    pub paper_cost: Option<Decimal>,

    // Calculated totals
    pub total_material_cost: Option<Decimal>,
    pub total_labor_cost: Option<Decimal>,
    pub total_outsourcing_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub total_time_minutes: Option<u32>,

    pub status: JobStatus,
    pub is_template: bool,
    pub template_name: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub calculated_at: Option<DateTime<Utc>>,
}

/// One step in a job's ordered operation sequence: a frozen snapshot of the
/// master operation plus per-step parameters and calculation results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOperation {
    pub id: Uuid,
    pub job_id: Uuid,
    pub operation_id: Uuid,
    /// Execution position, unique within the job
    pub sequence_order: u32,

    #[serde(flatten)]
    pub snapshot: OperationSnapshot,

    /// Per-instance transform override, e.g. cut into 4 pieces
    pub parameters: Option<StepOverride>,

    // Results of the latest calculation
    pub quantity_before: u32,
    pub quantity_after: u32,
    pub waste_sheets: u32,
    pub processing_quantity: u32,
    pub total_cost: Decimal,
    pub total_time_minutes: u32,
    pub colors_used: u32,

    pub created_at: DateTime<Utc>,
}

/// A saved re-run of the engine at an alternate quantity, one row per
/// candidate quantity in the price table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobVariant {
    pub id: Uuid,
    pub job_id: Uuid,
    pub quantity: u32,
    pub total_cost: Decimal,
    pub paper_cost: Decimal,
    pub operations_cost: Decimal,
    pub total_time_minutes: u32,
    pub print_run: u32,
    pub waste_sheets: u32,
    pub sheets_to_buy: u32,
    pub paper_weight_kg: Decimal,
    pub created_at: DateTime<Utc>,
}

impl JobVariant {
    pub fn cost_per_piece(&self) -> Decimal {
        if self.quantity > 0 {
            self.total_cost / Decimal::from(self.quantity)
        } else {
            Decimal::ZERO
        }
    }
}

/// Format a year-scoped job number, e.g. `JOB-2026-0042`.
pub fn format_job_number(year: i32, sequence: u32) -> String {
    format!("JOB-{}-{:04}", year, sequence)
}

/// Parse a job number back into year and sequence. Returns `None` for
/// anything that does not match the `JOB-YYYY-NNNN` shape.
pub fn parse_job_number(number: &str) -> Option<(i32, u32)> {
    let rest = number.strip_prefix("JOB-")?;
    let (year, seq) = rest.split_once('-')?;
    if year.len() != 4 {
        return None;
    }
    Some((year.parse().ok()?, seq.parse().ok()?))
}

/// Pick the next job number for a year given the numbers already assigned.
/// Sequences are monotonically non-decreasing; collisions on insert are
/// resolved by the caller retrying with a fresh read.
pub fn next_job_number<'a>(year: i32, existing: impl IntoIterator<Item = &'a str>) -> String {
    let max_seq = existing
        .into_iter()
        .filter_map(parse_job_number)
        .filter(|(y, _)| *y == year)
        .map(|(_, seq)| seq)
        .max()
        .unwrap_or(0);
    format_job_number(year, max_seq + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_number_round_trip() {
        let number = format_job_number(2026, 42);
        assert_eq!(number, "JOB-2026-0042");
        assert_eq!(parse_job_number(&number), Some((2026, 42)));
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        assert_eq!(parse_job_number("JOB-2026"), None);
        assert_eq!(parse_job_number("EST-2026-0001"), None);
        assert_eq!(parse_job_number("JOB-26-0001"), None);
        assert_eq!(parse_job_number("JOB-2026-abcd"), None);
    }

    #[test]
    fn next_number_scoped_to_year() {
        let existing = ["JOB-2025-0009", "JOB-2026-0003", "JOB-2026-0001"];
        assert_eq!(next_job_number(2026, existing), "JOB-2026-0004");
        assert_eq!(next_job_number(2027, existing), "JOB-2027-0001");
    }

    #[test]
    fn engine_owns_the_calculated_transition() {
        assert!(!JobStatus::Draft.can_transition_to(JobStatus::Calculated));
        assert!(JobStatus::Calculated.can_transition_to(JobStatus::WaitingManager));
        assert!(JobStatus::WaitingClient.can_transition_to(JobStatus::Approved));
        assert!(JobStatus::Approved.can_transition_to(JobStatus::Finished));
        assert!(!JobStatus::Finished.can_transition_to(JobStatus::Draft));
    }
}

//! Borrow (loan request) model and workflow types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

/// Length of a loan: expected return date is the request date plus this.
pub const BORROW_PERIOD_DAYS: i64 = 14;

/// Maximum number of pending requests a user may hold at once.
pub const MAX_PENDING_REQUESTS: i64 = 3;

/// Borrow workflow status stored as TEXT in the borrows table.
///
/// `Validated` is transient: validation promotes a borrow to `Active` within
/// the same transaction, so no row rests in it. The variant is kept so rows
/// written by older schema revisions still decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BorrowStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "VALIDATED")]
    Validated,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "REFUSED")]
    Refused,
    #[serde(rename = "RETURNED")]
    Returned,
    #[serde(rename = "OVERDUE")]
    Overdue,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "PENDING",
            BorrowStatus::Validated => "VALIDATED",
            BorrowStatus::Active => "ACTIVE",
            BorrowStatus::Refused => "REFUSED",
            BorrowStatus::Returned => "RETURNED",
            BorrowStatus::Overdue => "OVERDUE",
        }
    }

    /// Validate, refuse and cancel only apply to pending requests.
    pub fn is_pending(&self) -> bool {
        matches!(self, BorrowStatus::Pending)
    }

    /// A borrow can be returned while checked out, overdue included.
    pub fn is_returnable(&self) -> bool {
        matches!(self, BorrowStatus::Active | BorrowStatus::Overdue)
    }

    /// Refused and returned borrows accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BorrowStatus::Refused | BorrowStatus::Returned)
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(BorrowStatus::Pending),
            "VALIDATED" => Ok(BorrowStatus::Validated),
            "ACTIVE" => Ok(BorrowStatus::Active),
            "REFUSED" => Ok(BorrowStatus::Refused),
            "RETURNED" => Ok(BorrowStatus::Returned),
            "OVERDUE" => Ok(BorrowStatus::Overdue),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

// SQLx conversion for BorrowStatus
impl sqlx::Type<Postgres> for BorrowStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BorrowStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BorrowStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Audit log action tag. Cancellation and refusal share the REFUSED borrow
/// status; this tag is the only signal distinguishing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ValidationAction {
    #[serde(rename = "VALIDATE")]
    Validate,
    #[serde(rename = "REFUSE")]
    Refuse,
    #[serde(rename = "CANCEL")]
    Cancel,
}

impl ValidationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationAction::Validate => "VALIDATE",
            ValidationAction::Refuse => "REFUSE",
            ValidationAction::Cancel => "CANCEL",
        }
    }
}

impl std::str::FromStr for ValidationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VALIDATE" => Ok(ValidationAction::Validate),
            "REFUSE" => Ok(ValidationAction::Refuse),
            "CANCEL" => Ok(ValidationAction::Cancel),
            _ => Err(format!("Invalid validation action: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for ValidationAction {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for ValidationAction {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ValidationAction {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Borrow model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub request_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub status: BorrowStatus,
    pub validation_date: Option<NaiveDate>,
    /// Admin who validated or refused the request, if any
    pub admin_id: Option<i32>,
    pub rejection_reason: Option<String>,
}

/// Borrow joined with book and user details for display
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BorrowDetails {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub request_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub status: BorrowStatus,
    pub validation_date: Option<NaiveDate>,
    pub admin_id: Option<i32>,
    pub rejection_reason: Option<String>,
    pub title: String,
    pub author: String,
    pub image: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

/// Submit borrow request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    pub book_id: i32,
}

/// Refuse/cancel request body
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReasonBody {
    pub reason: Option<String>,
}

/// Borrow listing query parameters (admin console)
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Filter by exact status
    pub status: Option<BorrowStatus>,
}

/// Append-only validation audit record
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ValidationHistoryEntry {
    pub id: i32,
    pub borrow_id: i32,
    /// Acting admin; NULL for user-driven cancellations
    pub admin_id: Option<i32>,
    pub action: ValidationAction,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub admin_name: Option<String>,
}

/// Per-status borrow counts
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowStats {
    pub total: i64,
    pub pending: i64,
    pub validated: i64,
    pub active: i64,
    pub refused: i64,
    pub returned: i64,
    pub overdue: i64,
}

/// Compute the expected return date for a request submitted on `request_date`.
pub fn expected_return_date(request_date: NaiveDate) -> NaiveDate {
    request_date + chrono::Duration::days(BORROW_PERIOD_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            BorrowStatus::Pending,
            BorrowStatus::Validated,
            BorrowStatus::Active,
            BorrowStatus::Refused,
            BorrowStatus::Returned,
            BorrowStatus::Overdue,
        ] {
            assert_eq!(status.as_str().parse::<BorrowStatus>().unwrap(), status);
        }
        assert!("LOST".parse::<BorrowStatus>().is_err());
    }

    #[test]
    fn test_transition_guards() {
        // Validate/refuse/cancel require PENDING
        assert!(BorrowStatus::Pending.is_pending());
        assert!(!BorrowStatus::Active.is_pending());
        assert!(!BorrowStatus::Refused.is_pending());

        // Return requires ACTIVE or OVERDUE
        assert!(BorrowStatus::Active.is_returnable());
        assert!(BorrowStatus::Overdue.is_returnable());
        assert!(!BorrowStatus::Pending.is_returnable());
        assert!(!BorrowStatus::Returned.is_returnable());

        // Terminal states accept nothing
        assert!(BorrowStatus::Refused.is_terminal());
        assert!(BorrowStatus::Returned.is_terminal());
        assert!(!BorrowStatus::Overdue.is_terminal());
    }

    #[test]
    fn test_expected_return_date() {
        let request = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            expected_return_date(request),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_action_round_trip() {
        for action in [
            ValidationAction::Validate,
            ValidationAction::Refuse,
            ValidationAction::Cancel,
        ] {
            assert_eq!(action.as_str().parse::<ValidationAction>().unwrap(), action);
        }
    }
}

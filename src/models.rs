use serde::{Deserialize, Deserializer, Serialize};
use time::Date;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Users and authentication

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: i64,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateProfilePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChangePasswordPayload {
    pub current_password: String,
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Categories

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub budget_limit: Option<f64>,
    pub created_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreateCategoryPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_limit: Option<f64>,
}

/// Partial update. `budget_limit: Some(None)` clears the limit.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateCategoryPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget_limit: Option<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Transactions

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub description: String,
    pub amount: f64,
    pub category_id: Option<String>,
    pub projection_id: Option<String>,
    pub bank_statement_id: Option<String>,
    pub is_manual: bool,
    pub is_projection: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreateTransactionPayload {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub description: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_manual: bool,
    #[serde(default)]
    pub is_projection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateTransactionPayload {
    #[serde(
        default,
        with = "iso_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ListTransactionsQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub is_projection: Option<bool>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub category_id: Option<String>,
    pub projection_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Statistics

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SummaryQuery {
    pub is_projection: Option<bool>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub balance: f64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub total_transactions: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MonthlyQuery {
    pub months: Option<u32>,
    pub is_projection: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MonthlyStat {
    pub month: String,
    pub month_key: String,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CategoryStat {
    pub name: String,
    pub value: f64,
    pub color: Option<String>,
}

// ---------------------------------------------------------------------------
// Projections (scenarios)

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Projection {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectionWithStats {
    #[serde(flatten)]
    pub projection: Projection,
    pub total_transactions: u64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreateProjectionPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateProjectionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        with = "iso_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Date>,
    #[serde(
        default,
        with = "iso_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FromMonthQuery {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PeriodTotals {
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
    pub transactions_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectionSide {
    pub name: String,
    #[serde(flatten)]
    pub totals: PeriodTotals,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ComparisonDifference {
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectionComparison {
    pub projection: ProjectionSide,
    pub real: PeriodTotals,
    pub difference: ComparisonDifference,
}

// ---------------------------------------------------------------------------
// Bank statements

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BankStatement {
    pub id: String,
    pub filename: String,
    pub bank_name: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub period_start: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub period_end: Option<Date>,
    pub total_transactions: u64,
    pub status: String,
    pub upload_date: i64,
}

/// One parsed statement row awaiting review. `temp_id` is scoped to the upload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReviewItem {
    pub temp_id: u32,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub description: String,
    pub amount: f64,
    pub suggested_category: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UploadResponse {
    pub bank_statement_id: String,
    pub filename: String,
    pub bank_name: Option<String>,
    pub total_transactions: u64,
    pub transactions: Vec<ReviewItem>,
    pub available_categories: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfirmItem {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub category_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfirmPayload {
    pub bank_statement_id: String,
    pub transactions: Vec<ConfirmItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfirmResponse {
    pub message: String,
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatPayload {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatReplyResponse {
    pub message: String,
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnalyzeQuery {
    pub question: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    pub question: String,
    pub answer: String,
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ChatHistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatHistoryEntry {
    pub id: String,
    pub message: String,
    pub response: String,
    pub model: Option<String>,
    pub created_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssistantStatus {
    pub available: bool,
    pub model: Option<String>,
    pub message: String,
}

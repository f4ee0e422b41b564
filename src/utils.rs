use axum::http::StatusCode;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::constants::*;
use crate::database::get_user_db;

pub type ApiError = (StatusCode, String);

pub async fn get_user_database(
    data_path: &str,
    user_id: &str,
) -> Result<Arc<RwLock<libsql::Connection>>, ApiError> {
    get_user_db(data_path, user_id).await.map_err(|e| {
        tracing::error!(user_id, error = %e, "failed to open user database");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ERR_DATABASE_ACCESS.to_string(),
        )
    })
}

pub fn db_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ERR_DATABASE_OPERATION.to_string(),
    )
}

pub fn db_error_with_context(context: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Database error: {}", context),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

pub fn not_found(entity: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{} not found", entity))
}

pub fn now_timestamp() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub fn today() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}

pub fn format_iso_date(date: time::Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn parse_iso_date(value: &str) -> Option<time::Date> {
    time::Date::parse(
        value.trim(),
        time::macros::format_description!("[year]-[month]-[day]"),
    )
    .ok()
}

/// Rounds to whole cents, matching the two-decimal storage contract.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn validate_string_length(
    value: &str,
    field_name: &str,
    max_length: usize,
) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{} cannot be empty", field_name),
        ));
    }
    if value.len() > max_length {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{} must be less than {} characters", field_name, max_length),
        ));
    }
    Ok(())
}

pub fn validate_amount(amount: f64) -> Result<(), ApiError> {
    if !amount.is_finite() {
        return Err(bad_request("Amount must be a finite number"));
    }
    if amount.abs() >= 1e8 {
        return Err(bad_request("Amount exceeds the supported range"));
    }
    Ok(())
}

pub fn validate_date_range(
    start: Option<time::Date>,
    end: Option<time::Date>,
) -> Result<(), ApiError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(bad_request("start_date must not be after end_date"));
        }
    }
    Ok(())
}

pub async fn validate_category_exists(
    user_db: &Arc<RwLock<libsql::Connection>>,
    category_id: &str,
) -> Result<(), ApiError> {
    let conn = user_db.read().await;
    let mut rows = conn
        .query("SELECT id FROM categories WHERE id = ?", [category_id])
        .await
        .map_err(|_| db_error_with_context("failed to check category existence"))?;

    if rows.next().await.map_err(|_| db_error())?.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Category does not exist".to_string(),
        ));
    }
    Ok(())
}

pub async fn validate_projection_exists(
    user_db: &Arc<RwLock<libsql::Connection>>,
    projection_id: &str,
) -> Result<(), ApiError> {
    let conn = user_db.read().await;
    let mut rows = conn
        .query("SELECT id FROM projections WHERE id = ?", [projection_id])
        .await
        .map_err(|_| db_error_with_context("failed to check projection existence"))?;

    if rows.next().await.map_err(|_| db_error())?.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Projection does not exist".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_limit(limit: Option<u32>, default: u32) -> Result<u32, ApiError> {
    match limit {
        Some(l) => {
            if l == 0 {
                Err((
                    StatusCode::BAD_REQUEST,
                    "Limit must be greater than 0".to_string(),
                ))
            } else if l > MAX_LIMIT {
                Err((
                    StatusCode::BAD_REQUEST,
                    format!("Limit cannot exceed {}", MAX_LIMIT),
                ))
            } else {
                Ok(l)
            }
        }
        None => Ok(default),
    }
}

pub fn validate_transactions_limit(limit: Option<u32>) -> Result<u32, ApiError> {
    validate_limit(limit, DEFAULT_TRANSACTIONS_LIMIT)
}

pub fn validate_offset(offset: Option<u32>) -> Result<u32, ApiError> {
    match offset {
        Some(o) => {
            if o > MAX_OFFSET {
                Err((
                    StatusCode::BAD_REQUEST,
                    format!("Offset cannot exceed {}", MAX_OFFSET),
                ))
            } else {
                Ok(o)
            }
        }
        None => Ok(0),
    }
}

pub fn validate_months(months: Option<u32>) -> Result<u32, ApiError> {
    match months {
        Some(m) if m == 0 || m > MAX_MONTHS => Err(bad_request(format!(
            "months must be between 1 and {}",
            MAX_MONTHS
        ))),
        Some(m) => Ok(m),
        None => Ok(DEFAULT_MONTHS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_money_keeps_two_decimals() {
        assert_eq!(round_money(150.0), 150.0);
        assert_eq!(round_money(10.005_f64 + 0.0001), 10.01);
        assert_eq!(round_money(-42.499), -42.5);
    }

    #[test]
    fn limit_defaults_and_bounds() {
        assert_eq!(validate_transactions_limit(None).unwrap(), 100);
        assert_eq!(validate_transactions_limit(Some(10)).unwrap(), 10);
        assert_eq!(
            validate_transactions_limit(Some(0)).unwrap_err().0,
            StatusCode::BAD_REQUEST
        );
        assert!(validate_transactions_limit(Some(MAX_LIMIT + 1)).is_err());
    }

    #[test]
    fn months_must_be_within_a_year() {
        assert_eq!(validate_months(None).unwrap(), 6);
        assert_eq!(validate_months(Some(12)).unwrap(), 12);
        assert!(validate_months(Some(0)).is_err());
        assert!(validate_months(Some(13)).is_err());
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        use time::macros::date;
        assert!(validate_date_range(Some(date!(2024 - 02 - 01)), Some(date!(2024 - 01 - 01))).is_err());
        assert!(validate_date_range(Some(date!(2024 - 01 - 01)), None).is_ok());
    }

    #[test]
    fn iso_dates_roundtrip_through_text() {
        use time::macros::date;
        assert_eq!(format_iso_date(date!(2024 - 03 - 07)), "2024-03-07");
        assert_eq!(parse_iso_date("2024-03-07"), Some(date!(2024 - 03 - 07)));
        assert_eq!(parse_iso_date("07/03/2024"), None);
    }

    #[test]
    fn blank_strings_are_rejected() {
        let (status, message) = validate_string_length("  ", "Description", 10).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Description cannot be empty");
        assert!(validate_string_length("abcdefghijk", "Description", 10).is_err());
    }
}

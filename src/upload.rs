use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use libsql::{TransactionBehavior, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::categories::fetch_categories;
use crate::constants::*;
use crate::database::{Db, optional_integer, optional_text};
use crate::models::{
    BankStatement, ConfirmPayload, ConfirmResponse, ReviewItem, Transaction, UploadResponse,
};
use crate::state::AppState;
use crate::statement_parser;
use crate::transactions::{insert_transaction, validate_description, validate_transaction_amount};
use crate::utils::{
    ApiError, bad_request, db_error, db_error_with_context, format_iso_date, get_user_database,
    not_found, now_timestamp, parse_iso_date, round_money,
};

const STATEMENT_COLUMNS: &str =
    "id, filename, bank_name, period_start, period_end, total_transactions, status, upload_date";

pub fn extract_statement_from_row(row: libsql::Row) -> Result<BankStatement, ApiError> {
    let invalid = |_| db_error_with_context("invalid statement data");
    let period_start = optional_text(&row, 3).map_err(invalid)?;
    let period_end = optional_text(&row, 4).map_err(invalid)?;
    Ok(BankStatement {
        id: row.get(0).map_err(|_| db_error_with_context("invalid statement data"))?,
        filename: row.get(1).map_err(|_| db_error_with_context("invalid statement data"))?,
        bank_name: optional_text(&row, 2).map_err(invalid)?,
        period_start: period_start.as_deref().and_then(parse_iso_date),
        period_end: period_end.as_deref().and_then(parse_iso_date),
        total_transactions: optional_integer(&row, 5)
            .map_err(invalid)?
            .unwrap_or_default()
            .max(0) as u64,
        status: row.get(6).map_err(|_| db_error_with_context("invalid statement data"))?,
        upload_date: optional_integer(&row, 7).map_err(invalid)?.unwrap_or_default(),
    })
}

fn already_confirmed() -> ApiError {
    (
        StatusCode::CONFLICT,
        "Bank statement already confirmed".to_string(),
    )
}

fn is_busy(err: &libsql::Error) -> bool {
    err.to_string().contains("database is locked")
}

async fn fetch_statement(user_db: &Db, id: &str) -> Result<Option<BankStatement>, ApiError> {
    let conn = user_db.read().await;
    let sql = format!("SELECT {} FROM bank_statements WHERE id = ?", STATEMENT_COLUMNS);
    let mut rows = conn
        .query(&sql, [id])
        .await
        .map_err(|_| db_error_with_context("failed to query statement"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok(Some(extract_statement_from_row(row)?)),
        None => Ok(None),
    }
}

/// The user's category names, or the built-in defaults for a fresh account.
async fn available_categories(user_db: &Db) -> Result<Vec<String>, ApiError> {
    let names: Vec<String> = fetch_categories(user_db)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    if names.is_empty() {
        return Ok(DEFAULT_CATEGORY_NAMES.iter().map(|n| n.to_string()).collect());
    }
    Ok(names)
}

/// Parses the upload and stages it for review. Only the statement header is
/// persisted here; rows are written by the confirm step.
pub async fn upload_statement(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, bytes.to_vec()));
    }

    let Some((filename, bytes)) = upload else {
        return Err(bad_request("Missing file field"));
    };
    if !filename.to_lowercase().ends_with(".csv") {
        return Err(bad_request("Only CSV files are supported"));
    }

    let parsed = statement_parser::parse_csv(&bytes).map_err(|e| bad_request(e.to_string()))?;
    if parsed.rows.is_empty() {
        return Err(bad_request("No transactions found in file"));
    }
    let (period_start, period_end) = parsed.period();

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let categories = available_categories(&user_db).await?;

    let statement = BankStatement {
        id: Uuid::new_v4().to_string(),
        filename: filename.clone(),
        bank_name: Some(parsed.bank_name.clone()),
        period_start,
        period_end,
        total_transactions: parsed.rows.len() as u64,
        status: STATEMENT_PENDING_REVIEW.to_string(),
        upload_date: now_timestamp(),
    };
    {
        let conn = user_db.write().await;
        conn.execute(
            "INSERT INTO bank_statements (id, filename, bank_name, period_start, period_end, \
             total_transactions, status, upload_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            libsql::params_from_iter(vec![
                Value::Text(statement.id.clone()),
                Value::Text(statement.filename.clone()),
                Value::Text(parsed.bank_name.clone()),
                statement
                    .period_start
                    .map_or(Value::Null, |d| Value::Text(format_iso_date(d))),
                statement
                    .period_end
                    .map_or(Value::Null, |d| Value::Text(format_iso_date(d))),
                Value::Integer(statement.total_transactions as i64),
                Value::Text(statement.status.clone()),
                Value::Integer(statement.upload_date),
            ]),
        )
        .await
        .map_err(|_| db_error_with_context("failed to record statement"))?;
    }

    let mut review = Vec::with_capacity(parsed.rows.len());
    for (idx, row) in parsed.rows.into_iter().enumerate() {
        let suggested_category = state
            .categorizer
            .suggest(&row.description, row.amount, &categories)
            .await;
        review.push(ReviewItem {
            temp_id: idx as u32,
            date: row.date,
            description: row.description,
            amount: row.amount,
            suggested_category,
        });
    }

    tracing::info!(
        user_id = %user.id,
        statement_id = %statement.id,
        bank = %parsed.bank_name,
        rows = review.len(),
        "statement staged for review"
    );

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            bank_statement_id: statement.id,
            filename,
            bank_name: statement.bank_name,
            total_transactions: statement.total_transactions,
            transactions: review,
            available_categories: categories,
        }),
    ))
}

pub async fn confirm_statement(
    user: AuthUser,
    State(state): State<AppState>,
    Path(statement_id): Path<String>,
    Json(payload): Json<ConfirmPayload>,
) -> Result<(StatusCode, Json<ConfirmResponse>), ApiError> {
    if payload.bank_statement_id != statement_id {
        return Err(bad_request("bank_statement_id does not match the URL"));
    }
    for item in &payload.transactions {
        validate_description(&item.description)?;
        validate_transaction_amount(item.amount)?;
    }

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let statement = fetch_statement(&user_db, &statement_id)
        .await?
        .ok_or_else(|| not_found("Bank statement"))?;
    if statement.status == STATEMENT_COMPLETED {
        return Err(already_confirmed());
    }

    let known_categories: HashSet<String> = fetch_categories(&user_db)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let total = payload.transactions.len() as u64;
    let conn = user_db.write().await;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .await
        .map_err(|e| {
            if is_busy(&e) {
                already_confirmed()
            } else {
                db_error_with_context("failed to begin transaction")
            }
        })?;

    // Claim the statement before writing rows; a concurrent confirm finds nothing to claim
    let claimed = tx
        .execute(
            "UPDATE bank_statements SET status = ?, total_transactions = ? \
             WHERE id = ? AND status = ?",
            libsql::params_from_iter(vec![
                Value::Text(STATEMENT_COMPLETED.to_string()),
                Value::Integer(total as i64),
                Value::Text(statement.id.clone()),
                Value::Text(STATEMENT_PENDING_REVIEW.to_string()),
            ]),
        )
        .await
        .map_err(|_| db_error_with_context("failed to update statement"))?;
    if claimed == 0 {
        return Err(already_confirmed());
    }

    for item in payload.transactions {
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            date: item.date,
            description: item.description.trim().to_string(),
            amount: round_money(item.amount),
            // Unknown ids are dropped rather than failing the batch
            category_id: item
                .category_id
                .filter(|id| known_categories.contains(id)),
            projection_id: None,
            bank_statement_id: Some(statement.id.clone()),
            is_manual: false,
            is_projection: false,
            created_at: now_timestamp(),
            updated_at: None,
        };
        insert_transaction(&tx, &transaction).await.map_err(|e| {
            tracing::error!(error = %e, "statement row insert failed");
            db_error_with_context("failed to save transactions")
        })?;
    }

    tx.commit()
        .await
        .map_err(|_| db_error_with_context("failed to commit statement"))?;

    tracing::info!(user_id = %user.id, statement_id = %statement.id, total, "statement confirmed");
    Ok((
        StatusCode::OK,
        Json(ConfirmResponse {
            message: "Transactions imported successfully".to_string(),
            total,
        }),
    ))
}

pub async fn list_statements(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<BankStatement>>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let conn = user_db.read().await;
    let sql = format!(
        "SELECT {} FROM bank_statements ORDER BY upload_date DESC, rowid DESC",
        STATEMENT_COLUMNS
    );
    let mut rows = conn
        .query(&sql, ())
        .await
        .map_err(|_| db_error_with_context("failed to list statements"))?;

    let mut statements = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        statements.push(extract_statement_from_row(row)?);
    }
    Ok((StatusCode::OK, Json(statements)))
}

pub async fn delete_statement(
    user: AuthUser,
    State(state): State<AppState>,
    Path(statement_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let conn = user_db.write().await;

    let affected = conn
        .execute(
            "DELETE FROM bank_statements WHERE id = ?",
            [statement_id.as_str()],
        )
        .await
        .map_err(|_| db_error_with_context("statement deletion failed"))?;
    if affected == 0 {
        return Err(not_found("Bank statement"));
    }

    conn.execute(
        "DELETE FROM transactions WHERE bank_statement_id = ?",
        [statement_id.as_str()],
    )
    .await
    .map_err(|_| db_error_with_context("failed to delete statement transactions"))?;

    tracing::info!(user_id = %user.id, statement_id = %statement_id, "deleted statement");
    Ok(StatusCode::NO_CONTENT)
}

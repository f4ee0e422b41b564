use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use libsql::Value;
use time::Date;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::constants::*;
use crate::database::{Db, flag, optional_integer, optional_text, real, text_or_null};
use crate::models::{
    CreateTransactionPayload, ListTransactionsQuery, Summary, SummaryQuery, Transaction,
    TransactionListResponse, UpdateTransactionPayload,
};
use crate::state::AppState;
use crate::utils::{
    ApiError, bad_request, db_error, db_error_with_context, format_iso_date, get_user_database,
    not_found, now_timestamp, parse_iso_date, round_money, validate_amount,
    validate_category_exists, validate_date_range, validate_offset, validate_projection_exists,
    validate_string_length, validate_transactions_limit,
};

pub const TRANSACTION_COLUMNS: &str = "id, date, description, amount, category_id, projection_id, \
     bank_statement_id, is_manual, is_projection, created_at, updated_at";

/// Row filter shared by listing, summaries and the stats endpoints.
/// `is_projection` is always applied so ledger and scenario data never mix.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub is_projection: bool,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub category_id: Option<String>,
    pub projection_id: Option<String>,
    pub expenses_only: bool,
}

impl LedgerFilter {
    pub fn ledger() -> Self {
        LedgerFilter::default()
    }

    pub fn scenario(projection_id: &str) -> Self {
        LedgerFilter {
            is_projection: true,
            projection_id: Some(projection_id.to_string()),
            ..Default::default()
        }
    }

    pub fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = vec!["is_projection = ?".to_string()];
        let mut params = vec![flag(self.is_projection)];

        if let Some(start) = self.start_date {
            clauses.push("date >= ?".to_string());
            params.push(Value::Text(format_iso_date(start)));
        }
        if let Some(end) = self.end_date {
            clauses.push("date <= ?".to_string());
            params.push(Value::Text(format_iso_date(end)));
        }
        if let Some(category_id) = &self.category_id {
            clauses.push("category_id = ?".to_string());
            params.push(Value::Text(category_id.clone()));
        }
        if let Some(projection_id) = &self.projection_id {
            clauses.push("projection_id = ?".to_string());
            params.push(Value::Text(projection_id.clone()));
        }
        if self.expenses_only {
            clauses.push("amount < 0".to_string());
        }

        (format!("WHERE {}", clauses.join(" AND ")), params)
    }
}

pub fn extract_transaction_from_row(row: libsql::Row) -> Result<Transaction, ApiError> {
    let invalid = |e: anyhow::Error| {
        tracing::error!(error = %e, "invalid transaction row");
        db_error_with_context("invalid transaction data")
    };
    let get_text = |idx: i32| -> Result<String, ApiError> {
        row.get::<String>(idx)
            .map_err(|_| db_error_with_context("invalid transaction data"))
    };

    let raw_date = get_text(1)?;
    let date = parse_iso_date(&raw_date)
        .ok_or_else(|| db_error_with_context("invalid transaction date"))?;

    Ok(Transaction {
        id: get_text(0)?,
        date,
        description: get_text(2)?,
        amount: real(&row, 3).map_err(invalid)?,
        category_id: optional_text(&row, 4).map_err(invalid)?,
        projection_id: optional_text(&row, 5).map_err(invalid)?,
        bank_statement_id: optional_text(&row, 6).map_err(invalid)?,
        is_manual: optional_integer(&row, 7).map_err(invalid)?.unwrap_or(0) != 0,
        is_projection: optional_integer(&row, 8).map_err(invalid)?.unwrap_or(0) != 0,
        created_at: optional_integer(&row, 9).map_err(invalid)?.unwrap_or_default(),
        updated_at: optional_integer(&row, 10).map_err(invalid)?,
    })
}

pub fn validate_description(description: &str) -> Result<(), ApiError> {
    validate_string_length(description, "Description", MAX_DESCRIPTION_LENGTH)
}

pub fn validate_transaction_amount(amount: f64) -> Result<(), ApiError> {
    validate_amount(amount)?;
    if round_money(amount) == 0.0 {
        return Err(bad_request("Transaction amount cannot be zero"));
    }
    Ok(())
}

pub async fn insert_transaction(
    conn: &libsql::Connection,
    transaction: &Transaction,
) -> Result<(), libsql::Error> {
    let sql = format!(
        "INSERT INTO transactions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        TRANSACTION_COLUMNS
    );
    conn.execute(
        &sql,
        libsql::params_from_iter(vec![
            Value::Text(transaction.id.clone()),
            Value::Text(format_iso_date(transaction.date)),
            Value::Text(transaction.description.clone()),
            Value::Real(transaction.amount),
            text_or_null(transaction.category_id.as_deref()),
            text_or_null(transaction.projection_id.as_deref()),
            text_or_null(transaction.bank_statement_id.as_deref()),
            flag(transaction.is_manual),
            flag(transaction.is_projection),
            Value::Integer(transaction.created_at),
            match transaction.updated_at {
                Some(ts) => Value::Integer(ts),
                None => Value::Null,
            },
        ]),
    )
    .await?;
    Ok(())
}

pub async fn fetch_transaction(user_db: &Db, id: &str) -> Result<Option<Transaction>, ApiError> {
    let conn = user_db.read().await;
    let sql = format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS);
    let mut rows = conn
        .query(&sql, [id])
        .await
        .map_err(|_| db_error_with_context("failed to query transaction"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok(Some(extract_transaction_from_row(row)?)),
        None => Ok(None),
    }
}

/// Newest first; ties broken by insertion order so pages are stable.
pub async fn fetch_transactions(
    user_db: &Db,
    filter: &LedgerFilter,
    skip: u32,
    limit: u32,
) -> Result<(Vec<Transaction>, u64), ApiError> {
    let conn = user_db.read().await;
    let (where_clause, params) = filter.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM transactions {}", where_clause);
    let mut count_rows = conn
        .query(&count_sql, libsql::params_from_iter(params.clone()))
        .await
        .map_err(|_| db_error_with_context("failed to count transactions"))?;
    let total: i64 = match count_rows.next().await.map_err(|_| db_error())? {
        Some(row) => row
            .get(0)
            .map_err(|_| db_error_with_context("failed to read count"))?,
        None => 0,
    };

    let list_sql = format!(
        "SELECT {} FROM transactions {} ORDER BY date DESC, created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        TRANSACTION_COLUMNS, where_clause
    );
    let mut list_params = params;
    list_params.push(Value::Integer(i64::from(limit)));
    list_params.push(Value::Integer(i64::from(skip)));

    let mut rows = conn
        .query(&list_sql, libsql::params_from_iter(list_params))
        .await
        .map_err(|_| db_error_with_context("failed to query transactions"))?;

    let mut transactions = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        transactions.push(extract_transaction_from_row(row)?);
    }

    Ok((transactions, total.max(0) as u64))
}

pub async fn compute_summary(user_db: &Db, filter: &LedgerFilter) -> Result<Summary, ApiError> {
    let conn = user_db.read().await;
    let (where_clause, params) = filter.where_clause();
    let sql = format!(
        "SELECT \
            COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0.0), \
            COALESCE(SUM(CASE WHEN amount < 0 THEN -amount ELSE 0 END), 0.0), \
            COUNT(*) \
         FROM transactions {}",
        where_clause
    );
    let mut rows = conn
        .query(&sql, libsql::params_from_iter(params))
        .await
        .map_err(|_| db_error_with_context("failed to summarize transactions"))?;

    let Some(row) = rows.next().await.map_err(|_| db_error())? else {
        return Ok(Summary::default());
    };
    let invalid = |_| db_error_with_context("invalid summary data");
    let total_income = round_money(real(&row, 0).map_err(invalid)?);
    let total_expenses = round_money(real(&row, 1).map_err(invalid)?);
    let count: i64 = row.get(2).map_err(|_| db_error_with_context("invalid summary data"))?;

    Ok(Summary {
        balance: round_money(total_income - total_expenses),
        total_income,
        total_expenses,
        total_transactions: count.max(0) as u64,
    })
}

pub async fn list_transactions(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<(StatusCode, Json<TransactionListResponse>), ApiError> {
    let limit = validate_transactions_limit(query.limit)?;
    let skip = validate_offset(query.skip)?;
    validate_date_range(query.start_date, query.end_date)?;

    let filter = LedgerFilter {
        is_projection: query.is_projection.unwrap_or(false),
        start_date: query.start_date,
        end_date: query.end_date,
        category_id: query.category_id,
        projection_id: query.projection_id,
        ..Default::default()
    };

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let (transactions, total) = fetch_transactions(&user_db, &filter, skip, limit).await?;

    Ok((
        StatusCode::OK,
        Json(TransactionListResponse {
            transactions,
            total,
        }),
    ))
}

pub async fn get_transaction(
    user: AuthUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let transaction = fetch_transaction(&user_db, &transaction_id)
        .await?
        .ok_or_else(|| not_found("Transaction"))?;
    Ok((StatusCode::OK, Json(transaction)))
}

pub async fn create_transaction(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    // Input validation
    validate_description(&payload.description)?;
    validate_transaction_amount(payload.amount)?;
    if payload.projection_id.is_some() && !payload.is_projection {
        return Err(bad_request("projection_id requires is_projection = true"));
    }

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    if let Some(category_id) = &payload.category_id {
        validate_category_exists(&user_db, category_id).await?;
    }
    if let Some(projection_id) = &payload.projection_id {
        validate_projection_exists(&user_db, projection_id).await?;
    }

    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        date: payload.date,
        description: payload.description.trim().to_string(),
        amount: round_money(payload.amount),
        category_id: payload.category_id,
        projection_id: payload.projection_id,
        bank_statement_id: None,
        is_manual: payload.is_manual,
        is_projection: payload.is_projection,
        created_at: now_timestamp(),
        updated_at: None,
    };

    let conn = user_db.write().await;
    insert_transaction(&conn, &transaction)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "transaction insert failed");
            db_error_with_context("transaction creation failed")
        })?;

    tracing::info!(user_id = %user.id, transaction_id = %transaction.id, "created transaction");
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn update_transaction(
    user: AuthUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Json(payload): Json<UpdateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let mut transaction = fetch_transaction(&user_db, &transaction_id)
        .await?
        .ok_or_else(|| not_found("Transaction"))?;

    // Apply only the provided fields
    if let Some(date) = payload.date {
        transaction.date = date;
    }
    if let Some(description) = payload.description {
        validate_description(&description)?;
        transaction.description = description.trim().to_string();
    }
    if let Some(amount) = payload.amount {
        validate_transaction_amount(amount)?;
        transaction.amount = round_money(amount);
    }
    if let Some(category_id) = payload.category_id {
        if let Some(id) = &category_id {
            validate_category_exists(&user_db, id).await?;
        }
        transaction.category_id = category_id;
    }
    transaction.updated_at = Some(now_timestamp());

    let conn = user_db.write().await;
    conn.execute(
        "UPDATE transactions SET date = ?, description = ?, amount = ?, category_id = ?, updated_at = ? WHERE id = ?",
        (
            format_iso_date(transaction.date),
            transaction.description.as_str(),
            transaction.amount,
            text_or_null(transaction.category_id.as_deref()),
            transaction.updated_at.unwrap_or_default(),
            transaction.id.as_str(),
        ),
    )
    .await
    .map_err(|_| db_error_with_context("transaction update failed"))?;

    Ok((StatusCode::OK, Json(transaction)))
}

pub async fn delete_transaction(
    user: AuthUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let conn = user_db.write().await;
    let affected = conn
        .execute(
            "DELETE FROM transactions WHERE id = ?",
            [transaction_id.as_str()],
        )
        .await
        .map_err(|_| db_error_with_context("transaction deletion failed"))?;

    if affected == 0 {
        return Err(not_found("Transaction"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_summary(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<(StatusCode, Json<Summary>), ApiError> {
    validate_date_range(query.start_date, query.end_date)?;
    let filter = LedgerFilter {
        is_projection: query.is_projection.unwrap_or(false),
        start_date: query.start_date,
        end_date: query.end_date,
        ..Default::default()
    };

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let summary = compute_summary(&user_db, &filter).await?;
    Ok((StatusCode::OK, Json(summary)))
}

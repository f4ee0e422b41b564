use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use libsql::Value;
use time::{Date, Month};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::constants::*;
use crate::database::{Db, flag, optional_integer, optional_text};
use crate::models::{
    ComparisonDifference, CreateProjectionPayload, FromMonthQuery, PeriodTotals, Projection,
    ProjectionComparison, ProjectionSide, ProjectionWithStats, UpdateProjectionPayload,
};
use crate::state::AppState;
use crate::transactions::{LedgerFilter, compute_summary, fetch_transactions, insert_transaction};
use crate::utils::{
    ApiError, bad_request, db_error, db_error_with_context, format_iso_date, get_user_database,
    not_found, now_timestamp, parse_iso_date, round_money, validate_date_range,
    validate_string_length,
};

const PROJECTION_COLUMNS: &str =
    "id, name, description, start_date, end_date, is_active, created_at, updated_at";

pub fn validate_projection_name(name: &str) -> Result<(), ApiError> {
    validate_string_length(name, "Projection name", MAX_PROJECTION_NAME_LENGTH)
}

fn optional_date(row: &libsql::Row, idx: i32) -> Result<Option<Date>, ApiError> {
    let raw = optional_text(row, idx).map_err(|_| db_error_with_context("invalid projection data"))?;
    Ok(raw.as_deref().and_then(parse_iso_date))
}

fn date_or_null(date: Option<Date>) -> Value {
    match date {
        Some(d) => Value::Text(format_iso_date(d)),
        None => Value::Null,
    }
}

pub fn extract_projection_from_row(row: libsql::Row) -> Result<Projection, ApiError> {
    let invalid = |_| db_error_with_context("invalid projection data");
    Ok(Projection {
        id: row.get(0).map_err(|_| db_error_with_context("invalid projection data"))?,
        name: row.get(1).map_err(|_| db_error_with_context("invalid projection data"))?,
        description: optional_text(&row, 2).map_err(invalid)?,
        start_date: optional_date(&row, 3)?,
        end_date: optional_date(&row, 4)?,
        is_active: optional_integer(&row, 5).map_err(invalid)?.unwrap_or(1) != 0,
        created_at: optional_integer(&row, 6).map_err(invalid)?.unwrap_or_default(),
        updated_at: optional_integer(&row, 7).map_err(invalid)?,
    })
}

pub async fn fetch_projection(user_db: &Db, id: &str) -> Result<Option<Projection>, ApiError> {
    let conn = user_db.read().await;
    let sql = format!("SELECT {} FROM projections WHERE id = ?", PROJECTION_COLUMNS);
    let mut rows = conn
        .query(&sql, [id])
        .await
        .map_err(|_| db_error_with_context("failed to query projection"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok(Some(extract_projection_from_row(row)?)),
        None => Ok(None),
    }
}

/// Aggregates are always computed from the scenario's own transaction set.
async fn with_stats(user_db: &Db, projection: Projection) -> Result<ProjectionWithStats, ApiError> {
    let summary = compute_summary(user_db, &LedgerFilter::scenario(&projection.id)).await?;
    Ok(ProjectionWithStats {
        projection,
        total_transactions: summary.total_transactions,
        total_income: summary.total_income,
        total_expenses: summary.total_expenses,
        balance: summary.balance,
    })
}

async fn insert_projection(conn: &libsql::Connection, projection: &Projection) -> Result<(), ApiError> {
    conn.execute(
        "INSERT INTO projections (id, name, description, start_date, end_date, is_active, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        libsql::params_from_iter(vec![
            Value::Text(projection.id.clone()),
            Value::Text(projection.name.clone()),
            match &projection.description {
                Some(d) => Value::Text(d.clone()),
                None => Value::Null,
            },
            date_or_null(projection.start_date),
            date_or_null(projection.end_date),
            flag(projection.is_active),
            Value::Integer(projection.created_at),
        ]),
    )
    .await
    .map_err(|_| db_error_with_context("projection creation failed"))?;
    Ok(())
}

pub async fn list_projections(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<ProjectionWithStats>>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;

    let projections = {
        let conn = user_db.read().await;
        let sql = format!(
            "SELECT {} FROM projections ORDER BY created_at DESC, rowid DESC",
            PROJECTION_COLUMNS
        );
        let mut rows = conn
            .query(&sql, ())
            .await
            .map_err(|_| db_error_with_context("failed to list projections"))?;
        let mut projections = Vec::new();
        while let Some(row) = rows.next().await.map_err(|_| db_error())? {
            projections.push(extract_projection_from_row(row)?);
        }
        projections
    };

    let mut result = Vec::with_capacity(projections.len());
    for projection in projections {
        result.push(with_stats(&user_db, projection).await?);
    }
    Ok((StatusCode::OK, Json(result)))
}

pub async fn get_projection(
    user: AuthUser,
    State(state): State<AppState>,
    Path(projection_id): Path<String>,
) -> Result<(StatusCode, Json<ProjectionWithStats>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let projection = fetch_projection(&user_db, &projection_id)
        .await?
        .ok_or_else(|| not_found("Projection"))?;
    let projection = with_stats(&user_db, projection).await?;
    Ok((StatusCode::OK, Json(projection)))
}

pub async fn create_projection(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectionPayload>,
) -> Result<(StatusCode, Json<Projection>), ApiError> {
    validate_projection_name(&payload.name)?;
    validate_date_range(payload.start_date, payload.end_date)?;

    let projection = Projection {
        id: Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        description: payload.description.filter(|d| !d.trim().is_empty()),
        start_date: payload.start_date,
        end_date: payload.end_date,
        is_active: payload.is_active,
        created_at: now_timestamp(),
        updated_at: None,
    };

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let conn = user_db.write().await;
    insert_projection(&conn, &projection).await?;

    tracing::info!(user_id = %user.id, projection_id = %projection.id, "created projection");
    Ok((StatusCode::CREATED, Json(projection)))
}

/// Clones one calendar month of the ledger into a fresh scenario.
pub async fn create_projection_from_month(
    user: AuthUser,
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u8)>,
    Query(query): Query<FromMonthQuery>,
) -> Result<(StatusCode, Json<Projection>), ApiError> {
    validate_projection_name(&query.name)?;
    let month_enum = Month::try_from(month).map_err(|_| bad_request("Invalid month"))?;
    let start_date = Date::from_calendar_date(year, month_enum, 1)
        .map_err(|_| bad_request("Invalid year"))?;
    let end_date = Date::from_calendar_date(year, month_enum, month_enum.length(year))
        .map_err(|_| bad_request("Invalid year"))?;

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let ledger = LedgerFilter {
        start_date: Some(start_date),
        end_date: Some(end_date),
        ..Default::default()
    };
    let (source, _) = fetch_transactions(&user_db, &ledger, 0, u32::MAX).await?;

    let projection = Projection {
        id: Uuid::new_v4().to_string(),
        name: query.name.trim().to_string(),
        description: Some(format!("Projeção baseada em {:02}/{}", month, year)),
        start_date: Some(start_date),
        end_date: Some(end_date),
        is_active: true,
        created_at: now_timestamp(),
        updated_at: None,
    };

    let conn = user_db.write().await;
    let tx = conn
        .transaction()
        .await
        .map_err(|_| db_error_with_context("failed to begin transaction"))?;
    insert_projection(&tx, &projection).await?;
    for original in source {
        let mut copy = original;
        copy.id = Uuid::new_v4().to_string();
        copy.projection_id = Some(projection.id.clone());
        copy.bank_statement_id = None;
        copy.is_manual = true;
        copy.is_projection = true;
        copy.created_at = now_timestamp();
        copy.updated_at = None;
        insert_transaction(&tx, &copy)
            .await
            .map_err(|_| db_error_with_context("failed to copy transaction"))?;
    }
    tx.commit()
        .await
        .map_err(|_| db_error_with_context("failed to commit projection"))?;

    tracing::info!(user_id = %user.id, projection_id = %projection.id, year, month, "projection created from month");
    Ok((StatusCode::CREATED, Json(projection)))
}

pub async fn update_projection(
    user: AuthUser,
    State(state): State<AppState>,
    Path(projection_id): Path<String>,
    Json(payload): Json<UpdateProjectionPayload>,
) -> Result<(StatusCode, Json<Projection>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let mut projection = fetch_projection(&user_db, &projection_id)
        .await?
        .ok_or_else(|| not_found("Projection"))?;

    if let Some(name) = payload.name {
        validate_projection_name(&name)?;
        projection.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        projection.description = Some(description).filter(|d| !d.trim().is_empty());
    }
    if payload.start_date.is_some() {
        projection.start_date = payload.start_date;
    }
    if payload.end_date.is_some() {
        projection.end_date = payload.end_date;
    }
    if let Some(is_active) = payload.is_active {
        projection.is_active = is_active;
    }
    validate_date_range(projection.start_date, projection.end_date)?;
    projection.updated_at = Some(now_timestamp());

    let conn = user_db.write().await;
    conn.execute(
        "UPDATE projections SET name = ?, description = ?, start_date = ?, end_date = ?, \
         is_active = ?, updated_at = ? WHERE id = ?",
        libsql::params_from_iter(vec![
            Value::Text(projection.name.clone()),
            match &projection.description {
                Some(d) => Value::Text(d.clone()),
                None => Value::Null,
            },
            date_or_null(projection.start_date),
            date_or_null(projection.end_date),
            flag(projection.is_active),
            Value::Integer(projection.updated_at.unwrap_or_default()),
            Value::Text(projection.id.clone()),
        ]),
    )
    .await
    .map_err(|_| db_error_with_context("projection update failed"))?;

    Ok((StatusCode::OK, Json(projection)))
}

pub async fn delete_projection(
    user: AuthUser,
    State(state): State<AppState>,
    Path(projection_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let conn = user_db.write().await;

    let affected = conn
        .execute("DELETE FROM projections WHERE id = ?", [projection_id.as_str()])
        .await
        .map_err(|_| db_error_with_context("projection deletion failed"))?;
    if affected == 0 {
        return Err(not_found("Projection"));
    }

    // Scenario transactions go with their scenario
    conn.execute(
        "DELETE FROM transactions WHERE projection_id = ? AND is_projection = 1",
        [projection_id.as_str()],
    )
    .await
    .map_err(|_| db_error_with_context("failed to delete projection transactions"))?;

    tracing::info!(user_id = %user.id, projection_id = %projection_id, "deleted projection");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn compare_projection(
    user: AuthUser,
    State(state): State<AppState>,
    Path(projection_id): Path<String>,
) -> Result<(StatusCode, Json<ProjectionComparison>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let projection = fetch_projection(&user_db, &projection_id)
        .await?
        .ok_or_else(|| not_found("Projection"))?;

    let scenario = compute_summary(&user_db, &LedgerFilter::scenario(&projection.id)).await?;

    // Without both bounds there is no comparable ledger period
    let real = match (projection.start_date, projection.end_date) {
        (Some(start), Some(end)) => {
            let filter = LedgerFilter {
                start_date: Some(start),
                end_date: Some(end),
                ..Default::default()
            };
            compute_summary(&user_db, &filter).await?
        }
        _ => Default::default(),
    };

    let comparison = ProjectionComparison {
        projection: ProjectionSide {
            name: projection.name,
            totals: PeriodTotals {
                total_income: scenario.total_income,
                total_expenses: scenario.total_expenses,
                balance: scenario.balance,
                transactions_count: scenario.total_transactions,
            },
        },
        real: PeriodTotals {
            total_income: real.total_income,
            total_expenses: real.total_expenses,
            balance: real.balance,
            transactions_count: real.total_transactions,
        },
        difference: ComparisonDifference {
            income: round_money(scenario.total_income - real.total_income),
            expenses: round_money(scenario.total_expenses - real.total_expenses),
            balance: round_money(scenario.balance - real.balance),
        },
    };

    Ok((StatusCode::OK, Json(comparison)))
}

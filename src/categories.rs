use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::constants::*;
use crate::database::{
    Db, is_unique_violation, optional_integer, optional_real, optional_text, real_or_null,
    text_or_null,
};
use crate::models::{Category, CreateCategoryPayload, UpdateCategoryPayload};
use crate::state::AppState;
use crate::utils::{
    ApiError, bad_request, db_error, db_error_with_context, get_user_database, not_found,
    now_timestamp, round_money, validate_amount, validate_string_length,
};

const CATEGORY_COLUMNS: &str = "id, name, color, icon, budget_limit, created_at";

pub fn validate_category_name(name: &str) -> Result<(), ApiError> {
    validate_string_length(name, "Category name", MAX_CATEGORY_NAME_LENGTH)
}

pub fn validate_budget_limit(limit: Option<f64>) -> Result<Option<f64>, ApiError> {
    match limit {
        Some(value) => {
            validate_amount(value)?;
            if value < 0.0 {
                return Err(bad_request("Budget limit cannot be negative"));
            }
            Ok(Some(round_money(value)))
        }
        None => Ok(None),
    }
}

pub fn extract_category_from_row(row: libsql::Row) -> Result<Category, ApiError> {
    let invalid = |_| db_error_with_context("invalid category data");
    Ok(Category {
        id: row.get(0).map_err(|_| db_error_with_context("invalid category data"))?,
        name: row.get(1).map_err(|_| db_error_with_context("invalid category data"))?,
        color: optional_text(&row, 2).map_err(invalid)?,
        icon: optional_text(&row, 3).map_err(invalid)?,
        budget_limit: optional_real(&row, 4).map_err(invalid)?,
        created_at: optional_integer(&row, 5).map_err(invalid)?.unwrap_or_default(),
    })
}

pub async fn fetch_category(user_db: &Db, category_id: &str) -> Result<Option<Category>, ApiError> {
    let conn = user_db.read().await;
    let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
    let mut rows = conn
        .query(&sql, [category_id])
        .await
        .map_err(|_| db_error_with_context("failed to query category"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok(Some(extract_category_from_row(row)?)),
        None => Ok(None),
    }
}

pub async fn fetch_categories(user_db: &Db) -> Result<Vec<Category>, ApiError> {
    let conn = user_db.read().await;
    let sql = format!(
        "SELECT {} FROM categories ORDER BY name COLLATE NOCASE ASC",
        CATEGORY_COLUMNS
    );
    let mut rows = conn
        .query(&sql, ())
        .await
        .map_err(|_| db_error_with_context("failed to list categories"))?;

    let mut categories = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        categories.push(extract_category_from_row(row)?);
    }
    Ok(categories)
}

/// Case-insensitive name clash, ignoring `except_id` so renames to the same name pass.
fn name_conflict() -> ApiError {
    (
        StatusCode::CONFLICT,
        "Category name already exists (case-insensitive)".to_string(),
    )
}

fn name_conflict_or(err: libsql::Error, context: &str) -> ApiError {
    if is_unique_violation(&err) {
        name_conflict()
    } else {
        db_error_with_context(context)
    }
}

async fn ensure_name_available(
    conn: &libsql::Connection,
    name: &str,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    let mut existing_rows = conn
        .query(
            "SELECT id FROM categories WHERE LOWER(name) = LOWER(?) AND id != ?",
            (name, except_id.unwrap_or("")),
        )
        .await
        .map_err(|_| db_error_with_context("failed to check existing category"))?;

    if existing_rows
        .next()
        .await
        .map_err(|_| db_error())?
        .is_some()
    {
        return Err(name_conflict());
    }
    Ok(())
}

pub async fn list_categories(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<Category>>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let categories = fetch_categories(&user_db).await?;
    Ok((StatusCode::OK, Json(categories)))
}

pub async fn get_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let category = fetch_category(&user_db, &category_id)
        .await?
        .ok_or_else(|| not_found("Category"))?;
    Ok((StatusCode::OK, Json(category)))
}

pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    // Input validation and sanitization
    validate_category_name(&payload.name)?;
    let category_name = payload.name.trim().to_string();
    let budget_limit = validate_budget_limit(payload.budget_limit)?;
    let color = payload
        .color
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string());
    let icon = payload.icon.filter(|i| !i.trim().is_empty());

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;

    // The unique name index settles races the pre-check misses
    let conn = user_db.write().await;
    ensure_name_available(&conn, &category_name, None).await?;

    let category = Category {
        id: Uuid::new_v4().to_string(),
        name: category_name,
        color: Some(color),
        icon,
        budget_limit,
        created_at: now_timestamp(),
    };
    conn.execute(
        "INSERT INTO categories (id, name, color, icon, budget_limit, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        (
            category.id.as_str(),
            category.name.as_str(),
            text_or_null(category.color.as_deref()),
            text_or_null(category.icon.as_deref()),
            real_or_null(category.budget_limit),
            category.created_at,
        ),
    )
    .await
    .map_err(|e| name_conflict_or(e, "category creation failed"))?;

    tracing::info!(user_id = %user.id, category_id = %category.id, "created category");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let mut category = fetch_category(&user_db, &category_id)
        .await?
        .ok_or_else(|| not_found("Category"))?;

    if let Some(name) = payload.name {
        validate_category_name(&name)?;
        category.name = name.trim().to_string();
    }
    if let Some(color) = payload.color {
        let color = color.trim().to_string();
        category.color = if color.is_empty() { None } else { Some(color) };
    }
    if let Some(icon) = payload.icon {
        category.icon = Some(icon).filter(|i| !i.trim().is_empty());
    }
    // Absent leaves the stored limit alone; explicit null clears it.
    if let Some(limit) = payload.budget_limit {
        category.budget_limit = validate_budget_limit(limit)?;
    }

    let conn = user_db.write().await;
    ensure_name_available(&conn, &category.name, Some(&category.id)).await?;
    conn.execute(
        "UPDATE categories SET name = ?, color = ?, icon = ?, budget_limit = ? WHERE id = ?",
        (
            category.name.as_str(),
            text_or_null(category.color.as_deref()),
            text_or_null(category.icon.as_deref()),
            real_or_null(category.budget_limit),
            category.id.as_str(),
        ),
    )
    .await
    .map_err(|e| name_conflict_or(e, "category update failed"))?;

    Ok((StatusCode::OK, Json(category)))
}

pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let conn = user_db.write().await;

    let affected = conn
        .execute("DELETE FROM categories WHERE id = ?", [category_id.as_str()])
        .await
        .map_err(|_| db_error_with_context("category deletion failed"))?;
    if affected == 0 {
        return Err(not_found("Category"));
    }

    // Transactions keep existing without a category
    conn.execute(
        "UPDATE transactions SET category_id = NULL WHERE category_id = ?",
        [category_id.as_str()],
    )
    .await
    .map_err(|_| db_error_with_context("failed to detach transactions"))?;

    tracing::info!(user_id = %user.id, category_id = %category_id, "deleted category");
    Ok(StatusCode::NO_CONTENT)
}

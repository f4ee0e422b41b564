use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use std::collections::HashMap;
use time::{Date, Month};

use crate::auth::AuthUser;
use crate::constants::*;
use crate::database::{Db, optional_text, real};
use crate::models::{CategoryStat, MonthlyQuery, MonthlyStat, SummaryQuery};
use crate::state::AppState;
use crate::transactions::LedgerFilter;
use crate::utils::{
    ApiError, db_error, db_error_with_context, get_user_database, round_money, today,
    validate_date_range, validate_months,
};

const PT_BR_MONTHS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

pub fn pt_month_abbr(month: u8) -> &'static str {
    PT_BR_MONTHS[usize::from(month.clamp(1, 12)) - 1]
}

/// The `months` calendar months ending at `today`'s month, oldest first.
pub fn month_window(today: Date, months: u32) -> Vec<(i32, u8)> {
    let current = today.year() * 12 + i32::from(u8::from(today.month())) - 1;
    (0..months as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            (index.div_euclid(12), (index.rem_euclid(12) + 1) as u8)
        })
        .collect()
}

fn month_key(year: i32, month: u8) -> String {
    format!("{:04}-{:02}", year, month)
}

fn last_day_of_month(year: i32, month: u8) -> Option<Date> {
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, month.length(year)).ok()
}

pub async fn compute_monthly(
    user_db: &Db,
    is_projection: bool,
    today: Date,
    months: u32,
) -> Result<Vec<MonthlyStat>, ApiError> {
    let window = month_window(today, months);
    let (Some(&(first_year, first_month)), Some(&(last_year, last_month))) =
        (window.first(), window.last())
    else {
        return Ok(Vec::new());
    };

    let filter = LedgerFilter {
        is_projection,
        start_date: Month::try_from(first_month)
            .ok()
            .and_then(|m| Date::from_calendar_date(first_year, m, 1).ok()),
        end_date: last_day_of_month(last_year, last_month),
        ..Default::default()
    };
    let (where_clause, params) = filter.where_clause();
    let sql = format!(
        "SELECT substr(date, 1, 7) AS month_key, \
            COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0.0), \
            COALESCE(SUM(CASE WHEN amount < 0 THEN -amount ELSE 0 END), 0.0) \
         FROM transactions {} GROUP BY month_key",
        where_clause
    );

    let conn = user_db.read().await;
    let mut rows = conn
        .query(&sql, libsql::params_from_iter(params))
        .await
        .map_err(|_| db_error_with_context("failed to aggregate monthly stats"))?;

    let mut totals: HashMap<String, (f64, f64)> = HashMap::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        let invalid = |_| db_error_with_context("invalid monthly data");
        let key: String = row
            .get(0)
            .map_err(|_| db_error_with_context("invalid monthly data"))?;
        let income = real(&row, 1).map_err(invalid)?;
        let expenses = real(&row, 2).map_err(invalid)?;
        totals.insert(key, (income, expenses));
    }

    Ok(window
        .into_iter()
        .map(|(year, month)| {
            let key = month_key(year, month);
            let (income, expenses) = totals.get(&key).copied().unwrap_or((0.0, 0.0));
            MonthlyStat {
                month: pt_month_abbr(month).to_string(),
                month_key: key,
                income: round_money(income),
                expenses: round_money(expenses),
                balance: round_money(income - expenses),
            }
        })
        .collect())
}

pub async fn compute_by_category(
    user_db: &Db,
    filter: &LedgerFilter,
) -> Result<Vec<CategoryStat>, ApiError> {
    let filter = LedgerFilter {
        expenses_only: true,
        ..filter.clone()
    };
    let (where_clause, params) = filter.where_clause();
    let sql = format!(
        "SELECT c.name, c.color, SUM(-amount) FROM transactions t \
         LEFT JOIN categories c ON c.id = t.category_id {} GROUP BY t.category_id",
        where_clause
    );

    let conn = user_db.read().await;
    let mut rows = conn
        .query(&sql, libsql::params_from_iter(params))
        .await
        .map_err(|_| db_error_with_context("failed to aggregate category stats"))?;

    // Missing categories fold into one uncategorized bucket
    let mut stats: Vec<CategoryStat> = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        let invalid = |_| db_error_with_context("invalid category stats");
        let name = optional_text(&row, 0).map_err(invalid)?;
        let color = optional_text(&row, 1).map_err(invalid)?;
        let value = real(&row, 2).map_err(invalid)?;

        let (name, color) = match name {
            Some(name) => (name, color),
            None => (
                UNCATEGORIZED_NAME.to_string(),
                Some(UNCATEGORIZED_COLOR.to_string()),
            ),
        };
        match stats.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.value += value,
            None => stats.push(CategoryStat { name, value, color }),
        }
    }

    for stat in &mut stats {
        stat.value = round_money(stat.value);
    }
    stats.sort_by(|a, b| b.value.total_cmp(&a.value));
    Ok(stats)
}

pub async fn get_monthly_stats(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> Result<(StatusCode, Json<Vec<MonthlyStat>>), ApiError> {
    let months = validate_months(query.months)?;
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let stats = compute_monthly(
        &user_db,
        query.is_projection.unwrap_or(false),
        today(),
        months,
    )
    .await?;
    Ok((StatusCode::OK, Json(stats)))
}

pub async fn get_stats_by_category(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<(StatusCode, Json<Vec<CategoryStat>>), ApiError> {
    validate_date_range(query.start_date, query.end_date)?;
    let filter = LedgerFilter {
        is_projection: query.is_projection.unwrap_or(false),
        start_date: query.start_date,
        end_date: query.end_date,
        ..Default::default()
    };

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let stats = compute_by_category(&user_db, &filter).await?;
    Ok((StatusCode::OK, Json(stats)))
}

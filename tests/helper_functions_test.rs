/*!
 * Helper Functions Unit Tests
 *
 * Covers the row extraction and validation helpers shared by the
 * transaction, projection and statement handlers.
 *
 * All tests use isolated temporary databases.
 */

mod common;

use axum::http::StatusCode;
use common::*;
use finance_dashboard::projections::{extract_projection_from_row, validate_projection_name};
use finance_dashboard::transactions::{
    TRANSACTION_COLUMNS, extract_transaction_from_row, validate_description,
    validate_transaction_amount,
};
use finance_dashboard::upload::extract_statement_from_row;
use time::macros::date;

async fn read_transaction(
    data_path: &str,
    user_id: &str,
    transaction_id: &str,
) -> finance_dashboard::models::Transaction {
    let db = user_db(data_path, user_id).await;
    let conn = db.read().await;
    let sql = format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS);
    let mut rows = conn
        .query(&sql, [transaction_id])
        .await
        .expect("Failed to query transaction");
    let row = rows
        .next()
        .await
        .expect("Failed to read row")
        .expect("Transaction not found");
    extract_transaction_from_row(row).expect("Failed to extract transaction")
}

/// Extraction restores every field including the optional references and flags.
#[tokio::test]
async fn extract_transaction_from_row_success() {
    let (data_path, user_id) = setup_test_environment().await;
    let category_id = create_test_category(&data_path, &user_id, "Mercado", None).await;
    let id = create_test_transaction(
        &data_path,
        &user_id,
        date!(2024 - 02 - 29),
        "Supermercado",
        -87.35,
        Some(&category_id),
    )
    .await;

    let transaction = read_transaction(&data_path, &user_id, &id).await;
    assert_eq!(transaction.id, id);
    assert_eq!(transaction.date, date!(2024 - 02 - 29));
    assert_eq!(transaction.description, "Supermercado");
    assert_eq!(transaction.amount, -87.35);
    assert_eq!(transaction.category_id.as_deref(), Some(category_id.as_str()));
    assert_eq!(transaction.projection_id, None);
    assert!(transaction.is_manual);
    assert!(!transaction.is_projection);
    assert_eq!(transaction.updated_at, None);
}

#[tokio::test]
async fn extract_scenario_transaction() {
    let (data_path, user_id) = setup_test_environment().await;
    let id = create_scenario_transaction(
        &data_path,
        &user_id,
        "proj-1",
        date!(2025 - 12 - 31),
        "Viagem",
        -4500.0,
    )
    .await;

    let transaction = read_transaction(&data_path, &user_id, &id).await;
    assert!(transaction.is_projection);
    assert_eq!(transaction.projection_id.as_deref(), Some("proj-1"));
}

/// Cent values survive storage unchanged.
#[tokio::test]
async fn amount_precision_is_preserved() {
    let (data_path, user_id) = setup_test_environment().await;
    for amount in [0.01, -0.01, 1234.56, -99999.99] {
        let id = create_test_transaction(
            &data_path,
            &user_id,
            date!(2024 - 01 - 01),
            "Precisão",
            amount,
            None,
        )
        .await;
        let transaction = read_transaction(&data_path, &user_id, &id).await;
        assert_eq!(transaction.amount, amount);
    }
}

#[tokio::test]
async fn extract_projection_and_statement_rows() {
    let (data_path, user_id) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;
    {
        let conn = db.write().await;
        conn.execute(
            "INSERT INTO projections (id, name, description, start_date, end_date, is_active, created_at) \
             VALUES ('p1', 'Férias', NULL, '2025-01-01', NULL, 1, 10)",
            (),
        )
        .await
        .expect("Failed to insert projection");
        conn.execute(
            "INSERT INTO bank_statements (id, filename, bank_name, period_start, period_end, total_transactions, status, upload_date) \
             VALUES ('s1', 'extrato.csv', 'Nubank', '2024-03-01', '2024-03-31', 12, 'pending_review', 20)",
            (),
        )
        .await
        .expect("Failed to insert statement");
    }

    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, name, description, start_date, end_date, is_active, created_at, updated_at FROM projections",
            (),
        )
        .await
        .unwrap();
    let projection = extract_projection_from_row(rows.next().await.unwrap().unwrap()).unwrap();
    assert_eq!(projection.name, "Férias");
    assert_eq!(projection.start_date, Some(date!(2025 - 01 - 01)));
    assert_eq!(projection.end_date, None);
    assert!(projection.is_active);

    let mut rows = conn
        .query(
            "SELECT id, filename, bank_name, period_start, period_end, total_transactions, status, upload_date FROM bank_statements",
            (),
        )
        .await
        .unwrap();
    let statement = extract_statement_from_row(rows.next().await.unwrap().unwrap()).unwrap();
    assert_eq!(statement.bank_name.as_deref(), Some("Nubank"));
    assert_eq!(statement.period_end, Some(date!(2024 - 03 - 31)));
    assert_eq!(statement.total_transactions, 12);
    assert_eq!(statement.status, "pending_review");
}

#[test]
fn description_must_not_be_blank_or_too_long() {
    assert!(validate_description("Padaria").is_ok());
    let (status, message) = validate_description("   ").unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message, "Description cannot be empty");
    assert!(validate_description(&"x".repeat(256)).is_err());
}

#[test]
fn transaction_amount_must_be_non_zero_and_finite() {
    assert!(validate_transaction_amount(-0.01).is_ok());
    assert!(validate_transaction_amount(0.0).is_err());
    assert!(validate_transaction_amount(0.004).is_err());
    assert!(validate_transaction_amount(f64::NAN).is_err());
    assert!(validate_transaction_amount(1e9).is_err());
}

#[test]
fn projection_name_is_required() {
    assert!(validate_projection_name("Cenário otimista").is_ok());
    assert!(validate_projection_name("").is_err());
}

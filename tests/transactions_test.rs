use finance_dashboard::client::transactions::TransactionsPage;
use finance_dashboard::client::ui::{FixedPrompt, NoticeKind, Tone, ViewState};
use finance_dashboard::models::{ListTransactionsQuery, UpdateTransactionPayload};
use finance_dashboard::transactions::{LedgerFilter, compute_summary, fetch_transactions};
use std::sync::Arc;
use time::{Date, Duration, macros::date};
use tokio_test::assert_ok;

mod common;
use common::*;

const BASE_DATE: Date = date!(2024 - 01 - 01);

async fn create_sample_transactions(data_path: &str, user_id: &str, count: i64) {
    for i in 0..count {
        create_test_transaction(
            data_path,
            user_id,
            BASE_DATE + Duration::days(i),
            &format!("Compra {}", i),
            -(10.0 + i as f64),
            None,
        )
        .await;
    }
}

#[tokio::test]
async fn empty_ledger() {
    let (data_path, user_id) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;

    let (transactions, total) = fetch_transactions(&db, &LedgerFilter::ledger(), 0, 10)
        .await
        .unwrap();
    assert!(transactions.is_empty());
    assert_eq!(total, 0);

    let summary = compute_summary(&db, &LedgerFilter::ledger()).await.unwrap();
    assert_eq!(summary.total_transactions, 0);
    assert_eq!(summary.balance, 0.0);
}

#[tokio::test]
async fn newest_first_with_skip_and_limit() {
    let (data_path, user_id) = setup_test_environment().await;
    create_sample_transactions(&data_path, &user_id, 12).await;
    let db = user_db(&data_path, &user_id).await;

    let (first, total) = fetch_transactions(&db, &LedgerFilter::ledger(), 0, 5)
        .await
        .unwrap();
    assert_eq!(total, 12);
    assert_eq!(first.len(), 5);
    assert_eq!(first[0].description, "Compra 11");
    assert!(first.windows(2).all(|w| w[0].date >= w[1].date));

    let (last, _) = fetch_transactions(&db, &LedgerFilter::ledger(), 10, 5)
        .await
        .unwrap();
    assert_eq!(last.len(), 2);
    assert_eq!(last[1].description, "Compra 0");
}

#[tokio::test]
async fn scenario_rows_stay_out_of_the_ledger() {
    let (data_path, user_id) = setup_test_environment().await;
    create_test_transaction(&data_path, &user_id, BASE_DATE, "Salário", 5000.0, None).await;
    create_scenario_transaction(&data_path, &user_id, "p1", BASE_DATE, "Bônus", 900.0).await;
    let db = user_db(&data_path, &user_id).await;

    let ledger = compute_summary(&db, &LedgerFilter::ledger()).await.unwrap();
    assert_eq!(ledger.total_income, 5000.0);
    assert_eq!(ledger.total_transactions, 1);

    let scenario = compute_summary(&db, &LedgerFilter::scenario("p1")).await.unwrap();
    assert_eq!(scenario.total_income, 900.0);
    assert_eq!(scenario.total_transactions, 1);
}

#[tokio::test]
async fn date_range_filter_is_inclusive() {
    let (data_path, user_id) = setup_test_environment().await;
    create_sample_transactions(&data_path, &user_id, 10).await;
    let db = user_db(&data_path, &user_id).await;

    let filter = LedgerFilter {
        start_date: Some(date!(2024 - 01 - 03)),
        end_date: Some(date!(2024 - 01 - 05)),
        ..LedgerFilter::ledger()
    };
    let (transactions, total) = fetch_transactions(&db, &filter, 0, 50).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(transactions.len(), 3);
}

#[tokio::test]
async fn summary_splits_income_and_expenses() {
    let (data_path, user_id) = setup_test_environment().await;
    create_test_transaction(&data_path, &user_id, BASE_DATE, "Salário", 3000.0, None).await;
    create_test_transaction(&data_path, &user_id, BASE_DATE, "Aluguel", -1200.5, None).await;
    create_test_transaction(&data_path, &user_id, BASE_DATE, "Mercado", -300.25, None).await;
    let db = user_db(&data_path, &user_id).await;

    let summary = compute_summary(&db, &LedgerFilter::ledger()).await.unwrap();
    assert_eq!(summary.total_income, 3000.0);
    assert_eq!(summary.total_expenses, 1500.75);
    assert_eq!(summary.balance, 1499.25);
    assert_eq!(summary.total_transactions, 3);
}

#[tokio::test]
async fn paging_through_twenty_five_transactions() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    create_sample_transactions(&app.data_path, &user.user.id, 25).await;

    let mut page = TransactionsPage::new(user.api.clone(), Arc::new(FixedPrompt::accepting()));
    page.load().await;
    assert_eq!(page.view_state(), ViewState::Populated);
    assert_eq!(page.pagination.total_pages(), 3);
    assert_eq!(page.transactions.len(), 10);
    assert!(!page.pagination.has_previous());

    page.go_to_page(3).await;
    assert_eq!(page.pagination.current(), 3);
    assert_eq!(page.transactions.len(), 5);
    assert!(!page.pagination.has_next());
    assert!(page.pagination.has_previous());

    // Out of range requests are ignored
    page.next_page().await;
    assert_eq!(page.pagination.current(), 3);
    assert_eq!(page.pagination.window(), vec![1, 2, 3]);
}

#[tokio::test]
async fn create_through_form_resets_to_first_page() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    create_sample_transactions(&app.data_path, &user.user.id, 15).await;

    let mut page = TransactionsPage::new(user.api.clone(), Arc::new(FixedPrompt::accepting()));
    page.load().await;
    page.go_to_page(2).await;

    page.open_create();
    page.form.date = date!(2024 - 06 - 30);
    page.form.description = "Freelance".to_string();
    page.form.amount = "850,00".to_string();
    page.form.set_expense(false);
    page.submit().await;

    assert_eq!(page.notices.last().unwrap().kind, NoticeKind::Success);
    assert_eq!(page.pagination.current(), 1);
    assert_eq!(page.pagination.total_items(), 16);
    let rows = page.rows();
    assert_eq!(rows[0].description, "Freelance");
    assert_eq!(rows[0].amount, "R$ 850,00");
    assert_eq!(rows[0].tone, Tone::Positive);
    assert_eq!(rows[0].source, "Manual");
}

#[tokio::test]
async fn edit_and_delete_reload_the_page() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    create_test_transaction(
        &app.data_path,
        &user.user.id,
        BASE_DATE,
        "Padaria",
        -12.0,
        None,
    )
    .await;

    let mut page = TransactionsPage::new(user.api.clone(), Arc::new(FixedPrompt::accepting()));
    page.load().await;
    let original = page.transactions[0].clone();

    page.open_edit(&original);
    assert!(page.is_edit());
    page.form.amount = "15".to_string();
    page.submit().await;
    assert_eq!(page.transactions[0].amount, -15.0);

    let current = page.transactions[0].clone();
    page.delete(&current).await;
    assert_eq!(page.view_state(), ViewState::Empty);
    assert_eq!(page.pagination.total_items(), 0);
}

#[tokio::test]
async fn invalid_amount_never_reaches_the_server() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let mut page = TransactionsPage::new(user.api.clone(), Arc::new(FixedPrompt::accepting()));
    page.load().await;

    page.open_create();
    page.form.description = "Nada".to_string();
    page.form.amount = "abc".to_string();
    page.submit().await;

    assert_eq!(page.notices.last().unwrap().kind, NoticeKind::Error);
    assert_eq!(page.dialog, finance_dashboard::client::transactions::Dialog::Create);
    let listed = assert_ok!(
        user.api
            .transactions(&ListTransactionsQuery::default())
            .await
    );
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn server_rejects_zero_amount_and_unknown_category() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let id = create_test_transaction(
        &app.data_path,
        &user.user.id,
        BASE_DATE,
        "Farmácia",
        -40.0,
        None,
    )
    .await;

    let err = user
        .api
        .update_transaction(
            &id,
            &UpdateTransactionPayload {
                amount: Some(0.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));

    let err = user
        .api
        .update_transaction(
            &id,
            &UpdateTransactionPayload {
                category_id: Some(Some("missing".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));

    let err = user.api.delete_transaction("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn summary_endpoint_matches_ledger() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    create_test_transaction(&app.data_path, &user.user.id, BASE_DATE, "Salário", 2000.0, None)
        .await;
    create_test_transaction(&app.data_path, &user.user.id, BASE_DATE, "Luz", -150.0, None).await;

    let summary = assert_ok!(user.api.summary(false).await);
    assert_eq!(summary.balance, 1850.0);
    assert_eq!(summary.total_expenses, 150.0);
    assert_eq!(summary.total_transactions, 2);
}

use axum::http::StatusCode;
use finance_dashboard::categories::{
    extract_category_from_row, fetch_categories, validate_budget_limit, validate_category_name,
};
use finance_dashboard::client::categories::{CategoriesPage, CategoryCard, CategoryForm};
use finance_dashboard::client::ui::{FixedPrompt, NoticeKind, ViewState};
use finance_dashboard::models::{CreateCategoryPayload, UpdateCategoryPayload};
use std::sync::Arc;
use time::macros::date;
use tokio_test::assert_ok;

mod common;
use common::*;

#[tokio::test]
async fn test_validate_category_name_valid() {
    let result = validate_category_name("Valid Category Name");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_validate_category_name_whitespace_only() {
    let result = validate_category_name("   ");
    let (status, message) = result.unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(message.contains("Category name cannot be empty"));
}

#[tokio::test]
async fn test_validate_category_name_too_long() {
    let long_name = "a".repeat(101);
    let (status, message) = validate_category_name(&long_name).unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(message.contains("must be less than"));
}

#[tokio::test]
async fn test_validate_budget_limit() {
    assert_eq!(validate_budget_limit(None).unwrap(), None);
    assert_eq!(validate_budget_limit(Some(150.004)).unwrap(), Some(150.0));
    let (status, _) = validate_budget_limit(Some(-1.0)).unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extract_category_from_row() {
    let (data_path, user_id) = setup_test_environment().await;
    let category_id =
        create_test_category(&data_path, &user_id, "Mercado", Some("#10b981")).await;

    let db = user_db(&data_path, &user_id).await;
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, name, color, icon, budget_limit, created_at FROM categories WHERE id = ?",
            [category_id.as_str()],
        )
        .await
        .expect("Failed to query category");

    let row = rows
        .next()
        .await
        .expect("Failed to read row")
        .expect("No category found");
    let category = extract_category_from_row(row).unwrap();
    assert_eq!(category.id, category_id);
    assert_eq!(category.name, "Mercado");
    assert_eq!(category.color.as_deref(), Some("#10b981"));
    assert_eq!(category.budget_limit, None);
}

#[tokio::test]
async fn test_fetch_categories_ordered_by_name() {
    let (data_path, user_id) = setup_test_environment().await;
    create_test_category(&data_path, &user_id, "Transporte", None).await;
    create_test_category(&data_path, &user_id, "Alimentação", None).await;
    create_test_category(&data_path, &user_id, "Lazer", None).await;

    let db = user_db(&data_path, &user_id).await;
    let names: Vec<String> = fetch_categories(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Alimentação", "Lazer", "Transporte"]);
}

#[tokio::test]
async fn create_with_budget_renders_formatted_limit() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let mut page = CategoriesPage::new(user.api.clone(), Arc::new(FixedPrompt::accepting()));

    page.load().await;
    assert_eq!(page.view_state(), ViewState::Empty);

    page.open_create();
    page.form.name = "Mercado".to_string();
    page.form.budget_limit = "150.00".to_string();
    page.submit().await;

    assert_eq!(page.notices.last().unwrap().kind, NoticeKind::Success);
    let cards = page.cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].budget_label.as_deref(), Some("Limite mensal: R$ 150,00"));
    assert_eq!(cards[0].color, "#3b82f6");
}

#[tokio::test]
async fn emptying_budget_on_edit_clears_it() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let created = assert_ok!(
        user.api
            .create_category(&CreateCategoryPayload {
                name: "Lazer".to_string(),
                color: Some("#ec4899".to_string()),
                icon: None,
                budget_limit: Some(200.0),
            })
            .await
    );

    let mut page = CategoriesPage::new(user.api.clone(), Arc::new(FixedPrompt::accepting()));
    page.load().await;
    page.open_edit(&created);
    assert_eq!(page.form.budget_limit, "200.00");
    page.form.budget_limit.clear();
    page.submit().await;

    let categories = assert_ok!(user.api.categories().await);
    assert_eq!(categories[0].budget_limit, None);
    assert_eq!(CategoryCard::from(&categories[0]).budget_label, None);
}

#[tokio::test]
async fn absent_budget_on_update_leaves_it_alone() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let created = assert_ok!(
        user.api
            .create_category(&CreateCategoryPayload {
                name: "Moradia".to_string(),
                color: None,
                icon: None,
                budget_limit: Some(1500.0),
            })
            .await
    );

    let updated = assert_ok!(
        user.api
            .update_category(
                &created.id,
                &UpdateCategoryPayload {
                    name: Some("Casa".to_string()),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(updated.name, "Casa");
    assert_eq!(updated.budget_limit, Some(1500.0));
}

#[tokio::test]
async fn duplicate_name_is_a_conflict() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let payload = CreateCategoryPayload {
        name: "Saúde".to_string(),
        color: None,
        icon: None,
        budget_limit: None,
    };
    assert_ok!(user.api.create_category(&payload).await);
    let err = user.api.create_category(&payload).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn name_index_rejects_case_variants() {
    let (data_path, user_id) = setup_test_environment().await;
    create_test_category(&data_path, &user_id, "Mercado", None).await;

    let db = user_db(&data_path, &user_id).await;
    let conn = db.write().await;
    let err = conn
        .execute(
            "INSERT INTO categories (id, name, created_at) VALUES ('dup', 'MERCADO', 0)",
            (),
        )
        .await
        .unwrap_err();
    assert!(finance_dashboard::database::is_unique_violation(&err));
    drop(conn);
    assert_eq!(count_rows(&db, "SELECT COUNT(*) FROM categories").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_creates_yield_one_category() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let payload = CreateCategoryPayload {
        name: "Viagem".to_string(),
        color: None,
        icon: None,
        budget_limit: None,
    };
    let upper = CreateCategoryPayload {
        name: "VIAGEM".to_string(),
        ..payload.clone()
    };

    let (first, second) = tokio::join!(
        user.api.create_category(&payload),
        user.api.create_category(&upper)
    );
    let statuses = [
        first.as_ref().err().and_then(|e| e.status()),
        second.as_ref().err().and_then(|e| e.status()),
    ];
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    assert!(statuses.contains(&Some(409)));

    let db = app.user_db(&user.user.id).await;
    assert_eq!(count_rows(&db, "SELECT COUNT(*) FROM categories").await, 1);
}

#[tokio::test]
async fn delete_requires_confirmation_and_detaches_transactions() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let category = assert_ok!(
        user.api
            .create_category(&CreateCategoryPayload {
                name: "Educação".to_string(),
                color: None,
                icon: None,
                budget_limit: None,
            })
            .await
    );
    create_test_transaction(
        &app.data_path,
        &user.user.id,
        date!(2024 - 02 - 01),
        "Curso",
        -300.0,
        Some(&category.id),
    )
    .await;

    let mut declined = CategoriesPage::new(user.api.clone(), Arc::new(FixedPrompt::default()));
    declined.load().await;
    declined.delete(&category).await;
    assert_eq!(assert_ok!(user.api.categories().await).len(), 1);

    let mut page = CategoriesPage::new(user.api.clone(), Arc::new(FixedPrompt::accepting()));
    page.load().await;
    page.delete(&category).await;
    assert_eq!(page.view_state(), ViewState::Empty);

    let db = app.user_db(&user.user.id).await;
    assert_eq!(
        count_rows(&db, "SELECT COUNT(*) FROM transactions WHERE category_id IS NULL").await,
        1
    );
}

#[test]
fn form_requires_a_name() {
    let form = CategoryForm::default();
    assert!(form.to_create_payload().is_err());
}

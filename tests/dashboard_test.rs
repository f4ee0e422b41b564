use finance_dashboard::client::dashboard::{Dashboard, PALETTE, Section};
use finance_dashboard::client::ui::Tone;
use finance_dashboard::utils::today;
use time::Duration;

mod common;
use common::*;

#[tokio::test]
async fn overview_loads_every_section() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let uid = &user.user.id;
    let food = create_test_category(&app.data_path, uid, "Alimentação", None).await;
    let now = today();

    create_test_transaction(&app.data_path, uid, now, "Salário", 3000.0, None).await;
    for day in 1..=6 {
        create_test_transaction(
            &app.data_path,
            uid,
            now - Duration::days(day),
            &format!("Mercado {}", day),
            -50.0,
            Some(&food),
        )
        .await;
    }
    create_scenario_transaction(&app.data_path, uid, "p1", now, "Sonho", 1_000_000.0).await;

    let mut dashboard = Dashboard::new(user.api.clone());
    assert_eq!(dashboard.summary, Section::Loading);
    dashboard.load().await;

    let kpis = dashboard.kpis().unwrap();
    assert_eq!(kpis[0].value, "R$ 2.700,00");
    assert_eq!(kpis[0].tone, Tone::Positive);
    assert_eq!(kpis[1].value, "R$ 3.000,00");
    assert_eq!(kpis[2].value, "R$ 300,00");
    assert_eq!(kpis[3].value, "7");

    let recent = dashboard.recent_items().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].description, "Salário");

    let pie = dashboard.pie().unwrap();
    assert_eq!(pie.len(), 1);
    assert_eq!(pie[0].value, 300.0);
    assert_eq!(pie[0].color, "#3b82f6");

    let trend = dashboard.balance_trend().unwrap();
    assert_eq!(trend.len(), 6);
    // Every ledger row falls within the last two months
    assert_eq!(trend.last().unwrap().balance, 2700.0);
}

#[tokio::test]
async fn failed_reads_only_affect_their_section() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let uid = &user.user.id;
    let food = create_test_category(&app.data_path, uid, "Alimentação", None).await;
    create_test_transaction(&app.data_path, uid, today(), "Mercado", -80.0, Some(&food)).await;

    // A blob colour breaks only the by-category aggregation
    let db = app.user_db(uid).await;
    {
        let conn = db.write().await;
        conn.execute(
            "UPDATE categories SET color = X'00' WHERE id = ?",
            [food.as_str()],
        )
        .await
        .unwrap();
    }

    let mut dashboard = Dashboard::new(user.api.clone());
    dashboard.load().await;

    assert!(matches!(dashboard.by_category, Section::Failed(_)));
    assert!(dashboard.pie().is_none());
    assert!(matches!(dashboard.summary, Section::Ready(_)));
    assert!(matches!(dashboard.recent, Section::Ready(_)));
    assert!(matches!(dashboard.monthly, Section::Ready(_)));
    assert_eq!(dashboard.kpis().unwrap()[0].value, "-R$ 80,00");
    assert_eq!(dashboard.recent_items().unwrap().len(), 1);
}

#[tokio::test]
async fn expired_session_fails_every_section() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let mut dashboard = Dashboard::new(user.api.clone());

    user.store.clear().await;
    dashboard.load().await;
    assert!(matches!(dashboard.summary, Section::Failed(_)));
    assert!(matches!(dashboard.by_category, Section::Failed(_)));
    assert!(dashboard.kpis().is_none());
    assert!(dashboard.pie().is_none());
}

#[tokio::test]
async fn empty_account_renders_zeroes() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let mut dashboard = Dashboard::new(user.api.clone());
    dashboard.load().await;

    let kpis = dashboard.kpis().unwrap();
    assert_eq!(kpis[0].value, "R$ 0,00");
    assert_eq!(kpis[0].tone, Tone::Neutral);
    assert!(dashboard.recent_items().unwrap().is_empty());
    assert!(dashboard.pie().unwrap().is_empty());
    assert!(dashboard.balance_trend().unwrap().iter().all(|p| p.balance == 0.0));
}

#[tokio::test]
async fn unmounted_dashboard_ignores_late_results() {
    let app = spawn_app().await;
    let user = app.register_and_login().await;
    let mut dashboard = Dashboard::new(user.api.clone());
    dashboard.unmount();
    dashboard.load().await;
    assert_eq!(dashboard.summary, Section::Loading);
    assert_eq!(dashboard.recent, Section::Loading);
}

#[test]
fn palette_has_eight_colours() {
    assert_eq!(PALETTE.len(), 8);
}

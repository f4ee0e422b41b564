use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tempfile::tempdir;
use time::{Duration, macros::date};
use tokio::runtime::Runtime;
use uuid::Uuid;

use finance_dashboard::database::{get_user_db, init_main_db};
use finance_dashboard::models::Transaction;
use finance_dashboard::stats::{compute_by_category, compute_monthly};
use finance_dashboard::transactions::{
    LedgerFilter, compute_summary, fetch_transactions, insert_transaction,
};

const BENCH_TRANSACTION_COUNT: usize = 2000;
const BENCH_CATEGORY_COUNT: usize = 10;

async fn setup_benchmark_environment() -> (String, String, tempfile::TempDir) {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let data_path = temp_dir.path().to_str().unwrap().to_string();
    let user_id = Uuid::new_v4().to_string();

    init_main_db(&data_path).await.unwrap();
    get_user_db(&data_path, &user_id).await.unwrap();

    (data_path, user_id, temp_dir)
}

async fn create_benchmark_ledger(data_path: &str, user_id: &str, count: usize) {
    let user_db = get_user_db(data_path, user_id).await.unwrap();
    let conn = user_db.write().await;

    let mut category_ids = Vec::new();
    for i in 0..BENCH_CATEGORY_COUNT {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO categories (id, name, created_at) VALUES (?, ?, 0)",
            (id.as_str(), format!("Categoria {}", i)),
        )
        .await
        .unwrap();
        category_ids.push(id);
    }

    let tx = conn.transaction().await.unwrap();
    for i in 0..count {
        // One in five rows is income
        let amount = if i % 5 == 0 {
            1500.0 + (i % 7) as f64
        } else {
            -(10.0 + (i % 100) as f64)
        };
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            date: date!(2024 - 01 - 01) + Duration::days((i % 365) as i64),
            description: format!("Lançamento {}", i),
            amount,
            category_id: Some(category_ids[i % BENCH_CATEGORY_COUNT].clone()),
            projection_id: None,
            bank_statement_id: None,
            is_manual: i % 2 == 0,
            is_projection: false,
            created_at: i as i64,
            updated_at: None,
        };
        insert_transaction(&tx, &transaction).await.unwrap();
    }
    tx.commit().await.unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let (data_path, user_id, _temp_dir) = rt.block_on(setup_benchmark_environment());
    rt.block_on(create_benchmark_ledger(
        &data_path,
        &user_id,
        BENCH_TRANSACTION_COUNT,
    ));
    let user_db = rt.block_on(get_user_db(&data_path, &user_id)).unwrap();

    c.bench_function("first_page", |b| {
        b.to_async(&rt).iter(|| async {
            let page = fetch_transactions(&user_db, &LedgerFilter::ledger(), 0, 10)
                .await
                .unwrap();
            black_box(page);
        })
    });

    c.bench_function("deep_page", |b| {
        b.to_async(&rt).iter(|| async {
            let page = fetch_transactions(&user_db, &LedgerFilter::ledger(), 1900, 10)
                .await
                .unwrap();
            black_box(page);
        })
    });

    c.bench_function("summary", |b| {
        b.to_async(&rt).iter(|| async {
            let summary = compute_summary(&user_db, &LedgerFilter::ledger())
                .await
                .unwrap();
            black_box(summary);
        })
    });

    c.bench_function("monthly_stats", |b| {
        b.to_async(&rt).iter(|| async {
            let stats = compute_monthly(&user_db, false, date!(2024 - 12 - 15), 12)
                .await
                .unwrap();
            black_box(stats);
        })
    });

    c.bench_function("stats_by_category", |b| {
        b.to_async(&rt).iter(|| async {
            let stats = compute_by_category(&user_db, &LedgerFilter::ledger())
                .await
                .unwrap();
            black_box(stats);
        })
    });

    // Keep temp_dir alive until the end
    std::mem::forget(_temp_dir);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

#![allow(dead_code)]

use finance_dashboard::client::{ApiClient, SessionStore};
use finance_dashboard::config::Config;
use finance_dashboard::database::{Db, get_user_db, init_main_db, text_or_null};
use finance_dashboard::models::{PublicUser, RegisterPayload, Transaction};
use finance_dashboard::router;
use finance_dashboard::state::AppState;
use finance_dashboard::transactions::insert_transaction;
use finance_dashboard::utils::now_timestamp;
use libsql::Value;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use time::Date;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "segredo123";

pub async fn setup_test_environment() -> (String, String) {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let data_path = temp_dir
        .path()
        .to_str()
        .expect("Failed to convert path to string")
        .to_string();
    let user_id = Uuid::new_v4().to_string();

    fs::create_dir_all(&data_path).expect("Failed to create data directory");

    init_main_db(&data_path)
        .await
        .unwrap_or_else(|e| panic!("Failed to initialize main database at {}: {}", data_path, e));

    get_user_db(&data_path, &user_id).await.unwrap_or_else(|e| {
        panic!(
            "Failed to initialize user database for user {} at {}: {}",
            user_id, data_path, e
        )
    });

    // Keep the temp_dir alive by leaking it (for test duration)
    std::mem::forget(temp_dir);

    (data_path, user_id)
}

pub async fn user_db(data_path: &str, user_id: &str) -> Db {
    get_user_db(data_path, user_id)
        .await
        .unwrap_or_else(|e| panic!("Failed to get user database for {}: {}", user_id, e))
}

pub async fn create_test_category(
    data_path: &str,
    user_id: &str,
    name: &str,
    color: Option<&str>,
) -> String {
    let db = user_db(data_path, user_id).await;
    let category_id = Uuid::new_v4().to_string();

    let conn = db.write().await;
    conn.execute(
        "INSERT INTO categories (id, name, color, created_at) VALUES (?, ?, ?, ?)",
        libsql::params_from_iter(vec![
            Value::Text(category_id.clone()),
            Value::Text(name.to_string()),
            text_or_null(color),
            Value::Integer(now_timestamp()),
        ]),
    )
    .await
    .unwrap_or_else(|e| panic!("Failed to insert test category '{}': {}", name, e));

    category_id
}

/// Inserts a ledger transaction directly, bypassing the API.
pub async fn create_test_transaction(
    data_path: &str,
    user_id: &str,
    date: Date,
    description: &str,
    amount: f64,
    category_id: Option<&str>,
) -> String {
    insert_raw(
        data_path,
        user_id,
        Transaction {
            id: Uuid::new_v4().to_string(),
            date,
            description: description.to_string(),
            amount,
            category_id: category_id.map(str::to_string),
            projection_id: None,
            bank_statement_id: None,
            is_manual: true,
            is_projection: false,
            created_at: now_timestamp(),
            updated_at: None,
        },
    )
    .await
}

pub async fn create_scenario_transaction(
    data_path: &str,
    user_id: &str,
    projection_id: &str,
    date: Date,
    description: &str,
    amount: f64,
) -> String {
    insert_raw(
        data_path,
        user_id,
        Transaction {
            id: Uuid::new_v4().to_string(),
            date,
            description: description.to_string(),
            amount,
            category_id: None,
            projection_id: Some(projection_id.to_string()),
            bank_statement_id: None,
            is_manual: true,
            is_projection: true,
            created_at: now_timestamp(),
            updated_at: None,
        },
    )
    .await
}

async fn insert_raw(data_path: &str, user_id: &str, transaction: Transaction) -> String {
    let db = user_db(data_path, user_id).await;
    let conn = db.write().await;
    insert_transaction(&conn, &transaction)
        .await
        .unwrap_or_else(|e| {
            panic!(
                "Failed to insert test transaction '{}': {}",
                transaction.description, e
            )
        });
    transaction.id
}

pub async fn count_rows(db: &Db, sql: &str) -> i64 {
    let conn = db.read().await;
    let mut rows = conn
        .query(sql, ())
        .await
        .expect("Failed to execute count query");
    match rows.next().await.expect("Failed to read count row") {
        Some(row) => row.get(0).expect("Failed to get count value"),
        None => 0,
    }
}

/// A server bound to an ephemeral port with its own data directory.
pub struct TestApp {
    pub base_url: String,
    pub data_path: String,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Like `spawn_app`, with a chance to adjust the configuration first.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let data_path = temp_dir
        .path()
        .to_str()
        .expect("Failed to convert path to string")
        .to_string();
    std::mem::forget(temp_dir);

    let main_db = init_main_db(&data_path)
        .await
        .expect("Failed to initialize main database");
    let mut config = Config::for_data_path(&data_path);
    configure(&mut config);
    let app = router(AppState::new(main_db, config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    TestApp {
        base_url: format!("http://{}", addr),
        data_path,
    }
}

/// Stand-in for an Ollama server: lists no models and answers every chat
/// with `eco: ` plus the last message. Received chat bodies are kept.
pub struct FakeLlm {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl FakeLlm {
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().expect("fake LLM lock poisoned").clone()
    }
}

pub async fn spawn_fake_llm() -> FakeLlm {
    let requests: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
    let seen = requests.clone();
    let app = axum::Router::new()
        .route(
            "/api/tags",
            axum::routing::get(|| async { axum::Json(serde_json::json!({ "models": [] })) }),
        )
        .route(
            "/api/chat",
            axum::routing::post(move |axum::Json(body): axum::Json<serde_json::Value>| {
                let seen = seen.clone();
                async move {
                    let last = body["messages"]
                        .as_array()
                        .and_then(|m| m.last())
                        .and_then(|m| m["content"].as_str())
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().expect("fake LLM lock poisoned").push(body);
                    axum::Json(serde_json::json!({
                        "message": { "role": "assistant", "content": format!("eco: {}", last) },
                        "done": true,
                    }))
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake LLM listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fake LLM failed");
    });

    FakeLlm {
        base_url: format!("http://{}", addr),
        requests,
    }
}

/// A registered, logged-in user with a client bound to their session.
pub struct TestUser {
    pub api: ApiClient,
    pub store: SessionStore,
    pub user: PublicUser,
}

impl TestApp {
    pub fn anonymous_client(&self) -> (ApiClient, SessionStore) {
        let store = SessionStore::new();
        (ApiClient::new(&self.base_url, store.handle()), store)
    }

    pub async fn register_and_login(&self) -> TestUser {
        let (api, store) = self.anonymous_client();
        let email = format!("{}@example.com", Uuid::new_v4().simple());
        api.register(&RegisterPayload {
            email: email.clone(),
            password: TEST_PASSWORD.to_string(),
            name: Some("Maria".to_string()),
        })
        .await
        .expect("Failed to register test user");
        let user = api
            .login(&store, &email, TEST_PASSWORD)
            .await
            .expect("Failed to log in test user");
        TestUser { api, store, user }
    }

    pub async fn user_db(&self, user_id: &str) -> Db {
        user_db(&self.data_path, user_id).await
    }
}

use reqwest::{Method, RequestBuilder, Response, multipart};
use serde::{Serialize, de::DeserializeOwned};

use super::error::{ClientError, ClientResult};
use super::session::{Session, SessionHandle, SessionStore};
use crate::models::{
    AnalysisResponse, AnalyzeQuery, AssistantStatus, BankStatement, Category, CategoryStat,
    ChangePasswordPayload, ChatHistoryEntry, ChatHistoryQuery, ChatPayload, ChatReplyResponse,
    ConfirmPayload, ConfirmResponse, CreateCategoryPayload, CreateProjectionPayload,
    CreateTransactionPayload, ListTransactionsQuery, LoginPayload, MonthlyStat, Projection,
    ProjectionComparison, ProjectionWithStats, PublicUser, RegisterPayload, Summary,
    TokenResponse, Transaction, TransactionListResponse, UpdateCategoryPayload,
    UpdateProfilePayload, UpdateTransactionPayload, UploadResponse,
};

/// Typed wrapper over the REST API. Attaches the session's bearer token and
/// maps any non-2xx response to `ClientError::Http`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionHandle) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let token = self
            .session
            .token()
            .await
            .ok_or(ClientError::NotAuthenticated)?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn check(resp: Response) -> ClientResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ClientError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> ClientResult<T> {
        let resp = Self::check(req.send().await?).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send_empty(req: RequestBuilder) -> ClientResult<()> {
        Self::check(req.send().await?).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        Self::send(self.authorized(Method::GET, path).await?).await
    }

    async fn get_with<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> ClientResult<T> {
        Self::send(self.authorized(Method::GET, path).await?.query(query)).await
    }

    async fn write<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        Self::send(self.authorized(method, path).await?.json(body)).await
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        Self::send_empty(self.authorized(Method::DELETE, path).await?).await
    }

    // Authentication

    pub async fn register(&self, payload: &RegisterPayload) -> ClientResult<PublicUser> {
        Self::send(self.http.post(self.url("/api/auth/register")).json(payload)).await
    }

    /// Logs in and populates `store` with the token and current user.
    pub async fn login(
        &self,
        store: &SessionStore,
        email: &str,
        password: &str,
    ) -> ClientResult<PublicUser> {
        let payload = LoginPayload {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token: TokenResponse =
            Self::send(self.http.post(self.url("/api/auth/login")).json(&payload)).await?;

        let user: PublicUser = Self::send(
            self.http
                .get(self.url("/api/auth/me"))
                .bearer_auth(&token.access_token),
        )
        .await?;

        store
            .set(Session {
                token: token.access_token,
                user: user.clone(),
            })
            .await;
        tracing::debug!(user_id = %user.id, "session established");
        Ok(user)
    }

    /// Revokes the token server-side when possible; the local session is cleared regardless.
    pub async fn logout(&self, store: &SessionStore) {
        if let Ok(req) = self.authorized(Method::POST, "/api/auth/logout").await {
            if let Err(e) = Self::send_empty(req).await {
                tracing::warn!(error = %e, "logout request failed");
            }
        }
        store.clear().await;
    }

    pub async fn me(&self) -> ClientResult<PublicUser> {
        self.get("/api/auth/me").await
    }

    pub async fn update_profile(&self, payload: &UpdateProfilePayload) -> ClientResult<PublicUser> {
        self.write(Method::PUT, "/api/auth/me", payload).await
    }

    pub async fn change_password(&self, payload: &ChangePasswordPayload) -> ClientResult<()> {
        Self::send_empty(
            self.authorized(Method::POST, "/api/auth/password")
                .await?
                .json(payload),
        )
        .await
    }

    // Categories

    pub async fn categories(&self) -> ClientResult<Vec<Category>> {
        self.get("/api/categories").await
    }

    pub async fn create_category(&self, payload: &CreateCategoryPayload) -> ClientResult<Category> {
        self.write(Method::POST, "/api/categories", payload).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        payload: &UpdateCategoryPayload,
    ) -> ClientResult<Category> {
        self.write(Method::PATCH, &format!("/api/categories/{}", id), payload)
            .await
    }

    pub async fn delete_category(&self, id: &str) -> ClientResult<()> {
        self.delete(&format!("/api/categories/{}", id)).await
    }

    // Transactions

    pub async fn transactions(
        &self,
        query: &ListTransactionsQuery,
    ) -> ClientResult<TransactionListResponse> {
        self.get_with("/api/transactions", query).await
    }

    pub async fn create_transaction(
        &self,
        payload: &CreateTransactionPayload,
    ) -> ClientResult<Transaction> {
        self.write(Method::POST, "/api/transactions", payload).await
    }

    pub async fn update_transaction(
        &self,
        id: &str,
        payload: &UpdateTransactionPayload,
    ) -> ClientResult<Transaction> {
        self.write(Method::PATCH, &format!("/api/transactions/{}", id), payload)
            .await
    }

    pub async fn delete_transaction(&self, id: &str) -> ClientResult<()> {
        self.delete(&format!("/api/transactions/{}", id)).await
    }

    pub async fn summary(&self, is_projection: bool) -> ClientResult<Summary> {
        self.get_with(
            "/api/transactions/summary",
            &[("is_projection", is_projection)],
        )
        .await
    }

    // Statistics

    pub async fn monthly_stats(
        &self,
        months: u32,
        is_projection: bool,
    ) -> ClientResult<Vec<MonthlyStat>> {
        self.get_with(
            "/api/stats/monthly",
            &[
                ("months", months.to_string()),
                ("is_projection", is_projection.to_string()),
            ],
        )
        .await
    }

    pub async fn stats_by_category(&self, is_projection: bool) -> ClientResult<Vec<CategoryStat>> {
        self.get_with("/api/stats/by-category", &[("is_projection", is_projection)])
            .await
    }

    // Projections

    pub async fn projections(&self) -> ClientResult<Vec<ProjectionWithStats>> {
        self.get("/api/projections").await
    }

    pub async fn create_projection(
        &self,
        payload: &CreateProjectionPayload,
    ) -> ClientResult<Projection> {
        self.write(Method::POST, "/api/projections", payload).await
    }

    pub async fn delete_projection(&self, id: &str) -> ClientResult<()> {
        self.delete(&format!("/api/projections/{}", id)).await
    }

    pub async fn projection_from_month(
        &self,
        year: i32,
        month: u8,
        name: &str,
    ) -> ClientResult<Projection> {
        let path = format!("/api/projections/from-month/{}/{}", year, month);
        Self::send(
            self.authorized(Method::POST, &path)
                .await?
                .query(&[("name", name)]),
        )
        .await
    }

    pub async fn compare_projection(&self, id: &str) -> ClientResult<ProjectionComparison> {
        self.get(&format!("/api/projections/{}/compare", id)).await
    }

    // Statement upload

    pub async fn upload_statement(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<UploadResponse> {
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);
        Self::send(
            self.authorized(Method::POST, "/api/upload/statement")
                .await?
                .multipart(form),
        )
        .await
    }

    pub async fn confirm_statement(
        &self,
        statement_id: &str,
        payload: &ConfirmPayload,
    ) -> ClientResult<ConfirmResponse> {
        self.write(
            Method::POST,
            &format!("/api/upload/statement/{}/confirm", statement_id),
            payload,
        )
        .await
    }

    pub async fn statements(&self) -> ClientResult<Vec<BankStatement>> {
        self.get("/api/upload/statements").await
    }

    pub async fn delete_statement(&self, statement_id: &str) -> ClientResult<()> {
        self.delete(&format!("/api/upload/statement/{}", statement_id))
            .await
    }

    // Assistant

    pub async fn assistant_status(&self) -> ClientResult<AssistantStatus> {
        Self::send(self.http.get(self.url("/api/ai/status"))).await
    }

    pub async fn chat(&self, payload: &ChatPayload) -> ClientResult<ChatReplyResponse> {
        self.write(Method::POST, "/api/ai/chat", payload).await
    }

    pub async fn chat_history(&self, limit: Option<u32>) -> ClientResult<Vec<ChatHistoryEntry>> {
        self.get_with("/api/ai/chat/history", &ChatHistoryQuery { limit })
            .await
    }

    pub async fn analyze(&self, question: &str) -> ClientResult<AnalysisResponse> {
        let query = AnalyzeQuery {
            question: question.to_string(),
        };
        Self::send(
            self.authorized(Method::POST, "/api/ai/analyze")
                .await?
                .query(&query),
        )
        .await
    }
}

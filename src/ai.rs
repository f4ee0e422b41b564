use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use libsql::Value;
use time::Duration;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::categorizer::OllamaClient;
use crate::constants::*;
use crate::database::{Db, optional_text};
use crate::models::{
    AnalysisResponse, AnalyzeQuery, AssistantStatus, CategoryStat, ChatHistoryEntry,
    ChatHistoryQuery, ChatMessage, ChatPayload, ChatReplyResponse, Summary,
};
use crate::state::AppState;
use crate::stats::compute_by_category;
use crate::transactions::{LedgerFilter, compute_summary};
use crate::utils::{
    ApiError, db_error, db_error_with_context, get_user_database, now_timestamp,
    today, validate_limit, validate_string_length,
};

const ASSISTANT_PERSONA: &str = "Você é um assistente financeiro pessoal inteligente.\n\
Ajude o usuário a:\n\
- Entender seus gastos e receitas\n\
- Analisar padrões de consumo\n\
- Fazer previsões financeiras\n\
- Sugerir formas de economizar\n\
- Responder dúvidas sobre finanças pessoais\n\n\
Seja objetivo, claro e útil. Use português do Brasil.";

fn unavailable() -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        ERR_ASSISTANT_UNAVAILABLE.to_string(),
    )
}

/// The configured client, provided its server answers.
async fn reachable_assistant(state: &AppState) -> Result<&OllamaClient, ApiError> {
    match &state.assistant {
        Some(client) if client.is_available().await => Ok(client),
        _ => Err(unavailable()),
    }
}

async fn ask(client: &OllamaClient, messages: &[ChatMessage]) -> Result<String, ApiError> {
    client.chat(messages).await.map_err(|e| {
        tracing::warn!(error = %e, "assistant request failed");
        unavailable()
    })
}

/// Persona first, then at most the last `MAX_CHAT_HISTORY_TURNS` prior turns,
/// then the new message. Client-supplied system turns are dropped.
pub fn build_conversation(history: &[ChatMessage], message: &str) -> Vec<ChatMessage> {
    let prior: Vec<&ChatMessage> = history
        .iter()
        .filter(|m| m.role == "user" || m.role == "assistant")
        .collect();
    let skip = prior.len().saturating_sub(MAX_CHAT_HISTORY_TURNS);

    let mut messages = Vec::with_capacity(prior.len() - skip + 2);
    messages.push(ChatMessage::system(ASSISTANT_PERSONA));
    messages.extend(prior.into_iter().skip(skip).cloned());
    messages.push(ChatMessage::user(message));
    messages
}

/// Plain-text digest of recent ledger activity handed to the model.
pub fn analysis_context(summary: &Summary, by_category: &[CategoryStat]) -> String {
    if summary.total_transactions == 0 {
        return "Nenhuma transação registrada nos últimos 3 meses.".to_string();
    }

    let categories = by_category
        .iter()
        .map(|stat| format!("- {}: R$ {:.2}", stat.name, stat.value))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "RESUMO FINANCEIRO (Últimos 3 meses):\n\
         - Total de transações: {}\n\
         - Receitas totais: R$ {:.2}\n\
         - Despesas totais: R$ {:.2}\n\
         - Saldo: R$ {:.2}\n\n\
         GASTOS POR CATEGORIA:\n{}\n",
        summary.total_transactions,
        summary.total_income,
        summary.total_expenses,
        summary.balance,
        categories
    )
}

pub fn analysis_prompt(context: &str, question: &str) -> String {
    format!(
        "Você é um analista financeiro. Com base nos dados abaixo, responda a pergunta do usuário.\n\n\
         DADOS FINANCEIROS:\n{context}\n\
         PERGUNTA DO USUÁRIO:\n{question}\n\n\
         Forneça uma resposta detalhada e útil, com insights práticos."
    )
}

async fn record_exchange(
    user_db: &Db,
    message: &str,
    response: &str,
    model: &str,
    created_at: i64,
) -> Result<(), ApiError> {
    let conn = user_db.write().await;
    conn.execute(
        "INSERT INTO ai_chat_history (id, message, response, model, created_at) VALUES (?, ?, ?, ?, ?)",
        libsql::params_from_iter(vec![
            Value::Text(Uuid::new_v4().to_string()),
            Value::Text(message.to_string()),
            Value::Text(response.to_string()),
            Value::Text(model.to_string()),
            Value::Integer(created_at),
        ]),
    )
    .await
    .map_err(|_| db_error_with_context("failed to record chat"))?;
    Ok(())
}

pub async fn fetch_chat_history(user_db: &Db, limit: u32) -> Result<Vec<ChatHistoryEntry>, ApiError> {
    let conn = user_db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, message, response, model, created_at FROM ai_chat_history \
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
            [i64::from(limit)],
        )
        .await
        .map_err(|_| db_error_with_context("failed to query chat history"))?;

    let mut history = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        let invalid = || db_error_with_context("invalid chat history data");
        history.push(ChatHistoryEntry {
            id: row.get(0).map_err(|_| invalid())?,
            message: row.get(1).map_err(|_| invalid())?,
            response: row.get(2).map_err(|_| invalid())?,
            model: optional_text(&row, 3).map_err(|_| invalid())?,
            created_at: row.get(4).map_err(|_| invalid())?,
        });
    }
    Ok(history)
}

pub async fn chat(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChatPayload>,
) -> Result<(StatusCode, Json<ChatReplyResponse>), ApiError> {
    validate_string_length(&payload.message, "Message", MAX_CHAT_MESSAGE_LENGTH)?;
    let message = payload.message.trim();
    let client = reachable_assistant(&state).await?;

    let reply = ask(client, &build_conversation(&payload.conversation_history, message)).await?;
    let timestamp = now_timestamp();

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    record_exchange(&user_db, message, &reply, client.model(), timestamp).await?;

    tracing::info!(user_id = %user.id, model = %client.model(), "assistant replied");
    Ok((
        StatusCode::OK,
        Json(ChatReplyResponse {
            message: reply,
            timestamp,
        }),
    ))
}

pub async fn analyze(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<(StatusCode, Json<AnalysisResponse>), ApiError> {
    validate_string_length(&query.question, "Question", MAX_CHAT_MESSAGE_LENGTH)?;
    let client = reachable_assistant(&state).await?;

    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let recent = LedgerFilter {
        start_date: Some(today() - Duration::days(ANALYSIS_WINDOW_DAYS)),
        ..Default::default()
    };
    let summary = compute_summary(&user_db, &recent).await?;
    let by_category = compute_by_category(&user_db, &recent).await?;
    let context = analysis_context(&summary, &by_category);

    let question = query.question.trim().to_string();
    let answer = ask(client, &[ChatMessage::user(analysis_prompt(&context, &question))]).await?;

    tracing::info!(user_id = %user.id, transactions = summary.total_transactions, "analysis answered");
    Ok((
        StatusCode::OK,
        Json(AnalysisResponse {
            question,
            answer,
            timestamp: now_timestamp(),
        }),
    ))
}

pub async fn chat_history(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ChatHistoryQuery>,
) -> Result<(StatusCode, Json<Vec<ChatHistoryEntry>>), ApiError> {
    let limit = validate_limit(query.limit, DEFAULT_CHAT_HISTORY_LIMIT)?;
    let user_db = get_user_database(&state.config.data_path, &user.id).await?;
    let history = fetch_chat_history(&user_db, limit).await?;
    Ok((StatusCode::OK, Json(history)))
}

pub async fn status(State(state): State<AppState>) -> Json<AssistantStatus> {
    let model = match &state.assistant {
        Some(client) if client.is_available().await => Some(client.model().to_string()),
        _ => None,
    };
    let message = if model.is_some() {
        "AI service available"
    } else {
        "AI service unavailable"
    };
    Json(AssistantStatus {
        available: model.is_some(),
        model,
        message: message.to_string(),
    })
}

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::constants::LLM_TIMEOUT_SECS;
use crate::models::ChatMessage;

/// Suggests one of `available` for a parsed statement row.
#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn suggest(&self, description: &str, amount: f64, available: &[String])
    -> Option<String>;
}

pub fn from_config(config: &Config) -> Arc<dyn Categorizer> {
    match OllamaClient::from_config(config) {
        Some(client) => {
            tracing::info!(base_url = %client.base_url, model = %client.model, "LLM categorization enabled");
            Arc::new(OllamaCategorizer::new(client))
        }
        None => Arc::new(KeywordCategorizer),
    }
}

fn find_available(name: &str, available: &[String]) -> Option<String> {
    if let Some(exact) = available.iter().find(|c| c.as_str() == name) {
        return Some(exact.clone());
    }
    let lower = name.to_lowercase();
    available.iter().find(|c| c.to_lowercase() == lower).cloned()
}

// (category aliases, description keywords)
const KEYWORD_RULES: &[(&[&str], &[&str])] = &[
    (
        &["Alimentação", "Alimentacao", "Food"],
        &["ifood", "restaurante", "mercado", "supermercado", "padaria", "lanchonete", "pizzaria", "acougue"],
    ),
    (
        &["Transporte", "Transport"],
        &["uber", "99app", "posto", "combustivel", "gasolina", "metro", "onibus", "estacionamento"],
    ),
    (
        &["Moradia", "Housing"],
        &["aluguel", "condominio", "energia", "enel", "sabesp", "agua", "internet", "iptu"],
    ),
    (
        &["Saúde", "Saude", "Health"],
        &["farmacia", "drogaria", "hospital", "clinica", "laboratorio", "unimed", "dentista"],
    ),
    (
        &["Lazer", "Entertainment"],
        &["netflix", "spotify", "cinema", "teatro", "show", "steam", "ingresso"],
    ),
    (
        &["Educação", "Educacao", "Education"],
        &["escola", "curso", "faculdade", "livraria", "udemy", "mensalidade"],
    ),
    (
        &["Compras", "Shopping"],
        &["amazon", "mercado livre", "shopee", "magazine", "americanas", "loja"],
    ),
];

/// Offline categorizer: a category named in the description wins, then keyword rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordCategorizer;

impl KeywordCategorizer {
    pub fn categorize(&self, description: &str, available: &[String]) -> Option<String> {
        let text = description.to_lowercase();

        if let Some(named) = available
            .iter()
            .find(|c| !c.trim().is_empty() && text.contains(&c.to_lowercase()))
        {
            return Some(named.clone());
        }

        KEYWORD_RULES
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
            .find_map(|(aliases, _)| aliases.iter().find_map(|a| find_available(a, available)))
    }
}

#[async_trait]
impl Categorizer for KeywordCategorizer {
    async fn suggest(
        &self,
        description: &str,
        _amount: f64,
        available: &[String],
    ) -> Option<String> {
        self.categorize(description, available)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

/// Minimal client for an Ollama server's chat API.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        OllamaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .ollama_base_url
            .as_deref()
            .map(|base_url| OllamaClient::new(base_url, &config.ollama_model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the server answers its model listing.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "ollama unreachable");
                false
            }
        }
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .context("ollama request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("ollama error: {status} {txt}");
        }

        let out: ChatResponse = resp.json().await.context("parse ollama response")?;
        Ok(out.message.content.trim().to_string())
    }
}

pub struct OllamaCategorizer {
    client: OllamaClient,
    fallback: KeywordCategorizer,
}

impl OllamaCategorizer {
    pub fn new(client: OllamaClient) -> Self {
        OllamaCategorizer {
            client,
            fallback: KeywordCategorizer,
        }
    }
}

pub fn categorization_prompt(description: &str, amount: f64, available: &[String]) -> String {
    let category_list = available
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");
    let kind = if amount < 0.0 { "despesa" } else { "receita" };

    format!(
        "Você é um assistente financeiro que categoriza transações.\n\n\
         Categorias disponíveis:\n{category_list}\n\n\
         Transação:\n- Descrição: {description}\n- Valor: R$ {:.2} ({kind})\n\n\
         Retorne APENAS o nome exato de UMA categoria da lista acima, sem explicações.\n\n\
         Categoria:",
        amount.abs()
    )
}

#[async_trait]
impl Categorizer for OllamaCategorizer {
    async fn suggest(
        &self,
        description: &str,
        amount: f64,
        available: &[String],
    ) -> Option<String> {
        if available.is_empty() {
            return None;
        }

        let prompt = [ChatMessage::user(categorization_prompt(
            description,
            amount,
            available,
        ))];
        match self.client.chat(&prompt).await
        {
            Ok(answer) => {
                let answer = answer.trim_matches(|c: char| c == '"' || c == '.' || c.is_whitespace());
                find_available(answer, available).or_else(|| available.first().cloned())
            }
            Err(e) => {
                tracing::warn!(error = %e, "LLM categorization failed, using keyword rules");
                self.fallback.categorize(description, available)
            }
        }
    }
}

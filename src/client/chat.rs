use super::api::ApiClient;
use super::lifecycle::Mount;
use super::ui::Notices;
use crate::models::{ChatHistoryEntry, ChatMessage, ChatPayload};

pub const GREETING: &str =
    "Olá! Sou seu assistente financeiro. Pergunte sobre seus gastos, receitas ou projeções.";
pub const UNAVAILABLE_HINT: &str = "Assistente indisponível no momento.";

/// Rebuilds the transcript, oldest first, from history rows returned newest first.
pub fn transcript(history: &[ChatHistoryEntry]) -> Vec<ChatMessage> {
    history
        .iter()
        .rev()
        .flat_map(|entry| {
            [
                ChatMessage::user(entry.message.clone()),
                ChatMessage::assistant(entry.response.clone()),
            ]
        })
        .collect()
}

/// The floating assistant panel shown on every dashboard page.
pub struct ChatWidget {
    api: ApiClient,
    mount: Mount,
    pub open: bool,
    /// `None` until the status check has answered.
    pub available: Option<bool>,
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub sending: bool,
    pub notices: Notices,
}

impl ChatWidget {
    pub fn new(api: ApiClient) -> Self {
        ChatWidget {
            api,
            mount: Mount::new(),
            open: false,
            available: None,
            messages: Vec::new(),
            input: String::new(),
            sending: false,
            notices: Notices::default(),
        }
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn can_send(&self) -> bool {
        !self.sending && self.available != Some(false) && !self.input.trim().is_empty()
    }

    /// Status line shown above the transcript.
    pub fn banner(&self) -> &'static str {
        match self.available {
            Some(false) => UNAVAILABLE_HINT,
            _ => GREETING,
        }
    }

    pub async fn check_status(&mut self) {
        let Some(result) = self.mount.token().guard(self.api.assistant_status()).await else {
            return;
        };
        self.available = Some(match result {
            Ok(status) => status.available,
            Err(e) => {
                tracing::warn!(error = %e, "assistant status check failed");
                false
            }
        });
    }

    pub async fn load_history(&mut self) {
        let Some(result) = self.mount.token().guard(self.api.chat_history(None)).await else {
            return;
        };
        match result {
            Ok(history) => self.messages = transcript(&history),
            Err(e) => {
                tracing::error!(error = %e, "failed to load chat history");
                self.notices.error("Erro ao carregar histórico");
            }
        }
    }

    /// Sends the current input with the transcript so far as context.
    pub async fn send(&mut self) {
        if !self.can_send() {
            return;
        }
        let message = self.input.trim().to_string();
        let payload = ChatPayload {
            message: message.clone(),
            conversation_history: self.messages.clone(),
        };
        self.messages.push(ChatMessage::user(message));
        self.input.clear();
        self.sending = true;

        let token = self.mount.token();
        let Some(result) = token.guard(self.api.chat(&payload)).await else {
            return;
        };
        match result {
            Ok(reply) => self.messages.push(ChatMessage::assistant(reply.message)),
            Err(e) => {
                if e.status() == Some(503) {
                    self.available = Some(false);
                }
                self.notices
                    .error(format!("Erro ao enviar mensagem: {}", e.user_message()));
            }
        }
        self.sending = false;
    }

    /// One-off question answered over the last three months of the ledger.
    pub async fn analyze(&mut self, question: &str) {
        let question = question.trim();
        if question.is_empty() || self.sending {
            return;
        }
        self.messages.push(ChatMessage::user(question));
        self.sending = true;

        let Some(result) = self.mount.token().guard(self.api.analyze(question)).await else {
            return;
        };
        match result {
            Ok(analysis) => self.messages.push(ChatMessage::assistant(analysis.answer)),
            Err(e) => {
                if e.status() == Some(503) {
                    self.available = Some(false);
                }
                self.notices
                    .error(format!("Erro ao analisar: {}", e.user_message()));
            }
        }
        self.sending = false;
    }
}

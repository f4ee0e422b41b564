use std::sync::Arc;

use super::api::ApiClient;
use super::format::format_brl;
use super::lifecycle::Mount;
use super::ui::{Notices, Prompt, Tone, ViewState};
use crate::models::{CreateProjectionPayload, ProjectionWithStats};

pub const NAME_PROMPT: &str = "Nome do cenário de projeção:";

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub value: String,
    pub tone: Tone,
}

/// One scenario card with its totals already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionCard {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub total_transactions: u64,
    pub income: Figure,
    pub expenses: Figure,
    pub balance: Figure,
}

impl From<&ProjectionWithStats> for ProjectionCard {
    fn from(p: &ProjectionWithStats) -> Self {
        ProjectionCard {
            id: p.projection.id.clone(),
            name: p.projection.name.clone(),
            description: p.projection.description.clone(),
            total_transactions: p.total_transactions,
            income: Figure {
                value: format_brl(p.total_income),
                tone: Tone::Positive,
            },
            expenses: Figure {
                value: format_brl(p.total_expenses),
                tone: Tone::Negative,
            },
            balance: Figure {
                value: format_brl(p.balance),
                tone: if p.balance >= 0.0 {
                    Tone::Positive
                } else {
                    Tone::Negative
                },
            },
        }
    }
}

pub struct ProjectionsPage {
    api: ApiClient,
    prompt: Arc<dyn Prompt>,
    mount: Mount,
    pub projections: Vec<ProjectionWithStats>,
    pub loading: bool,
    pub notices: Notices,
}

impl ProjectionsPage {
    pub fn new(api: ApiClient, prompt: Arc<dyn Prompt>) -> Self {
        ProjectionsPage {
            api,
            prompt,
            mount: Mount::new(),
            projections: Vec::new(),
            loading: true,
            notices: Notices::default(),
        }
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    pub fn view_state(&self) -> ViewState {
        ViewState::of(self.loading, &self.projections)
    }

    pub fn cards(&self) -> Vec<ProjectionCard> {
        self.projections.iter().map(ProjectionCard::from).collect()
    }

    pub async fn load(&mut self) {
        self.loading = true;
        let Some(result) = self.mount.token().guard(self.api.projections()).await else {
            return;
        };
        match result {
            Ok(projections) => self.projections = projections,
            Err(e) => {
                tracing::error!(error = %e, "failed to load projections");
                self.notices.error("Erro ao carregar projeções");
            }
        }
        self.loading = false;
    }

    /// Asks for a name and creates an empty active scenario. A cancelled or
    /// blank answer sends nothing.
    pub async fn create(&mut self) {
        let Some(name) = self.prompt.ask(NAME_PROMPT).await else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let payload = CreateProjectionPayload {
            name: name.to_string(),
            description: None,
            start_date: None,
            end_date: None,
            is_active: true,
        };
        match self.api.create_projection(&payload).await {
            Ok(_) => {
                self.notices.success("Projeção criada!");
                self.load().await;
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao criar projeção: {}", e.user_message())),
        }
    }

    pub async fn delete(&mut self, id: &str) {
        if !self
            .prompt
            .confirm("Deseja realmente deletar este cenário?")
            .await
        {
            return;
        }
        match self.api.delete_projection(id).await {
            Ok(()) => {
                self.notices.success("Projeção deletada!");
                self.load().await;
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao deletar: {}", e.user_message())),
        }
    }
}

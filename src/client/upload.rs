use std::collections::{BTreeMap, HashMap};

use time::Date;

use super::api::ApiClient;
use super::format::{format_brl, format_date};
use super::ui::{Notices, Tone};
use crate::models::{Category, ConfirmItem, ConfirmPayload, UploadResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    Review,
}

/// File picked by the user, held until sent.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub fn accepts_file(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

/// A parsed row awaiting review. `selected` starts as the suggestion and is
/// what gets committed.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedTransaction {
    pub temp_id: u32,
    pub date: Date,
    pub description: String,
    pub amount: f64,
    pub suggested: Option<String>,
    pub selected: Option<String>,
}

impl StagedTransaction {
    pub fn date_label(&self) -> String {
        format_date(self.date)
    }

    pub fn amount_label(&self) -> String {
        format_brl(self.amount)
    }

    pub fn tone(&self) -> Tone {
        Tone::for_amount(self.amount)
    }
}

/// Everything staged by one upload. Rows are keyed by their temporary id,
/// which is only meaningful inside this session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSession {
    pub bank_statement_id: String,
    pub bank_name: Option<String>,
    pub available_categories: Vec<String>,
    rows: BTreeMap<u32, StagedTransaction>,
}

impl ReviewSession {
    pub fn from_response(resp: UploadResponse) -> Self {
        let rows = resp
            .transactions
            .into_iter()
            .map(|item| {
                (
                    item.temp_id,
                    StagedTransaction {
                        temp_id: item.temp_id,
                        date: item.date,
                        description: item.description,
                        amount: item.amount,
                        selected: item.suggested_category.clone(),
                        suggested: item.suggested_category,
                    },
                )
            })
            .collect();
        ReviewSession {
            bank_statement_id: resp.bank_statement_id,
            bank_name: resp.bank_name,
            available_categories: resp.available_categories,
            rows,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &StagedTransaction> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, temp_id: u32) -> Option<&StagedTransaction> {
        self.rows.get(&temp_id)
    }

    /// Overrides the category of a single staged row. Returns false when
    /// the id is unknown.
    pub fn select_category(&mut self, temp_id: u32, category: Option<String>) -> bool {
        match self.rows.get_mut(&temp_id) {
            Some(row) => {
                row.selected = category.filter(|name| !name.trim().is_empty());
                true
            }
            None => false,
        }
    }

    /// Builds the commit body, resolving each selected name against the
    /// user's categories. Names that match nothing are sent without a category.
    pub fn to_confirm_payload(&self, categories: &[Category]) -> ConfirmPayload {
        let resolver = CategoryResolver::new(categories);
        ConfirmPayload {
            bank_statement_id: self.bank_statement_id.clone(),
            transactions: self
                .rows
                .values()
                .map(|row| ConfirmItem {
                    date: row.date,
                    description: row.description.clone(),
                    amount: row.amount,
                    category_id: row
                        .selected
                        .as_deref()
                        .and_then(|name| resolver.resolve(name)),
                })
                .collect(),
        }
    }
}

/// Name to id lookup, exact match first then case-insensitive.
struct CategoryResolver<'a> {
    exact: HashMap<&'a str, &'a str>,
    folded: HashMap<String, &'a str>,
}

impl<'a> CategoryResolver<'a> {
    fn new(categories: &'a [Category]) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for c in categories {
            exact.insert(c.name.as_str(), c.id.as_str());
            folded
                .entry(c.name.trim().to_lowercase())
                .or_insert(c.id.as_str());
        }
        CategoryResolver { exact, folded }
    }

    fn resolve(&self, name: &str) -> Option<String> {
        self.exact
            .get(name)
            .or_else(|| self.folded.get(&name.trim().to_lowercase()))
            .map(|id| id.to_string())
    }
}

/// Two-step import: upload a CSV, then review and confirm the parsed rows.
pub struct UploadFlow {
    api: ApiClient,
    pub stage: Stage,
    pub file: Option<SelectedFile>,
    pub review: Option<ReviewSession>,
    pub busy: bool,
    pub notices: Notices,
}

impl UploadFlow {
    pub fn new(api: ApiClient) -> Self {
        UploadFlow {
            api,
            stage: Stage::Upload,
            file: None,
            review: None,
            busy: false,
            notices: Notices::default(),
        }
    }

    /// Only `.csv` files are accepted by the picker.
    pub fn choose_file(&mut self, name: &str, bytes: Vec<u8>) -> bool {
        if !accepts_file(name) {
            self.notices.error("Selecione um arquivo CSV");
            return false;
        }
        self.file = Some(SelectedFile {
            name: name.to_string(),
            bytes,
        });
        true
    }

    pub fn can_upload(&self) -> bool {
        self.file.is_some() && !self.busy
    }

    pub async fn upload(&mut self) {
        let Some(file) = self.file.clone() else {
            return;
        };
        if self.busy {
            return;
        }
        self.busy = true;
        match self.api.upload_statement(&file.name, file.bytes).await {
            Ok(resp) => {
                let total = resp.total_transactions;
                tracing::info!(statement = %resp.bank_statement_id, total, "statement staged for review");
                self.review = Some(ReviewSession::from_response(resp));
                self.stage = Stage::Review;
                self.notices
                    .success(format!("{} transações encontradas!", total));
            }
            Err(e) => self.notices.error(format!(
                "Erro ao processar extrato: {}",
                e.user_message()
            )),
        }
        self.busy = false;
    }

    pub fn select_category(&mut self, temp_id: u32, category: Option<String>) -> bool {
        self.review
            .as_mut()
            .is_some_and(|review| review.select_category(temp_id, category))
    }

    /// Commits the staged rows. On failure the review stays open so the user
    /// can retry.
    pub async fn confirm(&mut self) {
        let Some(review) = self.review.as_ref() else {
            return;
        };
        if self.busy {
            return;
        }
        self.busy = true;

        let categories = match self.api.categories().await {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!(error = %e, "could not load categories for name resolution");
                Vec::new()
            }
        };
        let payload = review.to_confirm_payload(&categories);
        let statement_id = review.bank_statement_id.clone();

        match self.api.confirm_statement(&statement_id, &payload).await {
            Ok(resp) => {
                tracing::info!(statement = %statement_id, total = resp.total, "statement confirmed");
                self.notices.success("Transações importadas com sucesso!");
                self.reset();
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao confirmar: {}", e.user_message())),
        }
        self.busy = false;
    }

    /// Discards the staged rows and drops the pending statement server-side.
    pub async fn cancel(&mut self) {
        let review = self.review.take();
        self.reset();
        if let Some(review) = review {
            if let Err(e) = self.api.delete_statement(&review.bank_statement_id).await {
                tracing::warn!(
                    error = %e,
                    statement = %review.bank_statement_id,
                    "failed to discard pending statement"
                );
            }
        }
    }

    fn reset(&mut self) {
        self.stage = Stage::Upload;
        self.file = None;
        self.review = None;
    }
}

use std::sync::Arc;
use time::Date;

use super::api::ApiClient;
use super::error::{ClientError, ClientResult};
use super::format::{format_brl, format_date, parse_money_input};
use super::lifecycle::Mount;
use super::pagination::{PAGE_SIZE, Pagination};
use super::ui::{Notices, Prompt, Tone, ViewState};
use crate::models::{
    CreateTransactionPayload, ListTransactionsQuery, Transaction, UpdateTransactionPayload,
};
use crate::utils::today;

/// Which dialog the shared form is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Closed,
    Create,
    Edit(String),
}

/// Form buffer. The amount is kept as typed; its sign comes from `is_expense`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionForm {
    pub date: Date,
    pub description: String,
    pub amount: String,
    pub is_expense: bool,
}

impl Default for TransactionForm {
    fn default() -> Self {
        TransactionForm {
            date: today(),
            description: String::new(),
            amount: String::new(),
            is_expense: true,
        }
    }
}

impl TransactionForm {
    pub fn from_transaction(transaction: &Transaction) -> Self {
        TransactionForm {
            date: transaction.date,
            description: transaction.description.clone(),
            amount: format!("{:.2}", transaction.amount.abs()),
            is_expense: transaction.amount < 0.0,
        }
    }

    pub fn set_expense(&mut self, is_expense: bool) {
        self.is_expense = is_expense;
    }

    /// Absolute value of the typed amount, signed by the expense toggle.
    pub fn signed_amount(&self) -> ClientResult<f64> {
        let amount = match parse_money_input(&self.amount) {
            None => return Err(ClientError::Validation("Informe um valor".to_string())),
            Some(parsed) => parsed.map_err(ClientError::Validation)?,
        };
        if amount == 0.0 {
            return Err(ClientError::Validation(
                "O valor deve ser diferente de zero".to_string(),
            ));
        }
        Ok(if self.is_expense {
            -amount.abs()
        } else {
            amount.abs()
        })
    }

    fn description(&self) -> ClientResult<String> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ClientError::Validation("Informe uma descrição".to_string()));
        }
        Ok(description.to_string())
    }

    pub fn to_create_payload(&self) -> ClientResult<CreateTransactionPayload> {
        Ok(CreateTransactionPayload {
            date: self.date,
            description: self.description()?,
            amount: self.signed_amount()?,
            category_id: None,
            is_manual: true,
            is_projection: false,
            projection_id: None,
        })
    }

    pub fn to_update_payload(&self) -> ClientResult<UpdateTransactionPayload> {
        Ok(UpdateTransactionPayload {
            date: Some(self.date),
            description: Some(self.description()?),
            amount: Some(self.signed_amount()?),
            category_id: None,
        })
    }
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub id: String,
    pub date: String,
    pub description: String,
    pub amount: String,
    pub tone: Tone,
    pub source: &'static str,
}

impl From<&Transaction> for TransactionRow {
    fn from(t: &Transaction) -> Self {
        TransactionRow {
            id: t.id.clone(),
            date: format_date(t.date),
            description: t.description.clone(),
            amount: format_brl(t.amount),
            tone: Tone::for_amount(t.amount),
            source: if t.is_manual { "Manual" } else { "Importada" },
        }
    }
}

/// Ledger transaction list with paging and a create/edit dialog.
pub struct TransactionsPage {
    api: ApiClient,
    prompt: Arc<dyn Prompt>,
    mount: Mount,
    pub transactions: Vec<Transaction>,
    pub loading: bool,
    pub pagination: Pagination,
    pub dialog: Dialog,
    pub form: TransactionForm,
    pub notices: Notices,
}

impl TransactionsPage {
    pub fn new(api: ApiClient, prompt: Arc<dyn Prompt>) -> Self {
        TransactionsPage {
            api,
            prompt,
            mount: Mount::new(),
            transactions: Vec::new(),
            loading: true,
            pagination: Pagination::default(),
            dialog: Dialog::Closed,
            form: TransactionForm::default(),
            notices: Notices::default(),
        }
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    pub fn view_state(&self) -> ViewState {
        ViewState::of(self.loading, &self.transactions)
    }

    pub fn rows(&self) -> Vec<TransactionRow> {
        self.transactions.iter().map(TransactionRow::from).collect()
    }

    pub async fn load(&mut self) {
        self.loading = true;
        let query = ListTransactionsQuery {
            skip: Some(self.pagination.skip()),
            limit: Some(PAGE_SIZE),
            is_projection: Some(false),
            ..Default::default()
        };

        let Some(result) = self.mount.token().guard(self.api.transactions(&query)).await else {
            return;
        };
        match result {
            Ok(page) => {
                self.transactions = page.transactions;
                self.pagination.set_total(page.total);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load transactions");
                self.notices.error("Erro ao carregar transações");
            }
        }
        self.loading = false;
    }

    pub async fn go_to_page(&mut self, page: u32) {
        if self.pagination.go_to(page) {
            self.load().await;
        }
    }

    pub async fn next_page(&mut self) {
        let page = self.pagination.current() + 1;
        self.go_to_page(page).await;
    }

    pub async fn previous_page(&mut self) {
        let page = self.pagination.current().saturating_sub(1);
        self.go_to_page(page).await;
    }

    pub fn open_create(&mut self) {
        self.form = TransactionForm::default();
        self.dialog = Dialog::Create;
    }

    pub fn open_edit(&mut self, transaction: &Transaction) {
        self.form = TransactionForm::from_transaction(transaction);
        self.dialog = Dialog::Edit(transaction.id.clone());
    }

    pub fn close_dialog(&mut self) {
        self.dialog = Dialog::Closed;
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.dialog, Dialog::Edit(_))
    }

    pub async fn submit(&mut self) {
        match self.dialog.clone() {
            Dialog::Closed => {}
            Dialog::Create => self.create().await,
            Dialog::Edit(id) => self.update(&id).await,
        }
    }

    async fn create(&mut self) {
        let payload = match self.form.to_create_payload() {
            Ok(payload) => payload,
            Err(e) => return self.notices.error(e.user_message()),
        };
        match self.api.create_transaction(&payload).await {
            Ok(_) => {
                self.notices.success("Transação criada com sucesso!");
                self.dialog = Dialog::Closed;
                self.form = TransactionForm::default();
                self.pagination.reset();
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao criar transação: {}", e.user_message())),
        }
        self.load().await;
    }

    async fn update(&mut self, id: &str) {
        let payload = match self.form.to_update_payload() {
            Ok(payload) => payload,
            Err(e) => return self.notices.error(e.user_message()),
        };
        match self.api.update_transaction(id, &payload).await {
            Ok(_) => {
                self.notices.success("Transação atualizada com sucesso!");
                self.dialog = Dialog::Closed;
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao atualizar transação: {}", e.user_message())),
        }
        self.load().await;
    }

    pub async fn delete(&mut self, transaction: &Transaction) {
        let question = format!("Deseja realmente deletar \"{}\"?", transaction.description);
        if !self.prompt.confirm(&question).await {
            return;
        }
        match self.api.delete_transaction(&transaction.id).await {
            Ok(()) => self.notices.success("Transação deletada!"),
            Err(e) => self
                .notices
                .error(format!("Erro ao deletar: {}", e.user_message())),
        }
        self.load().await;
    }
}

use std::sync::Arc;

use super::api::ApiClient;
use super::error::{ClientError, ClientResult};
use super::format::{format_brl, parse_money_input};
use super::lifecycle::Mount;
use super::transactions::Dialog;
use super::ui::{Notices, Prompt, ViewState};
use crate::constants::DEFAULT_CATEGORY_COLOR;
use crate::models::{Category, CreateCategoryPayload, UpdateCategoryPayload};

/// Category form buffer. The colour picker and the hex text field write the
/// same value, so whichever was edited last wins.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryForm {
    pub name: String,
    color: String,
    pub budget_limit: String,
}

impl Default for CategoryForm {
    fn default() -> Self {
        CategoryForm {
            name: String::new(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            budget_limit: String::new(),
        }
    }
}

impl CategoryForm {
    pub fn from_category(category: &Category) -> Self {
        CategoryForm {
            name: category.name.clone(),
            color: category
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            budget_limit: category
                .budget_limit
                .map(|limit| format!("{:.2}", limit))
                .unwrap_or_default(),
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color_from_picker(&mut self, color: &str) {
        self.color = color.to_string();
    }

    pub fn set_color_from_text(&mut self, color: &str) {
        self.color = color.to_string();
    }

    fn name(&self) -> ClientResult<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("Informe o nome da categoria".to_string()));
        }
        Ok(name.to_string())
    }

    fn budget(&self) -> ClientResult<Option<f64>> {
        parse_money_input(&self.budget_limit)
            .transpose()
            .map_err(ClientError::Validation)
    }

    /// A blank budget is left out of the body entirely.
    pub fn to_create_payload(&self) -> ClientResult<CreateCategoryPayload> {
        Ok(CreateCategoryPayload {
            name: self.name()?,
            color: Some(self.color.clone()),
            icon: None,
            budget_limit: self.budget()?,
        })
    }

    /// A blank budget is sent as an explicit `null`, clearing the stored limit.
    pub fn to_update_payload(&self) -> ClientResult<UpdateCategoryPayload> {
        Ok(UpdateCategoryPayload {
            name: Some(self.name()?),
            color: Some(self.color.clone()),
            icon: None,
            budget_limit: Some(self.budget()?),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCard {
    pub id: String,
    pub name: String,
    pub color: String,
    pub budget_label: Option<String>,
}

impl From<&Category> for CategoryCard {
    fn from(c: &Category) -> Self {
        CategoryCard {
            id: c.id.clone(),
            name: c.name.clone(),
            color: c
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            budget_label: c
                .budget_limit
                .map(|limit| format!("Limite mensal: {}", format_brl(limit))),
        }
    }
}

pub struct CategoriesPage {
    api: ApiClient,
    prompt: Arc<dyn Prompt>,
    mount: Mount,
    pub categories: Vec<Category>,
    pub loading: bool,
    pub dialog: Dialog,
    pub form: CategoryForm,
    pub notices: Notices,
}

impl CategoriesPage {
    pub fn new(api: ApiClient, prompt: Arc<dyn Prompt>) -> Self {
        CategoriesPage {
            api,
            prompt,
            mount: Mount::new(),
            categories: Vec::new(),
            loading: true,
            dialog: Dialog::Closed,
            form: CategoryForm::default(),
            notices: Notices::default(),
        }
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    pub fn view_state(&self) -> ViewState {
        ViewState::of(self.loading, &self.categories)
    }

    pub fn cards(&self) -> Vec<CategoryCard> {
        self.categories.iter().map(CategoryCard::from).collect()
    }

    pub async fn load(&mut self) {
        self.loading = true;
        let Some(result) = self.mount.token().guard(self.api.categories()).await else {
            return;
        };
        match result {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                tracing::error!(error = %e, "failed to load categories");
                self.notices.error("Erro ao carregar categorias");
            }
        }
        self.loading = false;
    }

    pub fn open_create(&mut self) {
        self.form = CategoryForm::default();
        self.dialog = Dialog::Create;
    }

    pub fn open_edit(&mut self, category: &Category) {
        self.form = CategoryForm::from_category(category);
        self.dialog = Dialog::Edit(category.id.clone());
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
        match self.api.create_category(&payload).await {
            Ok(_) => {
                self.notices.success("Categoria criada com sucesso!");
                self.dialog = Dialog::Closed;
                self.form = CategoryForm::default();
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao criar categoria: {}", e.user_message())),
        }
        self.load().await;
    }

    async fn update(&mut self, id: &str) {
        let payload = match self.form.to_update_payload() {
            Ok(payload) => payload,
            Err(e) => return self.notices.error(e.user_message()),
        };
        match self.api.update_category(id, &payload).await {
            Ok(_) => {
                self.notices.success("Categoria atualizada!");
                self.dialog = Dialog::Closed;
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao atualizar: {}", e.user_message())),
        }
        self.load().await;
    }

    pub async fn delete(&mut self, category: &Category) {
        let question = format!("Deseja realmente deletar a categoria \"{}\"?", category.name);
        if !self.prompt.confirm(&question).await {
            return;
        }
        match self.api.delete_category(&category.id).await {
            Ok(()) => self.notices.success("Categoria deletada!"),
            Err(e) => self
                .notices
                .error(format!("Erro ao deletar: {}", e.user_message())),
        }
        self.load().await;
    }
}

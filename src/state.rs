use axum::extract::FromRef;
use std::sync::Arc;

use crate::categorizer::{self, Categorizer, OllamaClient};
use crate::config::Config;
use crate::database::Db;

#[derive(Clone)]
pub struct AppState {
    pub main_db: Db,
    pub config: Arc<Config>,
    pub categorizer: Arc<dyn Categorizer>,
    /// `None` when no LLM server is configured.
    pub assistant: Option<OllamaClient>,
}

impl AppState {
    pub fn new(main_db: Db, config: Config) -> Self {
        let categorizer = categorizer::from_config(&config);
        let assistant = OllamaClient::from_config(&config);
        AppState {
            main_db,
            config: Arc::new(config),
            categorizer,
            assistant,
        }
    }
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.main_db.clone()
    }
}

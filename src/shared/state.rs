use crate::config::AppConfig;
use crate::llm::LLMProvider;
use crate::shared::utils::DbPool;
use std::sync::Arc;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub llm_provider: Arc<dyn LLMProvider>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            config: self.config.clone(),
            llm_provider: Arc::clone(&self.llm_provider),
        }
    }
}

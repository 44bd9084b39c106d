use actix_web::web;
use std::sync::Arc;

use crate::chat::ChatRelay;
use crate::comedy::JokeService;
use crate::config::AppConfig;
use crate::db::{get_connection, DuckStore, Store, StoreError};
use crate::llm::LazyProvider;
use crate::persona::PersonaCatalog;

/// Shared handles for the HTTP server and the CLI.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub llm: Arc<LazyProvider>,
    pub personas: Arc<PersonaCatalog>,
    pub relay: Arc<ChatRelay>,
    pub jokes: Arc<JokeService>,
}

impl AppState {
    /// Opens the database; the LLM client is only built on first use.
    pub fn build(config: &AppConfig) -> Result<Self, StoreError> {
        let pool = get_connection(&config.database)?;
        let store: Arc<dyn Store> = Arc::new(DuckStore::new(pool));
        let llm = Arc::new(LazyProvider::new(config.llm.clone()));
        Ok(Self::from_parts(store, llm, config))
    }

    pub fn from_parts(store: Arc<dyn Store>, llm: Arc<LazyProvider>, config: &AppConfig) -> Self {
        let personas = Arc::new(PersonaCatalog::from_config(&config.chat));
        let relay = Arc::new(ChatRelay::new(
            store.clone(),
            llm.clone(),
            personas.clone(),
            config.chat.clone(),
        ));
        let jokes = Arc::new(JokeService::new(store.clone(), llm.clone(), config.comedy.clone()));

        Self {
            store,
            llm,
            personas,
            relay,
            jokes,
        }
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.store.clone()))
            .app_data(web::Data::from(self.personas.clone()))
            .app_data(web::Data::from(self.relay.clone()))
            .app_data(web::Data::from(self.jokes.clone()));
    }
}

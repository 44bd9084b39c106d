pub mod connection;
pub mod models;
pub mod service;

pub use connection::{get_connection, DbPool};
pub use models::*;

use async_trait::async_trait;
use thiserror::Error;

use service::DbService;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database Error: {0}")]
    Database(#[from] duckdb::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Row-level operations the handlers need from persistence.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_session(&self, persona_id: &str) -> Result<Session, StoreError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError>;

    async fn insert_message(&self, session_id: &str, role: Role, content: &str) -> Result<Message, StoreError>;

    /// Newest `limit` messages, oldest first.
    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, StoreError>;

    async fn find_joke(&self, comedian: &str, category: &str) -> Result<Option<Joke>, StoreError>;

    async fn insert_joke(&self, comedian: &str, category: &str, content: &str) -> Result<Joke, StoreError>;
}

/// [`Store`] over the shared DuckDB connection.
#[derive(Clone)]
pub struct DuckStore {
    pool: DbPool,
}

impl DuckStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs `f` on the blocking pool so DuckDB never stalls a server worker.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&duckdb::Connection) -> duckdb::Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .lock()
                .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))?;
            Ok(f(&conn)?)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl Store for DuckStore {
    async fn create_session(&self, persona_id: &str) -> Result<Session, StoreError> {
        let persona_id = persona_id.to_string();
        self.with_conn(move |conn| DbService::insert_session(conn, &persona_id)).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| DbService::get_session(conn, &id)).await
    }

    async fn insert_message(&self, session_id: &str, role: Role, content: &str) -> Result<Message, StoreError> {
        let (session_id, content) = (session_id.to_string(), content.to_string());
        self.with_conn(move |conn| DbService::insert_message(conn, &session_id, role, &content))
            .await
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| DbService::recent_messages(conn, &session_id, limit))
            .await
    }

    async fn find_joke(&self, comedian: &str, category: &str) -> Result<Option<Joke>, StoreError> {
        let (comedian, category) = (comedian.to_string(), category.to_string());
        self.with_conn(move |conn| DbService::find_joke(conn, &comedian, &category))
            .await
    }

    async fn insert_joke(&self, comedian: &str, category: &str, content: &str) -> Result<Joke, StoreError> {
        let (comedian, category, content) = (comedian.to_string(), category.to_string(), content.to_string());
        self.with_conn(move |conn| DbService::insert_joke(conn, &comedian, &category, &content))
            .await
    }
}

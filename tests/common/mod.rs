#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::Sender;

use office::app::AppState;
use office::config::{
    AnthropicConfig, AppConfig, ChatConfig, ComedyConfig, DatabaseConfig, LlmConfig, ServerConfig,
};
use office::db::{Joke, Message, Role, Session, Store, StoreError};
use office::llm::models::{ChatOptions, ChatResponse, Message as LlmMessage};
use office::llm::{LazyProvider, LlmError, LlmProvider};

/// Shared, ordered record of what the fakes were asked to do.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            path: ":memory:".to_string(),
        },
        llm: LlmConfig {
            provider: "anthropic".to_string(),
            anthropic: Some(AnthropicConfig {
                api_base: "http://127.0.0.1:1".to_string(),
                api_key: "sk-test".to_string(),
                default_model: "claude-sonnet-4-20250514".to_string(),
            }),
        },
        chat: ChatConfig::default(),
        comedy: ComedyConfig::default(),
    }
}

// --- Store ---

#[derive(Debug, Default, Clone)]
pub struct Faults {
    pub fail_session_lookup: bool,
    pub fail_message_insert: bool,
    pub fail_history: bool,
    pub fail_joke_lookup: bool,
    pub fail_joke_insert: bool,
}

#[derive(Default)]
struct Tables {
    sessions: Vec<Session>,
    messages: Vec<Message>,
    jokes: Vec<Joke>,
    next_id: i64,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<Faults>,
    log: EventLog,
}

impl MemoryStore {
    pub fn new(log: EventLog) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            faults: Mutex::new(Faults::default()),
            log,
        }
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock().unwrap() = faults;
    }

    fn faults(&self) -> Faults {
        self.faults.lock().unwrap().clone()
    }

    fn record(&self, entry: &str) {
        self.log.lock().unwrap().push(entry.to_string());
    }

    pub fn add_session(&self, id: &str, persona_id: &str) {
        let now = Utc::now();
        self.tables.lock().unwrap().sessions.push(Session {
            id: id.to_string(),
            persona_id: persona_id.to_string(),
            created_at: now,
            updated_at: now,
        });
    }

    /// Seeds a message without logging it as a request-time write.
    pub fn seed_message(&self, session_id: &str, role: Role, content: &str) {
        let mut tables = self.tables.lock().unwrap();
        tables.next_id += 1;
        let id = tables.next_id;
        tables.messages.push(Message {
            id,
            session_id: session_id.to_string(),
            role: role.as_str().to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn seed_joke(&self, comedian: &str, category: &str, content: &str) {
        let mut tables = self.tables.lock().unwrap();
        tables.next_id += 1;
        let id = tables.next_id;
        tables.jokes.push(Joke {
            id,
            comedian: comedian.to_string(),
            category: category.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn messages(&self, session_id: &str) -> Vec<Message> {
        self.tables
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn jokes(&self) -> Vec<Joke> {
        self.tables.lock().unwrap().jokes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with("store:insert"))
            .count()
    }
}

fn unavailable(what: &str) -> StoreError {
    StoreError::Unavailable(format!("{} failed", what))
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_session(&self, persona_id: &str) -> Result<Session, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.add_session(&id, persona_id);
        self.record("store:create_session");
        Ok(self.get_session(&id).await?.expect("session just added"))
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        if self.faults().fail_session_lookup {
            return Err(unavailable("get_session"));
        }
        Ok(self.tables.lock().unwrap().sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_message(&self, session_id: &str, role: Role, content: &str) -> Result<Message, StoreError> {
        self.record(&format!("store:insert_message:{}", role.as_str()));
        if self.faults().fail_message_insert {
            return Err(unavailable("insert_message"));
        }
        self.seed_message(session_id, role, content);
        Ok(self.messages(session_id).pop().expect("message just added"))
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        self.record("store:recent_messages");
        if self.faults().fail_history {
            return Err(unavailable("recent_messages"));
        }
        let all = self.messages(session_id);
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn find_joke(&self, comedian: &str, category: &str) -> Result<Option<Joke>, StoreError> {
        self.record("store:find_joke");
        if self.faults().fail_joke_lookup {
            return Err(unavailable("find_joke"));
        }
        Ok(self
            .tables
            .lock()
            .unwrap()
            .jokes
            .iter()
            .find(|j| j.comedian == comedian && j.category == category)
            .cloned())
    }

    async fn insert_joke(&self, comedian: &str, category: &str, content: &str) -> Result<Joke, StoreError> {
        self.record("store:insert_joke");
        if self.faults().fail_joke_insert {
            return Err(unavailable("insert_joke"));
        }
        self.seed_joke(comedian, category, content);
        Ok(self.jokes().pop().expect("joke just added"))
    }
}

// --- Provider ---

#[derive(Debug, Clone)]
pub enum Failure {
    Unauthorized,
    RateLimited,
    Api(u16, String),
    Stream(String),
}

impl Failure {
    fn to_error(&self) -> LlmError {
        match self {
            Failure::Unauthorized => LlmError::Unauthorized("invalid x-api-key".to_string()),
            Failure::RateLimited => LlmError::RateLimited,
            Failure::Api(status, message) => LlmError::Api {
                status: *status,
                message: message.clone(),
            },
            Failure::Stream(message) => LlmError::Stream(message.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Script {
    /// Text fragments; `chat` returns them joined.
    Chunks(Vec<String>),
    /// Fragments followed by a failure.
    ChunksThenFail(Vec<String>, Failure),
    Fail(Failure),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<LlmMessage>,
    pub options: ChatOptions,
    pub streaming: bool,
}

pub struct FakeLlm {
    script: Mutex<Script>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Duration,
    log: EventLog,
}

impl FakeLlm {
    pub fn new(script: Script, log: EventLog) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            log,
        }
    }

    pub fn replying(text: &str, log: EventLog) -> Self {
        Self::new(Script::Chunks(vec![text.to_string()]), log)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn begin(&self, messages: &[LlmMessage], options: &ChatOptions, streaming: bool) -> Script {
        let kind = if streaming { "llm:chat_streaming" } else { "llm:chat" };
        self.log.lock().unwrap().push(kind.to_string());
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            options: options.clone(),
            streaming,
        });
        self.script.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "fake"
    }

    async fn chat(&self, messages: &[LlmMessage], options: ChatOptions) -> Result<ChatResponse, LlmError> {
        let script = self.begin(messages, &options, false);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match script {
            Script::Chunks(chunks) => Ok(ChatResponse {
                content: chunks.concat(),
                model: "fake-model".to_string(),
                usage: None,
            }),
            Script::ChunksThenFail(_, failure) | Script::Fail(failure) => Err(failure.to_error()),
        }
    }

    async fn chat_streaming(
        &self,
        messages: &[LlmMessage],
        options: ChatOptions,
        tx: Sender<String>,
    ) -> Result<(), LlmError> {
        let script = self.begin(messages, &options, true);
        let (chunks, failure) = match script {
            Script::Chunks(chunks) => (chunks, None),
            Script::ChunksThenFail(chunks, failure) => (chunks, Some(failure)),
            Script::Fail(failure) => (Vec::new(), Some(failure)),
        };
        for chunk in chunks {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if tx.send(chunk).await.is_err() {
                return Ok(());
            }
        }
        match failure {
            Some(f) => Err(f.to_error()),
            None => Ok(()),
        }
    }
}

pub struct Harness {
    pub log: EventLog,
    pub store: Arc<MemoryStore>,
    pub llm: Arc<FakeLlm>,
    pub state: AppState,
}

impl Harness {
    pub fn new(script: Script) -> Self {
        Self::with_config(script, test_config())
    }

    pub fn with_config(script: Script, config: AppConfig) -> Self {
        let log = event_log();
        Self::from_parts(MemoryStore::new(log.clone()), FakeLlm::new(script, log.clone()), log, config)
    }

    pub fn from_parts(store: MemoryStore, llm: FakeLlm, log: EventLog, config: AppConfig) -> Self {
        let store = Arc::new(store);
        let llm = Arc::new(llm);
        let state = AppState::from_parts(
            store.clone(),
            Arc::new(LazyProvider::ready(llm.clone())),
            &config,
        );
        Self { log, store, llm, state }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

pub fn overrides(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

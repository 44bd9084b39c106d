use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnthropicConfig {
    pub api_base: String,
    pub api_key: String,
    pub default_model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub anthropic: Option<AnthropicConfig>,
}

/// What the relay does with a persona id it does not know.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPersonaPolicy {
    /// Answer 400 before anything is written.
    Reject,
    /// Chat with the default instruction prompt.
    #[default]
    Fallback,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub history_fetch_limit: usize,
    pub context_messages: usize,
    pub max_tokens: u32,
    pub unknown_persona: UnknownPersonaPolicy,
    pub persona_prompts: HashMap<String, String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_fetch_limit: 20,
            context_messages: 8,
            max_tokens: 1024,
            unknown_persona: UnknownPersonaPolicy::Fallback,
            persona_prompts: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ComedyConfig {
    pub max_tokens: u32,
    pub single_flight: bool,
}

impl Default for ComedyConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            single_flight: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub comedy: ComedyConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, ::config::ConfigError> {
        dotenv::dotenv().ok();

        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(::config::Environment::with_prefix("OFFICE").separator("__"))
            .build()?;

        let mut app_config: AppConfig = settings.try_deserialize()?;

        // Expand environment variables if present like ${ANTHROPIC_API_KEY}
        app_config.server.host = expand_env(&app_config.server.host);
        app_config.database.path = expand_env(&app_config.database.path);

        if let Some(ref mut anthropic) = app_config.llm.anthropic {
            anthropic.api_key = expand_env(&anthropic.api_key);
        }

        Ok(app_config)
    }
}

fn expand_env(val: &str) -> String {
    if val.starts_with("${") && val.ends_with('}') {
        let var_name = &val[2..val.len() - 1];
        std::env::var(var_name).unwrap_or_default()
    } else {
        val.to_string()
    }
}

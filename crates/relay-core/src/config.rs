use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_RETRY_BUDGET_MS: u64 = 3000;
pub const DEFAULT_MIN_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_DELAY_MS: u64 = 1000;
pub const DEFAULT_DEDUP_TTL_SECS: u64 = 600;
pub const LINE_API_BASE: &str = "https://api.line.me";

/// Shop-assistant persona sent as the system prompt when none is configured.
pub const DEFAULT_PERSONA: &str = "คุณคือพนักงานตอบแชทร้านค้าออนไลน์\n\
ตอบสุภาพ กระชับ เข้าใจง่าย เหมือนพนักงานมืออาชีพ";

/// Sent in place of the generated reply when the completion call fails.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "ขออภัยค่ะ ระบบขัดข้องชั่วคราว รบกวนลองส่งข้อความอีกครั้งในภายหลังนะคะ 🙏";

pub const DEFAULT_LEAD: &str = "ขออนุญาตตรวจสอบข้อมูลสักครู่นะคะ 🙏";
pub const DEFAULT_TAIL: &str = "ถ้ามีอะไรเพิ่มเติม สอบถามได้เลยนะคะ 😊";

/// Top-level config (relay.toml + RELAY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub line: LineConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Route the LINE console is pointed at.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            webhook_path: DEFAULT_WEBHOOK_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Inline persona text. Takes precedence over `persona_path`.
    pub persona: Option<String>,
    /// Path to a file holding the persona text.
    pub persona_path: Option<String>,
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
    /// Total time the provider chain may spend waiting between retries
    /// for one completion.
    #[serde(default = "default_retry_budget_ms")]
    pub retry_budget_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            persona: None,
            persona_path: None,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            retry_budget_ms: DEFAULT_RETRY_BUDGET_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub openai: Option<OpenAiProviderConfig>,
    /// Additional OpenAI-compatible endpoints, tried in order after `openai`.
    #[serde(default)]
    pub openai_compat: Vec<OpenAiCompatEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

/// A single OpenAI-compatible provider entry (Groq, OpenRouter, a local
/// llama.cpp server, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatEntry {
    /// Label used in logs.
    pub id: String,
    pub api_key: String,
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Defaults to "/v1/chat/completions".
    pub chat_path: Option<String>,
    /// Overrides `agent.model` for requests routed to this provider.
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    pub channel_access_token: Option<String>,
    /// When unset, webhook signatures are not verified.
    pub channel_secret: Option<String>,
    #[serde(default = "default_line_api_base")]
    pub api_base: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            channel_secret: None,
            api_base: LINE_API_BASE.to_string(),
        }
    }
}

/// How a generated reply is laid out as chat messages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyStyle {
    /// The reply alone.
    Single,
    /// Lead-in line, the reply, closing line.
    #[default]
    Sequence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub style: ReplyStyle,
    #[serde(default = "default_lead")]
    pub lead: String,
    #[serde(default = "default_tail")]
    pub tail: String,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Cap on the summed pacing delay of one dispatch. `None` = uncapped.
    pub max_total_delay_ms: Option<u64>,
    /// How long a processed webhookEventId is remembered.
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            style: ReplyStyle::default(),
            lead: DEFAULT_LEAD.to_string(),
            tail: DEFAULT_TAIL.to_string(),
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_total_delay_ms: None,
            dedup_ttl_secs: DEFAULT_DEDUP_TTL_SECS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_webhook_path() -> String {
    DEFAULT_WEBHOOK_PATH.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_retry_budget_ms() -> u64 {
    DEFAULT_RETRY_BUDGET_MS
}
fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_line_api_base() -> String {
    LINE_API_BASE.to_string()
}
fn default_lead() -> String {
    DEFAULT_LEAD.to_string()
}
fn default_tail() -> String {
    DEFAULT_TAIL.to_string()
}
fn default_min_delay_ms() -> u64 {
    DEFAULT_MIN_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_dedup_ttl_secs() -> u64 {
    DEFAULT_DEDUP_TTL_SECS
}

impl RelayConfig {
    /// Load config from a TOML file with RELAY_* env var overrides, then the
    /// plain-env fallbacks, then validate.
    ///
    /// Nested keys use a double underscore: `RELAY_LINE__CHANNEL_SECRET`.
    /// A missing file means defaults plus env. A file that exists but does
    /// not parse or validate is an error; its settings are never dropped.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(config_path);

        let mut config: RelayConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RELAY_").split("__"))
            .extract()
            .map_err(|e| RelayError::Config(format!("{}: {}", path, e)))?;

        config.apply_env_fallbacks();
        config.validate()?;
        Ok(config)
    }

    /// Config file path: explicit argument, else ~/.relay/relay.toml.
    pub fn resolve_path(config_path: Option<&str>) -> String {
        config_path
            .map(String::from)
            .unwrap_or_else(default_config_path)
    }

    /// Parse config from a TOML string (no env overrides).
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: RelayConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Fill unset credentials from the plain env vars a bare deployment uses
    /// (`LINE_ACCESS_TOKEN`, `LINE_CHANNEL_SECRET`, `OPENAI_API_KEY`, `PORT`).
    pub fn apply_env_fallbacks(&mut self) {
        self.apply_fallbacks_from(|key| std::env::var(key).ok());
    }

    fn apply_fallbacks_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.line.channel_access_token.is_none() {
            self.line.channel_access_token = lookup("LINE_ACCESS_TOKEN");
        }
        if self.line.channel_secret.is_none() {
            self.line.channel_secret = lookup("LINE_CHANNEL_SECRET");
        }
        if self.providers.openai.is_none() {
            if let Some(api_key) = lookup("OPENAI_API_KEY") {
                self.providers.openai = Some(OpenAiProviderConfig {
                    api_key,
                    base_url: default_openai_base_url(),
                });
            }
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.gateway.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.dispatch;
        if d.min_delay_ms > d.max_delay_ms {
            return Err(RelayError::Config(format!(
                "dispatch.min_delay_ms ({}) exceeds dispatch.max_delay_ms ({})",
                d.min_delay_ms, d.max_delay_ms
            )));
        }
        if !self.gateway.webhook_path.starts_with('/') {
            return Err(RelayError::Config(format!(
                "gateway.webhook_path must start with '/': {}",
                self.gateway.webhook_path
            )));
        }
        if self.agent.fallback_reply.trim().is_empty() {
            return Err(RelayError::Config(
                "agent.fallback_reply must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relay/relay.toml", home)
}

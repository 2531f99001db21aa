//! Configuration management
//!
//! Configuration is resolved in this order (later wins):
//! 1. Built-in defaults
//! 2. `feedme.toml` (or the file passed with `--config`)
//! 3. Environment variables
//!
//! `${VAR_NAME}` placeholders inside the TOML file are expanded from the
//! environment before parsing.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Error, Result};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "feedme.toml";

/// How the reply text is produced for an inbound message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReplyPolicy {
    /// Fixed greeting
    #[default]
    Welcome,
    /// Inbound text with a fixed prefix
    Echo,
    /// Text generated by the completion API
    Completion,
}

impl FromStr for ReplyPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "welcome" => Ok(Self::Welcome),
            "echo" => Ok(Self::Echo),
            "completion" | "llm" => Ok(Self::Completion),
            other => Err(Error::Config(format!("Unknown reply policy: {}", other))),
        }
    }
}

/// Which inbound webhook payload layout is accepted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// `entry[].changes[].value.messages[]`
    #[default]
    Nested,
    /// Top-level `messages[]`
    Flat,
}

impl FromStr for PayloadShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "nested" => Ok(Self::Nested),
            "flat" => Ok(Self::Flat),
            other => Err(Error::Config(format!("Unknown payload shape: {}", other))),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Route that receives both verification and event callbacks
    pub webhook_path: String,
    /// Upper bound for an inbound POST body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: default_port(),
            webhook_path: "/webhook".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

fn default_port() -> u16 {
    8080
}

/// WhatsApp Cloud API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Bearer token for the send-message endpoint
    pub access_token: String,
    /// Business phone number id used in the send URL
    pub phone_number_id: String,
    /// Shared secret for the GET verification handshake
    pub verify_token: String,
    /// App secret for `X-Hub-Signature-256` checks (disabled when unset)
    pub app_secret: Option<String>,
    pub api_version: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            verify_token: String::new(),
            app_secret: None,
            api_version: "v21.0".to_string(),
            base_url: "https://graph.facebook.com".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Reply behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub reply_policy: ReplyPolicy,
    pub payload_shape: PayloadShape,
    pub welcome_text: String,
    pub echo_prefix: String,
    /// Sent instead of a completion when the completion call fails
    pub fallback_text: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            reply_policy: ReplyPolicy::default(),
            payload_shape: PayloadShape::default(),
            welcome_text: "Welcome to FeedMe - the first AI chat to feed you!".to_string(),
            echo_prefix: "Echo: ".to_string(),
            fallback_text: "Sorry, I couldn't process your message right now.".to_string(),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// API key
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,

    pub max_tokens: u64,

    /// System prompt sent with every completion (omitted when unset)
    pub system_prompt: Option<String>,

    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: None,
            max_tokens: 1024,
            system_prompt: None,
            timeout_secs: 30,
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

/// Main configuration for feedme-relay
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub whatsapp: WhatsAppConfig,
    pub relay: RelayConfig,
    pub llm: LlmConfig,
}

impl Config {
    /// Expand `${VAR_NAME}` placeholders from the environment.
    ///
    /// Unknown variables expand to an empty string. A `$` that is not
    /// followed by `{` is kept as-is.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Parse a TOML document (after env expansion)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from an explicit file, `./feedme.toml`, or the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(DEFAULT_CONFIG_FILE)
            }
            None => Self::from_env(),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Empty values are ignored, as are numeric values that fail to parse.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        // Server
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = get("WEBHOOK_PATH") {
            self.server.webhook_path = path;
        }
        if let Some(limit) = get("MAX_BODY_BYTES").and_then(|v| v.parse().ok()) {
            self.server.max_body_bytes = limit;
        }

        // WhatsApp
        if let Some(token) = get("WHATSAPP_TOKEN") {
            self.whatsapp.access_token = token;
        }
        if let Some(id) = get("WHATSAPP_PHONE_ID") {
            self.whatsapp.phone_number_id = id;
        }
        if let Some(token) = get("WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.verify_token = token;
        }
        if let Some(secret) = get("WHATSAPP_APP_SECRET") {
            self.whatsapp.app_secret = Some(secret);
        }
        if let Some(version) = get("WHATSAPP_API_VERSION") {
            self.whatsapp.api_version = version;
        }
        if let Some(url) = get("WHATSAPP_BASE_URL") {
            self.whatsapp.base_url = url;
        }
        if let Some(secs) = get("WHATSAPP_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.whatsapp.timeout_secs = secs;
        }

        // Relay
        if let Some(policy) = get("REPLY_POLICY") {
            self.relay.reply_policy = policy.parse()?;
        }
        if let Some(shape) = get("PAYLOAD_SHAPE") {
            self.relay.payload_shape = shape.parse()?;
        }
        if let Some(text) = get("WELCOME_TEXT") {
            self.relay.welcome_text = text;
        }
        if let Some(prefix) = get("ECHO_PREFIX") {
            self.relay.echo_prefix = prefix;
        }
        if let Some(text) = get("FALLBACK_TEXT") {
            self.relay.fallback_text = text;
        }

        // LLM (CLAUDE_* kept as aliases)
        if let Some(key) = get("LLM_API_KEY").or_else(|| get("CLAUDE_API_KEY")) {
            self.llm.api_key = key;
        }
        if let Some(model) = get("LLM_MODEL").or_else(|| get("CLAUDE_MODEL")) {
            self.llm.model = model;
        }
        if let Some(url) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(max) = get("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = max;
        }
        if let Some(prompt) = get("LLM_SYSTEM_PROMPT") {
            self.llm.system_prompt = Some(prompt);
        }
        if let Some(secs) = get("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.llm.timeout_secs = secs;
        }

        debug!(
            "Config resolved: port={}, policy={:?}, shape={:?}",
            self.server.port, self.relay.reply_policy, self.relay.payload_shape
        );

        Ok(())
    }

    /// Get the effective LLM configuration
    pub fn llm_config(&self) -> &LlmConfig {
        &self.llm
    }
}

use arc_swap::ArcSwap;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::db::Database;
use crate::error::ServiceResult;

// ==================== Static Configuration (startup-only) ====================

/// Static configuration that cannot be changed at runtime.
/// These settings affect server binding or hold provider secrets and
/// require a restart to change.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Transactional mail provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_url")]
    pub base_url: String,

    /// API key for the mail provider. Empty disables outbound mail
    /// (email jobs complete as no-ops, useful for local development).
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_mail_from")]
    pub from_address: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            base_url: default_mail_url(),
            api_key: String::new(),
            from_address: default_mail_from(),
        }
    }
}

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Shared secret for webhook signature verification
    #[serde(default)]
    pub webhook_secret: String,

    #[serde(default = "default_gateway_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            api_key: String::new(),
            webhook_secret: String::new(),
            request_timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

// ==================== Dynamic Configuration (hot-reloadable) ====================

/// Dynamic configuration that can be updated at runtime via the admin API.
/// DB values override config file/env defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicConfig {
    #[serde(default = "default_auth")]
    pub auth: AuthConfig,

    #[serde(default = "default_embeddings")]
    pub embeddings: EmbeddingsConfig,

    #[serde(default = "default_recommendations")]
    pub recommendations: RecommendationsConfig,

    #[serde(default = "default_jobs")]
    pub jobs: JobsConfig,

    #[serde(default = "default_chat")]
    pub chat: ChatConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,

    #[serde(default = "default_payments")]
    pub payments: PaymentsConfig,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,

    /// Run expired-token cleanup every N seconds
    #[serde(default = "default_token_cleanup_interval_secs")]
    pub token_cleanup_interval_secs: u64,
}

impl AuthConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours as i64)
    }

    pub fn token_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.token_cleanup_interval_secs)
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embeddings_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embeddings_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Tutor recommendation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsConfig {
    #[serde(default = "default_recommendation_limit")]
    pub default_limit: usize,

    /// Results scoring below this cosine similarity are dropped
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

/// Background job queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_job_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_job_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff; the delay before retry N is N * this
    #[serde(default = "default_job_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl JobsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_page_size")]
    pub page_size: usize,

    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

/// Miscellaneous size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_quiz_questions")]
    pub max_quiz_questions: usize,
}

/// Payment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
}

// ==================== DynamicConfig Settings Keys ====================

/// All valid setting keys for DynamicConfig
pub const VALID_SETTING_KEYS: &[&str] = &[
    "auth.token_ttl_hours",
    "auth.token_cleanup_interval_secs",
    "embeddings.base_url",
    "embeddings.model",
    "embeddings.request_timeout_secs",
    "recommendations.default_limit",
    "recommendations.min_similarity",
    "jobs.poll_interval_secs",
    "jobs.max_attempts",
    "jobs.retry_backoff_secs",
    "chat.page_size",
    "chat.max_message_length",
    "limits.max_quiz_questions",
    "payments.currency",
];

impl DynamicConfig {
    /// Get all valid setting keys
    pub fn valid_keys() -> HashSet<&'static str> {
        VALID_SETTING_KEYS.iter().copied().collect()
    }

    /// Convert config to key-value map for API responses
    pub fn to_key_value_map(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        map.insert(
            "auth.token_ttl_hours".to_string(),
            serde_json::json!(self.auth.token_ttl_hours),
        );
        map.insert(
            "auth.token_cleanup_interval_secs".to_string(),
            serde_json::json!(self.auth.token_cleanup_interval_secs),
        );

        map.insert(
            "embeddings.base_url".to_string(),
            serde_json::Value::String(self.embeddings.base_url.clone()),
        );
        map.insert(
            "embeddings.model".to_string(),
            serde_json::Value::String(self.embeddings.model.clone()),
        );
        map.insert(
            "embeddings.request_timeout_secs".to_string(),
            serde_json::json!(self.embeddings.request_timeout_secs),
        );

        map.insert(
            "recommendations.default_limit".to_string(),
            serde_json::json!(self.recommendations.default_limit),
        );
        map.insert(
            "recommendations.min_similarity".to_string(),
            serde_json::json!(self.recommendations.min_similarity),
        );

        map.insert(
            "jobs.poll_interval_secs".to_string(),
            serde_json::json!(self.jobs.poll_interval_secs),
        );
        map.insert(
            "jobs.max_attempts".to_string(),
            serde_json::json!(self.jobs.max_attempts),
        );
        map.insert(
            "jobs.retry_backoff_secs".to_string(),
            serde_json::json!(self.jobs.retry_backoff_secs),
        );

        map.insert(
            "chat.page_size".to_string(),
            serde_json::json!(self.chat.page_size),
        );
        map.insert(
            "chat.max_message_length".to_string(),
            serde_json::json!(self.chat.max_message_length),
        );

        map.insert(
            "limits.max_quiz_questions".to_string(),
            serde_json::json!(self.limits.max_quiz_questions),
        );

        map.insert(
            "payments.currency".to_string(),
            serde_json::Value::String(self.payments.currency.clone()),
        );

        map
    }

    /// Apply DB settings as overrides to this config
    pub fn merge_from_db(&mut self, db_settings: &HashMap<String, serde_json::Value>) {
        for (key, value) in db_settings {
            self.apply_setting(key, value);
        }
    }

    /// Apply a single setting value
    fn apply_setting(&mut self, key: &str, value: &serde_json::Value) {
        match key {
            "auth.token_ttl_hours" => {
                if let Some(v) = value.as_u64() {
                    self.auth.token_ttl_hours = v;
                }
            }
            "auth.token_cleanup_interval_secs" => {
                if let Some(v) = value.as_u64() {
                    self.auth.token_cleanup_interval_secs = v;
                }
            }

            "embeddings.base_url" => {
                if let Some(v) = value.as_str() {
                    self.embeddings.base_url = v.to_string();
                }
            }
            "embeddings.model" => {
                if let Some(v) = value.as_str() {
                    self.embeddings.model = v.to_string();
                }
            }
            "embeddings.request_timeout_secs" => {
                if let Some(v) = value.as_u64() {
                    self.embeddings.request_timeout_secs = v;
                }
            }

            "recommendations.default_limit" => {
                if let Some(v) = value.as_u64() {
                    self.recommendations.default_limit = v as usize;
                }
            }
            "recommendations.min_similarity" => {
                if let Some(v) = value.as_f64() {
                    self.recommendations.min_similarity = v as f32;
                }
            }

            "jobs.poll_interval_secs" => {
                if let Some(v) = value.as_u64() {
                    self.jobs.poll_interval_secs = v;
                }
            }
            "jobs.max_attempts" => {
                if let Some(v) = value.as_u64() {
                    self.jobs.max_attempts = v as u32;
                }
            }
            "jobs.retry_backoff_secs" => {
                if let Some(v) = value.as_u64() {
                    self.jobs.retry_backoff_secs = v;
                }
            }

            "chat.page_size" => {
                if let Some(v) = value.as_u64() {
                    self.chat.page_size = v as usize;
                }
            }
            "chat.max_message_length" => {
                if let Some(v) = value.as_u64() {
                    self.chat.max_message_length = v as usize;
                }
            }

            "limits.max_quiz_questions" => {
                if let Some(v) = value.as_u64() {
                    self.limits.max_quiz_questions = v as usize;
                }
            }

            "payments.currency" => {
                if let Some(v) = value.as_str() {
                    self.payments.currency = v.to_string();
                }
            }

            _ => {
                tracing::warn!(key = %key, "Unknown setting key in merge_from_db");
            }
        }
    }
}

// ==================== RuntimeConfig (combines static + dynamic) ====================

/// Runtime configuration manager.
/// Combines static config (startup-only) with dynamic config
/// (hot-reloadable via ArcSwap).
pub struct RuntimeConfig {
    /// Static configuration (never changes after startup)
    pub static_config: StaticConfig,
    /// Dynamic configuration (can be hot-reloaded)
    dynamic: ArcSwap<DynamicConfig>,
}

impl RuntimeConfig {
    /// Get current dynamic config snapshot (lock-free read)
    pub fn dynamic(&self) -> arc_swap::Guard<Arc<DynamicConfig>> {
        self.dynamic.load()
    }

    /// Update dynamic config (atomic swap)
    pub fn update_dynamic(&self, new_config: DynamicConfig) {
        self.dynamic.store(Arc::new(new_config));
    }

    /// Load config from all sources with DB overrides
    pub fn load(db: &Database) -> ServiceResult<Self> {
        let static_config = load_static_config()?;

        let mut dynamic = load_dynamic_config()?;
        let db_settings = db.get_all_settings()?;
        dynamic.merge_from_db(&db_settings);

        Ok(Self {
            static_config,
            dynamic: ArcSwap::from_pointee(dynamic),
        })
    }

    /// Rebuild dynamic config from file/env defaults + DB and swap atomically
    pub fn reload_from_db(&self, db: &Database) -> ServiceResult<()> {
        let mut dynamic = load_dynamic_config()?;
        let db_settings = db.get_all_settings()?;
        dynamic.merge_from_db(&db_settings);
        self.update_dynamic(dynamic);
        Ok(())
    }
}

// ==================== Config Loading Functions ====================

/// Load static configuration from file and env vars
pub fn load_static_config() -> ServiceResult<StaticConfig> {
    Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("MENTORA")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| crate::error::ServiceError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| crate::error::ServiceError::Config {
            message: format!("Failed to deserialize static config: {}", e),
        })
}

/// Load dynamic configuration from file and env vars (without DB overrides)
fn load_dynamic_config() -> ServiceResult<DynamicConfig> {
    Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("MENTORA")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| crate::error::ServiceError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| crate::error::ServiceError::Config {
            message: format!("Failed to deserialize dynamic config: {}", e),
        })
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_mail_url() -> String {
    "https://api.mail.example.com".to_string()
}

fn default_mail_from() -> String {
    "no-reply@mentora.dev".to_string()
}

fn default_gateway_url() -> String {
    "https://api.pay.example.com".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

fn default_auth() -> AuthConfig {
    AuthConfig {
        token_ttl_hours: default_token_ttl_hours(),
        token_cleanup_interval_secs: default_token_cleanup_interval_secs(),
    }
}

fn default_token_ttl_hours() -> u64 {
    24 * 14 // 14 days
}

fn default_token_cleanup_interval_secs() -> u64 {
    60 * 60 // hourly
}

fn default_embeddings() -> EmbeddingsConfig {
    EmbeddingsConfig {
        base_url: default_embeddings_url(),
        model: default_embedding_model(),
        request_timeout_secs: default_embeddings_timeout_secs(),
    }
}

fn default_embeddings_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embeddings_timeout_secs() -> u64 {
    60
}

fn default_recommendations() -> RecommendationsConfig {
    RecommendationsConfig {
        default_limit: default_recommendation_limit(),
        min_similarity: default_min_similarity(),
    }
}

fn default_recommendation_limit() -> usize {
    10
}

fn default_min_similarity() -> f32 {
    0.3
}

fn default_jobs() -> JobsConfig {
    JobsConfig {
        poll_interval_secs: default_job_poll_interval_secs(),
        max_attempts: default_job_max_attempts(),
        retry_backoff_secs: default_job_retry_backoff_secs(),
    }
}

fn default_job_poll_interval_secs() -> u64 {
    2
}

fn default_job_max_attempts() -> u32 {
    5
}

fn default_job_retry_backoff_secs() -> u64 {
    30
}

fn default_chat() -> ChatConfig {
    ChatConfig {
        page_size: default_chat_page_size(),
        max_message_length: default_max_message_length(),
    }
}

fn default_chat_page_size() -> usize {
    50
}

fn default_max_message_length() -> usize {
    4000
}

fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_quiz_questions: default_max_quiz_questions(),
    }
}

fn default_max_quiz_questions() -> usize {
    50
}

fn default_payments() -> PaymentsConfig {
    PaymentsConfig {
        currency: default_currency(),
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> DynamicConfig {
        DynamicConfig {
            auth: default_auth(),
            embeddings: default_embeddings(),
            recommendations: default_recommendations(),
            jobs: default_jobs(),
            chat: default_chat(),
            limits: default_limits(),
            payments: default_payments(),
        }
    }

    #[test]
    fn test_key_value_map_covers_all_valid_keys() {
        let map = defaults().to_key_value_map();
        for key in VALID_SETTING_KEYS {
            assert!(map.contains_key(*key), "missing key: {}", key);
        }
        assert_eq!(map.len(), VALID_SETTING_KEYS.len());
    }

    #[test]
    fn test_merge_from_db_overrides() {
        let mut config = defaults();
        let mut overrides = HashMap::new();
        overrides.insert(
            "recommendations.default_limit".to_string(),
            serde_json::json!(25),
        );
        overrides.insert(
            "embeddings.model".to_string(),
            serde_json::json!("all-minilm"),
        );
        overrides.insert("payments.currency".to_string(), serde_json::json!("eur"));

        config.merge_from_db(&overrides);

        assert_eq!(config.recommendations.default_limit, 25);
        assert_eq!(config.embeddings.model, "all-minilm");
        assert_eq!(config.payments.currency, "eur");
        // Untouched values keep defaults
        assert_eq!(config.jobs.max_attempts, default_job_max_attempts());
    }

    #[test]
    fn test_merge_ignores_wrong_types() {
        let mut config = defaults();
        let mut overrides = HashMap::new();
        overrides.insert(
            "jobs.max_attempts".to_string(),
            serde_json::json!("not a number"),
        );
        config.merge_from_db(&overrides);
        assert_eq!(config.jobs.max_attempts, default_job_max_attempts());
    }
}

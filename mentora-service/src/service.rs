//! Domain logic for the Mentora marketplace.
//!
//! `MentoraService` is the single coordinator the HTTP handlers and
//! socket handlers call into. Per-domain operations live in submodules
//! as additional `impl` blocks.

mod accounts;
mod chat;
mod commitments;
mod moderation;
mod notifications;
mod payments;
mod quizzes;
mod sessions;
mod tutors;
mod workers;

pub use chat::ConversationSummary;
pub use quizzes::{QuizQuestionView, QuizView};
pub use tutors::RecommendedTutor;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RuntimeConfig;
use crate::db::Database;
use crate::embeddings::EmbeddingClient;
use crate::error::ServiceResult;
use crate::gateway::GatewayClient;
use crate::mailer::MailClient;
use crate::websocket::SocketManager;

/// Main service coordinator
pub struct MentoraService {
    pub runtime_config: Arc<RuntimeConfig>,
    pub db: Arc<Database>,
    pub embeddings: Arc<EmbeddingClient>,
    pub mailer: Arc<MailClient>,
    pub gateway: Arc<GatewayClient>,
    /// Connections on /ws/chat
    pub chat_sockets: Arc<SocketManager>,
    /// Connections on /ws/notifications
    pub notify_sockets: Arc<SocketManager>,
}

impl MentoraService {
    /// Create a new service instance.
    /// Accepts a pre-opened database so that RuntimeConfig can load
    /// settings from it.
    pub async fn new(db: Arc<Database>, runtime_config: Arc<RuntimeConfig>) -> ServiceResult<Self> {
        info!("Initializing Mentora service");

        let dynamic = runtime_config.dynamic();

        let embeddings = Arc::new(EmbeddingClient::new(&dynamic.embeddings)?);
        if embeddings.health_check().await? {
            info!(url = %dynamic.embeddings.base_url, "Embedding provider is available");
        } else {
            warn!(url = %dynamic.embeddings.base_url, "Embedding provider is not available");
        }

        let mailer = Arc::new(MailClient::new(runtime_config.static_config.mail.clone())?);
        let gateway = Arc::new(GatewayClient::new(
            runtime_config.static_config.gateway.clone(),
        )?);

        Ok(Self {
            runtime_config,
            db,
            embeddings,
            mailer,
            gateway,
            chat_sockets: Arc::new(SocketManager::new()),
            notify_sockets: Arc::new(SocketManager::new()),
        })
    }

    /// Update settings and hot-reload the dynamic config
    pub async fn update_settings(
        &self,
        updates: std::collections::HashMap<String, serde_json::Value>,
    ) -> ServiceResult<()> {
        // Persist to DB
        self.db.set_settings(updates)?;

        // Reload config from DB
        self.runtime_config.reload_from_db(&self.db)?;

        // The embedding client holds its base URL/model from startup;
        // changing those takes effect for the client on restart, while
        // limits/intervals are read fresh from the snapshot per use.

        Ok(())
    }
}

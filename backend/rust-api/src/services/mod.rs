use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::{Config, DatabaseBackend};
use crate::store::{
    AccountStore, AttemptStore, ChatLogStore, MemoryStore, MongoStore, ProgressionStore,
    StoreHealth,
};

pub mod attempt_service;
pub mod auth_service;
pub mod chat_service;
pub mod classifier_service;
pub mod document_extractor;
pub mod error;
pub mod evaluation_service;
pub mod gemini_client;
pub mod generative;
pub mod jwt;
#[cfg(any(test, feature = "test-util"))]
pub mod mock_generator;
pub mod progression_service;
pub mod quiz_service;

pub use error::ServiceError;

use document_extractor::{DocumentExtractor, PdfTextExtractor};
use gemini_client::GeminiClient;
use generative::TextGenerator;
use jwt::JwtService;

/// Everything a store backend has to provide.
pub trait Store:
    AccountStore + ProgressionStore + AttemptStore + ChatLogStore + StoreHealth + 'static
{
}

impl<T> Store for T where
    T: AccountStore + ProgressionStore + AttemptStore + ChatLogStore + StoreHealth + 'static
{
}

pub struct AppState {
    pub config: Config,
    pub accounts: Arc<dyn AccountStore>,
    pub progression: Arc<dyn ProgressionStore>,
    pub attempts: Arc<dyn AttemptStore>,
    pub chat_logs: Arc<dyn ChatLogStore>,
    pub store_health: Arc<dyn StoreHealth>,
    pub generator: Arc<dyn TextGenerator>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    /// Production wiring: the configured store backend, Gemini and pdf-extract.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.generation.timeout_secs);
        let generator = Arc::new(
            GeminiClient::new(&config.gemini, timeout).context("Failed to build Gemini client")?,
        );
        let extractor = Arc::new(PdfTextExtractor);

        match config.database_backend {
            DatabaseBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.mongo_uri)
                    .await
                    .context("Failed to parse MongoDB URI")?;
                let store = MongoStore::new(client.database(&config.mongo_database));

                tokio::time::timeout(Duration::from_secs(30), store.ensure_indexes())
                    .await
                    .map_err(|_| anyhow::anyhow!("MongoDB index setup timeout after 30s"))?
                    .context("Failed to create MongoDB indexes")?;
                tracing::info!(database = %config.mongo_database, "MongoDB connected");

                Ok(Self::with_components(config, Arc::new(store), generator, extractor))
            }
            DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Ok(Self::with_components(
                    config,
                    Arc::new(MemoryStore::new()),
                    generator,
                    extractor,
                ))
            }
        }
    }

    pub fn with_components<S: Store>(
        config: Config,
        store: Arc<S>,
        generator: Arc<dyn TextGenerator>,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        let jwt = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.token_ttl_minutes,
        ));
        Self {
            config,
            accounts: store.clone(),
            progression: store.clone(),
            attempts: store.clone(),
            chat_logs: store.clone(),
            store_health: store,
            generator,
            extractor,
            jwt,
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.generation.timeout_secs)
    }
}

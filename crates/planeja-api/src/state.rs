//! Application state wiring all services together.
//!
//! Services are generic over store/hasher/signer traits; AppState pins them
//! to the concrete infra implementations.

use std::sync::Arc;

use planeja_core::auth::failover::FailoverCredentialStore;
use planeja_core::auth::service::SessionService;
use planeja_core::auth::sweeper::ExpirySweeper;
use planeja_core::chat::broker::StreamBroker;
use planeja_core::chat::failover::FailoverConversationStore;
use planeja_core::chat::service::ChatService;
use planeja_infra::config::load_config;
use planeja_infra::crypto::password::Argon2PasswordHasher;
use planeja_infra::crypto::token::HmacTokenSigner;
use planeja_infra::llm::gemini::GeminiGenerator;
use planeja_infra::sqlite::chat::SqliteConversationStore;
use planeja_infra::sqlite::credential::SqliteCredentialStore;
use planeja_infra::sqlite::pool::{default_database_url, DatabasePool};
use planeja_infra::sqlite::subject::SqliteSubjectStore;
use planeja_types::config::AppConfig;

/// Concrete type aliases pinning the service generics to infra
/// implementations.
pub type ConcreteCredentialStore = Arc<FailoverCredentialStore<SqliteCredentialStore>>;

pub type ConcreteSessionService = SessionService<
    ConcreteCredentialStore,
    SqliteSubjectStore,
    Argon2PasswordHasher,
    Arc<HmacTokenSigner>,
>;

pub type ConcreteChatService =
    ChatService<FailoverConversationStore<SqliteConversationStore>, GeminiGenerator>;

pub type ConcreteSweeper = ExpirySweeper<FailoverCredentialStore<SqliteCredentialStore>>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<ConcreteSessionService>,
    pub chat_service: Arc<ConcreteChatService>,
    pub broker: StreamBroker,
    pub signer: Arc<HmacTokenSigner>,
    pub config: Arc<AppConfig>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to the database, wire the
    /// services, and build the expiry sweeper (spawned by the caller).
    pub async fn init() -> anyhow::Result<(Self, ConcreteSweeper)> {
        let config = load_config();

        let db_url = database_url();
        ensure_parent_dir(&db_url).await?;
        let db_pool = DatabasePool::new(&db_url).await?;

        let credentials: ConcreteCredentialStore = Arc::new(FailoverCredentialStore::new(
            SqliteCredentialStore::new(db_pool.clone()),
        ));
        let subjects = SqliteSubjectStore::new(db_pool.clone());
        let signer = Arc::new(HmacTokenSigner::new(
            &config.auth.token_secret,
            config.auth.access_ttl_minutes,
        ));

        let session_service = SessionService::new(
            Arc::clone(&credentials),
            subjects,
            Argon2PasswordHasher::new(),
            Arc::clone(&signer),
            config.cookie.max_age_days,
        );

        let generator = match std::env::var("GEMINI_API_KEY") {
            Ok(key) => GeminiGenerator::new(key),
            Err(_) => {
                tracing::warn!("GEMINI_API_KEY not set; chat replies will fall back to a placeholder");
                GeminiGenerator::new(String::new())
            }
        };
        let broker = StreamBroker::new();
        let chat_service = ChatService::new(
            FailoverConversationStore::new(SqliteConversationStore::new(db_pool.clone())),
            generator,
            broker.clone(),
        );

        let sweeper = ExpirySweeper::new(
            Arc::clone(&credentials),
            std::time::Duration::from_secs(config.sweep.interval_secs),
            std::time::Duration::from_secs(config.sweep.probe_timeout_secs),
        );

        Ok((
            Self {
                session_service: Arc::new(session_service),
                chat_service: Arc::new(chat_service),
                broker,
                signer,
                config: Arc::new(config),
                db_pool,
            },
            sweeper,
        ))
    }
}

fn database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        format!("{}?mode=rwc", default_database_url())
    })
}

async fn ensure_parent_dir(db_url: &str) -> anyhow::Result<()> {
    if let Some(path) = db_url
        .strip_prefix("sqlite://")
        .map(|p| p.split('?').next().unwrap_or(p))
    {
        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

mod assessment;
mod config;
mod db;
mod errors;
mod intake;
mod jobs;
mod llm_client;
mod matching;
mod models;
mod notify;
mod routes;
mod state;
mod store;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assessment::session::RedisSessionStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::intake::orchestrator::{IntakeService, IntakeSettings};
use crate::llm_client::{ChatProvider, EmbeddingProvider, LlmClient};
use crate::matching::embedding::EmbeddingClient;
use crate::notify::{HttpMailer, LogMailer, Mailer};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::documents::S3DocumentStore;
use crate::store::postgres::PgDatastore;
use crate::store::retry::RetryPolicy;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hiring API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let datastore = Arc::new(PgDatastore::new(create_pool(&config.database_url).await?));

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let sessions = Arc::new(RedisSessionStore::new(redis));
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let documents = Arc::new(S3DocumentStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_endpoint.clone(),
    ));
    info!("S3 client initialized");

    // Initialize AI providers (optional)
    let (chat, embedder): (Option<Arc<dyn ChatProvider>>, Option<Arc<dyn EmbeddingProvider>>) =
        match &config.openai_api_key {
            Some(key) => {
                let llm = Arc::new(LlmClient::new(
                    key.clone(),
                    config.openai_base_url.clone(),
                    config.embedding_dimensions,
                )?);
                info!(
                    "LLM client initialized (chat: {}, embeddings: {})",
                    llm_client::CHAT_MODEL,
                    llm_client::EMBEDDING_MODEL
                );
                let chat: Arc<dyn ChatProvider> = llm.clone();
                let embedder: Arc<dyn EmbeddingProvider> = llm;
                (Some(chat), Some(embedder))
            }
            None => {
                warn!("OPENAI_API_KEY not set; AI scoring and generation are disabled");
                (None, None)
            }
        };
    let embeddings = EmbeddingClient::new(embedder, config.embedding_dimensions);

    // Initialize mailer
    let mailer: Arc<dyn Mailer> = match &config.mail_api_key {
        Some(key) => Arc::new(HttpMailer::new(key.clone(), config.mail_from.clone())?),
        None => {
            warn!("MAIL_API_KEY not set; confirmation emails will be logged only");
            Arc::new(LogMailer)
        }
    };

    let retry = RetryPolicy::default();
    let intake = Arc::new(IntakeService::new(
        datastore.clone(),
        documents,
        embeddings.clone(),
        chat.clone(),
        mailer,
        retry,
        IntakeSettings {
            max_resume_bytes: config.max_resume_bytes,
            public_base_url: config.public_base_url.clone(),
        },
    ));

    // Build app state
    let state = AppState {
        datastore,
        sessions,
        chat,
        embeddings,
        intake,
        retry,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to PUBLIC_BASE_URL once the careers site is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "hiring-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets under the path, not as subdomains.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

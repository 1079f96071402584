use std::sync::Arc;

use crate::assessment::session::TestSessionStore;
use crate::config::Config;
use crate::intake::orchestrator::IntakeService;
use crate::llm_client::ChatProvider;
use crate::matching::embedding::EmbeddingClient;
use crate::store::retry::RetryPolicy;
use crate::store::Datastore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every collaborator is a trait object so handlers run against fakes in tests.
#[derive(Clone)]
pub struct AppState {
    pub datastore: Arc<dyn Datastore>,
    pub sessions: Arc<dyn TestSessionStore>,
    /// `None` when the chat provider is unconfigured.
    pub chat: Option<Arc<dyn ChatProvider>>,
    pub embeddings: EmbeddingClient,
    pub intake: Arc<IntakeService>,
    pub retry: RetryPolicy,
    pub config: Config,
}

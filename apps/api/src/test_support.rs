//! In-memory fakes for every collaborator seam, shared by unit and router tests.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::assessment::session::{SessionError, TestSession, TestSessionStore};
use crate::config::Config;
use crate::intake::orchestrator::{IntakeService, IntakeSettings};
use crate::llm_client::{ChatProvider, EmbeddingProvider, LlmError};
use crate::matching::embedding::EmbeddingClient;
use crate::models::application::{
    Application, ApplicationStatus, ApplicationStatusRow, NewApplication,
};
use crate::models::job::{Job, NewJob};
use crate::notify::{EmailMessage, Mailer, NotificationError};
use crate::state::AppState;
use crate::store::documents::{resume_key, DocumentError, DocumentStore};
use crate::store::retry::RetryPolicy;
use crate::store::{Datastore, StoreError};

// ────────────────────────────────────────────────────────────────────────────
// Providers
// ────────────────────────────────────────────────────────────────────────────

/// Chat provider that returns a fixed reply, or always fails like a timed-out upstream.
pub struct ScriptedChat {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or_else(|| LlmError::Api {
            status: 504,
            message: "upstream request timed out".to_string(),
        })
    }
}

pub struct FakeEmbeddings {
    vector: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl FakeEmbeddings {
    pub fn constant(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vector.clone().ok_or(LlmError::RateLimited { retries: 3 })
    }
}

/// Unit vector whose cosine similarity with `[1, 0, 0, …]` is `cosine`.
pub fn unit_vector_at_cosine(dimensions: usize, cosine: f32) -> Vec<f32> {
    let mut v = vec![0.0; dimensions];
    v[0] = cosine;
    if dimensions > 1 {
        v[1] = (1.0 - cosine * cosine).max(0.0).sqrt();
    }
    v
}

// ────────────────────────────────────────────────────────────────────────────
// Datastore
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct StoredApplication {
    record: NewApplication,
    test_score: Option<u8>,
    overall_score: Option<u8>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    jobs: HashMap<Uuid, Job>,
    applications: HashMap<Uuid, StoredApplication>,
}

#[derive(Default)]
pub struct InMemoryDatastore {
    tables: Mutex<Tables>,
    insert_failure: Mutex<Option<fn() -> StoreError>>,
    insert_attempts: AtomicUsize,
    stall_next_insert: AtomicBool,
    replays_are_duplicates: AtomicBool,
}

impl InMemoryDatastore {
    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        let store = Self::default();
        store.tables.lock().unwrap().jobs = jobs.into_iter().map(|j| (j.id, j)).collect();
        store
    }

    pub fn fail_inserts_with(&self, error: fn() -> StoreError) {
        *self.insert_failure.lock().unwrap() = Some(error);
    }

    /// The next insert commits, then stalls past any attempt timeout.
    pub fn stall_next_insert_after_commit(&self) {
        self.stall_next_insert.store(true, Ordering::SeqCst);
    }

    /// Re-inserting an existing id fails on the `(job_id, email)` key instead
    /// of being a no-op.
    pub fn report_replays_as_duplicates(&self) {
        self.replays_are_duplicates.store(true, Ordering::SeqCst);
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    pub fn application(&self, id: Uuid) -> Option<NewApplication> {
        let tables = self.tables.lock().unwrap();
        tables.applications.get(&id).map(|a| a.record.clone())
    }

    pub fn application_count(&self) -> usize {
        self.tables.lock().unwrap().applications.len()
    }

    /// `(test_score, overall_score)` recorded for an application.
    pub fn test_result(&self, id: Uuid) -> Option<(Option<u8>, Option<u8>)> {
        let tables = self.tables.lock().unwrap();
        tables
            .applications
            .get(&id)
            .map(|a| (a.test_score, a.overall_score))
    }

    pub fn seed_application(&self, record: NewApplication) {
        let now = Utc::now();
        self.tables.lock().unwrap().applications.insert(
            record.id,
            StoredApplication {
                record,
                test_score: None,
                overall_score: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn clear_job_embedding(&self, id: Uuid) {
        if let Some(job) = self.tables.lock().unwrap().jobs.get_mut(&id) {
            job.description_embedding = None;
        }
    }

    pub fn deactivate_job(&self, id: Uuid) {
        if let Some(job) = self.tables.lock().unwrap().jobs.get_mut(&id) {
            job.is_active = false;
        }
    }

    fn store_application(&self, application: &NewApplication) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let duplicate = || StoreError::Duplicate("applications_job_id_email_key".to_string());
        if tables.applications.contains_key(&application.id) {
            return if self.replays_are_duplicates.load(Ordering::SeqCst) {
                Err(duplicate())
            } else {
                Ok(())
            };
        }
        if !tables.jobs.contains_key(&application.job_id) {
            return Err(StoreError::ForeignKey("applications_job_id_fkey".to_string()));
        }
        if tables.applications.values().any(|a| {
            a.record.job_id == application.job_id && a.record.email == application.email
        }) {
            return Err(duplicate());
        }

        let now = Utc::now();
        tables.applications.insert(
            application.id,
            StoredApplication {
                record: application.clone(),
                test_score: None,
                overall_score: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.tables.lock().unwrap().jobs.get(&id).cloned())
    }

    async fn insert_job(&self, job: &NewJob) -> Result<Job, StoreError> {
        let row = Job {
            id: job.id,
            title: job.title.clone(),
            description: job.description.clone(),
            required_skills: job.required_skills.clone(),
            experience_min: job.experience_min,
            experience_max: job.experience_max,
            location: job.location.clone(),
            is_active: job.is_active,
            description_embedding: job.description_embedding.clone(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().jobs.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_application(&self, application: &NewApplication) -> Result<(), StoreError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = *self.insert_failure.lock().unwrap() {
            return Err(error());
        }
        self.store_application(application)?;
        if self.stall_next_insert.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.applications.get(&id).map(|a| Application {
            id: a.record.id,
            job_id: a.record.job_id,
            name: a.record.name.clone(),
            email: a.record.email.clone(),
            status: a.record.status,
            similarity_score: a.record.similarity_score,
            match_score: a.record.match_score,
            ai_analysis: a.record.ai_analysis.clone(),
            test_score: a.test_score,
            tracking_token: a.record.tracking_token.clone(),
            test_token: a.record.test_token.clone(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }))
    }

    async fn find_status_by_tracking_token(
        &self,
        token: &str,
    ) -> Result<Option<ApplicationStatusRow>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let Some(app) = tables
            .applications
            .values()
            .find(|a| a.record.tracking_token == token)
        else {
            return Ok(None);
        };
        let Some(job) = tables.jobs.get(&app.record.job_id) else {
            return Ok(None);
        };
        Ok(Some(ApplicationStatusRow {
            application_id: app.record.id,
            status: app.record.status.as_str().to_string(),
            match_score: i16::from(app.record.match_score),
            test_score: app.test_score.map(i16::from),
            job_id: job.id,
            job_title: job.title.clone(),
            job_location: job.location.clone(),
            submitted_at: app.created_at,
            updated_at: app.updated_at,
        }))
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(match tables.applications.get_mut(&id) {
            Some(app) => {
                app.record.status = status;
                app.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn record_test_result(
        &self,
        id: Uuid,
        test_score: u8,
        overall_score: Option<u8>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(match tables.applications.get_mut(&id) {
            Some(app) => {
                app.test_score = Some(test_score);
                app.overall_score = overall_score;
                app.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }
}

pub fn job_with_embedding(title: &str, embedding: Option<Vec<f32>>) -> Job {
    Job {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: "Design, build and operate backend services in Rust.".to_string(),
        required_skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
        experience_min: 3,
        experience_max: 6,
        location: Some("Remote".to_string()),
        is_active: true,
        description_embedding: embedding,
        created_at: Utc::now(),
    }
}

/// A scored application for `job_id` with the given match score.
pub fn scored_application(job_id: Uuid, match_score: u8) -> NewApplication {
    NewApplication {
        id: Uuid::new_v4(),
        job_id,
        name: "Jane Doe".to_string(),
        email: format!("{}@example.com", Uuid::new_v4().simple()),
        phone: "+1 555 0100".to_string(),
        current_company: None,
        experience: None,
        skills: vec!["Rust".to_string()],
        education: None,
        cover_letter: None,
        resume_url: "memory://resume.pdf".to_string(),
        resume_file_name: "resume.pdf".to_string(),
        resume_text: "Rust engineer".to_string(),
        resume_embedding: vec![],
        similarity_score: match_score,
        ai_analysis: None,
        match_score,
        status: ApplicationStatus::Submitted,
        tracking_token: Uuid::new_v4().simple().to_string(),
        test_token: Uuid::new_v4().simple().to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Documents, sessions, mail
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryDocuments {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryDocuments {
    pub fn count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

/// Document store whose deletes always fail.
#[derive(Default)]
pub struct UndeletableDocuments {
    inner: InMemoryDocuments,
}

impl UndeletableDocuments {
    pub fn count(&self) -> usize {
        self.inner.count()
    }
}

#[async_trait]
impl DocumentStore for UndeletableDocuments {
    async fn put_resume(
        &self,
        application_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, DocumentError> {
        self.inner
            .put_resume(application_id, file_name, content_type, bytes)
            .await
    }

    async fn delete_resume(&self, _application_id: Uuid, _file_name: &str) -> Result<(), DocumentError> {
        Err(DocumentError::Delete("access denied".to_string()))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocuments {
    async fn put_resume(
        &self,
        application_id: Uuid,
        file_name: &str,
        _content_type: &str,
        bytes: Bytes,
    ) -> Result<String, DocumentError> {
        let key = resume_key(application_id, file_name);
        self.objects.lock().unwrap().insert(key.clone(), bytes);
        Ok(format!("memory://{key}"))
    }

    async fn delete_resume(&self, application_id: Uuid, file_name: &str) -> Result<(), DocumentError> {
        self.objects
            .lock()
            .unwrap()
            .remove(&resume_key(application_id, file_name));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessions {
    sessions: Mutex<HashMap<String, TestSession>>,
}

impl InMemorySessions {
    pub fn contains(&self, token: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(token)
    }
}

#[async_trait]
impl TestSessionStore for InMemorySessions {
    async fn save(
        &self,
        token: &str,
        session: &TestSession,
        _ttl: Duration,
    ) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(token.to_string(), session.clone());
        Ok(())
    }

    async fn open(
        &self,
        token: &str,
        session: &TestSession,
        _ttl: Duration,
    ) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(token) {
            return Ok(false);
        }
        sessions.insert(token.to_string(), session.clone());
        Ok(true)
    }

    async fn load(&self, token: &str) -> Result<Option<TestSession>, SessionError> {
        Ok(self.sessions.lock().unwrap().get(token).cloned())
    }

    async fn take(&self, token: &str) -> Result<Option<TestSession>, SessionError> {
        Ok(self.sessions.lock().unwrap().remove(token))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Mail provider that accepts the connection and never answers.
pub struct HangingMailer;

#[async_trait]
impl Mailer for HangingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), NotificationError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected {
            status: 422,
            message: "invalid recipient".to_string(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Documents and wiring
// ────────────────────────────────────────────────────────────────────────────

/// Minimal DOCX archive whose body is a single paragraph of `text`.
pub fn docx(text: &str) -> Bytes {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer
        .write_all(
            format!("<w:document><w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body></w:document>")
                .as_bytes(),
        )
        .unwrap();
    Bytes::from(writer.finish().unwrap().into_inner())
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/hiring_test".to_string(),
        redis_url: "redis://localhost".to_string(),
        s3_bucket: "resumes".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        openai_api_key: None,
        openai_base_url: "http://localhost:1/v1".to_string(),
        embedding_dimensions: 8,
        mail_api_key: None,
        mail_from: "Careers <no-reply@example.com>".to_string(),
        public_base_url: "https://careers.example.com".to_string(),
        max_resume_bytes: 1024 * 1024,
        port: 0,
        rust_log: "info".to_string(),
    }
}

/// A fully wired `AppState` over in-memory fakes, with handles for assertions.
pub struct TestApp {
    pub state: AppState,
    pub datastore: Arc<InMemoryDatastore>,
    pub sessions: Arc<InMemorySessions>,
    pub mailer: Arc<RecordingMailer>,
    pub job: Job,
}

impl TestApp {
    pub fn new(chat: Option<ScriptedChat>) -> Self {
        let config = test_config();
        let dims = config.embedding_dimensions;
        let job = job_with_embedding("Backend Engineer", Some(unit_vector_at_cosine(dims, 1.0)));

        let datastore = Arc::new(InMemoryDatastore::with_jobs(vec![job.clone()]));
        let sessions = Arc::new(InMemorySessions::default());
        let mailer = Arc::new(RecordingMailer::default());
        let chat: Option<Arc<dyn ChatProvider>> = chat.map(|c| Arc::new(c) as Arc<dyn ChatProvider>);
        let embeddings = EmbeddingClient::new(
            Some(Arc::new(FakeEmbeddings::constant(unit_vector_at_cosine(dims, 0.81)))),
            dims,
        );
        let retry = RetryPolicy::default();

        let intake = Arc::new(IntakeService::new(
            datastore.clone(),
            Arc::new(InMemoryDocuments::default()),
            embeddings.clone(),
            chat.clone(),
            mailer.clone(),
            retry,
            IntakeSettings {
                max_resume_bytes: config.max_resume_bytes,
                public_base_url: config.public_base_url.clone(),
            },
        ));

        let state = AppState {
            datastore: datastore.clone(),
            sessions: sessions.clone(),
            chat,
            embeddings,
            intake,
            retry,
            config,
        };

        Self {
            state,
            datastore,
            sessions,
            mailer,
            job,
        }
    }
}

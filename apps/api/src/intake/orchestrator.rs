//! Application Intake Orchestrator.
//!
//! One submission moves strictly through:
//! validate → load job → extract → store resume → embed → score → persist → notify.
//!
//! Extraction, embedding and AI analysis degrade and continue. Validation, a
//! missing job, unreadable documents, resume storage and persistence are fatal
//! and reported to the caller; a resume stored for a submission that fails to
//! persist is removed again. Notification is best-effort and time-boxed.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::validation::{validate, ApplicationForm, ValidationError};
use crate::llm_client::ChatProvider;
use crate::matching::analyzer::{analyze_match, JobRequirements};
use crate::matching::blend::{blend_scores, ScoreSource};
use crate::matching::embedding::EmbeddingClient;
use crate::matching::extractor::{extract_text, ExtractionError};
use crate::matching::similarity::similarity_score;
use crate::models::analysis::MatchAnalysis;
use crate::models::application::{ApplicationStatus, NewApplication};
use crate::notify::{application_confirmation, Mailer};
use crate::store::documents::{DocumentError, DocumentStore};
use crate::store::retry::RetryPolicy;
use crate::store::{Datastore, StoreError};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("job {0} is no longer accepting applications")]
    JobInactive(Uuid),

    #[error(transparent)]
    Document(#[from] ExtractionError),

    #[error(transparent)]
    Storage(#[from] DocumentError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::Validation(ValidationError::MissingFields(fields)) => {
                AppError::MissingFields(fields)
            }
            IntakeError::Validation(ValidationError::UnsupportedFileType(mime)) => {
                AppError::UnsupportedFileType(mime)
            }
            IntakeError::Validation(other) => AppError::Validation(other.to_string()),
            IntakeError::JobNotFound(_) | IntakeError::JobInactive(_) => {
                AppError::NotFound(e.to_string())
            }
            IntakeError::Document(e) => e.into(),
            IntakeError::Storage(e) => e.into(),
            IntakeError::Persistence(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntakeSettings {
    pub max_resume_bytes: usize,
    /// Root of the candidate-facing site; tracking links hang off it.
    pub public_base_url: String,
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub application_id: Uuid,
    pub match_score: u8,
    pub similarity_score: u8,
    pub score_source: ScoreSource,
    pub ai_analysis: Option<MatchAnalysis>,
    pub tracking_token: String,
    /// True when the resume text is a metadata placeholder.
    pub degraded_text: bool,
}

pub struct IntakeService {
    datastore: Arc<dyn Datastore>,
    documents: Arc<dyn DocumentStore>,
    embeddings: EmbeddingClient,
    chat: Option<Arc<dyn ChatProvider>>,
    mailer: Arc<dyn Mailer>,
    retry: RetryPolicy,
    settings: IntakeSettings,
}

impl IntakeService {
    pub fn new(
        datastore: Arc<dyn Datastore>,
        documents: Arc<dyn DocumentStore>,
        embeddings: EmbeddingClient,
        chat: Option<Arc<dyn ChatProvider>>,
        mailer: Arc<dyn Mailer>,
        retry: RetryPolicy,
        settings: IntakeSettings,
    ) -> Self {
        Self {
            datastore,
            documents,
            embeddings,
            chat,
            mailer,
            retry,
            settings,
        }
    }

    pub fn tracking_url(&self, token: &str) -> String {
        format!(
            "{}/track/{}",
            self.settings.public_base_url.trim_end_matches('/'),
            token
        )
    }

    pub async fn submit(&self, form: ApplicationForm) -> Result<IntakeOutcome, IntakeError> {
        // 1. Received
        let app = validate(form, self.settings.max_resume_bytes)?;

        let job = self
            .retry
            .run("load job", || self.datastore.get_job(app.job_id))
            .await?
            .ok_or(IntakeError::JobNotFound(app.job_id))?;
        if !job.is_active {
            return Err(IntakeError::JobInactive(job.id));
        }

        // 2. Extracting
        let extracted = extract_text(
            app.resume.bytes.clone(),
            &app.resume.content_type,
            &app.resume.file_name,
        )
        .await?;

        let application_id = Uuid::new_v4();
        let resume_url = self
            .documents
            .put_resume(
                application_id,
                &app.resume.file_name,
                &app.resume.content_type,
                app.resume.bytes.clone(),
            )
            .await?;

        // 3. Embedding
        let resume_embedding = self.embeddings.embed_or_zero(&extracted.text).await;
        let job_embedding = job.usable_embedding(self.embeddings.dimensions());
        if job_embedding.is_none() {
            warn!("Job {} has no usable description embedding", job.id);
        }

        // 4. Scoring
        let similarity =
            job_embedding.and_then(|job_vec| similarity_score(&resume_embedding, job_vec));

        let ai_analysis = match (job_embedding, self.chat.as_deref()) {
            (Some(_), Some(chat)) => {
                match analyze_match(chat, &extracted.text, JobRequirements::from(&job)).await {
                    Ok(analysis) => Some(analysis),
                    Err(e) => {
                        warn!("AI match analysis failed for application {application_id}: {e}; using similarity score");
                        None
                    }
                }
            }
            (Some(_), None) => {
                warn!("Chat provider not configured; skipping AI match analysis");
                None
            }
            (None, _) => None,
        };

        let blended = blend_scores(similarity, ai_analysis.as_ref());

        // 5. Persisted
        let tracking_token = new_token();
        let record = NewApplication {
            id: application_id,
            job_id: job.id,
            name: app.name,
            email: app.email,
            phone: app.phone,
            current_company: app.current_company,
            experience: app.experience,
            skills: app.skills,
            education: app.education,
            cover_letter: app.cover_letter,
            resume_url,
            resume_file_name: app.resume.file_name,
            resume_text: extracted.text,
            resume_embedding,
            similarity_score: similarity.unwrap_or(0),
            ai_analysis,
            match_score: blended.score,
            status: ApplicationStatus::Submitted,
            tracking_token: tracking_token.clone(),
            test_token: new_token(),
        };

        if let Err(e) = self.persist(&record).await {
            self.discard_resume(application_id, &record.resume_file_name)
                .await;
            return Err(e.into());
        }

        info!(
            "Application {} submitted for job {} (score {} via {:?})",
            application_id, job.id, blended.score, blended.source
        );

        // 6. Notified
        let message = application_confirmation(
            &record.email,
            &record.name,
            &job.title,
            &self.tracking_url(&tracking_token),
        );
        match tokio::time::timeout(NOTIFY_TIMEOUT, self.mailer.send(&message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Confirmation email for application {application_id} failed: {e}")
            }
            Err(_) => warn!(
                "Confirmation email for application {application_id} timed out after {}s",
                NOTIFY_TIMEOUT.as_secs()
            ),
        }

        Ok(IntakeOutcome {
            application_id,
            match_score: blended.score,
            similarity_score: record.similarity_score,
            score_source: blended.source,
            ai_analysis: record.ai_analysis,
            tracking_token,
            degraded_text: extracted.degraded,
        })
    }

    /// Inserts with retry. When an attempt times out after committing, the
    /// retry can trip the `(job_id, email)` key on our own row; finding the
    /// row under this submission's fresh id means the insert went through.
    async fn persist(&self, record: &NewApplication) -> Result<(), StoreError> {
        let result = self
            .retry
            .run("insert application", || {
                self.datastore.insert_application(record)
            })
            .await;

        match result {
            Err(StoreError::Duplicate(key)) => match self.datastore.get_application(record.id).await {
                Ok(Some(_)) => {
                    info!("Application {} was committed by an earlier attempt", record.id);
                    Ok(())
                }
                Ok(None) => Err(StoreError::Duplicate(key)),
                Err(e) => {
                    warn!("Could not check whether application {} exists: {e}", record.id);
                    Err(StoreError::Duplicate(key))
                }
            },
            other => other,
        }
    }

    async fn discard_resume(&self, application_id: Uuid, file_name: &str) {
        match self.documents.delete_resume(application_id, file_name).await {
            Ok(()) => info!("Removed resume of unsaved application {application_id}"),
            Err(e) => warn!("Orphaned resume for unsaved application {application_id}: {e}"),
        }
    }
}

/// Opaque, unguessable token for unauthenticated candidate links.
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

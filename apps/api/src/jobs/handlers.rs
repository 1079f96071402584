//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::validation::parse_skills;
use crate::jobs::description::{generate_description, DescriptionError, DescriptionRequest};
use crate::matching::embedding::is_zero_vector;
use crate::models::job::{Job, NewJob};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub experience_min: i32,
    #[serde(default)]
    pub experience_max: i32,
    pub location: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub experience_min: i32,
    pub experience_max: i32,
    pub location: Option<String>,
    pub is_active: bool,
    /// False when no embedding signal was available at creation.
    pub has_embedding: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            has_embedding: job.description_embedding.is_some(),
            id: job.id,
            title: job.title,
            description: job.description,
            required_skills: job.required_skills,
            experience_min: job.experience_min,
            experience_max: job.experience_max,
            location: job.location,
            is_active: job.is_active,
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDescriptionRequest {
    pub title: String,
    pub location: Option<String>,
    #[serde(default)]
    pub experience_min: i32,
    #[serde(default)]
    pub experience_max: i32,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateDescriptionResponse {
    pub description: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs
///
/// Creates a posting and computes its description embedding once. A
/// zero-vector result carries no signal and is stored as NULL.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let title = request.title.map(|t| t.trim().to_string()).unwrap_or_default();
    let description = request
        .description
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    let missing: Vec<String> = [("title", &title), ("description", &description)]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::MissingFields(missing));
    }
    if request.experience_min < 0 || request.experience_max < request.experience_min {
        return Err(AppError::Validation(
            "experience range must satisfy 0 <= experienceMin <= experienceMax".to_string(),
        ));
    }

    let embedding = state
        .embeddings
        .embed_or_zero(&format!("{title}\n\n{description}"))
        .await;
    let description_embedding = if is_zero_vector(&embedding) {
        warn!("No embedding signal for job '{title}'; applications will not be AI-scored");
        None
    } else {
        Some(embedding)
    };

    let new_job = NewJob {
        id: Uuid::new_v4(),
        title,
        description,
        required_skills: parse_skills(&request.required_skills.join(",")),
        experience_min: request.experience_min,
        experience_max: request.experience_max,
        location: request
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        is_active: request.is_active,
        description_embedding,
    };

    let job = state
        .retry
        .run("insert job", || state.datastore.insert_job(&new_job))
        .await?;
    info!("Created job {} ({})", job.id, job.title);

    Ok(Json(job.into()))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state
        .datastore
        .get_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(job.into()))
}

/// POST /api/v1/jobs/description
///
/// Drafts a job description. 503 when the provider is unconfigured.
pub async fn handle_generate_description(
    State(state): State<AppState>,
    Json(request): Json<GenerateDescriptionRequest>,
) -> Result<Json<GenerateDescriptionResponse>, AppError> {
    let chat = state
        .chat
        .as_deref()
        .ok_or(AppError::ServiceUnavailable("Job description generation"))?;

    let description = generate_description(
        chat,
        &DescriptionRequest {
            title: request.title,
            location: request.location,
            experience_min: request.experience_min,
            experience_max: request.experience_max,
            skills: request.skills,
        },
    )
    .await
    .map_err(|e| match e {
        DescriptionError::InvalidRequest(msg) => AppError::Validation(msg),
        DescriptionError::Provider(e) => e.into(),
        other => AppError::GenerationFailed(other.to_string()),
    })?;

    Ok(Json(GenerateDescriptionResponse { description }))
}

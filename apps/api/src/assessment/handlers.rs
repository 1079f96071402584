//! Axum route handlers for the Assessment API.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::assessment::generator::{generate_mcq, McqError, McqQuestion, McqRequest};
use crate::assessment::scorer::{overall_score, score_answers};
use crate::assessment::session::TestSession;
use crate::errors::{AppError, PROVIDER_HINT};
use crate::state::AppState;

const DEFAULT_COUNT: usize = 10;
const DEFAULT_DURATION_MINUTES: u32 = 30;
const MAX_DURATION_MINUTES: u32 = 240;
const DEFAULT_PASSING_SCORE: u8 = 60;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

fn default_count() -> usize {
    DEFAULT_COUNT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestRequest {
    pub job_title: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default)]
    pub experience_years: f32,
    /// Binds the generated test to an application and opens a session.
    pub application_id: Option<Uuid>,
    pub duration_minutes: Option<u32>,
    pub passing_score: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestResponse {
    pub ok: bool,
    pub questions: Vec<McqQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_token: Option<String>,
}

/// Failure envelope for test generation: `{ok: false, error}`.
#[derive(Debug)]
pub struct GenerateTestError {
    status: StatusCode,
    error: String,
}

impl GenerateTestError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }
}

impl From<AppError> for GenerateTestError {
    fn from(e: AppError) -> Self {
        let (status, _, message, _) = e.parts();
        Self::new(status, message)
    }
}

impl IntoResponse for GenerateTestError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({ "ok": false, "error": self.error });
        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            body["hint"] = PROVIDER_HINT.into();
        }
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateQuestion {
    pub index: usize,
    pub q: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTestResponse {
    pub job_title: String,
    pub duration_minutes: u32,
    pub passing_score: u8,
    pub questions: Vec<CandidateQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTestRequest {
    /// Question index → selected option. Unanswered entries may be absent or null.
    #[serde(default)]
    pub answers: HashMap<usize, Option<i64>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestResponse {
    pub score: u8,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/tests/generate
///
/// Generates an MCQ set. With `applicationId`, the set is stored as a test
/// session under the application's test token and the token is returned. An
/// application gets one test: 409 while a session is open or once a result is
/// recorded.
pub async fn handle_generate_test(
    State(state): State<AppState>,
    Json(request): Json<GenerateTestRequest>,
) -> Result<Json<GenerateTestResponse>, GenerateTestError> {
    let Some(chat) = state.chat.as_deref() else {
        return Err(GenerateTestError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Test generation is unavailable because the AI provider is not configured",
        ));
    };

    let duration_minutes = request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(GenerateTestError::new(
            StatusCode::BAD_REQUEST,
            format!("durationMinutes must be between 1 and {MAX_DURATION_MINUTES}"),
        ));
    }
    let passing_score = request.passing_score.unwrap_or(DEFAULT_PASSING_SCORE);
    if passing_score > 100 {
        return Err(GenerateTestError::new(
            StatusCode::BAD_REQUEST,
            "passingScore must be between 0 and 100",
        ));
    }

    let application = match request.application_id {
        Some(id) => {
            let application = state
                .datastore
                .get_application(id)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
            if application.test_score.is_some() {
                return Err(GenerateTestError::new(
                    StatusCode::CONFLICT,
                    format!("Application {id} has already completed its screening test"),
                ));
            }
            if state
                .sessions
                .load(&application.test_token)
                .await
                .map_err(AppError::from)?
                .is_some()
            {
                return Err(test_already_open(id));
            }
            Some(application)
        }
        None => None,
    };

    let mcq_request = McqRequest {
        job_title: request.job_title,
        skills: request.skills,
        count: request.count,
        experience_years: request.experience_years,
    };
    let questions = generate_mcq(chat, &mcq_request).await.map_err(|e| match e {
        McqError::InvalidRequest(msg) => GenerateTestError::new(StatusCode::BAD_REQUEST, msg),
        McqError::GenerationFailed(msg) => {
            warn!("MCQ generation failed: {msg}");
            GenerateTestError::new(StatusCode::BAD_GATEWAY, format!("Generation failed: {msg}"))
        }
    })?;

    let test_token = match application {
        Some(application) => {
            let session = TestSession {
                application_id: application.id,
                job_title: mcq_request.job_title.trim().to_string(),
                questions: questions.clone(),
                duration_minutes,
                passing_score,
                created_at: Utc::now(),
            };
            let opened = state
                .sessions
                .open(&application.test_token, &session, session.ttl())
                .await
                .map_err(AppError::from)?;
            if !opened {
                return Err(test_already_open(application.id));
            }
            info!(
                "Opened test session for application {} ({} questions)",
                application.id,
                questions.len()
            );
            Some(application.test_token)
        }
        None => None,
    };

    Ok(Json(GenerateTestResponse {
        ok: true,
        questions,
        test_token,
    }))
}

fn test_already_open(application_id: Uuid) -> GenerateTestError {
    GenerateTestError::new(
        StatusCode::CONFLICT,
        format!("A screening test is already open for application {application_id}"),
    )
}

/// GET /api/v1/tests/:token
///
/// Candidate view of an open test. Correct answers are never included.
pub async fn handle_get_test(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<CandidateTestResponse>, AppError> {
    let session = state
        .sessions
        .load(&token)
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found or already submitted".to_string()))?;

    Ok(Json(CandidateTestResponse {
        job_title: session.job_title,
        duration_minutes: session.duration_minutes,
        passing_score: session.passing_score,
        questions: session
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, q)| CandidateQuestion {
                index,
                q: q.q,
                options: q.options,
            })
            .collect(),
    }))
}

/// POST /api/v1/tests/:token/submit
///
/// Scores the answers, records the result on the application and closes the
/// session. If the result cannot be recorded the session is restored so the
/// candidate can resubmit.
pub async fn handle_submit_test(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<SubmitTestRequest>,
) -> Result<Json<SubmitTestResponse>, AppError> {
    let session = state
        .sessions
        .take(&token)
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found or already submitted".to_string()))?;

    let result = score_answers(&session.questions, &request.answers);
    let application_id = session.application_id;

    let recorded = async {
        let match_score = state
            .datastore
            .get_application(application_id)
            .await?
            .map(|a| a.match_score);
        let overall = match_score.map(|m| overall_score(m, result.percentage));

        let updated = state
            .retry
            .run("record test result", || {
                state
                    .datastore
                    .record_test_result(application_id, result.percentage, overall)
            })
            .await?;
        if !updated {
            warn!("Application {application_id} vanished before its test result was recorded");
        }
        Ok::<_, AppError>(overall)
    }
    .await;

    let overall_score = match recorded {
        Ok(overall) => overall,
        Err(e) => {
            if let Err(restore) = state.sessions.save(&token, &session, session.ttl()).await {
                warn!("Failed to restore test session for application {application_id}: {restore}");
            }
            return Err(e);
        }
    };

    info!(
        "Test submitted for application {application_id}: {}/{} ({}%)",
        result.correct_answers, result.total_questions, result.percentage
    );

    Ok(Json(SubmitTestResponse {
        score: result.percentage,
        correct_answers: result.correct_answers,
        total_questions: result.total_questions,
        passed: result.percentage >= session.passing_score,
        overall_score,
    }))
}

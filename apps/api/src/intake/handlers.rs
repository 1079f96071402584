//! Axum route handlers for the Applications API.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::validation::{ApplicationForm, ResumeUpload};
use crate::models::analysis::Recommendation;
use crate::models::application::{ApplicationStatus, ApplicationStatusRow};
use crate::state::AppState;

const TOP_STRENGTHS: usize = 3;
const TOP_CONCERNS: usize = 2;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub recommendation: Recommendation,
    pub top_strengths: Vec<String>,
    pub top_concerns: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationResponse {
    pub success: bool,
    pub application_id: Uuid,
    pub match_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AnalysisSummary>,
    pub tracking_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusResponse {
    pub application_id: Uuid,
    pub status: ApplicationStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/applications
///
/// Multipart submission: text fields plus a `resume` file part.
pub async fn handle_submit_application(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SubmitApplicationResponse>, AppError> {
    let form = read_form(multipart).await?;
    let outcome = state.intake.submit(form).await?;

    Ok(Json(SubmitApplicationResponse {
        success: true,
        application_id: outcome.application_id,
        match_score: outcome.match_score,
        ai_analysis: outcome.ai_analysis.map(|a| AnalysisSummary {
            recommendation: a.recommendation,
            top_strengths: a.strengths.into_iter().take(TOP_STRENGTHS).collect(),
            top_concerns: a.concerns.into_iter().take(TOP_CONCERNS).collect(),
        }),
        tracking_token: outcome.tracking_token,
    }))
}

/// GET /api/v1/applications/track/:token
///
/// Read-only status view for unauthenticated candidates.
pub async fn handle_track_application(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ApplicationStatusRow>, AppError> {
    let row = state
        .datastore
        .find_status_by_tracking_token(&token)
        .await?
        .ok_or_else(|| AppError::NotFound("No application matches this tracking link".to_string()))?;
    Ok(Json(row))
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, AppError> {
    let status: ApplicationStatus = request.status.trim().parse().map_err(AppError::Validation)?;

    let updated = state
        .retry
        .run("update application status", || {
            state.datastore.update_application_status(id, status)
        })
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!("Application {id} not found")));
    }

    Ok(Json(UpdateStatusResponse {
        application_id: id,
        status,
    }))
}

/// Collects the multipart body into an `ApplicationForm`. Unknown parts are ignored.
async fn read_form(mut multipart: Multipart) -> Result<ApplicationForm, AppError> {
    let mut form = ApplicationForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "resume" {
            let file_name = field.file_name().unwrap_or("resume").to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read resume upload: {e}")))?;
            form.resume = Some(ResumeUpload {
                file_name,
                content_type,
                bytes,
            });
            continue;
        }

        let slot = match name.as_str() {
            "jobId" => &mut form.job_id,
            "name" => &mut form.name,
            "email" => &mut form.email,
            "phone" => &mut form.phone,
            "currentCompany" => &mut form.current_company,
            "experience" => &mut form.experience,
            "skills" => &mut form.skills,
            "education" => &mut form.education,
            "coverLetter" => &mut form.cover_letter,
            _ => continue,
        };
        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read field '{name}': {e}")))?;
        *slot = Some(value);
    }

    Ok(form)
}

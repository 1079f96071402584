pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::assessment::handlers as assessment;
use crate::intake::handlers as intake;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

/// Multipart overhead allowed on top of the resume itself, so oversize
/// resumes reach validation and get a precise error.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_resume_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route("/api/v1/jobs", post(jobs::handle_create_job))
        .route("/api/v1/jobs/description", post(jobs::handle_generate_description))
        .route("/api/v1/jobs/:id", get(jobs::handle_get_job))
        // Applications
        .route(
            "/api/v1/applications",
            post(intake::handle_submit_application).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/v1/applications/track/:token",
            get(intake::handle_track_application),
        )
        .route(
            "/api/v1/applications/:id/status",
            patch(intake::handle_update_status),
        )
        // Assessments
        .route("/api/v1/tests/generate", post(assessment::handle_generate_test))
        .route("/api/v1/tests/:token", get(assessment::handle_get_test))
        .route(
            "/api/v1/tests/:token/submit",
            post(assessment::handle_submit_test),
        )
        .with_state(state)
}

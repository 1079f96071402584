use thiserror::Error;
use tracing::info;

use crate::jobs::prompts::{JOB_DESCRIPTION_PROMPT_TEMPLATE, JOB_DESCRIPTION_SYSTEM};
use crate::llm_client::prompts::{fill_template, UNTRUSTED_INPUT_INSTRUCTION};
use crate::llm_client::{ChatProvider, LlmError};

/// Replies shorter than this are treated as a failed generation.
const MIN_DESCRIPTION_CHARS: usize = 80;

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("generated description is too short ({0} chars)")]
    TooShort(usize),
}

#[derive(Debug, Clone)]
pub struct DescriptionRequest {
    pub title: String,
    pub location: Option<String>,
    pub experience_min: i32,
    pub experience_max: i32,
    pub skills: Vec<String>,
}

pub async fn generate_description(
    chat: &dyn ChatProvider,
    request: &DescriptionRequest,
) -> Result<String, DescriptionError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(DescriptionError::InvalidRequest("title is required".to_string()));
    }
    if request.experience_min < 0 || request.experience_max < request.experience_min {
        return Err(DescriptionError::InvalidRequest(
            "experience range must satisfy 0 <= experienceMin <= experienceMax".to_string(),
        ));
    }

    let skills = if request.skills.is_empty() {
        "not specified".to_string()
    } else {
        request.skills.join(", ")
    };
    let location = request
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("not specified");
    let prompt = fill_template(
        JOB_DESCRIPTION_PROMPT_TEMPLATE,
        &[
            ("untrusted_instruction", UNTRUSTED_INPUT_INSTRUCTION),
            ("title", title),
            ("location", location),
            ("experience_min", &request.experience_min.to_string()),
            ("experience_max", &request.experience_max.to_string()),
            ("skills", &skills),
        ],
    );

    let description = chat.complete(&prompt, JOB_DESCRIPTION_SYSTEM).await?;
    let description = description.trim().to_string();
    let chars = description.chars().count();
    if chars < MIN_DESCRIPTION_CHARS {
        return Err(DescriptionError::TooShort(chars));
    }

    info!("Generated {chars}-char job description for '{title}'");
    Ok(description)
}

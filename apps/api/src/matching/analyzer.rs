//! AI Match Analyzer — asks the chat provider for a structured resume/job
//! assessment and coerces the reply into a `MatchAnalysis`.
//!
//! The reply is untrusted. It is read into a typed reply struct whose lenient
//! fields tolerate type drift; numbers are clamped, missing lists default to
//! empty, missing strings to "". Only a missing or non-numeric `matchScore`
//! rejects the whole reply. On any failure the caller falls back to the cosine
//! score; this module never fabricates a score.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::llm_client::prompts::{fill_template, UNTRUSTED_INPUT_INSTRUCTION};
use crate::llm_client::{complete_json, lenient, ChatProvider, LlmError};
use crate::matching::prompts::{MATCH_ANALYSIS_PROMPT_TEMPLATE, MATCH_ANALYSIS_SYSTEM};
use crate::models::analysis::{ExperienceMatch, MatchAnalysis, Recommendation, SkillsMatch};
use crate::models::job::Job;

const MAX_RESUME_PROMPT_CHARS: usize = 12_000;
const MAX_DESCRIPTION_PROMPT_CHARS: usize = 6_000;
const MAX_LIST_ITEMS: usize = 5;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("provider call failed: {0}")]
    Provider(LlmError),

    #[error("reply was not a JSON object: {0}")]
    Unparseable(String),

    #[error("reply is missing required field '{0}'")]
    MissingField(&'static str),
}

impl From<LlmError> for AnalysisError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Parse(e) => AnalysisError::Unparseable(e.to_string()),
            other => AnalysisError::Provider(other),
        }
    }
}

/// Structured job requirements the analyzer scores against.
#[derive(Debug, Clone, Copy)]
pub struct JobRequirements<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub required_skills: &'a [String],
    pub experience_min: i32,
    pub experience_max: i32,
    pub location: Option<&'a str>,
}

impl<'a> From<&'a Job> for JobRequirements<'a> {
    fn from(job: &'a Job) -> Self {
        Self {
            title: &job.title,
            description: &job.description,
            required_skills: &job.required_skills,
            experience_min: job.experience_min,
            experience_max: job.experience_max,
            location: job.location.as_deref(),
        }
    }
}

/// Runs one analysis call. Results vary across calls for the same input.
pub async fn analyze_match(
    chat: &dyn ChatProvider,
    resume_text: &str,
    job: JobRequirements<'_>,
) -> Result<MatchAnalysis, AnalysisError> {
    let prompt = build_prompt(resume_text, job);
    let reply: Value = complete_json(chat, &prompt, MATCH_ANALYSIS_SYSTEM).await?;
    coerce_analysis(reply)
}

fn build_prompt(resume_text: &str, job: JobRequirements<'_>) -> String {
    let skills = if job.required_skills.is_empty() {
        "not specified".to_string()
    } else {
        job.required_skills.join(", ")
    };

    let experience_min = job.experience_min.to_string();
    let experience_max = job.experience_max.to_string();
    fill_template(
        MATCH_ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("untrusted_instruction", UNTRUSTED_INPUT_INSTRUCTION),
            ("job_title", job.title),
            ("job_location", job.location.unwrap_or("not specified")),
            ("required_skills", &skills),
            ("experience_min", &experience_min),
            ("experience_max", &experience_max),
            (
                "job_description",
                take_chars(job.description, MAX_DESCRIPTION_PROMPT_CHARS),
            ),
            ("resume_text", take_chars(resume_text, MAX_RESUME_PROMPT_CHARS)),
        ],
    )
}

/// Reply shape requested by the prompt. Every field is optional here;
/// `coerce_analysis` decides what is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReply {
    #[serde(default, alias = "match_score", alias = "score", deserialize_with = "lenient::number")]
    match_score: Option<f64>,
    #[serde(default, alias = "skills_match", deserialize_with = "lenient::object_or_default")]
    skills_match: SkillsReply,
    #[serde(default, alias = "experience_match", deserialize_with = "lenient::object_or_default")]
    experience_match: ExperienceReply,
    #[serde(default, deserialize_with = "lenient::string_list")]
    strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    concerns: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    recommendation: String,
    #[serde(default, deserialize_with = "lenient::text")]
    summary: String,
}

#[derive(Debug, Default, Deserialize)]
struct SkillsReply {
    #[serde(default, deserialize_with = "lenient::string_list")]
    matched: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    missing: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    additional: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExperienceReply {
    #[serde(default, alias = "candidate_years", deserialize_with = "lenient::number")]
    candidate_years: Option<f64>,
    #[serde(default, alias = "meets_requirement", deserialize_with = "lenient::flag")]
    meets_requirement: bool,
    #[serde(default, deserialize_with = "lenient::text")]
    analysis: String,
}

/// Validates and coerces a raw model reply.
pub fn coerce_analysis(reply: Value) -> Result<MatchAnalysis, AnalysisError> {
    if !reply.is_object() {
        return Err(AnalysisError::Unparseable(format!(
            "expected object, got {}",
            json_kind(&reply)
        )));
    }
    let reply: AnalysisReply =
        serde_json::from_value(reply).map_err(|e| AnalysisError::Unparseable(e.to_string()))?;

    let match_score = reply
        .match_score
        .map(clamp_score)
        .ok_or(AnalysisError::MissingField("matchScore"))?;

    let recommendation = Recommendation::from_label(&reply.recommendation)
        .unwrap_or_else(|| Recommendation::from_score(match_score));

    Ok(MatchAnalysis {
        match_score,
        skills_match: SkillsMatch {
            matched: reply.skills_match.matched,
            missing: reply.skills_match.missing,
            additional: reply.skills_match.additional,
        },
        experience_match: ExperienceMatch {
            candidate_years: reply
                .experience_match
                .candidate_years
                .filter(|y| *y >= 0.0)
                .map(|y| y as f32),
            meets_requirement: reply.experience_match.meets_requirement,
            analysis: reply.experience_match.analysis,
        },
        strengths: capped(reply.strengths),
        concerns: capped(reply.concerns),
        recommendation,
        summary: reply.summary,
    })
}

fn clamp_score(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

fn capped(mut items: Vec<String>) -> Vec<String> {
    items.truncate(MAX_LIST_ITEMS);
    items
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

//! Produces N four-option multiple-choice questions for a role.
//!
//! The reply is read into typed question structs. Any structural defect
//! (non-JSON, missing fields, wrong option count, out-of-range index, too few
//! questions) fails the whole request.
//! Not idempotent: identical inputs may yield different sets, and nothing is cached.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::assessment::prompts::{MCQ_PROMPT_TEMPLATE, MCQ_SYSTEM};
use crate::llm_client::prompts::{fill_template, UNTRUSTED_INPUT_INSTRUCTION};
use crate::llm_client::{complete_json, ChatProvider, LlmError};

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const MAX_QUESTIONS: usize = 30;

#[derive(Debug, Error)]
pub enum McqError {
    #[error("invalid test request: {0}")]
    InvalidRequest(String),

    #[error("question generation failed: {0}")]
    GenerationFailed(String),
}

impl From<LlmError> for McqError {
    fn from(e: LlmError) -> Self {
        McqError::GenerationFailed(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqQuestion {
    pub q: String,
    /// Always exactly `OPTIONS_PER_QUESTION` entries.
    pub options: Vec<String>,
    /// 0 – 3
    pub correct_index: u8,
}

#[derive(Debug, Clone)]
pub struct McqRequest {
    pub job_title: String,
    pub skills: Vec<String>,
    pub count: usize,
    pub experience_years: f32,
}

impl McqRequest {
    fn validate(&self) -> Result<(), McqError> {
        if self.job_title.trim().is_empty() {
            return Err(McqError::InvalidRequest("jobTitle is required".to_string()));
        }
        if !(1..=MAX_QUESTIONS).contains(&self.count) {
            return Err(McqError::InvalidRequest(format!(
                "count must be between 1 and {MAX_QUESTIONS}"
            )));
        }
        if !self.experience_years.is_finite() || self.experience_years < 0.0 {
            return Err(McqError::InvalidRequest(
                "experienceYears must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

pub async fn generate_mcq(
    chat: &dyn ChatProvider,
    request: &McqRequest,
) -> Result<Vec<McqQuestion>, McqError> {
    request.validate()?;

    let reply: Value = complete_json(chat, &build_prompt(request), MCQ_SYSTEM).await?;
    let questions = parse_questions(reply, request.count)?;

    info!(
        "Generated {} MCQ questions for '{}'",
        questions.len(),
        request.job_title
    );
    Ok(questions)
}

fn build_prompt(request: &McqRequest) -> String {
    let skills: Vec<&str> = request
        .skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let skills = if skills.is_empty() {
        "core skills for the role".to_string()
    } else {
        skills.join(", ")
    };

    fill_template(
        MCQ_PROMPT_TEMPLATE,
        &[
            ("untrusted_instruction", UNTRUSTED_INPUT_INSTRUCTION),
            ("count", &request.count.to_string()),
            ("job_title", request.job_title.trim()),
            ("skills", &skills),
            ("experience_years", &request.experience_years.to_string()),
            ("difficulty", difficulty_for(request.experience_years)),
        ],
    )
}

/// Qualitative difficulty guidance scaled by experience.
pub fn difficulty_for(experience_years: f32) -> &'static str {
    if experience_years < 2.0 {
        "entry level: fundamentals and common usage"
    } else if experience_years < 5.0 {
        "intermediate: practical trade-offs and debugging"
    } else {
        "advanced: architecture, performance and edge cases"
    }
}

/// Either `{"questions": [...]}` or a bare array. Items stay raw so one bad
/// question is reported by position.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionsReply {
    Bare(Vec<Value>),
    Wrapped { questions: Vec<Value> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionReply {
    #[serde(alias = "question", alias = "prompt")]
    q: String,
    options: Vec<String>,
    #[serde(
        alias = "correct_index",
        alias = "answerIndex",
        alias = "answer",
        deserialize_with = "choice_index"
    )]
    correct_index: u64,
}

/// Extra questions are dropped.
pub fn parse_questions(reply: Value, expected: usize) -> Result<Vec<McqQuestion>, McqError> {
    let items = match serde_json::from_value::<QuestionsReply>(reply) {
        Ok(QuestionsReply::Bare(items)) | Ok(QuestionsReply::Wrapped { questions: items }) => items,
        Err(_) => {
            return Err(McqError::GenerationFailed(
                "reply has no 'questions' array".to_string(),
            ))
        }
    };

    if items.len() < expected {
        return Err(McqError::GenerationFailed(format!(
            "expected {expected} questions, got {}",
            items.len()
        )));
    }

    items
        .into_iter()
        .take(expected)
        .enumerate()
        .map(|(i, item)| {
            parse_question(item).map_err(|reason| {
                McqError::GenerationFailed(format!("question {}: {reason}", i + 1))
            })
        })
        .collect()
}

fn parse_question(item: Value) -> Result<McqQuestion, String> {
    let reply: QuestionReply = serde_json::from_value(item).map_err(|e| e.to_string())?;

    let q = reply.q.trim().to_string();
    if q.is_empty() {
        return Err("missing question text".to_string());
    }

    let options: Vec<String> = reply.options.iter().map(|o| o.trim().to_string()).collect();
    if options.len() != OPTIONS_PER_QUESTION {
        return Err(format!(
            "expected {OPTIONS_PER_QUESTION} options, got {}",
            options.len()
        ));
    }
    if options.iter().any(|o| o.is_empty()) {
        return Err("options must not be blank".to_string());
    }

    let correct_index = u8::try_from(reply.correct_index)
        .ok()
        .filter(|i| usize::from(*i) < OPTIONS_PER_QUESTION)
        .ok_or_else(|| format!("correctIndex {} is out of range", reply.correct_index))?;

    Ok(McqQuestion {
        q,
        options,
        correct_index,
    })
}

/// Integer, a numeric string, or a letter A–D.
fn choice_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let index = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(0),
            "B" => Some(1),
            "C" => Some(2),
            "D" => Some(3),
            other => other.parse::<u64>().ok(),
        },
        _ => None,
    };
    index.ok_or_else(|| D::Error::custom("correctIndex must be an option number or letter"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedChat;
    use serde_json::json;

    fn request(count: usize) -> McqRequest {
        McqRequest {
            job_title: "Backend Engineer".to_string(),
            skills: vec!["Rust".to_string(), " ".to_string(), "SQL".to_string()],
            count,
            experience_years: 3.0,
        }
    }

    fn question(i: usize) -> Value {
        json!({"q": format!("Question {i}?"), "options": ["a", "b", "c", "d"], "correctIndex": i % 4})
    }

    #[tokio::test]
    async fn test_generates_requested_count() {
        let reply = json!({"questions": (0..3).map(question).collect::<Vec<_>>()}).to_string();
        let chat = ScriptedChat::replying(&reply);

        let questions = generate_mcq(&chat, &request(3)).await.unwrap();
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| q.options.len() == 4));
        assert_eq!(questions[2].correct_index, 2);

        let prompt = chat.last_prompt().unwrap();
        assert!(prompt.contains("Write 3 multiple-choice questions"));
        assert!(prompt.contains("Rust, SQL"));
        assert!(prompt.contains("intermediate"));
    }

    #[tokio::test]
    async fn test_title_placeholders_are_not_expanded() {
        let reply = json!([question(0)]).to_string();
        let chat = ScriptedChat::replying(&reply);
        let request = McqRequest {
            job_title: "Engineer {skills}".to_string(),
            ..request(1)
        };
        generate_mcq(&chat, &request).await.unwrap();

        let prompt = chat.last_prompt().unwrap();
        assert!(prompt.contains("ROLE: Engineer {skills}"));
        assert!(prompt.contains("SKILLS TO COVER: Rust, SQL"));
        assert!(prompt.contains(UNTRUSTED_INPUT_INSTRUCTION));
    }

    #[test]
    fn test_non_string_options_fail() {
        let reply = json!([{"q": "?", "options": ["a", 2, "c", "d"], "correctIndex": 0}]);
        assert!(parse_questions(reply, 1).is_err());
    }

    #[tokio::test]
    async fn test_extra_questions_are_dropped() {
        let reply = json!((0..5).map(question).collect::<Vec<_>>()).to_string();
        let chat = ScriptedChat::replying(&reply);
        let questions = generate_mcq(&chat, &request(2)).await.unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[tokio::test]
    async fn test_too_few_questions_fail() {
        let reply = json!({"questions": [question(0)]}).to_string();
        let chat = ScriptedChat::replying(&reply);
        let err = generate_mcq(&chat, &request(2)).await.unwrap_err();
        assert!(matches!(err, McqError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_non_json_reply_fails() {
        let chat = ScriptedChat::replying("Here are your questions: 1. ...");
        let err = generate_mcq(&chat, &request(1)).await.unwrap_err();
        assert!(matches!(err, McqError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_provider_error_fails() {
        let chat = ScriptedChat::failing();
        let err = generate_mcq(&chat, &request(1)).await.unwrap_err();
        assert!(matches!(err, McqError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_invalid_request_skips_provider() {
        let chat = ScriptedChat::replying("{}");
        let err = generate_mcq(&chat, &request(0)).await.unwrap_err();
        assert!(matches!(err, McqError::InvalidRequest(_)));
        let err = generate_mcq(&chat, &request(MAX_QUESTIONS + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, McqError::InvalidRequest(_)));
        assert_eq!(chat.calls(), 0);
    }

    #[test]
    fn test_wrong_option_count_fails() {
        let reply = json!([{"q": "?", "options": ["a", "b", "c"], "correctIndex": 0}]);
        let err = parse_questions(reply, 1).unwrap_err();
        assert!(err.to_string().contains("expected 4 options"));
    }

    #[test]
    fn test_out_of_range_index_fails() {
        let reply = json!([{"q": "?", "options": ["a", "b", "c", "d"], "correctIndex": 4}]);
        assert!(parse_questions(reply, 1).is_err());
    }

    #[test]
    fn test_missing_question_text_fails() {
        let reply = json!([{"options": ["a", "b", "c", "d"], "correctIndex": 1}]);
        assert!(parse_questions(reply, 1).is_err());
    }

    #[test]
    fn test_alternate_field_names_are_accepted() {
        let reply = json!({"questions": [
            {"question": "Which?", "options": ["a", "b", "c", "d"], "answer": "C"},
            {"prompt": "What?", "options": ["a", "b", "c", "d"], "correct_index": "1"}
        ]});
        let questions = parse_questions(reply, 2).unwrap();
        assert_eq!(questions[0].q, "Which?");
        assert_eq!(questions[0].correct_index, 2);
        assert_eq!(questions[1].correct_index, 1);
    }

    #[test]
    fn test_difficulty_scales_with_experience() {
        assert!(difficulty_for(0.0).starts_with("entry"));
        assert!(difficulty_for(3.0).starts_with("intermediate"));
        assert!(difficulty_for(8.0).starts_with("advanced"));
    }
}

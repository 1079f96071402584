//! Submission validation. Every missing required field is collected before
//! failing so the candidate can fix the form in one pass.

use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::matching::extractor::{MIME_DOC, MIME_DOCX, MIME_PDF};

const MAX_SKILLS: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    Invalid(String),

    #[error("Resume is {size} bytes; the limit is {max} bytes")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported file type '{0}'")]
    UnsupportedFileType(String),
}

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Raw multipart fields as received. Blank text counts as absent.
#[derive(Debug, Clone, Default)]
pub struct ApplicationForm {
    pub job_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_company: Option<String>,
    pub experience: Option<String>,
    /// Comma-separated.
    pub skills: Option<String>,
    pub education: Option<String>,
    pub cover_letter: Option<String>,
    pub resume: Option<ResumeUpload>,
}

#[derive(Debug, Clone)]
pub struct ValidatedApplication {
    pub job_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub current_company: Option<String>,
    pub experience: Option<String>,
    pub skills: Vec<String>,
    pub education: Option<String>,
    pub cover_letter: Option<String>,
    pub resume: ResumeUpload,
}

pub fn validate(
    form: ApplicationForm,
    max_resume_bytes: usize,
) -> Result<ValidatedApplication, ValidationError> {
    let job_id = present(form.job_id);
    let name = present(form.name);
    let email = present(form.email);
    let phone = present(form.phone);
    let resume = form.resume.filter(|r| !r.bytes.is_empty());

    let missing: Vec<String> = [
        ("jobId", job_id.is_none()),
        ("name", name.is_none()),
        ("email", email.is_none()),
        ("phone", phone.is_none()),
        ("resume", resume.is_none()),
    ]
    .into_iter()
    .filter(|(_, absent)| *absent)
    .map(|(field, _)| field.to_string())
    .collect();

    let (Some(job_id), Some(name), Some(email), Some(phone), Some(mut resume)) =
        (job_id, name, email, phone, resume)
    else {
        return Err(ValidationError::MissingFields(missing));
    };

    let job_id = Uuid::parse_str(&job_id)
        .map_err(|_| ValidationError::Invalid(format!("jobId '{job_id}' is not a valid id")))?;

    if !looks_like_email(&email) {
        return Err(ValidationError::Invalid(format!(
            "'{email}' is not a valid email address"
        )));
    }

    if resume.bytes.len() > max_resume_bytes {
        return Err(ValidationError::FileTooLarge {
            size: resume.bytes.len(),
            max: max_resume_bytes,
        });
    }

    resume.content_type = resolve_content_type(&resume.content_type, &resume.file_name)
        .ok_or_else(|| ValidationError::UnsupportedFileType(resume.content_type.clone()))?
        .to_string();

    Ok(ValidatedApplication {
        job_id,
        name,
        email: email.to_ascii_lowercase(),
        phone,
        current_company: present(form.current_company),
        experience: present(form.experience),
        skills: parse_skills(form.skills.as_deref().unwrap_or_default()),
        education: present(form.education),
        cover_letter: present(form.cover_letter),
        resume,
    })
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Maps the declared type onto the allow-list. Browsers sometimes send
/// `application/octet-stream`, in which case the file extension decides.
pub fn resolve_content_type(declared: &str, file_name: &str) -> Option<&'static str> {
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        MIME_PDF => Some(MIME_PDF),
        MIME_DOCX => Some(MIME_DOCX),
        MIME_DOC => Some(MIME_DOC),
        "" | "application/octet-stream" => {
            let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
            match extension.as_str() {
                "pdf" => Some(MIME_PDF),
                "docx" => Some(MIME_DOCX),
                "doc" => Some(MIME_DOC),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Splits a comma-separated skill list, dropping blanks and case-insensitive duplicates.
pub fn parse_skills(raw: &str) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();
    for skill in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            skills.push(skill.to_string());
        }
        if skills.len() == MAX_SKILLS {
            break;
        }
    }
    skills
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::analysis::MatchAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Shortlisted,
    Interviewing,
    Rejected,
    Offered,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Hired => "hired",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(ApplicationStatus::Submitted),
            "under_review" => Ok(ApplicationStatus::UnderReview),
            "shortlisted" => Ok(ApplicationStatus::Shortlisted),
            "interviewing" => Ok(ApplicationStatus::Interviewing),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "offered" => Ok(ApplicationStatus::Offered),
            "hired" => Ok(ApplicationStatus::Hired),
            other => Err(format!("unknown application status '{other}'")),
        }
    }
}

/// A scored application ready to be written. Built by the intake pipeline.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub current_company: Option<String>,
    pub experience: Option<String>,
    pub skills: Vec<String>,
    pub education: Option<String>,
    pub cover_letter: Option<String>,
    pub resume_url: String,
    pub resume_file_name: String,
    pub resume_text: String,
    pub resume_embedding: Vec<f32>,
    /// Cosine-derived score, 0 – 100. Retained as a secondary signal.
    pub similarity_score: u8,
    pub ai_analysis: Option<MatchAnalysis>,
    /// Blended "official" score, 0 – 100.
    pub match_score: u8,
    pub status: ApplicationStatus,
    pub tracking_token: String,
    pub test_token: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub email: String,
    pub status: String,
    pub similarity_score: i16,
    pub match_score: i16,
    pub ai_analysis: Option<Json<MatchAnalysis>>,
    pub test_score: Option<i16>,
    pub tracking_token: String,
    pub test_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application as seen by the rest of the service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub email: String,
    pub status: ApplicationStatus,
    pub similarity_score: u8,
    pub match_score: u8,
    pub ai_analysis: Option<MatchAnalysis>,
    pub test_score: Option<u8>,
    #[serde(skip_serializing)]
    pub tracking_token: String,
    #[serde(skip_serializing)]
    pub test_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = String;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Application {
            id: row.id,
            job_id: row.job_id,
            name: row.name,
            email: row.email,
            status: row.status.parse()?,
            similarity_score: score_from_db(row.similarity_score),
            match_score: score_from_db(row.match_score),
            ai_analysis: row.ai_analysis.map(|j| j.0),
            test_score: row.test_score.map(score_from_db),
            tracking_token: row.tracking_token,
            test_token: row.test_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Read-only projection served to unauthenticated candidates by tracking token.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatusRow {
    pub application_id: Uuid,
    pub status: String,
    pub match_score: i16,
    pub test_score: Option<i16>,
    pub job_id: Uuid,
    pub job_title: String,
    pub job_location: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored scores are always written from `u8` values in 0 – 100; anything
/// else read back is clamped.
pub fn score_from_db(value: i16) -> u8 {
    value.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ApplicationStatus::Hired,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!("archived".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_score_from_db_clamps() {
        assert_eq!(score_from_db(-4), 0);
        assert_eq!(score_from_db(140), 100);
        assert_eq!(score_from_db(72), 72);
    }
}

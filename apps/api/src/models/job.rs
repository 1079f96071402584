use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub experience_min: i32,
    pub experience_max: i32,
    pub location: Option<String>,
    pub is_active: bool,
    /// Computed once when the description is finalized. `None` when the
    /// embedding provider gave no signal.
    #[serde(skip_serializing)]
    pub description_embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// The description embedding, only when its length matches the configured
    /// embedding size. Mismatched or empty vectors are never compared.
    pub fn usable_embedding(&self, dimensions: usize) -> Option<&[f32]> {
        self.description_embedding
            .as_deref()
            .filter(|e| !e.is_empty() && e.len() == dimensions)
    }
}

/// Fields required to create a job posting.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub experience_min: i32,
    pub experience_max: i32,
    pub location: Option<String>,
    pub is_active: bool,
    pub description_embedding: Option<Vec<f32>>,
}

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::application::{
    Application, ApplicationRow, ApplicationStatus, ApplicationStatusRow, NewApplication,
};
use crate::models::job::{Job, NewJob};
use crate::store::{Datastore, StoreError};

const APPLICATION_COLUMNS: &str = "id, job_id, name, email, status, similarity_score, \
    match_score, ai_analysis, test_score, tracking_token, test_token, created_at, updated_at";

/// Postgres-backed `Datastore`.
#[derive(Clone)]
pub struct PgDatastore {
    pool: PgPool,
}

impl PgDatastore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Datastore for PgDatastore {
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_job(&self, job: &NewJob) -> Result<Job, StoreError> {
        let row = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
                (id, title, description, required_skills, experience_min, experience_max,
                 location, is_active, description_embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.required_skills)
        .bind(job.experience_min)
        .bind(job.experience_max)
        .bind(&job.location)
        .bind(job.is_active)
        .bind(&job.description_embedding)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted job {} ({})", row.id, row.title);
        Ok(row)
    }

    async fn insert_application(&self, app: &NewApplication) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO applications
                (id, job_id, name, email, phone, current_company, experience, skills,
                 education, cover_letter, resume_url, resume_file_name, resume_text,
                 resume_embedding, similarity_score, ai_analysis, match_score, status,
                 tracking_token, test_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(app.id)
        .bind(app.job_id)
        .bind(&app.name)
        .bind(&app.email)
        .bind(&app.phone)
        .bind(&app.current_company)
        .bind(&app.experience)
        .bind(&app.skills)
        .bind(&app.education)
        .bind(&app.cover_letter)
        .bind(&app.resume_url)
        .bind(&app.resume_file_name)
        .bind(&app.resume_text)
        .bind(&app.resume_embedding)
        .bind(i16::from(app.similarity_score))
        .bind(app.ai_analysis.as_ref().map(Json))
        .bind(i16::from(app.match_score))
        .bind(app.status.as_str())
        .bind(&app.tracking_token)
        .bind(&app.test_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Application::try_from)
            .transpose()
            .map_err(StoreError::Corrupt)
    }

    async fn find_status_by_tracking_token(
        &self,
        token: &str,
    ) -> Result<Option<ApplicationStatusRow>, StoreError> {
        Ok(sqlx::query_as::<_, ApplicationStatusRow>(
            r#"
            SELECT a.id AS application_id, a.status, a.match_score, a.test_score,
                   j.id AS job_id, j.title AS job_title, j.location AS job_location,
                   a.created_at AS submitted_at, a.updated_at
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.tracking_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE applications SET status = $1, updated_at = now() WHERE id = $2")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_test_result(
        &self,
        id: Uuid,
        test_score: u8,
        overall_score: Option<u8>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET test_score = $1, overall_score = $2, updated_at = now()
            WHERE id = $3
            "#,
        )
        .bind(i16::from(test_score))
        .bind(overall_score.map(i16::from))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

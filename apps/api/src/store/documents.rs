use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

const MAX_FILE_NAME_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document upload failed: {0}")]
    Upload(String),

    #[error("document delete failed: {0}")]
    Delete(String),
}

/// Stores uploaded resume files and returns a URL for the stored object.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put_resume(
        &self,
        application_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, DocumentError>;

    /// Removes a resume stored by `put_resume`. Deleting a missing object succeeds.
    async fn delete_resume(&self, application_id: Uuid, file_name: &str)
        -> Result<(), DocumentError>;
}

/// S3 / MinIO-backed resume storage.
pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    endpoint: String,
}

impl S3DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, endpoint: String) -> Self {
        Self {
            client,
            bucket,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn put_resume(
        &self,
        application_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, DocumentError> {
        let key = resume_key(application_id, file_name);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| DocumentError::Upload(e.to_string()))?;

        info!("Uploaded resume to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }

    async fn delete_resume(
        &self,
        application_id: Uuid,
        file_name: &str,
    ) -> Result<(), DocumentError> {
        let key = resume_key(application_id, file_name);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| DocumentError::Delete(e.to_string()))?;

        info!("Deleted resume s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

pub fn resume_key(application_id: Uuid, file_name: &str) -> String {
    format!("resumes/{}/{}", application_id, sanitize_file_name(file_name))
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_CHARS)
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "resume".to_string()
    } else {
        cleaned
    }
}

//! S3-backed problem catalog.
//!
//! Reads test-case corpora and boilerplate templates from the problems
//! bucket. Supports both AWS S3 and MinIO for development.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use tracing::{debug, info, warn};

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

use super::problems::{Boilerplate, ProblemCatalog, TestCase, boilerplate_key, corpus_key};

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    /// Create a new S3 storage client from configuration.
    pub async fn new(config: &StorageSettings) -> AppResult<Self> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "judge-orchestrator",
        );

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let storage = Self {
            client,
            bucket: config.bucket.clone(),
        };

        storage.check_bucket().await?;

        info!("S3 problem catalog initialized: bucket={}", config.bucket);

        Ok(storage)
    }

    /// Verify the bucket is reachable. Problem content is managed elsewhere,
    /// so a missing bucket is an error rather than something to create.
    async fn check_bucket(&self) -> AppResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to access bucket '{}': {}",
                    self.bucket,
                    e.into_service_error()
                ))
            })?;
        Ok(())
    }

    /// Get an object's bytes. Returns None when the key does not exist.
    pub async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!(
                    "Failed to get '{}' from S3: {}",
                    key, service_error
                )));
            }
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(Some(data))
    }
}

#[async_trait]
impl ProblemCatalog for Storage {
    async fn test_cases(&self, problem_slug: &str) -> AppResult<Vec<TestCase>> {
        let key = corpus_key(problem_slug);
        let Some(data) = self.get(&key).await? else {
            warn!("Test case corpus not found: s3://{}/{}", self.bucket, key);
            return Ok(Vec::new());
        };

        let cases: Vec<TestCase> = serde_json::from_slice(&data)
            .map_err(|e| AppError::Storage(format!("Corrupt test case corpus '{}': {}", key, e)))?;
        debug!("Loaded {} test cases for {}", cases.len(), problem_slug);

        Ok(cases)
    }

    async fn boilerplate(
        &self,
        problem_slug: &str,
        language_id: i32,
    ) -> AppResult<Option<Boilerplate>> {
        let key = boilerplate_key(problem_slug, language_id);
        let Some(data) = self.get(&key).await? else {
            return Ok(None);
        };

        let boilerplate: Boilerplate = serde_json::from_slice(&data)
            .map_err(|e| AppError::Storage(format!("Corrupt boilerplate '{}': {}", key, e)))?;

        Ok(Some(boilerplate))
    }
}

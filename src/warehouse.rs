//! BigQuery load trigger
//!
//! After the full window is written, one load job ingests every blob
//! matching the wildcard into the analytic table. The job is submitted,
//! polled until the warehouse reports a terminal state, and any error
//! result is fatal.

use crate::error::{IngestError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

const BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
const JOB_POLL_DELAY_MS: u64 = 2000;

/// Trait for warehouse loaders
pub trait WarehouseLoader: Send + Sync {
    /// Submit one load job covering every blob matching `source_uri` and
    /// wait for the warehouse to report success or failure
    fn load(
        &self,
        source_uri: &str,
        dataset: &str,
        table: &str,
        schema: &TableSchema,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Column schema for a load job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<TableField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: String,
    pub description: String,
}

impl TableField {
    fn nullable(name: &str, field_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            mode: "NULLABLE".to_string(),
            description: description.to_string(),
        }
    }
}

/// The fixed five-column exchange-rate table schema
pub fn exchange_rate_schema() -> TableSchema {
    TableSchema {
        fields: vec![
            TableField::nullable("date", "DATE", "Date of the measurement"),
            TableField::nullable("base", "STRING", "Base currency (ISO code)"),
            TableField::nullable("currency", "STRING", "Currency compared to (ISO code)"),
            TableField::nullable(
                "units_per_currency",
                "FLOAT",
                "Units per currency. Amount in currency = amount in base / UPC",
            ),
            TableField::nullable(
                "currencies_per_unit",
                "FLOAT",
                "Currencies per unit. Amount in currency = amount in base * CPU",
            ),
        ],
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobRequest<'a> {
    configuration: JobConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobConfiguration<'a> {
    load: LoadConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadConfiguration<'a> {
    source_uris: Vec<&'a str>,
    source_format: &'a str,
    write_disposition: &'a str,
    destination_table: TableReference<'a>,
    schema: &'a TableSchema,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    job_reference: JobReference,
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: String,
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// BigQuery REST loader
pub struct BigQueryLoader {
    client: Client,
    project: String,
    token: String,
    base_url: String,
}

impl BigQueryLoader {
    /// Create a loader for `project` authenticated with a bearer token
    pub fn new(project: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IngestError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            project,
            token,
            base_url: BIGQUERY_BASE_URL.to_string(),
        })
    }

    /// Point the loader at a different endpoint, for tests
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn poll_job(&self, job_id: &str) -> Result<JobStatus> {
        let url = format!("{}/projects/{}/jobs/{}", self.base_url, self.project, job_id);

        loop {
            tokio::time::sleep(Duration::from_millis(JOB_POLL_DELAY_MS)).await;

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| IngestError::Load(format!("job poll failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(IngestError::Load(format!(
                    "warehouse returned {} while polling job {}",
                    response.status(),
                    job_id
                )));
            }

            let job: JobResponse = response
                .json()
                .await
                .map_err(|e| IngestError::Load(format!("unexpected job response: {}", e)))?;

            if job.status.state == "DONE" {
                return Ok(job.status);
            }
            log::debug!("load job {} still {}", job_id, job.status.state);
        }
    }
}

impl WarehouseLoader for BigQueryLoader {
    async fn load(
        &self,
        source_uri: &str,
        dataset: &str,
        table: &str,
        schema: &TableSchema,
    ) -> Result<()> {
        let body = JobRequest {
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    source_uris: vec![source_uri],
                    source_format: "NEWLINE_DELIMITED_JSON",
                    write_disposition: "WRITE_TRUNCATE",
                    destination_table: TableReference {
                        project_id: &self.project,
                        dataset_id: dataset,
                        table_id: table,
                    },
                    schema,
                },
            },
        };

        let url = format!("{}/projects/{}/jobs", self.base_url, self.project);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Load(format!("job submission failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IngestError::Load(format!(
                "warehouse returned {}: {}",
                status, text
            )));
        }

        let job: JobResponse = response
            .json()
            .await
            .map_err(|e| IngestError::Load(format!("unexpected job response: {}", e)))?;
        log::info!(
            "load job {} submitted for {}",
            job.job_reference.job_id,
            source_uri
        );

        let final_status = if job.status.state == "DONE" {
            job.status
        } else {
            self.poll_job(&job.job_reference.job_id).await?
        };

        if let Some(err) = final_status.error_result {
            return Err(IngestError::Load(format!("{}: {}", err.reason, err.message)));
        }

        Ok(())
    }
}

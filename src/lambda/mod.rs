// src/lambda/mod.rs

//! AWS Lambda handler for the reconciler.
//!
//! A scheduled or manual invocation:
//! 1. Loads configuration (file named by `RECONCILER_CONFIG`, then environment)
//! 2. Opens the configured tree store
//! 3. Reconciles every course, or only `courseId` when given

use std::time::Instant;

use lambda_runtime::{Error as LambdaError, LambdaEvent};

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::{Actor, Config};
use crate::pipeline::{self, ReconcileSummary};
use crate::services::ModuleMigrator;
use crate::storage::{self, DualWriteStore};

/// Lambda invocation payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    /// Compute plans without writing
    #[serde(default)]
    pub dry_run: bool,

    /// Reconcile this course only
    pub course_id: Option<String>,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub success: bool,

    pub success_count: usize,

    pub failure_count: usize,

    pub fixed_module_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub execution_time_ms: u64,
}

impl From<ReconcileSummary> for ReconcileResponse {
    fn from(summary: ReconcileSummary) -> Self {
        Self {
            success: true,
            success_count: summary.success_count,
            failure_count: summary.failure_count,
            fixed_module_count: summary.fixed_module_count,
            error: None,
            execution_time_ms: 0,
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<ReconcileRequest>,
) -> std::result::Result<ReconcileResponse, LambdaError> {
    let start = Instant::now();
    let (request, _context) = event.into_parts();

    info!(
        "Starting reconcile: dry_run={}, course_id={:?}",
        request.dry_run, request.course_id
    );

    match run_reconcile(&request).await {
        Ok(mut response) => {
            response.execution_time_ms = start.elapsed().as_millis() as u64;
            info!(
                "Reconcile completed: {} corrigés, {} échecs in {}ms",
                response.success_count, response.failure_count, response.execution_time_ms
            );
            Ok(response)
        }
        Err(e) => {
            error!("Reconcile failed: {}", e);
            Ok(ReconcileResponse {
                success: false,
                error: Some(e.to_string()),
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            })
        }
    }
}

async fn run_reconcile(request: &ReconcileRequest) -> Result<ReconcileResponse> {
    let mut config = load_lambda_config()?;
    if request.dry_run {
        config.reconcile.dry_run = true;
    }

    let backend = storage::open_store(&config.store).await?;
    let store = DualWriteStore::new(backend, &config.namespaces);

    let summary = match request.course_id.as_deref() {
        Some(course_id) => {
            let migrator =
                ModuleMigrator::new(store, Actor::system()).dry_run(config.reconcile.dry_run);
            pipeline::reconcile_courses(&migrator, vec![course_id.to_string()], 1).await
        }
        None => pipeline::run_reconcile(&config, store, Actor::system()).await?,
    };

    Ok(summary.into())
}

/// Load configuration suitable for the Lambda environment.
fn load_lambda_config() -> Result<Config> {
    let mut config = match std::env::var("RECONCILER_CONFIG") {
        Ok(path) => Config::load(&path)?,
        Err(_) => Config::default(),
    };
    config.apply_env()?;

    if let Ok(concurrent) = std::env::var("MAX_CONCURRENT") {
        if let Ok(n) = concurrent.parse() {
            config.reconcile.max_concurrent = n;
        }
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: ReconcileRequest = serde_json::from_str("{}").unwrap();
        assert!(!req.dry_run);
        assert!(req.course_id.is_none());
    }

    #[test]
    fn test_request_with_options() {
        let req: ReconcileRequest =
            serde_json::from_str(r#"{"dryRun": true, "courseId": "c1"}"#).unwrap();
        assert!(req.dry_run);
        assert_eq!(req.course_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_response_from_summary() {
        let summary = ReconcileSummary {
            success_count: 3,
            failure_count: 1,
            fixed_module_count: 5,
            ..ReconcileSummary::default()
        };
        let value = serde_json::to_value(ReconcileResponse::from(summary)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["successCount"], 3);
        assert_eq!(value["failureCount"], 1);
        assert_eq!(value["fixedModuleCount"], 5);
        assert!(value.get("error").is_none());
    }
}

//! AWS Lambda entry point for the course reconciler
//!
//! Deploy with `cargo lambda build --release --features lambda`.
//!
//! ## Environment Variables
//!
//! - `RECONCILER_CONFIG`: Path to a TOML config bundled with the function
//! - `FIREBASE_DATABASE_URL`: Realtime database base URL; selects the firebase backend
//! - `STORE_BACKEND`: `firebase`, `local` or `memory`, overrides the choice above
//! - `FIREBASE_AUTH_TOKEN`: Database secret or ID token
//! - `MAX_CONCURRENT`: Courses reconciled at the same time
//! - `RUST_LOG`: Log level (e.g., `info`, `debug`)

use course_reconciler::lambda::handler;
use lambda_runtime::{Error as LambdaError, service_fn};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Course reconciler Lambda starting...");
    lambda_runtime::run(service_fn(handler)).await
}

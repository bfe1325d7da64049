//! Binary entrypoint: loads configuration, builds the [`AppContext`], starts
//! the worker pool, and runs until a shutdown signal arrives.
//!
//! The HTTP surface itself is an external collaborator this workspace does
//! not implement (design doc §1) — this binary brings up everything an HTTP
//! layer would sit in front of, so that layer's handlers would just call
//! `context.admission.admit(...)` and `context.submit(...)` /
//! `context.rag.query(...)`.

use std::sync::Arc;

use airouter::{AppConfig, AppContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::load()?;
    let context = Arc::new(AppContext::build(config)?);
    context.start();

    tracing::info!(
        concurrency = context.config.worker.concurrency,
        providers = context.chat_order.len(),
        "airouter started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining in-flight work");
    context.shutdown().await;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_output = std::env::var("AIROUTER_LOG_FORMAT")
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

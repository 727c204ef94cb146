//! echo-web — Axum host for the journal store.
//! Loads config, wires the pipeline, serves the API.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use echo_core::config::Config;
use echo_core::pipeline::AnalysisPipeline;

use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_path = project_root.join("config.yaml");
    let config = Config::load_or_default(&config_path)?;

    info!(
        "Storage root {}, analysis service {}",
        config.resolve_storage_root().display(),
        config.backend_host
    );

    let upload_dir = config.resolve_upload_dir();
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", upload_dir.display()))?;

    let pipeline = Arc::new(
        AnalysisPipeline::from_config(&config).context("Failed to build analysis client")?,
    );
    let entries = pipeline.refresh().await;
    eprintln!("\n  Loaded {} journal entr(ies)", entries.len());

    let state = Arc::new(AppState { pipeline, config });
    let app = server::router(Arc::clone(&state));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = format!("0.0.0.0:{}", port);

    eprintln!("  Listening on http://localhost:{}\n", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Graceful shutdown on Ctrl+C. In-flight analysis tasks are not awaited.
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!(
            "Shutdown signal received, {} analysis job(s) still in flight",
            state.pipeline.jobs().in_flight_count()
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Server stopped.");
    Ok(())
}

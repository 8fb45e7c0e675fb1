//! API server entry point.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clipcut_api::{create_router, AppState};
use clipcut_llm::{LlmClient, MisconfiguredTransport};
use clipcut_pipeline::{AppConfig, FfmpegProcessor, PipelineRunner, PromptLibrary};
use clipcut_storage::ArtifactStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(AppConfig::load());
    info!(
        projects_root = %config.projects_root.display(),
        provider = ?config.provider,
        model = %config.model_name,
        "starting clipcut api"
    );

    let store = ArtifactStore::new(&config.projects_root);
    std::fs::create_dir_all(&config.projects_root)
        .with_context(|| format!("creating {}", config.projects_root.display()))?;

    let prompts = Arc::new(PromptLibrary::new(&config.prompt_dir));
    if let Err(e) = prompts.ensure_defaults() {
        warn!(error = %e, "could not write default prompt files");
    }

    // A misconfigured provider still boots; model calls fail per stage with
    // the recorded reason instead
    let llm = match LlmClient::for_provider(
        config.provider,
        &config.api_key,
        &config.model_name,
        config.openai_base_url.clone(),
        config.llm_timeout_seconds,
        config.llm_max_retries,
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "LLM provider not configured, runs will fail at the first model call");
            Arc::new(LlmClient::new(
                Box::new(MisconfiguredTransport::new(e.to_string())),
                config.llm_max_retries,
            ))
        }
    };

    let runner = PipelineRunner::new(
        store,
        llm,
        prompts,
        Arc::new(FfmpegProcessor),
        config.clone(),
    );

    let app = create_router(AppState::new(runner));

    let addr = std::env::var("CLIPCUT_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

//! ClawRouter proxy daemon entry point.
//!
//! Grounded in `at-daemon::main`'s startup shape (load config, init logging,
//! bind listener, wire ctrl-c to graceful shutdown), trimmed of
//! `at-daemon`'s desktop-frontend/lockfile/Datadog concerns that have no
//! counterpart here.

use std::sync::Arc;

use anyhow::{Context, Result};
use cr_api_types::Tier;
use cr_classifier::llm::{AnthropicProvider, LlmProvider, OpenAiProvider};
use cr_classifier::{ClassificationCache, LlmClassifier, ScoringConfig};
use cr_core::{default_catalog, Config, CredentialResolver, EnvCredentialResolver, ModelCatalog};
use cr_proxy::{build_router, ApiState, ReqwestUpstreamClient};
use cr_router::Router;
use cr_telemetry::{MetricsCollector, TelemetryHooks, TracingHooks};
use tracing::info;

#[tokio::main]
async fn main() {
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        Config::default()
    });

    if config.logging.json {
        cr_telemetry::init_logging_json("cr-proxyd", &config.logging.level);
    } else {
        cr_telemetry::init_logging("cr-proxyd", &config.logging.level);
    }

    match run(config).await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            if let Some(code) = err.downcast_ref::<StartupError>() {
                tracing::error!(error = %err, "startup failed");
                std::process::exit(code.exit_code());
            }
            tracing::error!(error = %err, "cr-proxyd exited with an error");
            std::process::exit(1);
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("failed to bind listener: {0}")]
    Bind(String),
    #[error("no upstream credential available for any configured provider")]
    NoCredentials,
}

impl StartupError {
    fn exit_code(&self) -> i32 {
        match self {
            StartupError::Bind(_) => 1,
            StartupError::NoCredentials => 2,
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let credentials: Arc<dyn CredentialResolver> = Arc::new(EnvCredentialResolver::new());
    let catalog = Arc::new(build_catalog(&config));
    require_at_least_one_credential(&credentials, &catalog)?;

    let scoring_config = Arc::new(match &config.routing_config {
        Some(patch) => ScoringConfig::merge_override(ScoringConfig::default(), patch)
            .context("invalid routingConfig override")?,
        None => ScoringConfig::default(),
    });
    let cache = Arc::new(ClassificationCache::new());
    let classifier_model = catalog
        .primary(Tier::Simple)
        .expect("catalog must define a SIMPLE-tier primary model")
        .id
        .clone();
    let llm_classifier = Arc::new(LlmClassifier::new(
        classifier_provider(&credentials),
        cache.clone(),
        &classifier_model,
    ));
    let router = Arc::new(Router::new(scoring_config, catalog.clone(), llm_classifier));

    let hooks: Arc<dyn TelemetryHooks> = Arc::new(TracingHooks);
    let state = Arc::new(ApiState {
        catalog,
        router,
        cache,
        credentials,
        hooks: hooks.clone(),
        metrics: Arc::new(MetricsCollector::new()),
        upstream: Arc::new(ReqwestUpstreamClient::new()),
        stats: Arc::new(cr_proxy::state::Stats::new()),
        wallet_key: config.server.wallet_key.clone().unwrap_or_default(),
        started_at: std::time::Instant::now(),
    });

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| StartupError::Bind(format!("{bind_addr}: {e}")))?;
    let bound_port = listener.local_addr().map(|a| a.port()).unwrap_or(config.server.port);

    hooks.on_ready(bound_port);
    info!(port = bound_port, "clawrouter proxy listening");

    let app = build_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server loop failed")?;

    info!("clawrouter proxy shut down cleanly");
    Ok(())
}

fn build_catalog(config: &Config) -> ModelCatalog {
    match &config.model_overrides {
        Some(overrides) => default_catalog().with_overrides(overrides),
        None => default_catalog(),
    }
}

/// Picks whichever provider (Anthropic, then OpenAI) has a credential
/// available for the LLM Classifier's fallback completion calls — "use the
/// best available" reduced to a two-provider choice (see DESIGN.md).
fn classifier_provider(credentials: &Arc<dyn CredentialResolver>) -> Arc<dyn LlmProvider> {
    if let Some(key) = credentials.resolve("anthropic") {
        return Arc::new(AnthropicProvider::new(key));
    }
    if let Some(key) = credentials.resolve("openai") {
        return Arc::new(OpenAiProvider::new(key));
    }
    Arc::new(cr_classifier::llm::MockProvider::new())
}

fn require_at_least_one_credential(credentials: &Arc<dyn CredentialResolver>, catalog: &ModelCatalog) -> Result<()> {
    let has_any = catalog
        .all()
        .map(|entry| entry.provider.as_str())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .any(|provider| credentials.resolve(provider).is_some());

    if has_any {
        Ok(())
    } else {
        Err(StartupError::NoCredentials.into())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("ctrl-c received, shutting down");
}

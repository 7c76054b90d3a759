mod config;
mod convert;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::convert::CliConverter;
use crate::extraction::{KeyMapping, RemapScope, ResumeExtractor, ResumeTemplate};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cvjson API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    // Initialize document converter
    let converter = CliConverter::from_config(&config);
    info!(
        "Converter initialized (pandoc: {}, soffice: {}, timeout: {}s)",
        config.pandoc_bin,
        config.soffice_bin,
        config.convert_timeout.as_secs()
    );

    // Load the résumé template and key mapping (built-in unless overridden)
    let template = ResumeTemplate::load(config.template_path.as_deref())?;
    let mapping = KeyMapping::load(config.key_mapping_path.as_deref())?;
    info!(
        "Loaded template with {} top-level fields, key mapping with {} entries",
        template.schema().as_object().map_or(0, |o| o.len()),
        mapping.len()
    );
    if mapping.is_empty() {
        warn!("Key mapping is empty; field names will be returned unchanged");
    }

    let scope = if config.remap_string_values {
        RemapScope::KeysAndStrings
    } else {
        RemapScope::Keys
    };

    let extractor = ResumeExtractor::new(
        Arc::new(converter),
        Arc::new(llm),
        &template,
        mapping,
        scope,
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        extractor: Arc::new(extractor),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

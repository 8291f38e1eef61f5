//! DataDome protected demo server.
//!
//! Mounts the edge relay on `/` and the route wrapper on `/api/hello`.

use anyhow::{bail, Context, Result};
use axum::response::Html;
use axum::routing::get;
use axum::{middleware, Json, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zentinel_agent_datadome::relay::{edge_middleware, handler_middleware};
use zentinel_agent_datadome::{BotGuard, DataDomeConfig, VerdictClient};

#[derive(Parser, Debug)]
#[command(name = "zentinel-agent-datadome")]
#[command(author, version, about = "DataDome bot protection relay for Zentinel")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Path to configuration file (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// DataDome server-side key (overrides the configuration file)
    #[arg(long, env = "DATADOME_SERVER_KEY", hide_env_values = true)]
    server_key: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(json: bool, level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
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

fn load_config(args: &Args) -> Result<DataDomeConfig> {
    let mut config = if let Some(config_path) = &args.config {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        if config_path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        }
    } else {
        DataDomeConfig::default()
    };

    if let Some(key) = &args.server_key {
        config.server_key = key.clone();
    }
    if config.server_key.is_empty() {
        bail!("DataDome server key missing: set DATADOME_SERVER_KEY or server_key in the config file");
    }

    Ok(config)
}

async fn index() -> Html<&'static str> {
    Html("<!DOCTYPE html><html><head><title>Bot Protection with DataDome</title></head><body><h1>Bot Protection with DataDome</h1><p>This page is protected by the edge relay.</p></body></html>")
}

async fn hello() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "name": "John Doe" }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.json_logs, &args.log_level);

    let config = load_config(&args)?;
    let guard = BotGuard::new(VerdictClient::new(config)?);

    let app = Router::new()
        .route("/", get(index))
        .route_layer(middleware::from_fn_with_state(guard.clone(), edge_middleware))
        .route(
            "/api/hello",
            get(hello).route_layer(middleware::from_fn_with_state(guard, handler_middleware)),
        );

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(address = %args.listen, "DataDome relay listening");

    axum::serve(listener, app).await?;

    Ok(())
}

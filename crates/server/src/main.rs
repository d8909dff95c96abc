//! Lead engagement server entry point
//!
//! Exit codes: 0 clean shutdown, 1 configuration error, 2 external
//! collaborator unreachable at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use leadflow_config::{load_settings, Settings};
use leadflow_crm::{HttpCmaGenerator, HttpCrmClient};
use leadflow_llm::HttpResponseDrafter;
use leadflow_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LEADFLOW_CONFIG").ok())
        .map(PathBuf::from);

    let settings = match load_settings(config_path.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    init_tracing(&settings);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting leadflow server");

    init_metrics();

    let crm = Arc::new(HttpCrmClient::new(settings.crm.clone(), &settings.deadlines));
    let drafter = Arc::new(HttpResponseDrafter::new(
        settings.llm.clone(),
        &settings.deadlines,
    ));
    let cma = Arc::new(HttpCmaGenerator::new(&settings.crm, &settings.deadlines));

    if let Err(e) = crm.healthcheck().await {
        tracing::error!(error = %e, "CRM collaborator unreachable at startup");
        return ExitCode::from(2);
    }
    if let Err(e) = drafter.healthcheck().await {
        tracing::error!(error = %e, "LLM collaborator unreachable at startup");
        return ExitCode::from(2);
    }

    let server = settings.server.clone();
    let state = match AppState::build(settings, crm, drafter, cma).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to build application state");
            return ExitCode::from(1);
        }
    };
    let background = state.spawn_background_tasks();

    let router = create_router(state, &server.cors_origins, server.cors_enabled);
    let addr: SocketAddr = match format!("{}:{}", server.host, server.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "invalid listen address");
            return ExitCode::from(1);
        }
    };

    tracing::info!(%addr, "listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind");
            return ExitCode::from(1);
        }
    };

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    for task in background {
        task.abort();
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server error");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.observability.log_filter.clone()));

    if settings.observability.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

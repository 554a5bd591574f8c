/*
 * Responsibility
 * - Config読み込み → 依存生成 (PgPool / UserStore / SessionService) → Router 組み立て
 * - Middleware の適用 (security headers / CORS / HTTP 共通)
 * - axum::serve() で起動し、SIGINT / SIGTERM で graceful shutdown
 */
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    api::v1::handlers::health::health,
    config::Config,
    error::AppError,
    middleware,
    repos::user_repo::PgUserStore,
    services::auth::{SessionService, TokenCodec},
    state::AppState,
};

pub async fn run() -> Result<()> {
    init_tracing();
    install_panic_hook();

    let config = Config::from_env()?;
    info!(?config, "configuration loaded");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.store_timeout)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let users = PgUserStore::new(pool, config.store_timeout);
    users
        .init_schema()
        .await
        .context("failed to initialize user schema")?;

    let sessions = SessionService::new(
        Arc::new(users),
        TokenCodec::new(config.jwt_secret.as_bytes()),
        config.server_ip.clone(),
        config.default_roles.clone(),
        config.rotate_refresh_tokens,
    );
    let state = AppState::new(Arc::new(sessions), !config.app_env.is_dev());

    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!(addr = %config.addr, env = ?config.app_env, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(&state))
        .fallback(|| async { AppError::NotFound("route") })
        .with_state(state);

    let app = middleware::security_headers::apply(app);
    let app = middleware::cors::apply(app, config);
    middleware::http::apply(app)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    // A second init (tests) is not an error worth failing on.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

// Panics outside a request (spawned tasks, bootstrap) still reach the log.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "panic");
        default_hook(info);
    }));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("received Ctrl+C, shutting down"),
        _ = terminate => warn!("received SIGTERM, shutting down"),
    }
}


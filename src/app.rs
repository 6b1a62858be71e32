/*
 * Responsibility
 * - Config 読み込み → 依存生成 (AccessGate, UserRepository) → Router 組み立て
 * - Middleware の適用 (access gate は全ルート + fallback に掛ける)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::repos::{MemoryUserRepository, PgUserRepository, UserRepository};
use crate::services::auth::build_access_gate;
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG 優先。未設定なら info
    // ex: RUST_LOG=info,user_resource_server=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: crash the whole process; production: default hook, keep serving
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting resource server in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub async fn build_state(config: &Config) -> Result<AppState> {
    let gate = build_access_gate(config).context("failed to load access token keys")?;
    tracing::info!(
        issuer = %config.auth_issuer,
        audience = ?config.auth_audience,
        algorithm = ?config.access_jwt_algorithm,
        "access gate ready"
    );

    let users = build_user_repository(config).await?;

    Ok(AppState::new(gate, users))
}

async fn build_user_repository(config: &Config) -> Result<Arc<dyn UserRepository>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set; users are kept in memory");
        return Ok(Arc::new(MemoryUserRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    if config.database_migrate {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
    }

    Ok(Arc::new(PgUserRepository::new(pool)))
}

/// Every route, and the fallback, sits behind the access gate.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes())
        .fallback(|| async { AppError::not_found("route") });

    let router = middleware::auth::access::apply(router, state.clone()).with_state(state);

    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}

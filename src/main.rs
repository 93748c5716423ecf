use std::sync::Arc;

use anyhow::Context;

mod app;
mod auth;
mod cache;
mod clock;
mod config;
mod contacts;
mod error;
mod mailer;
mod rate_limit;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "contactbook=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let db = state::connect_db(&config).await?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    let addr = config.bind_addr;
    let state = AppState::init(config, db).await?;
    app::serve(app::build_app(state), addr).await
}

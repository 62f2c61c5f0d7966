mod app;
mod config;
mod db;
mod error;
mod response;
mod state;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "user_service=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;
    db::migrate(&app_state.db).await?;

    if app_state.config.seed_sample_users {
        let added = db::seed_sample_users(&app_state.db).await?;
        tracing::info!(added, "sample users seeded");
    }

    let addr = app_state.config.bind_addr()?;
    let pool = app_state.db.clone();
    let app = app::build_app(app_state);
    app::serve(app, addr).await?;

    pool.close().await;
    tracing::info!("database connection closed");
    Ok(())
}

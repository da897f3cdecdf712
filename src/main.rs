mod cart;
mod config;
mod db;
mod panel;
mod revision;
mod routes;
mod services;
mod state;

use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to read .env");
        }
    }

    let config = config::AppConfig::from_env()?;
    let pool = db::init_pool(&config).await?;
    let port = config.port;
    let state = state::AppState::new(pool, config);
    let _sweeper = services::sweeper::spawn_cart_sweeper(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "panelcraft listening");
    axum::serve(listener, app).await?;
    Ok(())
}

use planetchat::config::ServerConfig;
use planetchat::routes;
use planetchat::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to read .env");
        }
    }

    let config = ServerConfig::from_env()?;
    let state = AppState::from_config(&config);

    // Create the store up front so a bad DATA_DIR fails at startup.
    state.messages.ensure().await?;
    tracing::info!(
        data = %state.messages.path().display(),
        uploads = %state.uploads.dir().display(),
        "storage ready"
    );

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "planetchat listening");
    axum::serve(listener, app).await?;
    Ok(())
}

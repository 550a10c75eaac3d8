use std::sync::Arc;

use emotion_survey::{app, config, shutdown_signal, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emotion_survey=info,tower_http=info".into()),
        )
        .init();

    let config = Arc::new(config::Config::from_env()?);

    let store = state::open_store(&config.backend)?;
    let location = store.location();
    tracing::info!(
        "Results go to {} backend, bucket {:?}, key {:?}, read failure policy {}",
        location.backend,
        location.bucket,
        config.results_key,
        config.read_failure
    );

    let state = Arc::new(state::AppState::new(config.clone(), store));

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Survey results service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

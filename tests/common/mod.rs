#![allow(dead_code)]

use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use emotion_survey::append::ReadFailurePolicy;
use emotion_survey::config::{Config, StoreBackend};
use emotion_survey::state::AppState;
use emotion_survey::storage::ObjectStore;

pub const KEY: &str = "results/results.csv";

pub fn test_config(backend: StoreBackend) -> Arc<Config> {
    Arc::new(Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        backend,
        results_key: KEY.to_string(),
        read_failure: ReadFailurePolicy::Abort,
        download_ttl: Duration::from_secs(120),
        static_dir: PathBuf::from("static"),
    })
}

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

pub async fn spawn_app(backend: StoreBackend, store: Arc<dyn ObjectStore>) -> String {
    let state = Arc::new(AppState::new(test_config(backend), store));
    serve(emotion_survey::app(state)).await
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client")
}

pub fn submission(name: &str, clips: &[(&str, &str)]) -> serde_json::Value {
    let ratings: Vec<_> = clips
        .iter()
        .enumerate()
        .map(|(i, (url, rating))| {
            serde_json::json!({
                "video": format!("video{}", i + 1),
                "url": url,
                "rating": rating,
                "time": format!("2026-10-19T08:3{i}:00.000Z"),
            })
        })
        .collect();

    serde_json::json!({
        "user": { "name": name, "culture": "Japanese" },
        "ratings": ratings,
    })
}

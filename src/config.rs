use std::path::PathBuf;
use std::time::Duration;

use crate::append::ReadFailurePolicy;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    S3 {
        bucket: String,
        region: String,
        endpoint: String,
        path_style: bool,
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    Local {
        root: PathBuf,
    },
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub results_key: String,
    pub read_failure: ReadFailurePolicy,
    pub download_ttl: Duration,
    pub static_dir: PathBuf,
}

type ConfigError = Box<dyn std::error::Error + Send + Sync>;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT")
            .unwrap_or_else(|| "5001".to_string())
            .parse()
            .map_err(|e| format!("PORT is not a valid port: {e}"))?;

        let bucket = var("RESULTS_BUCKET");
        let backend_name = var("STORE_BACKEND").unwrap_or_else(|| {
            let name = if bucket.is_some() { "s3" } else { "local" };
            name.to_string()
        });

        let backend = match backend_name.to_ascii_lowercase().as_str() {
            "s3" => {
                let bucket = bucket.ok_or("RESULTS_BUCKET must be set for the s3 backend")?;
                let region = var("S3_REGION").unwrap_or_else(|| "us-east-1".to_string());
                let custom_endpoint = var("S3_ENDPOINT");
                let path_style = match var("S3_FORCE_PATH_STYLE") {
                    Some(v) => parse_bool("S3_FORCE_PATH_STYLE", &v)?,
                    None => custom_endpoint.is_some(),
                };
                let endpoint = custom_endpoint
                    .unwrap_or_else(|| format!("https://s3.{region}.amazonaws.com"));

                StoreBackend::S3 {
                    bucket,
                    region,
                    endpoint,
                    path_style,
                    access_key_id: var("AWS_ACCESS_KEY_ID")
                        .ok_or("AWS_ACCESS_KEY_ID must be set for the s3 backend")?,
                    secret_access_key: var("AWS_SECRET_ACCESS_KEY")
                        .ok_or("AWS_SECRET_ACCESS_KEY must be set for the s3 backend")?,
                    session_token: var("AWS_SESSION_TOKEN"),
                }
            }
            "local" => {
                let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                StoreBackend::Local {
                    root: base_dir.join(var("RESULTS_FOLDER").unwrap_or_else(|| ".".to_string())),
                }
            }
            "memory" => StoreBackend::Memory,
            other => return Err(format!("unknown STORE_BACKEND {other:?}").into()),
        };

        let results_key = var("RESULTS_KEY").unwrap_or_else(|| "results/results.csv".to_string());

        let read_failure = match var("READ_FAILURE_POLICY") {
            Some(v) => v.parse()?,
            None => ReadFailurePolicy::default(),
        };

        let download_ttl_secs: u64 = var("DOWNLOAD_URL_TTL_SECS")
            .unwrap_or_else(|| "300".to_string())
            .parse()
            .map_err(|e| format!("DOWNLOAD_URL_TTL_SECS is not a number: {e}"))?;

        let static_dir = PathBuf::from(var("STATIC_DIR").unwrap_or_else(|| "static".to_string()));

        Ok(Self {
            host,
            port,
            backend,
            results_key,
            read_failure,
            download_ttl: Duration::from_secs(download_ttl_secs),
            static_dir,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(format!("{key} must be true or false, got {value:?}").into()),
    }
}

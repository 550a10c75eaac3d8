use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, Url};
use std::time::Duration;

use super::sigv4::{uri_encode, Signer};
use super::{ObjectStore, StoreError, StoreLocation};

#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// S3 (or S3-compatible) bucket reached over its REST API.
pub struct S3Store {
    client: Client,
    endpoint: Url,
    bucket: String,
    region: String,
    path_style: bool,
    credentials: Option<S3Credentials>,
}

impl S3Store {
    pub fn new(
        endpoint: &str,
        bucket: String,
        region: String,
        path_style: bool,
        credentials: Option<S3Credentials>,
    ) -> Result<Self, StoreError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StoreError::Network(format!("invalid endpoint {endpoint}: {e}")))?;
        if endpoint.host_str().is_none() {
            return Err(StoreError::Network(format!("endpoint has no host: {endpoint}")));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            bucket,
            region,
            path_style,
            credentials,
        })
    }

    /// Host header value and unencoded request path for `key`.
    fn address(&self, key: &str) -> (String, String) {
        let mut host = self.endpoint.host_str().unwrap_or_default().to_string();
        if let Some(port) = self.endpoint.port() {
            host = format!("{host}:{port}");
        }
        let key = key.trim_start_matches('/');

        if self.path_style {
            (host, format!("/{}/{}", self.bucket, key))
        } else {
            (format!("{}.{}", self.bucket, host), format!("/{key}"))
        }
    }

    fn url(&self, host: &str, path: &str) -> String {
        format!(
            "{}://{}{}",
            self.endpoint.scheme(),
            host,
            uri_encode(path, false)
        )
    }

    fn signer<'a>(&'a self, credentials: &'a S3Credentials) -> Signer<'a> {
        Signer {
            access_key_id: &credentials.access_key_id,
            secret_access_key: &credentials.secret_access_key,
            session_token: credentials.session_token.as_deref(),
            region: &self.region,
        }
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response, StoreError> {
        let (host, path) = self.address(key);
        let mut request = self.client.request(method.clone(), self.url(&host, &path));

        if let Some(credentials) = &self.credentials {
            let payload = body.as_deref().unwrap_or_default();
            let headers =
                self.signer(credentials)
                    .sign_request(method.as_str(), &host, &path, payload, Utc::now());
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "text/csv; charset=utf-8")
                .body(body);
        }

        request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))
    }
}

async fn status_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StoreError::Status { status, body }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let response = self.send(Method::HEAD, key, None).await?;
        match response.status().as_u16() {
            200..=299 => Ok(true),
            404 => Ok(false),
            _ => Err(status_error(response).await),
        }
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self.send(Method::GET, key, None).await?;
        let status = response.status();
        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| StoreError::Network(e.to_string()))?;
            return Ok(bytes.to_vec());
        }
        if status.as_u16() == 404 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Err(status_error(response).await)
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let response = self.send(Method::PUT, key, Some(bytes)).await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(status_error(response).await)
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<Option<String>, StoreError> {
        let (host, path) = self.address(key);
        let url = self.url(&host, &path);

        let Some(credentials) = &self.credentials else {
            return Ok(Some(url));
        };
        let query = self
            .signer(credentials)
            .presign("GET", &host, &path, ttl.as_secs().max(1), Utc::now());
        Ok(Some(format!("{url}?{query}")))
    }

    fn location(&self) -> StoreLocation {
        StoreLocation {
            backend: "s3",
            bucket: self.bucket.clone(),
            region: self.region.clone(),
        }
    }
}

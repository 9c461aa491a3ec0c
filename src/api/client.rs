use super::{PipelineApi, Query};
use crate::core::errors::ApiError;
use crate::core::settings::ServerSettings;
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = concat!("pipeline-poller/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the pipeline backend, authenticated with a bearer token.
#[derive(Clone)]
pub struct PipelineClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl PipelineClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| ApiError::Transport {
                path: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_settings(settings: &ServerSettings) -> Result<Self, ApiError> {
        Self::new(&settings.base_url, settings.resolved_token())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            message: e.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let builder = self.http.request(method, self.url(path)?);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn execute(&self, path: &str, builder: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = builder.send().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            tracing::debug!(path, status = status.as_u16(), "Pipeline API error response");
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        decode_body(path, &body)
    }
}

/// Mutation endpoints often answer with an empty body.
fn decode_body(path: &str, body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

#[async_trait]
impl PipelineApi for PipelineClient {
    async fn get(&self, path: &str, query: &Query) -> Result<Value, ApiError> {
        tracing::trace!(path, "GET");
        let builder = self.request(Method::GET, path)?.query(query);
        self.execute(path, builder).await
    }

    async fn send(&self, method: Method, path: &str, body: Value) -> Result<Value, ApiError> {
        tracing::trace!(path, %method, "Sending mutation");
        let builder = self.request(method, path)?.json(&body);
        self.execute(path, builder).await
    }
}

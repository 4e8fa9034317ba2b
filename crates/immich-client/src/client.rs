use async_trait::async_trait;
use immich_common::{
    Config,
    config::IMMICH_HOST,
    error::{ExporterError, Result},
};
use reqwest::{StatusCode, header};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::types::{PING_ENDPOINT, SERVER_ENDPOINT};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Read access to the Immich REST API.
#[async_trait]
pub trait ImmichApi: Send + Sync {
    /// Unauthenticated liveness probe. Succeeds on any 2xx reply.
    async fn ping(&self) -> Result<()>;

    /// Authenticated probe used at startup. Succeeds on 2xx and on 404,
    /// which Immich answers for the unrouted server root.
    async fn verify_credential(&self) -> Result<()>;

    /// Authenticated `GET` returning the parsed JSON body.
    async fn get(&self, endpoint: &str) -> Result<Value>;
}

#[derive(Clone)]
pub struct ImmichClient {
    base_url: Url,
    api_key: String,
    client: reqwest::Client,
}

impl ImmichClient {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.base_url()).map_err(|err| ExporterError::InvalidConfig {
            key: IMMICH_HOST,
            reason: format!("cannot build immich url from {}: {err}", config.base_url()),
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                ExporterError::InternalError(format!("failed to build http client: {err}"))
            })?;

        Ok(Self {
            base_url,
            api_key: config.api_token.clone(),
            client,
        })
    }

    fn url(&self, endpoint: &str) -> Result<Url> {
        self.base_url.join(endpoint).map_err(|err| {
            ExporterError::InternalError(format!("invalid immich endpoint {endpoint}: {err}"))
        })
    }

    async fn send(&self, endpoint: &str, authenticated: bool) -> Result<(Url, reqwest::Response)> {
        let url = self.url(endpoint)?;
        let mut request = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json");
        if authenticated {
            request = request.header(API_KEY_HEADER, &self.api_key);
        }

        debug!(url = %url, "requesting immich endpoint");
        let response = request
            .send()
            .await
            .map_err(|err| ExporterError::UpstreamUnreachable {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        Ok((url, response))
    }
}

#[async_trait]
impl ImmichApi for ImmichClient {
    async fn ping(&self) -> Result<()> {
        let (url, response) = self.send(PING_ENDPOINT, false).await?;
        if !response.status().is_success() {
            return Err(ExporterError::UpstreamStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }

    async fn verify_credential(&self) -> Result<()> {
        let (url, response) = self.send(SERVER_ENDPOINT, true).await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(ExporterError::UpstreamStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }

    async fn get(&self, endpoint: &str) -> Result<Value> {
        let (url, response) = self.send(endpoint, true).await?;
        if !response.status().is_success() {
            return Err(ExporterError::UpstreamStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| ExporterError::UpstreamBadResponse {
                url: url.to_string(),
                reason: err.to_string(),
            })
    }
}

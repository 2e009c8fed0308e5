//! HTTP adapter for the remote user registry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{UserId, UserRecord},
    error::ErrorBody,
    protocol::{Credentials, LoginResponse, RecordUpdate, Registration, RegistrationResponse},
};
use tracing::{debug, warn};
use url::Url;

use crate::error::RegistryClientError;

pub type RegistryResult<T> = std::result::Result<T, RegistryClientError>;

/// The registry operations the client depends on. No retries happen at this
/// layer; every call resolves exactly once.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn list(&self) -> RegistryResult<Vec<UserRecord>>;
    async fn get(&self, id: UserId) -> RegistryResult<UserRecord>;
    async fn create(&self, payload: &Registration) -> RegistryResult<RegistrationResponse>;
    async fn update(&self, id: UserId, payload: &RecordUpdate) -> RegistryResult<()>;
    async fn delete(&self, id: UserId) -> RegistryResult<()>;
    async fn login(&self, credentials: &Credentials) -> RegistryResult<LoginResponse>;
}

pub struct HttpRegistryClient {
    http: Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        Url::parse(trimmed).with_context(|| format!("invalid registry url '{base_url}'"))?;
        Ok(Self {
            http,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self, id: UserId) -> String {
        format!("{}/usuarios/{}", self.base_url, id.0)
    }
}

#[async_trait]
impl RegistryApi for HttpRegistryClient {
    async fn list(&self) -> RegistryResult<Vec<UserRecord>> {
        debug!("listing registry records");
        let response = self
            .http
            .get(format!("{}/usuarios", self.base_url))
            .send()
            .await?;
        read_json(response).await
    }

    async fn get(&self, id: UserId) -> RegistryResult<UserRecord> {
        debug!(user_id = id.0, "fetching registry record");
        let response = self.http.get(self.record_url(id)).send().await?;
        read_json(response).await
    }

    async fn create(&self, payload: &Registration) -> RegistryResult<RegistrationResponse> {
        debug!("registering new user");
        let response = self
            .http
            .post(format!("{}/crear_usuario", self.base_url))
            .json(payload)
            .send()
            .await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RegistrationResponse::default());
        }
        // The user exists once the registry says so, whatever the body holds.
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            warn!("ignoring unreadable registration response body: {err}");
            RegistrationResponse::default()
        }))
    }

    async fn update(&self, id: UserId, payload: &RecordUpdate) -> RegistryResult<()> {
        debug!(user_id = id.0, "updating registry record");
        let response = self
            .http
            .put(self.record_url(id))
            .json(payload)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, id: UserId) -> RegistryResult<()> {
        debug!(user_id = id.0, "deleting registry record");
        let response = self.http.delete(self.record_url(id)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> RegistryResult<LoginResponse> {
        debug!("submitting login");
        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(credentials)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn ensure_success(response: Response) -> RegistryResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let bytes = response.bytes().await.unwrap_or_default();
    let body = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_default();
    warn!(
        status = status.as_u16(),
        code = body.code.as_deref().unwrap_or("none"),
        "registry request failed"
    );
    Err(RegistryClientError::registry(status.as_u16(), body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> RegistryResult<T> {
    let bytes = ensure_success(response).await?.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|err| RegistryClientError::MalformedResponse(err.to_string()))
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;

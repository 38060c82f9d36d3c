//! HTTP key-value blob storage for the persisted index document.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use url::Url;

use crate::application::stores::{BlobStore, StoreError};
use crate::config::BlobSettings;

use super::error::InfraError;

pub struct HttpBlobStore {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(settings: &BlobSettings) -> Result<Self, InfraError> {
        let mut raw = settings.endpoint.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let endpoint = Url::parse(&raw).map_err(|err| {
            InfraError::configuration(format!(
                "invalid blob endpoint `{}`: {err}",
                settings.endpoint
            ))
        })?;

        let client = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            token: settings.token.clone(),
        })
    }

    fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        self.endpoint
            .join(key)
            .map_err(|err| StoreError::protocol(format!("invalid object key `{key}`: {err}")))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let mut request = self.client.get(self.object_url(key)?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => {
                Ok(Some(response.bytes().await.map_err(transport_error)?))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_server_error() => Err(StoreError::unavailable(format!(
                "blob storage returned {status} for `{key}`"
            ))),
            status => Err(StoreError::protocol(format!(
                "blob storage returned {status} for `{key}`"
            ))),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put(self.object_url(key)?)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.is_server_error() {
            return Err(StoreError::unavailable(format!(
                "blob storage returned {status} for `{key}`"
            )));
        }
        Err(StoreError::protocol(format!(
            "blob storage returned {status} for `{key}`"
        )))
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}

pub(crate) fn user_agent() -> &'static str {
    concat!("quaderno/", env!("CARGO_PKG_VERSION"))
}

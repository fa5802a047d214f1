//! HTTP client for the Lumen mirror service.

use super::{ProfileMirror, RemoteError, RemoteMirror};
use async_trait::async_trait;
use lumen_engine::{DocumentBody, RemoteDoc, RemoteRef, UserProfile};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

/// Header carrying the shared mirror key.
pub const MIRROR_KEY_HEADER: &str = "x-mirror-key";

/// Response to document creation and lookup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefResponse {
    remote_ref: RemoteRef,
}

/// Error body returned by the mirror.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// [`RemoteMirror`] over the mirror's REST API. The user id travels as the
/// bearer token.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    client: Client,
    base: Url,
    mirror_key: Option<String>,
}

impl HttpMirror {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid mirror url {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::Transport(format!(
                "invalid mirror url {base_url:?}: not a base url"
            )));
        }
        Ok(Self {
            client,
            base,
            mirror_key: None,
        })
    }

    pub fn with_mirror_key(mut self, key: impl Into<String>) -> Self {
        self.mirror_key = Some(key.into());
        self
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder, user_id: &str) -> RequestBuilder {
        let request = request.bearer_auth(user_id);
        match &self.mirror_key {
            Some(key) => request.header(MIRROR_KEY_HEADER, key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => match body.details {
                Some(details) if !details.is_empty() => format!("{}: {}", body.error, details),
                _ => body.error,
            },
            Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
        };
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

#[async_trait]
impl RemoteMirror for HttpMirror {
    async fn query_by_user(&self, user_id: &str) -> Result<Vec<RemoteDoc>, RemoteError> {
        let request = self.authorized(self.client.get(self.url(&["transactions"])), user_id);
        let docs: Vec<RemoteDoc> = self.send(request).await?.json().await.map_err(transport_error)?;
        debug!(user_id = %user_id, count = docs.len(), "Fetched remote documents");
        Ok(docs)
    }

    async fn add(&self, user_id: &str, body: &DocumentBody) -> Result<RemoteRef, RemoteError> {
        let request = self
            .authorized(self.client.post(self.url(&["transactions"])), user_id)
            .json(body);
        let created: RefResponse = self.send(request).await?.json().await.map_err(transport_error)?;
        Ok(created.remote_ref)
    }

    async fn update(
        &self,
        user_id: &str,
        remote_ref: &str,
        body: &DocumentBody,
    ) -> Result<(), RemoteError> {
        let request = self
            .authorized(
                self.client.put(self.url(&["transactions", remote_ref])),
                user_id,
            )
            .json(body);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str, remote_ref: &str) -> Result<(), RemoteError> {
        let request = self.authorized(
            self.client.delete(self.url(&["transactions", remote_ref])),
            user_id,
        );
        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn find_by_unique_id(
        &self,
        user_id: &str,
        unique_id: &str,
    ) -> Result<Option<RemoteRef>, RemoteError> {
        let request = self.authorized(
            self.client
                .get(self.url(&["transactions", "by-unique-id", unique_id])),
            user_id,
        );
        match self.send(request).await {
            Ok(response) => {
                let found: RefResponse = response.json().await.map_err(transport_error)?;
                Ok(Some(found.remote_ref))
            }
            Err(RemoteError::Rejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ProfileMirror for HttpMirror {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError> {
        let request = self.authorized(self.client.get(self.url(&["profile"])), user_id);
        match self.send(request).await {
            Ok(response) => Ok(Some(response.json().await.map_err(transport_error)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn ensure_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> Result<UserProfile, RemoteError> {
        let request = self
            .authorized(self.client.post(self.url(&["profile"])), user_id)
            .json(profile);
        let stored: UserProfile = self.send(request).await?.json().await.map_err(transport_error)?;
        debug!(user_id = %user_id, "Ensured remote profile");
        Ok(stored)
    }

    async fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), RemoteError> {
        let request = self
            .authorized(self.client.put(self.url(&["profile"])), user_id)
            .json(profile);
        self.send(request).await?;
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), RemoteError> {
        let request = self.authorized(self.client.delete(self.url(&["profile"])), user_id);
        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

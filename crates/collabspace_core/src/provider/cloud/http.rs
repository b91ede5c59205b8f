//! HTTP implementation of [`CloudApi`] using reqwest.

use std::sync::RwLock;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::api::{CloudApi, CloudWorkspace};
use crate::error::{CollabError, Result};
use crate::provider::BoxFuture;
use crate::types::{User, WorkspaceMetaPatch};

/// Talks to the remote workspace service's JSON API.
pub struct HttpCloudClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct BlobCreated {
    id: String,
}

impl HttpCloudClient {
    /// Create a client for the service at `base_url` (e.g. `https://app.example.com`).
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.token.read().unwrap().as_deref() {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(CollabError::Unauthorized),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request)?.send().await?;
        Ok(response.error_for_status()?)
    }

    /// Like [`Self::send`] but maps 404 to `None`.
    async fn send_optional(&self, request: RequestBuilder) -> Result<Option<Response>> {
        let response = self.authorize(request)?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?))
    }
}

impl CloudApi for HttpCloudClient {
    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap() = token;
    }

    fn has_token(&self) -> bool {
        self.token.read().unwrap().is_some()
    }

    fn current_user(&self) -> BoxFuture<'_, Result<User>> {
        Box::pin(async move {
            let response = self.send(self.client.get(self.url("/user"))).await?;
            Ok(response.json().await?)
        })
    }

    fn list_workspaces(&self) -> BoxFuture<'_, Result<Vec<CloudWorkspace>>> {
        Box::pin(async move {
            let response = self.send(self.client.get(self.url("/workspace"))).await?;
            Ok(response.json().await?)
        })
    }

    fn create_workspace<'a>(
        &'a self,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<CloudWorkspace>> {
        Box::pin(async move {
            let request = self.client.post(self.url("/workspace")).json(meta);
            Ok(self.send(request).await?.json().await?)
        })
    }

    fn update_workspace<'a>(
        &'a self,
        id: &'a str,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let request = self
                .client
                .patch(self.url(&format!("/workspace/{}", id)))
                .json(meta);
            self.send(request).await?;
            Ok(())
        })
    }

    fn delete_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let request = self.client.delete(self.url(&format!("/workspace/{}", id)));
            self.send(request).await?;
            Ok(())
        })
    }

    fn leave_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let request = self
                .client
                .delete(self.url(&format!("/workspace/{}/permission", id)));
            self.send(request).await?;
            Ok(())
        })
    }

    fn set_public<'a>(&'a self, id: &'a str, public: bool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let request = self
                .client
                .post(self.url(&format!("/workspace/{}/publish", id)))
                .json(&serde_json::json!({ "public": public }));
            self.send(request).await?;
            Ok(())
        })
    }

    fn invite_member<'a>(&'a self, id: &'a str, email: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let request = self
                .client
                .post(self.url(&format!("/workspace/{}/permission", id)))
                .json(&serde_json::json!({ "email": email }));
            self.send(request).await?;
            Ok(())
        })
    }

    fn remove_member(&self, permission_id: i64) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let request = self
                .client
                .delete(self.url(&format!("/permission/{}", permission_id)));
            self.send(request).await?;
            Ok(())
        })
    }

    fn user_by_email<'a>(
        &'a self,
        id: &'a str,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url(&format!("/workspace/{}/user", id)))
                .query(&[("email", email)]);
            match self.send_optional(request).await? {
                Some(response) => Ok(Some(response.json().await?)),
                None => Ok(None),
            }
        })
    }

    fn fetch_doc<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            let request = self.client.get(self.url(&format!("/workspace/{}/doc", id)));
            match self.send_optional(request).await? {
                Some(response) => Ok(Some(response.bytes().await?.to_vec())),
                None => Ok(None),
            }
        })
    }

    fn push_doc<'a>(&'a self, id: &'a str, update: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let request = self
                .client
                .put(self.url(&format!("/workspace/{}/doc", id)))
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(update.to_vec());
            self.send(request).await?;
            Ok(())
        })
    }

    fn get_blob<'a>(
        &'a self,
        id: &'a str,
        blob_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url(&format!("/workspace/{}/blob/{}", id, blob_id)));
            match self.send_optional(request).await? {
                Some(response) => Ok(Some(response.bytes().await?.to_vec())),
                None => Ok(None),
            }
        })
    }

    fn put_blob<'a>(&'a self, id: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let request = self
                .client
                .put(self.url(&format!("/workspace/{}/blob", id)))
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(data.to_vec());
            let created: BlobCreated = self.send(request).await?.json().await?;
            Ok(created.id)
        })
    }
}

//! Build listing and cancellation against the `/oapi/v1` API.

use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::models::{decode_build_list, mark_cancelled, Build};
use crate::error::CancellerError;
use crate::transport::Transport;

/// Record of one cancellation, kept for tracing.
#[derive(Debug, Clone)]
pub struct Cancellation {
    /// Build name.
    pub name: String,
    /// `status` of the re-fetched document.
    pub status_before: Value,
    /// `status` as written back.
    pub status_after: Value,
    /// Body returned by the PUT.
    pub response: String,
}

/// Builds API for one namespace.
pub struct BuildClient<'a, T: Transport + ?Sized> {
    transport: &'a T,
    base_url: Url,
    namespace: String,
}

impl<'a, T: Transport + ?Sized> BuildClient<'a, T> {
    /// Create a client for `namespace` on the API at `base_url`.
    pub fn new(transport: &'a T, base_url: Url, namespace: impl Into<String>) -> Self {
        Self {
            transport,
            base_url,
            namespace: namespace.into(),
        }
    }

    /// Namespace this client operates on.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `{api}/oapi/v1/namespaces/{namespace}/builds`
    pub fn builds_url(&self) -> Result<Url, CancellerError> {
        self.resource_url(None)
    }

    /// `{api}/oapi/v1/namespaces/{namespace}/builds/{name}`
    pub fn build_url(&self, name: &str) -> Result<Url, CancellerError> {
        self.resource_url(Some(name))
    }

    fn resource_url(&self, name: Option<&str>) -> Result<Url, CancellerError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                CancellerError::Config(format!(
                    "apiURL '{}' cannot be used as a base URL",
                    self.base_url
                ))
            })?;
            segments
                .pop_if_empty()
                .extend(["oapi", "v1", "namespaces", self.namespace.as_str(), "builds"]);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// List the namespace's builds in server order.
    pub async fn list(&self) -> Result<Vec<Build>, CancellerError> {
        let (builds, _) = self.list_with_body().await?;
        Ok(builds)
    }

    /// List builds and also return the raw response body.
    pub async fn list_with_body(&self) -> Result<(Vec<Build>, String), CancellerError> {
        let url = self.builds_url()?;
        let body = self.transport.get(&url).await?;
        let builds = decode_build_list(&body, &self.namespace)?;
        debug!(namespace = %self.namespace, count = builds.len(), "Listed builds");
        Ok((builds, body))
    }

    /// Fetch the current document of one build.
    pub async fn get(&self, name: &str) -> Result<Value, CancellerError> {
        let url = self.build_url(name)?;
        let body = self.transport.get(&url).await?;
        let document: Value = serde_json::from_str(&body)?;
        if !document.is_object() {
            return Err(CancellerError::MissingField(format!(
                "build {name} is not a JSON object"
            )));
        }
        Ok(document)
    }

    /// Cancel one build.
    ///
    /// Re-fetches the build, sets `status.cancelled` and PUTs the whole
    /// document back. There is no version check between the read and the
    /// write, so a concurrent writer in between can be overwritten.
    pub async fn cancel(&self, name: &str) -> Result<Cancellation, CancellerError> {
        let mut document = self.get(name).await?;
        let status_before = document.get("status").cloned().unwrap_or(Value::Null);

        mark_cancelled(&mut document)?;
        let status_after = document.get("status").cloned().unwrap_or(Value::Null);

        let url = self.build_url(name)?;
        let response = self.transport.put(&url, &document).await?;

        info!(namespace = %self.namespace, build = %name, "Cancelled build");
        Ok(Cancellation {
            name: name.to_string(),
            status_before,
            status_after,
            response,
        })
    }
}

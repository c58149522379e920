use crate::config::Config;
use crate::error::{NextcloudError, NextcloudResult};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// Longest response body excerpt carried in a status error
const MAX_ERROR_BODY: usize = 512;

/// Authenticated HTTP transport shared by every Nextcloud API namespace
pub struct NextcloudHttp {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
    closed: AtomicBool,
}

impl NextcloudHttp {
    pub fn new(config: &Config) -> NextcloudResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("nextcloud-mcp-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        if config.host.cannot_be_a_base() {
            return Err(NextcloudError::Config(format!(
                "NEXTCLOUD_HOST cannot be used as a base URL: {}",
                config.host
            )));
        }

        Ok(Self {
            client,
            base_url: config.host.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Build a URL below the configured host from raw path segments.
    ///
    /// Every segment is percent-encoded on its own; a trailing `""` segment
    /// yields a trailing slash (needed for DAV collections).
    pub fn url(&self, segments: &[&str]) -> NextcloudResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| NextcloudError::Config(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Send a request, turning non-success statuses into errors
    pub async fn send(&self, builder: RequestBuilder) -> NextcloudResult<Response> {
        if self.is_closed() {
            return Err(NextcloudError::Closed);
        }

        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(%method, %url, "nextcloud request");

        let response = self.client.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        tracing::debug!(%method, %url, status = status.as_u16(), "nextcloud request failed");
        match status {
            StatusCode::NOT_FOUND => Err(NextcloudError::NotFound(url.to_string())),
            StatusCode::PRECONDITION_FAILED => Err(NextcloudError::Conflict {
                url: url.to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(NextcloudError::Status {
                    method: method.to_string(),
                    url: url.to_string(),
                    status: status.as_u16(),
                    body: truncate(body, MAX_ERROR_BODY),
                })
            }
        }
    }

    /// Send a request and decode a JSON response body
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> NextcloudResult<T> {
        let response = self.send(builder.header(ACCEPT, "application/json")).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| NextcloudError::InvalidResponse(format!("malformed JSON body: {e}")))
    }

    /// Call an OCS endpoint and return the `ocs.data` member of the envelope
    pub async fn ocs(&self, builder: RequestBuilder) -> NextcloudResult<Value> {
        let mut envelope: Value = self
            .send_json(builder.headers(ocs_headers()).query(&[("format", "json")]))
            .await?;
        match envelope.pointer_mut("/ocs/data") {
            Some(data) => Ok(data.take()),
            None => Err(NextcloudError::InvalidResponse(
                "OCS response without ocs.data".to_string(),
            )),
        }
    }

    /// Mark the transport closed; returns false if it already was
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn ocs_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("OCS-APIRequest", HeaderValue::from_static("true"));
    headers
}

/// Resolve a WebDAV extension method such as PROPFIND or MKCOL
pub fn dav_method(name: &'static str) -> NextcloudResult<Method> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| NextcloudError::InvalidArgument(format!("invalid HTTP method {name}: {e}")))
}

/// Read the ETag header of a response, if the server sent one
pub fn etag_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Quote an etag for If-Match unless the caller already did
pub fn quote_etag(etag: &str) -> String {
    let etag = etag.trim();
    if etag.starts_with('"') || etag.starts_with("W/") {
        etag.to_string()
    } else {
        format!("\"{etag}\"")
    }
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

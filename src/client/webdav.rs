use super::dav::{self, DavResponse};
use super::http::{self, NextcloudHttp};
use super::{WebdavApi, WriteReceipt};
use crate::error::{NextcloudError, NextcloudResult};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How file content is carried inside JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ContentEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "base64")]
    Base64,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DavEntry {
    pub name: String,
    /// Path relative to the user's files root
    pub path: String,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Content of a downloaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileContent {
    pub path: String,
    pub content: String,
    pub encoding: ContentEncoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Split a user-supplied path into segments, rejecting traversal
pub(crate) fn path_segments(path: &str) -> NextcloudResult<Vec<&str>> {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.iter().any(|s| *s == "..") {
        return Err(NextcloudError::InvalidArgument(format!(
            "path {path:?} must not contain '..'"
        )));
    }
    Ok(segments)
}

/// Decode a body as text when possible, base64 otherwise
fn encode_body(bytes: &[u8]) -> (String, ContentEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), ContentEncoding::Utf8),
        Err(_) => (BASE64.encode(bytes), ContentEncoding::Base64),
    }
}

pub struct WebdavClient {
    http: Arc<NextcloudHttp>,
}

impl WebdavClient {
    pub fn new(http: Arc<NextcloudHttp>) -> Self {
        Self { http }
    }

    fn root(&self) -> Vec<&str> {
        vec!["remote.php", "dav", "files", self.http.username()]
    }

    fn url(&self, path: &str, collection: bool) -> NextcloudResult<reqwest::Url> {
        let mut segments = self.root();
        segments.extend(path_segments(path)?);
        if collection {
            segments.push("");
        }
        self.http.url(&segments)
    }

    /// Path of an href relative to the files root of the user
    ///
    /// Segments are compared decoded, since servers percent-encode the
    /// username (and any base path) in hrefs.
    fn relative_path(&self, response: &DavResponse) -> String {
        let segments: Vec<String> = response
            .href
            .split('/')
            .filter(|s| !s.is_empty())
            .map(dav::percent_decode)
            .collect();
        let root = self.root();
        let start = segments
            .windows(root.len())
            .position(|window| window.iter().zip(&root).all(|(a, b)| a == b))
            .map_or(0, |idx| idx + root.len());
        segments[start..].join("/")
    }
}

#[async_trait]
impl WebdavApi for WebdavClient {
    async fn list_directory(&self, path: &str) -> NextcloudResult<Vec<DavEntry>> {
        let url = self.url(path, true)?;
        let body = dav::propfind_body(
            "<d:displayname/><d:resourcetype/><d:getcontentlength/><d:getcontenttype/><d:getlastmodified/><d:getetag/>",
        );
        let response = self
            .http
            .send(
                self.http
                    .request(http::dav_method("PROPFIND")?, url)
                    .header("Depth", "1")
                    .header(CONTENT_TYPE, "application/xml; charset=utf-8")
                    .body(body),
            )
            .await?;

        let requested = path_segments(path)?.join("/");
        let entries = dav::parse_multistatus(&response.text().await?)?
            .into_iter()
            .map(|r| (self.relative_path(&r), r))
            // the collection itself is listed first
            .filter(|(relative, _)| *relative != requested)
            .map(|(relative, r)| DavEntry {
                name: r.name(),
                is_directory: r.is_collection(),
                size: r.prop("getcontentlength").and_then(|v| v.parse().ok()),
                content_type: r.prop("getcontenttype").map(str::to_string),
                last_modified: r.prop("getlastmodified").map(str::to_string),
                etag: r.etag(),
                path: relative,
            })
            .collect();
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> NextcloudResult<FileContent> {
        let url = self.url(path, false)?;
        let response = self.http.send(self.http.request(Method::GET, url)).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let etag = http::etag_header(&response);
        let bytes = response.bytes().await?;
        let (content, encoding) = encode_body(&bytes);

        Ok(FileContent {
            path: path_segments(path)?.join("/"),
            content,
            encoding,
            content_type,
            size: bytes.len() as u64,
            etag,
        })
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        content_type: &str,
        encoding: ContentEncoding,
    ) -> NextcloudResult<WriteReceipt> {
        let body = match encoding {
            ContentEncoding::Utf8 => content.as_bytes().to_vec(),
            ContentEncoding::Base64 => BASE64.decode(content.trim()).map_err(|e| {
                NextcloudError::InvalidArgument(format!("content is not valid base64: {e}"))
            })?,
        };
        let url = self.url(path, false)?;
        let response = self
            .http
            .send(
                self.http
                    .request(Method::PUT, url)
                    .header(CONTENT_TYPE, content_type)
                    .body(body),
            )
            .await?;
        Ok(WriteReceipt::from_response(&response))
    }

    async fn create_directory(&self, path: &str) -> NextcloudResult<WriteReceipt> {
        let url = self.url(path, true)?;
        let response = self
            .http
            .send(self.http.request(http::dav_method("MKCOL")?, url))
            .await?;
        Ok(WriteReceipt::from_response(&response))
    }

    async fn delete_resource(&self, path: &str) -> NextcloudResult<WriteReceipt> {
        let url = self.url(path, false)?;
        let response = self.http.send(self.http.request(Method::DELETE, url)).await?;
        Ok(WriteReceipt::from_response(&response))
    }
}

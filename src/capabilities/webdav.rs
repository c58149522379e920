use crate::capabilities::{Capability, CapabilityResult};
use crate::client::RemoteClient;
use crate::client::WriteReceipt;
use crate::client::webdav::{ContentEncoding, DavEntry, FileContent};
use crate::error::invalid_params;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Parameters for nc_webdav_list_directory
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ListDirectoryRequest {
    #[serde(default)]
    #[schemars(description = "Directory below the user's files root (optional, defaults to the root)")]
    pub path: String,
}

/// A file or directory path
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path below the user's files root, e.g. \"Documents/report.md\"")]
    pub path: String,
}

/// Parameters for nc_webdav_write_file
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct WriteFileRequest {
    pub path: String,

    pub content: String,

    #[schemars(description = "MIME type of the content (optional, defaults to application/octet-stream)")]
    pub content_type: Option<String>,

    #[serde(default)]
    #[schemars(description = "\"utf-8\" for text or \"base64\" for binary content (optional, defaults to utf-8)")]
    pub encoding: ContentEncoding,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListDirectoryResponse {
    pub entries: Vec<DavEntry>,
}

/// Reject `..` segments and, where a target is required, the files root itself
fn check_path(path: &str, allow_root: bool) -> CapabilityResult<&str> {
    if path.split('/').any(|s| s == "..") {
        return Err(invalid_params(format!("path {path:?} must not contain '..'")));
    }
    if !allow_root && path.split('/').all(|s| s.is_empty() || s == ".") {
        return Err(invalid_params("path must name a file or directory"));
    }
    Ok(path)
}

/// Capability for WebDAV file access
pub struct WebdavCapability {
    client: Arc<dyn RemoteClient>,
}

impl WebdavCapability {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    pub async fn list_directory(
        &self,
        request: ListDirectoryRequest,
    ) -> CapabilityResult<ListDirectoryResponse> {
        let path = check_path(&request.path, true)?;
        let entries = self.client.webdav().list_directory(path).await?;
        Ok(ListDirectoryResponse { entries })
    }

    pub async fn read_file(&self, request: PathRequest) -> CapabilityResult<FileContent> {
        let path = check_path(&request.path, false)?;
        Ok(self.client.webdav().read_file(path).await?)
    }

    pub async fn write_file(&self, request: WriteFileRequest) -> CapabilityResult<WriteReceipt> {
        let path = check_path(&request.path, false)?;
        let content_type = request
            .content_type
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        Ok(self
            .client
            .webdav()
            .write_file(path, &request.content, content_type, request.encoding)
            .await?)
    }

    pub async fn create_directory(&self, request: PathRequest) -> CapabilityResult<WriteReceipt> {
        let path = check_path(&request.path, false)?;
        Ok(self.client.webdav().create_directory(path).await?)
    }

    pub async fn delete_resource(&self, request: PathRequest) -> CapabilityResult<WriteReceipt> {
        let path = check_path(&request.path, false)?;
        Ok(self.client.webdav().delete_resource(path).await?)
    }
}

impl Capability for WebdavCapability {
    fn id(&self) -> &'static str {
        "webdav"
    }

    fn description(&self) -> &'static str {
        "Browse, read, write and delete files and folders (WebDAV)"
    }
}

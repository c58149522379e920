pub mod calendar;
pub mod contacts;
mod content_line;
mod dav;
mod http;
pub mod notes;
pub mod tables;
pub mod webdav;

#[cfg(test)]
pub mod mock;

use crate::config::Config;
use crate::error::NextcloudResult;
use async_trait::async_trait;
use reqwest::{Method, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use self::calendar::{Calendar, CalendarClient, CalendarEvent, EventData};
use self::contacts::{AddressBook, Contact, ContactData, ContactsClient};
use self::http::NextcloudHttp;
use self::notes::{Note, NoteSearchHit, NoteUpdate, NotesClient};
use self::tables::{RowData, TablesClient};
use self::webdav::{ContentEncoding, DavEntry, FileContent, WebdavClient};

/// Outcome of a write against the server (create, update, delete)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WriteReceipt {
    /// HTTP status code returned by the server
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// New entity tag of the written resource, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl WriteReceipt {
    fn from_response(response: &Response) -> Self {
        Self {
            status_code: response.status().as_u16(),
            href: Some(response.url().path().to_string()),
            etag: http::etag_header(response),
            uid: None,
        }
    }

    fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }
}

/// CardDAV addressbooks and contacts
#[async_trait]
pub trait ContactsApi: Send + Sync {
    async fn list_addressbooks(&self) -> NextcloudResult<Vec<AddressBook>>;

    async fn list_contacts(&self, addressbook: &str) -> NextcloudResult<Vec<Contact>>;

    async fn create_addressbook(
        &self,
        name: &str,
        display_name: &str,
    ) -> NextcloudResult<WriteReceipt>;

    async fn delete_addressbook(&self, name: &str) -> NextcloudResult<WriteReceipt>;

    async fn create_contact(
        &self,
        addressbook: &str,
        uid: &str,
        contact_data: &ContactData,
    ) -> NextcloudResult<WriteReceipt>;

    async fn delete_contact(&self, addressbook: &str, uid: &str) -> NextcloudResult<WriteReceipt>;

    /// Merge `contact_data` into the stored vCard; an empty `etag` means
    /// "guard with whatever etag the server reports right now"
    async fn update_contact(
        &self,
        addressbook: &str,
        uid: &str,
        contact_data: &ContactData,
        etag: &str,
    ) -> NextcloudResult<WriteReceipt>;
}

/// Notes app REST API
#[async_trait]
pub trait NotesApi: Send + Sync {
    async fn list_notes(&self) -> NextcloudResult<Vec<Note>>;

    async fn get_note(&self, note_id: i64) -> NextcloudResult<Note>;

    async fn create_note(&self, title: &str, content: &str, category: &str)
    -> NextcloudResult<Note>;

    async fn update_note(
        &self,
        note_id: i64,
        etag: &str,
        update: &NoteUpdate,
    ) -> NextcloudResult<Note>;

    async fn append_content(&self, note_id: i64, content: &str) -> NextcloudResult<Note>;

    async fn search_notes(&self, query: &str) -> NextcloudResult<Vec<NoteSearchHit>>;

    async fn delete_note(&self, note_id: i64) -> NextcloudResult<WriteReceipt>;
}

/// Tables app API; tables, schemas and rows stay opaque JSON
#[async_trait]
pub trait TablesApi: Send + Sync {
    async fn list_tables(&self) -> NextcloudResult<Vec<Value>>;

    async fn get_schema(&self, table_id: i64) -> NextcloudResult<Value>;

    async fn read_table(
        &self,
        table_id: i64,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> NextcloudResult<Vec<Value>>;

    async fn insert_row(&self, table_id: i64, data: &RowData) -> NextcloudResult<Value>;

    async fn update_row(&self, row_id: i64, data: &RowData) -> NextcloudResult<Value>;

    async fn delete_row(&self, row_id: i64) -> NextcloudResult<Value>;
}

/// WebDAV access to the user's files
#[async_trait]
pub trait WebdavApi: Send + Sync {
    async fn list_directory(&self, path: &str) -> NextcloudResult<Vec<DavEntry>>;

    async fn read_file(&self, path: &str) -> NextcloudResult<FileContent>;

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        content_type: &str,
        encoding: ContentEncoding,
    ) -> NextcloudResult<WriteReceipt>;

    async fn create_directory(&self, path: &str) -> NextcloudResult<WriteReceipt>;

    async fn delete_resource(&self, path: &str) -> NextcloudResult<WriteReceipt>;
}

/// CalDAV calendars and events
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_calendars(&self) -> NextcloudResult<Vec<Calendar>>;

    async fn list_events(
        &self,
        calendar_name: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Option<usize>,
    ) -> NextcloudResult<Vec<CalendarEvent>>;

    async fn get_event(&self, calendar_name: &str, event_uid: &str)
    -> NextcloudResult<CalendarEvent>;

    async fn create_event(
        &self,
        calendar_name: &str,
        event_data: &EventData,
    ) -> NextcloudResult<WriteReceipt>;

    async fn update_event(
        &self,
        calendar_name: &str,
        event_uid: &str,
        event_data: &EventData,
        etag: &str,
    ) -> NextcloudResult<WriteReceipt>;

    async fn delete_event(&self, calendar_name: &str, event_uid: &str)
    -> NextcloudResult<WriteReceipt>;
}

/// The remote groupware server, as seen by the tool layer.
///
/// Implementations must be safe to share between concurrently running
/// tool calls; nothing in the tool layer serialises access.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    fn contacts(&self) -> &dyn ContactsApi;

    fn notes(&self) -> &dyn NotesApi;

    fn tables(&self) -> &dyn TablesApi;

    fn webdav(&self) -> &dyn WebdavApi;

    fn calendar(&self) -> &dyn CalendarApi;

    /// The server's capabilities document
    async fn capabilities(&self) -> NextcloudResult<Value>;

    /// Release the client; later calls fail with `NextcloudError::Closed`
    async fn close(&self);
}

/// HTTP implementation of [`RemoteClient`] against a real Nextcloud host
pub struct NextcloudClient {
    http: Arc<NextcloudHttp>,
    contacts: ContactsClient,
    notes: NotesClient,
    tables: TablesClient,
    webdav: WebdavClient,
    calendar: CalendarClient,
}

impl NextcloudClient {
    pub fn new(config: &Config) -> NextcloudResult<Self> {
        let http = Arc::new(NextcloudHttp::new(config)?);
        Ok(Self {
            contacts: ContactsClient::new(Arc::clone(&http)),
            notes: NotesClient::new(Arc::clone(&http)),
            tables: TablesClient::new(Arc::clone(&http)),
            webdav: WebdavClient::new(Arc::clone(&http)),
            calendar: CalendarClient::new(Arc::clone(&http)),
            http,
        })
    }
}

#[async_trait]
impl RemoteClient for NextcloudClient {
    fn contacts(&self) -> &dyn ContactsApi {
        &self.contacts
    }

    fn notes(&self) -> &dyn NotesApi {
        &self.notes
    }

    fn tables(&self) -> &dyn TablesApi {
        &self.tables
    }

    fn webdav(&self) -> &dyn WebdavApi {
        &self.webdav
    }

    fn calendar(&self) -> &dyn CalendarApi {
        &self.calendar
    }

    async fn capabilities(&self) -> NextcloudResult<Value> {
        let url = self.http.url(&["ocs", "v1.php", "cloud", "capabilities"])?;
        self.http.ocs(self.http.request(Method::GET, url)).await
    }

    async fn close(&self) {
        if self.http.close() {
            tracing::info!("Nextcloud client closed");
        }
    }
}

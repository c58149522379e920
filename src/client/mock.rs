//! Recording test double for [`RemoteClient`].

use super::calendar::{Calendar, CalendarEvent, EventData};
use super::contacts::{AddressBook, Contact, ContactData};
use super::notes::{Note, NoteSearchHit, NoteUpdate};
use super::tables::RowData;
use super::webdav::{ContentEncoding, DavEntry, FileContent};
use super::*;
use crate::error::NextcloudError;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One recorded call: client method name and its arguments as JSON
pub type RecordedCall = (String, Value);

enum Canned {
    Value(Value),
    Status(u16, String),
}

/// Replays canned JSON per method name and records every call
#[derive(Default)]
pub struct MockClient {
    calls: Mutex<Vec<RecordedCall>>,
    canned: Mutex<HashMap<String, Canned>>,
    capabilities: Mutex<Option<Value>>,
    capabilities_calls: AtomicUsize,
    close_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` with `value`, deserialized to the method's return type
    pub fn respond(self, method: &str, value: Value) -> Self {
        self.lock_canned().insert(method.to_string(), Canned::Value(value));
        self
    }

    /// Fail `method` with an HTTP status; 404 and 412 map like the real client
    pub fn fail(self, method: &str, status: u16, body: &str) -> Self {
        self.lock_canned()
            .insert(method.to_string(), Canned::Status(status, body.to_string()));
        self
    }

    pub fn with_capabilities(self, document: Value) -> Self {
        *self.capabilities.lock().unwrap() = Some(document);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn capabilities_calls(&self) -> usize {
        self.capabilities_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn lock_canned(&self) -> std::sync::MutexGuard<'_, HashMap<String, Canned>> {
        self.canned.lock().unwrap()
    }

    fn call<T: DeserializeOwned>(&self, method: &str, args: Value) -> NextcloudResult<T> {
        self.calls.lock().unwrap().push((method.to_string(), args));
        if self.closed.load(Ordering::SeqCst) {
            return Err(NextcloudError::Closed);
        }
        match self.lock_canned().get(method) {
            Some(Canned::Value(value)) => serde_json::from_value(value.clone())
                .map_err(|e| NextcloudError::InvalidResponse(format!("{method}: {e}"))),
            Some(Canned::Status(404, _)) => Err(NextcloudError::NotFound(method.to_string())),
            Some(Canned::Status(412, _)) => Err(NextcloudError::Conflict {
                url: method.to_string(),
            }),
            Some(Canned::Status(status, body)) => Err(NextcloudError::Status {
                method: "MOCK".to_string(),
                url: method.to_string(),
                status: *status,
                body: body.clone(),
            }),
            None => Err(NextcloudError::InvalidResponse(format!(
                "no canned response for {method}"
            ))),
        }
    }
}

#[async_trait]
impl ContactsApi for MockClient {
    async fn list_addressbooks(&self) -> NextcloudResult<Vec<AddressBook>> {
        self.call("list_addressbooks", json!({}))
    }

    async fn list_contacts(&self, addressbook: &str) -> NextcloudResult<Vec<Contact>> {
        self.call("list_contacts", json!({ "addressbook": addressbook }))
    }

    async fn create_addressbook(
        &self,
        name: &str,
        display_name: &str,
    ) -> NextcloudResult<WriteReceipt> {
        self.call(
            "create_addressbook",
            json!({ "name": name, "display_name": display_name }),
        )
    }

    async fn delete_addressbook(&self, name: &str) -> NextcloudResult<WriteReceipt> {
        self.call("delete_addressbook", json!({ "name": name }))
    }

    async fn create_contact(
        &self,
        addressbook: &str,
        uid: &str,
        contact_data: &ContactData,
    ) -> NextcloudResult<WriteReceipt> {
        self.call(
            "create_contact",
            json!({ "addressbook": addressbook, "uid": uid, "contact_data": contact_data }),
        )
    }

    async fn delete_contact(&self, addressbook: &str, uid: &str) -> NextcloudResult<WriteReceipt> {
        self.call("delete_contact", json!({ "addressbook": addressbook, "uid": uid }))
    }

    async fn update_contact(
        &self,
        addressbook: &str,
        uid: &str,
        contact_data: &ContactData,
        etag: &str,
    ) -> NextcloudResult<WriteReceipt> {
        self.call(
            "update_contact",
            json!({
                "addressbook": addressbook,
                "uid": uid,
                "contact_data": contact_data,
                "etag": etag,
            }),
        )
    }
}

#[async_trait]
impl NotesApi for MockClient {
    async fn list_notes(&self) -> NextcloudResult<Vec<Note>> {
        self.call("list_notes", json!({}))
    }

    async fn get_note(&self, note_id: i64) -> NextcloudResult<Note> {
        self.call("get_note", json!({ "note_id": note_id }))
    }

    async fn create_note(
        &self,
        title: &str,
        content: &str,
        category: &str,
    ) -> NextcloudResult<Note> {
        self.call(
            "create_note",
            json!({ "title": title, "content": content, "category": category }),
        )
    }

    async fn update_note(
        &self,
        note_id: i64,
        etag: &str,
        update: &NoteUpdate,
    ) -> NextcloudResult<Note> {
        self.call(
            "update_note",
            json!({ "note_id": note_id, "etag": etag, "update": update }),
        )
    }

    async fn append_content(&self, note_id: i64, content: &str) -> NextcloudResult<Note> {
        self.call("append_content", json!({ "note_id": note_id, "content": content }))
    }

    async fn search_notes(&self, query: &str) -> NextcloudResult<Vec<NoteSearchHit>> {
        self.call("search_notes", json!({ "query": query }))
    }

    async fn delete_note(&self, note_id: i64) -> NextcloudResult<WriteReceipt> {
        self.call("delete_note", json!({ "note_id": note_id }))
    }
}

#[async_trait]
impl TablesApi for MockClient {
    async fn list_tables(&self) -> NextcloudResult<Vec<Value>> {
        self.call("list_tables", json!({}))
    }

    async fn get_schema(&self, table_id: i64) -> NextcloudResult<Value> {
        self.call("get_schema", json!({ "table_id": table_id }))
    }

    async fn read_table(
        &self,
        table_id: i64,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> NextcloudResult<Vec<Value>> {
        self.call(
            "read_table",
            json!({ "table_id": table_id, "limit": limit, "offset": offset }),
        )
    }

    async fn insert_row(&self, table_id: i64, data: &RowData) -> NextcloudResult<Value> {
        self.call("insert_row", json!({ "table_id": table_id, "data": data }))
    }

    async fn update_row(&self, row_id: i64, data: &RowData) -> NextcloudResult<Value> {
        self.call("update_row", json!({ "row_id": row_id, "data": data }))
    }

    async fn delete_row(&self, row_id: i64) -> NextcloudResult<Value> {
        self.call("delete_row", json!({ "row_id": row_id }))
    }
}

#[async_trait]
impl WebdavApi for MockClient {
    async fn list_directory(&self, path: &str) -> NextcloudResult<Vec<DavEntry>> {
        self.call("list_directory", json!({ "path": path }))
    }

    async fn read_file(&self, path: &str) -> NextcloudResult<FileContent> {
        self.call("read_file", json!({ "path": path }))
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        content_type: &str,
        encoding: ContentEncoding,
    ) -> NextcloudResult<WriteReceipt> {
        self.call(
            "write_file",
            json!({
                "path": path,
                "content": content,
                "content_type": content_type,
                "encoding": encoding,
            }),
        )
    }

    async fn create_directory(&self, path: &str) -> NextcloudResult<WriteReceipt> {
        self.call("create_directory", json!({ "path": path }))
    }

    async fn delete_resource(&self, path: &str) -> NextcloudResult<WriteReceipt> {
        self.call("delete_resource", json!({ "path": path }))
    }
}

#[async_trait]
impl CalendarApi for MockClient {
    async fn list_calendars(&self) -> NextcloudResult<Vec<Calendar>> {
        self.call("list_calendars", json!({}))
    }

    async fn list_events(
        &self,
        calendar_name: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Option<usize>,
    ) -> NextcloudResult<Vec<CalendarEvent>> {
        self.call(
            "list_events",
            json!({
                "calendar_name": calendar_name,
                "start_date": start_date,
                "end_date": end_date,
                "limit": limit,
            }),
        )
    }

    async fn get_event(
        &self,
        calendar_name: &str,
        event_uid: &str,
    ) -> NextcloudResult<CalendarEvent> {
        self.call(
            "get_event",
            json!({ "calendar_name": calendar_name, "event_uid": event_uid }),
        )
    }

    async fn create_event(
        &self,
        calendar_name: &str,
        event_data: &EventData,
    ) -> NextcloudResult<WriteReceipt> {
        self.call(
            "create_event",
            json!({ "calendar_name": calendar_name, "event_data": event_data }),
        )
    }

    async fn update_event(
        &self,
        calendar_name: &str,
        event_uid: &str,
        event_data: &EventData,
        etag: &str,
    ) -> NextcloudResult<WriteReceipt> {
        self.call(
            "update_event",
            json!({
                "calendar_name": calendar_name,
                "event_uid": event_uid,
                "event_data": event_data,
                "etag": etag,
            }),
        )
    }

    async fn delete_event(
        &self,
        calendar_name: &str,
        event_uid: &str,
    ) -> NextcloudResult<WriteReceipt> {
        self.call(
            "delete_event",
            json!({ "calendar_name": calendar_name, "event_uid": event_uid }),
        )
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    fn contacts(&self) -> &dyn ContactsApi {
        self
    }

    fn notes(&self) -> &dyn NotesApi {
        self
    }

    fn tables(&self) -> &dyn TablesApi {
        self
    }

    fn webdav(&self) -> &dyn WebdavApi {
        self
    }

    fn calendar(&self) -> &dyn CalendarApi {
        self
    }

    async fn capabilities(&self) -> NextcloudResult<Value> {
        self.capabilities_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(NextcloudError::Closed);
        }
        self.capabilities
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| NextcloudError::Status {
                method: "GET".to_string(),
                url: "capabilities".to_string(),
                status: 503,
                body: "Service Unavailable".to_string(),
            })
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

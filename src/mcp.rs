use crate::capabilities::CapabilityRegistry;
use crate::capabilities::calendar::{
    CreateEventRequest, EventRequest, ListCalendarsResponse, ListEventsRequest,
    ListEventsResponse, UpdateEventRequest,
};
use crate::capabilities::contacts::{
    CreateAddressbookRequest, CreateContactRequest, DeleteAddressbookRequest,
    DeleteContactRequest, ListAddressbooksResponse, ListContactsRequest, ListContactsResponse,
    UpdateContactRequest,
};
use crate::capabilities::notes::{
    AppendContentRequest, CreateNoteRequest, ListNotesResponse, NoteIdRequest,
    SearchNotesRequest, SearchNotesResponse, UpdateNoteRequest,
};
use crate::capabilities::tables::{
    InsertRowRequest, ListTablesResponse, ReadTableRequest, RowIdRequest, RowResponse,
    RowsResponse, TableIdRequest, TableSchemaResponse, UpdateRowRequest,
};
use crate::capabilities::webdav::{
    ListDirectoryRequest, ListDirectoryResponse, PathRequest, WriteFileRequest,
};
use crate::client::WriteReceipt;
use crate::client::calendar::CalendarEvent;
use crate::client::notes::Note;
use crate::client::webdav::FileContent;
use crate::error::{internal_error, resource_not_found};
use rmcp::{
    RoleServer, ServerHandler,
    handler::server::{
        router::tool::ToolRouter,
        wrapper::{Json, Parameters},
    },
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

/// URI of the server capabilities resource
pub const CAPABILITIES_URI: &str = "nc://capabilities";

/// MCP service exposing the Nextcloud tools and the capabilities resource
#[derive(Clone)]
pub struct NextcloudMcpService {
    tool_router: ToolRouter<NextcloudMcpService>,
    capabilities: Arc<CapabilityRegistry>,
}

#[tool_router]
impl NextcloudMcpService {
    pub fn new(capabilities: Arc<CapabilityRegistry>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            capabilities,
        }
    }

    /// Every registered tool with its input schema
    pub fn tool_definitions(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    // Contacts

    #[tool(description = "List all addressbooks of the user")]
    async fn nc_contacts_list_addressbooks(
        &self,
    ) -> Result<Json<ListAddressbooksResponse>, ErrorData> {
        self.capabilities.contacts().list_addressbooks().await.map(Json)
    }

    #[tool(description = "List all contacts in an addressbook")]
    async fn nc_contacts_list_contacts(
        &self,
        Parameters(request): Parameters<ListContactsRequest>,
    ) -> Result<Json<ListContactsResponse>, ErrorData> {
        self.capabilities.contacts().list_contacts(request).await.map(Json)
    }

    #[tool(description = "Create a new addressbook")]
    async fn nc_contacts_create_addressbook(
        &self,
        Parameters(request): Parameters<CreateAddressbookRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities
            .contacts()
            .create_addressbook(request)
            .await
            .map(Json)
    }

    #[tool(description = "Delete an addressbook and every contact in it")]
    async fn nc_contacts_delete_addressbook(
        &self,
        Parameters(request): Parameters<DeleteAddressbookRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities
            .contacts()
            .delete_addressbook(request)
            .await
            .map(Json)
    }

    #[tool(
        description = "Create a contact. contact_data holds vCard fields such as fn, email, tel, org, title, note, nickname, url, bday; fn is required"
    )]
    async fn nc_contacts_create_contact(
        &self,
        Parameters(request): Parameters<CreateContactRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.contacts().create_contact(request).await.map(Json)
    }

    #[tool(description = "Delete a contact from an addressbook")]
    async fn nc_contacts_delete_contact(
        &self,
        Parameters(request): Parameters<DeleteContactRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.contacts().delete_contact(request).await.map(Json)
    }

    #[tool(
        description = "Update a contact. Only the fields given in contact_data are replaced; pass etag to fail instead of overwriting concurrent changes"
    )]
    async fn nc_contacts_update_contact(
        &self,
        Parameters(request): Parameters<UpdateContactRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.contacts().update_contact(request).await.map(Json)
    }

    // Notes

    #[tool(description = "List all notes with their content")]
    async fn nc_notes_list_notes(&self) -> Result<Json<ListNotesResponse>, ErrorData> {
        self.capabilities.notes().list_notes().await.map(Json)
    }

    #[tool(description = "Get a single note by id")]
    async fn nc_notes_get_note(
        &self,
        Parameters(request): Parameters<NoteIdRequest>,
    ) -> Result<Json<Note>, ErrorData> {
        self.capabilities.notes().get_note(request).await.map(Json)
    }

    #[tool(description = "Create a new note")]
    async fn nc_notes_create_note(
        &self,
        Parameters(request): Parameters<CreateNoteRequest>,
    ) -> Result<Json<Note>, ErrorData> {
        self.capabilities.notes().create_note(request).await.map(Json)
    }

    #[tool(
        description = "Update the title, content or category of a note. The etag from the last read guards against overwriting concurrent changes"
    )]
    async fn nc_notes_update_note(
        &self,
        Parameters(request): Parameters<UpdateNoteRequest>,
    ) -> Result<Json<Note>, ErrorData> {
        self.capabilities.notes().update_note(request).await.map(Json)
    }

    #[tool(description = "Append text to the end of a note, after a separator line")]
    async fn nc_notes_append_content(
        &self,
        Parameters(request): Parameters<AppendContentRequest>,
    ) -> Result<Json<Note>, ErrorData> {
        self.capabilities.notes().append_content(request).await.map(Json)
    }

    #[tool(description = "Search notes by title and content, best matches first")]
    async fn nc_notes_search_notes(
        &self,
        Parameters(request): Parameters<SearchNotesRequest>,
    ) -> Result<Json<SearchNotesResponse>, ErrorData> {
        self.capabilities.notes().search_notes(request).await.map(Json)
    }

    #[tool(description = "Delete a note")]
    async fn nc_notes_delete_note(
        &self,
        Parameters(request): Parameters<NoteIdRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.notes().delete_note(request).await.map(Json)
    }

    // Tables

    #[tool(description = "List all tables the user can access")]
    async fn nc_tables_list_tables(&self) -> Result<Json<ListTablesResponse>, ErrorData> {
        self.capabilities.tables().list_tables().await.map(Json)
    }

    #[tool(description = "Get the columns and views of a table")]
    async fn nc_tables_get_schema(
        &self,
        Parameters(request): Parameters<TableIdRequest>,
    ) -> Result<Json<TableSchemaResponse>, ErrorData> {
        self.capabilities.tables().get_schema(request).await.map(Json)
    }

    #[tool(description = "Read the rows of a table, optionally paginated")]
    async fn nc_tables_read_table(
        &self,
        Parameters(request): Parameters<ReadTableRequest>,
    ) -> Result<Json<RowsResponse>, ErrorData> {
        self.capabilities.tables().read_table(request).await.map(Json)
    }

    #[tool(description = "Insert a row; data maps numeric column ids to values")]
    async fn nc_tables_insert_row(
        &self,
        Parameters(request): Parameters<InsertRowRequest>,
    ) -> Result<Json<RowResponse>, ErrorData> {
        self.capabilities.tables().insert_row(request).await.map(Json)
    }

    #[tool(description = "Update cells of a row; data maps numeric column ids to values")]
    async fn nc_tables_update_row(
        &self,
        Parameters(request): Parameters<UpdateRowRequest>,
    ) -> Result<Json<RowResponse>, ErrorData> {
        self.capabilities.tables().update_row(request).await.map(Json)
    }

    #[tool(description = "Delete a row")]
    async fn nc_tables_delete_row(
        &self,
        Parameters(request): Parameters<RowIdRequest>,
    ) -> Result<Json<RowResponse>, ErrorData> {
        self.capabilities.tables().delete_row(request).await.map(Json)
    }

    // WebDAV

    #[tool(description = "List the files and folders in a directory")]
    async fn nc_webdav_list_directory(
        &self,
        Parameters(request): Parameters<ListDirectoryRequest>,
    ) -> Result<Json<ListDirectoryResponse>, ErrorData> {
        self.capabilities.webdav().list_directory(request).await.map(Json)
    }

    #[tool(description = "Read a file; binary content is returned base64 encoded")]
    async fn nc_webdav_read_file(
        &self,
        Parameters(request): Parameters<PathRequest>,
    ) -> Result<Json<FileContent>, ErrorData> {
        self.capabilities.webdav().read_file(request).await.map(Json)
    }

    #[tool(description = "Create or overwrite a file")]
    async fn nc_webdav_write_file(
        &self,
        Parameters(request): Parameters<WriteFileRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.webdav().write_file(request).await.map(Json)
    }

    #[tool(description = "Create a directory; the parent must exist")]
    async fn nc_webdav_create_directory(
        &self,
        Parameters(request): Parameters<PathRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.webdav().create_directory(request).await.map(Json)
    }

    #[tool(description = "Delete a file, or a directory with everything in it")]
    async fn nc_webdav_delete_resource(
        &self,
        Parameters(request): Parameters<PathRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.webdav().delete_resource(request).await.map(Json)
    }

    // Calendar

    #[tool(description = "List all calendars of the user")]
    async fn nc_calendar_list_calendars(
        &self,
    ) -> Result<Json<ListCalendarsResponse>, ErrorData> {
        self.capabilities.calendar().list_calendars().await.map(Json)
    }

    #[tool(description = "List events in a calendar, optionally within a date range")]
    async fn nc_calendar_list_events(
        &self,
        Parameters(request): Parameters<ListEventsRequest>,
    ) -> Result<Json<ListEventsResponse>, ErrorData> {
        self.capabilities.calendar().list_events(request).await.map(Json)
    }

    #[tool(description = "Get a single event by uid")]
    async fn nc_calendar_get_event(
        &self,
        Parameters(request): Parameters<EventRequest>,
    ) -> Result<Json<CalendarEvent>, ErrorData> {
        self.capabilities.calendar().get_event(request).await.map(Json)
    }

    #[tool(
        description = "Create an event. event_data needs title and start_datetime; end defaults to one hour later (one day for all_day events)"
    )]
    async fn nc_calendar_create_event(
        &self,
        Parameters(request): Parameters<CreateEventRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.calendar().create_event(request).await.map(Json)
    }

    #[tool(
        description = "Update an event. Only the fields given in event_data are replaced; pass etag to fail instead of overwriting concurrent changes"
    )]
    async fn nc_calendar_update_event(
        &self,
        Parameters(request): Parameters<UpdateEventRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.calendar().update_event(request).await.map(Json)
    }

    #[tool(description = "Delete an event")]
    async fn nc_calendar_delete_event(
        &self,
        Parameters(request): Parameters<EventRequest>,
    ) -> Result<Json<WriteReceipt>, ErrorData> {
        self.capabilities.calendar().delete_event(request).await.map(Json)
    }
}

impl NextcloudMcpService {
    fn capabilities_resource() -> Resource {
        let mut raw = RawResource::new(CAPABILITIES_URI, "capabilities");
        raw.description =
            Some("Capabilities document of the connected Nextcloud server".to_string());
        raw.mime_type = Some("application/json".to_string());
        raw.no_annotation()
    }

    /// Resolve a resource URI; only the capabilities document exists
    async fn read_resource_uri(&self, uri: &str) -> Result<ReadResourceResult, ErrorData> {
        if uri != CAPABILITIES_URI {
            return Err(resource_not_found(format!("unknown resource {uri}")));
        }

        let document = self.capabilities.client().capabilities().await?;
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| internal_error(format!("Failed to serialize capabilities: {e}")))?;

        let mut contents = ResourceContents::text(text, CAPABILITIES_URI);
        if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
            *mime_type = Some("application/json".to_string());
        }
        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}

#[tool_handler]
impl ServerHandler for NextcloudMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "Tools for a Nextcloud server. Every tool acts on the server directly; nothing is cached.\n{}\nRead {CAPABILITIES_URI} for the server's capabilities.",
                self.capabilities.summary()
            )),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::with_all_items(vec![
            Self::capabilities_resource(),
        ]))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        self.read_resource_uri(&request.uri).await
    }
}

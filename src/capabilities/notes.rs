use crate::capabilities::{Capability, CapabilityResult, required};
use crate::client::RemoteClient;
use crate::client::WriteReceipt;
use crate::client::notes::{Note, NoteSearchHit, NoteUpdate};
use crate::error::invalid_params;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct NoteIdRequest {
    #[schemars(description = "Numeric id of the note")]
    pub note_id: i64,
}

/// Parameters for nc_notes_create_note
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CreateNoteRequest {
    pub title: String,

    pub content: String,

    #[serde(default)]
    #[schemars(description = "Category (folder) of the note (optional, defaults to none)")]
    pub category: String,
}

/// Parameters for nc_notes_update_note
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateNoteRequest {
    pub note_id: i64,

    #[schemars(
        description = "ETag of the note as last read; the update fails if the note changed since. Empty skips the check"
    )]
    pub etag: String,

    #[schemars(description = "New title (optional)")]
    pub title: Option<String>,

    #[schemars(description = "New content, replacing the old one (optional)")]
    pub content: Option<String>,

    #[schemars(description = "New category (optional)")]
    pub category: Option<String>,
}

/// Parameters for nc_notes_append_content
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct AppendContentRequest {
    pub note_id: i64,

    #[schemars(description = "Text appended after a separator line")]
    pub content: String,
}

/// Parameters for nc_notes_search_notes
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SearchNotesRequest {
    #[schemars(description = "Words that must all appear in the title or content")]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListNotesResponse {
    pub notes: Vec<Note>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchNotesResponse {
    pub results: Vec<NoteSearchHit>,
}

/// Capability for the Notes app
pub struct NotesCapability {
    client: Arc<dyn RemoteClient>,
}

impl NotesCapability {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    pub async fn list_notes(&self) -> CapabilityResult<ListNotesResponse> {
        let notes = self.client.notes().list_notes().await?;
        Ok(ListNotesResponse { notes })
    }

    pub async fn get_note(&self, request: NoteIdRequest) -> CapabilityResult<Note> {
        Ok(self.client.notes().get_note(request.note_id).await?)
    }

    pub async fn create_note(&self, request: CreateNoteRequest) -> CapabilityResult<Note> {
        let title = required("title", &request.title)?;
        Ok(self
            .client
            .notes()
            .create_note(title, &request.content, &request.category)
            .await?)
    }

    pub async fn update_note(&self, request: UpdateNoteRequest) -> CapabilityResult<Note> {
        let update = NoteUpdate {
            title: request.title,
            content: request.content,
            category: request.category,
        };
        if update.is_empty() {
            return Err(invalid_params(
                "at least one of title, content or category is required",
            ));
        }
        Ok(self
            .client
            .notes()
            .update_note(request.note_id, &request.etag, &update)
            .await?)
    }

    pub async fn append_content(&self, request: AppendContentRequest) -> CapabilityResult<Note> {
        let content = required("content", &request.content)?;
        Ok(self
            .client
            .notes()
            .append_content(request.note_id, content)
            .await?)
    }

    pub async fn search_notes(
        &self,
        request: SearchNotesRequest,
    ) -> CapabilityResult<SearchNotesResponse> {
        let query = required("query", &request.query)?;
        let results = self.client.notes().search_notes(query).await?;
        Ok(SearchNotesResponse { results })
    }

    pub async fn delete_note(&self, request: NoteIdRequest) -> CapabilityResult<WriteReceipt> {
        Ok(self.client.notes().delete_note(request.note_id).await?)
    }
}

impl Capability for NotesCapability {
    fn id(&self) -> &'static str {
        "notes"
    }

    fn description(&self) -> &'static str {
        "Read, search, create, edit, append to and delete notes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_note_needs_a_field() {
        let mock = Arc::new(MockClient::new());
        let notes = NotesCapability::new(mock.clone());
        let err = notes
            .update_note(UpdateNoteRequest {
                note_id: 1,
                etag: "e".into(),
                title: None,
                content: None,
                category: None,
            })
            .await
            .unwrap_err();
        assert!(err.message.contains("at least one"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_note_forwards_only_set_fields() {
        let stored = json!({"id": 1, "etag": "e2", "title": "T", "content": "new"});
        let mock = Arc::new(MockClient::new().respond("update_note", stored.clone()));
        let notes = NotesCapability::new(mock.clone());
        let note = notes
            .update_note(UpdateNoteRequest {
                note_id: 1,
                etag: "e1".into(),
                title: None,
                content: Some("new".into()),
                category: None,
            })
            .await
            .unwrap();

        assert_eq!(serde_json::to_value(&note).unwrap()["content"], "new");
        assert_eq!(
            mock.calls(),
            vec![(
                "update_note".to_string(),
                json!({"note_id": 1, "etag": "e1", "update": {"content": "new"}})
            )]
        );
    }

    #[test]
    fn test_create_request_category_is_optional() {
        let request: CreateNoteRequest =
            serde_json::from_value(json!({"title": "a", "content": "b"})).unwrap();
        assert_eq!(request.category, "");
    }
}

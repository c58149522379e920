use super::http::{self, NextcloudHttp};
use super::{NotesApi, WriteReceipt};
use crate::error::NextcloudResult;
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::IF_MATCH;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Inserted between the existing body and appended content
const APPEND_SEPARATOR: &str = "\n---\n";

/// A note as returned by the Notes app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Note {
    pub id: i64,
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub content: String,
    /// Last modification as a unix timestamp
    #[serde(default)]
    pub modified: i64,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub readonly: bool,
}

/// Fields to change on an existing note; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NoteUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.category.is_none()
    }
}

/// A note matching a search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NoteSearchHit {
    pub id: i64,
    pub title: String,
    pub category: String,
    /// Relevance; title matches weigh more than body matches
    pub score: u32,
}

/// Score notes against a whitespace-separated query, best first.
///
/// Every query term must occur in the title or the content.
pub(crate) fn rank_notes(notes: &[Note], query: &str) -> Vec<NoteSearchHit> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<NoteSearchHit> = notes
        .iter()
        .filter_map(|note| {
            let title = note.title.to_lowercase();
            let content = note.content.to_lowercase();
            let mut score = 0;
            for term in &terms {
                let in_title = title.contains(term.as_str());
                let in_content = content.contains(term.as_str());
                if !in_title && !in_content {
                    return None;
                }
                if in_title {
                    score += 3;
                }
                if in_content {
                    score += 1;
                }
            }
            Some(NoteSearchHit {
                id: note.id,
                title: note.title.clone(),
                category: note.category.clone(),
                score,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
    hits
}

pub struct NotesClient {
    http: Arc<NextcloudHttp>,
}

impl NotesClient {
    pub fn new(http: Arc<NextcloudHttp>) -> Self {
        Self { http }
    }

    fn url(&self, note_id: Option<i64>) -> NextcloudResult<reqwest::Url> {
        let base = ["index.php", "apps", "notes", "api", "v1", "notes"];
        match note_id {
            Some(id) => {
                let id = id.to_string();
                let mut segments: Vec<&str> = base.to_vec();
                segments.push(id.as_str());
                self.http.url(&segments)
            }
            None => self.http.url(&base),
        }
    }

    async fn put_note(
        &self,
        note_id: i64,
        etag: &str,
        update: &NoteUpdate,
    ) -> NextcloudResult<Note> {
        let mut request = self.http.request(Method::PUT, self.url(Some(note_id))?).json(update);
        if !etag.trim().is_empty() {
            request = request.header(IF_MATCH, http::quote_etag(etag));
        }
        self.http.send_json(request).await
    }
}

#[async_trait]
impl NotesApi for NotesClient {
    async fn list_notes(&self) -> NextcloudResult<Vec<Note>> {
        let url = self.url(None)?;
        self.http.send_json(self.http.request(Method::GET, url)).await
    }

    async fn get_note(&self, note_id: i64) -> NextcloudResult<Note> {
        let url = self.url(Some(note_id))?;
        self.http.send_json(self.http.request(Method::GET, url)).await
    }

    async fn create_note(
        &self,
        title: &str,
        content: &str,
        category: &str,
    ) -> NextcloudResult<Note> {
        let url = self.url(None)?;
        let body = json!({ "title": title, "content": content, "category": category });
        self.http
            .send_json(self.http.request(Method::POST, url).json(&body))
            .await
    }

    async fn update_note(
        &self,
        note_id: i64,
        etag: &str,
        update: &NoteUpdate,
    ) -> NextcloudResult<Note> {
        self.put_note(note_id, etag, update).await
    }

    async fn append_content(&self, note_id: i64, content: &str) -> NextcloudResult<Note> {
        let note = self.get_note(note_id).await?;
        let combined = if note.content.is_empty() {
            content.to_string()
        } else {
            format!("{}{APPEND_SEPARATOR}{content}", note.content)
        };
        let update = NoteUpdate {
            content: Some(combined),
            ..Default::default()
        };
        self.put_note(note_id, &note.etag, &update).await
    }

    async fn search_notes(&self, query: &str) -> NextcloudResult<Vec<NoteSearchHit>> {
        let notes = self.list_notes().await?;
        Ok(rank_notes(&notes, query))
    }

    async fn delete_note(&self, note_id: i64) -> NextcloudResult<WriteReceipt> {
        let url = self.url(Some(note_id))?;
        let response = self.http.send(self.http.request(Method::DELETE, url)).await?;
        Ok(WriteReceipt::from_response(&response))
    }
}

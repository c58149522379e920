pub mod calendar;
pub mod contacts;
pub mod notes;
pub mod tables;
pub mod webdav;

use crate::client::RemoteClient;
use crate::error::invalid_params;
use rmcp::model::ErrorData;
use std::sync::{Arc, OnceLock};

use self::calendar::CalendarCapability;
use self::contacts::ContactsCapability;
use self::notes::NotesCapability;
use self::tables::TablesCapability;
use self::webdav::WebdavCapability;

/// Result type for capability operations
pub type CapabilityResult<T> = Result<T, ErrorData>;

/// A group of tools backed by one namespace of the remote client
pub trait Capability: Send + Sync + 'static {
    /// Unique identifier, also the tool name prefix after `nc_`
    fn id(&self) -> &'static str;

    /// Human-readable description of what this capability provides
    fn description(&self) -> &'static str;
}

/// Registry of capabilities sharing one remote client
///
/// Capabilities are created on first access; every one of them holds the
/// same `Arc` to the client, so no tool call can cause a second client to
/// be constructed.
pub struct CapabilityRegistry {
    client: Arc<dyn RemoteClient>,

    contacts: OnceLock<Arc<ContactsCapability>>,
    notes: OnceLock<Arc<NotesCapability>>,
    tables: OnceLock<Arc<TablesCapability>>,
    webdav: OnceLock<Arc<WebdavCapability>>,
    calendar: OnceLock<Arc<CalendarCapability>>,
}

impl CapabilityRegistry {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            contacts: OnceLock::new(),
            notes: OnceLock::new(),
            tables: OnceLock::new(),
            webdav: OnceLock::new(),
            calendar: OnceLock::new(),
        }
    }

    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    pub fn contacts(&self) -> Arc<ContactsCapability> {
        self.contacts
            .get_or_init(|| Arc::new(ContactsCapability::new(Arc::clone(&self.client))))
            .clone()
    }

    pub fn notes(&self) -> Arc<NotesCapability> {
        self.notes
            .get_or_init(|| Arc::new(NotesCapability::new(Arc::clone(&self.client))))
            .clone()
    }

    pub fn tables(&self) -> Arc<TablesCapability> {
        self.tables
            .get_or_init(|| Arc::new(TablesCapability::new(Arc::clone(&self.client))))
            .clone()
    }

    pub fn webdav(&self) -> Arc<WebdavCapability> {
        self.webdav
            .get_or_init(|| Arc::new(WebdavCapability::new(Arc::clone(&self.client))))
            .clone()
    }

    pub fn calendar(&self) -> Arc<CalendarCapability> {
        self.calendar
            .get_or_init(|| Arc::new(CalendarCapability::new(Arc::clone(&self.client))))
            .clone()
    }

    /// One line per capability, used for the server instructions
    pub fn summary(&self) -> String {
        let capabilities: [Arc<dyn Capability>; 5] = [
            self.contacts(),
            self.notes(),
            self.tables(),
            self.webdav(),
            self.calendar(),
        ];
        capabilities
            .iter()
            .map(|c| format!("- nc_{}_*: {}", c.id(), c.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Reject blank identifiers before they reach the server; the value itself
/// is passed through untouched
pub(crate) fn required<'a>(field: &str, value: &'a str) -> CapabilityResult<&'a str> {
    if value.trim().is_empty() {
        return Err(invalid_params(format!("{field} must not be empty")));
    }
    Ok(value)
}

/// Like [`required`], for values that end up as a single URL path segment
pub(crate) fn segment<'a>(field: &str, value: &'a str) -> CapabilityResult<&'a str> {
    let value = required(field, value)?;
    if value.contains('/') || value == "." || value == ".." {
        return Err(invalid_params(format!(
            "{field} must be a plain name, got {value:?}"
        )));
    }
    Ok(value)
}

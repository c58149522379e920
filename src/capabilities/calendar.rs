use crate::capabilities::{Capability, CapabilityResult, segment};
use crate::client::RemoteClient;
use crate::client::WriteReceipt;
use crate::client::calendar::{Calendar, CalendarEvent, EventData};
use crate::error::invalid_params;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for nc_calendar_list_events
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ListEventsRequest {
    #[schemars(description = "Name of the calendar, as returned by nc_calendar_list_calendars")]
    pub calendar_name: String,

    #[schemars(description = "Only events ending after this date (YYYY-MM-DD or RFC 3339, optional)")]
    pub start_date: Option<String>,

    #[schemars(description = "Only events starting up to this date, inclusive (YYYY-MM-DD or RFC 3339, optional)")]
    pub end_date: Option<String>,

    #[schemars(description = "Maximum number of events to return (optional)")]
    pub limit: Option<usize>,
}

/// One event in a calendar
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct EventRequest {
    pub calendar_name: String,
    pub event_uid: String,
}

/// Parameters for nc_calendar_create_event
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CreateEventRequest {
    pub calendar_name: String,

    #[schemars(description = "Event fields; title and start_datetime are required")]
    pub event_data: EventData,
}

/// Parameters for nc_calendar_update_event
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateEventRequest {
    pub calendar_name: String,

    pub event_uid: String,

    #[schemars(description = "Fields to replace; properties not listed are kept as they are")]
    pub event_data: EventData,

    #[serde(default)]
    #[schemars(
        description = "ETag from a previous read; the update fails if the event changed since (optional, defaults to the current ETag)"
    )]
    pub etag: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListCalendarsResponse {
    pub calendars: Vec<Calendar>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListEventsResponse {
    pub events: Vec<CalendarEvent>,
}

/// Capability for CalDAV calendars and events
pub struct CalendarCapability {
    client: Arc<dyn RemoteClient>,
}

impl CalendarCapability {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    pub async fn list_calendars(&self) -> CapabilityResult<ListCalendarsResponse> {
        let calendars = self.client.calendar().list_calendars().await?;
        Ok(ListCalendarsResponse { calendars })
    }

    pub async fn list_events(
        &self,
        request: ListEventsRequest,
    ) -> CapabilityResult<ListEventsResponse> {
        let calendar_name = segment("calendar_name", &request.calendar_name)?;
        // dates are parsed by the client; only blank strings are dropped here
        let start = request.start_date.as_deref().filter(|v| !v.trim().is_empty());
        let end = request.end_date.as_deref().filter(|v| !v.trim().is_empty());
        let events = self
            .client
            .calendar()
            .list_events(calendar_name, start, end, request.limit)
            .await?;
        Ok(ListEventsResponse { events })
    }

    pub async fn get_event(&self, request: EventRequest) -> CapabilityResult<CalendarEvent> {
        let calendar_name = segment("calendar_name", &request.calendar_name)?;
        let event_uid = segment("event_uid", &request.event_uid)?;
        Ok(self
            .client
            .calendar()
            .get_event(calendar_name, event_uid)
            .await?)
    }

    pub async fn create_event(
        &self,
        request: CreateEventRequest,
    ) -> CapabilityResult<WriteReceipt> {
        let calendar_name = segment("calendar_name", &request.calendar_name)?;
        let data = &request.event_data;
        if data.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(invalid_params("event_data.title is required"));
        }
        if data.start_datetime.is_none() {
            return Err(invalid_params("event_data.start_datetime is required"));
        }
        data.validate()?;
        Ok(self
            .client
            .calendar()
            .create_event(calendar_name, data)
            .await?)
    }

    pub async fn update_event(
        &self,
        request: UpdateEventRequest,
    ) -> CapabilityResult<WriteReceipt> {
        let calendar_name = segment("calendar_name", &request.calendar_name)?;
        let event_uid = segment("event_uid", &request.event_uid)?;
        if request.event_data.is_empty() {
            return Err(invalid_params("event_data must contain at least one field"));
        }
        request.event_data.validate()?;
        Ok(self
            .client
            .calendar()
            .update_event(calendar_name, event_uid, &request.event_data, &request.etag)
            .await?)
    }

    pub async fn delete_event(&self, request: EventRequest) -> CapabilityResult<WriteReceipt> {
        let calendar_name = segment("calendar_name", &request.calendar_name)?;
        let event_uid = segment("event_uid", &request.event_uid)?;
        Ok(self
            .client
            .calendar()
            .delete_event(calendar_name, event_uid)
            .await?)
    }
}

impl Capability for CalendarCapability {
    fn id(&self) -> &'static str {
        "calendar"
    }

    fn description(&self) -> &'static str {
        "List calendars and events, create, update and delete events (CalDAV)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use rmcp::model::ErrorCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_event_validates_before_calling() {
        let mock = Arc::new(MockClient::new());
        let calendar = CalendarCapability::new(mock.clone());

        let missing_start = CreateEventRequest {
            calendar_name: "personal".into(),
            event_data: serde_json::from_value(json!({"title": "Lunch"})).unwrap(),
        };
        let err = calendar.create_event(missing_start).await.unwrap_err();
        assert!(err.message.contains("start_datetime"));

        let bad_date = CreateEventRequest {
            calendar_name: "personal".into(),
            event_data: serde_json::from_value(
                json!({"title": "Lunch", "start_datetime": "tomorrow noon"}),
            )
            .unwrap(),
        };
        let err = calendar.create_event(bad_date).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32602));

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_events_drops_blank_dates() {
        let mock = Arc::new(MockClient::new().respond("list_events", json!([])));
        let calendar = CalendarCapability::new(mock.clone());
        let response = calendar
            .list_events(ListEventsRequest {
                calendar_name: "personal".into(),
                start_date: Some("2025-01-01".into()),
                end_date: Some(" ".into()),
                limit: Some(5),
            })
            .await
            .unwrap();

        assert!(response.events.is_empty());
        assert_eq!(
            mock.calls()[0].1,
            json!({
                "calendar_name": "personal",
                "start_date": "2025-01-01",
                "end_date": null,
                "limit": 5
            })
        );
    }
}

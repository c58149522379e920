use super::content_line::{self, ContentLine};
use super::dav::{self, DavResponse};
use super::http::{self, NextcloudHttp};
use super::{CalendarApi, WriteReceipt};
use crate::error::{NextcloudError, NextcloudResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, IF_MATCH, IF_NONE_MATCH};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PRODID: &str = concat!("-//nextcloud-mcp-server//", env!("CARGO_PKG_VERSION"), "//EN");

/// Event properties owned by [`EventData`]; replaced wholesale on update
const MANAGED_PROPERTIES: &[&str] = &[
    "SUMMARY",
    "DTSTART",
    "DTEND",
    "DESCRIPTION",
    "LOCATION",
    "CATEGORIES",
    "STATUS",
    "URL",
    "RRULE",
];

/// A CalDAV calendar collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Calendar {
    pub name: String,
    pub display_name: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctag: Option<String>,
}

/// A VEVENT with its commonly used properties lifted out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalendarEvent {
    pub uid: String,
    pub href: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// DTSTART as stored, e.g. `20250115T140000Z` or `20250115`
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    /// The raw iCalendar object
    pub ics: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Tentative,
    Confirmed,
    Cancelled,
}

impl EventStatus {
    fn as_str(self) -> &'static str {
        match self {
            EventStatus::Tentative => "TENTATIVE",
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Event fields to write; `None` leaves a property untouched on update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Event title (SUMMARY)")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Start as YYYY-MM-DD, YYYY-MM-DDTHH:MM[:SS] (floating) or RFC 3339"
    )]
    pub start_datetime: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "End, same formats as start; new events default to one hour (or one day) later, updates keep the stored length"
    )]
    pub end_datetime: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Whole-day event; dates are written without a time")]
    pub all_day: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "RRULE value, e.g. FREQ=WEEKLY;BYDAY=MO")]
    pub recurrence_rule: Option<String>,
}

impl EventData {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start_datetime.is_none()
            && self.end_datetime.is_none()
            && self.all_day.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.categories.is_none()
            && self.status.is_none()
            && self.url.is_none()
            && self.recurrence_rule.is_none()
    }

    /// Parse every supplied date so bad input fails before any request
    pub fn validate(&self) -> NextcloudResult<()> {
        for value in [&self.start_datetime, &self.end_datetime].into_iter().flatten() {
            EventTime::parse(value)?;
        }
        if let Some(rule) = &self.recurrence_rule
            && (rule.trim().is_empty() || rule.contains(['\r', '\n']))
        {
            return Err(NextcloudError::InvalidArgument(
                "recurrence_rule must be a single RRULE value".to_string(),
            ));
        }
        Ok(())
    }

    fn to_lines(
        &self,
        existing_all_day: bool,
        end_fallback: EndFallback,
    ) -> NextcloudResult<Vec<ContentLine>> {
        self.validate()?;
        let all_day = self.all_day.unwrap_or(existing_all_day);

        let mut lines = Vec::new();
        if let Some(v) = &self.title {
            lines.push(ContentLine::text("SUMMARY", v));
        }
        let start = match &self.start_datetime {
            Some(v) => Some(EventTime::parse(v)?.for_event(all_day)),
            None => None,
        };
        if let Some(start) = &start {
            lines.push(start.to_line("DTSTART"));
        }
        let end = match &self.end_datetime {
            Some(v) => Some(EventTime::parse(v)?.for_event(all_day)),
            None => match (start, end_fallback) {
                (Some(start), EndFallback::Default) => Some(start.default_end()),
                (Some(start), EndFallback::Shift(span)) => Some(start.shift(span)),
                _ => None,
            },
        };
        if let Some(end) = &end {
            lines.push(end.to_line("DTEND"));
        }
        if let Some(v) = &self.description {
            lines.push(ContentLine::text("DESCRIPTION", v));
        }
        if let Some(v) = &self.location {
            lines.push(ContentLine::text("LOCATION", v));
        }
        if let Some(v) = &self.categories {
            let joined = v
                .iter()
                .map(|c| content_line::escape_text(c))
                .collect::<Vec<_>>()
                .join(",");
            lines.push(ContentLine::new("CATEGORIES", joined));
        }
        if let Some(v) = self.status {
            lines.push(ContentLine::new("STATUS", v.as_str()));
        }
        if let Some(v) = &self.url {
            lines.push(ContentLine::new("URL", v.clone()));
        }
        if let Some(v) = &self.recurrence_rule {
            lines.push(ContentLine::new("RRULE", v.trim()));
        }
        Ok(lines)
    }
}

/// End written when a start is supplied without an end
#[derive(Debug, Clone, Copy)]
enum EndFallback {
    /// One hour, or one day for all-day events
    Default,
    /// Same length as the stored event
    Shift(Duration),
    /// Leave the stored end (a DURATION, or none at all) alone
    Keep,
}

/// A point in time as accepted from callers and written to iCalendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventTime {
    Date(NaiveDate),
    Floating(NaiveDateTime),
    Utc(DateTime<Utc>),
}

impl EventTime {
    pub(crate) fn parse(value: &str) -> NextcloudResult<Self> {
        let value = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(EventTime::Date(date));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(EventTime::Utc(dt.with_timezone(&Utc)));
        }
        for format in [
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(EventTime::Floating(dt));
            }
        }
        Err(NextcloudError::InvalidArgument(format!(
            "unrecognised date {value:?}; use YYYY-MM-DD, YYYY-MM-DDTHH:MM[:SS] or RFC 3339"
        )))
    }

    /// Parse a stored DTSTART/DTEND value; a TZID parameter is ignored
    fn from_ical(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
            return Some(EventTime::Date(date));
        }
        match value.strip_suffix('Z') {
            Some(utc) => NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                .ok()
                .map(|dt| EventTime::Utc(dt.and_utc())),
            None => NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
                .ok()
                .map(EventTime::Floating),
        }
    }

    fn naive(self) -> NaiveDateTime {
        match self {
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            EventTime::Floating(dt) => dt,
            EventTime::Utc(dt) => dt.naive_utc(),
        }
    }

    fn shift(self, span: Duration) -> Self {
        match self {
            EventTime::Date(d) => EventTime::Date(d + Duration::days(span.num_days().max(1))),
            EventTime::Floating(dt) => EventTime::Floating(dt + span),
            EventTime::Utc(dt) => EventTime::Utc(dt + span),
        }
    }

    /// Coerce to a whole day for all-day events, and away from one otherwise
    fn for_event(self, all_day: bool) -> Self {
        match (self, all_day) {
            (EventTime::Floating(dt), true) => EventTime::Date(dt.date()),
            (EventTime::Utc(dt), true) => EventTime::Date(dt.date_naive()),
            (EventTime::Date(d), false) => EventTime::Floating(d.and_time(chrono::NaiveTime::MIN)),
            (other, _) => other,
        }
    }

    fn default_end(&self) -> Self {
        match *self {
            EventTime::Date(d) => EventTime::Date(d + Duration::days(1)),
            EventTime::Floating(dt) => EventTime::Floating(dt + Duration::hours(1)),
            EventTime::Utc(dt) => EventTime::Utc(dt + Duration::hours(1)),
        }
    }

    fn to_line(self, name: &str) -> ContentLine {
        match self {
            EventTime::Date(d) => {
                ContentLine::new(name, d.format("%Y%m%d").to_string()).with_params("VALUE=DATE")
            }
            EventTime::Floating(dt) => {
                ContentLine::new(name, dt.format("%Y%m%dT%H%M%S").to_string())
            }
            EventTime::Utc(dt) => ContentLine::new(name, dt.format("%Y%m%dT%H%M%SZ").to_string()),
        }
    }

    /// CalDAV `time-range` attribute value
    fn to_range_bound(self) -> String {
        let utc = match self {
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
            EventTime::Floating(dt) => dt.and_utc(),
            EventTime::Utc(dt) => dt,
        };
        utc.format("%Y%m%dT%H%M%SZ").to_string()
    }
}

fn dtstamp() -> ContentLine {
    ContentLine::new("DTSTAMP", Utc::now().format("%Y%m%dT%H%M%SZ").to_string())
}

/// Build a VCALENDAR containing one new VEVENT
fn build_event(uid: &str, data: &EventData) -> NextcloudResult<String> {
    if data.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
        return Err(NextcloudError::InvalidArgument(
            "event_data.title is required".to_string(),
        ));
    }
    if data.start_datetime.is_none() {
        return Err(NextcloudError::InvalidArgument(
            "event_data.start_datetime is required".to_string(),
        ));
    }

    let mut lines = vec![
        ContentLine::new("BEGIN", "VCALENDAR"),
        ContentLine::new("VERSION", "2.0"),
        ContentLine::new("PRODID", PRODID),
        ContentLine::new("BEGIN", "VEVENT"),
        ContentLine::text("UID", uid),
        dtstamp(),
    ];
    lines.extend(data.to_lines(false, EndFallback::Default)?);
    lines.push(ContentLine::new("END", "VEVENT"));
    lines.push(ContentLine::new("END", "VCALENDAR"));
    Ok(content_line::render_all(&lines))
}

/// Position of the first VEVENT's BEGIN/END lines
fn vevent_bounds(lines: &[ContentLine]) -> Option<(usize, usize)> {
    let begin = lines
        .iter()
        .position(|l| l.name == "BEGIN" && l.value.eq_ignore_ascii_case("VEVENT"))?;
    let end = begin
        + lines[begin..]
            .iter()
            .position(|l| l.name == "END" && l.value.eq_ignore_ascii_case("VEVENT"))?;
    Some((begin, end))
}

/// Properties of a component body, skipping nested components
fn top_level(body: &[ContentLine]) -> Vec<&ContentLine> {
    let mut depth = 0usize;
    body.iter()
        .filter(|l| {
            let top = depth == 0;
            match l.name.as_str() {
                "BEGIN" => depth += 1,
                "END" => depth = depth.saturating_sub(1),
                _ => {}
            }
            top && l.name != "BEGIN"
        })
        .collect()
}

/// Replace supplied properties in the first VEVENT, leaving nested
/// components (alarms) and unknown properties as they were
fn merge_event(existing: &str, data: &EventData) -> NextcloudResult<String> {
    let mut lines = content_line::parse_all(existing);
    let (begin, end) = vevent_bounds(&lines).ok_or_else(|| {
        NextcloudError::InvalidResponse("stored event has no VEVENT".to_string())
    })?;

    let stored = top_level(&lines[begin + 1..end]);
    let find = |name: &str| stored.iter().find(|l| l.name == name).copied();
    let was_all_day = find("DTSTART").is_some_and(|l| l.has_param("VALUE=DATE"));

    let end_fallback = if data.all_day.is_some_and(|a| a != was_all_day) {
        EndFallback::Default
    } else {
        let stored_start = find("DTSTART").and_then(|l| EventTime::from_ical(&l.value));
        let stored_end = find("DTEND").map(|l| EventTime::from_ical(&l.value));
        match (stored_start, stored_end) {
            (Some(start), Some(Some(end))) => EndFallback::Shift(end.naive() - start.naive()),
            (_, Some(_)) => EndFallback::Default,
            (_, None) => EndFallback::Keep,
        }
    };
    let updates = data.to_lines(was_all_day, end_fallback)?;

    let mut event: Vec<ContentLine> = Vec::with_capacity(end - begin + updates.len());
    let mut depth = 0usize;
    let mut sequence = 0u32;
    for line in lines.drain(begin + 1..end) {
        let top_level = depth == 0;
        match line.name.as_str() {
            "BEGIN" => depth += 1,
            "END" => depth = depth.saturating_sub(1),
            _ => {}
        }
        if top_level && line.name != "BEGIN" {
            if line.name == "SEQUENCE" {
                sequence = line.value.trim().parse().unwrap_or(0);
                continue;
            }
            if line.name == "DTSTAMP" || updates.iter().any(|u| u.name == line.name) {
                continue;
            }
            // a new DTEND replaces a stored duration
            if updates.iter().any(|u| u.name == "DTEND") && line.name == "DURATION" {
                continue;
            }
        }
        event.push(line);
    }

    let mut merged = vec![
        dtstamp(),
        ContentLine::new("SEQUENCE", sequence.saturating_add(1).to_string()),
    ];
    merged.extend(updates);
    merged.extend(event);

    let tail = lines.split_off(begin + 1);
    lines.extend(merged);
    lines.extend(tail);
    Ok(content_line::render_all(&lines))
}

impl CalendarEvent {
    fn from_ics(href: String, etag: Option<String>, ics: String) -> NextcloudResult<Self> {
        let lines = content_line::parse_all(&ics);
        let (begin, end) = vevent_bounds(&lines).ok_or_else(|| {
            NextcloudError::InvalidResponse(format!("{href} contains no VEVENT"))
        })?;

        let props = top_level(&lines[begin + 1..end]);
        let find = |name: &str| props.iter().find(|l| l.name == name).copied();
        let text = |name: &str| find(name).map(ContentLine::unescaped);

        let uid = text("UID").unwrap_or_else(|| {
            DavResponse {
                href: href.clone(),
                ..Default::default()
            }
            .name()
            .trim_end_matches(".ics")
            .to_string()
        });
        let categories = props
            .iter()
            .filter(|l| l.name == "CATEGORIES")
            .flat_map(|l| split_list(&l.value))
            .collect();

        Ok(CalendarEvent {
            uid,
            etag,
            title: text("SUMMARY"),
            start: find("DTSTART").map(|l| l.value.clone()),
            end: find("DTEND").map(|l| l.value.clone()),
            all_day: find("DTSTART").is_some_and(|l| l.has_param("VALUE=DATE")),
            description: text("DESCRIPTION"),
            location: text("LOCATION"),
            categories,
            status: find("STATUS").map(|l| l.value.clone()),
            recurrence_rule: find("RRULE").map(|l| l.value.clone()),
            href,
            ics,
        })
    }
}

/// Split an escaped comma-separated list value
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => items.push(content_line::unescape_text(&std::mem::take(&mut current))),
            _ => current.push(ch),
        }
    }
    items.push(content_line::unescape_text(&current));
    items.retain(|c| !c.is_empty());
    items
}

fn calendar_query(start: Option<EventTime>, end: Option<EventTime>) -> String {
    let range = match (start, end) {
        (None, None) => String::new(),
        (start, end) => {
            let mut attrs = String::new();
            if let Some(start) = start {
                attrs.push_str(&format!(r#" start="{}""#, start.to_range_bound()));
            }
            if let Some(end) = end {
                attrs.push_str(&format!(r#" end="{}""#, end.to_range_bound()));
            }
            format!("<cal:time-range{attrs}/>")
        }
    };
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><cal:calendar-query {}><d:prop><d:getetag/><cal:calendar-data/></d:prop><cal:filter><cal:comp-filter name="VCALENDAR"><cal:comp-filter name="VEVENT">{range}</cal:comp-filter></cal:comp-filter></cal:filter></cal:calendar-query>"#,
        dav::NS_DECLS
    )
}

/// An end date without a time covers that whole day
fn inclusive_end(end: EventTime) -> EventTime {
    match end {
        EventTime::Date(d) => EventTime::Date(d + Duration::days(1)),
        other => other,
    }
}

pub struct CalendarClient {
    http: Arc<NextcloudHttp>,
}

impl CalendarClient {
    pub fn new(http: Arc<NextcloudHttp>) -> Self {
        Self { http }
    }

    fn url(&self, tail: &[&str]) -> NextcloudResult<reqwest::Url> {
        let mut segments = vec!["remote.php", "dav", "calendars", self.http.username()];
        segments.extend_from_slice(tail);
        self.http.url(&segments)
    }

    fn event_url(&self, calendar_name: &str, uid: &str) -> NextcloudResult<reqwest::Url> {
        self.url(&[calendar_name, &format!("{uid}.ics")])
    }

    async fn put_event(
        &self,
        calendar_name: &str,
        uid: &str,
        ics: String,
        guard: Guard,
    ) -> NextcloudResult<WriteReceipt> {
        let url = self.event_url(calendar_name, uid)?;
        let mut request = self
            .http
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, "text/calendar; charset=utf-8")
            .body(ics);
        request = match guard {
            Guard::Create => request.header(IF_NONE_MATCH, "*"),
            Guard::Match(Some(etag)) => request.header(IF_MATCH, http::quote_etag(&etag)),
            Guard::Match(None) => request,
        };
        let response = self.http.send(request).await?;
        Ok(WriteReceipt::from_response(&response).with_uid(uid))
    }
}

enum Guard {
    Create,
    Match(Option<String>),
}

#[async_trait]
impl CalendarApi for CalendarClient {
    async fn list_calendars(&self) -> NextcloudResult<Vec<Calendar>> {
        let url = self.url(&[""])?;
        let body = dav::propfind_body(
            "<d:displayname/><d:resourcetype/><cs:getctag/><x1:calendar-color/><cal:calendar-description/>",
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

        let calendars = dav::parse_multistatus(&response.text().await?)?
            .into_iter()
            .filter(|r| r.has_type("calendar"))
            .map(|r| {
                let name = r.name();
                Calendar {
                    display_name: r.prop("displayname").unwrap_or(&name).to_string(),
                    color: r.prop("calendar-color").map(str::to_string),
                    description: r.prop("calendar-description").map(str::to_string),
                    ctag: r.prop("getctag").map(str::to_string),
                    href: r.href,
                    name,
                }
            })
            .collect();
        Ok(calendars)
    }

    async fn list_events(
        &self,
        calendar_name: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Option<usize>,
    ) -> NextcloudResult<Vec<CalendarEvent>> {
        let start = start_date.map(EventTime::parse).transpose()?;
        let end = end_date.map(EventTime::parse).transpose()?.map(inclusive_end);

        let url = self.url(&[calendar_name, ""])?;
        let response = self
            .http
            .send(
                self.http
                    .request(http::dav_method("REPORT")?, url)
                    .header("Depth", "1")
                    .header(CONTENT_TYPE, "application/xml; charset=utf-8")
                    .body(calendar_query(start, end)),
            )
            .await?;

        let mut events = Vec::new();
        for r in dav::parse_multistatus(&response.text().await?)? {
            let Some(ics) = r.prop("calendar-data").map(str::to_string) else {
                continue;
            };
            let etag = r.etag();
            match CalendarEvent::from_ics(r.href, etag, ics) {
                Ok(event) => events.push(event),
                // VTODO and VJOURNAL objects share calendars with events
                Err(e) => tracing::debug!("skipping calendar object: {e}"),
            }
        }
        events.sort_by(|a, b| a.start.cmp(&b.start));
        if let Some(limit) = limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    async fn get_event(
        &self,
        calendar_name: &str,
        event_uid: &str,
    ) -> NextcloudResult<CalendarEvent> {
        let url = self.event_url(calendar_name, event_uid)?;
        let response = self.http.send(self.http.request(Method::GET, url)).await?;
        let etag = http::etag_header(&response);
        let href = response.url().path().to_string();
        CalendarEvent::from_ics(href, etag, response.text().await?)
    }

    async fn create_event(
        &self,
        calendar_name: &str,
        event_data: &EventData,
    ) -> NextcloudResult<WriteReceipt> {
        let uid = uuid::Uuid::new_v4().to_string();
        let ics = build_event(&uid, event_data)?;
        self.put_event(calendar_name, &uid, ics, Guard::Create).await
    }

    async fn update_event(
        &self,
        calendar_name: &str,
        event_uid: &str,
        event_data: &EventData,
        etag: &str,
    ) -> NextcloudResult<WriteReceipt> {
        let current = self.get_event(calendar_name, event_uid).await?;
        let merged = merge_event(&current.ics, event_data)?;
        let guard = if etag.trim().is_empty() {
            current.etag
        } else {
            Some(etag.to_string())
        };
        self.put_event(calendar_name, event_uid, merged, Guard::Match(guard))
            .await
    }

    async fn delete_event(
        &self,
        calendar_name: &str,
        event_uid: &str,
    ) -> NextcloudResult<WriteReceipt> {
        let url = self.event_url(calendar_name, event_uid)?;
        let response = self.http.send(self.http.request(Method::DELETE, url)).await?;
        Ok(WriteReceipt::from_response(&response).with_uid(event_uid))
    }
}

//! Minimal WebDAV `multistatus` reader shared by the files, CardDAV and
//! CalDAV namespaces.

use crate::error::{NextcloudError, NextcloudResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

pub const NS_DECLS: &str = r#"xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns" xmlns:nc="http://nextcloud.org/ns" xmlns:card="urn:ietf:params:xml:ns:carddav" xmlns:cal="urn:ietf:params:xml:ns:caldav" xmlns:cs="http://calendarserver.org/ns/" xmlns:x1="http://apple.com/ns/ical/""#;

/// One `<d:response>` element with the properties of its successful propstats
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DavResponse {
    pub href: String,
    /// Property values keyed by local name (namespace prefixes dropped)
    pub props: HashMap<String, String>,
    /// Local names found inside `<d:resourcetype>`
    pub resource_types: Vec<String>,
}

impl DavResponse {
    pub fn prop(&self, name: &str) -> Option<&str> {
        self.props
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_collection(&self) -> bool {
        self.has_type("collection")
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.resource_types.iter().any(|t| t == name)
    }

    /// Last non-empty path segment of the href, percent-decoded
    pub fn name(&self) -> String {
        let segment = self
            .href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        percent_decode(segment)
    }

    pub fn etag(&self) -> Option<String> {
        self.prop("getetag").map(str::to_string)
    }
}

/// Wrap a `<d:prop>` list in a PROPFIND request body
pub fn propfind_body(props: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><d:propfind {NS_DECLS}><d:prop>{props}</d:prop></d:propfind>"#
    )
}

/// Parse a `207 Multi-Status` body.
///
/// Only properties from propstats whose status is 200 are kept, so missing
/// properties (reported as 404 by Nextcloud) simply do not appear.
pub fn parse_multistatus(xml: &str) -> NextcloudResult<Vec<DavResponse>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut responses = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<DavResponse> = None;
    let mut pending_props: HashMap<String, String> = HashMap::new();
    let mut pending_types: Vec<String> = Vec::new();
    let mut propstat_ok = false;
    let mut text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| NextcloudError::InvalidResponse(format!("malformed multistatus: {e}")))?;

        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                match name.as_str() {
                    "response" => current = Some(DavResponse::default()),
                    "propstat" => {
                        pending_props.clear();
                        pending_types.clear();
                        propstat_ok = false;
                    }
                    _ => {}
                }
                stack.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                match stack.last().map(String::as_str) {
                    Some("resourcetype") => pending_types.push(name),
                    Some("prop") => {
                        pending_props.insert(name, String::new());
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                let value = t.unescape().map_err(|e| {
                    NextcloudError::InvalidResponse(format!("malformed multistatus text: {e}"))
                })?;
                text.push_str(&value);
            }
            Event::CData(c) => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                let parent = stack.last().map(String::as_str);
                match (name.as_str(), parent) {
                    ("href", Some("response")) => {
                        if let Some(response) = current.as_mut() {
                            response.href = text.trim().to_string();
                        }
                    }
                    ("status", Some("propstat")) => {
                        propstat_ok = text.split_whitespace().nth(1) == Some("200");
                    }
                    ("propstat", _) => {
                        if propstat_ok && let Some(response) = current.as_mut() {
                            response.props.extend(pending_props.drain());
                            response.resource_types.append(&mut pending_types);
                        }
                    }
                    ("response", _) => {
                        if let Some(response) = current.take() {
                            responses.push(response);
                        }
                    }
                    (_, Some("prop")) => {
                        pending_props.insert(name, text.clone());
                    }
                    _ => {}
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(responses)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Escape text for inclusion in an XML request body
pub fn escape(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}

pub(crate) fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Some(byte) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESSBOOKS: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav" xmlns:cs="http://calendarserver.org/ns/">
  <d:response>
    <d:href>/remote.php/dav/addressbooks/users/alice/</d:href>
    <d:propstat>
      <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
    <d:propstat>
      <d:prop><d:displayname/></d:prop>
      <d:status>HTTP/1.1 404 Not Found</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/remote.php/dav/addressbooks/users/alice/contacts%20work/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>Work &amp; Friends</d:displayname>
        <d:resourcetype><d:collection/><card:addressbook/></d:resourcetype>
        <cs:getctag>42</cs:getctag>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn test_parse_addressbook_listing() {
        let responses = parse_multistatus(ADDRESSBOOKS).unwrap();
        assert_eq!(responses.len(), 2);

        let home = &responses[0];
        assert!(home.is_collection());
        assert!(!home.has_type("addressbook"));
        assert_eq!(home.prop("displayname"), None);

        let book = &responses[1];
        assert_eq!(book.name(), "contacts work");
        assert_eq!(book.prop("displayname"), Some("Work & Friends"));
        assert_eq!(book.prop("getctag"), Some("42"));
        assert!(book.has_type("addressbook"));
    }

    #[test]
    fn test_parse_cdata_and_etag() {
        let xml = r#"<d:multistatus xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav">
  <d:response>
    <d:href>/remote.php/dav/calendars/alice/personal/abc.ics</d:href>
    <d:propstat>
      <d:prop>
        <d:getetag>"e1"</d:getetag>
        <cal:calendar-data><![CDATA[BEGIN:VCALENDAR
END:VCALENDAR]]></cal:calendar-data>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;
        let responses = parse_multistatus(xml).unwrap();
        assert_eq!(responses[0].etag().as_deref(), Some("\"e1\""));
        assert!(
            responses[0]
                .prop("calendar-data")
                .unwrap()
                .starts_with("BEGIN:VCALENDAR")
        );
        assert_eq!(responses[0].name(), "abc.ics");
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = parse_multistatus("<d:multistatus xmlns:d=\"DAV:\"><d:response></d:multistatus>")
            .unwrap_err();
        assert!(matches!(err, NextcloudError::InvalidResponse(_)));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("a%20b%C3%A9"), "a bé");
        assert_eq!(percent_decode("100%"), "100%");
    }

    #[test]
    fn test_propfind_body_declares_namespaces() {
        let body = propfind_body("<d:getetag/>");
        assert!(body.contains("xmlns:d=\"DAV:\""));
        assert!(body.contains("<d:prop><d:getetag/></d:prop>"));
    }
}

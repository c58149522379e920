use super::content_line::{self, ContentLine};
use super::dav::{self, DavResponse};
use super::http::{self, NextcloudHttp};
use super::{ContactsApi, WriteReceipt};
use crate::error::{NextcloudError, NextcloudResult};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, IF_MATCH, IF_NONE_MATCH};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Properties managed by the server or the vCard envelope itself
const RESERVED_PROPERTIES: &[&str] = &["BEGIN", "END", "VERSION", "UID", "REV", "PRODID"];

/// A CardDAV addressbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddressBook {
    pub name: String,
    pub display_name: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctag: Option<String>,
}

/// A contact as stored on the server, with the common vCard fields lifted out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Contact {
    pub uid: String,
    pub href: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default, rename = "fn")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// The raw vCard
    pub vcard: String,
}

/// Contact fields to write; anything not listed becomes an extra vCard property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContactData {
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Formatted full name, e.g. \"John Doe\"")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Email address")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Telephone number")]
    pub tel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Organization")]
    pub org: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Job title")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Free-form note")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Nickname")]
    pub nickname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Website URL")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Birthday (YYYY-MM-DD)")]
    pub bday: Option<String>,

    /// Additional vCard properties by name, e.g. {"x-twitter": "@jane"}
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ContactData {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.tel.is_none()
            && self.org.is_none()
            && self.title.is_none()
            && self.note.is_none()
            && self.nickname.is_none()
            && self.url.is_none()
            && self.bday.is_none()
            && self.extra.is_empty()
    }

    /// Reject property names that cannot be written as vCard content lines
    pub fn validate(&self) -> NextcloudResult<()> {
        for name in self.extra.keys() {
            if !content_line::is_valid_name(name) {
                return Err(NextcloudError::InvalidArgument(format!(
                    "invalid vCard property name {name:?}"
                )));
            }
            if RESERVED_PROPERTIES.contains(&name.to_ascii_uppercase().as_str()) {
                return Err(NextcloudError::InvalidArgument(format!(
                    "vCard property {name} cannot be set directly"
                )));
            }
        }
        Ok(())
    }

    fn to_lines(&self) -> NextcloudResult<Vec<ContentLine>> {
        self.validate()?;

        let mut lines = Vec::new();
        if let Some(v) = &self.full_name {
            lines.push(ContentLine::text("FN", v));
        }
        if let Some(v) = &self.email {
            lines.push(ContentLine::text("EMAIL", v).with_params("TYPE=INTERNET"));
        }
        if let Some(v) = &self.tel {
            lines.push(ContentLine::text("TEL", v));
        }
        if let Some(v) = &self.org {
            lines.push(ContentLine::text("ORG", v));
        }
        if let Some(v) = &self.title {
            lines.push(ContentLine::text("TITLE", v));
        }
        if let Some(v) = &self.note {
            lines.push(ContentLine::text("NOTE", v));
        }
        if let Some(v) = &self.nickname {
            lines.push(ContentLine::text("NICKNAME", v));
        }
        if let Some(v) = &self.url {
            lines.push(ContentLine::new("URL", v.clone()));
        }
        if let Some(v) = &self.bday {
            lines.push(ContentLine::new("BDAY", v.clone()));
        }
        for (name, value) in &self.extra {
            lines.push(ContentLine::text(name.clone(), value));
        }
        Ok(lines)
    }
}

/// Build a new vCard 3.0 document
fn build_vcard(uid: &str, data: &ContactData) -> NextcloudResult<String> {
    let full_name = data
        .full_name
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| NextcloudError::InvalidArgument("contact_data.fn is required".into()))?;

    let mut lines = vec![
        ContentLine::new("BEGIN", "VCARD"),
        ContentLine::new("VERSION", "3.0"),
        ContentLine::text("UID", uid),
    ];
    let fields = data.to_lines()?;
    if !fields.iter().any(|l| l.name == "N") {
        lines.push(ContentLine::new("N", structured_name(full_name)));
    }
    lines.extend(fields);
    lines.push(ContentLine::new("END", "VCARD"));
    Ok(content_line::render_all(&lines))
}

/// `N` value derived from a formatted name: family;given;;;
fn structured_name(full_name: &str) -> String {
    let mut parts: Vec<&str> = full_name.split_whitespace().collect();
    let family = parts.pop().unwrap_or_default();
    format!(
        "{};{};;;",
        content_line::escape_text(family),
        content_line::escape_text(&parts.join(" "))
    )
}

/// Replace the supplied properties in an existing vCard, keeping everything else
fn merge_vcard(existing: &str, data: &ContactData) -> NextcloudResult<String> {
    let updates = data.to_lines()?;
    let mut lines = content_line::parse_all(existing);

    let end = lines
        .iter()
        .rposition(|l| l.name == "END" && l.value.eq_ignore_ascii_case("VCARD"))
        .ok_or_else(|| {
            NextcloudError::InvalidResponse("stored contact is not a vCard".to_string())
        })?;
    lines.truncate(end);

    lines.retain(|l| !updates.iter().any(|u| u.name == l.name));
    lines.extend(updates);
    lines.push(ContentLine::new("END", "VCARD"));
    Ok(content_line::render_all(&lines))
}

impl Contact {
    fn from_vcard(href: String, etag: Option<String>, vcard: String) -> Self {
        let lines = content_line::parse_all(&vcard);
        let first = |name: &str| {
            lines
                .iter()
                .find(|l| l.name == name)
                .map(ContentLine::unescaped)
        };
        let all = |name: &str| {
            lines
                .iter()
                .filter(|l| l.name == name)
                .map(ContentLine::unescaped)
                .collect::<Vec<_>>()
        };

        let uid = first("UID").unwrap_or_else(|| {
            let file = dav::DavResponse {
                href: href.clone(),
                ..Default::default()
            }
            .name();
            file.trim_end_matches(".vcf").to_string()
        });

        Contact {
            uid,
            etag,
            full_name: first("FN"),
            emails: all("EMAIL"),
            phones: all("TEL"),
            org: first("ORG"),
            title: first("TITLE"),
            nickname: first("NICKNAME"),
            birthday: first("BDAY"),
            note: first("NOTE"),
            href,
            vcard,
        }
    }
}

pub struct ContactsClient {
    http: Arc<NextcloudHttp>,
}

impl ContactsClient {
    pub fn new(http: Arc<NextcloudHttp>) -> Self {
        Self { http }
    }

    fn url(&self, tail: &[&str]) -> NextcloudResult<reqwest::Url> {
        let mut segments = vec![
            "remote.php",
            "dav",
            "addressbooks",
            "users",
            self.http.username(),
        ];
        segments.extend_from_slice(tail);
        self.http.url(&segments)
    }

    fn card_url(&self, addressbook: &str, uid: &str) -> NextcloudResult<reqwest::Url> {
        self.url(&[addressbook, &format!("{uid}.vcf")])
    }

    async fn fetch_card(
        &self,
        addressbook: &str,
        uid: &str,
    ) -> NextcloudResult<(String, Option<String>)> {
        let url = self.card_url(addressbook, uid)?;
        let response = self.http.send(self.http.request(Method::GET, url)).await?;
        let etag = http::etag_header(&response);
        Ok((response.text().await?, etag))
    }
}

#[async_trait]
impl ContactsApi for ContactsClient {
    async fn list_addressbooks(&self) -> NextcloudResult<Vec<AddressBook>> {
        let url = self.url(&[""])?;
        let body = dav::propfind_body("<d:displayname/><d:resourcetype/><cs:getctag/>");
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

        let books = dav::parse_multistatus(&response.text().await?)?
            .into_iter()
            .filter(|r| r.has_type("addressbook"))
            .map(|r: DavResponse| {
                let name = r.name();
                AddressBook {
                    display_name: r.prop("displayname").unwrap_or(&name).to_string(),
                    ctag: r.prop("getctag").map(str::to_string),
                    href: r.href,
                    name,
                }
            })
            .collect();
        Ok(books)
    }

    async fn list_contacts(&self, addressbook: &str) -> NextcloudResult<Vec<Contact>> {
        let url = self.url(&[addressbook, ""])?;
        let body = format!(
            r#"<?xml version="1.0" encoding="utf-8"?><card:addressbook-query {}><d:prop><d:getetag/><card:address-data/></d:prop></card:addressbook-query>"#,
            dav::NS_DECLS
        );
        let response = self
            .http
            .send(
                self.http
                    .request(http::dav_method("REPORT")?, url)
                    .header("Depth", "1")
                    .header(CONTENT_TYPE, "application/xml; charset=utf-8")
                    .body(body),
            )
            .await?;

        let contacts = dav::parse_multistatus(&response.text().await?)?
            .into_iter()
            .filter_map(|r| {
                let vcard = r.prop("address-data")?.to_string();
                let etag = r.etag();
                Some(Contact::from_vcard(r.href, etag, vcard))
            })
            .collect();
        Ok(contacts)
    }

    async fn create_addressbook(
        &self,
        name: &str,
        display_name: &str,
    ) -> NextcloudResult<WriteReceipt> {
        let url = self.url(&[name, ""])?;
        let body = format!(
            r#"<?xml version="1.0" encoding="utf-8"?><d:mkcol {}><d:set><d:prop><d:resourcetype><d:collection/><card:addressbook/></d:resourcetype><d:displayname>{}</d:displayname></d:prop></d:set></d:mkcol>"#,
            dav::NS_DECLS,
            dav::escape(display_name)
        );
        let response = self
            .http
            .send(
                self.http
                    .request(http::dav_method("MKCOL")?, url)
                    .header(CONTENT_TYPE, "application/xml; charset=utf-8")
                    .body(body),
            )
            .await?;
        Ok(WriteReceipt::from_response(&response))
    }

    async fn delete_addressbook(&self, name: &str) -> NextcloudResult<WriteReceipt> {
        let url = self.url(&[name, ""])?;
        let response = self.http.send(self.http.request(Method::DELETE, url)).await?;
        Ok(WriteReceipt::from_response(&response))
    }

    async fn create_contact(
        &self,
        addressbook: &str,
        uid: &str,
        contact_data: &ContactData,
    ) -> NextcloudResult<WriteReceipt> {
        let vcard = build_vcard(uid, contact_data)?;
        let url = self.card_url(addressbook, uid)?;
        let response = self
            .http
            .send(
                self.http
                    .request(Method::PUT, url)
                    .header(IF_NONE_MATCH, "*")
                    .header(CONTENT_TYPE, "text/vcard; charset=utf-8")
                    .body(vcard),
            )
            .await?;
        Ok(WriteReceipt::from_response(&response).with_uid(uid))
    }

    async fn delete_contact(&self, addressbook: &str, uid: &str) -> NextcloudResult<WriteReceipt> {
        let url = self.card_url(addressbook, uid)?;
        let response = self.http.send(self.http.request(Method::DELETE, url)).await?;
        Ok(WriteReceipt::from_response(&response).with_uid(uid))
    }

    async fn update_contact(
        &self,
        addressbook: &str,
        uid: &str,
        contact_data: &ContactData,
        etag: &str,
    ) -> NextcloudResult<WriteReceipt> {
        let (current, current_etag) = self.fetch_card(addressbook, uid).await?;
        let merged = merge_vcard(&current, contact_data)?;

        let guard = if etag.trim().is_empty() {
            current_etag
        } else {
            Some(etag.to_string())
        };

        let url = self.card_url(addressbook, uid)?;
        let mut request = self
            .http
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, "text/vcard; charset=utf-8")
            .body(merged);
        if let Some(guard) = guard {
            request = request.header(IF_MATCH, http::quote_etag(&guard));
        }

        let response = self.http.send(request).await?;
        Ok(WriteReceipt::from_response(&response).with_uid(uid))
    }
}

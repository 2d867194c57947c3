//! Zotero Web API v3 client.
//!
//! Items are looked up by their `sift:<id>` tag before any creation, and
//! creations carry a write token derived from the same key, so a retried
//! write is answered with 412 and resolved by a second lookup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use md5::{Digest, Md5};
use serde::Deserialize;
use serde_json::{Value, json};
use sift_config::ZoteroConfig;
use tokio::sync::Mutex;

use crate::ReferenceManager;
use crate::error::ReferenceError;
use crate::http::check_response;
use crate::item::{Attachment, ItemMetadata, key_tag};

const API_VERSION: &str = "3";

pub struct ZoteroClient {
    http: reqwest::Client,
    library_url: String,
    api_key: String,
    /// Collection name → key, filled lazily.
    collections: Mutex<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct ItemSummary {
    key: String,
}

#[derive(Deserialize)]
struct CollectionSummary {
    key: String,
    data: CollectionData,
}

#[derive(Deserialize)]
struct CollectionData {
    name: String,
}

/// Child of an item (`GET /items/{key}/children`).
#[derive(Deserialize)]
struct ChildItem {
    data: ChildData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildData {
    item_type: String,
    #[serde(default)]
    link_mode: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

impl ChildData {
    fn into_attachment(self) -> Option<Attachment> {
        if self.item_type != "attachment" {
            return None;
        }
        match self.link_mode.as_deref() {
            Some("imported_file" | "imported_url") => self
                .filename
                .map(|filename| Attachment::Uploaded { filename }),
            Some("linked_file") => self.path.map(|path| Attachment::Linked {
                path: PathBuf::from(path),
            }),
            _ => None,
        }
    }
}

/// Response to a batch write (`POST /items`, `POST /collections`).
#[derive(Deserialize, Default)]
struct WriteResponse {
    #[serde(default)]
    successful: HashMap<String, ItemSummary>,
    #[serde(default)]
    failed: HashMap<String, WriteFailure>,
}

#[derive(Deserialize)]
struct WriteFailure {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// Response to an upload authorization request.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadAuthorization {
    #[serde(default)]
    exists: Option<u8>,
    url: Option<String>,
    content_type: Option<String>,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    suffix: String,
    upload_key: Option<String>,
}

impl ZoteroClient {
    /// # Errors
    ///
    /// Returns [`ReferenceError::Configuration`] when the key or library id
    /// is missing, or [`ReferenceError::Http`] if the client fails to build.
    pub fn new(config: &ZoteroConfig, user_agent: &str) -> Result<Self, ReferenceError> {
        if !config.is_configured() {
            return Err(sift_config::ConfigError::NotConfigured {
                section: "zotero (set SIFT_ZOTERO__API_KEY and SIFT_ZOTERO__LIBRARY_ID)".into(),
            }
            .into());
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            http,
            library_url: format!(
                "{}/{}/{}",
                config.base_url.trim().trim_end_matches('/'),
                config.library_type.path_segment(),
                config.library_id.trim()
            ),
            api_key: config.api_key.clone(),
            collections: Mutex::new(HashMap::new()),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{path}", self.library_url))
            .header("Zotero-API-Key", &self.api_key)
            .header("Zotero-API-Version", API_VERSION)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{path}", self.library_url))
            .header("Zotero-API-Key", &self.api_key)
            .header("Zotero-API-Version", API_VERSION)
    }

    async fn find_by_tag(&self, tag: &str) -> Result<Option<String>, ReferenceError> {
        let path = format!(
            "/items?tag={}&limit=1&format=json",
            urlencoding::encode(tag)
        );
        let resp = check_response(self.get(&path).send().await?).await?;
        let items: Vec<ItemSummary> = resp
            .json()
            .await
            .map_err(|e| ReferenceError::Parse(e.to_string()))?;
        Ok(items.into_iter().next().map(|i| i.key))
    }

    /// Resolve a collection by name, creating it when absent.
    async fn collection_key(&self, name: &str) -> Result<String, ReferenceError> {
        let mut known = self.collections.lock().await;
        if let Some(key) = known.get(name) {
            return Ok(key.clone());
        }

        let mut start = 0usize;
        loop {
            let path = format!("/collections?limit=100&start={start}&format=json");
            let resp = check_response(self.get(&path).send().await?).await?;
            let page: Vec<CollectionSummary> = resp
                .json()
                .await
                .map_err(|e| ReferenceError::Parse(e.to_string()))?;
            let count = page.len();
            for c in page {
                known.entry(c.data.name).or_insert(c.key);
            }
            if let Some(key) = known.get(name) {
                return Ok(key.clone());
            }
            if count < 100 {
                break;
            }
            start += count;
        }

        let key = self.write_one("/collections", &json!({ "name": name }), None).await?;
        tracing::info!(collection = %name, %key, "created collection");
        known.insert(name.to_string(), key.clone());
        Ok(key)
    }

    /// POST a single object and return the key it was stored under.
    async fn write_one(
        &self,
        path: &str,
        object: &Value,
        write_token: Option<&str>,
    ) -> Result<String, ReferenceError> {
        let mut req = self.post(path).json(&[object]);
        if let Some(token) = write_token {
            req = req.header("Zotero-Write-Token", token);
        }
        let resp = check_response(req.send().await?).await?;
        let body: WriteResponse = resp
            .json()
            .await
            .map_err(|e| ReferenceError::Parse(e.to_string()))?;
        single_key(body)
    }

    async fn add_note(&self, parent_key: &str, html: &str) -> Result<String, ReferenceError> {
        let note = json!({
            "itemType": "note",
            "parentItem": parent_key,
            "note": html,
            "tags": [],
        });
        self.write_one("/items", &note, None).await
    }

    async fn post_file_form(&self, attachment_key: &str, form: &str) -> Result<reqwest::Response, ReferenceError> {
        let resp = self
            .post(&format!("/items/{attachment_key}/file"))
            .header("If-None-Match", "*")
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form.to_string())
            .send()
            .await?;
        check_response(resp).await
    }
}

fn single_key(body: WriteResponse) -> Result<String, ReferenceError> {
    if let Some(item) = body.successful.get("0") {
        return Ok(item.key.clone());
    }
    let message = body
        .failed
        .get("0")
        .map_or_else(|| "empty write response".to_string(), |f| format!("{} {}", f.code, f.message));
    Err(ReferenceError::Rejected { message })
}

/// Write token for an idempotency key: 32 hex characters.
fn write_token(paper_id: &str) -> String {
    hex::encode(Md5::digest(key_tag(paper_id).as_bytes()))
}

fn upload_form(filename: &str, bytes: &[u8], mtime_ms: i64) -> String {
    format!(
        "md5={}&filename={}&filesize={}&mtime={mtime_ms}",
        hex::encode(Md5::digest(bytes)),
        urlencoding::encode(filename),
        bytes.len()
    )
}

impl ReferenceManager for ZoteroClient {
    async fn find_or_create_item(
        &self,
        paper_id: &str,
        metadata: &ItemMetadata,
        collection: &str,
    ) -> Result<String, ReferenceError> {
        let tag = key_tag(paper_id);
        if let Some(key) = self.find_by_tag(&tag).await? {
            tracing::debug!(paper = %paper_id, %key, "reference item already exists");
            return Ok(key);
        }

        let collection_key = if collection.trim().is_empty() {
            None
        } else {
            Some(self.collection_key(collection.trim()).await?)
        };
        let item = metadata.to_item_json(paper_id, collection_key.as_deref());

        let key = match self
            .write_one("/items", &item, Some(&write_token(paper_id)))
            .await
        {
            Ok(key) => key,
            Err(ReferenceError::Conflict { message }) => {
                tracing::debug!(paper = %paper_id, "write token already used, looking up item");
                return self
                    .find_by_tag(&tag)
                    .await?
                    .ok_or(ReferenceError::Conflict { message });
            }
            Err(e) => return Err(e),
        };
        tracing::info!(paper = %paper_id, %key, "created reference item");

        if let Some(html) = &metadata.note_html {
            if let Err(e) = self.add_note(&key, html).await {
                tracing::warn!(paper = %paper_id, %key, %e, "failed to attach analysis note");
            }
        }
        Ok(key)
    }

    async fn attachments(&self, item_key: &str) -> Result<Vec<Attachment>, ReferenceError> {
        let path = format!("/items/{item_key}/children?limit=100&format=json");
        let resp = check_response(self.get(&path).send().await?).await?;
        let children: Vec<ChildItem> = resp
            .json()
            .await
            .map_err(|e| ReferenceError::Parse(e.to_string()))?;
        Ok(children
            .into_iter()
            .filter_map(|c| c.data.into_attachment())
            .collect())
    }

    async fn upload_attachment(
        &self,
        item_key: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), ReferenceError> {
        let attachment = json!({
            "itemType": "attachment",
            "parentItem": item_key,
            "linkMode": "imported_file",
            "title": filename,
            "filename": filename,
            "contentType": "application/pdf",
            "tags": [],
        });
        let attachment_key = self.write_one("/items", &attachment, None).await?;

        let form = upload_form(filename, bytes, chrono::Utc::now().timestamp_millis());
        let auth: UploadAuthorization = self
            .post_file_form(&attachment_key, &form)
            .await?
            .json()
            .await
            .map_err(|e| ReferenceError::Parse(e.to_string()))?;
        if auth.exists == Some(1) {
            return Ok(());
        }

        let (Some(url), Some(upload_key)) = (auth.url, auth.upload_key) else {
            return Err(ReferenceError::Parse(
                "upload authorization without url or uploadKey".into(),
            ));
        };
        let mut body = Vec::with_capacity(auth.prefix.len() + bytes.len() + auth.suffix.len());
        body.extend_from_slice(auth.prefix.as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(auth.suffix.as_bytes());
        let resp = self
            .http
            .post(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                auth.content_type.as_deref().unwrap_or("application/pdf"),
            )
            .body(body)
            .send()
            .await?;
        check_response(resp).await?;

        self.post_file_form(&attachment_key, &format!("upload={}", urlencoding::encode(&upload_key)))
            .await?;
        tracing::info!(%item_key, %attachment_key, "uploaded PDF attachment");
        Ok(())
    }

    async fn link_attachment(&self, item_key: &str, path: &Path) -> Result<(), ReferenceError> {
        let title = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let attachment = json!({
            "itemType": "attachment",
            "parentItem": item_key,
            "linkMode": "linked_file",
            "title": title,
            "path": path.to_string_lossy(),
            "contentType": "application/pdf",
            "tags": [],
        });
        self.write_one("/items", &attachment, None).await?;
        Ok(())
    }
}

//! Google Drive and Docs API clients for document discovery and content.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";

const DOCUMENT_FIELDS: &str =
    "files(id,name,modifiedTime,owners,lastModifyingUser,webViewLink)";

/// A Google Doc discovered via Drive listing
#[derive(Debug, Clone)]
pub struct DriveDocument {
    pub id: String,
    pub name: String,
    pub modified_time: DateTime<Utc>,
    pub web_link: String,
    pub owners: Vec<String>,
    pub last_modifier: String,
}

/// Extracted plain-text body of a Google Doc
#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub id: String,
    pub title: String,
    pub content: String,
    pub word_count: usize,
    pub char_count: usize,
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    id: String,
    #[serde(default)]
    name: String,
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    web_view_link: String,
    #[serde(default)]
    owners: Vec<RawUserRef>,
    last_modifying_user: Option<RawUserRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserRef {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    email_address: String,
}

impl RawUserRef {
    fn label(&self) -> String {
        if !self.display_name.is_empty() {
            self.display_name.clone()
        } else {
            self.email_address.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    title: String,
    body: Option<RawDocBody>,
}

#[derive(Debug, Deserialize)]
struct RawDocBody {
    #[serde(default)]
    content: Vec<RawStructuralElement>,
}

#[derive(Debug, Deserialize)]
struct RawStructuralElement {
    paragraph: Option<RawParagraph>,
}

#[derive(Debug, Deserialize)]
struct RawParagraph {
    #[serde(default)]
    elements: Vec<RawParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParagraphElement {
    text_run: Option<RawTextRun>,
}

#[derive(Debug, Deserialize)]
struct RawTextRun {
    #[serde(default)]
    content: String,
}

/// Client for Drive file listings and Docs content, scoped to one access token
pub struct DriveClient {
    http: reqwest::Client,
    access_token: String,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, access_token: String) -> Self {
        Self { http, access_token }
    }

    /// Google Docs modified within the lookback window, newest first.
    pub async fn list_recent_documents(&self, days: i64) -> Result<Vec<DriveDocument>> {
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();
        let query = format!(
            "mimeType='application/vnd.google-apps.document' and modifiedTime > '{}'",
            cutoff
        );
        self.list_documents(&query).await
    }

    /// Docs shared with the user and modified within the lookback window.
    pub async fn list_shared_documents(&self, days: i64) -> Result<Vec<DriveDocument>> {
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();
        let query = format!(
            "mimeType='application/vnd.google-apps.document' and modifiedTime > '{}' and sharedWithMe",
            cutoff
        );
        self.list_documents(&query).await
    }

    async fn list_documents(&self, query: &str) -> Result<Vec<DriveDocument>> {
        let url = format!("{}/files", DRIVE_API_BASE);

        let response: FileListResponse = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", query),
                ("orderBy", "modifiedTime desc"),
                ("pageSize", "50"),
                ("fields", DOCUMENT_FIELDS),
            ])
            .send()
            .await
            .context("Drive file listing request failed")?
            .error_for_status()
            .context("Drive file listing rejected")?
            .json()
            .await
            .context("Invalid Drive file listing response")?;

        let documents = response
            .files
            .into_iter()
            .filter_map(|file| {
                let modified_time = file.modified_time?;
                Some(DriveDocument {
                    id: file.id,
                    name: file.name,
                    modified_time,
                    web_link: file.web_view_link,
                    owners: file.owners.iter().map(RawUserRef::label).collect(),
                    last_modifier: file
                        .last_modifying_user
                        .as_ref()
                        .map(RawUserRef::label)
                        .unwrap_or_default(),
                })
            })
            .collect();

        Ok(documents)
    }

    /// Fetch a document body and flatten its paragraph text runs.
    pub async fn get_document_content(&self, document_id: &str) -> Result<DocumentContent> {
        let url = format!("{}/documents/{}", DOCS_API_BASE, document_id);

        let doc: RawDocument = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Docs content request failed for {}", document_id))?
            .error_for_status()
            .with_context(|| format!("Docs content rejected for {}", document_id))?
            .json()
            .await
            .context("Invalid Docs content response")?;

        let content = flatten_document_text(&doc);
        let word_count = content.split_whitespace().count();
        let char_count = content.chars().count();

        Ok(DocumentContent {
            id: document_id.to_string(),
            title: doc.title,
            content,
            word_count,
            char_count,
        })
    }
}

fn flatten_document_text(doc: &RawDocument) -> String {
    let mut text = String::new();

    if let Some(body) = &doc.body {
        for element in &body.content {
            if let Some(paragraph) = &element.paragraph {
                for pe in &paragraph.elements {
                    if let Some(run) = &pe.text_run {
                        text.push_str(&run.content);
                    }
                }
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_paragraph_text_runs() {
        let doc: RawDocument = serde_json::from_value(serde_json::json!({
            "title": "Q3 Plan",
            "body": {
                "content": [
                    {"paragraph": {"elements": [
                        {"textRun": {"content": "Hello "}},
                        {"textRun": {"content": "world.\n"}}
                    ]}},
                    {"sectionBreak": {}},
                    {"paragraph": {"elements": [
                        {"textRun": {"content": "Second paragraph.\n"}}
                    ]}}
                ]
            }
        }))
        .expect("valid doc");

        let text = flatten_document_text(&doc);
        assert_eq!(text, "Hello world.\nSecond paragraph.\n");
        assert_eq!(text.split_whitespace().count(), 4);
    }

    #[test]
    fn empty_body_flattens_to_empty_string() {
        let doc: RawDocument =
            serde_json::from_value(serde_json::json!({"title": "Empty"})).expect("valid doc");
        assert_eq!(flatten_document_text(&doc), "");
    }

    #[test]
    fn user_ref_prefers_display_name() {
        let named = RawUserRef {
            display_name: "Dana".to_string(),
            email_address: "dana@corp.com".to_string(),
        };
        assert_eq!(named.label(), "Dana");

        let anon = RawUserRef {
            display_name: String::new(),
            email_address: "ops@corp.com".to_string(),
        };
        assert_eq!(anon.label(), "ops@corp.com");
    }
}

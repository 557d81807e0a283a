//! Document ranking across the three discovery channels.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::google::calendar::CalendarEvent;
use crate::google::drive::DriveDocument;

/// Channel through which a document entered the ranked set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    Recent,
    Shared,
    CalendarAttachment,
}

impl DocumentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSource::Recent => "recent",
            DocumentSource::Shared => "shared",
            DocumentSource::CalendarAttachment => "calendar_attachment",
        }
    }
}

/// A document with its accumulated priority across discovery channels
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    pub modified_time: DateTime<Utc>,
    pub web_link: String,
    pub owners: Vec<String>,
    pub last_modifier: String,
    pub priority_score: i32,
    pub sources: Vec<DocumentSource>,
}

impl DocumentRecord {
    fn from_drive(doc: DriveDocument, score: i32, source: DocumentSource) -> Self {
        DocumentRecord {
            id: doc.id,
            name: doc.name,
            modified_time: doc.modified_time,
            web_link: doc.web_link,
            owners: doc.owners,
            last_modifier: doc.last_modifier,
            priority_score: score,
            sources: vec![source],
        }
    }

    pub fn is_shared(&self) -> bool {
        self.sources.contains(&DocumentSource::Shared)
    }

    pub fn is_calendar_attachment(&self) -> bool {
        self.sources.contains(&DocumentSource::CalendarAttachment)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrioritizerOptions {
    /// Also rank documents that only appear as calendar attachments and
    /// were not found by either Drive listing
    pub include_attachment_only: bool,
}

/// Merge the discovery channels into one ranked list.
///
/// Scores accumulate per channel: recent 1, shared 2, calendar
/// attachment 3 per attaching event. Ties break on modification time,
/// newest first.
pub fn prioritize_documents(
    recent: Vec<DriveDocument>,
    shared: Vec<DriveDocument>,
    events: &[CalendarEvent],
    options: PrioritizerOptions,
) -> Vec<DocumentRecord> {
    let mut by_id: HashMap<String, DocumentRecord> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for doc in recent {
        let id = doc.id.clone();
        by_id.insert(
            id.clone(),
            DocumentRecord::from_drive(doc, 1, DocumentSource::Recent),
        );
        order.push(id);
    }

    for doc in shared {
        match by_id.get_mut(&doc.id) {
            Some(record) => {
                record.priority_score += 2;
                record.sources.push(DocumentSource::Shared);
            }
            None => {
                let id = doc.id.clone();
                by_id.insert(
                    id.clone(),
                    DocumentRecord::from_drive(doc, 2, DocumentSource::Shared),
                );
                order.push(id);
            }
        }
    }

    for event in events {
        for attachment in &event.attachments {
            let Some(doc_id) = extract_doc_id(&attachment.file_url) else {
                continue;
            };
            match by_id.get_mut(doc_id) {
                Some(record) => {
                    record.priority_score += 3;
                    if !record.is_calendar_attachment() {
                        record.sources.push(DocumentSource::CalendarAttachment);
                    }
                }
                None if options.include_attachment_only => {
                    let record = DocumentRecord {
                        id: doc_id.to_string(),
                        name: attachment.title.clone(),
                        modified_time: event.start_time,
                        web_link: attachment.file_url.clone(),
                        owners: Vec::new(),
                        last_modifier: String::new(),
                        priority_score: 3,
                        sources: vec![DocumentSource::CalendarAttachment],
                    };
                    by_id.insert(doc_id.to_string(), record);
                    order.push(doc_id.to_string());
                }
                None => {}
            }
        }
    }

    let mut ranked: Vec<DocumentRecord> = order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect();
    ranked.sort_by(|a, b| {
        (b.priority_score, b.modified_time).cmp(&(a.priority_score, a.modified_time))
    });
    ranked
}

/// Pull the document id out of a Docs URL, if the URL is one.
pub fn extract_doc_id(url: &str) -> Option<&str> {
    if !url.contains("docs.google.com") {
        return None;
    }
    let rest = url.split("/document/d/").nth(1)?;
    let id = rest.split('/').next().unwrap_or(rest);
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::calendar::{CalendarRef, ConferenceInfo, EventAttachment};
    use chrono::TimeZone;

    fn doc(id: &str, minute: u32) -> DriveDocument {
        DriveDocument {
            id: id.to_string(),
            name: format!("Doc {}", id),
            modified_time: Utc.with_ymd_and_hms(2025, 6, 2, 8, minute, 0).unwrap(),
            web_link: format!("https://docs.google.com/document/d/{}/edit", id),
            owners: vec!["Owner".to_string()],
            last_modifier: "Owner".to_string(),
        }
    }

    fn event_with_attachment(url: &str) -> CalendarEvent {
        CalendarEvent {
            id: "evt".to_string(),
            title: "Review".to_string(),
            description: String::new(),
            start_time: Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            is_all_day: false,
            location: String::new(),
            calendar: CalendarRef::primary_fallback(),
            attendees: Vec::new(),
            attachments: vec![EventAttachment {
                title: "Agenda".to_string(),
                file_url: url.to_string(),
                mime_type: "application/vnd.google-apps.document".to_string(),
            }],
            conference: ConferenceInfo::default(),
            status: "confirmed".to_string(),
        }
    }

    #[test]
    fn recent_and_shared_accumulate() {
        let ranked = prioritize_documents(
            vec![doc("a", 0)],
            vec![doc("a", 0), doc("b", 1)],
            &[],
            PrioritizerOptions::default(),
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[0].priority_score, 3);
        assert_eq!(
            ranked[0].sources,
            vec![DocumentSource::Recent, DocumentSource::Shared]
        );
        assert_eq!(ranked[1].id, "b");
        assert_eq!(ranked[1].priority_score, 2);
    }

    #[test]
    fn attachment_boosts_known_document() {
        let events = vec![event_with_attachment(
            "https://docs.google.com/document/d/a/edit",
        )];
        let ranked = prioritize_documents(
            vec![doc("a", 0)],
            vec![],
            &events,
            PrioritizerOptions::default(),
        );

        assert_eq!(ranked[0].priority_score, 4);
        assert!(ranked[0].is_calendar_attachment());
    }

    #[test]
    fn attachment_only_docs_excluded_by_default() {
        let events = vec![event_with_attachment(
            "https://docs.google.com/document/d/z/edit",
        )];
        let ranked = prioritize_documents(vec![], vec![], &events, PrioritizerOptions::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn attachment_only_docs_included_when_enabled() {
        let events = vec![event_with_attachment(
            "https://docs.google.com/document/d/z/edit",
        )];
        let ranked = prioritize_documents(
            vec![],
            vec![],
            &events,
            PrioritizerOptions {
                include_attachment_only: true,
            },
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "z");
        assert_eq!(ranked[0].priority_score, 3);
        assert_eq!(ranked[0].name, "Agenda");
    }

    #[test]
    fn repeated_attachments_accumulate_score_with_one_tag() {
        let events = vec![
            event_with_attachment("https://docs.google.com/document/d/a/edit"),
            event_with_attachment("https://docs.google.com/document/d/a/view"),
        ];
        let ranked = prioritize_documents(
            vec![doc("a", 0)],
            vec![],
            &events,
            PrioritizerOptions::default(),
        );
        assert_eq!(ranked[0].priority_score, 7);
        assert_eq!(
            ranked[0].sources,
            vec![DocumentSource::Recent, DocumentSource::CalendarAttachment]
        );
    }

    #[test]
    fn ties_break_on_modified_time() {
        let ranked = prioritize_documents(
            vec![doc("old", 0), doc("new", 30)],
            vec![],
            &[],
            PrioritizerOptions::default(),
        );
        assert_eq!(ranked[0].id, "new");
        assert_eq!(ranked[1].id, "old");
    }

    #[test]
    fn extract_doc_id_handles_shapes() {
        assert_eq!(
            extract_doc_id("https://docs.google.com/document/d/abc123/edit"),
            Some("abc123")
        );
        assert_eq!(
            extract_doc_id("https://docs.google.com/document/d/abc123"),
            Some("abc123")
        );
        assert_eq!(extract_doc_id("https://example.com/document/d/abc123"), None);
        assert_eq!(
            extract_doc_id("https://docs.google.com/spreadsheets/d/abc123"),
            None
        );
    }
}

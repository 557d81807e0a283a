//! Assembles the daily briefing input from the Google provider boundary.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use shared_types::User;

use crate::content::documents::{
    prioritize_documents, DocumentRecord, PrioritizerOptions,
};
use crate::content::schedule::{analyze_day_schedule, MeetingDensity, ScheduleAnalysis};
use crate::google::calendar::{CalendarClient, CalendarEvent, CalendarRef};
use crate::google::drive::{DriveClient, DriveDocument};
use crate::google::oauth;

const DESCRIPTION_PREVIEW_CHARS: usize = 200;
const CONTENT_PREVIEW_CHARS: usize = 500;
const TOP_DOCUMENTS: usize = 5;

/// One meeting, pre-formatted for the briefing script
#[derive(Debug, Clone, Serialize)]
pub struct MeetingDetail {
    pub title: String,
    pub time: String,
    pub duration: String,
    pub location: String,
    pub attendee_count: usize,
    pub has_attachments: bool,
    pub description: String,
}

/// Narrative view of the day's calendar
#[derive(Debug, Clone, Serialize)]
pub struct CalendarSummary {
    pub day_type: String,
    pub summary: String,
    pub highlights: Vec<String>,
    pub meeting_details: Vec<MeetingDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedDocument {
    pub name: String,
    pub modified: String,
    pub sources: Vec<String>,
}

/// Narrative view of the day's documents
#[derive(Debug, Clone, Serialize)]
pub struct DocumentsSummary {
    pub summary: String,
    pub total_documents: usize,
    pub documents: Vec<RankedDocument>,
}

/// A top-ranked document with a content preview for the script
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    pub id: String,
    pub name: String,
    pub modified_time: chrono::DateTime<chrono::Utc>,
    pub web_link: String,
    pub preview: String,
    pub word_count: usize,
    pub priority_score: i32,
    pub sources: Vec<crate::content::documents::DocumentSource>,
}

/// Everything script generation needs for one user's day
#[derive(Debug, Clone, Serialize)]
pub struct DailyContent {
    pub date: NaiveDate,
    pub schedule: ScheduleAnalysis,
    pub calendar_summary: CalendarSummary,
    pub documents_summary: DocumentsSummary,
    pub document_details: Vec<DocumentDetail>,
    #[serde(skip)]
    pub documents: Vec<DocumentRecord>,
}

/// Source of aggregated daily content, abstracted so the pipeline can be
/// driven without live Google credentials in tests.
#[allow(async_fn_in_trait)]
pub trait ContentSource {
    async fn daily_content(&self, user: &User, day: NaiveDate) -> Result<DailyContent>;
    async fn document_content(
        &self,
        user: &User,
        document_id: &str,
    ) -> Result<crate::google::drive::DocumentContent>;
}

/// Production content source backed by the Calendar, Drive, and Docs APIs.
pub struct GoogleContentSource {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    lookback_days: i64,
    prioritizer: PrioritizerOptions,
}

impl GoogleContentSource {
    pub fn new(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        lookback_days: i64,
        prioritizer: PrioritizerOptions,
    ) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            lookback_days,
            prioritizer,
        }
    }

    /// Use the refresh token when we have one; a failed refresh falls back
    /// to the stored access token, which may still be valid.
    async fn access_token(&self, user: &User) -> String {
        if let Some(refresh_token) = &user.google_refresh_token {
            match oauth::refresh_access_token(
                &self.http,
                &self.client_id,
                &self.client_secret,
                refresh_token,
            )
            .await
            {
                Ok(token) => return token.access_token,
                Err(err) => {
                    tracing::warn!(user = %user.email, "Token refresh failed, using stored token: {:#}", err);
                }
            }
        }
        user.google_access_token.clone()
    }

    async fn fetch_events(&self, calendar_client: &CalendarClient, day: NaiveDate) -> Vec<CalendarEvent> {
        let calendars = match calendar_client.list_calendars().await {
            Ok(calendars) => calendars,
            Err(err) => {
                tracing::warn!("Calendar list failed, falling back to primary: {:#}", err);
                vec![CalendarRef::primary_fallback()]
            }
        };

        let mut events = Vec::new();
        for calendar in &calendars {
            match calendar_client.list_events_for_day(calendar, day).await {
                Ok(mut batch) => events.append(&mut batch),
                Err(err) => {
                    tracing::warn!(calendar = %calendar.name, "Skipping calendar: {:#}", err);
                }
            }
        }
        events.sort_by_key(|e| e.start_time);
        events
    }

    async fn fetch_documents(
        &self,
        drive_client: &DriveClient,
    ) -> (Vec<DriveDocument>, Vec<DriveDocument>) {
        let recent = match drive_client.list_recent_documents(self.lookback_days).await {
            Ok(docs) => docs,
            Err(err) => {
                tracing::warn!("Recent document listing failed: {:#}", err);
                Vec::new()
            }
        };
        let shared = match drive_client.list_shared_documents(self.lookback_days).await {
            Ok(docs) => docs,
            Err(err) => {
                tracing::warn!("Shared document listing failed: {:#}", err);
                Vec::new()
            }
        };
        (recent, shared)
    }
}

impl ContentSource for GoogleContentSource {
    async fn daily_content(&self, user: &User, day: NaiveDate) -> Result<DailyContent> {
        let token = self.access_token(user).await;
        let calendar_client = CalendarClient::new(self.http.clone(), token.clone());
        let drive_client = DriveClient::new(self.http.clone(), token);

        let events = self.fetch_events(&calendar_client, day).await;
        let (recent, shared) = self.fetch_documents(&drive_client).await;

        let documents = prioritize_documents(recent, shared, &events, self.prioritizer);
        let schedule = analyze_day_schedule(&events);

        let calendar_summary = build_calendar_summary(&schedule, &events);
        let documents_summary = build_documents_summary(&documents);

        // Fetch bodies for the top ranked documents; an unreadable body
        // degrades to a placeholder instead of failing the whole day.
        let mut document_details = Vec::new();
        for doc in documents.iter().take(TOP_DOCUMENTS) {
            match drive_client.get_document_content(&doc.id).await {
                Ok(content) => document_details.push(DocumentDetail {
                    id: doc.id.clone(),
                    name: doc.name.clone(),
                    modified_time: doc.modified_time,
                    web_link: doc.web_link.clone(),
                    preview: truncate_chars(&content.content, CONTENT_PREVIEW_CHARS),
                    word_count: content.word_count,
                    priority_score: doc.priority_score,
                    sources: doc.sources.clone(),
                }),
                Err(err) => {
                    tracing::warn!(document = %doc.name, "Content fetch failed: {:#}", err);
                    document_details.push(DocumentDetail {
                        id: doc.id.clone(),
                        name: doc.name.clone(),
                        modified_time: doc.modified_time,
                        web_link: doc.web_link.clone(),
                        preview: format!("Document: {} (content not accessible)", doc.name),
                        word_count: 0,
                        priority_score: doc.priority_score,
                        sources: doc.sources.clone(),
                    });
                }
            }
        }

        Ok(DailyContent {
            date: day,
            schedule,
            calendar_summary,
            documents_summary,
            document_details,
            documents,
        })
    }

    async fn document_content(
        &self,
        user: &User,
        document_id: &str,
    ) -> Result<crate::google::drive::DocumentContent> {
        let token = self.access_token(user).await;
        let drive_client = DriveClient::new(self.http.clone(), token);
        drive_client
            .get_document_content(document_id)
            .await
            .with_context(|| format!("Could not read document {}", document_id))
    }
}

/// Turn the schedule analysis into the narrative the script prompt uses.
pub fn build_calendar_summary(
    analysis: &ScheduleAnalysis,
    events: &[CalendarEvent],
) -> CalendarSummary {
    let day_type = match analysis.meeting_density {
        MeetingDensity::Heavy => "busy_day",
        MeetingDensity::Moderate => "moderate_day",
        MeetingDensity::Light => "light_day",
    };

    let mut summary = match analysis.meeting_density {
        MeetingDensity::Heavy => format!(
            "You have a packed day with {} meetings spanning {} hours.",
            analysis.total_meetings, analysis.busy_hours
        ),
        MeetingDensity::Moderate => format!(
            "You have a moderately busy day with {} meetings over {} hours.",
            analysis.total_meetings, analysis.busy_hours
        ),
        MeetingDensity::Light if analysis.total_meetings > 0 => format!(
            "You have a light day with {} meeting{}.",
            analysis.total_meetings,
            if analysis.total_meetings == 1 { "" } else { "s" }
        ),
        MeetingDensity::Light => "You have no meetings scheduled today.".to_string(),
    };

    if analysis.back_to_back_count > 0 {
        summary.push_str(&format!(
            " Note: you have {} back-to-back meeting{} with little transition time.",
            analysis.back_to_back_count,
            if analysis.back_to_back_count == 1 { "" } else { "s" }
        ));
    }

    let mut highlights = Vec::new();

    let important: Vec<&str> = events
        .iter()
        .filter(|e| {
            e.attendees.len() > 5
                || e.attendees
                    .iter()
                    .any(|a| a.email.contains('@') && !a.email.ends_with("@gmail.com"))
        })
        .take(3)
        .map(|e| e.title.as_str())
        .collect();
    if !important.is_empty() {
        highlights.push(format!("Important meetings: {}", important.join(", ")));
    }

    let mut travel: Vec<&str> = Vec::new();
    for event in events {
        let location = event.location.trim();
        if location.is_empty() || location.contains("http") {
            continue;
        }
        if !travel.contains(&location) {
            travel.push(location);
        }
        if travel.len() == 2 {
            break;
        }
    }
    if !travel.is_empty() {
        highlights.push(format!("Travel required to: {}", travel.join(", ")));
    }

    if let Some(longest) = &analysis.longest_meeting {
        if longest.duration_hours > 2.0 {
            highlights.push(format!(
                "Long meeting: {} ({:.1} hours)",
                longest.title, longest.duration_hours
            ));
        }
    }

    let meeting_details = events.iter().map(format_meeting_detail).collect();

    CalendarSummary {
        day_type: day_type.to_string(),
        summary,
        highlights,
        meeting_details,
    }
}

fn format_meeting_detail(event: &CalendarEvent) -> MeetingDetail {
    let time = if event.is_all_day {
        "All day".to_string()
    } else {
        format!(
            "{} - {}",
            event.start_time.format("%I:%M %p"),
            event.end_time.format("%I:%M %p")
        )
    };

    let minutes = (event.end_time - event.start_time).num_minutes();
    let duration = if minutes >= 60 {
        format!("{:.1} hours", minutes as f64 / 60.0)
    } else {
        format!("{} minutes", minutes)
    };

    MeetingDetail {
        title: event.title.clone(),
        time,
        duration,
        location: event.location.clone(),
        attendee_count: event.attendees.len(),
        has_attachments: !event.attachments.is_empty(),
        description: truncate_chars(&event.description, DESCRIPTION_PREVIEW_CHARS),
    }
}

/// Turn the ranked document list into its narrative summary.
pub fn build_documents_summary(documents: &[DocumentRecord]) -> DocumentsSummary {
    let shared = documents.iter().filter(|d| d.is_shared()).count();
    let attached = documents
        .iter()
        .filter(|d| d.is_calendar_attachment())
        .count();

    let summary = if documents.is_empty() {
        "You have no documents to review today.".to_string()
    } else {
        format!(
            "You have {} document{} to review, including {} shared with you and {} attached to calendar events.",
            documents.len(),
            if documents.len() == 1 { "" } else { "s" },
            shared,
            attached
        )
    };

    let listed = documents
        .iter()
        .take(TOP_DOCUMENTS)
        .map(|d| RankedDocument {
            name: d.name.clone(),
            modified: d.modified_time.format("%I:%M %p").to_string(),
            sources: d.sources.iter().map(|s| s.as_str().to_string()).collect(),
        })
        .collect();

    DocumentsSummary {
        summary,
        total_documents: documents.len(),
        documents: listed,
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

//! Google Calendar API client for fetching a user's day of events.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// A calendar visible to the user
#[derive(Debug, Clone)]
pub struct CalendarRef {
    pub id: String,
    pub name: String,
    pub primary: bool,
    pub access_role: String,
}

impl CalendarRef {
    /// Fallback used when the calendar list itself cannot be fetched.
    pub fn primary_fallback() -> Self {
        CalendarRef {
            id: "primary".to_string(),
            name: "Primary Calendar".to_string(),
            primary: true,
            access_role: String::new(),
        }
    }
}

/// Event attendee with RSVP status
#[derive(Debug, Clone)]
pub struct Attendee {
    pub email: String,
    pub name: String,
    pub response_status: String,
}

/// File attached to an event
#[derive(Debug, Clone)]
pub struct EventAttachment {
    pub title: String,
    pub file_url: String,
    pub mime_type: String,
}

/// Conferencing entry points extracted from event metadata
#[derive(Debug, Clone, Default)]
pub struct ConferenceInfo {
    pub video_url: Option<String>,
    pub phone: Option<String>,
}

/// Calendar event in a normalized, request-scoped form
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_all_day: bool,
    pub location: String,
    pub calendar: CalendarRef,
    pub attendees: Vec<Attendee>,
    pub attachments: Vec<EventAttachment>,
    pub conference: ConferenceInfo,
    pub status: String,
}

impl CalendarEvent {
    pub fn duration_seconds(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }
}

// Raw API response shapes

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    #[serde(default)]
    summary: String,
    selected: Option<bool>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    access_role: String,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    #[serde(default)]
    status: String,
    start: Option<RawEventTime>,
    end: Option<RawEventTime>,
    #[serde(default)]
    attendees: Vec<RawAttendee>,
    #[serde(default)]
    attachments: Vec<RawAttachment>,
    conference_data: Option<RawConferenceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttendee {
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    response_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttachment {
    #[serde(default)]
    title: String,
    #[serde(default)]
    file_url: String,
    #[serde(default)]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConferenceData {
    #[serde(default)]
    entry_points: Vec<RawEntryPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntryPoint {
    #[serde(default)]
    entry_point_type: String,
    #[serde(default)]
    uri: String,
}

/// Client for the Google Calendar API, scoped to one user's access token
pub struct CalendarClient {
    http: reqwest::Client,
    access_token: String,
}

impl CalendarClient {
    pub fn new(http: reqwest::Client, access_token: String) -> Self {
        Self { http, access_token }
    }

    /// List the user's visible, non-hidden calendars.
    pub async fn list_calendars(&self) -> Result<Vec<CalendarRef>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);

        let response: CalendarListResponse = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to list calendars")?
            .error_for_status()
            .context("Calendar list request rejected")?
            .json()
            .await
            .context("Invalid calendar list response")?;

        let calendars = response
            .items
            .into_iter()
            .filter(|entry| entry.selected.unwrap_or(true) && !entry.hidden)
            .map(|entry| CalendarRef {
                id: entry.id,
                name: entry.summary,
                primary: entry.primary,
                access_role: entry.access_role,
            })
            .collect();

        Ok(calendars)
    }

    /// Fetch one calendar's events for the given day, expanded to single
    /// instances and ordered by start time.
    pub async fn list_events_for_day(
        &self,
        calendar: &CalendarRef,
        day: NaiveDate,
    ) -> Result<Vec<CalendarEvent>> {
        let time_min = Utc
            .from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("valid midnight"))
            .to_rfc3339();
        let time_max = Utc
            .from_utc_datetime(&day.and_hms_opt(23, 59, 59).expect("valid end of day"))
            .to_rfc3339();

        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(&calendar.id)
        );

        let response: EventsResponse = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("maxResults", "50"),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to list events for calendar {}", calendar.name))?
            .error_for_status()
            .with_context(|| format!("Events request rejected for calendar {}", calendar.name))?
            .json()
            .await
            .context("Invalid events response")?;

        let events = response
            .items
            .into_iter()
            .filter_map(|raw| parse_event(raw, calendar))
            .collect();

        Ok(events)
    }
}

/// Normalize one raw event. Events without any start time are skipped.
fn parse_event(raw: RawEvent, calendar: &CalendarRef) -> Option<CalendarEvent> {
    let start = raw.start?;

    let (start_time, is_all_day) = match (&start.date_time, &start.date) {
        (Some(dt), _) => (parse_rfc3339(dt)?, false),
        (None, Some(d)) => (parse_day_start(d)?, true),
        (None, None) => return None,
    };

    let end_time = match raw.end {
        Some(RawEventTime {
            date_time: Some(dt),
            ..
        }) => parse_rfc3339(&dt)?,
        Some(RawEventTime {
            date: Some(d),
            date_time: None,
        }) => parse_day_end(&d)?,
        // No usable end: assume a one hour meeting
        _ => start_time + chrono::Duration::hours(1),
    };

    let attendees = raw
        .attendees
        .into_iter()
        .map(|a| Attendee {
            email: a.email,
            name: a.display_name,
            response_status: a.response_status,
        })
        .collect();

    let attachments = raw
        .attachments
        .into_iter()
        .map(|a| EventAttachment {
            title: a.title,
            file_url: a.file_url,
            mime_type: a.mime_type,
        })
        .collect();

    let mut conference = ConferenceInfo::default();
    if let Some(data) = raw.conference_data {
        for entry in data.entry_points {
            match entry.entry_point_type.as_str() {
                "video" => conference.video_url = Some(entry.uri),
                "phone" => conference.phone = Some(entry.uri),
                _ => {}
            }
        }
    }

    Some(CalendarEvent {
        id: raw.id,
        title: raw.summary.unwrap_or_else(|| "Untitled Event".to_string()),
        description: raw.description.unwrap_or_default(),
        start_time,
        end_time,
        is_all_day,
        location: raw.location.unwrap_or_default(),
        calendar: calendar.clone(),
        attendees,
        attachments,
        conference,
        status: raw.status,
    })
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_day_start(value: &str) -> Option<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?))
}

fn parse_day_end(value: &str) -> Option<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&day.and_hms_opt(23, 59, 59)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_event(json: serde_json::Value) -> RawEvent {
        serde_json::from_value(json).expect("valid raw event")
    }

    #[test]
    fn parses_timed_event() {
        let raw = raw_event(serde_json::json!({
            "id": "evt1",
            "summary": "Standup",
            "start": {"dateTime": "2025-06-02T09:00:00Z"},
            "end": {"dateTime": "2025-06-02T09:30:00Z"},
            "attendees": [
                {"email": "a@corp.com", "displayName": "A", "responseStatus": "accepted"}
            ]
        }));

        let event = parse_event(raw, &CalendarRef::primary_fallback()).expect("parsed");
        assert_eq!(event.title, "Standup");
        assert!(!event.is_all_day);
        assert_eq!(event.duration_seconds(), 1800);
        assert_eq!(event.attendees.len(), 1);
    }

    #[test]
    fn parses_all_day_event() {
        let raw = raw_event(serde_json::json!({
            "id": "evt2",
            "summary": "Offsite",
            "start": {"date": "2025-06-02"},
            "end": {"date": "2025-06-02"}
        }));

        let event = parse_event(raw, &CalendarRef::primary_fallback()).expect("parsed");
        assert!(event.is_all_day);
        assert_eq!(event.start_time.to_rfc3339(), "2025-06-02T00:00:00+00:00");
        assert_eq!(event.end_time.to_rfc3339(), "2025-06-02T23:59:59+00:00");
    }

    #[test]
    fn missing_start_is_skipped() {
        let raw = raw_event(serde_json::json!({"id": "evt3", "summary": "Broken"}));
        assert!(parse_event(raw, &CalendarRef::primary_fallback()).is_none());
    }

    #[test]
    fn missing_end_defaults_to_one_hour() {
        let raw = raw_event(serde_json::json!({
            "id": "evt4",
            "summary": "Open ended",
            "start": {"dateTime": "2025-06-02T14:00:00Z"}
        }));

        let event = parse_event(raw, &CalendarRef::primary_fallback()).expect("parsed");
        assert_eq!(event.duration_seconds(), 3600);
    }

    #[test]
    fn untitled_events_get_a_default_title() {
        let raw = raw_event(serde_json::json!({
            "id": "evt5",
            "start": {"dateTime": "2025-06-02T14:00:00Z"},
            "end": {"dateTime": "2025-06-02T15:00:00Z"}
        }));

        let event = parse_event(raw, &CalendarRef::primary_fallback()).expect("parsed");
        assert_eq!(event.title, "Untitled Event");
    }

    #[test]
    fn conference_entry_points_are_extracted() {
        let raw = raw_event(serde_json::json!({
            "id": "evt6",
            "summary": "Sync",
            "start": {"dateTime": "2025-06-02T14:00:00Z"},
            "end": {"dateTime": "2025-06-02T15:00:00Z"},
            "conferenceData": {
                "entryPoints": [
                    {"entryPointType": "video", "uri": "https://meet.example/abc"},
                    {"entryPointType": "phone", "uri": "tel:+15551234"}
                ]
            }
        }));

        let event = parse_event(raw, &CalendarRef::primary_fallback()).expect("parsed");
        assert_eq!(
            event.conference.video_url.as_deref(),
            Some("https://meet.example/abc")
        );
        assert_eq!(event.conference.phone.as_deref(), Some("tel:+15551234"));
    }
}

//! Pure analysis over a day of calendar events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::google::calendar::CalendarEvent;

/// How packed the day is, by total meeting count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingDensity {
    Light,
    Moderate,
    Heavy,
}

impl MeetingDensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingDensity::Light => "light",
            MeetingDensity::Moderate => "moderate",
            MeetingDensity::Heavy => "heavy",
        }
    }
}

/// An open stretch between two timed meetings
#[derive(Debug, Clone, Serialize)]
pub struct FreeBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Shortest summary of the day's longest meeting
#[derive(Debug, Clone, Serialize)]
pub struct LongestMeeting {
    pub title: String,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleAnalysis {
    pub total_meetings: usize,
    pub busy_hours: f64,
    pub free_blocks: Vec<FreeBlock>,
    pub back_to_back_count: usize,
    pub longest_meeting: Option<LongestMeeting>,
    pub meeting_density: MeetingDensity,
}

impl ScheduleAnalysis {
    pub fn empty() -> Self {
        ScheduleAnalysis {
            total_meetings: 0,
            busy_hours: 0.0,
            free_blocks: Vec::new(),
            back_to_back_count: 0,
            longest_meeting: None,
            meeting_density: MeetingDensity::Light,
        }
    }
}

/// Analyze one day of events.
///
/// All-day events count toward the meeting total and density but are
/// excluded from busy hours, gap analysis, and the longest-meeting pick.
pub fn analyze_day_schedule(events: &[CalendarEvent]) -> ScheduleAnalysis {
    if events.is_empty() {
        return ScheduleAnalysis::empty();
    }

    let mut timed: Vec<&CalendarEvent> = events.iter().filter(|e| !e.is_all_day).collect();
    timed.sort_by_key(|e| e.start_time);

    let busy_seconds: i64 = timed.iter().map(|e| e.duration_seconds()).sum();
    let busy_hours = (busy_seconds as f64 / 3600.0 * 10.0).round() / 10.0;

    let mut free_blocks = Vec::new();
    let mut back_to_back_count = 0;
    for pair in timed.windows(2) {
        let gap_minutes = (pair[1].start_time - pair[0].end_time).num_minutes();
        if gap_minutes > 30 {
            free_blocks.push(FreeBlock {
                start: pair[0].end_time,
                end: pair[1].start_time,
                duration_minutes: gap_minutes,
            });
        } else if gap_minutes <= 15 {
            back_to_back_count += 1;
        }
    }

    // First occurrence wins ties, so strictly-greater only
    let mut longest: Option<&&CalendarEvent> = None;
    for event in &timed {
        if longest.map_or(true, |l| event.duration_seconds() > l.duration_seconds()) {
            longest = Some(event);
        }
    }
    let longest_meeting = longest.map(|e| LongestMeeting {
        title: e.title.clone(),
        duration_hours: e.duration_seconds() as f64 / 3600.0,
    });

    let meeting_density = match events.len() {
        n if n >= 8 => MeetingDensity::Heavy,
        n if n >= 4 => MeetingDensity::Moderate,
        _ => MeetingDensity::Light,
    };

    ScheduleAnalysis {
        total_meetings: events.len(),
        busy_hours,
        free_blocks,
        back_to_back_count,
        longest_meeting,
        meeting_density,
    }
}

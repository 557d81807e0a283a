//! Briefing script generation via the OpenAI chat API.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::content::DailyContent;
use crate::google::drive::DocumentContent;

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const CHAT_MODEL: &str = "gpt-4";

/// Result of a script generation attempt.
///
/// Generation never fails the episode: when the language model is
/// unreachable or returns garbage, a templated fallback script is used
/// and the reason is surfaced for logging.
#[derive(Debug, Clone)]
pub enum ScriptOutcome {
    Generated(String),
    Fallback { script: String, reason: String },
}

impl ScriptOutcome {
    pub fn script(&self) -> &str {
        match self {
            ScriptOutcome::Generated(script) => script,
            ScriptOutcome::Fallback { script, .. } => script,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            ScriptOutcome::Generated(_) => None,
            ScriptOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Produces spoken-word scripts for each episode kind.
#[allow(async_fn_in_trait)]
pub trait ScriptEngine {
    async fn welcome_script(&self, user_email: &str) -> ScriptOutcome;
    async fn daily_script(&self, user_email: &str, content: &DailyContent) -> ScriptOutcome;
    async fn document_script(&self, document: &DocumentContent) -> ScriptOutcome;
}

pub struct OpenAiScriptEngine {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiScriptEngine {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_OPENAI_BASE.to_string())
    }

    pub fn with_base_url(http: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
        }
    }

    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": CHAT_MODEL,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt},
                ],
                "max_tokens": max_tokens,
                "temperature": temperature,
            }))
            .send()
            .await
            .context("Chat completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion failed: {} - {}", status, body);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Invalid chat completion response")?;

        let script = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if script.trim().is_empty() {
            anyhow::bail!("Chat completion returned an empty script");
        }

        Ok(script)
    }
}

impl ScriptEngine for OpenAiScriptEngine {
    async fn welcome_script(&self, user_email: &str) -> ScriptOutcome {
        let system = "You are a friendly podcast host welcoming a new listener to their \
                      personalized daily briefing podcast. Keep it warm, short, and spoken-word \
                      natural. Do not use markdown or stage directions.";
        let user = format!(
            "Write a welcome episode script for a listener whose email is {}. Explain that \
             every morning they will get a short personalized briefing covering their calendar \
             and documents. Keep it under two minutes of speech.",
            user_email
        );

        match self.chat(system, &user, 500, 0.7).await {
            Ok(script) => ScriptOutcome::Generated(script),
            Err(err) => {
                tracing::warn!("Welcome script generation failed: {:#}", err);
                ScriptOutcome::Fallback {
                    script: fallback_welcome_script(user_email),
                    reason: format!("{:#}", err),
                }
            }
        }
    }

    async fn daily_script(&self, user_email: &str, content: &DailyContent) -> ScriptOutcome {
        let system = "You are the host of a personalized daily briefing podcast. Turn the \
                      listener's schedule and document summaries into an engaging spoken-word \
                      script. Be concise, conversational, and practical. Do not use markdown, \
                      headings, or stage directions.";

        let context = serde_json::to_string_pretty(&json!({
            "date": content.date.format("%A, %B %e, %Y").to_string(),
            "calendar": content.calendar_summary,
            "documents": content.documents_summary,
            "document_previews": content.document_details,
        }))
        .unwrap_or_default();

        let user = format!(
            "Create today's briefing for {}. Cover the schedule first, then the documents \
             worth reviewing. Mention highlights explicitly. Here is the day's data:\n{}",
            user_email, context
        );

        match self.chat(system, &user, 2000, 0.8).await {
            Ok(script) => ScriptOutcome::Generated(script),
            Err(err) => {
                tracing::warn!("Daily script generation failed: {:#}", err);
                ScriptOutcome::Fallback {
                    script: fallback_daily_script(content),
                    reason: format!("{:#}", err),
                }
            }
        }
    }

    async fn document_script(&self, document: &DocumentContent) -> ScriptOutcome {
        let system = "You are the host of a personalized podcast that summarizes documents \
                      for busy listeners. Summarize the key points in a natural spoken-word \
                      style. Do not use markdown or stage directions.";
        let user = format!(
            "Summarize the document titled '{}' ({} words) as a short podcast segment:\n{}",
            document.title, document.word_count, document.content
        );

        match self.chat(system, &user, 800, 0.7).await {
            Ok(script) => ScriptOutcome::Generated(script),
            Err(err) => {
                tracing::warn!("Document script generation failed: {:#}", err);
                ScriptOutcome::Fallback {
                    script: fallback_document_script(document),
                    reason: format!("{:#}", err),
                }
            }
        }
    }
}

fn fallback_welcome_script(user_email: &str) -> String {
    format!(
        "Welcome to your personalized daily podcast! This feed was set up for {}. \
         Every morning you'll get a short briefing covering your calendar and the \
         documents that need your attention. Add this feed to your podcast app and \
         your first daily episode will be waiting for you tomorrow. Thanks for \
         listening!",
        user_email
    )
}

fn fallback_daily_script(content: &DailyContent) -> String {
    let mut script = format!(
        "Good morning! Here's your briefing for {}. {}",
        content.date.format("%A, %B %e"),
        content.calendar_summary.summary
    );

    for highlight in &content.calendar_summary.highlights {
        script.push(' ');
        script.push_str(highlight);
        script.push('.');
    }

    script.push(' ');
    script.push_str(&content.documents_summary.summary);
    script.push_str(" That's all for today. Have a great day!");
    script
}

fn fallback_document_script(document: &DocumentContent) -> String {
    format!(
        "Here's a quick look at the document titled {}. It runs about {} words. \
         A full summary isn't available right now, so set aside a few minutes to \
         read it directly.",
        document.title, document.word_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::aggregator::{build_calendar_summary, build_documents_summary, DailyContent};
    use crate::content::schedule::analyze_day_schedule;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn empty_day() -> DailyContent {
        let analysis = analyze_day_schedule(&[]);
        DailyContent {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            calendar_summary: build_calendar_summary(&analysis, &[]),
            documents_summary: build_documents_summary(&[]),
            schedule: analysis,
            document_details: Vec::new(),
            documents: Vec::new(),
        }
    }

    #[tokio::test]
    async fn daily_script_uses_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Good morning, here is your day."}}]
            })))
            .mount(&server)
            .await;

        let engine = OpenAiScriptEngine::with_base_url(
            reqwest::Client::new(),
            "test-key".to_string(),
            server.uri(),
        );

        let outcome = engine.daily_script("user@corp.com", &empty_day()).await;
        assert_eq!(outcome.script(), "Good morning, here is your day.");
        assert!(outcome.fallback_reason().is_none());
    }

    #[tokio::test]
    async fn server_error_falls_back_to_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let engine = OpenAiScriptEngine::with_base_url(
            reqwest::Client::new(),
            "test-key".to_string(),
            server.uri(),
        );

        let outcome = engine.daily_script("user@corp.com", &empty_day()).await;
        assert!(outcome.fallback_reason().is_some());
        assert!(outcome
            .script()
            .contains("You have no meetings scheduled today."));
    }

    #[tokio::test]
    async fn empty_completion_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "   "}}]
            })))
            .mount(&server)
            .await;

        let engine = OpenAiScriptEngine::with_base_url(
            reqwest::Client::new(),
            "test-key".to_string(),
            server.uri(),
        );

        let outcome = engine.welcome_script("user@corp.com").await;
        let reason = outcome.fallback_reason().expect("fallback");
        assert!(reason.contains("empty script"));
        assert!(outcome.script().contains("Welcome to your personalized daily podcast"));
    }

    #[test]
    fn daily_fallback_includes_highlights() {
        use crate::google::calendar::{Attendee, CalendarEvent, CalendarRef, ConferenceInfo};
        use chrono::{TimeZone, Utc};

        let mut event = CalendarEvent {
            id: "e".to_string(),
            title: "Board review".to_string(),
            description: String::new(),
            start_time: Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            is_all_day: false,
            location: String::new(),
            calendar: CalendarRef::primary_fallback(),
            attendees: Vec::new(),
            attachments: Vec::new(),
            conference: ConferenceInfo::default(),
            status: "confirmed".to_string(),
        };
        event.attendees.push(Attendee {
            email: "cfo@corp.com".to_string(),
            name: "CFO".to_string(),
            response_status: "accepted".to_string(),
        });

        let events = vec![event];
        let analysis = analyze_day_schedule(&events);
        let content = DailyContent {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            calendar_summary: build_calendar_summary(&analysis, &events),
            documents_summary: build_documents_summary(&[]),
            schedule: analysis,
            document_details: Vec::new(),
            documents: Vec::new(),
        };

        let script = fallback_daily_script(&content);
        assert!(script.contains("Important meetings: Board review"));
        assert!(script.contains("You have no documents to review today."));
    }
}

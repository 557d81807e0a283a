use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User struct matching database column order exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub google_access_token: String,
    pub google_refresh_token: Option<String>,
    /// Opaque identifier embedded in the public feed path (`/rss/{rss_feed_id}`)
    pub rss_feed_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Podcast episode struct matching database column order exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct PodcastEpisode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    /// Empty until audio rendering completes (two-phase write)
    pub audio_url: String,
    pub audio_file_path: String,
    pub duration_seconds: i32,
    pub file_size_bytes: i64,
    pub episode_type: String, // stored as VARCHAR: "welcome", "daily", "document"
    /// JSON snapshot of the content the episode was generated from
    pub source_data: String,
    pub created_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
}

/// Generation attempt log, append-only per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct GenerationLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String, // "pending", "processing", "completed", "failed"
    pub error_message: Option<String>,
    pub episodes_generated: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeType {
    Welcome,
    Daily,
    Document,
}

impl EpisodeType {
    pub fn as_str(&self) -> &str {
        match self {
            EpisodeType::Welcome => "welcome",
            EpisodeType::Daily => "daily",
            EpisodeType::Document => "document",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

// ============================================================================
// API Request/Response types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInitResponse {
    pub auth_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCallbackResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Public view of a user (tokens never leave the backend)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub rss_feed_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            rss_feed_id: user.rss_feed_id,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub duration_seconds: i32,
    pub file_size_bytes: i64,
    pub episode_type: String,
    pub published_at: DateTime<Utc>,
}

impl From<PodcastEpisode> for EpisodeResponse {
    fn from(episode: PodcastEpisode) -> Self {
        EpisodeResponse {
            id: episode.id,
            title: episode.title,
            description: episode.description,
            audio_url: episode.audio_url,
            duration_seconds: episode.duration_seconds,
            file_size_bytes: episode.file_size_bytes,
            episode_type: episode.episode_type,
            published_at: episode.published_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub episode: EpisodeResponse,
}

/// Outcome of a bulk "generate for all users" sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    pub total_users: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_type_round_trips_as_str() {
        assert_eq!(EpisodeType::Welcome.as_str(), "welcome");
        assert_eq!(EpisodeType::Daily.as_str(), "daily");
        assert_eq!(EpisodeType::Document.as_str(), "document");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!GenerationStatus::Pending.is_terminal());
        assert!(!GenerationStatus::Processing.is_terminal());
        assert!(GenerationStatus::Completed.is_terminal());
        assert!(GenerationStatus::Failed.is_terminal());
    }

    #[test]
    fn user_response_drops_tokens() {
        let user = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            google_access_token: "secret".to_string(),
            google_refresh_token: Some("secret-refresh".to_string()),
            rss_feed_id: "feed-1".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let response = UserResponse::from(user);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("alice@example.com"));
    }
}

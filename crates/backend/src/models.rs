// Database models for Diesel
use diesel::prelude::*;
use uuid::Uuid;

/// Insertable struct for new podcast episodes.
///
/// Audio fields start empty and are filled in by a second update once
/// rendering completes (see `db::episodes::attach_audio`).
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::podcast_episodes)]
pub struct NewEpisode {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub audio_file_path: String,
    pub duration_seconds: i32,
    pub file_size_bytes: i64,
    pub episode_type: String,
    pub source_data: String,
}

impl NewEpisode {
    /// Placeholder row for the first phase of the two-phase episode write.
    pub fn placeholder(
        user_id: Uuid,
        title: &str,
        description: &str,
        episode_type: &str,
        source_data: &str,
    ) -> Self {
        NewEpisode {
            user_id,
            title: title.to_string(),
            description: description.to_string(),
            audio_url: String::new(),
            audio_file_path: String::new(),
            duration_seconds: 0,
            file_size_bytes: 0,
            episode_type: episode_type.to_string(),
            source_data: source_data.to_string(),
        }
    }
}

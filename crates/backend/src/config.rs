//! Service configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Podcast generation and publishing configuration.
///
/// Loaded once at startup; missing required variables fail fast rather
/// than surfacing as request-time errors.
#[derive(Debug, Clone)]
pub struct PodcastConfig {
    /// API key for the language-generation and speech-synthesis service
    pub openai_api_key: String,
    /// Local directory where rendered mp3 files are stored
    pub audio_storage_path: PathBuf,
    /// Public URL prefix under which audio files are served
    pub audio_base_url: String,
    /// Public base URL of this service (used for feed/episode links)
    pub public_base_url: String,
    /// How many days back to look for modified/shared documents
    pub document_lookback_days: i64,
    /// Include documents only discovered via calendar attachments in the
    /// ranked set (off by default; see DESIGN.md)
    pub include_attachment_only_docs: bool,
    /// Max concurrent users during the bulk generation sweep
    pub sweep_concurrency: usize,
    /// Per-user timeout during the bulk generation sweep
    pub sweep_user_timeout: Duration,
    /// Age after which an episode still missing audio is considered stale
    pub stale_episode_max_age: chrono::Duration,
}

impl PodcastConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `OPENAI_API_KEY`: key for script and audio generation
    ///
    /// Optional env vars (with defaults):
    /// - `AUDIO_STORAGE_PATH` (./audio_files)
    /// - `AUDIO_BASE_URL` (http://localhost:8000/audio)
    /// - `PUBLIC_BASE_URL` (http://localhost:8000)
    /// - `DOCUMENT_LOOKBACK_DAYS` (1)
    /// - `INCLUDE_ATTACHMENT_ONLY_DOCS` (false)
    /// - `SWEEP_CONCURRENCY` (4)
    /// - `SWEEP_USER_TIMEOUT_SECS` (300)
    /// - `STALE_EPISODE_MAX_AGE_SECS` (3600)
    pub fn from_env() -> Result<Self, String> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| "OPENAI_API_KEY must be set".to_string())?;

        let audio_storage_path = std::env::var("AUDIO_STORAGE_PATH")
            .unwrap_or_else(|_| "./audio_files".to_string())
            .into();

        let audio_base_url = std::env::var("AUDIO_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000/audio".to_string());

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        let document_lookback_days = std::env::var("DOCUMENT_LOOKBACK_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let include_attachment_only_docs = std::env::var("INCLUDE_ATTACHMENT_ONLY_DOCS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        let sweep_concurrency = std::env::var("SWEEP_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4);

        let sweep_user_timeout_secs = std::env::var("SWEEP_USER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let stale_episode_max_age_secs = std::env::var("STALE_EPISODE_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        Ok(Self {
            openai_api_key,
            audio_storage_path,
            audio_base_url,
            public_base_url,
            document_lookback_days,
            include_attachment_only_docs,
            sweep_concurrency,
            sweep_user_timeout: Duration::from_secs(sweep_user_timeout_secs),
            stale_episode_max_age: chrono::Duration::seconds(stale_episode_max_age_secs),
        })
    }
}

//! Episode generation pipeline.
//!
//! Orchestrates content aggregation, script generation, speech rendering,
//! and the two-phase episode write. Persistence sits behind the
//! `PodcastStore` trait so the state machine can be tested without a
//! database.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde_json::json;
use shared_types::{
    EpisodeType, GenerationLog, GenerationStatus, PodcastEpisode, SweepSummary, User,
};
use uuid::Uuid;

use crate::content::ContentSource;
use crate::generation::{AudioArtifact, AudioRenderer, ScriptEngine, SpeechEngine, Voice};
use crate::models::NewEpisode;

/// Persistence operations the pipeline needs.
#[allow(async_fn_in_trait)]
pub trait PodcastStore {
    async fn get_user(&self, user_id: Uuid) -> Result<User>;
    async fn list_active_users(&self) -> Result<Vec<User>>;
    async fn create_episode(&self, episode: NewEpisode) -> Result<PodcastEpisode>;
    async fn attach_audio(
        &self,
        episode_id: Uuid,
        artifact: &AudioArtifact,
    ) -> Result<PodcastEpisode>;
    async fn delete_stale_placeholders(&self, cutoff: chrono::DateTime<Utc>) -> Result<usize>;
    async fn create_log(&self, user_id: Uuid) -> Result<GenerationLog>;
    async fn mark_log_processing(&self, log_id: Uuid) -> Result<()>;
    async fn finish_log(
        &self,
        log_id: Uuid,
        status: GenerationStatus,
        error: Option<&str>,
        episodes: i32,
    ) -> Result<()>;
}

/// Production store backed by the Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: crate::db::DbPool,
}

impl PgStore {
    pub fn new(pool: crate::db::DbPool) -> Self {
        Self { pool }
    }
}

impl PodcastStore for PgStore {
    async fn get_user(&self, user_id: Uuid) -> Result<User> {
        let mut conn = crate::db::get_conn(&self.pool)
            .await
            .context("Failed to get database connection")?;
        crate::db::users::get_by_id(&mut conn, user_id).await
    }

    async fn list_active_users(&self) -> Result<Vec<User>> {
        let mut conn = crate::db::get_conn(&self.pool)
            .await
            .context("Failed to get database connection")?;
        crate::db::users::list_active(&mut conn).await
    }

    async fn create_episode(&self, episode: NewEpisode) -> Result<PodcastEpisode> {
        let mut conn = crate::db::get_conn(&self.pool)
            .await
            .context("Failed to get database connection")?;
        crate::db::episodes::create_placeholder(&mut conn, episode).await
    }

    async fn attach_audio(
        &self,
        episode_id: Uuid,
        artifact: &AudioArtifact,
    ) -> Result<PodcastEpisode> {
        let mut conn = crate::db::get_conn(&self.pool)
            .await
            .context("Failed to get database connection")?;
        crate::db::episodes::attach_audio(
            &mut conn,
            episode_id,
            &artifact.audio_url,
            &artifact.file_path,
            artifact.duration_seconds,
            artifact.file_size_bytes,
        )
        .await
    }

    async fn delete_stale_placeholders(&self, cutoff: chrono::DateTime<Utc>) -> Result<usize> {
        let mut conn = crate::db::get_conn(&self.pool)
            .await
            .context("Failed to get database connection")?;
        crate::db::episodes::delete_stale_placeholders(&mut conn, cutoff).await
    }

    async fn create_log(&self, user_id: Uuid) -> Result<GenerationLog> {
        let mut conn = crate::db::get_conn(&self.pool)
            .await
            .context("Failed to get database connection")?;
        crate::db::generation_logs::create(&mut conn, user_id).await
    }

    async fn mark_log_processing(&self, log_id: Uuid) -> Result<()> {
        let mut conn = crate::db::get_conn(&self.pool)
            .await
            .context("Failed to get database connection")?;
        crate::db::generation_logs::mark_processing(&mut conn, log_id).await?;
        Ok(())
    }

    async fn finish_log(
        &self,
        log_id: Uuid,
        status: GenerationStatus,
        error: Option<&str>,
        episodes: i32,
    ) -> Result<()> {
        let mut conn = crate::db::get_conn(&self.pool)
            .await
            .context("Failed to get database connection")?;
        crate::db::generation_logs::finish(&mut conn, log_id, status, error, episodes).await?;
        Ok(())
    }
}

/// Tuning knobs for the bulk sweep and placeholder reconciliation.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub sweep_concurrency: usize,
    pub sweep_user_timeout: std::time::Duration,
    pub stale_episode_max_age: chrono::Duration,
}

pub struct PodcastPipeline<St, Sc, Sp, C> {
    store: St,
    scripts: Sc,
    renderer: AudioRenderer<Sp>,
    content: C,
    settings: PipelineSettings,
}

impl<St, Sc, Sp, C> PodcastPipeline<St, Sc, Sp, C>
where
    St: PodcastStore,
    Sc: ScriptEngine,
    Sp: SpeechEngine,
    C: ContentSource,
{
    pub fn new(
        store: St,
        scripts: Sc,
        renderer: AudioRenderer<Sp>,
        content: C,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            scripts,
            renderer,
            content,
            settings,
        }
    }

    /// Generate a welcome episode for a user.
    ///
    /// Welcome episodes are not tracked in generation logs; only the
    /// scheduled daily runs are.
    pub async fn generate_welcome(&self, user_id: Uuid) -> Result<PodcastEpisode> {
        let user = self.store.get_user(user_id).await?;
        let outcome = self.scripts.welcome_script(&user.email).await;
        if let Some(reason) = outcome.fallback_reason() {
            tracing::warn!(user = %user.email, "Using fallback welcome script: {}", reason);
        }

        let episode = self
            .store
            .create_episode(NewEpisode::placeholder(
                user.id,
                "Welcome to Your Daily Podcast",
                "An introduction to your personalized daily briefing feed.",
                EpisodeType::Welcome.as_str(),
                &json!({"script_fallback": outcome.fallback_reason()}).to_string(),
            ))
            .await?;

        let file_stem = format!("welcome_{}_{}", user.id, Utc::now().timestamp());
        let artifact = self
            .renderer
            .render(outcome.script(), Voice::Nova, &file_stem)
            .await?;

        self.store.attach_audio(episode.id, &artifact).await
    }

    /// Generate the daily briefing episode for one user, tracked by a
    /// generation log row across the run.
    pub async fn generate_daily(&self, user_id: Uuid, day: NaiveDate) -> Result<PodcastEpisode> {
        let user = self.store.get_user(user_id).await?;
        self.run_daily(&user, day, None).await
    }

    /// Daily run with the log lifecycle around it. Only the generation
    /// work is subject to the deadline; the log is always finalized, so a
    /// timed-out run ends in `failed` rather than stranded in
    /// `processing`.
    async fn run_daily(
        &self,
        user: &User,
        day: NaiveDate,
        deadline: Option<std::time::Duration>,
    ) -> Result<PodcastEpisode> {
        let log = self.store.create_log(user.id).await?;
        self.store.mark_log_processing(log.id).await?;

        let result = match deadline {
            Some(limit) => match tokio::time::timeout(limit, self.daily_inner(user, day)).await {
                Ok(inner) => inner,
                Err(_) => Err(anyhow::anyhow!("Timed out after {:?}", limit)),
            },
            None => self.daily_inner(user, day).await,
        };

        match result {
            Ok(episode) => {
                self.store
                    .finish_log(log.id, GenerationStatus::Completed, None, 1)
                    .await?;
                Ok(episode)
            }
            Err(err) => {
                let message = format!("{:#}", err);
                tracing::error!(user = %user.email, "Daily generation failed: {}", message);
                self.store
                    .finish_log(log.id, GenerationStatus::Failed, Some(&message), 0)
                    .await?;
                Err(err)
            }
        }
    }

    async fn daily_inner(&self, user: &User, day: NaiveDate) -> Result<PodcastEpisode> {
        let content = self
            .content
            .daily_content(user, day)
            .await
            .context("Content aggregation failed")?;

        let outcome = self.scripts.daily_script(&user.email, &content).await;
        if let Some(reason) = outcome.fallback_reason() {
            tracing::warn!(user = %user.email, "Using fallback daily script: {}", reason);
        }

        let description = format!(
            "{} {}",
            content.calendar_summary.summary, content.documents_summary.summary
        );
        let source_data = serde_json::to_string(&content)
            .context("Could not serialize briefing content")?;

        let episode = self
            .store
            .create_episode(NewEpisode::placeholder(
                user.id,
                &format!("Daily Briefing - {}", day.format("%B %e, %Y")),
                &description,
                EpisodeType::Daily.as_str(),
                &source_data,
            ))
            .await?;

        let file_stem = format!("daily_{}_{}", user.id, day);
        let artifact = self
            .renderer
            .render(outcome.script(), Voice::Alloy, &file_stem)
            .await
            .context("Audio rendering failed")?;

        self.store.attach_audio(episode.id, &artifact).await
    }

    /// Generate an episode reviewing one document.
    pub async fn generate_document(
        &self,
        user_id: Uuid,
        document_id: &str,
    ) -> Result<PodcastEpisode> {
        let user = self.store.get_user(user_id).await?;
        let document = self.content.document_content(&user, document_id).await?;

        let outcome = self.scripts.document_script(&document).await;
        if let Some(reason) = outcome.fallback_reason() {
            tracing::warn!(user = %user.email, "Using fallback document script: {}", reason);
        }

        let episode = self
            .store
            .create_episode(NewEpisode::placeholder(
                user.id,
                &format!("Document Review: {}", document.title),
                &format!("An audio review of {}", document.title),
                EpisodeType::Document.as_str(),
                &json!({"document_id": document.id, "word_count": document.word_count})
                    .to_string(),
            ))
            .await?;

        let file_stem = format!(
            "document_{}_{}_{}",
            user.id,
            document.id,
            Utc::now().timestamp()
        );
        let artifact = self
            .renderer
            .render(outcome.script(), Voice::Echo, &file_stem)
            .await?;

        self.store.attach_audio(episode.id, &artifact).await
    }

    /// Remove placeholder episodes that never received audio.
    pub async fn reconcile_stale_episodes(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.settings.stale_episode_max_age;
        let deleted = self.store.delete_stale_placeholders(cutoff).await?;
        if deleted > 0 {
            tracing::info!("Reconciled {} stale placeholder episode(s)", deleted);
        }
        Ok(deleted)
    }

    /// Run daily generation for every active user with bounded concurrency
    /// and a per-user timeout. Individual failures are collected, never
    /// fatal to the sweep.
    pub async fn generate_for_all_active_users(&self, day: NaiveDate) -> Result<SweepSummary> {
        if let Err(err) = self.reconcile_stale_episodes().await {
            tracing::warn!("Placeholder reconciliation failed: {:#}", err);
        }

        let users = self.store.list_active_users().await?;
        let total_users = users.len();

        let results: Vec<(String, Result<PodcastEpisode, String>)> = stream::iter(users)
            .map(|user| async move {
                let email = user.email.clone();
                let outcome = self
                    .run_daily(&user, day, Some(self.settings.sweep_user_timeout))
                    .await
                    .map_err(|err| format!("{:#}", err));
                (email, outcome)
            })
            .buffer_unordered(self.settings.sweep_concurrency)
            .collect()
            .await;

        let mut summary = SweepSummary {
            total_users,
            successful: 0,
            failed: 0,
            errors: Vec::new(),
        };
        for (email, result) in results {
            match result {
                Ok(_) => summary.successful += 1,
                Err(message) => {
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {}", email, message));
                }
            }
        }

        tracing::info!(
            total = summary.total_users,
            successful = summary.successful,
            failed = summary.failed,
            "Bulk generation sweep finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::aggregator::{
        build_calendar_summary, build_documents_summary, DailyContent,
    };
    use crate::content::schedule::analyze_day_schedule;
    use crate::generation::script::ScriptOutcome;
    use crate::google::drive::DocumentContent;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryState {
        users: Vec<User>,
        episodes: Vec<PodcastEpisode>,
        logs: Vec<GenerationLog>,
    }

    /// In-memory store exercising the same state machine as Postgres.
    #[derive(Default)]
    struct MemoryStore {
        state: Mutex<MemoryState>,
    }

    impl MemoryStore {
        fn add_user(&self, email: &str) -> Uuid {
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                google_access_token: "tok".to_string(),
                google_refresh_token: None,
                rss_feed_id: Uuid::new_v4().to_string(),
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            let id = user.id;
            self.state.lock().unwrap().users.push(user);
            id
        }

        fn logs(&self) -> Vec<GenerationLog> {
            self.state.lock().unwrap().logs.clone()
        }

        fn episodes(&self) -> Vec<PodcastEpisode> {
            self.state.lock().unwrap().episodes.clone()
        }
    }

    impl PodcastStore for &MemoryStore {
        async fn get_user(&self, user_id: Uuid) -> Result<User> {
            self.state
                .lock()
                .unwrap()
                .users
                .iter()
                .find(|u| u.id == user_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no such user"))
        }

        async fn list_active_users(&self) -> Result<Vec<User>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .users
                .iter()
                .filter(|u| u.is_active)
                .cloned()
                .collect())
        }

        async fn create_episode(&self, episode: NewEpisode) -> Result<PodcastEpisode> {
            let row = PodcastEpisode {
                id: Uuid::new_v4(),
                user_id: episode.user_id,
                title: episode.title,
                description: episode.description,
                audio_url: String::new(),
                audio_file_path: String::new(),
                duration_seconds: 0,
                file_size_bytes: 0,
                episode_type: episode.episode_type,
                source_data: episode.source_data,
                created_at: Utc::now(),
                published_at: Utc::now(),
            };
            self.state.lock().unwrap().episodes.push(row.clone());
            Ok(row)
        }

        async fn attach_audio(
            &self,
            episode_id: Uuid,
            artifact: &AudioArtifact,
        ) -> Result<PodcastEpisode> {
            let mut state = self.state.lock().unwrap();
            let episode = state
                .episodes
                .iter_mut()
                .find(|e| e.id == episode_id)
                .ok_or_else(|| anyhow::anyhow!("no such episode"))?;
            episode.audio_url = artifact.audio_url.clone();
            episode.audio_file_path = artifact.file_path.clone();
            episode.duration_seconds = artifact.duration_seconds;
            episode.file_size_bytes = artifact.file_size_bytes;
            episode.published_at = Utc::now();
            Ok(episode.clone())
        }

        async fn delete_stale_placeholders(
            &self,
            cutoff: chrono::DateTime<Utc>,
        ) -> Result<usize> {
            let mut state = self.state.lock().unwrap();
            let before = state.episodes.len();
            state
                .episodes
                .retain(|e| !(e.audio_url.is_empty() && e.created_at < cutoff));
            Ok(before - state.episodes.len())
        }

        async fn create_log(&self, user_id: Uuid) -> Result<GenerationLog> {
            let log = GenerationLog {
                id: Uuid::new_v4(),
                user_id,
                status: GenerationStatus::Pending.as_str().to_string(),
                error_message: None,
                episodes_generated: 0,
                started_at: Utc::now(),
                completed_at: None,
            };
            self.state.lock().unwrap().logs.push(log.clone());
            Ok(log)
        }

        async fn mark_log_processing(&self, log_id: Uuid) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let log = state
                .logs
                .iter_mut()
                .find(|l| l.id == log_id)
                .ok_or_else(|| anyhow::anyhow!("no such log"))?;
            log.status = GenerationStatus::Processing.as_str().to_string();
            Ok(())
        }

        async fn finish_log(
            &self,
            log_id: Uuid,
            status: GenerationStatus,
            error: Option<&str>,
            episodes: i32,
        ) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let log = state
                .logs
                .iter_mut()
                .find(|l| l.id == log_id)
                .ok_or_else(|| anyhow::anyhow!("no such log"))?;
            log.status = status.as_str().to_string();
            log.error_message = error.map(String::from);
            log.episodes_generated = episodes;
            log.completed_at = Some(Utc::now());
            Ok(())
        }
    }

    struct StubScripts;

    impl ScriptEngine for StubScripts {
        async fn welcome_script(&self, _user_email: &str) -> ScriptOutcome {
            ScriptOutcome::Generated("Welcome aboard.".to_string())
        }

        async fn daily_script(
            &self,
            _user_email: &str,
            _content: &DailyContent,
        ) -> ScriptOutcome {
            ScriptOutcome::Generated(vec!["word"; 150].join(" "))
        }

        async fn document_script(&self, _document: &DocumentContent) -> ScriptOutcome {
            ScriptOutcome::Generated("Document summary.".to_string())
        }
    }

    struct StubSpeech {
        fail: AtomicBool,
    }

    impl StubSpeech {
        fn ok() -> Self {
            Self {
                fail: AtomicBool::new(false),
            }
        }

        fn broken() -> Self {
            Self {
                fail: AtomicBool::new(true),
            }
        }
    }

    impl SpeechEngine for &StubSpeech {
        async fn synthesize(&self, _text: &str, _voice: Voice) -> Result<Vec<u8>> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("speech backend down")
            }
            Ok(vec![1u8; 64])
        }
    }

    struct StubContent;

    impl ContentSource for StubContent {
        async fn daily_content(&self, _user: &User, day: NaiveDate) -> Result<DailyContent> {
            let analysis = analyze_day_schedule(&[]);
            Ok(DailyContent {
                date: day,
                calendar_summary: build_calendar_summary(&analysis, &[]),
                documents_summary: build_documents_summary(&[]),
                schedule: analysis,
                document_details: Vec::new(),
                documents: Vec::new(),
            })
        }

        async fn document_content(
            &self,
            _user: &User,
            document_id: &str,
        ) -> Result<DocumentContent> {
            Ok(DocumentContent {
                id: document_id.to_string(),
                title: "Quarterly Plan".to_string(),
                content: "Plan body.".to_string(),
                word_count: 2,
                char_count: 10,
            })
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            sweep_concurrency: 2,
            sweep_user_timeout: std::time::Duration::from_secs(5),
            stale_episode_max_age: chrono::Duration::hours(1),
        }
    }

    fn pipeline<'a>(
        store: &'a MemoryStore,
        speech: &'a StubSpeech,
        dir: &tempfile::TempDir,
    ) -> PodcastPipeline<&'a MemoryStore, StubScripts, &'a StubSpeech, StubContent> {
        PodcastPipeline::new(
            store,
            StubScripts,
            AudioRenderer::new(
                speech,
                dir.path().to_path_buf(),
                "http://localhost:8000/audio".to_string(),
            ),
            StubContent,
            settings(),
        )
    }

    #[tokio::test]
    async fn daily_run_completes_log_and_publishes_episode() {
        let store = MemoryStore::default();
        let speech = StubSpeech::ok();
        let dir = tempfile::tempdir().unwrap();
        let user_id = store.add_user("dana@corp.com");

        let pipeline = pipeline(&store, &speech, &dir);
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let episode = pipeline.generate_daily(user_id, day).await.unwrap();

        assert_eq!(episode.episode_type, "daily");
        assert!(!episode.audio_url.is_empty());
        assert_eq!(episode.duration_seconds, 60);

        let logs = store.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "completed");
        assert_eq!(logs[0].episodes_generated, 1);
        assert!(logs[0].completed_at.is_some());
        assert!(logs[0].error_message.is_none());
    }

    #[tokio::test]
    async fn audio_failure_marks_log_failed_with_message() {
        let store = MemoryStore::default();
        let speech = StubSpeech::broken();
        let dir = tempfile::tempdir().unwrap();
        let user_id = store.add_user("dana@corp.com");

        let pipeline = pipeline(&store, &speech, &dir);
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let err = pipeline.generate_daily(user_id, day).await.unwrap_err();
        assert!(format!("{:#}", err).contains("speech backend down"));

        let logs = store.logs();
        assert_eq!(logs[0].status, "failed");
        assert_eq!(logs[0].episodes_generated, 0);
        assert!(logs[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("speech backend down"));

        // The placeholder row is left behind for reconciliation
        let episodes = store.episodes();
        assert_eq!(episodes.len(), 1);
        assert!(episodes[0].audio_url.is_empty());
    }

    #[tokio::test]
    async fn welcome_run_creates_episode_without_a_log() {
        let store = MemoryStore::default();
        let speech = StubSpeech::ok();
        let dir = tempfile::tempdir().unwrap();
        let user_id = store.add_user("dana@corp.com");

        let pipeline = pipeline(&store, &speech, &dir);
        let episode = pipeline.generate_welcome(user_id).await.unwrap();

        assert_eq!(episode.episode_type, "welcome");
        assert!(!episode.audio_url.is_empty());
        assert!(store.logs().is_empty());
    }

    #[tokio::test]
    async fn document_run_uses_document_title() {
        let store = MemoryStore::default();
        let speech = StubSpeech::ok();
        let dir = tempfile::tempdir().unwrap();
        let user_id = store.add_user("dana@corp.com");

        let pipeline = pipeline(&store, &speech, &dir);
        let episode = pipeline.generate_document(user_id, "doc-1").await.unwrap();

        assert_eq!(episode.title, "Document Review: Quarterly Plan");
        assert_eq!(episode.episode_type, "document");
    }

    #[tokio::test]
    async fn reconcile_deletes_only_old_placeholders() {
        let store = MemoryStore::default();
        let speech = StubSpeech::ok();
        let dir = tempfile::tempdir().unwrap();
        let user_id = store.add_user("dana@corp.com");

        // One stale placeholder, one fresh placeholder, one published episode
        {
            let mut state = store.state.lock().unwrap();
            let old = PodcastEpisode {
                id: Uuid::new_v4(),
                user_id,
                title: "Stale".to_string(),
                description: String::new(),
                audio_url: String::new(),
                audio_file_path: String::new(),
                duration_seconds: 0,
                file_size_bytes: 0,
                episode_type: "daily".to_string(),
                source_data: "{}".to_string(),
                created_at: Utc::now() - chrono::Duration::hours(2),
                published_at: Utc::now(),
            };
            let mut fresh = old.clone();
            fresh.id = Uuid::new_v4();
            fresh.title = "Fresh".to_string();
            fresh.created_at = Utc::now();
            let mut published = old.clone();
            published.id = Uuid::new_v4();
            published.title = "Published".to_string();
            published.audio_url = "http://localhost:8000/audio/a.mp3".to_string();
            state.episodes.extend([old, fresh, published]);
        }

        let pipeline = pipeline(&store, &speech, &dir);
        let deleted = pipeline.reconcile_stale_episodes().await.unwrap();
        assert_eq!(deleted, 1);

        let titles: Vec<String> = store.episodes().iter().map(|e| e.title.clone()).collect();
        assert!(!titles.contains(&"Stale".to_string()));
        assert!(titles.contains(&"Fresh".to_string()));
        assert!(titles.contains(&"Published".to_string()));
    }

    #[tokio::test]
    async fn sweep_collects_per_user_failures() {
        let store = MemoryStore::default();
        let speech = StubSpeech::ok();
        let dir = tempfile::tempdir().unwrap();
        store.add_user("ok@corp.com");
        let failing_id = store.add_user("gone@corp.com");

        struct FlakyContent {
            fail_for: Uuid,
        }

        impl ContentSource for FlakyContent {
            async fn daily_content(&self, user: &User, day: NaiveDate) -> Result<DailyContent> {
                if user.id == self.fail_for {
                    anyhow::bail!("calendar unavailable")
                }
                StubContent.daily_content(user, day).await
            }

            async fn document_content(
                &self,
                user: &User,
                document_id: &str,
            ) -> Result<DocumentContent> {
                StubContent.document_content(user, document_id).await
            }
        }

        let pipeline = PodcastPipeline::new(
            &store,
            StubScripts,
            AudioRenderer::new(
                &speech,
                dir.path().to_path_buf(),
                "http://localhost:8000/audio".to_string(),
            ),
            FlakyContent {
                fail_for: failing_id,
            },
            settings(),
        );

        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let summary = pipeline.generate_for_all_active_users(day).await.unwrap();

        assert_eq!(summary.total_users, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("gone@corp.com:"));
        assert!(summary.errors[0].contains("calendar unavailable"));

        // Both the success and the failure are logged
        assert_eq!(store.logs().len(), 2);
    }

    #[tokio::test]
    async fn timed_out_user_still_gets_a_terminal_log() {
        let store = MemoryStore::default();
        let speech = StubSpeech::ok();
        let dir = tempfile::tempdir().unwrap();
        store.add_user("slow@corp.com");

        struct SlowContent;

        impl ContentSource for SlowContent {
            async fn daily_content(&self, user: &User, day: NaiveDate) -> Result<DailyContent> {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                StubContent.daily_content(user, day).await
            }

            async fn document_content(
                &self,
                user: &User,
                document_id: &str,
            ) -> Result<DocumentContent> {
                StubContent.document_content(user, document_id).await
            }
        }

        let pipeline = PodcastPipeline::new(
            &store,
            StubScripts,
            AudioRenderer::new(
                &speech,
                dir.path().to_path_buf(),
                "http://localhost:8000/audio".to_string(),
            ),
            SlowContent,
            PipelineSettings {
                sweep_concurrency: 2,
                sweep_user_timeout: std::time::Duration::from_millis(50),
                stale_episode_max_age: chrono::Duration::hours(1),
            },
        );

        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let summary = pipeline.generate_for_all_active_users(day).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert!(summary.errors[0].contains("Timed out"));

        // The log must not be stranded in `processing`
        let logs = store.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "failed");
        assert!(logs[0].completed_at.is_some());
        assert!(logs[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("Timed out"));
    }
}

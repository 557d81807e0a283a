use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};
use shared_types::{GenerationLog, GenerationStatus, PodcastEpisode, User};
use uuid::Uuid;

use crate::models::NewEpisode;

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    // Parse the connection string and connect with TLS
    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    // Build the async connection from the tokio-postgres client
    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool() -> anyhow::Result<DbPool> {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup =
        Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url,
        manager_config,
    );
    let pool = Pool::builder(config).build()?;

    Ok(pool)
}

pub async fn get_conn(
    pool: &DbPool,
) -> Result<
    diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>,
    diesel_async::pooled_connection::deadpool::PoolError,
> {
    pool.get().await
}

// User database operations
pub mod users {
    use super::*;

    pub async fn get_by_id(conn: &mut AsyncPgConnection, user_id: Uuid) -> anyhow::Result<User> {
        use crate::schema::users::dsl::*;

        let user = users.filter(id.eq(user_id)).first::<User>(conn).await?;

        Ok(user)
    }

    pub async fn get_by_email(
        conn: &mut AsyncPgConnection,
        email_addr: &str,
    ) -> anyhow::Result<Option<User>> {
        use crate::schema::users::dsl::*;

        let user = users
            .filter(email.eq(email_addr))
            .first::<User>(conn)
            .await
            .optional()?;

        Ok(user)
    }

    pub async fn get_by_feed_id(
        conn: &mut AsyncPgConnection,
        feed_id: &str,
    ) -> anyhow::Result<Option<User>> {
        use crate::schema::users::dsl::*;

        let user = users
            .filter(rss_feed_id.eq(feed_id))
            .first::<User>(conn)
            .await
            .optional()?;

        Ok(user)
    }

    pub async fn list_active(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<User>> {
        use crate::schema::users::dsl::*;

        let active_users = users
            .filter(is_active.eq(true))
            .order_by(created_at.asc())
            .load::<User>(conn)
            .await?;

        Ok(active_users)
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        email_addr: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        feed_id: &str,
    ) -> anyhow::Result<User> {
        use crate::schema::users::dsl::*;

        let new_user = diesel::insert_into(users)
            .values((
                email.eq(email_addr),
                google_access_token.eq(access_token),
                google_refresh_token.eq(refresh_token),
                rss_feed_id.eq(feed_id),
                is_active.eq(true),
            ))
            .get_result::<User>(conn)
            .await?;

        Ok(new_user)
    }

    /// Overwrite OAuth tokens on re-login. The refresh token is only
    /// replaced when Google sends a new one.
    pub async fn update_tokens(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> anyhow::Result<User> {
        use crate::schema::users::dsl::*;

        if let Some(rt) = refresh_token {
            diesel::update(users.filter(id.eq(user_id)))
                .set(google_refresh_token.eq(Some(rt)))
                .execute(conn)
                .await?;
        }

        let updated = diesel::update(users.filter(id.eq(user_id)))
            .set((
                google_access_token.eq(access_token),
                updated_at.eq(Utc::now()),
            ))
            .get_result::<User>(conn)
            .await?;

        Ok(updated)
    }

    #[allow(dead_code)]
    pub async fn deactivate(conn: &mut AsyncPgConnection, user_id: Uuid) -> anyhow::Result<User> {
        use crate::schema::users::dsl::*;

        let updated = diesel::update(users.filter(id.eq(user_id)))
            .set((is_active.eq(false), updated_at.eq(Utc::now())))
            .get_result::<User>(conn)
            .await?;

        Ok(updated)
    }
}

// Podcast episode database operations
pub mod episodes {
    use super::*;

    /// Phase one of the two-phase episode write: a row with empty audio fields.
    pub async fn create_placeholder(
        conn: &mut AsyncPgConnection,
        episode: NewEpisode,
    ) -> anyhow::Result<PodcastEpisode> {
        use crate::schema::podcast_episodes::dsl::*;

        let row = diesel::insert_into(podcast_episodes)
            .values(&episode)
            .get_result::<PodcastEpisode>(conn)
            .await?;

        Ok(row)
    }

    /// Phase two: fill in audio fields once rendering has completed.
    pub async fn attach_audio(
        conn: &mut AsyncPgConnection,
        episode_id: Uuid,
        url: &str,
        file_path: &str,
        duration_secs: i32,
        size_bytes: i64,
    ) -> anyhow::Result<PodcastEpisode> {
        use crate::schema::podcast_episodes::dsl::*;

        let updated = diesel::update(podcast_episodes.filter(id.eq(episode_id)))
            .set((
                audio_url.eq(url),
                audio_file_path.eq(file_path),
                duration_seconds.eq(duration_secs),
                file_size_bytes.eq(size_bytes),
                published_at.eq(Utc::now()),
            ))
            .get_result::<PodcastEpisode>(conn)
            .await?;

        Ok(updated)
    }

    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<PodcastEpisode>> {
        use crate::schema::podcast_episodes::dsl::*;

        let rows = podcast_episodes
            .filter(user_id.eq(owner_id))
            .order_by(published_at.desc())
            .limit(limit)
            .load::<PodcastEpisode>(conn)
            .await?;

        Ok(rows)
    }

    /// Delete placeholder rows that never received audio within the cutoff
    /// window (a crash between the two write phases leaves them behind).
    pub async fn delete_stale_placeholders(
        conn: &mut AsyncPgConnection,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<usize> {
        use crate::schema::podcast_episodes::dsl::*;

        let deleted = diesel::delete(
            podcast_episodes
                .filter(audio_url.eq(""))
                .filter(created_at.lt(cutoff)),
        )
        .execute(conn)
        .await?;

        Ok(deleted)
    }
}

// Generation log database operations
pub mod generation_logs {
    use super::*;

    pub async fn create(conn: &mut AsyncPgConnection, owner_id: Uuid) -> anyhow::Result<GenerationLog> {
        use crate::schema::generation_logs::dsl::*;

        let log = diesel::insert_into(generation_logs)
            .values((
                user_id.eq(owner_id),
                status.eq(GenerationStatus::Pending.as_str()),
                episodes_generated.eq(0),
            ))
            .get_result::<GenerationLog>(conn)
            .await?;

        Ok(log)
    }

    pub async fn mark_processing(
        conn: &mut AsyncPgConnection,
        log_id: Uuid,
    ) -> anyhow::Result<GenerationLog> {
        use crate::schema::generation_logs::dsl::*;

        let updated = diesel::update(generation_logs.filter(id.eq(log_id)))
            .set(status.eq(GenerationStatus::Processing.as_str()))
            .get_result::<GenerationLog>(conn)
            .await?;

        Ok(updated)
    }

    /// Finalize a log as completed or failed; sets the completion timestamp.
    pub async fn finish(
        conn: &mut AsyncPgConnection,
        log_id: Uuid,
        final_status: GenerationStatus,
        error: Option<&str>,
        episodes: i32,
    ) -> anyhow::Result<GenerationLog> {
        use crate::schema::generation_logs::dsl::*;

        let updated = diesel::update(generation_logs.filter(id.eq(log_id)))
            .set((
                status.eq(final_status.as_str()),
                error_message.eq(error),
                episodes_generated.eq(episodes),
                completed_at.eq(Some(Utc::now())),
            ))
            .get_result::<GenerationLog>(conn)
            .await?;

        Ok(updated)
    }

    #[allow(dead_code)]
    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<GenerationLog>> {
        use crate::schema::generation_logs::dsl::*;

        let rows = generation_logs
            .filter(user_id.eq(owner_id))
            .order_by(started_at.desc())
            .limit(limit)
            .load::<GenerationLog>(conn)
            .await?;

        Ok(rows)
    }
}

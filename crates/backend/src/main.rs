use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
};

mod auth;
mod config;
mod content;
mod db;
pub mod error;
mod feed;
mod generation;
mod google;
mod handlers;
mod models;
mod pipeline;
mod schema;

use auth::AuthConfig;
use config::PodcastConfig;
use content::documents::PrioritizerOptions;
use content::GoogleContentSource;
use generation::{AudioRenderer, OpenAiScriptEngine, OpenAiSpeechEngine};
use pipeline::{PgStore, PipelineSettings, PodcastPipeline};

pub type AppPipeline =
    PodcastPipeline<PgStore, OpenAiScriptEngine, OpenAiSpeechEngine, GoogleContentSource>;

#[derive(Clone)]
pub struct AppState {
    pub pool: db::DbPool,
    pub auth_config: Arc<AuthConfig>,
    pub config: Arc<PodcastConfig>,
    pub pipeline: Arc<AppPipeline>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let auth_config = AuthConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let config = PodcastConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let pool = db::establish_connection_pool()?;

    let http = reqwest::Client::new();

    let content_source = GoogleContentSource::new(
        http.clone(),
        auth_config.google_client_id.clone(),
        auth_config.google_client_secret.clone(),
        config.document_lookback_days,
        PrioritizerOptions {
            include_attachment_only: config.include_attachment_only_docs,
        },
    );

    let pipeline = PodcastPipeline::new(
        PgStore::new(pool.clone()),
        OpenAiScriptEngine::new(http.clone(), config.openai_api_key.clone()),
        AudioRenderer::new(
            OpenAiSpeechEngine::new(http, config.openai_api_key.clone()),
            config.audio_storage_path.clone(),
            config.audio_base_url.clone(),
        ),
        content_source,
        PipelineSettings {
            sweep_concurrency: config.sweep_concurrency,
            sweep_user_timeout: config.sweep_user_timeout,
            stale_episode_max_age: config.stale_episode_max_age,
        },
    );

    let audio_dir = config.audio_storage_path.clone();

    let state = AppState {
        pool,
        auth_config: Arc::new(auth_config),
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
    };

    let app = Router::new()
        .route("/health", get(handlers::health))
        // OAuth routes
        .route("/auth/google/login", get(auth::handlers::google_login))
        .route("/auth/google/callback", get(auth::handlers::google_callback))
        // User routes
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/episodes", get(handlers::list_episodes))
        .route("/users/:id/rss", get(handlers::get_user_feed))
        // Public feed route for podcast clients
        .route("/rss/:feed_id", get(handlers::get_feed))
        // Generation routes
        .route("/generate-podcast/:id", post(handlers::generate_daily))
        .route(
            "/generate-welcome-podcast/:id",
            post(handlers::generate_welcome),
        )
        .route(
            "/generate-document-podcast/:id/:document_id",
            post(handlers::generate_document),
        )
        // Scheduler entry point
        .route("/admin/generate-all", post(handlers::generate_all))
        // Rendered episode audio
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(build_cors_layer())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000u16);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build CORS layer based on environment configuration.
///
/// If CORS_ALLOWED_ORIGINS is set, only those origins are allowed.
/// If not set, defaults to permissive CORS (for development only).
fn build_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS").ok();

    match allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!(
                    "CORS_ALLOWED_ORIGINS is set but empty, using permissive CORS (not recommended for production)"
                );
                CorsLayer::permissive()
            } else {
                tracing::info!("CORS configured for origins: {:?}", origins);
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                    .allow_credentials(true)
            }
        }
        None => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
            );
            CorsLayer::permissive()
        }
    }
}

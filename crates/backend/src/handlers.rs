//! HTTP handlers for the podcast API.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use shared_types::{EpisodeResponse, GenerateResponse, SweepSummary, UserResponse};
use uuid::Uuid;

use crate::auth::middleware::extract_auth_user;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::feed::build_user_feed;
use crate::AppState;

const EPISODE_PAGE_SIZE: i64 = 50;
const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

fn authorize_owner(
    headers: &HeaderMap,
    state: &AppState,
    owner_id: Uuid,
) -> ApiResult<AuthUser> {
    let auth_user = extract_auth_user(headers, &state.auth_config)
        .map_err(|(_, body)| ApiError::Unauthorized(body.0.error.clone()))?;

    if auth_user.user_id != owner_id {
        return Err(ApiError::forbidden(
            "You do not have access to this user's resources",
        ));
    }

    Ok(auth_user)
}

/// GET /users/:id - the caller's own profile.
pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    authorize_owner(&headers, &state, user_id)?;

    let mut conn = crate::db::get_conn(&state.pool).await?;
    let user = crate::db::users::get_by_id(&mut conn, user_id)
        .await
        .map_err(|_| ApiError::not_found("User"))?;

    Ok(Json(UserResponse::from(user)))
}

/// GET /users/:id/episodes - the caller's episode list, newest first.
pub async fn list_episodes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EpisodeResponse>>> {
    authorize_owner(&headers, &state, user_id)?;

    let mut conn = crate::db::get_conn(&state.pool).await?;
    let episodes =
        crate::db::episodes::list_for_user(&mut conn, user_id, EPISODE_PAGE_SIZE).await?;

    Ok(Json(episodes.into_iter().map(EpisodeResponse::from).collect()))
}

fn rss_response(xml: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        xml,
    )
        .into_response()
}

/// GET /rss/:feed_id - public feed endpoint for podcast apps.
///
/// The feed id is an unguessable opaque token, which is the only access
/// control a standard podcast client can support.
pub async fn get_feed(
    State(state): State<AppState>,
    Path(feed_id): Path<String>,
) -> ApiResult<Response> {
    let mut conn = crate::db::get_conn(&state.pool).await?;

    let user = crate::db::users::get_by_feed_id(&mut conn, &feed_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Feed"))?;

    let episodes =
        crate::db::episodes::list_for_user(&mut conn, user.id, EPISODE_PAGE_SIZE).await?;

    Ok(rss_response(build_user_feed(
        &user,
        &episodes,
        &state.config.public_base_url,
    )))
}

/// GET /users/:id/rss - same feed, addressed by user id for the app UI.
pub async fn get_user_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Response> {
    authorize_owner(&headers, &state, user_id)?;

    let mut conn = crate::db::get_conn(&state.pool).await?;
    let user = crate::db::users::get_by_id(&mut conn, user_id)
        .await
        .map_err(|_| ApiError::not_found("User"))?;
    let episodes =
        crate::db::episodes::list_for_user(&mut conn, user.id, EPISODE_PAGE_SIZE).await?;

    Ok(rss_response(build_user_feed(
        &user,
        &episodes,
        &state.config.public_base_url,
    )))
}

/// POST /generate-podcast/:id - generate today's briefing on demand.
pub async fn generate_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<GenerateResponse>> {
    authorize_owner(&headers, &state, user_id)?;

    let episode = state
        .pipeline
        .generate_daily(user_id, Utc::now().date_naive())
        .await?;

    Ok(Json(GenerateResponse {
        episode: EpisodeResponse::from(episode),
    }))
}

/// POST /generate-welcome-podcast/:id
pub async fn generate_welcome(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<GenerateResponse>> {
    authorize_owner(&headers, &state, user_id)?;

    let episode = state.pipeline.generate_welcome(user_id).await?;

    Ok(Json(GenerateResponse {
        episode: EpisodeResponse::from(episode),
    }))
}

/// POST /generate-document-podcast/:id/:document_id
pub async fn generate_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((user_id, document_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<GenerateResponse>> {
    authorize_owner(&headers, &state, user_id)?;

    let episode = state
        .pipeline
        .generate_document(user_id, &document_id)
        .await?;

    Ok(Json(GenerateResponse {
        episode: EpisodeResponse::from(episode),
    }))
}

/// POST /admin/generate-all - daily sweep over every active user.
///
/// Guarded by a shared secret header instead of a user session, since
/// the caller is a scheduler rather than a person.
pub async fn generate_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SweepSummary>> {
    let expected = state
        .auth_config
        .admin_token
        .as_deref()
        .ok_or_else(|| ApiError::forbidden("Admin endpoint is disabled"))?;

    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing admin token".to_string()))?;

    if provided != expected {
        return Err(ApiError::forbidden("Invalid admin token"));
    }

    let summary = state
        .pipeline
        .generate_for_all_active_users(Utc::now().date_naive())
        .await?;

    Ok(Json(summary))
}

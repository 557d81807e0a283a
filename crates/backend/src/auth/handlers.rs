//! OAuth login flow handlers.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared_types::{AuthCallbackResponse, LoginInitResponse, UserResponse};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::jwt;
use super::middleware::build_auth_cookie;

const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/documents.readonly",
    "https://www.googleapis.com/auth/drive.readonly",
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// GET /auth/google/login - return the Google consent URL.
pub async fn google_login(State(state): State<AppState>) -> Json<LoginInitResponse> {
    let config = &state.auth_config;

    // offline access with forced consent so we always receive a refresh token
    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        GOOGLE_AUTH_ENDPOINT,
        urlencoding::encode(&config.google_client_id),
        urlencoding::encode(&config.auth_redirect_uri),
        urlencoding::encode(&OAUTH_SCOPES.join(" ")),
    );

    Json(LoginInitResponse { auth_url })
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
}

/// GET /auth/google/callback - exchange the code, upsert the user, and
/// hand back a session token.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Response> {
    let config = &state.auth_config;
    let http = reqwest::Client::new();

    let token_response = http
        .post(GOOGLE_TOKEN_ENDPOINT)
        .form(&[
            ("code", params.code.as_str()),
            ("client_id", config.google_client_id.as_str()),
            ("client_secret", config.google_client_secret.as_str()),
            ("redirect_uri", config.auth_redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| ApiError::ExternalService(format!("Token exchange failed: {}", e)))?;

    if !token_response.status().is_success() {
        let status = token_response.status();
        let body = token_response.text().await.unwrap_or_default();
        return Err(ApiError::ExternalService(format!(
            "Token exchange rejected: {} - {}",
            status, body
        )));
    }

    let tokens: TokenResponse = token_response
        .json()
        .await
        .map_err(|e| ApiError::ExternalService(format!("Invalid token response: {}", e)))?;

    let userinfo: GoogleUserInfo = http
        .get(GOOGLE_USERINFO_ENDPOINT)
        .bearer_auth(&tokens.access_token)
        .send()
        .await
        .map_err(|e| ApiError::ExternalService(format!("Userinfo request failed: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::ExternalService(format!("Invalid userinfo response: {}", e)))?;

    let mut conn = crate::db::get_conn(&state.pool).await?;

    let existing = crate::db::users::get_by_email(&mut conn, &userinfo.email).await?;

    let user = match existing {
        Some(user) => {
            crate::db::users::update_tokens(
                &mut conn,
                user.id,
                &tokens.access_token,
                tokens.refresh_token.as_deref(),
            )
            .await?
        }
        None => {
            let feed_id = Uuid::new_v4().to_string();
            let user = crate::db::users::create(
                &mut conn,
                &userinfo.email,
                &tokens.access_token,
                tokens.refresh_token.as_deref(),
                &feed_id,
            )
            .await?;

            tracing::info!(email = %user.email, "New user registered");

            // Kick off the welcome episode so the feed is not empty on
            // first subscription
            let pipeline = state.pipeline.clone();
            let new_user_id = user.id;
            tokio::spawn(async move {
                if let Err(err) = pipeline.generate_welcome(new_user_id).await {
                    tracing::error!("Welcome episode generation failed: {:#}", err);
                }
            });

            user
        }
    };

    let token = jwt::create_token(config, &user.email, user.id)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Could not create session token: {}", e)))?;

    let cookie = build_auth_cookie(&config.cookie_name, &token, config.token_duration_days);

    let body = Json(AuthCallbackResponse {
        token,
        user: UserResponse::from(user),
    });

    let mut response = body.into_response();
    if let Ok(cookie_value) = cookie.parse() {
        response.headers_mut().insert(header::SET_COOKIE, cookie_value);
    }

    Ok(response)
}

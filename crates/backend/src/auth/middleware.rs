//! Authentication middleware layer for protecting routes.

use axum::{
    http::{header, StatusCode},
    Json,
};

use crate::error::ErrorResponse;

use super::jwt;
use super::types::{AuthConfig, AuthUser, Claims};

fn extract_token_from_cookie(headers: &axum::http::HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie_str in cookie_header.split(';') {
        if let Ok(cookie) = cookie::Cookie::parse(cookie_str.trim()) {
            if cookie.name() == cookie_name {
                return Some(cookie.value().to_string());
            }
        }
    }

    None
}

fn extract_token_from_header(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.to_string())
}

/// Build an auth cookie string.
pub fn build_auth_cookie(name: &str, value: &str, days: i64) -> String {
    let max_age = days * 24 * 60 * 60;
    let secure = if std::env::var("RUST_ENV").unwrap_or_default() == "production" {
        "; Secure"
    } else {
        ""
    };
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        name, value, max_age, secure
    )
}

/// Extract and validate the user from request headers.
///
/// The token is read from the auth cookie first, then from a Bearer
/// Authorization header.
pub fn extract_auth_user(
    headers: &axum::http::HeaderMap,
    config: &AuthConfig,
) -> Result<AuthUser, (StatusCode, Json<ErrorResponse>)> {
    let token = extract_token_from_cookie(headers, &config.cookie_name)
        .or_else(|| extract_token_from_header(headers))
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Missing authentication".to_string(),
                    details: None,
                }),
            )
        })?;

    let claims: Claims = jwt::validate_token(config, &token).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid or expired token".to_string(),
                details: None,
            }),
        )
    })?;

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
    })
}

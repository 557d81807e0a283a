//! Google OAuth token refresh.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

/// Exchange a stored refresh token for a fresh access token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<RefreshedToken> {
    #[derive(Serialize)]
    struct RefreshRequest<'a> {
        client_id: &'a str,
        client_secret: &'a str,
        refresh_token: &'a str,
        grant_type: &'a str,
    }

    let response = http
        .post(TOKEN_ENDPOINT)
        .form(&RefreshRequest {
            client_id,
            client_secret,
            refresh_token,
            grant_type: "refresh_token",
        })
        .send()
        .await
        .context("Token refresh request failed")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Token refresh failed: {} - {}", status, body);
    }

    let token: RefreshedToken = response
        .json()
        .await
        .context("Invalid token refresh response")?;

    Ok(token)
}

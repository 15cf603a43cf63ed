use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConnectorError;

pub const GOOGLE_DEVICE_CODE_URL: &str = "https://oauth2.googleapis.com/device/code";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAuthStart {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub expires_in: i64,
    pub interval: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl OAuthTokens {
    fn from_json(v: &serde_json::Value) -> Self {
        OAuthTokens {
            access_token: v["access_token"].as_str().unwrap_or_default().to_string(),
            refresh_token: v
                .get("refresh_token")
                .and_then(|s| s.as_str())
                .map(|s| s.to_string()),
            expires_in: v.get("expires_in").and_then(|i| i.as_i64()),
            scope: v
                .get("scope")
                .and_then(|s| s.as_str())
                .map(|s| s.to_string()),
            token_type: v
                .get("token_type")
                .and_then(|s| s.as_str())
                .map(|s| s.to_string()),
        }
    }
}

async fn post_form(
    url: &str,
    body: &[(&str, String)],
    what: &str,
) -> Result<serde_json::Value, ConnectorError> {
    let resp = reqwest::Client::new()
        .post(url)
        .form(body)
        .send()
        .await
        .map_err(ConnectorError::HttpRequest)?;
    let status = resp.status();
    let v = resp
        .json::<serde_json::Value>()
        .await
        .map_err(|e| ConnectorError::Other(e.to_string()))?;
    if !status.is_success() {
        return Err(ConnectorError::Authentication(format!(
            "{} failed: {}",
            what, v
        )));
    }
    Ok(v)
}

pub async fn google_device_authorize(
    client_id: &str,
    scopes: &str,
) -> Result<DeviceAuthStart, ConnectorError> {
    let body = [
        ("client_id", client_id.to_string()),
        ("scope", scopes.to_string()),
    ];
    let v = post_form(GOOGLE_DEVICE_CODE_URL, &body, "device authorize").await?;
    Ok(DeviceAuthStart {
        device_code: v["device_code"].as_str().unwrap_or_default().to_string(),
        user_code: v["user_code"].as_str().unwrap_or_default().to_string(),
        verification_uri: v["verification_url"]
            .as_str()
            .or_else(|| v["verification_uri"].as_str())
            .unwrap_or_default()
            .to_string(),
        verification_uri_complete: v
            .get("verification_url_complete")
            .or_else(|| v.get("verification_uri_complete"))
            .and_then(|s| s.as_str())
            .map(|s| s.to_string()),
        expires_in: v["expires_in"].as_i64().unwrap_or(1800),
        interval: v.get("interval").and_then(|i| i.as_i64()),
    })
}

pub async fn google_device_poll(
    client_id: &str,
    client_secret: Option<&str>,
    device_code: &str,
) -> Result<OAuthTokens, ConnectorError> {
    let mut body = vec![
        (
            "grant_type",
            "urn:ietf:params:oauth:grant-type:device_code".to_string(),
        ),
        ("client_id", client_id.to_string()),
        ("device_code", device_code.to_string()),
    ];
    if let Some(cs) = client_secret {
        if !cs.is_empty() {
            body.push(("client_secret", cs.to_string()));
        }
    }
    let v = post_form(GOOGLE_TOKEN_URL, &body, "poll").await?;
    Ok(OAuthTokens::from_json(&v))
}

/// Refresh grant against `token_url` (normally [`GOOGLE_TOKEN_URL`]).
pub async fn google_refresh_token(
    token_url: &str,
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
) -> Result<OAuthTokens, ConnectorError> {
    let mut body = vec![
        ("grant_type", "refresh_token".to_string()),
        ("client_id", client_id.to_string()),
        ("refresh_token", refresh_token.to_string()),
    ];
    if let Some(cs) = client_secret {
        if !cs.is_empty() {
            body.push(("client_secret", cs.to_string()));
        }
    }
    let v = post_form(token_url, &body, "refresh").await?;
    Ok(OAuthTokens::from_json(&v))
}

pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Merge freshly issued tokens into stored auth details, stamping
/// `expires_at` a minute early so a token is never used right at expiry.
pub fn apply_tokens(
    mut map: HashMap<String, String>,
    tokens: &OAuthTokens,
) -> HashMap<String, String> {
    map.insert("access_token".to_string(), tokens.access_token.clone());
    if let Some(r) = &tokens.refresh_token {
        map.insert("refresh_token".to_string(), r.clone());
    }
    if let Some(ex) = tokens.expires_in {
        let expires_at = now_epoch() + ex - 60;
        map.insert("expires_in".to_string(), ex.to_string());
        map.insert("expires_at".to_string(), expires_at.to_string());
    }
    map
}

/// The stored access token, if present and not past `expires_at`. A token
/// without `expires_at` is taken at face value.
pub fn unexpired_access_token(auth: &HashMap<String, String>) -> Option<String> {
    let at = auth.get("access_token").filter(|s| !s.is_empty())?;
    match auth.get("expires_at") {
        Some(exp_at) if exp_at.parse::<i64>().unwrap_or(0) <= now_epoch() => None,
        _ => Some(at.clone()),
    }
}

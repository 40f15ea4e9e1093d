// Shared plumbing for the Supabase REST surfaces (GoTrue /auth/v1, PostgREST /rest/v1)

use crate::utils::AppError;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Supabase HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// `{base}/rest/v1/{table}?col=eq.value&...`
    pub fn rest_url(&self, table: &str, filters: &[(&str, &str)]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        if !filters.is_empty() {
            let query: Vec<String> = filters
                .iter()
                .map(|(column, value)| format!("{}={}", column, urlencoding::encode(value)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// Request carrying the project key; `bearer` is the session (or service) token.
    /// Without a session the anon key doubles as bearer, as supabase-js does.
    pub fn request(&self, method: Method, url: &str, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    pub async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, AppError> {
        request
            .send()
            .await
            .map_err(|e| AppError::transport(context, e))
    }

    /// Decodes a 2xx body, mapping error statuses onto the taxonomy
    pub async fn read_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T, AppError> {
        let response = Self::check_status(response, context).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::transport(context, e))
    }

    pub async fn check_status(response: Response, context: &str) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        log::warn!("⚠️ {} failed with {}: {}", context, status, message);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::Auth(format!("{}: {}", context, message))
            }
            _ => AppError::Transport(format!("{} ({}): {}", context, status, message)),
        })
    }
}

/// GoTrue and PostgREST both put the human message in one of these keys
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_url_encodes_filters() {
        let client = SupabaseClient::new("https://x.supabase.co/", "anon", Duration::from_secs(1)).unwrap();
        let url = client.rest_url("budget_settings", &[("user_id", "eq.a b"), ("select", "*")]);

        assert_eq!(
            url,
            "https://x.supabase.co/rest/v1/budget_settings?user_id=eq.a%20b&select=%2A"
        );
    }

    #[test]
    fn test_error_message_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(error_message(body).as_deref(), Some("Invalid login credentials"));
        assert_eq!(error_message("not json"), None);
    }
}

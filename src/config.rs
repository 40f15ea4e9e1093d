// ==================== APP CONFIG ====================
// Lido uma vez no startup (dotenv + env) e repassado por referência

use crate::utils::AppError;
use std::env;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 300;
const MIN_MONITOR_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: String,
    pub ozon_api_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    /// Needed by the background monitor to read every user's settings
    pub supabase_service_role_key: Option<String>,
    pub database_url: String,
    pub http_timeout: Duration,
    pub budget_monitor_enabled: bool,
    pub budget_monitor_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch process env
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, AppError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
        };

        let http_timeout_secs = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| AppError::Config(format!("HTTP_TIMEOUT_SECS is not a number: {}", raw)))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let monitor_enabled = lookup("BUDGET_MONITOR_ENABLED")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(true);

        let monitor_interval_secs = lookup("BUDGET_MONITOR_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MONITOR_INTERVAL_SECS)
            .max(MIN_MONITOR_INTERVAL_SECS);

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT").unwrap_or_else(|| "3002".to_string()),
            ozon_api_url: trim_base_url(required("OZON_API_URL")?),
            supabase_url: trim_base_url(required("SUPABASE_URL")?),
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET")?,
            supabase_service_role_key: lookup("SUPABASE_SERVICE_ROLE_KEY")
                .filter(|v| !v.trim().is_empty()),
            database_url: required("DATABASE_URL")?,
            http_timeout: Duration::from_secs(http_timeout_secs),
            budget_monitor_enabled: monitor_enabled,
            budget_monitor_interval: Duration::from_secs(monitor_interval_secs),
        })
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

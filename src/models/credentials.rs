use serde::{Deserialize, Serialize};

/// Static key pair sent as `Client-Id` / `Api-Key` on every marketplace call
#[derive(Clone, Deserialize, Serialize, PartialEq)]
pub struct MarketplaceCredentials {
    pub client_id: String,
    pub api_key: String,
}

impl MarketplaceCredentials {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Api key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let visible: String = self
            .api_key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }
}

// Never print the key
impl std::fmt::Debug for MarketplaceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceCredentials")
            .field("client_id", &self.client_id)
            .field("api_key", &self.masked_api_key())
            .finish()
    }
}

/// Row of the `ozon_credentials` table
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CredentialRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub user_id: String,
    pub client_id: String,
    pub api_key: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_true() -> bool {
    true
}

impl CredentialRecord {
    pub fn credentials(&self) -> MarketplaceCredentials {
        MarketplaceCredentials::new(self.client_id.clone(), self.api_key.clone())
    }
}

/// What the API hands back to the browser: the key is never echoed in full
#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct CredentialsInfo {
    pub client_id: String,
    pub api_key_masked: String,
}

impl From<&MarketplaceCredentials> for CredentialsInfo {
    fn from(creds: &MarketplaceCredentials) -> Self {
        Self {
            client_id: creds.client_id.clone(),
            api_key_masked: creds.masked_api_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_api_key_keeps_last_four() {
        let creds = MarketplaceCredentials::new("42", "abcdef123456");
        assert_eq!(creds.masked_api_key(), "****3456");
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let creds = MarketplaceCredentials::new("42", "super-secret-key");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("****-key"));
    }
}

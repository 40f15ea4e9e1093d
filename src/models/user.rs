use serde::{Deserialize, Serialize};

/// Identity record. `id` and `email` come from GoTrue; the profile fields
/// live in the `users` table and are filled in after sign-up.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: User,
}

/// Row patched into `users` after the identity record exists
#[derive(Debug, Serialize, Clone)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub company_name: String,
}

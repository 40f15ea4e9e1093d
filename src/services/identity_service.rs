// ==================== SESSION / IDENTITY GATEWAY ====================
// Sign-in, sign-up, sign-out e "usuário atual" contra o Supabase GoTrue.
// O perfil (full_name, company_name) fica na tabela `users` via PostgREST.

use crate::{
    models::{AuthSession, ProfileUpdate, User},
    services::supabase::SupabaseClient,
    utils::AppError,
};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub company_name: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Sign-up either opens a session right away or, when e-mail confirmation
/// is on, only creates the identity
#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct SignUpOutcome {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<AuthSession>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(User),
}

#[derive(Clone)]
pub struct IdentityGateway {
    supabase: SupabaseClient,
}

impl IdentityGateway {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        log::info!("🔐 Signing in {}", email);

        let url = self.supabase.auth_url("token?grant_type=password");
        let request = self
            .supabase
            .request(Method::POST, &url, None)
            .json(&serde_json::json!({ "email": email, "password": password }));
        let response = self.supabase.send(request, "Sign-in request failed").await?;

        // GoTrue answers bad credentials with 400 invalid_grant
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(AppError::Auth("Invalid login credentials".to_string()));
        }
        SupabaseClient::read_json(response, "Sign-in").await
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AppError> {
        let url = self.supabase.auth_url("token?grant_type=refresh_token");
        let request = self
            .supabase
            .request(Method::POST, &url, None)
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let response = self.supabase.send(request, "Session refresh failed").await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(AppError::Auth("Invalid refresh token".to_string()));
        }
        SupabaseClient::read_json(response, "Session refresh").await
    }

    /// Creates the identity, then writes the profile. A failed profile write
    /// is returned as-is: the identity stays created and nothing rolls it back.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        company_name: &str,
    ) -> Result<SignUpOutcome, AppError> {
        log::info!("📝 Signing up {}", email);

        let url = self.supabase.auth_url("signup");
        let request = self
            .supabase
            .request(Method::POST, &url, None)
            .json(&serde_json::json!({ "email": email, "password": password }));
        let response = self.supabase.send(request, "Sign-up request failed").await?;

        if response.status() == StatusCode::BAD_REQUEST || response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!("Sign-up rejected: {}", body)));
        }
        let created: SignUpResponse = SupabaseClient::read_json(response, "Sign-up").await?;

        let (mut user, session) = match created {
            SignUpResponse::Session(session) => (session.user.clone(), Some(session)),
            SignUpResponse::User(user) => (user, None),
        };
        log::info!("✅ Identity created: {}", user.id);

        let profile = ProfileUpdate {
            full_name: full_name.to_string(),
            company_name: company_name.to_string(),
        };
        let bearer = session.as_ref().map(|s| s.access_token.as_str());
        if let Err(e) = self.update_profile(bearer, &user.id, &profile).await {
            log::error!("❌ Profile update failed after identity {} was created: {}", user.id, e);
            return Err(e);
        }

        user.full_name = Some(profile.full_name);
        user.company_name = Some(profile.company_name);
        Ok(SignUpOutcome { user, session })
    }

    async fn update_profile(
        &self,
        bearer: Option<&str>,
        user_id: &str,
        profile: &ProfileUpdate,
    ) -> Result<(), AppError> {
        let filter = format!("eq.{}", user_id);
        let url = self.supabase.rest_url("users", &[("id", filter.as_str())]);
        let request = self
            .supabase
            .request(Method::PATCH, &url, bearer)
            .header("Prefer", "return=minimal")
            .json(profile);
        let response = self.supabase.send(request, "Profile update failed").await?;
        SupabaseClient::check_status(response, "Profile update").await?;
        Ok(())
    }

    /// Idempotent: a session the backend no longer knows counts as signed out
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let url = self.supabase.auth_url("logout");
        let request = self.supabase.request(Method::POST, &url, Some(access_token));
        let response = self.supabase.send(request, "Sign-out request failed").await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                log::debug!("Sign-out on an already invalid session");
                Ok(())
            }
            _ => {
                SupabaseClient::check_status(response, "Sign-out").await?;
                Ok(())
            }
        }
    }

    /// `Ok(None)` when there is no session or the backend rejects it;
    /// only transport and server failures are errors
    pub async fn get_current_user(&self, access_token: Option<&str>) -> Result<Option<User>, AppError> {
        let Some(token) = access_token else {
            return Ok(None);
        };

        let url = self.supabase.auth_url("user");
        let request = self.supabase.request(Method::GET, &url, Some(token));
        let response = self.supabase.send(request, "User lookup failed").await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => SupabaseClient::read_json::<User>(response, "User lookup").await.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_json, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn gateway(server: &MockServer) -> IdentityGateway {
        let supabase = SupabaseClient::new(&server.uri(), "anon-key", Duration::from_secs(5)).unwrap();
        IdentityGateway::new(supabase)
    }

    fn session_json(user_id: &str) -> serde_json::Value {
        json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": user_id, "email": "seller@example.com" }
        })
    }

    #[tokio::test]
    async fn test_sign_in_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({ "email": "seller@example.com", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json("u1")))
            .mount(&server)
            .await;

        let session = gateway(&server).sign_in("seller@example.com", "pw").await.unwrap();
        assert_eq!(session.access_token, "access-1");
        assert_eq!(session.user.id, "u1");
    }

    #[tokio::test]
    async fn test_sign_in_bad_credentials_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let result = gateway(&server).sign_in("seller@example.com", "wrong").await;
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[tokio::test]
    async fn test_sign_up_updates_profile() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json("u2")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/users"))
            .and(query_param("id", "eq.u2"))
            .and(header("Authorization", "Bearer access-1"))
            .and(body_json(json!({ "full_name": "Ivan Petrov", "company_name": "Acme" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway(&server)
            .sign_up("seller@example.com", "pw", "Ivan Petrov", "Acme")
            .await
            .unwrap();

        assert_eq!(outcome.user.id, "u2");
        assert_eq!(outcome.user.company_name.as_deref(), Some("Acme"));
        assert!(outcome.session.is_some());
    }

    #[tokio::test]
    async fn test_sign_up_profile_failure_leaves_identity_in_place() {
        let server = MockServer::start().await;

        // Confirmation-required flow: GoTrue returns the bare user
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u3", "email": "seller@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "db down" })))
            .expect(1)
            .mount(&server)
            .await;

        let result = gateway(&server)
            .sign_up("seller@example.com", "pw", "Ivan", "Acme")
            .await;

        assert!(matches!(result, Err(AppError::Transport(msg)) if msg.contains("db down")));

        // No compensating delete was issued: the identity record persists
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.method.as_str() != "DELETE"));
    }

    #[tokio::test]
    async fn test_sign_out_is_idempotent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("Authorization", "Bearer live"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("Authorization", "Bearer gone"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        assert!(gateway.sign_out("live").await.is_ok());
        assert!(gateway.sign_out("gone").await.is_ok());
    }

    #[tokio::test]
    async fn test_current_user_without_session_is_none() {
        let server = MockServer::start().await;

        let user = gateway(&server).get_current_user(None).await.unwrap();

        assert!(user.is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_current_user_with_rejected_token_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let user = gateway(&server).get_current_user(Some("expired")).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_current_user_server_error_is_transport() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = gateway(&server).get_current_user(Some("t")).await;
        assert!(matches!(result, Err(AppError::Transport(_))));
    }
}

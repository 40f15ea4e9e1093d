// ==================== DASHBOARD CONTROLLER ====================
// Máquina de estados da página: Loading -> Unauthenticated | Error | Ready.
// Trocar de aba não faz chamada de rede; cada view busca seus próprios dados.

use crate::{
    models::{CredentialsInfo, MarketplaceCredentials, User},
    services::{credential_store::CredentialStore, identity_service::IdentityGateway},
    utils::AppError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const USER_LOAD_ERROR: &str = "Failed to load user data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DashboardTab {
    #[default]
    Bids,
    Budget,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardState {
    Loading,
    Unauthenticated,
    Error {
        message: String,
    },
    Ready {
        user: User,
        /// None until the user saves marketplace credentials
        credentials: Option<CredentialsInfo>,
        active_tab: DashboardTab,
    },
}

impl DashboardState {
    /// Only a ready dashboard has tabs; other states pass through untouched
    pub fn select_tab(self, tab: DashboardTab) -> Self {
        match self {
            DashboardState::Ready {
                user, credentials, ..
            } => DashboardState::Ready {
                user,
                credentials,
                active_tab: tab,
            },
            other => other,
        }
    }
}

#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn current_user(&self, access_token: Option<&str>) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn active_credentials(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<MarketplaceCredentials>, AppError>;
}

#[async_trait]
impl SessionSource for IdentityGateway {
    async fn current_user(&self, access_token: Option<&str>) -> Result<Option<User>, AppError> {
        self.get_current_user(access_token).await
    }
}

#[async_trait]
impl CredentialSource for CredentialStore {
    async fn active_credentials(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<MarketplaceCredentials>, AppError> {
        self.get_active_credentials(access_token, user_id).await
    }
}

/// Runs the load sequence once: user first, then credentials. Fails fast, no retry.
pub async fn load_dashboard(
    sessions: &dyn SessionSource,
    credentials: &dyn CredentialSource,
    access_token: Option<&str>,
    tab: DashboardTab,
) -> DashboardState {
    let user = match sessions.current_user(access_token).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            log::debug!("Dashboard requested without a session");
            return DashboardState::Unauthenticated;
        }
        Err(e) => {
            log::warn!("⚠️ Dashboard user lookup failed: {}", e);
            return DashboardState::Error {
                message: USER_LOAD_ERROR.to_string(),
            };
        }
    };

    // A user implies a token; this only guards the trait contract
    let Some(token) = access_token else {
        return DashboardState::Unauthenticated;
    };

    match credentials.active_credentials(token, &user.id).await {
        Ok(creds) => DashboardState::Ready {
            user,
            credentials: creds.as_ref().map(CredentialsInfo::from),
            active_tab: tab,
        },
        Err(e) => {
            log::warn!("⚠️ Dashboard credentials lookup failed for {}: {}", user.id, e);
            DashboardState::Error {
                message: USER_LOAD_ERROR.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSessions {
        result: Result<Option<User>, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionSource for FakeSessions {
        async fn current_user(&self, _: Option<&str>) -> Result<Option<User>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(AppError::Transport)
        }
    }

    struct FakeCredentials {
        creds: Option<MarketplaceCredentials>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialSource for FakeCredentials {
        async fn active_credentials(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Option<MarketplaceCredentials>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.creds.clone())
        }
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            email: Some("seller@example.com".into()),
            full_name: None,
            company_name: None,
        }
    }

    fn sessions(result: Result<Option<User>, String>) -> FakeSessions {
        FakeSessions { result, calls: AtomicUsize::new(0) }
    }

    fn credentials(creds: Option<MarketplaceCredentials>) -> FakeCredentials {
        FakeCredentials { creds, calls: AtomicUsize::new(0) }
    }

    #[tokio::test]
    async fn test_no_session_is_unauthenticated_without_further_calls() {
        let sessions = sessions(Ok(None));
        let creds = credentials(None);

        let state = load_dashboard(&sessions, &creds, None, DashboardTab::Bids).await;

        assert_eq!(state, DashboardState::Unauthenticated);
        assert_eq!(sessions.calls.load(Ordering::SeqCst), 1);
        assert_eq!(creds.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_session_error_renders_error_state() {
        let sessions = sessions(Err("connection refused".into()));
        let creds = credentials(None);

        let state = load_dashboard(&sessions, &creds, Some("tok"), DashboardTab::Bids).await;

        assert_eq!(state, DashboardState::Error { message: USER_LOAD_ERROR.into() });
        assert_eq!(creds.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ready_state_carries_masked_credentials() {
        let sessions = sessions(Ok(Some(user())));
        let creds = credentials(Some(MarketplaceCredentials::new("c-1", "secret-9876")));

        let state = load_dashboard(&sessions, &creds, Some("tok"), DashboardTab::Budget).await;

        match state {
            DashboardState::Ready { user, credentials, active_tab } => {
                assert_eq!(user.id, "u1");
                assert_eq!(active_tab, DashboardTab::Budget);
                let info = credentials.unwrap();
                assert_eq!(info.client_id, "c-1");
                assert_eq!(info.api_key_masked, "****9876");
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[test]
    fn test_select_tab_only_changes_ready_state() {
        let ready = DashboardState::Ready {
            user: user(),
            credentials: None,
            active_tab: DashboardTab::Bids,
        };

        match ready.select_tab(DashboardTab::Budget) {
            DashboardState::Ready { active_tab, .. } => assert_eq!(active_tab, DashboardTab::Budget),
            other => panic!("unexpected state: {:?}", other),
        }
        assert_eq!(
            DashboardState::Unauthenticated.select_tab(DashboardTab::Budget),
            DashboardState::Unauthenticated
        );
    }

    #[test]
    fn test_state_serializes_as_tagged_union() {
        let json = serde_json::to_value(DashboardState::Error { message: "x".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "error", "message": "x" }));
    }
}

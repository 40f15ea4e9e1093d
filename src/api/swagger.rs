use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ozobid Service API",
        version = "1.0.0",
        description = "Ad campaign dashboard for Ozon sellers. \n\n**Authentication:** Supabase access tokens as JWT Bearer.\n\n**Features:**\n- Supabase sign-in / sign-up with seller profile\n- Marketplace credentials and budget settings\n- Campaign list, statistics and bid updates\n- Daily budget enforcement (notify / pause)\n- Health monitoring",
        contact(
            name = "Ozobid Team",
            email = "support@ozobid.app"
        )
    ),
    paths(
        // Auth
        crate::api::auth::sign_in,
        crate::api::auth::sign_up,
        crate::api::auth::refresh,
        crate::api::auth::sign_out,
        crate::api::auth::get_me,

        // Health
        crate::api::health::health_check,

        // Dashboard
        crate::api::dashboard::get_dashboard,

        // Credentials
        crate::api::credentials::save_credentials,
        crate::api::credentials::get_credentials,
        crate::api::credentials::deactivate_credentials,

        // Budget
        crate::api::budget::get_budget_settings,
        crate::api::budget::update_budget_settings,
        crate::api::budget::enforce_budget,

        // Campaigns
        crate::api::campaigns::list_marketplace_campaigns,
        crate::api::campaigns::campaign_statistics,
        crate::api::campaigns::campaign_spend,
        crate::api::campaigns::update_bids,
        crate::api::campaigns::update_campaign_budget,
        crate::api::campaigns::resume_campaign,
        crate::api::campaigns::campaign_state,
        crate::api::campaigns::list_mirrored_campaigns,
        crate::api::campaigns::update_mirrored_campaign,
    ),
    components(
        schemas(
            // Auth
            crate::services::identity_service::SignInRequest,
            crate::services::identity_service::SignUpRequest,
            crate::services::identity_service::RefreshRequest,
            crate::services::identity_service::SignUpOutcome,
            crate::models::AuthSession,
            crate::models::User,

            // Health
            crate::api::health::HealthResponse,

            // Dashboard
            crate::services::dashboard_service::DashboardState,
            crate::services::dashboard_service::DashboardTab,
            crate::models::CredentialsInfo,

            // Credentials & budget
            crate::api::credentials::SaveCredentialsRequest,
            crate::api::budget::UpdateBudgetRequest,
            crate::models::BudgetSettings,
            crate::models::EnforcementReport,
            crate::models::CampaignOutcome,
            crate::models::EnforcementAction,
            crate::models::CampaignState,

            // Campaigns
            crate::api::campaigns::StatisticsQuery,
            crate::api::campaigns::BudgetChangeRequest,
            crate::models::BidUpdate,
            crate::models::CampaignUpdate,
        )
    ),
    tags(
        (name = "Auth", description = "Supabase-backed sign-in, sign-up and session endpoints."),
        (name = "Health", description = "Health check for monitoring service status."),
        (name = "Dashboard", description = "Dashboard view state: loading, unauthenticated, error or ready."),
        (name = "Credentials", description = "Marketplace API credentials of the signed-in seller."),
        (name = "Budget", description = "Daily budget settings and enforcement."),
        (name = "Campaigns", description = "Marketplace campaigns, statistics, bids and the campaign mirror table."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Supabase access token"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        let documented = |path: &str| paths.get(path).unwrap_or_else(|| panic!("{} missing", path));

        assert!(documented("/api/v1/auth/refresh").post.is_some());
        assert!(documented("/api/v1/auth/sign-out").post.is_some());
        let credentials = documented("/api/v1/credentials");
        assert!(credentials.post.is_some() && credentials.get.is_some() && credentials.delete.is_some());
        assert!(documented("/api/v1/campaigns/{id}/spend").get.is_some());
        assert!(documented("/api/v1/campaigns/{id}/budget").put.is_some());
        assert!(documented("/api/v1/campaigns/{id}/state").get.is_some());
        assert!(documented("/api/v1/campaigns/mirror").get.is_some());
        assert!(documented("/api/v1/campaigns/mirror/{id}").patch.is_some());
        assert_eq!(paths.len(), 19);
    }
}

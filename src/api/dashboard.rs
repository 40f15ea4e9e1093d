use crate::{
    middleware::auth::bearer_token,
    services::{
        credential_store::CredentialStore,
        dashboard_service::{self, DashboardState, DashboardTab},
        identity_service::IdentityGateway,
    },
};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// `bids` (default) or `budget`
    pub tab: Option<DashboardTab>,
}

/// Loads the dashboard view state. Unauthenticated and error states are
/// regular 200 responses; the front-end renders them.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard view state", body = DashboardState)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_dashboard(
    identity: web::Data<IdentityGateway>,
    store: web::Data<CredentialStore>,
    query: web::Query<DashboardQuery>,
    req: HttpRequest,
) -> HttpResponse {
    let token = bearer_token(&req);
    let tab = query.tab.unwrap_or_default();

    log::info!("🖥️  GET /dashboard - tab: {:?}", tab);

    // Tab changes never reload data; the load always starts on the default tab
    let state = dashboard_service::load_dashboard(
        identity.get_ref(),
        store.get_ref(),
        token.as_deref(),
        DashboardTab::default(),
    )
    .await
    .select_tab(tab);

    HttpResponse::Ok().json(state)
}

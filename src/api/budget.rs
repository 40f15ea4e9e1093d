use crate::{
    middleware::AuthContext,
    models::{BudgetSettings, EnforcementReport},
    services::{budget_enforcement::BudgetEnforcer, credential_store::CredentialStore},
    utils::AppError,
};
use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateBudgetRequest {
    pub daily_limit: f64,
    pub notification_threshold: f64,
}

/// GET /api/v1/budget/settings
#[utoipa::path(
    get,
    path = "/api/v1/budget/settings",
    tag = "Budget",
    responses(
        (status = 200, description = "Zero or one settings row", body = Vec<BudgetSettings>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_budget_settings(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
) -> HttpResponse {
    match store.get_budget_settings(&user.access_token, &user.user_id).await {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            log::error!("❌ Error loading budget settings: {}", e);
            e.error_response()
        }
    }
}

/// PUT /api/v1/budget/settings - upsert, last write wins
#[utoipa::path(
    put,
    path = "/api/v1/budget/settings",
    tag = "Budget",
    request_body = UpdateBudgetRequest,
    responses(
        (status = 200, description = "Stored settings", body = Vec<BudgetSettings>),
        (status = 400, description = "Threshold above limit or negative values")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_budget_settings(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    request: web::Json<UpdateBudgetRequest>,
) -> HttpResponse {
    log::info!(
        "💼 PUT /budget/settings - user {} limit={} threshold={}",
        user.user_id,
        request.daily_limit,
        request.notification_threshold
    );

    match store
        .update_budget_settings(
            &user.access_token,
            &user.user_id,
            request.daily_limit,
            request.notification_threshold,
        )
        .await
    {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            log::warn!("❌ Budget settings update rejected: {}", e);
            e.error_response()
        }
    }
}

/// POST /api/v1/budget/enforce - one enforcement cycle for the caller
#[utoipa::path(
    post,
    path = "/api/v1/budget/enforce",
    tag = "Budget",
    responses(
        (status = 200, description = "Enforcement report", body = EnforcementReport),
        (status = 404, description = "No budget settings or no active credentials"),
        (status = 502, description = "Marketplace unreachable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn enforce_budget(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    enforcer: web::Data<BudgetEnforcer>,
) -> HttpResponse {
    log::info!("🛡️  POST /budget/enforce - user {}", user.user_id);

    match run_enforcement(&user, &store, &enforcer).await {
        Ok(report) => {
            log::info!(
                "✅ Enforcement for {}: {} (spend {:.2} / limit {:.2})",
                user.user_id,
                report.action,
                report.total_spend,
                report.daily_limit
            );
            HttpResponse::Ok().json(report)
        }
        Err(e) => {
            log::error!("❌ Enforcement failed for {}: {}", user.user_id, e);
            e.error_response()
        }
    }
}

async fn run_enforcement(
    user: &AuthContext,
    store: &CredentialStore,
    enforcer: &BudgetEnforcer,
) -> Result<EnforcementReport, AppError> {
    let settings = store
        .get_budget_settings(&user.access_token, &user.user_id)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("No budget settings configured".to_string()))?;
    let creds = store
        .require_active_credentials(&user.access_token, &user.user_id)
        .await?;

    enforcer
        .enforce_user(&creds, &settings, chrono::Utc::now().date_naive())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{self, bearer, JWT_SECRET};
    use crate::middleware::AuthMiddleware;
    use crate::services::enforcement_ledger::InMemoryLedger;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[actix_rt::test]
    async fn test_enforce_without_settings_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/budget_settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/ozon_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::store(&server.uri())))
                .app_data(web::Data::new(test_support::enforcer(
                    &server.uri(),
                    Arc::new(InMemoryLedger::new()),
                )))
                .service(
                    web::scope("/api/v1/budget")
                        .wrap(AuthMiddleware::new(JWT_SECRET))
                        .route("/enforce", web::post().to(enforce_budget)),
                ),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/budget/enforce")
            .insert_header(bearer("u1"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], json!("Not found: No budget settings configured"));
    }
}

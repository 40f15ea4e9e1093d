use crate::{
    middleware::AuthContext,
    models::{BidUpdate, CampaignState, CampaignUpdate, DateRange, MarketplaceCredentials},
    services::{
        budget_enforcement::BudgetEnforcer, credential_store::CredentialStore,
        marketplace_client::MarketplaceClient,
    },
    utils::AppError,
};
use actix_web::{web, HttpResponse, ResponseError};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StatisticsQuery {
    pub campaign_ids: Vec<String>,
    /// Both bounds or neither; without them the trailing week is used
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BudgetChangeRequest {
    pub daily_budget: f64,
}

fn reply(result: Result<Value, AppError>, context: &str) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(data),
        Err(e) => {
            log::error!("❌ {}: {}", context, e);
            e.error_response()
        }
    }
}

async fn credentials_for(
    store: &CredentialStore,
    user: &AuthContext,
) -> Result<MarketplaceCredentials, AppError> {
    store
        .require_active_credentials(&user.access_token, &user.user_id)
        .await
}

/// GET /api/v1/campaigns/marketplace - raw campaign list from the platform
#[utoipa::path(
    get,
    path = "/api/v1/campaigns/marketplace",
    tag = "Campaigns",
    responses(
        (status = 200, description = "Campaign list as returned by the marketplace"),
        (status = 404, description = "No active credentials"),
        (status = 502, description = "Marketplace unreachable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_marketplace_campaigns(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    marketplace: web::Data<MarketplaceClient>,
) -> HttpResponse {
    log::info!("📋 GET /campaigns/marketplace - user {}", user.user_id);

    let result = match credentials_for(&store, &user).await {
        Ok(creds) => marketplace.get_campaigns_list(&creds).await,
        Err(e) => Err(e),
    };
    reply(result, "Error listing campaigns")
}

#[utoipa::path(
    post,
    path = "/api/v1/campaigns/statistics",
    tag = "Campaigns",
    request_body = StatisticsQuery,
    responses(
        (status = 200, description = "Statistics as returned by the marketplace"),
        (status = 400, description = "Inverted or half-open date range")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn campaign_statistics(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    marketplace: web::Data<MarketplaceClient>,
    request: web::Json<StatisticsQuery>,
) -> HttpResponse {
    log::info!(
        "📊 POST /campaigns/statistics - user {} ({} campaigns)",
        user.user_id,
        request.campaign_ids.len()
    );

    let result: Result<Value, AppError> = async {
        // Reject a bad window before touching credentials or the platform
        let range = match (request.date_from, request.date_to) {
            (None, None) => None,
            (Some(from), Some(to)) => Some(DateRange::new(from, to)?),
            _ => {
                return Err(AppError::Validation(
                    "date_from and date_to must be given together".to_string(),
                ))
            }
        };

        let creds = credentials_for(&store, &user).await?;
        match range {
            Some(range) => {
                marketplace
                    .get_campaigns_statistics_for_range(&creds, &request.campaign_ids, range)
                    .await
            }
            None => {
                marketplace
                    .get_campaigns_statistics(&creds, &request.campaign_ids)
                    .await
            }
        }
    }
    .await;

    reply(result, "Error loading statistics")
}

/// GET /api/v1/campaigns/{id}/spend - today's spend, raw statistics payload
#[utoipa::path(
    get,
    path = "/api/v1/campaigns/{id}/spend",
    tag = "Campaigns",
    params(
        ("id" = String, Path, description = "Marketplace campaign id")
    ),
    responses(
        (status = 200, description = "Today's statistics as returned by the marketplace"),
        (status = 404, description = "No active credentials")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn campaign_spend(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    marketplace: web::Data<MarketplaceClient>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    log::info!("💸 GET /campaigns/{}/spend - user {}", campaign_id, user.user_id);

    let result = match credentials_for(&store, &user).await {
        Ok(creds) => marketplace.get_campaign_spend(&creds, &campaign_id).await,
        Err(e) => Err(e),
    };
    reply(result, "Error loading campaign spend")
}

#[utoipa::path(
    post,
    path = "/api/v1/campaigns/bids",
    tag = "Campaigns",
    request_body = Vec<BidUpdate>,
    responses(
        (status = 200, description = "Batch accepted by the marketplace"),
        (status = 400, description = "Empty batch or negative bid")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_bids(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    marketplace: web::Data<MarketplaceClient>,
    request: web::Json<Vec<BidUpdate>>,
) -> HttpResponse {
    log::info!("🎯 POST /campaigns/bids - user {} ({} updates)", user.user_id, request.len());

    let result = match credentials_for(&store, &user).await {
        Ok(creds) => marketplace.update_bids(&creds, &request).await,
        Err(e) => Err(e),
    };
    reply(result, "Error updating bids")
}

/// PUT /api/v1/campaigns/{id}/budget
#[utoipa::path(
    put,
    path = "/api/v1/campaigns/{id}/budget",
    tag = "Campaigns",
    params(
        ("id" = String, Path, description = "Marketplace campaign id")
    ),
    request_body = BudgetChangeRequest,
    responses(
        (status = 200, description = "Budget accepted by the marketplace"),
        (status = 400, description = "Negative budget"),
        (status = 404, description = "No active credentials")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_campaign_budget(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    marketplace: web::Data<MarketplaceClient>,
    path: web::Path<String>,
    request: web::Json<BudgetChangeRequest>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    log::info!(
        "💰 PUT /campaigns/{}/budget - user {} budget={}",
        campaign_id,
        user.user_id,
        request.daily_budget
    );

    let result = match credentials_for(&store, &user).await {
        Ok(creds) => {
            marketplace
                .update_campaign_budget(&creds, &campaign_id, request.daily_budget)
                .await
        }
        Err(e) => Err(e),
    };
    reply(result, "Error updating campaign budget")
}

/// POST /api/v1/campaigns/{id}/resume - lifts an automatic pause
#[utoipa::path(
    post,
    path = "/api/v1/campaigns/{id}/resume",
    tag = "Campaigns",
    params(
        ("id" = String, Path, description = "Marketplace campaign id")
    ),
    request_body = BudgetChangeRequest,
    responses(
        (status = 200, description = "Campaign active again", body = CampaignState),
        (status = 400, description = "Budget must be positive")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn resume_campaign(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    enforcer: web::Data<BudgetEnforcer>,
    path: web::Path<String>,
    request: web::Json<BudgetChangeRequest>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    log::info!("▶️  POST /campaigns/{}/resume - user {}", campaign_id, user.user_id);

    let result: Result<CampaignState, AppError> = async {
        let creds = credentials_for(&store, &user).await?;
        enforcer
            .resume_campaign(&creds, &user.user_id, &campaign_id, request.daily_budget)
            .await
    }
    .await;

    match result {
        Ok(state) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "campaign_id": campaign_id,
            "state": state
        })),
        Err(e) => {
            log::error!("❌ Error resuming campaign {}: {}", campaign_id, e);
            e.error_response()
        }
    }
}

/// GET /api/v1/campaigns/{id}/state - ACTIVE or PAUSED as tracked by enforcement
#[utoipa::path(
    get,
    path = "/api/v1/campaigns/{id}/state",
    tag = "Campaigns",
    params(
        ("id" = String, Path, description = "Marketplace campaign id")
    ),
    responses(
        (status = 200, description = "Enforcement state of the caller's campaign")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn campaign_state(
    user: web::ReqData<AuthContext>,
    enforcer: web::Data<BudgetEnforcer>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    log::debug!("GET /campaigns/{}/state - user {}", campaign_id, user.user_id);

    match enforcer.campaign_state(&user.user_id, &campaign_id).await {
        Ok(state) => HttpResponse::Ok().json(serde_json::json!({
            "campaign_id": campaign_id,
            "state": state
        })),
        Err(e) => {
            log::error!("❌ Error loading state of campaign {}: {}", campaign_id, e);
            e.error_response()
        }
    }
}

/// GET /api/v1/campaigns/mirror - the user's rows in the campaigns table
#[utoipa::path(
    get,
    path = "/api/v1/campaigns/mirror",
    tag = "Campaigns",
    responses(
        (status = 200, description = "Rows of the campaigns table owned by the caller")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_mirrored_campaigns(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
) -> HttpResponse {
    match store.get_campaigns(&user.access_token, &user.user_id).await {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            log::error!("❌ Error loading mirrored campaigns: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/campaigns/mirror/{id}",
    tag = "Campaigns",
    params(
        ("id" = String, Path, description = "Campaign row id")
    ),
    request_body = CampaignUpdate,
    responses(
        (status = 200, description = "Updated rows"),
        (status = 400, description = "Empty or invalid update")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_mirrored_campaign(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    path: web::Path<String>,
    request: web::Json<CampaignUpdate>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    log::info!("✏️  PATCH /campaigns/mirror/{} - user {}", campaign_id, user.user_id);

    match store
        .update_campaign(&user.access_token, &campaign_id, &request)
        .await
    {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            log::error!("❌ Error updating mirrored campaign {}: {}", campaign_id, e);
            e.error_response()
        }
    }
}

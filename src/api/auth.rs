use crate::{
    middleware::auth::bearer_token,
    models::{AuthSession, User},
    services::identity_service::{
        IdentityGateway, RefreshRequest, SignInRequest, SignUpOutcome, SignUpRequest,
    },
};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-in",
    tag = "Auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthSession),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn sign_in(
    identity: web::Data<IdentityGateway>,
    request: web::Json<SignInRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/sign-in - email: {}", request.email);

    match identity.sign_in(&request.email, &request.password).await {
        Ok(session) => {
            log::info!("✅ Sign-in successful: {}", request.email);
            HttpResponse::Ok().json(session)
        }
        Err(e) => {
            log::warn!("❌ Sign-in failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-up",
    tag = "Auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account and profile created", body = SignUpOutcome),
        (status = 401, description = "Sign-up rejected by the identity backend"),
        (status = 502, description = "Identity created but the profile could not be saved")
    )
)]
pub async fn sign_up(
    identity: web::Data<IdentityGateway>,
    request: web::Json<SignUpRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/sign-up - email: {}", request.email);

    match identity
        .sign_up(&request.email, &request.password, &request.full_name, &request.company_name)
        .await
    {
        Ok(outcome) => {
            log::info!("✅ Sign-up successful: {}", request.email);
            HttpResponse::Created().json(outcome)
        }
        Err(e) => {
            log::warn!("❌ Sign-up failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New session", body = AuthSession),
        (status = 401, description = "Refresh token rejected")
    )
)]
pub async fn refresh(
    identity: web::Data<IdentityGateway>,
    request: web::Json<RefreshRequest>,
) -> HttpResponse {
    log::info!("🔄 POST /auth/refresh");

    match identity.refresh_session(&request.refresh_token).await {
        Ok(session) => HttpResponse::Ok().json(session),
        Err(e) => {
            log::warn!("❌ Session refresh failed: {}", e);
            e.error_response()
        }
    }
}

/// Always succeeds for callers without a session
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-out",
    tag = "Auth",
    responses(
        (status = 200, description = "Session revoked, or there was none")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn sign_out(identity: web::Data<IdentityGateway>, req: HttpRequest) -> HttpResponse {
    log::info!("👋 POST /auth/sign-out");

    let Some(token) = bearer_token(&req) else {
        return HttpResponse::Ok().json(serde_json::json!({ "success": true }));
    };

    match identity.sign_out(&token).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            log::warn!("❌ Sign-out failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user, or null without a session", body = User),
        (status = 502, description = "Identity backend unreachable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(identity: web::Data<IdentityGateway>, req: HttpRequest) -> HttpResponse {
    let token = bearer_token(&req);

    match identity.get_current_user(token.as_deref()).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({ "user": user })),
        Err(e) => {
            log::error!("❌ Current user lookup failed: {}", e);
            e.error_response()
        }
    }
}

use crate::{
    middleware::AuthContext,
    models::{CredentialsInfo, MarketplaceCredentials},
    services::credential_store::CredentialStore,
};
use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SaveCredentialsRequest {
    pub client_id: String,
    pub api_key: String,
}

/// POST /api/v1/credentials - saves a new active credential pair
#[utoipa::path(
    post,
    path = "/api/v1/credentials",
    tag = "Credentials",
    request_body = SaveCredentialsRequest,
    responses(
        (status = 201, description = "Credentials saved", body = CredentialsInfo),
        (status = 400, description = "Missing client id or api key")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn save_credentials(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
    request: web::Json<SaveCredentialsRequest>,
) -> HttpResponse {
    log::info!("🔑 POST /credentials - user {}", user.user_id);

    match store
        .save_credentials(&user.access_token, &user.user_id, &request.client_id, &request.api_key)
        .await
    {
        Ok(_) => {
            let creds = MarketplaceCredentials::new(request.client_id.clone(), request.api_key.clone());
            HttpResponse::Created().json(CredentialsInfo::from(&creds))
        }
        Err(e) => {
            log::error!("❌ Error saving credentials: {}", e);
            e.error_response()
        }
    }
}

/// GET /api/v1/credentials - active credentials, key masked
#[utoipa::path(
    get,
    path = "/api/v1/credentials",
    tag = "Credentials",
    responses(
        (status = 200, description = "Active credentials with the key masked, or null")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_credentials(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
) -> HttpResponse {
    match store.get_active_credentials(&user.access_token, &user.user_id).await {
        Ok(creds) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "credentials": creds.as_ref().map(CredentialsInfo::from)
        })),
        Err(e) => {
            log::error!("❌ Error loading credentials: {}", e);
            e.error_response()
        }
    }
}

/// DELETE /api/v1/credentials - deactivates every stored pair
#[utoipa::path(
    delete,
    path = "/api/v1/credentials",
    tag = "Credentials",
    responses(
        (status = 200, description = "Credentials deactivated")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_credentials(
    user: web::ReqData<AuthContext>,
    store: web::Data<CredentialStore>,
) -> HttpResponse {
    log::info!("🗑️  DELETE /credentials - user {}", user.user_id);

    match store.deactivate_credentials(&user.access_token, &user.user_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            log::error!("❌ Error deactivating credentials: {}", e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{self, bearer, JWT_SECRET};
    use crate::middleware::AuthMiddleware;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use serde_json::{json, Value};
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[actix_rt::test]
    async fn test_get_credentials_masks_the_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/ozon_credentials"))
            .and(query_param("user_id", "eq.u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "user_id": "u1",
                "client_id": "42",
                "api_key": "abcdef123456",
                "is_active": true
            }])))
            .mount(&server)
            .await;

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::store(&server.uri())))
                .service(
                    web::scope("/api/v1/credentials")
                        .wrap(AuthMiddleware::new(JWT_SECRET))
                        .route("", web::get().to(get_credentials)),
                ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/credentials")
            .insert_header(bearer("u1"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({
                "success": true,
                "credentials": { "client_id": "42", "api_key_masked": "****3456" }
            })
        );
        assert!(!body.to_string().contains("abcdef"));
    }

    #[actix_rt::test]
    async fn test_get_credentials_without_row_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/ozon_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::store(&server.uri())))
                .service(
                    web::scope("/api/v1/credentials")
                        .wrap(AuthMiddleware::new(JWT_SECRET))
                        .route("", web::get().to(get_credentials)),
                ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/credentials")
            .insert_header(bearer("u1"))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "success": true, "credentials": null }));
    }
}

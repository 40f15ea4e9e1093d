mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppConfig,
    middleware::AuthMiddleware,
    services::{
        budget_enforcement::{BudgetEnforcer, LogNotifier},
        credential_store::CredentialStore,
        enforcement_ledger::MongoLedger,
        identity_service::IdentityGateway,
        marketplace_client::MarketplaceClient,
        supabase::SupabaseClient,
    },
};

fn startup_error(e: utils::AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(startup_error)?;

    log::info!("🚀 Starting Ozobid Service...");
    log::info!("🛒 Marketplace API: {}", config.ozon_api_url);
    log::info!("🔐 Supabase: {}", config.supabase_url);

    // HTTP clients
    let supabase = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key, config.http_timeout)
        .map_err(startup_error)?;
    let marketplace = MarketplaceClient::new(&config.ozon_api_url, config.http_timeout)
        .map_err(startup_error)?;
    let identity = IdentityGateway::new(supabase.clone());
    let store = CredentialStore::new(supabase);

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.database_url)
        .await
        .map_err(startup_error)?;
    log::info!("✅ MongoDB connected successfully");

    let enforcer = BudgetEnforcer::new(
        marketplace.clone(),
        Arc::new(MongoLedger::new(db.clone())),
        Arc::new(LogNotifier),
    );

    // 🛡️ Background jobs
    log::info!("📅 Starting background jobs...");
    jobs::budget_monitor::start_budget_monitor(&config, store.clone(), enforcer.clone()).await;

    let db_data = web::Data::new(db);
    let identity_data = web::Data::new(identity);
    let store_data = web::Data::new(store);
    let marketplace_data = web::Data::new(marketplace);
    let enforcer_data = web::Data::new(enforcer);
    let jwt_secret = config.supabase_jwt_secret.clone();

    let (host, port) = (config.host.clone(), config.port.clone());
    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000") // Frontend Web
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(identity_data.clone())
            .app_data(store_data.clone())
            .app_data(marketplace_data.clone())
            .app_data(enforcer_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Auth: session is optional on sign-out / me
            .service(
                web::scope("/api/v1/auth")
                    .route("/sign-in", web::post().to(api::auth::sign_in))
                    .route("/sign-up", web::post().to(api::auth::sign_up))
                    .route("/refresh", web::post().to(api::auth::refresh))
                    .route("/sign-out", web::post().to(api::auth::sign_out))
                    .route("/me", web::get().to(api::auth::get_me))
            )
            .route("/api/v1/dashboard", web::get().to(api::dashboard::get_dashboard))

            // ==================== SELLER DATA (JWT) ====================
            .service(
                web::scope("/api/v1/credentials")
                    .wrap(AuthMiddleware::new(&jwt_secret))
                    .route("", web::post().to(api::credentials::save_credentials))
                    .route("", web::get().to(api::credentials::get_credentials))
                    .route("", web::delete().to(api::credentials::deactivate_credentials))
            )
            .service(
                web::scope("/api/v1/budget")
                    .wrap(AuthMiddleware::new(&jwt_secret))
                    .route("/settings", web::get().to(api::budget::get_budget_settings))
                    .route("/settings", web::put().to(api::budget::update_budget_settings))
                    .route("/enforce", web::post().to(api::budget::enforce_budget))
            )

            // ==================== MARKETPLACE (JWT) ====================
            .service(
                web::scope("/api/v1/campaigns")
                    .wrap(AuthMiddleware::new(&jwt_secret))
                    .route("/marketplace", web::get().to(api::campaigns::list_marketplace_campaigns))
                    .route("/statistics", web::post().to(api::campaigns::campaign_statistics))
                    .route("/bids", web::post().to(api::campaigns::update_bids))
                    .route("/mirror", web::get().to(api::campaigns::list_mirrored_campaigns))
                    .route("/mirror/{id}", web::patch().to(api::campaigns::update_mirrored_campaign))
                    .route("/{id}/spend", web::get().to(api::campaigns::campaign_spend))
                    .route("/{id}/budget", web::put().to(api::campaigns::update_campaign_budget))
                    .route("/{id}/resume", web::post().to(api::campaigns::resume_campaign))
                    .route("/{id}/state", web::get().to(api::campaigns::campaign_state))
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}

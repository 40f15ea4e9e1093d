// ==================== CREDENTIAL STORE ====================
// Tabelas do Supabase via PostgREST:
//   ozon_credentials : client_id / api_key por usuário (flag is_active)
//   budget_settings  : limite diário + threshold de notificação (1 linha por usuário)
//   campaigns        : espelho local das campanhas do usuário
// Todas as operações recebem o token da sessão (ou service-role no job).

use crate::{
    models::{
        validate_limits, BudgetSettings, CampaignUpdate, CredentialRecord, MarketplaceCredentials,
    },
    services::supabase::SupabaseClient,
    utils::AppError,
};
use reqwest::Method;
use serde_json::{json, Value};

const CREDENTIALS_TABLE: &str = "ozon_credentials";
const BUDGET_TABLE: &str = "budget_settings";
const CAMPAIGNS_TABLE: &str = "campaigns";

#[derive(Clone)]
pub struct CredentialStore {
    supabase: SupabaseClient,
}

impl CredentialStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    /// Inserts a new active row. Older rows are left untouched, so several
    /// active rows can coexist; readers pick the newest.
    pub async fn save_credentials(
        &self,
        token: &str,
        user_id: &str,
        client_id: &str,
        api_key: &str,
    ) -> Result<Vec<CredentialRecord>, AppError> {
        if client_id.trim().is_empty() || api_key.trim().is_empty() {
            return Err(AppError::Validation("client_id and api_key are required".to_string()));
        }
        log::info!("🔑 Saving marketplace credentials for user {}", user_id);

        let record = CredentialRecord {
            id: None,
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            api_key: api_key.to_string(),
            is_active: true,
            created_at: None,
        };
        let url = self.supabase.rest_url(CREDENTIALS_TABLE, &[]);
        let request = self
            .supabase
            .request(Method::POST, &url, Some(token))
            .header("Prefer", "return=representation")
            .json(&record);
        let response = self.supabase.send(request, "Credentials insert failed").await?;
        SupabaseClient::read_json(response, "Credentials insert").await
    }

    pub async fn get_active_credentials(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Option<MarketplaceCredentials>, AppError> {
        let user_filter = format!("eq.{}", user_id);
        let url = self.supabase.rest_url(
            CREDENTIALS_TABLE,
            &[
                ("user_id", user_filter.as_str()),
                ("is_active", "eq.true"),
                ("order", "created_at.desc"),
                ("limit", "1"),
            ],
        );
        let request = self.supabase.request(Method::GET, &url, Some(token));
        let response = self.supabase.send(request, "Credentials lookup failed").await?;
        let rows: Vec<CredentialRecord> = SupabaseClient::read_json(response, "Credentials lookup").await?;

        Ok(rows.first().map(CredentialRecord::credentials))
    }

    /// Same as `get_active_credentials` but missing credentials are an error
    pub async fn require_active_credentials(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<MarketplaceCredentials, AppError> {
        self.get_active_credentials(token, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No active marketplace credentials".to_string()))
    }

    pub async fn deactivate_credentials(&self, token: &str, user_id: &str) -> Result<(), AppError> {
        log::info!("🔒 Deactivating marketplace credentials for user {}", user_id);

        let user_filter = format!("eq.{}", user_id);
        let url = self.supabase.rest_url(CREDENTIALS_TABLE, &[("user_id", user_filter.as_str())]);
        let request = self
            .supabase
            .request(Method::PATCH, &url, Some(token))
            .header("Prefer", "return=minimal")
            .json(&json!({ "is_active": false }));
        let response = self.supabase.send(request, "Credentials deactivation failed").await?;
        SupabaseClient::check_status(response, "Credentials deactivation").await?;
        Ok(())
    }

    /// Zero or one row by convention
    pub async fn get_budget_settings(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Vec<BudgetSettings>, AppError> {
        let user_filter = format!("eq.{}", user_id);
        let url = self
            .supabase
            .rest_url(BUDGET_TABLE, &[("select", "*"), ("user_id", user_filter.as_str())]);
        let request = self.supabase.request(Method::GET, &url, Some(token));
        let response = self.supabase.send(request, "Budget settings lookup failed").await?;
        SupabaseClient::read_json(response, "Budget settings lookup").await
    }

    /// Upsert keyed by user_id, last write wins, always active
    pub async fn update_budget_settings(
        &self,
        token: &str,
        user_id: &str,
        daily_limit: f64,
        notification_threshold: f64,
    ) -> Result<Vec<BudgetSettings>, AppError> {
        validate_limits(daily_limit, notification_threshold)?;
        log::info!(
            "💼 Upserting budget settings for user {}: limit={} threshold={}",
            user_id,
            daily_limit,
            notification_threshold
        );

        let settings = BudgetSettings::new(user_id, daily_limit, notification_threshold);
        let url = self.supabase.rest_url(BUDGET_TABLE, &[("on_conflict", "user_id")]);
        let request = self
            .supabase
            .request(Method::POST, &url, Some(token))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&settings);
        let response = self.supabase.send(request, "Budget settings upsert failed").await?;
        SupabaseClient::read_json(response, "Budget settings upsert").await
    }

    /// Every active settings row; needs a service-role token to see past RLS
    pub async fn list_active_budget_settings(&self, token: &str) -> Result<Vec<BudgetSettings>, AppError> {
        let url = self
            .supabase
            .rest_url(BUDGET_TABLE, &[("select", "*"), ("is_active", "eq.true")]);
        let request = self.supabase.request(Method::GET, &url, Some(token));
        let response = self.supabase.send(request, "Budget settings scan failed").await?;
        SupabaseClient::read_json(response, "Budget settings scan").await
    }

    pub async fn get_campaigns(&self, token: &str, user_id: &str) -> Result<Vec<Value>, AppError> {
        let user_filter = format!("eq.{}", user_id);
        let url = self
            .supabase
            .rest_url(CAMPAIGNS_TABLE, &[("select", "*"), ("user_id", user_filter.as_str())]);
        let request = self.supabase.request(Method::GET, &url, Some(token));
        let response = self.supabase.send(request, "Campaign mirror lookup failed").await?;
        SupabaseClient::read_json(response, "Campaign mirror lookup").await
    }

    pub async fn update_campaign(
        &self,
        token: &str,
        campaign_id: &str,
        updates: &CampaignUpdate,
    ) -> Result<Vec<Value>, AppError> {
        updates.validate()?;

        let id_filter = format!("eq.{}", campaign_id);
        let url = self.supabase.rest_url(CAMPAIGNS_TABLE, &[("id", id_filter.as_str())]);
        let request = self
            .supabase
            .request(Method::PATCH, &url, Some(token))
            .header("Prefer", "return=representation")
            .json(updates);
        let response = self.supabase.send(request, "Campaign mirror update failed").await?;
        SupabaseClient::read_json(response, "Campaign mirror update").await
    }
}

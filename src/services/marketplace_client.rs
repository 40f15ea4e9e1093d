// ==================== MARKETPLACE (OZON PERFORMANCE) CLIENT ====================
// Cliente HTTP construído uma vez no startup e compartilhado via web::Data.
// Autenticação é stateless: Client-Id / Api-Key em cada request.
// Sem retry, sem backoff: cada falha volta como AppError para o chamador.

use crate::{
    models::{
        BidPayload, BidUpdate, Campaign, DateRange, MarketplaceCredentials, SpendSnapshot,
        StatisticsRequest, StatisticsRow,
    },
    utils::AppError,
};
use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const CAMPAIGNS_LIST_PATH: &str = "/api/client/performance/campaigns/list";
pub const CAMPAIGN_STATISTICS_PATH: &str = "/api/client/performance/statistics/campaign";
pub const BIDS_UPDATE_PATH: &str = "/api/client/performance/products/bids/update";
pub const CAMPAIGN_UPDATE_PATH: &str = "/api/client/performance/campaigns/update";

#[derive(Clone)]
pub struct MarketplaceClient {
    http: reqwest::Client,
    base_url: String,
}

impl MarketplaceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build marketplace HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Raw campaign list as returned by the platform
    pub async fn get_campaigns_list(&self, creds: &MarketplaceCredentials) -> Result<Value, AppError> {
        log::info!("📋 Fetching campaign list (client {})", creds.client_id);
        self.post(creds, CAMPAIGNS_LIST_PATH, &json!({})).await
    }

    /// Statistics over the fixed trailing window `[today-7, today]`
    pub async fn get_campaigns_statistics(
        &self,
        creds: &MarketplaceCredentials,
        campaign_ids: &[String],
    ) -> Result<Value, AppError> {
        let range = DateRange::trailing_week(today());
        self.get_campaigns_statistics_for_range(creds, campaign_ids, range).await
    }

    pub async fn get_campaigns_statistics_for_range(
        &self,
        creds: &MarketplaceCredentials,
        campaign_ids: &[String],
        range: DateRange,
    ) -> Result<Value, AppError> {
        log::info!(
            "📊 Fetching statistics for {} campaigns ({} .. {})",
            campaign_ids.len(),
            range.date_from,
            range.date_to
        );
        let body = StatisticsRequest::new(campaign_ids.to_vec(), range);
        self.post(creds, CAMPAIGN_STATISTICS_PATH, &body).await
    }

    /// Same-day spend: statistics narrowed to `[today, today]`
    pub async fn get_campaign_spend(
        &self,
        creds: &MarketplaceCredentials,
        campaign_id: &str,
    ) -> Result<Value, AppError> {
        self.get_campaign_spend_on(creds, campaign_id, today()).await
    }

    pub async fn get_campaign_spend_on(
        &self,
        creds: &MarketplaceCredentials,
        campaign_id: &str,
        day: NaiveDate,
    ) -> Result<Value, AppError> {
        log::debug!("💸 Fetching spend for campaign {} on {}", campaign_id, day);
        let body = StatisticsRequest::new(vec![campaign_id.to_string()], DateRange::single_day(day));
        self.post(creds, CAMPAIGN_STATISTICS_PATH, &body).await
    }

    /// Spend for `day`, parsed. A campaign missing from the response spent nothing.
    pub async fn fetch_spend_snapshot(
        &self,
        creds: &MarketplaceCredentials,
        campaign_id: &str,
        day: NaiveDate,
    ) -> Result<SpendSnapshot, AppError> {
        let raw = self.get_campaign_spend_on(creds, campaign_id, day).await?;
        let rows: Vec<_> = parse_statistics(&raw)?
            .into_iter()
            .filter(|row| row.id == campaign_id)
            .collect();

        // The window is the one the platform reports, not the one we asked for
        let date = rows
            .iter()
            .filter_map(|row| row.date)
            .find(|d| *d != day)
            .unwrap_or(day);

        Ok(SpendSnapshot {
            campaign_id: campaign_id.to_string(),
            date,
            spend: rows.iter().map(|row| row.spent).sum(),
        })
    }

    /// Whole batch goes out as a single request. Partial application on the
    /// platform side is not tracked; re-read state after an error.
    pub async fn update_bids(
        &self,
        creds: &MarketplaceCredentials,
        updates: &[BidUpdate],
    ) -> Result<Value, AppError> {
        if updates.is_empty() {
            return Err(AppError::Validation("Bid batch is empty".to_string()));
        }
        if let Some(bad) = updates.iter().find(|u| !u.new_bid.is_finite() || u.new_bid < 0.0) {
            return Err(AppError::Validation(format!(
                "Invalid bid {} for product {}",
                bad.new_bid, bad.product_id
            )));
        }

        log::info!("🎯 Submitting {} bid updates", updates.len());
        let bids: Vec<BidPayload> = updates.iter().map(BidPayload::from).collect();
        self.post(creds, BIDS_UPDATE_PATH, &json!({ "bids": bids })).await
    }

    pub async fn update_campaign_budget(
        &self,
        creds: &MarketplaceCredentials,
        campaign_id: &str,
        daily_budget: f64,
    ) -> Result<Value, AppError> {
        if !daily_budget.is_finite() || daily_budget < 0.0 {
            return Err(AppError::Validation(format!("Invalid daily budget: {}", daily_budget)));
        }

        log::info!("💰 Setting daily budget of campaign {} to {}", campaign_id, daily_budget);
        self.post(
            creds,
            CAMPAIGN_UPDATE_PATH,
            &json!({ "campaign_id": campaign_id, "daily_budget": daily_budget }),
        )
        .await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        creds: &MarketplaceCredentials,
        path: &str,
        body: &B,
    ) -> Result<Value, AppError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .header("Client-Id", &creds.client_id)
            .header("Api-Key", &creds.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::transport("Marketplace request failed", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::transport("Failed to read marketplace response", e))?;

        if !status.is_success() {
            log::warn!("⚠️ Marketplace {} returned {}", path, status);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AppError::Auth(format!("Marketplace rejected credentials ({})", status))
                }
                _ => AppError::Transport(format!("Marketplace API error {}: {}", status, text)),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Finds the row array in a list/statistics payload: `{list: [...]}`,
/// `{rows: [...]}`, `{campaigns: [...]}` or a bare array.
fn payload_rows(raw: &Value) -> Vec<Value> {
    if let Some(rows) = raw.as_array() {
        return rows.clone();
    }
    ["list", "rows", "campaigns", "result"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(|v| v.as_array()))
        .cloned()
        .unwrap_or_default()
}

pub fn parse_campaigns(raw: &Value) -> Result<Vec<Campaign>, AppError> {
    payload_rows(raw)
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| AppError::Transport(format!("Unexpected campaign payload: {}", e)))
        })
        .collect()
}

pub fn parse_statistics(raw: &Value) -> Result<Vec<StatisticsRow>, AppError> {
    payload_rows(raw)
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| AppError::Transport(format!("Unexpected statistics payload: {}", e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn creds() -> MarketplaceCredentials {
        MarketplaceCredentials::new("client-1", "key-1")
    }

    fn client(server: &MockServer) -> MarketplaceClient {
        MarketplaceClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_campaigns_list_sends_auth_headers_and_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CAMPAIGNS_LIST_PATH))
            .and(header("Client-Id", "client-1"))
            .and(header("Api-Key", "key-1"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [{ "id": "C1", "title": "Main", "state": "RUNNING", "dailyBudget": 1000 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let raw = client(&server).get_campaigns_list(&creds()).await.unwrap();
        let campaigns = parse_campaigns(&raw).unwrap();

        assert_eq!(campaigns.len(), 1);
        assert_eq!(campaigns[0].id, "C1");
        assert_eq!(campaigns[0].daily_budget, 1000.0);
    }

    #[tokio::test]
    async fn test_update_bids_sends_single_request_in_platform_naming() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(BIDS_UPDATE_PATH))
            .and(body_json(json!({
                "bids": [{ "campaign_id": "C1", "product_id": "P1", "bid": 150.0 }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        let updates = vec![BidUpdate {
            campaign_id: "C1".into(),
            product_id: "P1".into(),
            new_bid: 150.0,
        }];
        let result = client(&server).update_bids(&creds(), &updates).await;

        assert!(result.is_ok());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_bids_rejects_empty_batch_without_network() {
        let server = MockServer::start().await;

        let result = client(&server).update_bids(&creds(), &[]).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_campaign_spend_is_scoped_to_single_day() {
        let server = MockServer::start().await;
        let day = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();

        Mock::given(method("POST"))
            .and(path(CAMPAIGN_STATISTICS_PATH))
            .and(body_json(json!({
                "campaign_ids": ["C1"],
                "dateFrom": "2024-05-20",
                "dateTo": "2024-05-20"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [{ "id": "C1", "moneySpent": "420,50" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = client(&server)
            .fetch_spend_snapshot(&creds(), "C1", day)
            .await
            .unwrap();

        assert_eq!(snapshot.date, day);
        assert_eq!(snapshot.spend, 420.5);
    }

    #[tokio::test]
    async fn test_snapshot_carries_the_window_the_platform_reports() {
        let server = MockServer::start().await;
        let day = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();

        Mock::given(method("POST"))
            .and(path(CAMPAIGN_STATISTICS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [{ "id": "C1", "date": "2024-05-19", "moneySpent": "900" }]
            })))
            .mount(&server)
            .await;

        let snapshot = client(&server)
            .fetch_spend_snapshot(&creds(), "C1", day)
            .await
            .unwrap();

        assert_eq!(snapshot.date, NaiveDate::from_ymd_opt(2024, 5, 19).unwrap());
        assert_eq!(snapshot.spend, 900.0);
    }

    #[tokio::test]
    async fn test_statistics_default_window_is_trailing_week() {
        let server = MockServer::start().await;
        let expected = DateRange::trailing_week(Utc::now().date_naive());

        Mock::given(method("POST"))
            .and(path(CAMPAIGN_STATISTICS_PATH))
            .and(body_json(json!({
                "campaign_ids": ["C1", "C2"],
                "dateFrom": expected.date_from.format("%Y-%m-%d").to_string(),
                "dateTo": expected.date_to.format("%Y-%m-%d").to_string()
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let ids = vec!["C1".to_string(), "C2".to_string()];
        assert!(client(&server).get_campaigns_statistics(&creds(), &ids).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_campaign_budget_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CAMPAIGN_UPDATE_PATH))
            .and(body_json(json!({ "campaign_id": "C9", "daily_budget": 0.0 })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).update_campaign_budget(&creds(), "C9", 0.0).await;
        assert_eq!(result.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_error_statuses_are_mapped() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CAMPAIGNS_LIST_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(CAMPAIGN_UPDATE_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client(&server);
        let list = client.get_campaigns_list(&creds()).await;
        let update = client.update_campaign_budget(&creds(), "C1", 10.0).await;

        assert!(matches!(list, Err(AppError::Auth(_))));
        assert!(matches!(update, Err(AppError::Transport(msg)) if msg.contains("boom")));
    }
}

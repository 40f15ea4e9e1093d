use crate::utils::AppError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Campaign as reported by the marketplace list endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Campaign {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default, alias = "state")]
    pub status: String,
    #[serde(default, alias = "dailyBudget", deserialize_with = "deserialize_amount")]
    pub daily_budget: f64,
    #[serde(default, alias = "currentSpend", skip_serializing_if = "Option::is_none")]
    pub current_spend: Option<f64>,
}

/// Patch for the `campaigns` mirror table. Only named fields can change.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, utoipa::ToSchema)]
pub struct CampaignUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CampaignUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.status.is_none() && self.daily_budget.is_none() && self.name.is_none() {
            return Err(AppError::Validation("Campaign update has no fields".to_string()));
        }
        if let Some(budget) = self.daily_budget {
            if !budget.is_finite() || budget < 0.0 {
                return Err(AppError::Validation(format!("Invalid daily budget: {}", budget)));
            }
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::Validation("Campaign name must not be empty".to_string()));
        }
        if matches!(&self.status, Some(status) if status.trim().is_empty()) {
            return Err(AppError::Validation("Campaign status must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Bid change intent; submitted in batches, never persisted
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct BidUpdate {
    pub campaign_id: String,
    pub product_id: String,
    pub new_bid: f64,
}

/// Marketplace field naming for a single bid
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BidPayload {
    pub campaign_id: String,
    pub product_id: String,
    pub bid: f64,
}

impl From<&BidUpdate> for BidPayload {
    fn from(update: &BidUpdate) -> Self {
        Self {
            campaign_id: update.campaign_id.clone(),
            product_id: update.product_id.clone(),
            bid: update.new_bid,
        }
    }
}

/// Inclusive statistics window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl DateRange {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Result<Self, AppError> {
        if date_from > date_to {
            return Err(AppError::Validation(format!(
                "dateFrom {} is after dateTo {}",
                date_from, date_to
            )));
        }
        Ok(Self { date_from, date_to })
    }

    /// `[today-7, today]`
    pub fn trailing_week(today: NaiveDate) -> Self {
        Self {
            date_from: today - Duration::days(7),
            date_to: today,
        }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            date_from: day,
            date_to: day,
        }
    }
}

/// Request body of the statistics endpoint
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StatisticsRequest {
    pub campaign_ids: Vec<String>,
    #[serde(rename = "dateFrom")]
    pub date_from: String,
    #[serde(rename = "dateTo")]
    pub date_to: String,
}

impl StatisticsRequest {
    pub fn new(campaign_ids: Vec<String>, range: DateRange) -> Self {
        Self {
            campaign_ids,
            date_from: range.date_from.format("%Y-%m-%d").to_string(),
            date_to: range.date_to.format("%Y-%m-%d").to_string(),
        }
    }
}

/// One row of the statistics response
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StatisticsRow {
    #[serde(alias = "campaign_id", alias = "campaignId", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(
        default,
        alias = "moneySpent",
        alias = "money_spent",
        alias = "spend",
        deserialize_with = "deserialize_amount"
    )]
    pub spent: f64,
    /// Day the platform computed the row for, when it says so
    #[serde(default, alias = "day", alias = "dateTo", deserialize_with = "deserialize_row_date")]
    pub date: Option<NaiveDate>,
}

/// Same-day spend for one campaign, tagged with the window date it was read for
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SpendSnapshot {
    pub campaign_id: String,
    pub date: NaiveDate,
    pub spend: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(serde_json::Number),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match IdValue::deserialize(deserializer)? {
        IdValue::Text(s) => Ok(s),
        IdValue::Number(n) => Ok(n.to_string()),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountValue {
    Number(f64),
    Text(String),
    Null,
}

/// Marketplace amounts arrive as numbers or as strings ("1 234,50")
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match AmountValue::deserialize(deserializer)? {
        AmountValue::Number(n) => Ok(n),
        AmountValue::Null => Ok(0.0),
        AmountValue::Text(s) => parse_amount(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {}", s))),
    }
}

/// Accepts `YYYY-MM-DD` and full timestamps; anything else is treated as undated
fn deserialize_row_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let day = s.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }))
}

pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse().ok()
}

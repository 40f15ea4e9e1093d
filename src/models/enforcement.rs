use serde::{Deserialize, Serialize};

/// Outcome of comparing spend against the user's budget settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementAction {
    Continue,
    Notify,
    Pause,
}

impl EnforcementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementAction::Continue => "CONTINUE",
            EnforcementAction::Notify => "NOTIFY",
            EnforcementAction::Pause => "PAUSE",
        }
    }
}

impl std::fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-campaign enforcement state. Paused campaigns stay paused until a manual resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignState {
    #[default]
    Active,
    Paused,
}

impl CampaignState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignState::Active => "ACTIVE",
            CampaignState::Paused => "PAUSED",
        }
    }
}

/// Prefix of the `campaign_id` slot for side effects that belong to a user, not a campaign
pub const USER_SCOPE_PREFIX: &str = "user:";

/// Dedup key: one side effect per campaign, day and action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnforcementKey {
    pub campaign_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub action: EnforcementAction,
}

impl EnforcementKey {
    /// Threshold notices go out once per user and day, whatever the campaign count
    pub fn user_notice(user_id: &str, date: &str) -> Self {
        Self {
            campaign_id: format!("{}{}", USER_SCOPE_PREFIX, user_id),
            date: date.to_string(),
            action: EnforcementAction::Notify,
        }
    }
}

/// Document of the `enforcement_events` collection
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnforcementEvent {
    pub event_id: String,
    pub user_id: String,
    pub campaign_id: String,
    pub date: String,
    pub action: EnforcementAction,
    pub spend: f64,
    pub daily_limit: f64,
    pub notification_threshold: f64,
    pub created_at: i64,
}

impl EnforcementEvent {
    pub fn key(&self) -> EnforcementKey {
        EnforcementKey {
            campaign_id: self.campaign_id.clone(),
            date: self.date.clone(),
            action: self.action,
        }
    }
}

/// Document of the `campaign_states` collection
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CampaignStateRecord {
    pub campaign_id: String,
    pub user_id: String,
    pub state: CampaignState,
    pub updated_at: i64,
}

/// What happened to one campaign during an enforcement run
#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct CampaignOutcome {
    pub campaign_id: String,
    pub action: EnforcementAction,
    /// true when this run paused the campaign
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct EnforcementReport {
    pub user_id: String,
    pub date: String,
    pub total_spend: f64,
    pub daily_limit: f64,
    pub notification_threshold: f64,
    pub action: EnforcementAction,
    /// true when this run sent the threshold notice
    pub notified: bool,
    pub campaigns: Vec<CampaignOutcome>,
}

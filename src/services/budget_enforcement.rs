// ==================== BUDGET ENFORCEMENT ====================
// Compara o gasto do dia com o limite diário / threshold do usuário e decide:
//   CONTINUE : abaixo do threshold
//   NOTIFY   : threshold <= gasto < limite (um alerta por usuário/dia, sem pausar)
//   PAUSE    : gasto >= limite (zera o daily_budget da campanha)
//
// Estado por campanha: ACTIVE -> PAUSED (automático), PAUSED -> ACTIVE (só manual).
// Cada efeito colateral acontece no máximo uma vez por (campanha, dia, ação).

use crate::{
    models::{
        BudgetSettings, Campaign, CampaignOutcome, CampaignState, EnforcementAction,
        EnforcementEvent, EnforcementKey, EnforcementReport, MarketplaceCredentials,
    },
    services::{
        enforcement_ledger::EnforcementLedger,
        marketplace_client::{parse_campaigns, MarketplaceClient},
    },
    utils::AppError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// Budget written to the platform when a campaign is paused
pub const PAUSED_DAILY_BUDGET: f64 = 0.0;

/// Pure and idempotent. Ties go to the stricter action.
pub fn decide(spend: f64, limit: f64, threshold: f64) -> EnforcementAction {
    if spend >= limit {
        EnforcementAction::Pause
    } else if spend >= threshold {
        EnforcementAction::Notify
    } else {
        EnforcementAction::Continue
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, settings: &BudgetSettings, total_spend: f64) -> Result<(), AppError>;
}

/// Default notifier: a warning in the service log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, settings: &BudgetSettings, total_spend: f64) -> Result<(), AppError> {
        log::warn!(
            "🔔 User {} reached notification threshold: spend {:.2} of {:.2} (threshold {:.2})",
            settings.user_id,
            total_spend,
            settings.daily_limit,
            settings.notification_threshold
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct BudgetEnforcer {
    marketplace: MarketplaceClient,
    ledger: Arc<dyn EnforcementLedger>,
    notifier: Arc<dyn Notifier>,
}

impl BudgetEnforcer {
    pub fn new(
        marketplace: MarketplaceClient,
        ledger: Arc<dyn EnforcementLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            marketplace,
            ledger,
            notifier,
        }
    }

    /// One enforcement cycle for a user. Steps run strictly in sequence:
    /// list campaigns, read each same-day spend, decide on the total, apply.
    pub async fn enforce_user(
        &self,
        creds: &MarketplaceCredentials,
        settings: &BudgetSettings,
        today: NaiveDate,
    ) -> Result<EnforcementReport, AppError> {
        let date = today.format("%Y-%m-%d").to_string();

        if !settings.is_active {
            log::debug!("Budget settings of user {} are inactive, skipping", settings.user_id);
            return Ok(EnforcementReport {
                user_id: settings.user_id.clone(),
                date,
                total_spend: 0.0,
                daily_limit: settings.daily_limit,
                notification_threshold: settings.notification_threshold,
                action: EnforcementAction::Continue,
                notified: false,
                campaigns: Vec::new(),
            });
        }

        // Only an unusable limit blocks enforcement; a stored row with an
        // inconsistent threshold must still pause at the limit.
        if !settings.daily_limit.is_finite() || settings.daily_limit < 0.0 {
            return Err(AppError::Validation(format!(
                "Daily limit of user {} is not enforceable: {}",
                settings.user_id, settings.daily_limit
            )));
        }
        if !(settings.notification_threshold >= 0.0
            && settings.notification_threshold <= settings.daily_limit)
        {
            log::warn!(
                "⚠️  User {} has notification threshold {} outside [0, {}]; enforcing the limit anyway",
                settings.user_id,
                settings.notification_threshold,
                settings.daily_limit
            );
        }

        let raw = self.marketplace.get_campaigns_list(creds).await?;
        let mut campaigns = parse_campaigns(&raw)?;

        let mut total_spend = 0.0;
        let mut stale: Vec<String> = Vec::new();
        for campaign in campaigns.iter_mut() {
            let snapshot = self
                .marketplace
                .fetch_spend_snapshot(creds, &campaign.id, today)
                .await?;

            // A window from another day means the platform rolled over under us
            if snapshot.date != today {
                log::warn!(
                    "⏭️  Statistics for campaign {} are for {}, not {}; ignoring",
                    campaign.id,
                    snapshot.date,
                    today
                );
                stale.push(campaign.id.clone());
                continue;
            }
            campaign.current_spend = Some(snapshot.spend);
            total_spend += snapshot.spend;
        }

        let action = decide(total_spend, settings.daily_limit, settings.notification_threshold);
        log::info!(
            "⚖️  User {}: spend {:.2} / limit {:.2} (threshold {:.2}) -> {}",
            settings.user_id,
            total_spend,
            settings.daily_limit,
            settings.notification_threshold,
            action
        );

        let notified = if action == EnforcementAction::Notify {
            match self.notify_user(settings, total_spend, &date).await {
                Ok(sent) => sent,
                Err(e) => {
                    log::error!("❌ Threshold notice failed for user {}: {}", settings.user_id, e);
                    false
                }
            }
        } else {
            false
        };

        let mut outcomes = Vec::with_capacity(campaigns.len());
        for campaign in &campaigns {
            let outcome = if stale.contains(&campaign.id) {
                CampaignOutcome {
                    campaign_id: campaign.id.clone(),
                    action,
                    applied: false,
                    skipped_reason: Some("stale statistics window".to_string()),
                }
            } else {
                self.apply(creds, settings, campaign, action, total_spend, &date).await
            };
            outcomes.push(outcome);
        }

        Ok(EnforcementReport {
            user_id: settings.user_id.clone(),
            date,
            total_spend,
            daily_limit: settings.daily_limit,
            notification_threshold: settings.notification_threshold,
            action,
            notified,
            campaigns: outcomes,
        })
    }

    /// The threshold is crossed by the user's total, so the notice is per user
    async fn notify_user(
        &self,
        settings: &BudgetSettings,
        total_spend: f64,
        date: &str,
    ) -> Result<bool, AppError> {
        let key = EnforcementKey::user_notice(&settings.user_id, date);
        if self.ledger.contains(&key).await? {
            log::debug!("Threshold notice already sent to user {} on {}", settings.user_id, date);
            return Ok(false);
        }

        self.notifier.notify(settings, total_spend).await?;
        self.record(settings, &key.campaign_id, EnforcementAction::Notify, total_spend, date)
            .await
    }

    /// Failures are reported on the outcome so the remaining campaigns still get paused
    async fn apply(
        &self,
        creds: &MarketplaceCredentials,
        settings: &BudgetSettings,
        campaign: &Campaign,
        action: EnforcementAction,
        total_spend: f64,
        date: &str,
    ) -> CampaignOutcome {
        let mut outcome = CampaignOutcome {
            campaign_id: campaign.id.clone(),
            action,
            applied: false,
            skipped_reason: None,
        };

        if action != EnforcementAction::Pause {
            return outcome;
        }

        match self.pause(creds, settings, campaign, total_spend, date).await {
            Ok(applied) => outcome.applied = applied,
            Err(e) => {
                log::error!("❌ {} failed for campaign {}: {}", action, campaign.id, e);
                outcome.skipped_reason = Some(format!("failed: {}", e));
            }
        }
        outcome
    }

    async fn pause(
        &self,
        creds: &MarketplaceCredentials,
        settings: &BudgetSettings,
        campaign: &Campaign,
        total_spend: f64,
        date: &str,
    ) -> Result<bool, AppError> {
        // No automatic un-pause; a paused campaign waits for a manual resume
        let state = self.ledger.campaign_state(&settings.user_id, &campaign.id).await?;
        if state == CampaignState::Paused {
            return Ok(false);
        }

        let key = EnforcementKey {
            campaign_id: campaign.id.clone(),
            date: date.to_string(),
            action: EnforcementAction::Pause,
        };
        if self.ledger.contains(&key).await? {
            log::debug!("PAUSE already applied to campaign {} on {}", campaign.id, date);
            return Ok(false);
        }

        log::warn!(
            "⏸️  Pausing campaign {} for user {} (spend {:.2} >= limit {:.2})",
            campaign.id,
            settings.user_id,
            total_spend,
            settings.daily_limit
        );
        self.marketplace
            .update_campaign_budget(creds, &campaign.id, PAUSED_DAILY_BUDGET)
            .await?;
        self.ledger
            .set_campaign_state(&settings.user_id, &campaign.id, CampaignState::Paused)
            .await?;

        self.record(settings, &campaign.id, EnforcementAction::Pause, total_spend, date)
            .await
    }

    async fn record(
        &self,
        settings: &BudgetSettings,
        campaign_id: &str,
        action: EnforcementAction,
        total_spend: f64,
        date: &str,
    ) -> Result<bool, AppError> {
        let event = EnforcementEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            user_id: settings.user_id.clone(),
            campaign_id: campaign_id.to_string(),
            date: date.to_string(),
            action,
            spend: total_spend,
            daily_limit: settings.daily_limit,
            notification_threshold: settings.notification_threshold,
            created_at: chrono::Utc::now().timestamp(),
        };
        self.ledger.record(&event).await
    }

    /// Manual re-enable: restores the budget on the platform, then marks the campaign active
    pub async fn resume_campaign(
        &self,
        creds: &MarketplaceCredentials,
        user_id: &str,
        campaign_id: &str,
        daily_budget: f64,
    ) -> Result<CampaignState, AppError> {
        if !daily_budget.is_finite() || daily_budget <= 0.0 {
            return Err(AppError::Validation(
                "Resuming a campaign needs a positive daily budget".to_string(),
            ));
        }

        log::info!("▶️  Resuming campaign {} for user {} with budget {}", campaign_id, user_id, daily_budget);
        self.marketplace
            .update_campaign_budget(creds, campaign_id, daily_budget)
            .await?;
        self.ledger
            .set_campaign_state(user_id, campaign_id, CampaignState::Active)
            .await?;
        Ok(CampaignState::Active)
    }

    pub async fn campaign_state(&self, user_id: &str, campaign_id: &str) -> Result<CampaignState, AppError> {
        self.ledger.campaign_state(user_id, campaign_id).await
    }
}

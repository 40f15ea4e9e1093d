// ==================== ENFORCEMENT LEDGER ====================
// Registro de efeitos colaterais do enforcement (dedup por campanha/dia/ação)
// e estado ACTIVE/PAUSED de cada campanha.
//   MongoLedger    : produção (enforcement_events + campaign_states)
//   InMemoryLedger : testes
//
// O estado é por (usuário, campanha): ids de campanha não são únicos entre contas.

use crate::{
    database::{MongoDB, CAMPAIGN_STATES, ENFORCEMENT_EVENTS},
    models::{CampaignState, CampaignStateRecord, EnforcementEvent, EnforcementKey},
    utils::AppError,
};
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
#[cfg(test)]
use std::collections::{HashMap, HashSet};
#[cfg(test)]
use std::sync::Mutex;

#[async_trait]
pub trait EnforcementLedger: Send + Sync {
    async fn contains(&self, key: &EnforcementKey) -> Result<bool, AppError>;

    /// Stores the event; `Ok(false)` when its key was already recorded
    async fn record(&self, event: &EnforcementEvent) -> Result<bool, AppError>;

    /// Campaigns never seen before are `Active`
    async fn campaign_state(&self, user_id: &str, campaign_id: &str) -> Result<CampaignState, AppError>;

    async fn set_campaign_state(
        &self,
        user_id: &str,
        campaign_id: &str,
        state: CampaignState,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MongoLedger {
    db: MongoDB,
}

impl MongoLedger {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl EnforcementLedger for MongoLedger {
    async fn contains(&self, key: &EnforcementKey) -> Result<bool, AppError> {
        let events = self.db.collection::<EnforcementEvent>(ENFORCEMENT_EVENTS);
        let found = events
            .find_one(doc! {
                "campaign_id": &key.campaign_id,
                "date": &key.date,
                "action": key.action.as_str(),
            })
            .await?;
        Ok(found.is_some())
    }

    async fn record(&self, event: &EnforcementEvent) -> Result<bool, AppError> {
        let events = self.db.collection::<EnforcementEvent>(ENFORCEMENT_EVENTS);
        match events.insert_one(event).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => {
                log::debug!(
                    "Enforcement event already recorded: {} {} {}",
                    event.campaign_id,
                    event.date,
                    event.action
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn campaign_state(&self, user_id: &str, campaign_id: &str) -> Result<CampaignState, AppError> {
        let states = self.db.collection::<CampaignStateRecord>(CAMPAIGN_STATES);
        let record = states
            .find_one(doc! { "user_id": user_id, "campaign_id": campaign_id })
            .await?;
        Ok(record.map(|r| r.state).unwrap_or_default())
    }

    async fn set_campaign_state(
        &self,
        user_id: &str,
        campaign_id: &str,
        state: CampaignState,
    ) -> Result<(), AppError> {
        let states = self.db.collection::<CampaignStateRecord>(CAMPAIGN_STATES);
        states
            .update_one(
                doc! { "user_id": user_id, "campaign_id": campaign_id },
                doc! { "$set": {
                    "state": state.as_str(),
                    "updated_at": chrono::Utc::now().timestamp(),
                } },
            )
            .upsert(true)
            .await?;
        log::info!("📌 Campaign {} of user {} is now {}", campaign_id, user_id, state.as_str());
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct InMemoryLedger {
    keys: Mutex<HashSet<EnforcementKey>>,
    events: Mutex<Vec<EnforcementEvent>>,
    states: Mutex<HashMap<(String, String), CampaignState>>,
}

#[cfg(test)]
impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EnforcementEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
fn poisoned<T>(_: T) -> AppError {
    AppError::Database("in-memory ledger lock poisoned".to_string())
}

#[cfg(test)]
#[async_trait]
impl EnforcementLedger for InMemoryLedger {
    async fn contains(&self, key: &EnforcementKey) -> Result<bool, AppError> {
        Ok(self.keys.lock().map_err(poisoned)?.contains(key))
    }

    async fn record(&self, event: &EnforcementEvent) -> Result<bool, AppError> {
        let inserted = self.keys.lock().map_err(poisoned)?.insert(event.key());
        if inserted {
            self.events.lock().map_err(poisoned)?.push(event.clone());
        }
        Ok(inserted)
    }

    async fn campaign_state(&self, user_id: &str, campaign_id: &str) -> Result<CampaignState, AppError> {
        let states = self.states.lock().map_err(poisoned)?;
        let key = (user_id.to_string(), campaign_id.to_string());
        Ok(states.get(&key).copied().unwrap_or_default())
    }

    async fn set_campaign_state(
        &self,
        user_id: &str,
        campaign_id: &str,
        state: CampaignState,
    ) -> Result<(), AppError> {
        self.states
            .lock()
            .map_err(poisoned)?
            .insert((user_id.to_string(), campaign_id.to_string()), state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnforcementAction;

    fn event(campaign_id: &str, date: &str, action: EnforcementAction) -> EnforcementEvent {
        EnforcementEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".into(),
            campaign_id: campaign_id.into(),
            date: date.into(),
            action,
            spend: 1000.0,
            daily_limit: 1000.0,
            notification_threshold: 800.0,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn test_record_is_once_per_key() {
        let ledger = InMemoryLedger::new();
        let pause = event("C1", "2024-05-20", EnforcementAction::Pause);

        assert!(ledger.record(&pause).await.unwrap());
        assert!(!ledger.record(&event("C1", "2024-05-20", EnforcementAction::Pause)).await.unwrap());
        assert!(ledger.contains(&pause.key()).await.unwrap());

        // Different day or action is a different key
        assert!(ledger.record(&event("C1", "2024-05-21", EnforcementAction::Pause)).await.unwrap());
        assert!(ledger.record(&event("C1", "2024-05-20", EnforcementAction::Notify)).await.unwrap());
        assert_eq!(ledger.events().len(), 3);
    }

    #[tokio::test]
    async fn test_campaign_state_defaults_to_active() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.campaign_state("u1", "C1").await.unwrap(), CampaignState::Active);

        ledger.set_campaign_state("u1", "C1", CampaignState::Paused).await.unwrap();
        assert_eq!(ledger.campaign_state("u1", "C1").await.unwrap(), CampaignState::Paused);
    }

    #[tokio::test]
    async fn test_same_campaign_id_under_two_users() {
        let ledger = InMemoryLedger::new();
        ledger.set_campaign_state("u1", "C1", CampaignState::Paused).await.unwrap();

        assert_eq!(ledger.campaign_state("u2", "C1").await.unwrap(), CampaignState::Active);

        ledger.set_campaign_state("u2", "C1", CampaignState::Active).await.unwrap();
        assert_eq!(ledger.campaign_state("u1", "C1").await.unwrap(), CampaignState::Paused);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongo_ledger_dedup() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/ozobid_test".to_string());
        let ledger = MongoLedger::new(MongoDB::new(&uri).await.unwrap());
        let campaign = format!("test-{}", uuid::Uuid::new_v4());

        let first = event(&campaign, "2024-05-20", EnforcementAction::Pause);
        assert!(ledger.record(&first).await.unwrap());
        assert!(!ledger.record(&event(&campaign, "2024-05-20", EnforcementAction::Pause)).await.unwrap());
        assert!(ledger.contains(&first.key()).await.unwrap());

        ledger.set_campaign_state("u1", &campaign, CampaignState::Paused).await.unwrap();
        assert_eq!(ledger.campaign_state("u1", &campaign).await.unwrap(), CampaignState::Paused);
        assert_eq!(ledger.campaign_state("u2", &campaign).await.unwrap(), CampaignState::Active);
    }
}

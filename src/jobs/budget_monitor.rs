// ═══════════════════════════════════════════════════════════════════
// BUDGET MONITOR: Background job que aplica os limites diários
// ═══════════════════════════════════════════════════════════════════
//
// - Spawna tokio::spawn em background
// - Roda em loop com intervalo configurável
// - Para cada budget_settings ativo: credenciais -> enforce_user()
// - Logs de cada ciclo
//
// Configuração via env:
//   BUDGET_MONITOR_INTERVAL_SECS : intervalo do loop (default: 300s, mínimo 30s)
//   BUDGET_MONITOR_ENABLED       : "true" para ativar (default: true)
//   SUPABASE_SERVICE_ROLE_KEY    : obrigatório; sem ele o job não inicia
//

use crate::{
    config::AppConfig,
    models::EnforcementAction,
    services::{budget_enforcement::BudgetEnforcer, credential_store::CredentialStore},
    utils::AppError,
};
use chrono::NaiveDate;
use tokio::time::{interval, Duration};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleSummary {
    pub users: usize,
    pub enforced: usize,
    pub skipped: usize,
    pub errors: usize,
    pub paused: usize,
}

/// Starts the monitor in background. Returns without spawning when disabled
/// or when no service-role key is configured.
pub async fn start_budget_monitor(config: &AppConfig, store: CredentialStore, enforcer: BudgetEnforcer) {
    if !config.budget_monitor_enabled {
        log::info!("⏸️  Budget monitor DISABLED (BUDGET_MONITOR_ENABLED=false)");
        return;
    }

    let Some(service_key) = config.supabase_service_role_key.clone() else {
        log::warn!("⚠️  Budget monitor not started: SUPABASE_SERVICE_ROLE_KEY is not set");
        return;
    };

    let period = config.budget_monitor_interval;
    log::info!("🛡️  Starting budget monitor (interval: {}s)", period.as_secs());

    tokio::spawn(async move {
        // Delay inicial para o servidor subir
        tokio::time::sleep(Duration::from_secs(10)).await;

        let mut tick_interval = interval(period);
        let mut cycle_count: u64 = 0;

        loop {
            tick_interval.tick().await;
            cycle_count += 1;
            run_monitor_cycle(&store, &enforcer, &service_key, cycle_count).await;
        }
    });

    log::info!("✅ Budget monitor started successfully");
}

async fn run_monitor_cycle(store: &CredentialStore, enforcer: &BudgetEnforcer, service_key: &str, cycle: u64) {
    let start = std::time::Instant::now();
    log::debug!("🛡️  Budget monitor cycle #{} starting...", cycle);

    let today = chrono::Utc::now().date_naive();
    match run_enforcement_cycle(store, enforcer, service_key, today).await {
        Ok(summary) => {
            let elapsed = start.elapsed();
            if summary.paused > 0 || summary.errors > 0 {
                log::info!(
                    "🛡️  Monitor cycle #{}: {} users, {} enforced, {} paused, {} skipped, {} errors ({}ms)",
                    cycle,
                    summary.users,
                    summary.enforced,
                    summary.paused,
                    summary.skipped,
                    summary.errors,
                    elapsed.as_millis()
                );
            } else {
                log::debug!(
                    "🛡️  Monitor cycle #{}: {} users, {} enforced ({}ms)",
                    cycle,
                    summary.users,
                    summary.enforced,
                    elapsed.as_millis()
                );
            }
        }
        Err(e) => {
            log::error!("❌ Budget monitor cycle #{} failed: {}", cycle, e);
            // Em caso de erro persistente, espera antes do próximo ciclo
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }
}

/// One pass over every active settings row. Users are handled in sequence;
/// a failing user is counted and the pass moves on.
pub async fn run_enforcement_cycle(
    store: &CredentialStore,
    enforcer: &BudgetEnforcer,
    service_key: &str,
    today: NaiveDate,
) -> Result<CycleSummary, AppError> {
    let all_settings = store.list_active_budget_settings(service_key).await?;
    let mut summary = CycleSummary {
        users: all_settings.len(),
        ..CycleSummary::default()
    };

    for settings in &all_settings {
        let creds = match store.get_active_credentials(service_key, &settings.user_id).await {
            Ok(Some(creds)) => creds,
            Ok(None) => {
                log::debug!("User {} has budget settings but no credentials", settings.user_id);
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                log::error!("❌ Credentials lookup failed for {}: {}", settings.user_id, e);
                summary.errors += 1;
                continue;
            }
        };

        match enforcer.enforce_user(&creds, settings, today).await {
            Ok(report) => {
                summary.enforced += 1;
                summary.paused += report
                    .campaigns
                    .iter()
                    .filter(|c| c.applied && c.action == EnforcementAction::Pause)
                    .count();
            }
            Err(e) => {
                log::error!("❌ Enforcement failed for {}: {}", settings.user_id, e);
                summary.errors += 1;
            }
        }
    }

    Ok(summary)
}

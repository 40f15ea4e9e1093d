use crate::utils::AppError;
use serde::{Deserialize, Serialize};

/// Row of `budget_settings`; at most one per user (upsert on `user_id`)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct BudgetSettings {
    pub user_id: String,
    pub daily_limit: f64,
    pub notification_threshold: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl BudgetSettings {
    pub fn new(user_id: &str, daily_limit: f64, notification_threshold: f64) -> Self {
        Self {
            user_id: user_id.to_string(),
            daily_limit,
            notification_threshold,
            is_active: true,
        }
    }
}

/// Both values non-negative and finite, threshold not above the limit
pub fn validate_limits(daily_limit: f64, notification_threshold: f64) -> Result<(), AppError> {
    if !daily_limit.is_finite() || !notification_threshold.is_finite() {
        return Err(AppError::Validation("Budget values must be finite numbers".to_string()));
    }
    if daily_limit < 0.0 {
        return Err(AppError::Validation("Daily limit must not be negative".to_string()));
    }
    if notification_threshold < 0.0 {
        return Err(AppError::Validation(
            "Notification threshold must not be negative".to_string(),
        ));
    }
    if notification_threshold > daily_limit {
        return Err(AppError::Validation(format!(
            "Notification threshold ({}) must not exceed daily limit ({})",
            notification_threshold, daily_limit
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_limits_accepts_sane_values() {
        assert!(validate_limits(1000.0, 800.0).is_ok());
        assert!(validate_limits(1000.0, 1000.0).is_ok());
        assert!(validate_limits(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_validate_limits_rejects_bad_values() {
        assert!(matches!(validate_limits(-1.0, 0.0), Err(AppError::Validation(_))));
        assert!(matches!(validate_limits(100.0, -5.0), Err(AppError::Validation(_))));
        assert!(matches!(validate_limits(100.0, 150.0), Err(AppError::Validation(_))));
        assert!(matches!(validate_limits(f64::NAN, 0.0), Err(AppError::Validation(_))));
    }
}

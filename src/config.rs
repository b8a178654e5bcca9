use crate::error::{RentLedgerError, Result};
use crate::persistence::RecoveryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RentalConfig {
    /// Where the store is loaded from and saved to.
    pub data_file: PathBuf,
    /// Fail on a corrupt data file instead of starting empty.
    pub strict_load: bool,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub check_interval_hours: u64,
    /// Contracts ending within this many days produce an expiry notice.
    pub expiry_window_days: i64,
    pub notify_unpaid: bool,
}

impl Default for RentalConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("rental_data.json"),
            strict_load: false,
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_hours: 24,
            expiry_window_days: 30,
            notify_unpaid: true,
        }
    }
}

impl RentalConfig {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn recovery_policy(&self) -> RecoveryPolicy {
        if self.strict_load {
            RecoveryPolicy::Strict
        } else {
            RecoveryPolicy::ResetOnCorruption
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(RentLedgerError::invalid("data_file", "must not be empty"));
        }
        self.notifications.validate()
    }
}

impl NotificationConfig {
    /// One leap year.
    pub const MAX_CHECK_INTERVAL_HOURS: u64 = 366 * 24;

    pub fn validate(&self) -> Result<()> {
        if self.check_interval_hours == 0 || self.check_interval_hours > Self::MAX_CHECK_INTERVAL_HOURS {
            return Err(RentLedgerError::invalid(
                "notifications.check_interval_hours",
                format!(
                    "{} must be between 1 and {}",
                    self.check_interval_hours,
                    Self::MAX_CHECK_INTERVAL_HOURS
                ),
            ));
        }
        if self.expiry_window_days < 1 {
            return Err(RentLedgerError::invalid(
                "notifications.expiry_window_days",
                format!("{} must be at least 1", self.expiry_window_days),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config =
            RentalConfig::from_json_str(r#"{"notifications": {"expiry_window_days": 60}}"#).unwrap();
        assert_eq!(config.data_file, PathBuf::from("rental_data.json"));
        assert_eq!(config.notifications.expiry_window_days, 60);
        assert_eq!(config.notifications.check_interval_hours, 24);
        assert_eq!(config.recovery_policy(), RecoveryPolicy::ResetOnCorruption);
    }

    #[test]
    fn test_invalid_interval_is_rejected() {
        let err = RentalConfig::from_json_str(r#"{"notifications": {"check_interval_hours": 0}}"#)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);

        let too_long = NotificationConfig {
            check_interval_hours: u64::MAX,
            ..NotificationConfig::default()
        };
        assert!(too_long.validate().is_err());

        let yearly = NotificationConfig {
            check_interval_hours: NotificationConfig::MAX_CHECK_INTERVAL_HOURS,
            ..NotificationConfig::default()
        };
        assert!(yearly.validate().is_ok());
    }
}

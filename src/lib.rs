//! # Rent Ledger
//!
//! A library for tracking rental buildings, tenants, monthly rent obligations
//! and payments, producing per-tenant ledgers and outstanding balances.
//!
//! ## Core Concepts
//!
//! - **Store**: Buildings mapped to tenants, each with lease terms, per-month rent overrides and payments
//! - **Ledger**: One row per month from lease start to the current month, with a running balance
//! - **Proration**: Partial-month rent as `rent × days_occupied / days_in_month` for the first
//!   month of a prorated lease and the month a contract ends
//! - **Override**: A per-month replacement for the base rent (last write wins per month)
//! - **Balance**: Cumulative rent due minus cumulative payments
//!
//! ## Example
//!
//! ```rust,ignore
//! use rent_ledger::*;
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let mut store = RentalStore::new();
//! store.add_building("Maple Court")?;
//! store.add_tenant(
//!     "Maple Court",
//!     "Lee",
//!     NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
//!     dec!(310),
//!     PaymentType::Prorated,
//! )?;
//! store.add_payment("Maple Court", "Lee", "2024-01-20", "170")?;
//!
//! let engine = LedgerEngine::new(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
//! let lee = store.tenant("Maple Court", "Lee")?;
//! for row in engine.generate_ledger(lee).rows {
//!     println!("{} {} {} {}", row.label, row.rent_due, row.paid, row.balance);
//! }
//! ```

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod notifications;
pub mod persistence;
pub mod reconciliation;
pub mod schema;
pub mod store;
pub mod summary;
pub mod tenant;
pub mod utils;

pub use commands::{apply_single_command, CommandBatch, StoreCommand};
pub use config::{NotificationConfig, RentalConfig};
pub use engine::{LedgerEngine, LedgerRow, MonthlyCharge, Proration, RentIncrease, TenantLedger};
pub use error::{ErrorKind, RentLedgerError, Result};
pub use notifications::{scan_notices, Notice, NoticeKind, ReadOnlyStore};
pub use persistence::{load_store, save_store, LoadOutcome, RecoveryPolicy};
pub use reconciliation::{reconcile_tenant, verify_store_balances, BalanceReconciler, ReconciliationResult};
pub use schema::{OverrideEntry, RentalData, TenantEntry};
pub use store::{RentalStore, TenantTerms};
pub use summary::{BuildingSummary, PortfolioSummary, UnpaidEntry};
pub use tenant::{Payment, PaymentType, RentOverride, TenantRecord};
pub use utils::*;

#[cfg(feature = "scheduler")]
pub use notifications::spawn_notification_task;

use log::{debug, info, warn};
use rust_decimal::Decimal;

/// The application's state: configuration, the store and the clock the
/// engine computes against. Hosts own one session and pass it by reference.
#[derive(Debug, Clone)]
pub struct RentalSession {
    config: RentalConfig,
    store: RentalStore,
    engine: LedgerEngine,
}

impl RentalSession {
    /// Loads the configured data file, applying the configured recovery
    /// policy. Returns the session and how the load went.
    pub fn open(config: RentalConfig) -> Result<(Self, LoadOutcomeKind)> {
        config.validate()?;

        let outcome = load_store(&config.data_file, config.recovery_policy())?;
        let kind = match &outcome {
            LoadOutcome::Loaded(_) => LoadOutcomeKind::Loaded,
            LoadOutcome::Missing => LoadOutcomeKind::Missing,
            LoadOutcome::Recovered { reason } => {
                warn!("Session opened with an empty store after recovery: {}", reason);
                LoadOutcomeKind::Recovered
            }
        };

        info!("Opened rental session on {}", config.data_file.display());
        Ok((
            Self {
                config,
                store: outcome.into_store(),
                engine: LedgerEngine::today(),
            },
            kind,
        ))
    }

    pub fn with_store(config: RentalConfig, store: RentalStore, engine: LedgerEngine) -> Self {
        Self {
            config,
            store,
            engine,
        }
    }

    pub fn config(&self) -> &RentalConfig {
        &self.config
    }

    pub fn store(&self) -> &RentalStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RentalStore {
        &mut self.store
    }

    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Moves the session clock, e.g. at midnight or in tests.
    pub fn set_as_of(&mut self, as_of: chrono::NaiveDate) {
        self.engine = LedgerEngine::new(as_of);
    }

    pub fn save(&self) -> Result<()> {
        save_store(&self.store, &self.config.data_file)
    }

    pub fn ledger(&self, building: &str, tenant: &str) -> Result<TenantLedger> {
        let record = self.store.tenant(building, tenant)?;
        Ok(self.engine.generate_ledger(record))
    }

    pub fn balance(&self, building: &str, tenant: &str) -> Result<Decimal> {
        let record = self.store.tenant(building, tenant)?;
        Ok(self.engine.calculate_balance(record))
    }

    pub fn summary(&self) -> PortfolioSummary {
        PortfolioSummary::from_store(&self.engine, &self.store)
    }

    pub fn notices(&self) -> Vec<Notice> {
        if !self.config.notifications.enabled {
            return Vec::new();
        }
        scan_notices(&self.engine, &self.store, &self.config.notifications)
    }

    /// Applies a batch all-or-nothing; on error the session's store is unchanged.
    pub fn apply(&mut self, batch: &CommandBatch) -> Result<()> {
        let updated = batch.apply(&self.engine, &self.store)?;
        debug!("Applied {} command(s)", batch.commands.len());
        self.store = updated;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcomeKind {
    Loaded,
    Missing,
    Recovered,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_session_open_save_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = RentalConfig {
            data_file: dir.path().join("rental_data.json"),
            ..RentalConfig::default()
        };

        let (mut session, kind) = RentalSession::open(config.clone()).unwrap();
        assert_eq!(kind, LoadOutcomeKind::Missing);
        session.set_as_of(ymd(2024, 3, 31));

        let batch = CommandBatch::new(vec![
            StoreCommand::AddBuilding {
                name: "Maple Court".to_string(),
            },
            StoreCommand::AddTenant {
                building: "Maple Court".to_string(),
                name: "Lee".to_string(),
                start_date: ymd(2024, 1, 15),
                monthly_rent: dec!(310),
                payment_type: PaymentType::Prorated,
                contract_end_date: None,
            },
        ]);
        session.apply(&batch).unwrap();
        session
            .store_mut()
            .add_payment("Maple Court", "Lee", "2024-01-20", "170")
            .unwrap();

        assert_eq!(session.balance("Maple Court", "Lee").unwrap(), dec!(620));
        assert_eq!(session.ledger("Maple Court", "Lee").unwrap().rows.len(), 3);
        session.save().unwrap();

        let (reopened, kind) = RentalSession::open(config).unwrap();
        assert_eq!(kind, LoadOutcomeKind::Loaded);
        assert_eq!(reopened.store(), session.store());
    }

    #[test]
    fn test_session_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rental_data.json");
        std::fs::write(&path, "not json at all").unwrap();

        let config = RentalConfig {
            data_file: path.clone(),
            ..RentalConfig::default()
        };
        let (session, kind) = RentalSession::open(config).unwrap();
        assert_eq!(kind, LoadOutcomeKind::Recovered);
        assert!(session.store().is_empty());

        let strict = RentalConfig {
            data_file: path,
            strict_load: true,
            ..RentalConfig::default()
        };
        let err = RentalSession::open(strict).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataCorruption);
    }

    #[test]
    fn test_disabled_notifications_return_nothing() {
        let mut store = RentalStore::new();
        store.add_building("Oak").unwrap();
        store
            .add_tenant("Oak", "Owes", ymd(2024, 1, 1), dec!(100), PaymentType::Full)
            .unwrap();

        let mut config = RentalConfig::default();
        let engine = LedgerEngine::new(ymd(2024, 2, 1));
        let session = RentalSession::with_store(config.clone(), store.clone(), engine);
        assert_eq!(session.notices().len(), 1);

        config.notifications.enabled = false;
        let session = RentalSession::with_store(config, store, engine);
        assert!(session.notices().is_empty());
    }
}

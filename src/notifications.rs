//! Read-only checks for contracts about to expire and tenants in arrears.
//!
//! [`scan_notices`] borrows the store immutably. With the `scheduler` feature,
//! [`spawn_notification_task`] repeats the scan on an interval while holding
//! only a [`ReadOnlyStore`].

use crate::config::NotificationConfig;
use crate::engine::LedgerEngine;
use crate::store::RentalStore;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoticeKind {
    ContractExpiring {
        end_date: NaiveDate,
        days_remaining: i64,
    },
    OutstandingBalance {
        balance: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub building: String,
    pub tenant: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn message(&self) -> String {
        match &self.kind {
            NoticeKind::ContractExpiring { days_remaining, end_date } => format!(
                "{} - {}: contract ends in {} day(s) on {}",
                self.building, self.tenant, days_remaining, end_date
            ),
            NoticeKind::OutstandingBalance { balance } => format!(
                "{} - {}: outstanding balance of {}",
                self.building, self.tenant, balance
            ),
        }
    }
}

pub fn scan_notices(engine: &LedgerEngine, store: &RentalStore, config: &NotificationConfig) -> Vec<Notice> {
    let today = engine.as_of();
    let mut notices = Vec::new();

    for (building, name, tenant) in store.iter_tenants() {
        if let Some(end_date) = tenant.contract_end_date {
            let days_remaining = (end_date - today).num_days();
            if days_remaining > 0 && days_remaining <= config.expiry_window_days {
                notices.push(Notice {
                    building: building.to_string(),
                    tenant: name.to_string(),
                    kind: NoticeKind::ContractExpiring {
                        end_date,
                        days_remaining,
                    },
                });
            }
        }

        if config.notify_unpaid {
            let balance = engine.calculate_balance(tenant);
            if balance > Decimal::ZERO {
                notices.push(Notice {
                    building: building.to_string(),
                    tenant: name.to_string(),
                    kind: NoticeKind::OutstandingBalance { balance },
                });
            }
        }
    }

    notices
}

/// Shared store handle that only grants read access.
#[derive(Debug, Clone)]
pub struct ReadOnlyStore {
    inner: Arc<RwLock<RentalStore>>,
}

impl ReadOnlyStore {
    pub fn new(inner: Arc<RwLock<RentalStore>>) -> Self {
        Self { inner }
    }

    pub fn read<R>(&self, f: impl FnOnce(&RentalStore) -> R) -> R {
        // A writer that panicked cannot leave the store half-mutated, since
        // every mutation validates before writing.
        let guard = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }
}

#[cfg(feature = "scheduler")]
pub use scheduled::spawn_notification_task;

#[cfg(feature = "scheduler")]
mod scheduled {
    use super::{scan_notices, Notice, ReadOnlyStore};
    use crate::config::NotificationConfig;
    use crate::engine::LedgerEngine;
    use log::{debug, error, info};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    /// Scans every `check_interval_hours`, starting immediately, and sends
    /// each non-empty batch of notices. Stops when the receiver is dropped.
    /// An invalid config stops the task before the first scan.
    pub fn spawn_notification_task(
        store: ReadOnlyStore,
        config: NotificationConfig,
        sender: mpsc::Sender<Vec<Notice>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !config.enabled {
                info!("Notifications disabled; scheduler not started");
                return;
            }

            if let Err(e) = config.validate() {
                error!("Notification scheduler not started: {}", e);
                return;
            }

            let period = Duration::from_secs(config.check_interval_hours.saturating_mul(3600));
            let mut ticker = tokio::time::interval(period);

            loop {
                ticker.tick().await;
                let engine = LedgerEngine::today();
                let notices = store.read(|s| scan_notices(&engine, s, &config));
                debug!("Notification scan produced {} notice(s)", notices.len());

                if notices.is_empty() {
                    continue;
                }
                if sender.send(notices).await.is_err() {
                    debug!("Notification receiver dropped; stopping scheduler");
                    break;
                }
            }
        })
    }
}

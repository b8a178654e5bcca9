use crate::engine::LedgerEngine;
use crate::error::{RentLedgerError, Result};
use crate::store::RentalStore;
use crate::tenant::{Payment, TenantRecord};
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    /// Closing balance of the generated ledger.
    pub ledger_balance: Decimal,
    /// Balance from summing every month's rent minus every payment.
    pub flat_balance: Decimal,
    /// `ledger_balance - flat_balance`; equals the total of payments that
    /// fall outside the ledger window.
    pub difference: Decimal,
    pub unattributed_payments: Vec<Payment>,
    pub warnings: Vec<String>,
}

impl ReconciliationResult {
    pub fn is_consistent(&self, tolerance: Decimal) -> bool {
        self.difference.abs() <= tolerance
    }
}

pub struct BalanceReconciler<'a> {
    engine: &'a LedgerEngine,
}

impl<'a> BalanceReconciler<'a> {
    pub fn new(engine: &'a LedgerEngine) -> Self {
        Self { engine }
    }

    pub fn reconcile_tenant(&self, tenant: &TenantRecord) -> ReconciliationResult {
        let ledger = self.engine.generate_ledger(tenant);
        let ledger_balance = ledger.closing_balance();
        let flat_balance = self.engine.calculate_balance(tenant);

        let mut warnings = Vec::new();
        for payment in &ledger.unattributed_payments {
            let position = if payment.date < tenant.start_date {
                "before the lease start"
            } else {
                "after the current month"
            };
            warnings.push(format!(
                "Payment of {} on {} is {} and appears in no ledger row",
                payment.amount, payment.date, position
            ));
        }

        ReconciliationResult {
            ledger_balance,
            flat_balance,
            difference: ledger_balance - flat_balance,
            unattributed_payments: ledger.unattributed_payments,
            warnings,
        }
    }

    /// Fails on the first tenant whose ledger and flat balances differ by
    /// more than `tolerance`.
    pub fn verify_store(&self, store: &RentalStore, tolerance: Decimal) -> Result<()> {
        for (building, name, tenant) in store.iter_tenants() {
            let result = self.reconcile_tenant(tenant);

            for warning in &result.warnings {
                debug!("{} - {}: {}", building, name, warning);
            }

            if !result.is_consistent(tolerance) {
                return Err(RentLedgerError::BalanceMismatch {
                    building: building.to_string(),
                    tenant: name.to_string(),
                    ledger_balance: result.ledger_balance,
                    flat_balance: result.flat_balance,
                });
            }
        }

        Ok(())
    }
}

pub fn reconcile_tenant(engine: &LedgerEngine, tenant: &TenantRecord) -> ReconciliationResult {
    BalanceReconciler::new(engine).reconcile_tenant(tenant)
}

pub fn verify_store_balances(engine: &LedgerEngine, store: &RentalStore, tolerance: Decimal) -> Result<()> {
    BalanceReconciler::new(engine).verify_store(store, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::PaymentType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_balances_agree_when_payments_are_in_window() {
        let mut tenant = TenantRecord::new(ymd(2024, 1, 1), dec!(300), PaymentType::Full);
        tenant.add_payment(Payment {
            date: ymd(2024, 1, 3),
            amount: dec!(300),
        });
        let engine = LedgerEngine::new(ymd(2024, 2, 15));

        let result = reconcile_tenant(&engine, &tenant);
        assert_eq!(result.ledger_balance, dec!(300));
        assert_eq!(result.flat_balance, dec!(300));
        assert!(result.is_consistent(Decimal::ZERO));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_early_payment_causes_divergence() {
        let mut tenant = TenantRecord::new(ymd(2024, 1, 1), dec!(300), PaymentType::Full);
        tenant.add_payment(Payment {
            date: ymd(2023, 12, 20),
            amount: dec!(300),
        });
        let engine = LedgerEngine::new(ymd(2024, 2, 15));

        let result = reconcile_tenant(&engine, &tenant);
        assert_eq!(result.ledger_balance, dec!(600));
        assert_eq!(result.flat_balance, dec!(300));
        assert_eq!(result.difference, dec!(300));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("before the lease start"));
    }

    #[test]
    fn test_verify_store_reports_mismatch() {
        let mut store = RentalStore::new();
        store.add_building("Elm").unwrap();
        store
            .add_tenant("Elm", "Han", ymd(2024, 1, 1), dec!(300), PaymentType::Full)
            .unwrap();
        let engine = LedgerEngine::new(ymd(2024, 2, 15));

        assert!(verify_store_balances(&engine, &store, Decimal::ZERO).is_ok());

        store.add_payment("Elm", "Han", "2024-05-01", "300").unwrap();
        let err = verify_store_balances(&engine, &store, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, RentLedgerError::BalanceMismatch { .. }));
    }
}

use crate::utils::first_of_month;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// A full month's rent is charged even for a partial first month.
    #[default]
    Full,
    /// The first month is charged only for the days occupied.
    Prorated,
}

/// A per-month replacement for the tenant's base rent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentOverride {
    pub amount: Decimal,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Payment {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRecord {
    pub start_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub payment_type: PaymentType,
    pub contract_end_date: Option<NaiveDate>,
    /// Keyed by the first day of the month the override applies to.
    pub monthly_rent_overrides: BTreeMap<NaiveDate, RentOverride>,
    /// Sorted ascending by date.
    pub payments: Vec<Payment>,
}

impl TenantRecord {
    pub fn new(start_date: NaiveDate, monthly_rent: Decimal, payment_type: PaymentType) -> Self {
        Self {
            start_date,
            monthly_rent,
            payment_type,
            contract_end_date: None,
            monthly_rent_overrides: BTreeMap::new(),
            payments: Vec::new(),
        }
    }

    pub fn with_contract_end(mut self, contract_end_date: NaiveDate) -> Self {
        self.contract_end_date = Some(contract_end_date);
        self
    }

    pub fn override_for(&self, month: NaiveDate) -> Option<&RentOverride> {
        self.monthly_rent_overrides.get(&first_of_month(month))
    }

    /// The month's rent before any proration: the override amount if one is
    /// set, otherwise the base monthly rent.
    pub fn effective_rent(&self, month: NaiveDate) -> Decimal {
        self.override_for(month)
            .map(|o| o.amount)
            .unwrap_or(self.monthly_rent)
    }

    /// Upserts the override for `month`'s normalized key, replacing any
    /// existing amount and note.
    pub fn set_override(&mut self, month: NaiveDate, amount: Decimal, note: impl Into<String>) {
        self.monthly_rent_overrides.insert(
            first_of_month(month),
            RentOverride {
                amount,
                note: note.into(),
            },
        );
    }

    pub fn remove_override(&mut self, month: NaiveDate) -> Option<RentOverride> {
        self.monthly_rent_overrides.remove(&first_of_month(month))
    }

    /// Inserts after any existing payments on the same date.
    pub fn add_payment(&mut self, payment: Payment) {
        let idx = self.payments.partition_point(|p| p.date <= payment.date);
        self.payments.insert(idx, payment);
    }

    pub fn total_paid(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_override_lookup_normalizes_month() {
        let mut tenant = TenantRecord::new(ymd(2024, 1, 1), dec!(300), PaymentType::Full);
        tenant.set_override(ymd(2024, 3, 20), dec!(500), "repair");

        assert!(tenant.monthly_rent_overrides.contains_key(&ymd(2024, 3, 1)));
        assert_eq!(tenant.effective_rent(ymd(2024, 3, 31)), dec!(500));
        assert_eq!(tenant.effective_rent(ymd(2024, 4, 1)), dec!(300));
    }

    #[test]
    fn test_set_override_overwrites_note() {
        let mut tenant = TenantRecord::new(ymd(2024, 1, 1), dec!(300), PaymentType::Full);
        tenant.set_override(ymd(2024, 3, 1), dec!(500), "repair");
        tenant.set_override(ymd(2024, 3, 15), dec!(450), "");

        let o = tenant.override_for(ymd(2024, 3, 1)).unwrap();
        assert_eq!(o.amount, dec!(450));
        assert!(o.note.is_empty());
        assert_eq!(tenant.monthly_rent_overrides.len(), 1);
    }

    #[test]
    fn test_payments_stay_sorted_and_keep_duplicates() {
        let mut tenant = TenantRecord::new(ymd(2024, 1, 1), dec!(300), PaymentType::Full);
        tenant.add_payment(Payment {
            date: ymd(2024, 3, 5),
            amount: dec!(100),
        });
        tenant.add_payment(Payment {
            date: ymd(2024, 1, 5),
            amount: dec!(300),
        });
        tenant.add_payment(Payment {
            date: ymd(2024, 3, 5),
            amount: dec!(50),
        });

        let dates: Vec<_> = tenant.payments.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![ymd(2024, 1, 5), ymd(2024, 3, 5), ymd(2024, 3, 5)]);
        assert_eq!(tenant.payments[2].amount, dec!(50));
        assert_eq!(tenant.total_paid(), dec!(450));
    }
}

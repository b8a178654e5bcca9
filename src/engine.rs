use crate::error::{RentLedgerError, Result};
use crate::tenant::{Payment, PaymentType, TenantRecord};
use crate::utils::{
    days_in_month, first_of_month, month_label, month_starts_in_period, normalize_amount, same_month,
};
use chrono::{Datelike, Local, NaiveDate};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Which proration rule reduced a month's rent, and the day count it used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Proration {
    /// First month of a prorated lease: days from the start date to month end.
    StartOfLease { days: u32, days_in_month: u32 },
    /// Month of the contract end date: days up to and including the end date.
    EndOfContract { days: u32, days_in_month: u32 },
}

impl Proration {
    pub fn days(&self) -> u32 {
        match self {
            Self::StartOfLease { days, .. } | Self::EndOfContract { days, .. } => *days,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::StartOfLease { days, .. } => format!("prorated ({} days)", days),
            Self::EndOfContract { days, .. } => format!("contract end prorated ({} days)", days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCharge {
    pub month: NaiveDate,
    /// Override amount or base rent, before proration.
    pub base: Decimal,
    pub amount: Decimal,
    pub prorations: Vec<Proration>,
    /// Note from the month's override, when it has a non-empty one.
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub month: NaiveDate,
    pub label: String,
    pub rent_due: Decimal,
    pub paid: Decimal,
    pub payment_dates: Vec<NaiveDate>,
    /// Cumulative rent minus cumulative payments through this row.
    pub balance: Decimal,
    pub prorations: Vec<Proration>,
    pub note: Option<String>,
}

impl LedgerRow {
    /// Proration descriptions followed by the override note, comma separated.
    pub fn annotation(&self) -> String {
        let mut parts: Vec<String> = self.prorations.iter().map(Proration::describe).collect();
        if let Some(note) = &self.note {
            parts.push(note.clone());
        }
        parts.join(", ")
    }

    pub fn payment_dates_display(&self) -> String {
        self.payment_dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantLedger {
    pub rows: Vec<LedgerRow>,
    /// Payments whose month has no row (before the lease start or after the
    /// current month). They are not part of any row balance.
    pub unattributed_payments: Vec<Payment>,
}

impl TenantLedger {
    pub fn closing_balance(&self) -> Decimal {
        self.rows.last().map(|r| r.balance).unwrap_or(Decimal::ZERO)
    }

    pub fn total_rent_due(&self) -> Decimal {
        self.rows.iter().map(|r| r.rent_due).sum()
    }

    pub fn total_paid(&self) -> Decimal {
        self.rows.iter().map(|r| r.paid).sum()
    }

    pub fn unattributed_total(&self) -> Decimal {
        self.unattributed_payments.iter().map(|p| p.amount).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentIncrease {
    /// `amount` is a percentage of the month's current rent.
    Percentage,
    /// `amount` is added to the month's current rent.
    Flat,
}

/// Computes rent due, ledgers and balances for tenant records as of a fixed
/// date. Holds no tenant state; every call recomputes from the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEngine {
    as_of: NaiveDate,
}

impl LedgerEngine {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn current_month(&self) -> NaiveDate {
        first_of_month(self.as_of)
    }

    pub fn monthly_rent_due(&self, tenant: &TenantRecord, month: NaiveDate) -> Decimal {
        self.charge_for_month(tenant, month).amount
    }

    /// Rent due for `month` with the rules that produced it.
    ///
    /// When the lease starts and the contract ends in the same month, the end
    /// proration is applied to the already start-prorated amount.
    pub fn charge_for_month(&self, tenant: &TenantRecord, month: NaiveDate) -> MonthlyCharge {
        let month = first_of_month(month);
        let rent_override = tenant.override_for(month);
        let base = rent_override
            .map(|o| o.amount)
            .unwrap_or(tenant.monthly_rent);
        let note = rent_override
            .map(|o| o.note.clone())
            .filter(|n| !n.is_empty());

        let month_days = days_in_month(month);
        let mut amount = base;
        let mut prorations = Vec::new();

        if tenant.payment_type == PaymentType::Prorated && same_month(month, tenant.start_date) {
            let remaining_days = month_days - tenant.start_date.day() + 1;
            amount = amount * Decimal::from(remaining_days) / Decimal::from(month_days);
            prorations.push(Proration::StartOfLease {
                days: remaining_days,
                days_in_month: month_days,
            });
        }

        if let Some(end) = tenant.contract_end_date {
            if same_month(month, end) {
                let used_days = end.day();
                amount = amount * Decimal::from(used_days) / Decimal::from(month_days);
                prorations.push(Proration::EndOfContract {
                    days: used_days,
                    days_in_month: month_days,
                });
            }
        }

        MonthlyCharge {
            month,
            base,
            amount,
            prorations,
            note,
        }
    }

    /// Months the ledger covers: start month through the current month.
    pub fn ledger_months(&self, tenant: &TenantRecord) -> Vec<NaiveDate> {
        month_starts_in_period(tenant.start_date, self.as_of)
    }

    pub fn generate_ledger(&self, tenant: &TenantRecord) -> TenantLedger {
        let months = self.ledger_months(tenant);

        let mut row_index: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let mut rows: Vec<LedgerRow> = Vec::with_capacity(months.len());
        for (idx, month) in months.iter().enumerate() {
            let charge = self.charge_for_month(tenant, *month);
            row_index.insert(*month, idx);
            rows.push(LedgerRow {
                month: *month,
                label: month_label(*month),
                rent_due: charge.amount,
                paid: Decimal::ZERO,
                payment_dates: Vec::new(),
                balance: Decimal::ZERO,
                prorations: charge.prorations,
                note: charge.note,
            });
        }

        // Payments outside the row window are dropped from the rows.
        let mut unattributed_payments = Vec::new();
        for payment in &tenant.payments {
            match row_index.get(&first_of_month(payment.date)) {
                Some(&idx) => {
                    let row = &mut rows[idx];
                    row.paid += payment.amount;
                    row.payment_dates.push(payment.date);
                }
                None => unattributed_payments.push(payment.clone()),
            }
        }

        let mut cumulative_rent = Decimal::ZERO;
        let mut cumulative_paid = Decimal::ZERO;
        for row in &mut rows {
            cumulative_rent += row.rent_due;
            cumulative_paid += row.paid;
            row.balance = cumulative_rent - cumulative_paid;
        }

        if !unattributed_payments.is_empty() {
            warn!(
                "{} payment(s) fall outside the ledger window {} .. {} and are not shown in any row",
                unattributed_payments.len(),
                first_of_month(tenant.start_date),
                self.current_month()
            );
        }
        debug!("Generated ledger with {} rows as of {}", rows.len(), self.as_of);

        TenantLedger {
            rows,
            unattributed_payments,
        }
    }

    /// Rent due over the ledger months minus every recorded payment,
    /// including payments outside the ledger window.
    pub fn calculate_balance(&self, tenant: &TenantRecord) -> Decimal {
        let total_rent: Decimal = self
            .ledger_months(tenant)
            .into_iter()
            .map(|month| self.monthly_rent_due(tenant, month))
            .sum();

        total_rent - tenant.total_paid()
    }

    /// Writes an increased override for every month from `from_month` through
    /// the current month and returns how many months were written.
    ///
    /// Each month starts from its current effective rent, so repeating the
    /// call compounds on the previous result. New rents are rounded to cents
    /// and existing override notes are replaced with an empty note. If any
    /// month's new rent is out of range nothing is written.
    pub fn bulk_rent_increase(
        &self,
        tenant: &mut TenantRecord,
        from_month: NaiveDate,
        amount: Decimal,
        increase: RentIncrease,
    ) -> Result<usize> {
        let months = month_starts_in_period(from_month, self.as_of);

        let mut updates = Vec::with_capacity(months.len());
        for month in &months {
            let current = tenant.effective_rent(*month);
            let new_rent = match increase {
                RentIncrease::Percentage => (amount / Decimal::ONE_HUNDRED)
                    .checked_add(Decimal::ONE)
                    .and_then(|factor| current.checked_mul(factor)),
                RentIncrease::Flat => current.checked_add(amount),
            }
            .ok_or_else(|| {
                RentLedgerError::invalid(
                    "rent increase",
                    format!("{} overflows the rent of {}", amount, month.format("%Y-%m")),
                )
            })?;
            updates.push((*month, normalize_amount("increased rent", new_rent)?));
        }

        for (month, new_rent) in updates {
            tenant.set_override(month, new_rent, "");
        }

        debug!(
            "Applied {:?} increase of {} to {} month(s) from {}",
            increase,
            amount,
            months.len(),
            first_of_month(from_month)
        );
        Ok(months.len())
    }
}

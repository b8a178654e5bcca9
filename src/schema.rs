//! The durable record shape of a rental store.
//!
//! These types exist only at the load/save boundary. Legacy files may store
//! an override as a bare number; [`OverrideEntry`] accepts both shapes and the
//! conversion into [`TenantRecord`] folds them into one [`RentOverride`].

use crate::error::{RentLedgerError, Result};
use crate::tenant::{Payment, PaymentType, RentOverride, TenantRecord};
use crate::utils::{normalize_amount, parse_month_key};
use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type BuildingMap = BTreeMap<String, BTreeMap<String, TenantRecord>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(transparent)]
pub struct RentalData {
    #[schemars(description = "Building name mapped to its tenants, keyed by tenant name")]
    pub buildings: BTreeMap<String, BTreeMap<String, TenantEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TenantEntry {
    #[schemars(description = "Lease start date (YYYY-MM-DD). Rent accrues from this month.")]
    pub start_date: NaiveDate,

    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64", description = "Default monthly rent")]
    pub monthly_rent: Decimal,

    #[serde(default)]
    #[schemars(description = "'full' charges whole months; 'prorated' charges the first month by days occupied. Defaults to 'full'.")]
    pub payment_type: PaymentType,

    #[serde(default)]
    #[schemars(description = "Contract end date (YYYY-MM-DD). Absent or null for open-ended leases.")]
    pub contract_end_date: Option<NaiveDate>,

    #[serde(default)]
    pub payments: Vec<Payment>,

    #[serde(default)]
    #[schemars(description = "First-of-month date (YYYY-MM-01) mapped to either a bare amount or {amount, note}")]
    pub monthly_rent_overrides: BTreeMap<String, OverrideEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum OverrideEntry {
    Detailed {
        #[serde(with = "rust_decimal::serde::float")]
        #[schemars(with = "f64")]
        amount: Decimal,
        #[serde(default)]
        note: String,
    },
    /// Legacy shape: amount only, no note.
    Amount(
        #[serde(with = "rust_decimal::serde::float")]
        #[schemars(with = "f64")]
        Decimal,
    ),
}

impl From<OverrideEntry> for RentOverride {
    fn from(entry: OverrideEntry) -> Self {
        match entry {
            OverrideEntry::Detailed { amount, note } => RentOverride { amount, note },
            OverrideEntry::Amount(amount) => RentOverride {
                amount,
                note: String::new(),
            },
        }
    }
}

impl From<&RentOverride> for OverrideEntry {
    fn from(o: &RentOverride) -> Self {
        OverrideEntry::Detailed {
            amount: o.amount,
            note: o.note.clone(),
        }
    }
}

impl From<&TenantRecord> for TenantEntry {
    fn from(record: &TenantRecord) -> Self {
        Self {
            start_date: record.start_date,
            monthly_rent: record.monthly_rent,
            payment_type: record.payment_type,
            contract_end_date: record.contract_end_date,
            payments: record.payments.clone(),
            monthly_rent_overrides: record
                .monthly_rent_overrides
                .iter()
                .map(|(month, o)| (month.format("%Y-%m-%d").to_string(), o.into()))
                .collect(),
        }
    }
}

impl TryFrom<TenantEntry> for TenantRecord {
    type Error = RentLedgerError;

    fn try_from(entry: TenantEntry) -> Result<Self> {
        let mut overrides = BTreeMap::new();
        for (key, value) in entry.monthly_rent_overrides {
            let month = parse_month_key(&key)?;
            let mut rent_override = RentOverride::from(value);
            rent_override.amount = normalize_amount("override amount", rent_override.amount)?;
            if overrides.insert(month, rent_override).is_some() {
                warn!("Override key '{}' collides with another entry for {}; keeping the later one", key, month);
            }
        }

        let mut payments = Vec::with_capacity(entry.payments.len());
        for payment in entry.payments {
            payments.push(Payment {
                amount: normalize_amount("payment amount", payment.amount)?,
                date: payment.date,
            });
        }
        payments.sort_by_key(|p| p.date);

        Ok(TenantRecord {
            start_date: entry.start_date,
            monthly_rent: normalize_amount("monthly rent", entry.monthly_rent)?,
            payment_type: entry.payment_type,
            contract_end_date: entry.contract_end_date,
            monthly_rent_overrides: overrides,
            payments,
        })
    }
}

impl RentalData {
    pub fn from_buildings(buildings: &BuildingMap) -> Self {
        Self {
            buildings: buildings
                .iter()
                .map(|(building, tenants)| {
                    let entries = tenants
                        .iter()
                        .map(|(name, record)| (name.clone(), TenantEntry::from(record)))
                        .collect();
                    (building.clone(), entries)
                })
                .collect(),
        }
    }

    pub fn into_buildings(self) -> Result<BuildingMap> {
        let mut buildings = BTreeMap::new();
        for (building, tenants) in self.buildings {
            let mut records = BTreeMap::new();
            for (name, entry) in tenants {
                let record = TenantRecord::try_from(entry).map_err(|e| {
                    RentLedgerError::DataCorruption(format!("{} - {}: {}", building, name, e))
                })?;
                records.insert(name, record);
            }
            buildings.insert(building, records);
        }
        Ok(buildings)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RentalData)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

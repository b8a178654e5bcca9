use crate::engine::LedgerEngine;
use crate::store::RentalStore;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnpaidEntry {
    pub building: String,
    pub tenant: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BuildingSummary {
    pub tenant_count: usize,
    pub monthly_total: Decimal,
    pub unpaid_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub as_of: chrono::NaiveDate,
    pub total_tenants: usize,
    /// Sum of base monthly rents, ignoring overrides.
    pub monthly_total: Decimal,
    /// Sum of positive balances. Credits do not offset other tenants' debts.
    pub total_unpaid: Decimal,
    /// Tenants with a positive balance, largest first.
    pub unpaid: Vec<UnpaidEntry>,
    pub buildings: BTreeMap<String, BuildingSummary>,
}

impl PortfolioSummary {
    pub fn from_store(engine: &LedgerEngine, store: &RentalStore) -> Self {
        let mut total_tenants = 0;
        let mut monthly_total = Decimal::ZERO;
        let mut total_unpaid = Decimal::ZERO;
        let mut unpaid = Vec::new();
        let mut buildings: BTreeMap<String, BuildingSummary> = store
            .building_names()
            .map(|name| (name.to_string(), BuildingSummary::default()))
            .collect();

        for (building, name, tenant) in store.iter_tenants() {
            let balance = engine.calculate_balance(tenant);
            let entry = buildings.entry(building.to_string()).or_default();

            total_tenants += 1;
            monthly_total += tenant.monthly_rent;
            entry.tenant_count += 1;
            entry.monthly_total += tenant.monthly_rent;

            if balance > Decimal::ZERO {
                total_unpaid += balance;
                entry.unpaid_total += balance;
                unpaid.push(UnpaidEntry {
                    building: building.to_string(),
                    tenant: name.to_string(),
                    balance,
                });
            }
        }

        unpaid.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then_with(|| a.building.cmp(&b.building))
                .then_with(|| a.tenant.cmp(&b.tenant))
        });

        Self {
            as_of: engine.as_of(),
            total_tenants,
            monthly_total,
            total_unpaid,
            unpaid,
            buildings,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

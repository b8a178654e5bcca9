use crate::engine::{LedgerEngine, RentIncrease};
use crate::error::{RentLedgerError, Result};
use crate::schema::{BuildingMap, RentalData};
use crate::tenant::{Payment, PaymentType, RentOverride, TenantRecord};
use crate::utils::{add_years, first_of_month, normalize_amount, parse_amount, parse_date};
use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Editable lease terms of an existing tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantTerms {
    pub start_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub payment_type: PaymentType,
    pub contract_end_date: Option<NaiveDate>,
}

/// Buildings and their tenants. Every mutation validates its preconditions
/// before touching state, so a failed call leaves the store unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RentalStore {
    buildings: BuildingMap,
}

impl RentalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_buildings(buildings: BuildingMap) -> Self {
        Self { buildings }
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn building_names(&self) -> impl Iterator<Item = &str> {
        self.buildings.keys().map(String::as_str)
    }

    pub fn has_building(&self, building: &str) -> bool {
        self.buildings.contains_key(building)
    }

    pub fn tenants(&self, building: &str) -> Result<&BTreeMap<String, TenantRecord>> {
        self.buildings
            .get(building)
            .ok_or_else(|| RentLedgerError::building_not_found(building))
    }

    pub fn tenant(&self, building: &str, tenant: &str) -> Result<&TenantRecord> {
        self.tenants(building)?
            .get(tenant)
            .ok_or_else(|| RentLedgerError::tenant_not_found(building, tenant))
    }

    /// Every tenant as `(building, tenant, record)`, ordered by building then
    /// tenant name.
    pub fn iter_tenants(&self) -> impl Iterator<Item = (&str, &str, &TenantRecord)> {
        self.buildings.iter().flat_map(|(building, tenants)| {
            tenants
                .iter()
                .map(move |(name, record)| (building.as_str(), name.as_str(), record))
        })
    }

    pub fn tenant_count(&self) -> usize {
        self.buildings.values().map(BTreeMap::len).sum()
    }

    fn tenant_mut(&mut self, building: &str, tenant: &str) -> Result<&mut TenantRecord> {
        self.buildings
            .get_mut(building)
            .ok_or_else(|| RentLedgerError::building_not_found(building))?
            .get_mut(tenant)
            .ok_or_else(|| RentLedgerError::tenant_not_found(building, tenant))
    }

    // Buildings

    /// Inserts an empty building. Adding an existing building is a no-op.
    pub fn add_building(&mut self, name: &str) -> Result<()> {
        validate_name("building name", name)?;
        if !self.buildings.contains_key(name) {
            self.buildings.insert(name.to_string(), BTreeMap::new());
            debug!("Added building '{}'", name);
        }
        Ok(())
    }

    pub fn rename_building(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        validate_name("building name", new_name)?;
        if !self.buildings.contains_key(old_name) {
            return Err(RentLedgerError::building_not_found(old_name));
        }
        if old_name == new_name {
            return Ok(());
        }
        if self.buildings.contains_key(new_name) {
            return Err(RentLedgerError::AlreadyExists {
                what: "Building",
                context: new_name.to_string(),
            });
        }

        if let Some(tenants) = self.buildings.remove(old_name) {
            self.buildings.insert(new_name.to_string(), tenants);
        }
        debug!("Renamed building '{}' to '{}'", old_name, new_name);
        Ok(())
    }

    /// Removes a building and all of its tenants.
    pub fn remove_building(&mut self, name: &str) -> Result<BTreeMap<String, TenantRecord>> {
        let removed = self
            .buildings
            .remove(name)
            .ok_or_else(|| RentLedgerError::building_not_found(name))?;
        debug!("Removed building '{}' with {} tenant(s)", name, removed.len());
        Ok(removed)
    }

    // Tenants

    pub fn add_tenant(
        &mut self,
        building: &str,
        name: &str,
        start_date: NaiveDate,
        monthly_rent: Decimal,
        payment_type: PaymentType,
    ) -> Result<()> {
        validate_name("tenant name", name)?;
        let monthly_rent = validate_rent(monthly_rent)?;

        let tenants = self
            .buildings
            .get_mut(building)
            .ok_or_else(|| RentLedgerError::building_not_found(building))?;
        if tenants.contains_key(name) {
            return Err(RentLedgerError::AlreadyExists {
                what: "Tenant",
                context: format!("{} - {}", building, name),
            });
        }

        tenants.insert(
            name.to_string(),
            TenantRecord::new(start_date, monthly_rent, payment_type),
        );
        debug!("Added tenant '{}' to building '{}'", name, building);
        Ok(())
    }

    /// Removes a tenant; the building goes too if it becomes empty.
    pub fn remove_tenant(&mut self, building: &str, tenant: &str) -> Result<TenantRecord> {
        let tenants = self
            .buildings
            .get_mut(building)
            .ok_or_else(|| RentLedgerError::building_not_found(building))?;
        let record = tenants
            .remove(tenant)
            .ok_or_else(|| RentLedgerError::tenant_not_found(building, tenant))?;

        if tenants.is_empty() {
            self.buildings.remove(building);
            debug!("Removed empty building '{}'", building);
        }
        debug!("Removed tenant '{}' from building '{}'", tenant, building);
        Ok(record)
    }

    /// Moves and/or renames a tenant in one step. The target building is
    /// created when missing and the source building is removed if it ends up
    /// empty. On any error the store is left as it was.
    pub fn move_or_rename_tenant(
        &mut self,
        from_building: &str,
        from_tenant: &str,
        to_building: &str,
        to_tenant: &str,
    ) -> Result<()> {
        validate_name("building name", to_building)?;
        validate_name("tenant name", to_tenant)?;
        self.tenant(from_building, from_tenant)?;

        if from_building == to_building && from_tenant == to_tenant {
            return Ok(());
        }
        if self
            .buildings
            .get(to_building)
            .is_some_and(|tenants| tenants.contains_key(to_tenant))
        {
            return Err(RentLedgerError::AlreadyExists {
                what: "Tenant",
                context: format!("{} - {}", to_building, to_tenant),
            });
        }

        let record = self.remove_tenant(from_building, from_tenant)?;
        self.buildings
            .entry(to_building.to_string())
            .or_default()
            .insert(to_tenant.to_string(), record);

        info!(
            "Moved tenant '{} - {}' to '{} - {}'",
            from_building, from_tenant, to_building, to_tenant
        );
        Ok(())
    }

    pub fn update_tenant_terms(&mut self, building: &str, tenant: &str, terms: TenantTerms) -> Result<()> {
        let monthly_rent = validate_rent(terms.monthly_rent)?;
        let record = self.tenant_mut(building, tenant)?;

        record.start_date = terms.start_date;
        record.monthly_rent = monthly_rent;
        record.payment_type = terms.payment_type;
        record.contract_end_date = terms.contract_end_date;
        debug!("Updated terms of '{} - {}'", building, tenant);
        Ok(())
    }

    pub fn set_contract_end_date(
        &mut self,
        building: &str,
        tenant: &str,
        contract_end_date: Option<NaiveDate>,
    ) -> Result<()> {
        self.tenant_mut(building, tenant)?.contract_end_date = contract_end_date;
        Ok(())
    }

    /// Pushes an existing contract end date forward by whole years and
    /// returns the new end date.
    pub fn extend_contract(&mut self, building: &str, tenant: &str, years: u32) -> Result<NaiveDate> {
        if years == 0 {
            return Err(RentLedgerError::invalid(
                "extension years",
                "must be at least 1",
            ));
        }

        let record = self.tenant_mut(building, tenant)?;
        let current = record.contract_end_date.ok_or_else(|| {
            RentLedgerError::invalid(
                "contract end date",
                format!("{} - {} has no contract end date to extend", building, tenant),
            )
        })?;
        let extended = add_years(current, years).ok_or_else(|| {
            RentLedgerError::invalid("extension years", format!("{} years is out of range", years))
        })?;

        record.contract_end_date = Some(extended);
        info!(
            "Extended contract of '{} - {}' from {} to {}",
            building, tenant, current, extended
        );
        Ok(extended)
    }

    // Payments

    /// Records a payment from user-entered text. Negative amounts are accepted
    /// and reduce what has been paid.
    pub fn add_payment(&mut self, building: &str, tenant: &str, date: &str, amount: &str) -> Result<()> {
        self.tenant(building, tenant)?;
        let payment = Payment {
            date: parse_date("payment date", date)?,
            amount: parse_amount("payment amount", amount)?,
        };
        self.add_payment_record(building, tenant, payment)
    }

    pub fn add_payment_record(&mut self, building: &str, tenant: &str, payment: Payment) -> Result<()> {
        let payment = Payment {
            amount: normalize_amount("payment amount", payment.amount)?,
            ..payment
        };
        let record = self.tenant_mut(building, tenant)?;
        debug!(
            "Recorded payment of {} on {} for '{} - {}'",
            payment.amount, payment.date, building, tenant
        );
        record.add_payment(payment);
        Ok(())
    }

    /// Removes the payment at `index` in date order.
    pub fn remove_payment(&mut self, building: &str, tenant: &str, index: usize) -> Result<Payment> {
        let record = self.tenant_mut(building, tenant)?;
        if index >= record.payments.len() {
            return Err(RentLedgerError::NotFound {
                what: "Payment",
                context: format!("#{} of {} - {}", index, building, tenant),
            });
        }
        Ok(record.payments.remove(index))
    }

    /// Removes every payment and returns how many were removed.
    pub fn clear_payments(&mut self, building: &str, tenant: &str) -> Result<usize> {
        let record = self.tenant_mut(building, tenant)?;
        let removed = record.payments.len();
        record.payments.clear();
        debug!("Cleared {} payment(s) of '{} - {}'", removed, building, tenant);
        Ok(removed)
    }

    // Overrides

    pub fn set_override(
        &mut self,
        building: &str,
        tenant: &str,
        month: NaiveDate,
        amount: Decimal,
        note: &str,
    ) -> Result<()> {
        let amount = normalize_amount("override amount", amount)?;
        self.tenant_mut(building, tenant)?
            .set_override(month, amount, note);
        Ok(())
    }

    /// Fails with `NotFound` when the month has no override.
    pub fn remove_override(&mut self, building: &str, tenant: &str, month: NaiveDate) -> Result<RentOverride> {
        self.tenant_mut(building, tenant)?
            .remove_override(month)
            .ok_or_else(|| RentLedgerError::NotFound {
                what: "Rent override",
                context: format!(
                    "{} for {} - {}",
                    first_of_month(month).format("%Y-%m"),
                    building,
                    tenant
                ),
            })
    }

    pub fn bulk_rent_increase(
        &mut self,
        engine: &LedgerEngine,
        building: &str,
        tenant: &str,
        from_month: NaiveDate,
        amount: Decimal,
        increase: RentIncrease,
    ) -> Result<usize> {
        let record = self.tenant_mut(building, tenant)?;
        engine.bulk_rent_increase(record, from_month, amount, increase)
    }

    // Durable representation

    pub fn to_record(&self) -> RentalData {
        RentalData::from_buildings(&self.buildings)
    }

    pub fn from_record(data: RentalData) -> Result<Self> {
        Ok(Self::from_buildings(data.into_buildings()?))
    }

    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }

    pub fn deserialize(content: &str) -> Result<Self> {
        let data: RentalData = serde_json::from_str(content)
            .map_err(|e| RentLedgerError::DataCorruption(e.to_string()))?;
        Self::from_record(data)
    }
}

fn validate_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RentLedgerError::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn validate_rent(monthly_rent: Decimal) -> Result<Decimal> {
    let monthly_rent = normalize_amount("monthly rent", monthly_rent)?;
    if monthly_rent <= Decimal::ZERO {
        return Err(RentLedgerError::invalid(
            "monthly rent",
            format!("{} must be positive", monthly_rent),
        ));
    }
    Ok(monthly_rent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_store() -> RentalStore {
        let mut store = RentalStore::new();
        store.add_building("Maple Court").unwrap();
        store
            .add_tenant("Maple Court", "Lee", ymd(2024, 1, 15), dec!(310), PaymentType::Prorated)
            .unwrap();
        store
            .add_tenant("Maple Court", "Park", ymd(2023, 9, 1), dec!(450), PaymentType::Full)
            .unwrap();
        store
    }

    #[test]
    fn test_add_building_is_idempotent() {
        let mut store = sample_store();
        store.add_building("Maple Court").unwrap();
        assert_eq!(store.tenant_count(), 2);
        assert_eq!(store.building_names().count(), 1);
    }

    #[test]
    fn test_add_tenant_errors() {
        let mut store = sample_store();

        let err = store
            .add_tenant("Nowhere", "Kim", ymd(2024, 1, 1), dec!(300), PaymentType::Full)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = store
            .add_tenant("Maple Court", "Lee", ymd(2024, 1, 1), dec!(300), PaymentType::Full)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let err = store
            .add_tenant("Maple Court", "Kim", ymd(2024, 1, 1), dec!(0), PaymentType::Full)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_add_payment_parses_and_validates() {
        let mut store = sample_store();
        store
            .add_payment("Maple Court", "Lee", "2024-02-03", "310")
            .unwrap();
        store
            .add_payment("Maple Court", "Lee", "2024-01-20", "-15.5")
            .unwrap();

        let lee = store.tenant("Maple Court", "Lee").unwrap();
        assert_eq!(lee.payments[0].amount, dec!(-15.5));
        assert_eq!(lee.payments[1].date, ymd(2024, 2, 3));

        let err = store
            .add_payment("Maple Court", "Lee", "03/02/2024", "310")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = store
            .add_payment("Maple Court", "Lee", "2024-02-03", "three hundred")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = store
            .add_payment("Maple Court", "Ghost", "2024-02-03", "300")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(store.tenant("Maple Court", "Lee").unwrap().payments.len(), 2);
    }

    #[test]
    fn test_move_tenant_to_new_building_removes_empty_source() {
        let mut store = RentalStore::new();
        store.add_building("Old Block").unwrap();
        store
            .add_tenant("Old Block", "Choi", ymd(2024, 1, 1), dec!(300), PaymentType::Full)
            .unwrap();
        store
            .add_payment("Old Block", "Choi", "2024-01-05", "300")
            .unwrap();

        store
            .move_or_rename_tenant("Old Block", "Choi", "New Block", "Choi Family")
            .unwrap();

        assert!(!store.has_building("Old Block"));
        let moved = store.tenant("New Block", "Choi Family").unwrap();
        assert_eq!(moved.payments.len(), 1);
    }

    #[test]
    fn test_failed_move_leaves_state_untouched() {
        let mut store = sample_store();
        let before = store.clone();

        let err = store
            .move_or_rename_tenant("Maple Court", "Lee", "Maple Court", "Park")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(store, before);

        let err = store
            .move_or_rename_tenant("Maple Court", "Nobody", "Elm", "Nobody")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store, before);
    }

    #[test]
    fn test_remove_override_missing_is_not_found() {
        let mut store = sample_store();
        store
            .set_override("Maple Court", "Park", ymd(2024, 3, 12), dec!(500), "")
            .unwrap();

        let removed = store
            .remove_override("Maple Court", "Park", ymd(2024, 3, 28))
            .unwrap();
        assert_eq!(removed.amount, dec!(500));

        let err = store
            .remove_override("Maple Court", "Park", ymd(2024, 3, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_extend_contract() {
        let mut store = sample_store();
        let err = store.extend_contract("Maple Court", "Park", 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        store
            .set_contract_end_date("Maple Court", "Park", Some(ymd(2024, 8, 31)))
            .unwrap();
        let extended = store.extend_contract("Maple Court", "Park", 2).unwrap();
        assert_eq!(extended, ymd(2026, 8, 31));
    }

    #[test]
    fn test_remove_and_clear_payments() {
        let mut store = sample_store();
        store.add_payment("Maple Court", "Park", "2024-01-02", "450").unwrap();
        store.add_payment("Maple Court", "Park", "2024-02-02", "450").unwrap();

        let removed = store.remove_payment("Maple Court", "Park", 0).unwrap();
        assert_eq!(removed.date, ymd(2024, 1, 2));
        assert!(store.remove_payment("Maple Court", "Park", 5).is_err());

        assert_eq!(store.clear_payments("Maple Court", "Park").unwrap(), 1);
        assert!(store.tenant("Maple Court", "Park").unwrap().payments.is_empty());
    }

    #[test]
    fn test_rename_building() {
        let mut store = sample_store();
        store.add_building("Birch House").unwrap();

        let err = store.rename_building("Maple Court", "Birch House").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        store.rename_building("Maple Court", "Maple Towers").unwrap();
        assert!(store.tenant("Maple Towers", "Lee").is_ok());
        assert!(!store.has_building("Maple Court"));
    }

    #[test]
    fn test_remove_tenant_drops_empty_building() {
        let mut store = sample_store();
        store.remove_tenant("Maple Court", "Lee").unwrap();
        assert!(store.has_building("Maple Court"));
        store.remove_tenant("Maple Court", "Park").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_terms_validates_before_writing() {
        let mut store = sample_store();
        let before = store.clone();

        let bad = TenantTerms {
            start_date: ymd(2024, 2, 1),
            monthly_rent: dec!(0),
            payment_type: PaymentType::Full,
            contract_end_date: None,
        };
        let err = store.update_tenant_terms("Maple Court", "Lee", bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(store, before);

        let terms = TenantTerms {
            start_date: ymd(2024, 2, 1),
            monthly_rent: dec!(330),
            payment_type: PaymentType::Full,
            contract_end_date: Some(ymd(2025, 1, 31)),
        };
        store.update_tenant_terms("Maple Court", "Lee", terms).unwrap();
        let lee = store.tenant("Maple Court", "Lee").unwrap();
        assert_eq!(lee.monthly_rent, dec!(330));
        assert_eq!(lee.payment_type, PaymentType::Full);
        assert_eq!(lee.contract_end_date, Some(ymd(2025, 1, 31)));
    }

    #[test]
    fn test_remove_building_takes_its_tenants() {
        let mut store = sample_store();
        let removed = store.remove_building("Maple Court").unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.is_empty());
        assert_eq!(
            store.remove_building("Maple Court").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_deserialize_malformed_is_data_corruption() {
        let err = RentalStore::deserialize("{ not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataCorruption);
    }
}

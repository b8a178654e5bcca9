use crate::engine::{LedgerEngine, RentIncrease};
use crate::error::Result;
use crate::store::{RentalStore, TenantTerms};
use crate::tenant::{Payment, PaymentType};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An ordered list of store mutations applied as one unit.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommandBatch {
    #[serde(default)]
    pub commands: Vec<StoreCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StoreCommand {
    AddBuilding {
        name: String,
    },

    RenameBuilding {
        target: String,
        new_name: String,
    },

    /// Deletes the building together with its tenants.
    RemoveBuilding {
        target: String,
    },

    AddTenant {
        building: String,
        name: String,
        start_date: NaiveDate,
        #[serde(with = "rust_decimal::serde::float")]
        monthly_rent: Decimal,
        #[serde(default)]
        payment_type: PaymentType,
        #[serde(default)]
        contract_end_date: Option<NaiveDate>,
    },

    RemoveTenant {
        building: String,
        tenant: String,
    },

    /// Moves and/or renames a tenant.
    MoveTenant {
        building: String,
        tenant: String,
        new_building: String,
        new_name: String,
    },

    UpdateTerms {
        building: String,
        tenant: String,
        start_date: NaiveDate,
        #[serde(with = "rust_decimal::serde::float")]
        monthly_rent: Decimal,
        payment_type: PaymentType,
        #[serde(default)]
        contract_end_date: Option<NaiveDate>,
    },

    AddPayment {
        building: String,
        tenant: String,
        date: NaiveDate,
        #[serde(with = "rust_decimal::serde::float")]
        amount: Decimal,
    },

    /// Removes the payment at `index` in date order.
    RemovePayment {
        building: String,
        tenant: String,
        index: usize,
    },

    SetOverride {
        building: String,
        tenant: String,
        month: NaiveDate,
        #[serde(with = "rust_decimal::serde::float")]
        amount: Decimal,
        #[serde(default)]
        note: String,
    },

    RemoveOverride {
        building: String,
        tenant: String,
        month: NaiveDate,
    },

    BulkIncrease {
        building: String,
        tenant: String,
        from_month: NaiveDate,
        #[serde(with = "rust_decimal::serde::float")]
        amount: Decimal,
        increase: RentIncrease,
    },

    ExtendContract {
        building: String,
        tenant: String,
        years: u32,
    },
}

impl CommandBatch {
    pub fn new(commands: Vec<StoreCommand>) -> Self {
        Self { commands }
    }

    /// Applies every command to a copy of `base` and returns the copy. If any
    /// command fails the error is returned and `base` is untouched.
    pub fn apply(&self, engine: &LedgerEngine, base: &RentalStore) -> Result<RentalStore> {
        let mut store = base.clone();

        for (idx, command) in self.commands.iter().enumerate() {
            apply_single_command(engine, &mut store, command).map_err(|e| {
                debug!("Command #{} ({:?}) failed: {}", idx, command, e);
                e
            })?;
        }

        Ok(store)
    }
}

pub fn apply_single_command(engine: &LedgerEngine, store: &mut RentalStore, command: &StoreCommand) -> Result<()> {
    match command {
        StoreCommand::AddBuilding { name } => store.add_building(name),

        StoreCommand::RenameBuilding { target, new_name } => store.rename_building(target, new_name),

        StoreCommand::RemoveBuilding { target } => store.remove_building(target).map(|_| ()),

        StoreCommand::AddTenant {
            building,
            name,
            start_date,
            monthly_rent,
            payment_type,
            contract_end_date,
        } => {
            store.add_tenant(building, name, *start_date, *monthly_rent, *payment_type)?;
            if contract_end_date.is_some() {
                store.set_contract_end_date(building, name, *contract_end_date)?;
            }
            Ok(())
        }

        StoreCommand::RemoveTenant { building, tenant } => store.remove_tenant(building, tenant).map(|_| ()),

        StoreCommand::MoveTenant {
            building,
            tenant,
            new_building,
            new_name,
        } => store.move_or_rename_tenant(building, tenant, new_building, new_name),

        StoreCommand::UpdateTerms {
            building,
            tenant,
            start_date,
            monthly_rent,
            payment_type,
            contract_end_date,
        } => store.update_tenant_terms(
            building,
            tenant,
            TenantTerms {
                start_date: *start_date,
                monthly_rent: *monthly_rent,
                payment_type: *payment_type,
                contract_end_date: *contract_end_date,
            },
        ),

        StoreCommand::AddPayment {
            building,
            tenant,
            date,
            amount,
        } => store.add_payment_record(
            building,
            tenant,
            Payment {
                date: *date,
                amount: *amount,
            },
        ),

        StoreCommand::RemovePayment {
            building,
            tenant,
            index,
        } => store.remove_payment(building, tenant, *index).map(|_| ()),

        StoreCommand::SetOverride {
            building,
            tenant,
            month,
            amount,
            note,
        } => store.set_override(building, tenant, *month, *amount, note),

        StoreCommand::RemoveOverride {
            building,
            tenant,
            month,
        } => store.remove_override(building, tenant, *month).map(|_| ()),

        StoreCommand::BulkIncrease {
            building,
            tenant,
            from_month,
            amount,
            increase,
        } => store
            .bulk_rent_increase(engine, building, tenant, *from_month, *amount, *increase)
            .map(|_| ()),

        StoreCommand::ExtendContract {
            building,
            tenant,
            years,
        } => store.extend_contract(building, tenant, *years).map(|_| ()),
    }
}

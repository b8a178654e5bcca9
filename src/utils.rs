use crate::error::{RentLedgerError, Result};
use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places kept for every stored amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Largest magnitude accepted for a rent, override or payment. Sums and
/// prorations over any ledger stay far inside `Decimal`'s range, and every
/// stored amount has at most 12 significant digits.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Normalizes any date to the first day of its month. Every override key and
/// ledger row is addressed this way.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let year = if date.month() == 12 {
        date.year() + 1
    } else {
        date.year()
    };

    let month = if date.month() == 12 {
        1
    } else {
        date.month() + 1
    };

    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    next_month_start(first)
        .checked_sub_days(Days::new(1))
        .unwrap_or(first)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    last_day_of_month(date.year(), date.month()).day()
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// First-of-month dates from `start`'s month through `end`'s month, inclusive.
/// Empty when `start` falls in a later month than `end`.
pub fn month_starts_in_period(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();

    let last = first_of_month(end);
    let mut current = first_of_month(start);
    while current <= last {
        months.push(current);
        current = next_month_start(current);
    }

    months
}

/// Moves a date forward by whole years. Feb 29 lands on Feb 28 in non-leap years.
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(years.checked_mul(12)?))
}

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        RentLedgerError::invalid(
            field,
            format!("'{}' is not a valid date. Expected YYYY-MM-DD", value),
        )
    })
}

/// Parses a month key in `YYYY-MM` or `YYYY-MM-DD` form and normalizes it to
/// the first day of that month.
pub fn parse_month_key(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let parsed = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d"));

    parsed.map(first_of_month).map_err(|_| {
        RentLedgerError::invalid(
            "month",
            format!("'{}' is not a valid month. Expected YYYY-MM or YYYY-MM-DD", value),
        )
    })
}

/// Parses a monetary amount and normalizes it with [`normalize_amount`].
/// Any sign is accepted; callers decide whether negatives make sense for
/// their field.
pub fn parse_amount(field: &str, value: &str) -> Result<Decimal> {
    let trimmed = value.trim().replace(',', "");
    let amount = Decimal::from_str(&trimmed)
        .or_else(|_| Decimal::from_scientific(&trimmed))
        .map_err(|_| {
            RentLedgerError::invalid(field, format!("'{}' is not a valid amount", value))
        })?;
    normalize_amount(field, amount)
}

/// Rounds to cents (half away from zero) and rejects magnitudes above
/// [`MAX_AMOUNT`].
pub fn normalize_amount(field: &str, amount: Decimal) -> Result<Decimal> {
    check_amount(field, amount)?;
    Ok(amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

/// Rejects magnitudes above [`MAX_AMOUNT`] without rounding.
pub fn check_amount(field: &str, amount: Decimal) -> Result<()> {
    if amount.abs() > MAX_AMOUNT {
        return Err(RentLedgerError::invalid(
            field,
            format!("{} exceeds the maximum of {}", amount, MAX_AMOUNT),
        ));
    }
    Ok(())
}

pub fn month_label(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

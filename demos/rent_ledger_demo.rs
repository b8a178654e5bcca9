use chrono::NaiveDate;
use rent_ledger::*;
use rust_decimal_macros::dec;

fn main() -> anyhow::Result<()> {
    println!("🏢 Rent Ledger Demo\n");

    let mut store = RentalStore::new();
    store.add_building("Maple Court")?;
    store.add_tenant(
        "Maple Court",
        "Lee",
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        dec!(310),
        PaymentType::Prorated,
    )?;
    store.set_contract_end_date(
        "Maple Court",
        "Lee",
        Some(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()),
    )?;
    store.set_override(
        "Maple Court",
        "Lee",
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        dec!(280),
        "Heating outage discount",
    )?;
    store.add_payment("Maple Court", "Lee", "2024-01-20", "170")?;
    store.add_payment("Maple Court", "Lee", "2024-02-03", "310")?;
    store.add_payment("Maple Court", "Lee", "2024-04-01", "300")?;

    let engine = LedgerEngine::new(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    let lee = store.tenant("Maple Court", "Lee")?;
    let ledger = engine.generate_ledger(lee);

    println!("📋 Ledger for Maple Court - Lee:\n");
    println!(
        "  {:<16} {:>10} {:>10} {:>10}  {}",
        "Month", "Rent Due", "Paid", "Balance", "Notes"
    );
    for row in &ledger.rows {
        println!(
            "  {:<16} {:>10.2} {:>10.2} {:>10.2}  {}",
            row.label,
            row.rent_due,
            row.paid,
            row.balance,
            row.annotation()
        );
    }
    println!("\n  Outstanding balance: {:.2}", engine.calculate_balance(lee));

    let csv_path = std::env::temp_dir().join("rent_ledger_demo.csv");
    let mut writer = csv::Writer::from_path(&csv_path)?;
    writer.write_record(["Month", "Rent Due", "Paid", "Payment Dates", "Balance", "Notes"])?;
    for row in &ledger.rows {
        writer.write_record([
            row.label.clone(),
            format!("{:.2}", row.rent_due),
            format!("{:.2}", row.paid),
            row.payment_dates_display(),
            format!("{:.2}", row.balance),
            row.annotation(),
        ])?;
    }
    writer.flush()?;
    println!("\n💾 Exported ledger to {}", csv_path.display());

    let summary = PortfolioSummary::from_store(&engine, &store);
    println!("\n📊 Portfolio summary:\n{}", summary.to_json()?);

    Ok(())
}

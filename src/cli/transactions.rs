use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use crate::cli::open_repository;
use crate::error::{Result, SyncError};
use crate::fmt;
use crate::models::{Amount, Merchant, Transaction};
use crate::money::Money;
use crate::providers::csv::parse_date;
use crate::repository::Repository;
use crate::settings::Settings;

pub struct NewTransaction {
    pub reference: String,
    pub amount: String,
    pub currency: String,
    pub merchant: String,
    pub date: String,
    pub category: String,
    pub account: String,
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub fn list(settings: &Settings) -> Result<()> {
    let repo = open_repository(settings)?;
    let transactions = repo.get_transactions()?;
    if transactions.is_empty() {
        println!("No transactions found");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Source Account", "Reference", "Amount", "Merchant", "Date", "Lunch Money ID"]);
    for tx in &transactions {
        let id_cell = match tx.remote_id {
            0 => Cell::new("-").fg(Color::Yellow),
            id if id < 0 => Cell::new("excluded").fg(Color::DarkGrey),
            id => Cell::new(id),
        };
        table.add_row(vec![
            Cell::new(truncate(&tx.source_account_name, 20)),
            Cell::new(truncate(&tx.reference_number, 30)),
            Cell::new(fmt::amount(&tx.amount)),
            Cell::new(truncate(&tx.merchant.name, 30)),
            Cell::new(&tx.date),
            id_cell,
        ]);
    }
    println!("Found {} transactions\n{table}", transactions.len());
    Ok(())
}

pub fn add(settings: &Settings, new: NewTransaction) -> Result<()> {
    if new.reference.trim().is_empty() {
        return Err(SyncError::Other("reference number is required".into()));
    }
    Money::parse(&new.amount, &new.currency)?;
    let date = parse_date(&new.date)
        .ok_or_else(|| SyncError::Other(format!("Invalid date: {}", new.date)))?;

    let tx = Transaction {
        reference_number: new.reference.clone(),
        remote_id: 0,
        amount: Amount::new(new.amount, new.currency.to_uppercase()),
        merchant: Merchant {
            name: new.merchant,
            category_code: Some(new.category),
            ..Default::default()
        },
        posted_date: date.clone(),
        date,
        source_account_name: new.account,
    };

    let repo = open_repository(settings)?;
    repo.add_manual_transaction(&tx)?;
    println!("{} {}", "Added transaction".green(), new.reference);
    Ok(())
}

pub fn remove(settings: &Settings, reference: &str) -> Result<()> {
    let repo = open_repository(settings)?;
    repo.remove_transaction(reference)?;
    println!("Removed transaction {reference}");
    Ok(())
}

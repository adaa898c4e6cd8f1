use std::collections::HashMap;

use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use crate::cli::open_repository;
use crate::error::{Result, SyncError};
use crate::fmt;
use crate::lunchmoney::{LedgerClient, LunchMoneyClient};
use crate::models::SyncOptions;
use crate::repository::Repository;
use crate::settings::Settings;

fn flag_cell(enabled: bool) -> Cell {
    if enabled {
        Cell::new("yes").fg(Color::Green)
    } else {
        Cell::new("no").fg(Color::Red)
    }
}

pub fn list(settings: &Settings) -> Result<()> {
    let repo = open_repository(settings)?;
    let accounts = repo.get_accounts()?;
    if accounts.is_empty() {
        println!("No accounts found");
        return Ok(());
    }

    let client = LunchMoneyClient::from_settings(settings)?;
    let names: HashMap<i64, String> = client
        .list_accounts()?
        .into_iter()
        .map(|a| (a.id, a.label().to_string()))
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["LM ID", "Account Name", "Balance", "As Of", "Plaid", "Sync Trns", "Sync Balance"]);
    for account in &accounts {
        let name = names
            .get(&account.remote_id)
            .cloned()
            .unwrap_or_else(|| "(not in Lunch Money)".to_string());
        let as_of = account
            .balance_last_updated
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(account.remote_id),
            Cell::new(name),
            Cell::new(fmt::amount(&account.balance)),
            Cell::new(as_of),
            Cell::new(if account.is_plaid { "yes" } else { "" }),
            flag_cell(account.sync_options.contains(SyncOptions::TRANSACTIONS)),
            flag_cell(account.sync_options.contains(SyncOptions::BALANCE)),
        ]);
    }
    println!("Found {} accounts\n{table}", accounts.len());
    Ok(())
}

fn parse_option(option: &str) -> Result<SyncOptions> {
    SyncOptions::parse(option).ok_or_else(|| {
        SyncError::Other(format!(
            "Invalid sync option: {option}. Supported options are: transaction, balance, all"
        ))
    })
}

pub fn disable(settings: &Settings, option: &str, id: i64) -> Result<()> {
    let options = parse_option(option)?;
    let repo = open_repository(settings)?;
    repo.disable_sync_options(id, options)?;
    println!("{} {option} sync for account {id}", "Disabled".yellow());
    Ok(())
}

pub fn enable(settings: &Settings, option: &str, id: i64) -> Result<()> {
    let options = parse_option(option)?;
    let repo = open_repository(settings)?;
    repo.enable_sync_options(id, options)?;
    println!("{} {option} sync for account {id}", "Enabled".green());
    Ok(())
}

pub fn mappings(settings: &Settings) -> Result<()> {
    let repo = open_repository(settings)?;
    let mappings = repo.list_account_mappings()?;
    if mappings.is_empty() {
        println!("No account mappings yet");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Source Account", "LM ID", "Plaid"]);
    for m in &mappings {
        let target = if m.is_ignored() {
            Cell::new("ignored").fg(Color::DarkGrey)
        } else {
            Cell::new(m.remote_id)
        };
        table.add_row(vec![
            Cell::new(&m.external_name),
            target,
            Cell::new(if m.is_plaid { "yes" } else { "" }),
        ]);
    }
    println!("{table}");
    Ok(())
}

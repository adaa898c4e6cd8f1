use std::path::PathBuf;

use colored::Colorize;

use crate::cli::open_repository;
use crate::error::Result;
use crate::lunchmoney::LunchMoneyClient;
use crate::mapper::{AccountMapper, ConsoleSelector};
use crate::providers::{self, ProviderOptions};
use crate::settings::{shellexpand_path, Settings};

pub fn run(
    settings: &Settings,
    provider: &str,
    file: &str,
    account: &str,
    balance: Option<String>,
    currency: &str,
) -> Result<()> {
    let mut provider = providers::open(
        provider,
        ProviderOptions {
            file: PathBuf::from(shellexpand_path(file)),
            account: account.to_string(),
            currency: currency.to_string(),
            closing_balance: balance,
        },
    )?;

    let repo = open_repository(settings)?;
    let client = LunchMoneyClient::from_settings(settings)?;
    let selector = ConsoleSelector;
    let mapper = AccountMapper::new(&repo, &client, &selector);

    let report = providers::run_fetch(provider.as_mut(), &repo, &mapper)?;
    println!(
        "{} {} new, {} skipped, {} balances updated",
        format!("Fetched from {}:", provider.name()).bold(),
        report.inserted.to_string().green(),
        report.skipped,
        report.balances_updated,
    );
    Ok(())
}

use colored::Colorize;

use crate::balances::sync_balances;
use crate::cli::open_repository;
use crate::error::Result;
use crate::lunchmoney::LunchMoneyClient;
use crate::mapper::{AccountMapper, ConsoleSelector};
use crate::reconciler::Reconciler;
use crate::settings::Settings;

pub fn run(settings: &Settings, force: bool, window_days: Option<i64>, default_account: bool) -> Result<()> {
    let client = LunchMoneyClient::from_settings(settings)?;
    let repo = open_repository(settings)?;
    let selector = ConsoleSelector;
    let mut mapper = AccountMapper::new(&repo, &client, &selector);
    if default_account {
        mapper.select_default()?;
        if let Some(default) = mapper.default_account() {
            println!("Unmapped transactions will go to account {}", default.remote_id);
        }
    }

    let window_days = window_days.unwrap_or(settings.window_days);
    let report = Reconciler::new(&repo, &client, &mapper)
        .force(force)
        .sync_transactions(window_days)?;
    println!(
        "{} {} inserted, {} already synced, {} skipped ({} candidates of {} in the last {} days)",
        "Transactions:".bold(),
        report.inserted.to_string().green(),
        report.matched,
        report.skipped,
        report.candidates,
        report.considered,
        window_days,
    );

    let balances = sync_balances(&repo, &client)?;
    println!(
        "{} {} pushed, {} unchanged, {} skipped",
        "Balances:".bold(),
        balances.pushed.to_string().green(),
        balances.unchanged,
        balances.skipped,
    );
    Ok(())
}

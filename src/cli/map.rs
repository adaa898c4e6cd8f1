use crate::cli::open_repository;
use crate::error::Result;
use crate::lunchmoney::LunchMoneyClient;
use crate::mapper::{AccountMapper, ConsoleSelector};
use crate::settings::Settings;

pub fn run(settings: &Settings, external_name: &str) -> Result<()> {
    let repo = open_repository(settings)?;
    let client = LunchMoneyClient::from_settings(settings)?;
    let selector = ConsoleSelector;
    let mapper = AccountMapper::new(&repo, &client, &selector);

    let mapping = mapper.remap(external_name)?;
    if mapping.is_ignored() {
        println!("{external_name} will be ignored");
    } else {
        println!("{external_name} -> Lunch Money account {}", mapping.remote_id);
    }
    Ok(())
}

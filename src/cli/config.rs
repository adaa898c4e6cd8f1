use colored::Colorize;
use zeroize::Zeroizing;

use crate::error::{Result, SyncError};
use crate::settings::{masked_api_key, save_settings, settings_path, Settings, API_KEY_ENV};

pub fn show(settings: &Settings) -> Result<()> {
    println!("Current Configuration:");
    println!("----------------------");
    println!("Settings file:       {}", settings_path().display());
    println!("Data directory:      {}", settings.data_dir);
    println!("API base URL:        {}", settings.api_base_url);
    println!("Sync window (days):  {}", settings.window_days);
    println!("HTTP timeout (secs): {}", settings.http_timeout_secs);

    match settings.api_key() {
        Ok(key) => {
            let source = if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty()) {
                format!(" (from {API_KEY_ENV})")
            } else {
                String::new()
            };
            println!("Lunch Money API Key: {}{source}", masked_api_key(&key));
        }
        Err(_) => {
            println!("Lunch Money API Key: {}", "Not set".yellow());
            println!("\nRun `lunchsync config set-key` or set {API_KEY_ENV} to use the sync command.");
            println!("You can get your API key from https://my.lunchmoney.app/developers");
        }
    }
    Ok(())
}

pub fn set_key(settings: &mut Settings) -> Result<()> {
    let key = Zeroizing::new(rpassword::prompt_password("Lunch Money API key: ")?);
    let key = key.trim();
    if key.is_empty() {
        return Err(SyncError::Settings("API key cannot be empty".into()));
    }
    settings.lunch_money_api_key = key.to_string();
    save_settings(settings)?;
    println!("{} {}", "Saved API key".green(), masked_api_key(key));
    Ok(())
}

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::open_repository;
use crate::error::Result;
use crate::settings::{save_settings, settings_path, shellexpand_path, Settings};

pub fn run(settings: &mut Settings, data_dir: Option<String>) -> Result<()> {
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if !settings_path().exists() {
        println!("Data directory [{}]: ", settings.data_dir);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }

    save_settings(settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    open_repository(settings)?;

    println!("Initialized lunchsync at {}", resolved.display());
    if settings.api_key().is_err() {
        println!(
            "{}",
            "No Lunch Money API key yet; run `lunchsync config set-key`.".yellow()
        );
    }
    Ok(())
}

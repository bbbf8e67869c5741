use clap::Subcommand;
use pomocycle_core::{ConfigError, TimerConfiguration};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "work_duration_minutes", "custom_colors.work")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = TimerConfiguration::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(ConfigError::UnknownKey(key).into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = TimerConfiguration::load()?;
            config.set(&key, &value)?;
            config.save()?;
            tracing::info!(%key, "configuration saved");
            println!("ok");
        }
        ConfigAction::List => {
            print_json(&TimerConfiguration::load()?)?;
        }
        ConfigAction::Reset => {
            TimerConfiguration::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

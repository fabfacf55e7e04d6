use crate::display::{print_info, print_success};
use crate::{config::Config, ConfigCommands, Result};

/// Handles the `config` command for configuration management and inspection.
///
/// # Supported Operations
/// - **Show**: Display the configuration with the password masked
/// - **Path**: Print where the configuration file lives
/// - **Set**: Modify one `section.key` value and save atomically
/// - **Get**: Retrieve one `section.key` value
///
/// Values shown include environment overrides, but `set` only ever
/// persists what is in the file plus the changed key.
pub async fn handle(action: ConfigCommands, config: Config) -> Result<()> {
    match action {
        ConfigCommands::Show => handle_show(&config),
        ConfigCommands::Path => {
            println!("{}", config.config_path.display());
            Ok(())
        }
        ConfigCommands::Set { key, value } => handle_set(&key, &value, config),
        ConfigCommands::Get { key } => handle_get(&key, &config),
    }
}

fn handle_show(config: &Config) -> Result<()> {
    print_info(&format!(
        "Configuration file: {}",
        config.config_path.display()
    ));
    println!();
    println!("{}", config.show_config());
    Ok(())
}

fn handle_set(key: &str, value: &str, config: Config) -> Result<()> {
    // Reload without env overrides so they are not written to disk
    let mut on_disk = if config.config_path.exists() {
        Config::load_file(&config.config_path)?
    } else {
        Config {
            config_path: config.config_path,
            data: Default::default(),
        }
    };

    on_disk.set_value(key, value)?;
    on_disk.save()?;
    print_success(&format!("Set {}", key));
    Ok(())
}

fn handle_get(key: &str, config: &Config) -> Result<()> {
    match config.get_value(key)? {
        Some(value) => println!("{}", value),
        None => print_info(&format!("{} is not set", key)),
    }
    Ok(())
}

//! Config CLI commands.
//!
//! Commands for managing the Starshell configuration file.

use std::path::PathBuf;

use clap::Subcommand;

use crate::config::template::{create_config_file, generate_config_template};
use crate::config::{self, ConfigError, StarConfig, config_paths};
use crate::error::StarError;

/// Config management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Initialize a new configuration file with all options documented.
    ///
    /// Creates a new configuration file at the default location with all
    /// available options commented out.
    #[command(
        name = "init",
        after_long_help = r#"Examples:
  starshell config init              # Create config at default location
  starshell config init --force      # Overwrite existing config
  starshell config init --path ~/my-config.jsonc  # Create at custom path
  starshell config init --stdout     # Print template to stdout"#
    )]
    Init {
        /// Overwrite existing configuration file if it exists.
        #[arg(long, short)]
        force: bool,

        /// Custom path for the configuration file.
        /// If not specified, uses ~/.config/starshell/config.jsonc
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the configuration template to stdout instead of writing to a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Show the path to the configuration file.
    ///
    /// Displays the paths where Starshell looks for configuration files,
    /// and indicates which one is currently in use (if any).
    Path,

    /// Print the effective configuration as JSON.
    ///
    /// Missing options are filled in with their defaults.
    Show,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cmd: &ConfigCommands) -> Result<(), StarError> {
    match cmd {
        ConfigCommands::Init { force, path, stdout } => {
            if *stdout && path.is_some() {
                return Err(StarError::InvalidArguments(
                    "Cannot combine --stdout and --path".to_string(),
                ));
            }
            if *stdout {
                print_config_template()
            } else {
                init_config(*force, path.clone())
            }
        }
        ConfigCommands::Path => show_config_path(),
        ConfigCommands::Show => show_config(),
    }
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other CLI functions
fn print_config_template() -> Result<(), StarError> {
    println!("{}", generate_config_template());
    Ok(())
}

fn init_config(force: bool, custom_path: Option<PathBuf>) -> Result<(), StarError> {
    let config_path = custom_path.unwrap_or_else(|| {
        config_paths().into_iter().next().unwrap_or_else(|| PathBuf::from("config.jsonc"))
    });

    if config_path.exists() && !force {
        return Err(StarError::ConfigError(format!(
            "Configuration file already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        )));
    }

    create_config_file(&config_path).map_err(|e| {
        StarError::ConfigError(format!("Failed to create config file {}: {e}", config_path.display()))
    })?;

    println!("Configuration file created at: {}", config_path.display());
    println!("\nAll options are commented out by default.");
    println!("Edit the file and uncomment the options you want to configure.");

    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other CLI functions
fn show_config_path() -> Result<(), StarError> {
    println!("Configuration file search paths (in priority order):\n");

    let mut found_config = false;
    for (i, path) in config_paths().iter().enumerate() {
        let exists = path.exists();
        let marker = if exists && !found_config {
            found_config = true;
            " (active)"
        } else if exists {
            " (exists)"
        } else {
            ""
        };
        println!("  {}. {}{}", i + 1, path.display(), marker);
    }

    if !found_config {
        println!("\nNo configuration file found.");
        println!("Run 'starshell config init' to create one.");
    }

    Ok(())
}

/// Loads the configuration strictly: a malformed file is an error here, not a fallback.
fn effective_config() -> Result<StarConfig, StarError> {
    match config::load() {
        Ok((config, _)) => Ok(config),
        Err(ConfigError::NotFound) => Ok(StarConfig::default()),
        Err(err) => Err(err.into()),
    }
}

fn show_config() -> Result<(), StarError> {
    let config = effective_config()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

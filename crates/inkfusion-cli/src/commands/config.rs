use std::path::Path;

use inkfusion_core::config::{normalize_base_url, ClientConfig, ConfigOverrides};
use inkfusion_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{default_config_path, CliProfilesConfig};
use crate::error::CliError;

pub struct ProfileSettings {
    pub api_base_url: Option<String>,
    pub autosave_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            autosave_ms,
            timeout_secs,
            no_activate,
        } => {
            let path = default_config_path().map_err(CliError::Config)?;
            let settings = ProfileSettings {
                api_base_url,
                autosave_ms,
                timeout_secs,
            };
            let (profile_name, config) = run_config_init(
                &path,
                profile.as_deref().or(global_profile),
                settings,
                no_activate,
            )?;
            println!(
                "Profile '{}' initialized at {}",
                profile_name,
                path.display()
            );
            println!("API: {}", config.api_base_url);
            println!(
                "Sign in with `inkfusion auth login --profile {profile_name} --email <email> --password <password>`."
            );
            Ok(())
        }
        ConfigCommands::Show { profile, json } => {
            let path = default_config_path().map_err(CliError::Config)?;
            let (profile_name, config) =
                effective_config(&path, profile.as_deref().or(global_profile))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("profile:            {profile_name}");
                println!("config file:        {}", path.display());
                println!("api_base_url:       {}", config.api_base_url);
                println!("autosave_debounce:  {} ms", config.autosave_debounce_ms);
                println!("request_timeout:    {} s", config.request_timeout_secs);
            }
            Ok(())
        }
    }
}

/// Merge `settings` into the profile stored at `path` and save it.
///
/// Returns the profile name and the configuration it now resolves to.
pub fn run_config_init(
    path: &Path,
    profile_name: Option<&str>,
    settings: ProfileSettings,
    no_activate: bool,
) -> Result<(String, ClientConfig), CliError> {
    let mut config = CliProfilesConfig::load_from_path(path).map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(url) = normalize_text_option(settings.api_base_url) {
        profile.api_base_url = Some(normalize_base_url(&url)?);
    }
    if let Some(ms) = settings.autosave_ms {
        profile.autosave_debounce_ms = Some(ms);
    }
    if let Some(secs) = settings.timeout_secs {
        profile.request_timeout_secs = Some(secs);
    }

    let resolved = profile.to_client_config(ConfigOverrides::default())?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }
    config.save_to_path(path).map_err(CliError::Config)?;

    Ok((profile_name, resolved))
}

/// Profile file values, then `INKFUSION_*` variables, then defaults.
pub fn effective_config(
    path: &Path,
    profile_name: Option<&str>,
) -> Result<(String, ClientConfig), CliError> {
    let config = CliProfilesConfig::load_from_path(path).map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let resolved = profile.to_client_config(ConfigOverrides::from_env()?)?;
    Ok((profile_name, resolved))
}


//! CLI configuration: a thin layer over `stationflow_config` that folds in
//! `GlobalOpts` overrides (--api-url, --insecure, --timeout).

use std::time::Duration;

use stationflow_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use stationflow_config::{
    Config, Profile, SessionStore, config_path, load_config_or_default, save_config,
};

/// Resolve the active profile name from `--profile` and the config file.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    stationflow_config::active_profile_name(config, global.profile.as_deref())
}

/// Comma-separated profile names for error help text.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// The active profile, or a synthetic one when only `--api-url` was given.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    let mut profile = match config.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if global.api_url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(config),
                name,
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    Ok((name, profile))
}

/// Build the runtime client configuration. The push channel stays off
/// unless `live` is set: one-shot commands never need it.
pub fn client_config(
    global: &GlobalOpts,
    config: &Config,
    profile: &Profile,
    live: bool,
) -> Result<ClientConfig, CliError> {
    let mut client = stationflow_config::to_client_config(config, profile)?;
    if global.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        client.timeout = Duration::from_secs(secs);
    }
    client.push.enabled = live;
    Ok(client)
}

//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};
use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// A copy of `cfg` with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(MASK.into());
        }
    }
    cfg
}

/// TOML-like rendering for table output.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out, "\n[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out, "\n[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        let optional = [
            ("routing_url", p.routing_url.as_deref()),
            ("tile_url", p.tile_url.as_deref()),
            ("captcha_site_key", p.captcha_site_key.as_deref()),
            ("username", p.username.as_deref()),
            ("password", p.password.as_deref()),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                let _ = writeln!(out, "{key} = \"{value}\"");
            }
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
    }

    let map = &cfg.map;
    let _ = writeln!(out, "\n[map]");
    let _ = writeln!(out, "clustering = {}", map.clustering);
    let _ = writeln!(out, "disable_clustering_at_zoom = {}", map.disable_clustering_at_zoom);
    let _ = writeln!(out, "cluster_radius_px = {}", map.cluster_radius_px);
    let _ = writeln!(out, "popup_close_debounce_ms = {}", map.popup_close_debounce_ms);
    let _ = writeln!(out, "recenter_threshold_m = {}", map.recenter_threshold_m);
    let _ = writeln!(out, "route_refresh_threshold_m = {}", map.route_refresh_threshold_m);
    let _ = writeln!(out, "default_center = [{}, {}]", map.default_center[0], map.default_center[1]);
    let _ = writeln!(out, "default_zoom = {}", map.default_zoom);

    let mut types: Vec<_> = cfg.occupancy.iter().collect();
    types.sort_by(|a, b| a.0.cmp(b.0));
    for (name, rule) in types {
        let _ = writeln!(out, "\n[occupancy.{name}]");
        let _ = writeln!(out, "metric = \"{}\"", rule.metric);
        let _ = writeln!(out, "busy_at = {}", rule.busy_at);
        let _ = writeln!(out, "full_at = {}", rule.full_at);
    }

    out.trim_end().to_owned()
}

fn parse_bool(field: &str, value: &str) -> Result<bool, CliError> {
    value
        .parse()
        .map_err(|_| CliError::validation(field, "must be 'true' or 'false'"))
}

/// Apply `key = value` to a profile.
fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "api_url" | "api-url" => {
            url::Url::parse(&value).map_err(|e| CliError::validation("api_url", format!("invalid URL: {e}")))?;
            profile.api_url = value;
        }
        "routing_url" | "routing-url" => {
            url::Url::parse(&value).map_err(|e| CliError::validation("routing_url", format!("invalid URL: {e}")))?;
            profile.routing_url = Some(value);
        }
        "tile_url" | "tile-url" => profile.tile_url = Some(value),
        "captcha_site_key" | "captcha-site-key" => profile.captcha_site_key = Some(value),
        "username" => profile.username = Some(value),
        "timeout" => {
            profile.timeout = Some(
                value
                    .parse()
                    .map_err(|_| CliError::validation("timeout", "must be a number (seconds)"))?,
            );
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_bool("insecure", &value)?),
        other => {
            return Err(CliError::validation(
                other,
                format!(
                    "unknown config key '{other}'. Valid keys: api_url, routing_url, tile_url, \
                     captcha_site_key, username, timeout, ca_cert, insecure"
                ),
            ));
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(global.output, &cfg, format_config, |c| {
                c.default_profile.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(name.clone()).or_default();
            set_profile_value(profile, &key, value)?;
            config::save_config(&cfg)?;
            output::success(global, &format!("Set {key} on profile '{name}'"));
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: stationflow config init");
                return Ok(());
            }
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            for (name, profile) in &cfg.profiles {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}\t{}", profile.api_url);
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::success(global, &format!("Default profile set to '{name}'"));
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load_config_or_default();
            let name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::validation("password", "cannot be empty"));
            }
            stationflow_config::store_password(&name, &SecretString::from(secret))?;
            output::success(global, &format!("Password stored in the system keyring for profile '{name}'"));
            Ok(())
        }
    }
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_path();
    eprintln!("StationFlow configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    let mut cfg = config::load_config_or_default();

    let name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let api_url: String = Input::new()
        .with_prompt("API base URL")
        .default("http://localhost:8080/api".into())
        .validate_with(|input: &String| url::Url::parse(input).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(prompt_err)?;

    let username: String = Input::new()
        .with_prompt("Username (blank to skip)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        api_url,
        username: (!username.trim().is_empty()).then(|| username.trim().to_owned()),
        ..Profile::default()
    };

    if profile.username.is_some() {
        let choices = &[
            "Store the password in the system keyring (recommended)",
            "Save it to the config file (plaintext)",
            "Ask every time",
        ];
        let choice = Select::new()
            .with_prompt("Password")
            .items(choices)
            .default(0)
            .interact()
            .map_err(prompt_err)?;
        if choice < 2 {
            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::validation("password", "cannot be empty"));
            }
            if choice == 0 {
                stationflow_config::store_password(&name, &SecretString::from(secret))?;
                eprintln!("   Password stored in system keyring");
            } else {
                profile.password = Some(secret);
            }
        }
    }

    cfg.profiles.insert(name.clone(), profile);
    cfg.default_profile = Some(name.clone());
    config::save_config(&cfg)?;

    output::success(global, &format!("Configuration written to {}", path.display()));
    eprintln!("  Active profile: {name}");
    eprintln!("\n  Try it: stationflow stations list");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn redaction_masks_plaintext_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "local".into(),
            Profile {
                api_url: "http://localhost:8080/api".into(),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        let shown = format_config(&redacted(&cfg));
        assert!(shown.contains("password = \"****\""));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut profile = Profile::default();
        set_profile_value(&mut profile, "timeout", "12".into()).unwrap();
        assert_eq!(profile.timeout, Some(12));
        set_profile_value(&mut profile, "api-url", "http://10.0.0.2:8080/api".into()).unwrap();
        assert_eq!(profile.api_url, "http://10.0.0.2:8080/api");

        assert!(set_profile_value(&mut profile, "insecure", "maybe".into()).is_err());
        assert!(set_profile_value(&mut profile, "site", "x".into()).is_err());
    }
}

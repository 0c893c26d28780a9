//! Shared configuration for the StationFlow CLI and TUI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), the
//! persisted session, and translation to `stationflow_core::ClientConfig`.
//! Both binaries depend on this crate; the CLI layers its global flags on
//! top.

mod session;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stationflow_core::occupancy::OccupancyRule;
use stationflow_core::{ClientConfig, LatLng, MapConfig, OccupancyPolicy, TlsVerification, TransportType};

pub use session::SessionStore;

/// Keyring service name for every stored secret.
pub const KEYRING_SERVICE: &str = "stationflow";
/// Prefix of environment overrides (`STATIONFLOW_DEFAULTS__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "STATIONFLOW_";
pub const PASSWORD_ENV: &str = "STATIONFLOW_PASSWORD";
pub const USERNAME_ENV: &str = "STATIONFLOW_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file: {0}")]
    Session(String),

    #[error("keyring: {0}")]
    Keyring(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,

    #[serde(default)]
    pub map: MapSection,

    /// Per-type occupancy overrides, keyed by transport type name.
    #[serde(default)]
    pub occupancy: HashMap<String, OccupancyRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
            map: MapSection::default(),
            occupancy: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL (e.g., "http://localhost:8080/api").
    pub api_url: String,

    /// OSRM-compatible routing provider; the public demo server if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_site_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Plaintext password. Prefer the keyring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid certificates (self-signed dev backends).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
}

/// `[map]` section. Field defaults match `MapConfig::default()`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MapSection {
    pub clustering: bool,
    pub disable_clustering_at_zoom: u8,
    pub cluster_radius_px: u32,
    pub popup_close_debounce_ms: u64,
    pub recenter_threshold_m: f64,
    pub route_refresh_threshold_m: f64,
    /// `[lat, lng]`
    pub default_center: [f64; 2],
    pub default_zoom: u8,
}

impl Default for MapSection {
    fn default() -> Self {
        let map = MapConfig::default();
        Self {
            clustering: map.clustering,
            disable_clustering_at_zoom: map.disable_clustering_at_zoom,
            cluster_radius_px: map.cluster_radius_px,
            popup_close_debounce_ms: u64::try_from(map.popup_close_debounce.as_millis()).unwrap_or(200),
            recenter_threshold_m: map.recenter_threshold_m,
            route_refresh_threshold_m: map.route_refresh_threshold_m,
            default_center: [map.default_center.lat, map.default_center.lng],
            default_zoom: map.default_zoom,
        }
    }
}

impl MapSection {
    /// Overlay onto the renderer defaults.
    pub fn to_map_config(&self) -> Result<MapConfig, ConfigError> {
        let [lat, lng] = self.default_center;
        let center = LatLng::new(lat, lng);
        if !center.is_valid() {
            return Err(ConfigError::invalid("map.default_center", format!("{lat},{lng} is out of range")));
        }
        Ok(MapConfig {
            clustering: self.clustering,
            disable_clustering_at_zoom: self.disable_clustering_at_zoom,
            cluster_radius_px: self.cluster_radius_px,
            popup_close_debounce: Duration::from_millis(self.popup_close_debounce_ms),
            recenter_threshold_m: self.recenter_threshold_m,
            route_refresh_threshold_m: self.route_refresh_threshold_m,
            default_center: center,
            default_zoom: self.default_zoom,
            ..MapConfig::default()
        })
    }
}

/// Build the occupancy table from `[occupancy.<type>]` overrides.
pub fn occupancy_policy(overrides: &HashMap<String, OccupancyRule>) -> Result<OccupancyPolicy, ConfigError> {
    overrides.iter().try_fold(OccupancyPolicy::default(), |policy, (name, rule)| {
        let transport: TransportType = name
            .parse()
            .map_err(|_| ConfigError::invalid("occupancy", format!("unknown transport type '{name}'")))?;
        if rule.busy_at > rule.full_at || rule.full_at > 100 {
            return Err(ConfigError::invalid(
                "occupancy",
                format!("{name}: expected busy_at <= full_at <= 100"),
            ));
        }
        Ok(policy.with_rule(transport, *rule))
    })
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "stationflow", "stationflow")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where `session.json` lives.
pub fn session_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("session.json"),
        |dirs| dirs.data_dir().join("session.json"),
    )
}

/// Directory for TUI log files.
pub fn log_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".cache").join("logs"),
        |dirs| dirs.cache_dir().join("logs"),
    )
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("stationflow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path`, then `STATIONFLOW_*` env (nested keys split on
/// `__`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profiles ────────────────────────────────────────────────────────

/// Pick the profile name: explicit override, then `default_profile`,
/// then "default".
pub fn active_profile_name(cfg: &Config, requested: Option<&str>) -> String {
    requested
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

pub fn profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, ConfigError> {
    cfg.profiles.get(name).ok_or_else(|| {
        let known: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        ConfigError::invalid(
            "profile",
            if known.is_empty() {
                format!("'{name}' not found; run `stationflow config init`")
            } else {
                format!("'{name}' not found (known: {})", known.join(", "))
            },
        )
    })
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str, key: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{key}"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Env var, then keyring, then plaintext profile field.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    if let Ok(entry) = keyring_entry(profile_name, "password")
        && let Ok(pw) = entry.get_password()
    {
        return Ok(SecretString::from(pw));
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Save a password to the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "password")?
        .set_password(password.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse()
        .map_err(|e| ConfigError::invalid(field, format!("invalid URL '{raw}': {e}")))
}

/// Build a `ClientConfig` for `profile`, folding in `[defaults]`, `[map]`
/// and `[occupancy]`.
pub fn to_client_config(cfg: &Config, profile: &Profile) -> Result<ClientConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    let mut client = ClientConfig::new(api_url).map_err(|e| ConfigError::invalid("routing_url", e.to_string()))?;

    if let Some(ref routing) = profile.routing_url {
        client.routing_url = parse_url("routing_url", routing)?;
    }
    client.tile_url.clone_from(&profile.tile_url);
    client.captcha_site_key.clone_from(&profile.captcha_site_key);

    client.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    client.timeout = Duration::from_secs(profile.timeout.unwrap_or(cfg.defaults.timeout));
    client.map = cfg.map.to_map_config()?;
    client.occupancy = occupancy_policy(&cfg.occupancy)?;
    Ok(client)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stationflow_core::occupancy::OccupancyMetric;

    const SAMPLE: &str = r#"
default_profile = "local"

[defaults]
output = "json"

[profiles.local]
api_url = "http://localhost:8080/api"
username = "ayse"
insecure = true

[profiles.prod]
api_url = "https://stationflow.example.com/api"
routing_url = "https://osrm.example.com"
ca_cert = "/etc/ssl/sf.pem"
timeout = 5

[map]
clustering = false
default_zoom = 12

[occupancy.bus]
metric = "occupancy"
busy_at = 70
full_at = 95
"#;

    fn load(contents: &str) -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.map, MapSection::default());
    }

    #[test]
    fn profiles_and_sections_parse() {
        let cfg = load(SAMPLE);
        assert_eq!(active_profile_name(&cfg, None), "local");
        assert_eq!(active_profile_name(&cfg, Some("prod")), "prod");
        assert_eq!(cfg.defaults.output, "json");
        assert!(!cfg.map.clustering);
        assert_eq!(cfg.map.disable_clustering_at_zoom, 16);
        assert_eq!(cfg.occupancy["bus"].busy_at, 70);
    }

    #[test]
    fn client_config_folds_profile_and_sections() {
        let cfg = load(SAMPLE);
        let prod = profile(&cfg, "prod").unwrap();
        let client = to_client_config(&cfg, prod).unwrap();
        assert_eq!(client.api_url.as_str(), "https://stationflow.example.com/api");
        assert_eq!(client.routing_url.as_str(), "https://osrm.example.com/");
        assert_eq!(client.tls, TlsVerification::CustomCa("/etc/ssl/sf.pem".into()));
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.map.default_zoom, 12);
        assert!(!client.map.clustering);

        let bus = client.occupancy.rule(TransportType::Bus);
        assert_eq!((bus.metric, bus.busy_at, bus.full_at), (OccupancyMetric::Occupancy, 70, 95));
        assert_eq!(client.occupancy.rule(TransportType::Bike), OccupancyRule::VEHICLES);

        let local = to_client_config(&cfg, profile(&cfg, "local").unwrap()).unwrap();
        assert_eq!(local.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(local.timeout, Duration::from_secs(30));
    }

    #[test]
    fn unknown_profile_lists_known_ones() {
        let cfg = load(SAMPLE);
        let err = profile(&cfg, "staging").unwrap_err().to_string();
        assert!(err.contains("local, prod"), "{err}");
    }

    #[test]
    fn bad_occupancy_type_is_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("hovercraft".to_owned(), OccupancyRule::TRANSIT);
        assert!(matches!(occupancy_policy(&overrides), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn plaintext_password_is_last_resort() {
        let profile = Profile {
            api_url: "http://localhost".into(),
            password: Some("hunter22".into()),
            ..Profile::default()
        };
        // Env and keyring may be populated on a developer machine; only
        // assert that some password resolves.
        assert!(resolve_password(&profile, "sf-test-nonexistent-profile").is_ok());

        let empty = Profile {
            api_url: "http://localhost".into(),
            ..Profile::default()
        };
        if std::env::var(PASSWORD_ENV).is_err() {
            assert!(resolve_password(&empty, "sf-test-nonexistent-profile").is_err());
        }
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                api_url: "http://localhost:8080/api".into(),
                username: Some("mehmet".into()),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();
        let back = load_config_from(&path).unwrap();
        assert_eq!(back.profiles["default"].username.as_deref(), Some("mehmet"));
    }
}

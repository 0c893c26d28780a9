// ── Runtime client configuration ──
//
// These types describe *where* the backend lives and how the map behaves.
// They never touch disk: the CLI and TUI build a `ClientConfig` from the
// config crate and hand it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use stationflow_api::{DEFAULT_ROUTING_URL, ReconnectConfig, TlsMode, TransportConfig};

use crate::error::CoreError;
use crate::model::LatLng;
use crate::occupancy::OccupancyPolicy;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    CustomCa(PathBuf),
    /// Skip verification (self-signed development backends).
    DangerAcceptInvalid,
}

/// Push channel tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PushConfig {
    pub enabled: bool,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

/// Map renderer behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub clustering: bool,
    /// At or above this zoom every marker is shown individually.
    pub disable_clustering_at_zoom: u8,
    pub cluster_radius_px: u32,
    /// A popup close not followed by an open within this window deselects.
    pub popup_close_debounce: Duration,
    /// Selecting a station closer than this to the view center does not
    /// move the map.
    pub recenter_threshold_m: f64,
    /// Origin drift that triggers a new route request for an active route.
    pub route_refresh_threshold_m: f64,
    pub default_center: LatLng,
    pub default_zoom: u8,
    pub select_zoom: u8,
    pub user_fix_zoom: u8,
    pub fit_padding_px: u32,
    pub max_fit_zoom: u8,
    pub viewport_width_px: u32,
    pub viewport_height_px: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            clustering: true,
            disable_clustering_at_zoom: 16,
            cluster_radius_px: 80,
            popup_close_debounce: Duration::from_millis(200),
            recenter_threshold_m: 25.0,
            route_refresh_threshold_m: 25.0,
            default_center: LatLng::new(41.0082, 28.9784),
            default_zoom: 13,
            select_zoom: 16,
            user_fix_zoom: 14,
            fit_padding_px: 50,
            max_fit_zoom: 18,
            viewport_width_px: 1024,
            viewport_height_px: 768,
        }
    }
}

/// Everything needed to talk to one StationFlow deployment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL (e.g. `http://localhost:8080/api`).
    pub api_url: Url,
    pub routing_url: Url,
    pub tile_url: Option<String>,
    pub captcha_site_key: Option<String>,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub push: PushConfig,
    pub map: MapConfig,
    pub occupancy: OccupancyPolicy,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Result<Self, CoreError> {
        let routing_url = DEFAULT_ROUTING_URL.parse().map_err(|e| CoreError::Config {
            message: format!("invalid routing URL: {e}"),
        })?;
        Ok(Self {
            api_url,
            routing_url,
            tile_url: None,
            captcha_site_key: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            push: PushConfig::default(),
            map: MapConfig::default(),
            occupancy: OccupancyPolicy::default(),
        })
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: Some(self.timeout),
        }
    }

    pub fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: self.push.initial_delay,
            max_delay: self.push.max_delay,
            max_retries: self.push.max_retries,
        }
    }
}

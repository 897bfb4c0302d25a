//! Tracking configuration
//!
//! Loaded from YAML. Every key is optional, missing keys fall back to the
//! defaults below.

use std::fs;
use std::time::Duration;

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::tracking::gate::EtaWindow;
use crate::tracking::poller::DEFAULT_POLL_INTERVAL_MS;
use crate::tracking::trail::HISTORY_START;
use crate::{Coordinate, FieldsConfiguration, TrackingError, Viewport};

/// Config file name looked up in the working and home directories
pub const CONFIG_FILE: &str = ".loc2eta.yaml";

const DEFAULT_DESTINATION: Coordinate =
    Coordinate::from_valid(-74.03330326080321, 40.741859668270294);
const DEFAULT_CENTER: Coordinate = Coordinate::from_valid(-123.1187, 49.2819);

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Tracked device
    pub device_id: String,
    /// Tracker resource holding the device history
    pub tracker_name: String,
    /// Place index used by the place search
    pub place_index: String,
    /// Route calculator resource
    pub route_calculator: String,
    /// Topic the arrival notification is published to
    pub notification_topic: String,
    pub notification_message: String,
    pub poll_interval_ms: u64,
    pub eta_window: EtaWindow,
    pub destination: Coordinate,
    /// Lower bound of the fetched history
    #[serde(with = "time::serde::rfc3339")]
    pub history_start: OffsetDateTime,
    pub initial_viewport: Viewport,
    /// Zoom applied when the map follows the device
    pub tracking_zoom: f64,
    /// Zoom applied when the map jumps to a searched place
    pub search_zoom: f64,
    /// Field mapping of the record based position sources
    pub fields: FieldsConfiguration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            device_id: "eta_device124".to_string(),
            tracker_name: "amplify-tracker".to_string(),
            place_index: "casmir-amplify-index".to_string(),
            route_calculator: "amplify-calculator".to_string(),
            notification_topic: "eta-arrivals".to_string(),
            notification_message: "Estimated Arrival time is 5 mins".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            eta_window: EtaWindow::default(),
            destination: DEFAULT_DESTINATION,
            history_start: HISTORY_START,
            initial_viewport: Viewport::new(DEFAULT_CENTER, 10.0),
            tracking_zoom: 12.0,
            search_zoom: 10.0,
            fields: FieldsConfiguration::default(),
        }
    }
}

impl TrackingConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, TrackingError> {
        serde_yaml::from_str::<Self>(yaml).map_err(|e| TrackingError::Config(e.to_string()))
    }

    /// Load the first config found among the provided path,
    /// `./.loc2eta.yaml` and `~/.loc2eta.yaml`. Defaults when none exists.
    pub fn load(provided: Option<&str>) -> Result<Self, TrackingError> {
        let mut options = vec![];

        if let Some(sprovided) = provided {
            options.push(sprovided.to_string());
        }

        options.push(CONFIG_FILE.to_string());

        if let Some(home) = dirs::home_dir() {
            if let Some(shome) = home.to_str() {
                options.push(format!("{}/{}", shome, CONFIG_FILE));
            }
        }

        for fi in options {
            if let Ok(s) = fs::read_to_string(&fi) {
                info!(path = %fi, "Loading tracking config");
                let config = Self::from_yaml(&s)?;
                config.validate()?;
                return Ok(config);
            }
            debug!(path = %fi, "No config file here");
        }

        Ok(Self::default())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), TrackingError> {
        if self.device_id.trim().is_empty() {
            return Err(TrackingError::Config("device_id is empty".to_string()));
        }

        if self.poll_interval_ms == 0 {
            return Err(TrackingError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        let window = self.eta_window;
        if !window.lower_seconds.is_finite()
            || !window.upper_seconds.is_finite()
            || window.lower_seconds < 0.0
            || window.lower_seconds >= window.upper_seconds
        {
            return Err(TrackingError::Config(format!(
                "eta_window ({}, {}) is not a valid interval",
                window.lower_seconds, window.upper_seconds
            )));
        }

        for (name, zoom) in [
            ("initial_viewport.zoom", self.initial_viewport.zoom),
            ("tracking_zoom", self.tracking_zoom),
            ("search_zoom", self.search_zoom),
        ] {
            if !zoom.is_finite() || zoom < 0.0 {
                return Err(TrackingError::Config(format!("{} is invalid: {}", name, zoom)));
            }
        }

        Ok(())
    }
}

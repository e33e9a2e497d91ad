//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What closing a step popup means for the running tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Closing any step exits the tour.
    #[default]
    EndTour,
    /// Closing a step moves on to the next one; closing the last ends the tour.
    Advance,
}

impl std::str::FromStr for ClosePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "end_tour" | "endtour" | "end" => Ok(Self::EndTour),
            "advance" | "next" => Ok(Self::Advance),
            other => Err(ConfigError::InvalidValue {
                key: "GUIDED_TOUR_CLOSE_POLICY".to_string(),
                message: format!("expected end_tour or advance, got {other:?}"),
            }),
        }
    }
}

/// What a start signal does while another tour is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentStartPolicy {
    /// Ignore the new request and keep the active tour.
    #[default]
    Reject,
    /// Finish the active tour, then start the requested one.
    Replace,
}

/// Guided-tour engine configuration.
#[derive(Debug, Clone)]
pub struct TourConfig {
    /// Path of the JSON tour definition source.
    pub guides_path: PathBuf,
    /// Optional JSON table of localized strings (key -> text).
    pub resources_path: Option<PathBuf>,
    /// Name of the root container every anchor falls back to.
    pub root_element: String,
    /// Element the exit-tour callout is anchored to.
    pub status_region: String,
    /// Resource key of the exit-tour callout text.
    pub exit_tour_text_key: String,
    pub exit_tour_vertical_offset: f64,
    pub exit_tour_horizontal_offset: f64,
    /// Content width stamped on every survey step.
    pub survey_content_width: f64,
    /// Capacity of the broadcast channel backing the event bus.
    pub bus_capacity: usize,
    pub close_policy: ClosePolicy,
    pub concurrent_start: ConcurrentStartPolicy,
    /// Elements the console host exposes directly under the root.
    pub ui_elements: Vec<String>,
    /// Analytics opt-in reported by the console host's preference store.
    pub analytics_opt_in: bool,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            guides_path: PathBuf::from("guides.json"),
            resources_path: None,
            root_element: "mainWindow".to_string(),
            status_region: "statusBarPanel".to_string(),
            exit_tour_text_key: "ExitTourWindowContent".to_string(),
            exit_tour_vertical_offset: 30.0,
            exit_tour_horizontal_offset: 0.0,
            survey_content_width: 300.0,
            bus_capacity: 64,
            close_policy: ClosePolicy::default(),
            concurrent_start: ConcurrentStartPolicy::default(),
            ui_elements: Vec::new(),
            analytics_opt_in: false,
        }
    }
}

impl TourConfig {
    /// Build a config from `GUIDED_TOUR_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("GUIDED_TOUR_GUIDES") {
            config.guides_path = PathBuf::from(path);
        }
        config.resources_path = lookup("GUIDED_TOUR_RESOURCES").map(PathBuf::from);
        if let Some(root) = lookup("GUIDED_TOUR_ROOT") {
            config.root_element = root;
        }
        if let Some(region) = lookup("GUIDED_TOUR_STATUS_REGION") {
            config.status_region = region;
        }
        if let Some(capacity) = lookup("GUIDED_TOUR_BUS_CAPACITY") {
            config.bus_capacity = match capacity.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "GUIDED_TOUR_BUS_CAPACITY".to_string(),
                        message: format!("expected a positive integer, got {capacity:?}"),
                    });
                }
            };
        }
        if let Some(policy) = lookup("GUIDED_TOUR_CLOSE_POLICY") {
            config.close_policy = policy.parse()?;
        }
        if let Some(elements) = lookup("GUIDED_TOUR_UI_ELEMENTS") {
            config.ui_elements = elements
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(opt_in) = lookup("GUIDED_TOUR_ANALYTICS_OPT_IN") {
            config.analytics_opt_in = parse_flag("GUIDED_TOUR_ANALYTICS_OPT_IN", &opt_in)?;
        }

        Ok(config)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected true or false, got {other:?}"),
        }),
    }
}

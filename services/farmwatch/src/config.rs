//! Configuration types for the farmwatch service

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::history::default_charts;
use crate::widget::{Category, WidgetDescriptor, WidgetKind};
use crate::FarmwatchError;

pub const API_URL_ENV: &str = "FARMWATCH_API_URL";
pub const PASSWORD_ENV: &str = "FARMWATCH_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Extra or replacement widget descriptors, keyed by field name
    #[serde(default)]
    pub widgets: BTreeMap<String, WidgetConfig>,
}

/// Farm backend location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Where the session lives and optional startup credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding token and user; in-memory when absent
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl SessionConfig {
    /// Credentials for signing in at startup, if both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() => Some((email, password)),
            _ => None,
        }
    }
}

/// RTSP relay used by the camera page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_base_url")]
    pub relay_url: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            relay_url: default_base_url(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

/// Widget entry as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub title: String,
    #[serde(default)]
    pub unit: String,
    #[serde(flatten)]
    pub kind: WidgetKind,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub hidden: bool,
}

impl WidgetConfig {
    pub fn to_descriptor(&self, field: &str) -> WidgetDescriptor {
        WidgetDescriptor {
            field: field.to_string(),
            title: self.title.clone(),
            unit: self.unit.clone(),
            kind: self.kind.clone(),
            category: self.category,
            hidden: self.hidden,
        }
    }
}

impl Config {
    /// Override settings from `FARMWATCH_API_URL` and `FARMWATCH_PASSWORD`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            tracing::debug!("Using API URL from {}", API_URL_ENV);
            self.api.base_url = url;
        }
        if let Some(password) = lookup(PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.session.password = Some(password);
        }
    }

    /// Reject line chart widgets that no chart would plot
    pub fn validate(&self) -> crate::Result<()> {
        let charts = default_charts();
        for (field, widget) in &self.widgets {
            let WidgetKind::LineChart { chart } = &widget.kind else {
                continue;
            };
            let Some(definition) = charts.iter().find(|c| &c.id == chart) else {
                return Err(FarmwatchError::Config(format!(
                    "Widget {} refers to unknown chart {:?}",
                    field, chart
                )));
            };
            if !definition.lines.iter().any(|line| &line.key == field) {
                return Err(FarmwatchError::Config(format!(
                    "Widget {} is not plotted on chart {:?}",
                    field, chart
                )));
            }
        }
        Ok(())
    }

    pub fn widget_descriptors(&self) -> Vec<WidgetDescriptor> {
        self.widgets
            .iter()
            .map(|(field, widget)| widget.to_descriptor(field))
            .collect()
    }
}

fn default_base_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::FarmwatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

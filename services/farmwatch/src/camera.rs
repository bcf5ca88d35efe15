//! Camera viewer support: relay health and MJPEG stream URLs

use std::sync::Arc;

use serde::Serialize;

use crate::io::HttpClient;
use crate::FarmwatchError;

const INVALID_RTSP_URL: &str = "Please enter a valid RTSP URL.";
const RELAY_DISCONNECTED: &str =
    "Backend server is not connected. Please check your server configuration.";
/// Shown by the camera page when the stream image fails to load
pub const STREAM_LOAD_FAILED: &str =
    "Failed to load stream. Please check the RTSP URL, camera connectivity, and backend logs.";

/// Last known reachability of the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Checking,
    Connected,
    Disconnected,
}

impl BackendStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BackendStatus::Checking => "Checking...",
            BackendStatus::Connected => "Connected",
            BackendStatus::Disconnected => "Disconnected",
        }
    }
}

/// RTSP-to-MJPEG relay the camera page streams through
pub struct CameraRelay {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl CameraRelay {
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn check_backend(&self) -> BackendStatus {
        let url = format!("{}/", self.base_url);
        match self.http.get(&url, &[]).await {
            Ok(response) if response.is_success() => BackendStatus::Connected,
            Ok(response) => {
                tracing::debug!("Camera relay answered {}", response.status);
                BackendStatus::Disconnected
            }
            Err(e) => {
                tracing::debug!("Camera relay unreachable: {}", e);
                BackendStatus::Disconnected
            }
        }
    }

    /// URL of the MJPEG stream for `rtsp_url`
    pub fn stream_url(&self, rtsp_url: &str, status: BackendStatus) -> crate::Result<String> {
        if status != BackendStatus::Connected {
            return Err(FarmwatchError::Camera(RELAY_DISCONNECTED.to_string()));
        }
        if !rtsp_url.starts_with("rtsp://") {
            return Err(FarmwatchError::Camera(INVALID_RTSP_URL.to_string()));
        }

        let endpoint = format!("{}/camera/stream", self.base_url);
        let url = reqwest::Url::parse_with_params(&endpoint, &[("url", rtsp_url)])
            .map_err(|e| FarmwatchError::Camera(format!("Invalid relay URL {}: {}", endpoint, e)))?;
        tracing::debug!("Streaming {} via {}", rtsp_url, url);
        Ok(url.to_string())
    }
}

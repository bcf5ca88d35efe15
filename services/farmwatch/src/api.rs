//! Client for the farm backend: authentication and device data

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::io::{HttpClient, HttpResponse};
use crate::poller::TelemetrySource;
use crate::session::{AuthResponse, Session, User};
use crate::snapshot::DeviceSnapshot;
use crate::FarmwatchError;

const UNREACHABLE_BACKEND: &str =
    "Unable to connect to server. Please check if the backend is running.";

/// Error body shapes the backend uses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetRequestResponse {
    reset_token: String,
}

/// Backend API client bound to a session
pub struct ApiClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
    session: Arc<Session>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>, session: Arc<Session>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created ApiClient for {}", base_url);
        Self {
            base_url,
            http,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn login(&self, email: &str, password: &str) -> crate::Result<User> {
        tracing::debug!("Logging in {}", email);
        let body = json!({ "email": email, "password": password });
        let response = self.post("/auth/login", &body).await?;
        let auth = self.expect_success::<AuthResponse>(response, "Failed to login")?;
        self.session.establish(&auth)?;
        Ok(auth.user)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        device_id: &str,
    ) -> crate::Result<User> {
        if device_id.trim().is_empty() {
            return Err(FarmwatchError::Validation(
                "Device ID is required".to_string(),
            ));
        }
        tracing::debug!("Registering {} for device {}", email, device_id);
        let body = json!({ "email": email, "password": password, "deviceId": device_id });
        let response = match self.post("/auth/register", &body).await {
            Err(FarmwatchError::Http(e)) => {
                tracing::warn!("Registration request failed: {}", e);
                return Err(FarmwatchError::Http(UNREACHABLE_BACKEND.to_string()));
            }
            other => other?,
        };
        let auth = self.expect_success::<AuthResponse>(response, "Failed to register")?;
        self.session.establish(&auth)?;
        Ok(auth.user)
    }

    /// Ask the backend to start a password reset, returning the reset token
    pub async fn request_password_reset(&self, email: &str) -> crate::Result<String> {
        let response = self
            .post("/auth/request-reset", &json!({ "email": email }))
            .await?;
        let parsed = self.expect_success::<ResetRequestResponse>(
            response,
            "Failed to send reset instructions",
        )?;
        Ok(parsed.reset_token)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> crate::Result<()> {
        let response = self
            .post(
                "/auth/reset-password",
                &json!({ "token": token, "newPassword": new_password }),
            )
            .await?;
        self.check_status(&response, "Failed to reset password")
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    /// Fetch the latest snapshot for a device
    pub async fn get_device_data(&self, device_id: &str) -> crate::Result<DeviceSnapshot> {
        let url = format!("{}/api/device-data/{}", self.base_url, device_id);
        let bearer = self.bearer();
        let headers: Vec<(&str, &str)> = bearer
            .as_deref()
            .map(|b| vec![("Authorization", b)])
            .unwrap_or_default();

        let response = self.http.get(&url, &headers).await?;
        self.check_status(&response, "Failed to fetch device data")?;
        DeviceSnapshot::from_json(&response.body)
    }

    fn bearer(&self) -> Option<String> {
        self.session.token().map(|t| format!("Bearer {}", t))
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> crate::Result<HttpResponse> {
        let url = format!("{}{}", self.base_url, path);
        let bearer = self.bearer();
        let headers: Vec<(&str, &str)> = bearer
            .as_deref()
            .map(|b| vec![("Authorization", b)])
            .unwrap_or_default();
        self.http
            .post_json(&url, &headers, &body.to_string())
            .await
    }

    /// Map non-2xx responses to errors; a 401 on a signed-in request also
    /// ends the session
    fn check_status(&self, response: &HttpResponse, fallback: &str) -> crate::Result<()> {
        if response.is_success() {
            return Ok(());
        }
        if response.status == 401 && self.session.is_authenticated() {
            self.session.expire();
            return Err(FarmwatchError::Unauthorized);
        }
        Err(FarmwatchError::Api {
            status: response.status,
            message: error_message(&response.body).unwrap_or_else(|| fallback.to_string()),
        })
    }

    fn expect_success<T: serde::de::DeserializeOwned>(
        &self,
        response: HttpResponse,
        fallback: &str,
    ) -> crate::Result<T> {
        self.check_status(&response, fallback)?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

fn error_message(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    parsed.error.or(parsed.message).filter(|m| !m.is_empty())
}

#[async_trait]
impl TelemetrySource for ApiClient {
    async fn fetch(&self, device_id: &str) -> crate::Result<DeviceSnapshot> {
        self.get_device_data(device_id).await
    }
}

//! BDD test world for farmwatch service

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use cucumber::World;
use serde_json::json;
use tower::ServiceExt;

use farmwatch::api::ApiClient;
use farmwatch::camera::CameraRelay;
use farmwatch::dashboard::{build_router, DashboardState};
use farmwatch::history::default_charts;
use farmwatch::io::{HttpClient, HttpResponse};
use farmwatch::session::Session;
use farmwatch::state::{new_state_handle, StateHandle};
use farmwatch::store::MemoryStore;
use farmwatch::widget::WidgetRegistry;
use farmwatch::FarmwatchError;

/// Scriptable stand-in for the farm backend and camera relay
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub accounts: Mutex<HashMap<String, String>>,
    pub login_error: Mutex<Option<String>>,
    pub device_data: Mutex<Option<(u16, String)>>,
    pub unreachable: Mutex<bool>,
}

impl FakeBackend {
    fn respond(status: u16, body: serde_json::Value) -> farmwatch::Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }
}

#[async_trait]
impl HttpClient for FakeBackend {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> farmwatch::Result<HttpResponse> {
        if *self.unreachable.lock().unwrap() {
            return Err(FarmwatchError::Http(format!("GET {} failed: refused", url)));
        }
        if url.contains("/api/device-data/") {
            let data = self.device_data.lock().unwrap().clone();
            return match data {
                Some((status, body)) => Ok(HttpResponse { status, body }),
                None => Self::respond(404, json!({ "error": "Device not found" })),
            };
        }
        Self::respond(200, json!({ "status": "ok" }))
    }

    async fn post_json(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        body: &str,
    ) -> farmwatch::Result<HttpResponse> {
        if *self.unreachable.lock().unwrap() {
            return Err(FarmwatchError::Http(format!("POST {} failed: refused", url)));
        }
        let request: serde_json::Value = serde_json::from_str(body)?;
        if url.ends_with("/auth/login") {
            if let Some(error) = self.login_error.lock().unwrap().clone() {
                return Self::respond(401, json!({ "error": error }));
            }
            let email = request["email"].as_str().unwrap_or_default().to_string();
            let device_id = self.accounts.lock().unwrap().get(&email).cloned();
            return match device_id {
                Some(device_id) => Self::respond(
                    200,
                    json!({
                        "user": { "id": "u1", "email": email, "device_id": device_id },
                        "token": "token-1"
                    }),
                ),
                None => Self::respond(401, json!({ "error": "Invalid credentials" })),
            };
        }
        Self::respond(404, json!({ "error": "Not found" }))
    }
}

#[derive(Debug, Default, World)]
pub struct FarmwatchWorld {
    pub backend: Option<Arc<FakeBackend>>,
    pub store: Option<Arc<MemoryStore>>,
    pub api: Option<Arc<ApiClient>>,
    pub telemetry: Option<StateHandle>,
    pub poll_seq: u64,

    pub response_status: Option<u16>,
    pub response_location: Option<String>,
    pub response_body: Option<String>,
}

impl FarmwatchWorld {
    /// Wire a fresh signed-out service against `backend`
    pub fn connect(&mut self, backend: FakeBackend) {
        let backend = Arc::new(backend);
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(Session::restore(store.clone()));
        let http: Arc<dyn HttpClient> = backend.clone();
        self.api = Some(Arc::new(ApiClient::new(
            "http://farm.test:5001",
            http,
            session,
        )));
        self.backend = Some(backend);
        self.store = Some(store);
        self.telemetry = Some(new_state_handle());
    }

    pub fn backend(&self) -> &FakeBackend {
        self.backend.as_ref().expect("backend not set")
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        self.api.as_ref().expect("service not connected")
    }

    pub fn telemetry(&self) -> &StateHandle {
        self.telemetry.as_ref().expect("service not connected")
    }

    fn dashboard_state(&self) -> DashboardState {
        let http: Arc<dyn HttpClient> = self.backend.clone().expect("backend not set");
        DashboardState {
            telemetry: self.telemetry().clone(),
            api: self.api().clone(),
            registry: Arc::new(WidgetRegistry::farm_defaults()),
            charts: Arc::new(default_charts()),
            camera: Arc::new(CameraRelay::new("http://relay.test:5001", http)),
        }
    }

    /// Send a request through the dashboard router and keep the response
    pub async fn request(&mut self, method: &str, uri: &str, form: Option<&str>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if form.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        }
        let request = builder
            .body(Body::from(form.unwrap_or_default().to_string()))
            .unwrap();

        let response = build_router(self.dashboard_state())
            .oneshot(request)
            .await
            .unwrap();

        self.response_status = Some(response.status().as_u16());
        self.response_location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        self.response_body = Some(String::from_utf8(body.to_vec()).unwrap());
    }

    pub fn body(&self) -> &str {
        self.response_body.as_deref().expect("no response body")
    }
}

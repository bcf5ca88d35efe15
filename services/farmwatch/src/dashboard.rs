//! Web dashboard: server-rendered pages for the signed-in grower plus JSON
//! endpoints for the latest snapshot, widgets, chart history and poll status

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::api::ApiClient;
use crate::camera::{BackendStatus, CameraRelay, STREAM_LOAD_FAILED};
use crate::dispatch::{dispatch, GaugeArc, RenderInstruction};
use crate::history::{series, tick_labels, ChartDefinition, ChartHistory};
use crate::state::StateHandle;
use crate::widget::WidgetRegistry;
use crate::FarmwatchError;

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub telemetry: StateHandle,
    pub api: Arc<ApiClient>,
    pub registry: Arc<WidgetRegistry>,
    pub charts: Arc<Vec<ChartDefinition>>,
    pub camera: Arc<CameraRelay>,
}

/// Build the dashboard axum router
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/login", get(login_page).post(login_submit))
        .route("/register", get(register_page).post(register_submit))
        .route(
            "/forgot-password",
            get(forgot_password_page).post(forgot_password_submit),
        )
        .route(
            "/reset-password/{token}",
            get(reset_password_page).post(reset_password_submit),
        )
        .route("/logout", post(logout_handler))
        .route("/farmcam", get(farmcam_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/widgets", get(widgets_handler))
        .route("/api/history", get(history_handler))
        .route("/api/charts", get(charts_handler))
        .route("/api/status", get(status_handler))
        .route("/api/toggle/{field}", post(toggle_handler))
        .route("/health", get(health_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .with_state(state)
}

/// Serve the dashboard on `addr` until `cancel` fires
pub async fn serve(
    state: DashboardState,
    addr: SocketAddr,
    cancel: CancellationToken,
) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::debug!("Dashboard stopped");
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CameraQuery {
    #[serde(default)]
    pub url: Option<String>,
}

/// Inline feedback on a form page
enum Notice<'a> {
    None,
    Error(&'a str),
    Info(&'a str),
}

async fn index_handler(State(dashboard): State<DashboardState>) -> Redirect {
    if dashboard.api.session().is_authenticated() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

async fn dashboard_handler(State(dashboard): State<DashboardState>) -> Response {
    let session = dashboard.api.session().snapshot();
    if session.token.is_none() {
        return Redirect::to("/login").into_response();
    }
    let device_id = session.device_id().unwrap_or_default().to_string();
    let email = session.user.as_ref().map(|u| u.email.clone()).unwrap_or_default();

    let telemetry = dashboard.telemetry.read().await;
    let content = match &telemetry.latest {
        None => r#"<p class="loading">Loading device data...</p>"#.to_string(),
        Some(snapshot) => {
            let cards: String = dispatch(snapshot, &dashboard.registry)
                .iter()
                .map(render_card)
                .collect();
            let charts: String = dashboard
                .charts
                .iter()
                .map(|chart| render_chart(chart, &telemetry.history))
                .collect();
            format!(
                r#"<section class="grid">{cards}</section>
    <section class="charts">{charts}</section>"#
            )
        }
    };
    drop(telemetry);

    let now = chrono::Local::now();
    let body = format!(
        r#"<header>
        <h1>Farm Dashboard</h1>
        <span class="device">Device: {device}</span>
        <span class="user">{email}</span>
        <span>{date}</span>
        <span>{time}</span>
        <a href="/farmcam">Camera</a>
        <form method="post" action="/logout"><button type="submit">Logout</button></form>
    </header>
    {content}
    <script>setInterval(() => location.reload(), 10000);</script>"#,
        device = escape_html(&device_id),
        email = escape_html(&email),
        date = now.format("%d %b %Y"),
        time = now.format("%H:%M"),
    );
    page("Farm Dashboard", &body).into_response()
}

fn render_card(instruction: &RenderInstruction) -> String {
    match instruction {
        RenderInstruction::StatCard {
            field,
            title,
            value,
            unit,
        } => format!(
            r#"<div class="card stat" data-field="{}"><h3>{}</h3><p class="value">{} <span class="unit">{}</span></p></div>"#,
            escape_html(field),
            escape_html(title),
            escape_html(value),
            escape_html(unit)
        ),
        RenderInstruction::Toggle { field, label, on } => {
            let (class, text) = if *on { ("on", "ON") } else { ("off", "OFF") };
            format!(
                r#"<div class="card toggle" data-field="{}"><h3>{}</h3><span class="switch {}">{}</span></div>"#,
                escape_html(field),
                escape_html(label),
                class,
                text
            )
        }
        RenderInstruction::Gauge {
            field,
            title,
            value,
            percentage,
            unit,
        } => {
            let arc = GaugeArc::for_percentage(*percentage);
            let size = arc.radius * 2.0;
            format!(
                r##"<div class="card gauge" data-field="{field}"><h3>{title}</h3>
<svg width="{size}" height="{size}" viewBox="0 0 {size} {size}">
<circle cx="{r}" cy="{r}" r="{nr:.1}" fill="none" stroke="#e5e7eb" stroke-width="{sw}"/>
<circle cx="{r}" cy="{r}" r="{nr:.1}" fill="none" stroke="#22c55e" stroke-width="{sw}" stroke-dasharray="{c:.2}" stroke-dashoffset="{o:.2}" transform="rotate(-90 {r} {r})"/>
<text x="{r}" y="{r}" text-anchor="middle" dominant-baseline="middle">{value}{unit}</text>
</svg></div>"##,
                field = escape_html(field),
                title = escape_html(title),
                size = size,
                r = arc.radius,
                nr = arc.normalized_radius(),
                sw = arc.stroke_width,
                c = arc.circumference,
                o = arc.dash_offset,
                value = crate::snapshot::format_number(*value),
                unit = escape_html(unit),
            )
        }
        RenderInstruction::Charted { .. } => String::new(),
        RenderInstruction::Mismatch {
            field,
            title,
            expected,
            value,
        } => format!(
            r#"<div class="card mismatch" data-field="{}"><h3>{}</h3><p class="value">{}</p><p class="hint">expected {}</p></div>"#,
            escape_html(field),
            escape_html(title),
            escape_html(value),
            expected
        ),
        RenderInstruction::Fallback {
            field,
            label,
            value,
        } => format!(
            r#"<div class="card fallback" data-field="{}"><h3>{}</h3><p class="value">{}</p></div>"#,
            escape_html(field),
            escape_html(label),
            escape_html(value)
        ),
    }
}

const CHART_WIDTH: f64 = 600.0;
const CHART_HEIGHT: f64 = 220.0;
const CHART_PAD: f64 = 30.0;

fn render_chart(chart: &ChartDefinition, history: &ChartHistory) -> String {
    let lines = series(history, chart);
    let values: Vec<f64> = lines
        .iter()
        .flat_map(|s| s.points.iter().flatten().copied())
        .collect();

    let title = escape_html(&chart.title);
    if values.is_empty() {
        return format!(
            r#"<div class="chart" id="chart-{}"><h3>{}</h3><p class="empty">No data yet</p></div>"#,
            escape_html(&chart.id),
            title
        );
    }

    let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        min -= 1.0;
        max += 1.0;
    }

    let step = (CHART_WIDTH - 2.0 * CHART_PAD) / (history.len().max(2) - 1) as f64;
    let x = |index: usize| CHART_PAD + index as f64 * step;
    let y = |v: f64| CHART_HEIGHT - CHART_PAD - (v - min) / (max - min) * (CHART_HEIGHT - 2.0 * CHART_PAD);

    let paths: String = lines
        .iter()
        .map(|s| {
            // gaps restart the path
            let mut d = String::new();
            let mut pen_down = false;
            for (index, point) in s.points.iter().enumerate() {
                match point {
                    Some(v) => {
                        let cmd = if pen_down { 'L' } else { 'M' };
                        d.push_str(&format!("{}{:.1},{:.1} ", cmd, x(index), y(*v)));
                        pen_down = true;
                    }
                    None => pen_down = false,
                }
            }
            format!(
                r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
                d.trim_end(),
                escape_html(&s.color)
            )
        })
        .collect();

    let ticks: String = tick_labels(history)
        .iter()
        .enumerate()
        .filter(|(_, label)| !label.is_empty())
        .map(|(index, label)| {
            format!(
                r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="middle">{}</text>"#,
                x(index),
                CHART_HEIGHT - 8.0,
                escape_html(label)
            )
        })
        .collect();

    let legend: String = lines
        .iter()
        .map(|s| {
            format!(
                r#"<span class="legend" style="color: {};">{}</span>"#,
                escape_html(&s.color),
                escape_html(&s.name)
            )
        })
        .collect();

    format!(
        r#"<div class="chart" id="chart-{id}"><h3>{title}</h3>
<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}">{paths}{ticks}</svg>
<div>{legend}</div></div>"#,
        id = escape_html(&chart.id),
        title = title,
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
        paths = paths,
        ticks = ticks,
        legend = legend,
    )
}

async fn login_page(State(dashboard): State<DashboardState>) -> Response {
    if dashboard.api.session().is_authenticated() {
        return Redirect::to("/dashboard").into_response();
    }
    login_form(Notice::None).into_response()
}

async fn login_submit(
    State(dashboard): State<DashboardState>,
    Form(form): Form<LoginForm>,
) -> Response {
    match dashboard.api.login(&form.email, &form.password).await {
        Ok(_) => Redirect::to("/dashboard").into_response(),
        Err(e) => {
            tracing::debug!("Login for {} failed: {}", form.email, e);
            login_form(Notice::Error(&e.to_string())).into_response()
        }
    }
}

fn login_form(notice: Notice<'_>) -> Html<String> {
    auth_page(
        "Login",
        notice,
        "/login",
        r#"<label for="email">Email address</label>
        <input id="email" name="email" type="email" required placeholder="email@address.com">
        <label for="password">Password</label>
        <input id="password" name="password" type="password" required>"#,
        "Sign in",
        r#"<a href="/forgot-password">Forgot password?</a> <a href="/register">Create an account</a>"#,
    )
}

async fn register_page() -> Html<String> {
    register_form(Notice::None)
}

async fn register_submit(
    State(dashboard): State<DashboardState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    match dashboard
        .api
        .register(&form.email, &form.password, &form.device_id)
        .await
    {
        Ok(_) => Redirect::to("/dashboard").into_response(),
        Err(e) => register_form(Notice::Error(&e.to_string())).into_response(),
    }
}

fn register_form(notice: Notice<'_>) -> Html<String> {
    auth_page(
        "Register",
        notice,
        "/register",
        r#"<label for="email">Email address</label>
        <input id="email" name="email" type="email" required placeholder="email@address.com">
        <label for="password">Password</label>
        <input id="password" name="password" type="password" required>
        <label for="device_id">Device ID</label>
        <input id="device_id" name="device_id" type="text" required>"#,
        "Create account",
        r#"<a href="/login">Already have an account? Sign in</a>"#,
    )
}

async fn forgot_password_page() -> Html<String> {
    forgot_password_form(Notice::None)
}

async fn forgot_password_submit(
    State(dashboard): State<DashboardState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Html<String> {
    match dashboard.api.request_password_reset(&form.email).await {
        Ok(_) => forgot_password_form(Notice::Info(
            "Password reset instructions sent to your email.",
        )),
        Err(e) => forgot_password_form(Notice::Error(&e.to_string())),
    }
}

fn forgot_password_form(notice: Notice<'_>) -> Html<String> {
    auth_page(
        "Forgot password?",
        notice,
        "/forgot-password",
        r#"<p>Enter your email and we'll send you a link to reset your password.</p>
        <label for="email">Email address</label>
        <input id="email" name="email" type="email" required placeholder="email@address.com">"#,
        "Send reset instructions",
        r#"<a href="/login">Back to login</a>"#,
    )
}

async fn reset_password_page(Path(token): Path<String>) -> Html<String> {
    reset_password_form(&token, Notice::None)
}

async fn reset_password_submit(
    State(dashboard): State<DashboardState>,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    if form.password != form.confirm_password {
        return reset_password_form(&token, Notice::Error("Passwords do not match"))
            .into_response();
    }
    match dashboard.api.reset_password(&token, &form.password).await {
        Ok(()) => {
            tracing::info!("Password reset completed");
            Redirect::to("/login").into_response()
        }
        Err(e) => reset_password_form(&token, Notice::Error(&e.to_string())).into_response(),
    }
}

fn reset_password_form(token: &str, notice: Notice<'_>) -> Html<String> {
    let action = format!("/reset-password/{}", escape_html(token));
    auth_page(
        "Reset password",
        notice,
        &action,
        r#"<label for="password">New password</label>
        <input id="password" name="password" type="password" required>
        <label for="confirm_password">Confirm password</label>
        <input id="confirm_password" name="confirm_password" type="password" required>"#,
        "Reset password",
        r#"<a href="/login">Back to login</a>"#,
    )
}

fn auth_page(
    heading: &str,
    notice: Notice<'_>,
    action: &str,
    fields: &str,
    submit: &str,
    links: &str,
) -> Html<String> {
    let notice = match notice {
        Notice::None => String::new(),
        Notice::Error(message) => format!(
            r#"<p class="notice error">{}</p>"#,
            escape_html(message)
        ),
        Notice::Info(message) => format!(
            r#"<p class="notice info">{}</p>"#,
            escape_html(message)
        ),
    };
    let body = format!(
        r#"<main class="auth">
    <h2>{heading}</h2>
    {notice}
    <form method="post" action="{action}">
        {fields}
        <button type="submit">{submit}</button>
    </form>
    <p>{links}</p>
</main>"#
    );
    page(heading, &body)
}

async fn logout_handler(State(dashboard): State<DashboardState>) -> Redirect {
    dashboard.api.logout();
    Redirect::to("/login")
}

async fn farmcam_handler(
    State(dashboard): State<DashboardState>,
    Query(query): Query<CameraQuery>,
) -> Response {
    if !dashboard.api.session().is_authenticated() {
        return Redirect::to("/login").into_response();
    }

    let status = dashboard.camera.check_backend().await;
    let viewer = match &query.url {
        None => r#"<p class="empty">Enter an RTSP URL to start streaming.</p>"#.to_string(),
        Some(rtsp_url) => match dashboard.camera.stream_url(rtsp_url, status) {
            // the relay answers with an error page when the camera is unreachable
            Ok(stream) => format!(
                r#"<img class="stream" src="{src}" alt="Camera stream" onerror="this.hidden=true;document.getElementById('stream-error').hidden=false">
    <p id="stream-error" class="notice error" hidden>{failed}</p>"#,
                src = escape_html(&stream),
                failed = STREAM_LOAD_FAILED,
            ),
            Err(e) => format!(r#"<p class="notice error">{}</p>"#, escape_html(&e.to_string())),
        },
    };
    let rtsp_url = query.url.unwrap_or_default();
    let status_class = match status {
        BackendStatus::Connected => "connected",
        BackendStatus::Checking | BackendStatus::Disconnected => "disconnected",
    };

    let body = format!(
        r#"<header>
        <h1>Farm Camera</h1>
        <a href="/dashboard">Back to dashboard</a>
    </header>
    <p class="status {status_class}">Backend: {status}</p>
    <form method="get" action="/farmcam">
        <input name="url" type="text" placeholder="rtsp://camera.local:554/stream" value="{url}">
        <button type="submit">Start stream</button>
    </form>
    {viewer}"#,
        status = status.label(),
        url = escape_html(&rtsp_url),
    );
    page("Farm Camera", &body).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": FarmwatchError::Unauthorized.to_string() })),
    )
        .into_response()
}

async fn snapshot_handler(State(dashboard): State<DashboardState>) -> Response {
    if !dashboard.api.session().is_authenticated() {
        return unauthorized();
    }
    let state = dashboard.telemetry.read().await;
    Json(json!({
        "device_id": state.device_id,
        "snapshot": state.latest,
    }))
    .into_response()
}

async fn widgets_handler(State(dashboard): State<DashboardState>) -> Response {
    if !dashboard.api.session().is_authenticated() {
        return unauthorized();
    }
    let state = dashboard.telemetry.read().await;
    let instructions = state
        .latest
        .as_ref()
        .map(|snapshot| dispatch(snapshot, &dashboard.registry))
        .unwrap_or_default();
    Json(instructions).into_response()
}

async fn history_handler(State(dashboard): State<DashboardState>) -> Response {
    if !dashboard.api.session().is_authenticated() {
        return unauthorized();
    }
    let state = dashboard.telemetry.read().await;
    let samples: Vec<_> = state.history.iter().cloned().collect();
    Json(samples).into_response()
}

async fn charts_handler(State(dashboard): State<DashboardState>) -> Response {
    if !dashboard.api.session().is_authenticated() {
        return unauthorized();
    }
    let state = dashboard.telemetry.read().await;
    let labels = tick_labels(&state.history);
    let charts: Vec<serde_json::Value> = dashboard
        .charts
        .iter()
        .map(|chart| {
            json!({
                "id": chart.id,
                "title": chart.title,
                "labels": labels,
                "series": series(&state.history, chart),
            })
        })
        .collect();
    Json(charts).into_response()
}

async fn status_handler(State(dashboard): State<DashboardState>) -> Response {
    if !dashboard.api.session().is_authenticated() {
        return unauthorized();
    }
    let status = dashboard.telemetry.read().await.status();
    Json(status).into_response()
}

async fn toggle_handler(
    State(dashboard): State<DashboardState>,
    Path(field): Path<String>,
) -> Response {
    if !dashboard.api.session().is_authenticated() {
        return unauthorized();
    }
    tracing::debug!("Toggle requested for '{}'", field);
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({ "error": "Toggle write-back is not implemented" })),
    )
        .into_response()
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 1100px; margin: 0 auto; padding: 1rem; }}
        header {{ display: flex; gap: 1rem; align-items: center; flex-wrap: wrap; }}
        .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 1rem; }}
        .card {{ border: 1px solid #dee2e6; border-radius: 0.5rem; padding: 0.75rem; }}
        .switch.on {{ color: #155724; }}
        .switch.off {{ color: #721c24; }}
        .notice.error {{ color: #721c24; background-color: #f8d7da; padding: 0.5rem; }}
        .notice.info {{ color: #155724; background-color: #d4edda; padding: 0.5rem; }}
        .legend {{ margin-right: 1rem; }}
    </style>
</head>
<body>
    {body}
</body>
</html>"#,
        title = escape_html(title),
        body = body,
    ))
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

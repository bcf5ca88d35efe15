//! Telemetry poller: keeps the shared state fed while a device view is active

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::session::SessionSnapshot;
use crate::snapshot::DeviceSnapshot;
use crate::state::StateHandle;
use crate::FarmwatchError;

/// Fixed time between polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Where snapshots come from
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch(&self, device_id: &str) -> crate::Result<DeviceSnapshot>;
}

/// Spawns polling tasks against a telemetry source
#[derive(Clone)]
pub struct TelemetryPoller {
    source: Arc<dyn TelemetrySource>,
    state: StateHandle,
    interval: Duration,
}

impl TelemetryPoller {
    pub fn new(source: Arc<dyn TelemetrySource>, state: StateHandle) -> Self {
        Self {
            source,
            state,
            interval: POLL_INTERVAL,
        }
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Start polling `device_id` until the returned handle is cancelled or
    /// dropped, or `parent` is cancelled
    pub fn spawn(&self, device_id: &str, parent: &CancellationToken) -> PollerHandle {
        let cancel = parent.child_token();
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.source),
            Arc::clone(&self.state),
            device_id.to_string(),
            self.interval,
            cancel.clone(),
        ));
        tracing::info!(
            "Polling device '{}' every {:?}",
            device_id,
            self.interval
        );
        PollerHandle {
            device_id: device_id.to_string(),
            cancel,
            task: Some(task),
        }
    }
}

/// Owner of a running poll task; dropping it stops the task
#[derive(Debug)]
pub struct PollerHandle {
    device_id: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Stop polling. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the task to finish
    pub async fn join(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    source: Arc<dyn TelemetrySource>,
    state: StateHandle,
    device_id: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    // first tick completes immediately
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seq = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        seq += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = source.fetch(&device_id) => result,
        };
        apply_poll_result(&state, &device_id, seq, result, &cancel).await;
    }

    tracing::debug!("Polling loop for '{}' cancelled", device_id);
}

/// Write one poll outcome into the shared state
pub async fn apply_poll_result(
    state: &StateHandle,
    device_id: &str,
    seq: u64,
    result: crate::Result<DeviceSnapshot>,
    cancel: &CancellationToken,
) {
    let now_ms = current_epoch_ms();
    let mut state = state.write().await;
    if cancel.is_cancelled() || state.device_id.as_deref() != Some(device_id) {
        tracing::debug!("Dropping poll {} for inactive device '{}'", seq, device_id);
        return;
    }

    match result {
        Ok(snapshot) => {
            let fields = snapshot.len();
            if state.apply_snapshot(seq, snapshot, &time_label(), now_ms) {
                tracing::debug!(
                    "Poll {} for '{}': {} fields, {} samples",
                    seq,
                    device_id,
                    fields,
                    state.history.len()
                );
            }
        }
        Err(FarmwatchError::Unauthorized) => {
            tracing::warn!("Poll {} for '{}' was rejected; session expired", seq, device_id);
            state.record_failure(&FarmwatchError::Unauthorized.to_string(), now_ms);
        }
        Err(e) => {
            tracing::warn!("Poll {} for '{}' failed: {}", seq, device_id, e);
            state.record_failure(&e.to_string(), now_ms);
        }
    }
}

/// Follow the session and keep exactly one poller running for its device
pub async fn supervise(
    mut sessions: watch::Receiver<SessionSnapshot>,
    poller: TelemetryPoller,
    cancel: CancellationToken,
) {
    let mut active: Option<PollerHandle> = None;

    loop {
        let wanted = sessions
            .borrow_and_update()
            .device_id()
            .map(str::to_string);
        let running = active.as_ref().map(|h| h.device_id().to_string());

        if wanted != running {
            if let Some(handle) = active.take() {
                handle.cancel();
                poller.state().write().await.deactivate();
                tracing::info!("Stopped polling device '{}'", handle.device_id());
            }
            if let Some(device_id) = wanted {
                poller.state().write().await.activate(&device_id);
                active = Some(poller.spawn(&device_id, &cancel));
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(handle) = active.take() {
        handle.join().await;
    }
    tracing::debug!("Telemetry supervisor stopped");
}

/// Wall-clock label shown on the chart x axis
pub fn time_label() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

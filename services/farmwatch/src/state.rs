//! Shared telemetry state for the active device view

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::history::{ChartHistory, ChartSample};
use crate::snapshot::DeviceSnapshot;

/// Poll bookkeeping exposed on /api/status
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollStatus {
    pub device_id: Option<String>,
    pub last_poll_epoch_ms: u64,
    pub last_success_epoch_ms: Option<u64>,
    pub consecutive_errors: u32,
    pub last_error: Option<String>,
    pub samples: usize,
}

/// Latest snapshot and chart history of the device being watched
#[derive(Debug)]
pub struct TelemetryState {
    pub device_id: Option<String>,
    pub latest: Option<DeviceSnapshot>,
    pub history: ChartHistory,
    pub last_poll_epoch_ms: u64,
    pub last_success_epoch_ms: Option<u64>,
    pub consecutive_errors: u32,
    pub last_error: Option<String>,
    pub last_applied_seq: u64,
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryState {
    pub fn new() -> Self {
        Self {
            device_id: None,
            latest: None,
            history: ChartHistory::new(),
            last_poll_epoch_ms: 0,
            last_success_epoch_ms: None,
            consecutive_errors: 0,
            last_error: None,
            last_applied_seq: 0,
        }
    }

    /// Start a fresh view for a device; previous data is discarded
    pub fn activate(&mut self, device_id: &str) {
        self.reset();
        self.device_id = Some(device_id.to_string());
    }

    /// Tear the view down
    pub fn deactivate(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.device_id = None;
        self.latest = None;
        self.history.clear();
        self.last_poll_epoch_ms = 0;
        self.last_success_epoch_ms = None;
        self.consecutive_errors = 0;
        self.last_error = None;
        self.last_applied_seq = 0;
    }

    /// Store a successful poll result, returning false for stale results
    pub fn apply_snapshot(
        &mut self,
        seq: u64,
        snapshot: DeviceSnapshot,
        time_label: &str,
        now_ms: u64,
    ) -> bool {
        if seq <= self.last_applied_seq {
            tracing::debug!(
                "Discarding stale poll result {} (last applied {})",
                seq,
                self.last_applied_seq
            );
            return false;
        }
        self.last_applied_seq = seq;
        self.history
            .push(ChartSample::capture(seq, &snapshot, time_label, now_ms));
        self.latest = Some(snapshot);
        self.last_poll_epoch_ms = now_ms;
        self.last_success_epoch_ms = Some(now_ms);
        self.consecutive_errors = 0;
        self.last_error = None;
        true
    }

    /// Note a failed poll; the previous snapshot stays on display
    pub fn record_failure(&mut self, error: &str, now_ms: u64) {
        self.last_poll_epoch_ms = now_ms;
        self.consecutive_errors += 1;
        self.last_error = Some(error.to_string());
    }

    pub fn status(&self) -> PollStatus {
        PollStatus {
            device_id: self.device_id.clone(),
            last_poll_epoch_ms: self.last_poll_epoch_ms,
            last_success_epoch_ms: self.last_success_epoch_ms,
            consecutive_errors: self.consecutive_errors,
            last_error: self.last_error.clone(),
            samples: self.history.len(),
        }
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<TelemetryState>>;

pub fn new_state_handle() -> StateHandle {
    Arc::new(RwLock::new(TelemetryState::new()))
}

//! Rolling chart history
//!
//! Every poll contributes one [`ChartSample`]; the history keeps the most
//! recent [`HISTORY_CAPACITY`] of them for the dashboard charts.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::snapshot::DeviceSnapshot;

/// Maximum number of samples kept for charting
pub const HISTORY_CAPACITY: usize = 20;

/// Snapshot fields copied into every chart sample
pub const CHART_FIELDS: [&str; 7] = [
    "temp_in", "temp_out", "rh_in", "rh_out", "rain_out", "vpd_in", "vpd_out",
];

/// One point in time on the dashboard charts
///
/// All chart fields are always present; missing readings are `None` so that
/// every series stays aligned by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSample {
    pub seq: u64,
    pub time: String,
    pub captured_at_epoch_ms: u64,
    pub temp_in: Option<f64>,
    pub temp_out: Option<f64>,
    pub rh_in: Option<f64>,
    pub rh_out: Option<f64>,
    pub rain_out: Option<f64>,
    pub vpd_in: Option<f64>,
    pub vpd_out: Option<f64>,
}

impl ChartSample {
    pub fn capture(
        seq: u64,
        snapshot: &DeviceSnapshot,
        time: impl Into<String>,
        captured_at_epoch_ms: u64,
    ) -> Self {
        let value = |name: &str| snapshot.get(name).and_then(|v| v.as_chart_value());
        Self {
            seq,
            time: time.into(),
            captured_at_epoch_ms,
            temp_in: value("temp_in"),
            temp_out: value("temp_out"),
            rh_in: value("rh_in"),
            rh_out: value("rh_out"),
            rain_out: value("rain_out"),
            vpd_in: value("vpd_in"),
            vpd_out: value("vpd_out"),
        }
    }

    /// Look up a chart field by key
    pub fn value(&self, key: &str) -> Option<f64> {
        match key {
            "temp_in" => self.temp_in,
            "temp_out" => self.temp_out,
            "rh_in" => self.rh_in,
            "rh_out" => self.rh_out,
            "rain_out" => self.rain_out,
            "vpd_in" => self.vpd_in,
            "vpd_out" => self.vpd_out,
            _ => None,
        }
    }
}

/// Fixed-capacity FIFO of chart samples, oldest first
#[derive(Debug, Clone)]
pub struct ChartHistory {
    samples: VecDeque<ChartSample>,
    capacity: usize,
}

impl Default for ChartHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, sample: ChartSample) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ChartSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&ChartSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// One plotted line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLine {
    pub key: String,
    pub name: String,
    pub color: String,
}

/// A chart panel with one or more lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDefinition {
    pub id: String,
    pub title: String,
    pub lines: Vec<ChartLine>,
}

fn line(key: &str, name: &str, color: &str) -> ChartLine {
    ChartLine {
        key: key.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    }
}

/// The charts shown below the widget grid
pub fn default_charts() -> Vec<ChartDefinition> {
    vec![
        ChartDefinition {
            id: "temperature".to_string(),
            title: "Temperature Chart".to_string(),
            lines: vec![
                line("temp_in", "Temperature In (°C)", "#007bff"),
                line("temp_out", "Temperature Out (°C)", "#28a745"),
            ],
        },
        ChartDefinition {
            id: "humidity".to_string(),
            title: "Humidity Chart".to_string(),
            lines: vec![
                line("rh_in", "Humidity In (%)", "#ff9800"),
                line("rh_out", "Humidity Out (%)", "#ff5733"),
            ],
        },
        ChartDefinition {
            id: "rain".to_string(),
            title: "Rain Chart".to_string(),
            lines: vec![line("rain_out", "Rainfall", "#1B4965")],
        },
        ChartDefinition {
            id: "vpd".to_string(),
            title: "VPD Chart".to_string(),
            lines: vec![
                line("vpd_in", "VPD In", "#8e44ad"),
                line("vpd_out", "VPD Out", "#16a085"),
            ],
        },
    ]
}

/// Values of one line, aligned with the history by index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: String,
    pub name: String,
    pub color: String,
    pub points: Vec<Option<f64>>,
}

pub fn series(history: &ChartHistory, chart: &ChartDefinition) -> Vec<Series> {
    chart
        .lines
        .iter()
        .map(|l| Series {
            key: l.key.clone(),
            name: l.name.clone(),
            color: l.color.clone(),
            points: history.iter().map(|s| s.value(&l.key)).collect(),
        })
        .collect()
}

/// X-axis labels: every third tick plus the last one, the rest blank
pub fn tick_labels(history: &ChartHistory) -> Vec<String> {
    let last = history.len().saturating_sub(1);
    history
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            if index % 3 == 0 || index == last {
                sample.time.chars().take(5).collect()
            } else {
                String::new()
            }
        })
        .collect()
}

//! Widget dispatch: turns a snapshot into an ordered list of render instructions

use serde::Serialize;

use crate::snapshot::{is_identity_field, DeviceSnapshot, FieldValue};
use crate::widget::{WidgetKind, WidgetRegistry};

/// Assumed maximum of a gauge reading
pub const GAUGE_CEILING: f64 = 100.0;

/// What the dashboard should draw for one snapshot field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum RenderInstruction {
    StatCard {
        field: String,
        title: String,
        value: String,
        unit: String,
    },
    Toggle {
        field: String,
        label: String,
        on: bool,
    },
    Gauge {
        field: String,
        title: String,
        value: f64,
        percentage: f64,
        unit: String,
    },
    /// Drawn as part of a chart panel instead of a card
    Charted { field: String, chart: String },
    /// Registered field whose value does not fit its widget kind
    Mismatch {
        field: String,
        title: String,
        expected: &'static str,
        value: String,
    },
    /// Field with no registry entry
    Fallback {
        field: String,
        label: String,
        value: String,
    },
}

impl RenderInstruction {
    pub fn field(&self) -> &str {
        match self {
            RenderInstruction::StatCard { field, .. }
            | RenderInstruction::Toggle { field, .. }
            | RenderInstruction::Gauge { field, .. }
            | RenderInstruction::Charted { field, .. }
            | RenderInstruction::Mismatch { field, .. }
            | RenderInstruction::Fallback { field, .. } => field,
        }
    }
}

/// Produce render instructions in snapshot key order
pub fn dispatch(snapshot: &DeviceSnapshot, registry: &WidgetRegistry) -> Vec<RenderInstruction> {
    snapshot
        .iter()
        .filter_map(|(field, value)| dispatch_field(field, value, registry))
        .collect()
}

/// Decide the widget for a single field, `None` when it is not shown
pub fn dispatch_field(
    field: &str,
    value: &FieldValue,
    registry: &WidgetRegistry,
) -> Option<RenderInstruction> {
    if is_identity_field(field) || value.is_null() {
        return None;
    }

    let Some(descriptor) = registry.get(field) else {
        return Some(RenderInstruction::Fallback {
            field: field.to_string(),
            label: field.to_string(),
            value: value.display(),
        });
    };

    if descriptor.hidden {
        return None;
    }

    let mismatch = |expected: &'static str| {
        tracing::debug!(
            "Field '{}' holds {:?}, expected {} for its widget",
            field,
            value,
            expected
        );
        RenderInstruction::Mismatch {
            field: field.to_string(),
            title: descriptor.title.clone(),
            expected,
            value: value.display(),
        }
    };

    let instruction = match &descriptor.kind {
        WidgetKind::StatCard => match value {
            FieldValue::Number(_) | FieldValue::Text(_) => RenderInstruction::StatCard {
                field: field.to_string(),
                title: descriptor.title.clone(),
                value: value.display(),
                unit: descriptor.unit.clone(),
            },
            FieldValue::Bool(_) | FieldValue::Null => mismatch("number or text"),
        },
        WidgetKind::ToggleSwitch => RenderInstruction::Toggle {
            field: field.to_string(),
            label: descriptor.title.clone(),
            on: value.is_truthy(),
        },
        WidgetKind::CircularGauge => match value {
            FieldValue::Number(n) => {
                let reading = if n.is_nan() { 0.0 } else { *n };
                RenderInstruction::Gauge {
                    field: field.to_string(),
                    title: descriptor.title.clone(),
                    value: reading,
                    percentage: gauge_percentage(reading, GAUGE_CEILING),
                    unit: descriptor.unit.clone(),
                }
            }
            FieldValue::Bool(_) | FieldValue::Text(_) | FieldValue::Null => mismatch("number"),
        },
        WidgetKind::LineChart { chart } => RenderInstruction::Charted {
            field: field.to_string(),
            chart: chart.clone(),
        },
    };
    Some(instruction)
}

/// Share of the ceiling, clamped to 0..=100; NaN reads as 0
pub fn gauge_percentage(value: f64, ceiling: f64) -> f64 {
    if value.is_nan() || ceiling <= 0.0 {
        return 0.0;
    }
    value.clamp(0.0, ceiling) / ceiling * 100.0
}

/// Geometry of the annular gauge indicator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeArc {
    pub radius: f64,
    pub stroke_width: f64,
    pub circumference: f64,
    pub dash_offset: f64,
}

impl GaugeArc {
    pub const RADIUS: f64 = 80.0;
    pub const STROKE_WIDTH: f64 = 20.0;

    pub fn for_percentage(percentage: f64) -> Self {
        let normalized_radius = Self::RADIUS - Self::STROKE_WIDTH / 2.0;
        let circumference = normalized_radius * 2.0 * std::f64::consts::PI;
        let percentage = percentage.clamp(0.0, 100.0);
        Self {
            radius: Self::RADIUS,
            stroke_width: Self::STROKE_WIDTH,
            circumference,
            dash_offset: circumference - percentage / 100.0 * circumference,
        }
    }

    pub fn normalized_radius(&self) -> f64 {
        self.radius - self.stroke_width / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> WidgetRegistry {
        WidgetRegistry::farm_defaults()
    }

    fn snapshot(json: &str) -> DeviceSnapshot {
        DeviceSnapshot::from_json(json).unwrap()
    }

    #[test]
    fn identity_and_null_fields_are_skipped() {
        let out = dispatch(
            &snapshot(r#"{"device_id": "D1", "id": 4, "ph_nt1": null}"#),
            &registry(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn hidden_fields_are_skipped() {
        let out = dispatch(
            &snapshot(r#"{"err_code": 3, "timestamp": "2024-01-01", "rssi_ge": -60}"#),
            &registry(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn stat_card_for_number_and_text() {
        let out = dispatch(&snapshot(r#"{"ec_nt1": 1.5, "wifi_status": "ok"}"#), &registry());
        assert_eq!(
            out,
            vec![
                RenderInstruction::StatCard {
                    field: "ec_nt1".to_string(),
                    title: "EC".to_string(),
                    value: "1.5".to_string(),
                    unit: "S".to_string(),
                },
                RenderInstruction::StatCard {
                    field: "wifi_status".to_string(),
                    title: "Wifi Status".to_string(),
                    value: "ok".to_string(),
                    unit: String::new(),
                },
            ]
        );
    }

    #[test]
    fn toggle_uses_truthiness() {
        let out = dispatch(
            &snapshot(r#"{"IRR_1": true, "Vent": 0, "ACF": "1"}"#),
            &registry(),
        );
        let states: Vec<bool> = out
            .iter()
            .map(|i| match i {
                RenderInstruction::Toggle { on, .. } => *on,
                other => panic!("expected toggle, got {other:?}"),
            })
            .collect();
        assert_eq!(states, vec![true, false, true]);
    }

    #[test]
    fn gauge_clamps_to_ceiling() {
        let out = dispatch(
            &snapshot(r#"{"Tank_level": 150, "rh_in": -5, "rh_out": 42}"#),
            &registry(),
        );
        let percentages: Vec<f64> = out
            .iter()
            .map(|i| match i {
                RenderInstruction::Gauge { percentage, .. } => *percentage,
                other => panic!("expected gauge, got {other:?}"),
            })
            .collect();
        assert_eq!(percentages, vec![100.0, 0.0, 42.0]);
    }

    #[test]
    fn gauge_nan_reads_zero() {
        let registry = registry();
        let instruction =
            dispatch_field("Tank_level", &FieldValue::Number(f64::NAN), &registry).unwrap();
        match instruction {
            RenderInstruction::Gauge {
                value, percentage, ..
            } => {
                assert_eq!(value, 0.0);
                assert_eq!(percentage, 0.0);
            }
            other => panic!("expected gauge, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_values_are_reported() {
        let out = dispatch(
            &snapshot(r#"{"Tank_level": "full", "ph_nt1": true}"#),
            &registry(),
        );
        assert_eq!(
            out,
            vec![
                RenderInstruction::Mismatch {
                    field: "Tank_level".to_string(),
                    title: "Tank Level".to_string(),
                    expected: "number",
                    value: "full".to_string(),
                },
                RenderInstruction::Mismatch {
                    field: "ph_nt1".to_string(),
                    title: "pH".to_string(),
                    expected: "number or text",
                    value: "true".to_string(),
                },
            ]
        );
    }

    #[test]
    fn chart_fields_are_not_cards() {
        let out = dispatch(&snapshot(r#"{"temp_in": 24.5}"#), &registry());
        assert_eq!(
            out,
            vec![RenderInstruction::Charted {
                field: "temp_in".to_string(),
                chart: "temperature".to_string(),
            }]
        );
    }

    #[test]
    fn unknown_fields_fall_back() {
        let out = dispatch(&snapshot(r#"{"foo_raw": 7, "flag": false}"#), &registry());
        assert_eq!(
            out,
            vec![
                RenderInstruction::Fallback {
                    field: "foo_raw".to_string(),
                    label: "foo_raw".to_string(),
                    value: "7".to_string(),
                },
                RenderInstruction::Fallback {
                    field: "flag".to_string(),
                    label: "flag".to_string(),
                    value: "false".to_string(),
                },
            ]
        );
    }

    #[test]
    fn order_follows_snapshot() {
        let out = dispatch(
            &snapshot(r#"{"zz_custom": 1, "IRR_1": true, "ec_nt1": 2}"#),
            &registry(),
        );
        let fields: Vec<&str> = out.iter().map(|i| i.field()).collect();
        assert_eq!(fields, vec!["zz_custom", "IRR_1", "ec_nt1"]);
    }

    #[test]
    fn gauge_arc_geometry() {
        let empty = GaugeArc::for_percentage(0.0);
        let full = GaugeArc::for_percentage(100.0);
        let half = GaugeArc::for_percentage(50.0);
        assert_eq!(empty.normalized_radius(), 70.0);
        assert!((empty.dash_offset - empty.circumference).abs() < 1e-9);
        assert!(full.dash_offset.abs() < 1e-9);
        assert!((half.dash_offset - half.circumference / 2.0).abs() < 1e-9);
    }

    #[test]
    fn instructions_serialize_with_widget_tag() {
        let json = serde_json::to_value(RenderInstruction::Toggle {
            field: "IRR_1".to_string(),
            label: "IRR 1".to_string(),
            on: true,
        })
        .unwrap();
        assert_eq!(json["widget"], "toggle");
        assert_eq!(json["label"], "IRR 1");
        assert_eq!(json["on"], true);
    }
}

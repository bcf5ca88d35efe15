//! Widget registry: which presentation each telemetry field gets

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Presentation kind for a telemetry field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetKind {
    StatCard,
    ToggleSwitch,
    CircularGauge,
    LineChart { chart: String },
}

/// Informational grouping of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Environmental,
    Water,
    Control,
    Power,
    #[default]
    Other,
}

/// Display metadata for one telemetry field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDescriptor {
    pub field: String,
    pub title: String,
    pub unit: String,
    pub kind: WidgetKind,
    pub category: Category,
    pub hidden: bool,
}

/// Read-only mapping from field name to widget descriptor
#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    entries: HashMap<String, WidgetDescriptor>,
}

impl WidgetRegistry {
    pub fn new(descriptors: impl IntoIterator<Item = WidgetDescriptor>) -> Self {
        Self {
            entries: descriptors
                .into_iter()
                .map(|d| (d.field.clone(), d))
                .collect(),
        }
    }

    /// Replace or add entries; used once while building the service
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = WidgetDescriptor>) -> Self {
        for descriptor in overrides {
            tracing::debug!("Widget override for '{}'", descriptor.field);
            self.entries.insert(descriptor.field.clone(), descriptor);
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&WidgetDescriptor> {
        self.entries.get(field)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The built-in farm device table
    pub fn farm_defaults() -> Self {
        use Category::*;

        let mut d = Vec::with_capacity(FARM_TABLE.len() + 2);
        for &(field, title, unit, kind, category) in FARM_TABLE {
            let kind = match kind {
                K::Stat => WidgetKind::StatCard,
                K::Toggle => WidgetKind::ToggleSwitch,
                K::Gauge => WidgetKind::CircularGauge,
            };
            d.push(descriptor(field, title, unit, kind, category, false));
        }
        for &field in HIDDEN_FIELDS.iter() {
            d.push(descriptor(field.0, field.1, "", WidgetKind::StatCard, Other, true));
        }
        for (field, title) in [("temp_in", "Temperature In"), ("temp_out", "Temperature Out")] {
            d.push(descriptor(
                field,
                title,
                "°C",
                WidgetKind::LineChart {
                    chart: "temperature".to_string(),
                },
                Environmental,
                false,
            ));
        }
        Self::new(d)
    }
}

fn descriptor(
    field: &str,
    title: &str,
    unit: &str,
    kind: WidgetKind,
    category: Category,
    hidden: bool,
) -> WidgetDescriptor {
    WidgetDescriptor {
        field: field.to_string(),
        title: title.to_string(),
        unit: unit.to_string(),
        kind,
        category,
        hidden,
    }
}

#[derive(Clone, Copy)]
enum K {
    Stat,
    Toggle,
    Gauge,
}

const FARM_TABLE: &[(&str, &str, &str, K, Category)] = {
    use Category::*;
    use K::*;
    &[
        // Environmental
        ("rh_out", "Humidity Out", "%", Gauge, Environmental),
        ("rh_in", "Humidity In", "%", Gauge, Environmental),
        ("humi_in", "Humidity In", "%", Gauge, Environmental),
        ("humi_o", "Humidity Out", "%", Gauge, Environmental),
        ("vpd_in", "VPD In", "", Stat, Environmental),
        ("vpd_out", "VPD Out", "", Stat, Environmental),
        ("lux_out", "Light Intensity", "", Stat, Environmental),
        ("lux_o", "Light Intensity out", "", Stat, Environmental),
        ("rain_o", "Rain Out", "", Stat, Environmental),
        ("rain_out", "Rain", "", Toggle, Environmental),
        ("vpd_o", "VPD Out", "", Stat, Environmental),
        ("temp_o", "Temperature Out", "", Stat, Environmental),
        ("Soil_moisture", "Soil Moisture", "%", Gauge, Environmental),
        ("moisture_percent2", "Soil Moisture 2", "%", Gauge, Environmental),
        // Water quality and tanks
        ("ec_nt1", "EC", "S", Stat, Water),
        ("tds_nt1", "TDS", "", Stat, Water),
        ("ph_nt1", "pH", "", Stat, Water),
        ("temp_nut", "Nutrient Temp", "°C", Stat, Water),
        ("Tank_level", "Tank Level", "%", Gauge, Water),
        ("total_liters_in", "Total Liters In", "", Gauge, Water),
        ("total_liters_out", "Total Liters Out", "", Gauge, Water),
        ("flowrate_in", "Flowrate In", "", Stat, Water),
        ("flowrate_out", "Flowrate Out", "", Stat, Water),
        ("percentage", "Tank Automation %", "%", Gauge, Water),
        ("minimum_height", "Minimum tank Height", "", Stat, Water),
        ("maximum_height", "Maximum tank Height", "", Stat, Water),
        ("total_in", "Total In", "", Stat, Water),
        ("total_out", "Total Out", "", Stat, Water),
        ("height_cm", "Current tank Height", "", Stat, Water),
        ("height_cm_min", "Minimum tank Height", "", Stat, Water),
        ("height_cm_max", "Maximum tank Height", "", Stat, Water),
        // Irrigation and actuators
        ("IRR_1", "IRR 1", "", Toggle, Control),
        ("IR_2", "IR 2", "", Toggle, Control),
        ("IRR_3", "IRR 3", "", Toggle, Control),
        ("IRR_4", "IRR 4", "", Toggle, Control),
        ("Curtain_up", "Curtain Up", "", Toggle, Control),
        ("Curtain_down", "Curtain Down", "", Toggle, Control),
        ("Vent", "Vent", "", Toggle, Control),
        ("ACF", "ACF", "", Toggle, Control),
        ("switch_sw1", "Switch 1", "", Toggle, Control),
        ("switch_sw2", "Switch 2", "", Toggle, Control),
        ("switch_sw3", "Switch 3", "", Toggle, Control),
        ("switch_sw4", "Switch 4", "", Toggle, Control),
        ("switch_sw5", "Switch 5", "", Toggle, Control),
        ("switch_sw6", "Switch 6", "", Toggle, Control),
        ("switch_sw7", "Switch 7", "", Toggle, Control),
        ("switch_sw8", "Switch 8", "", Toggle, Control),
        ("switch_sw9", "Switch 9", "", Toggle, Control),
        ("switch_sw10", "Switch 10", "", Toggle, Control),
        ("switch_sw11", "Switch 11", "", Toggle, Control),
        ("switch_sw12", "Switch 12", "", Toggle, Control),
        ("switch_sw13", "Switch 13", "", Toggle, Control),
        ("switch_sw14", "Switch 14", "", Toggle, Control),
        ("switch_sw15", "Switch 15", "", Toggle, Control),
        ("switch_sw16", "Switch 16", "", Toggle, Control),
        ("switch_sw17", "Switch 17", "", Toggle, Control),
        ("switch_pmp1", "Sample RO", "", Toggle, Control),
        ("switch_pmp3", "Doser RO", "", Toggle, Control),
        ("switch_pmp4", "Doser 1", "", Toggle, Control),
        ("switch_pmp5", "Doser 2", "", Toggle, Control),
        ("switch_pmp6", "Doser 3", "", Toggle, Control),
        ("switch_pmp7", "Doser 4", "", Toggle, Control),
        ("switch_pmp8", "Airation", "", Toggle, Control),
        // Three-phase power
        ("volt_red", "Voltage Red", "", Stat, Power),
        ("volt_ylw", "Voltage Yellow", "", Stat, Power),
        ("volt_blu", "Voltage Blue", "", Stat, Power),
        ("amp_red", "Current Red", "", Stat, Power),
        ("amp_ylw", "Current Yellow", "", Stat, Power),
        ("amp_blu", "Current Blue", "", Stat, Power),
        ("pow_red", "Power Red", "", Stat, Power),
        ("pow_ylw", "Power Yellow", "", Stat, Power),
        ("pow_blu", "Power Blue", "", Stat, Power),
        ("pf_red", "Power Factor Red", "", Stat, Power),
        ("pf_ylw", "Power Factor Yellow", "", Stat, Power),
        ("pf_blu", "Power Factor Blue", "", Stat, Power),
        ("hz", "Frequency", "", Stat, Power),
        // Connectivity and misc
        ("relaystatus", "Relay Status", "", Toggle, Other),
        ("st_s1", "Status S1", "", Toggle, Other),
        ("wifi_status", "Wifi Status", "", Stat, Other),
        ("v3n", "Voltage 3 phase", "", Stat, Other),
        ("j", "Internet Status", "", Stat, Other),
        ("w_lan", "Wlan Status", "", Stat, Other),
    ]
};

/// Diagnostics the device reports but the dashboard never shows
const HIDDEN_FIELDS: &[(&str, &str)] = &[
    ("farmatomacid", "Farmatomacid"),
    ("n_id", "N ID"),
    ("err_code", "Error Code"),
    ("timestamp", "Timestamp"),
    ("rssi_ge", "wifi_strength"),
    ("err_ge", "Error Ge"),
    ("addr_ge1", "Addr Ge1"),
    ("addr_ge2", "Addr Ge2"),
    ("did_in", "Did In"),
    ("did_pow", "Did Power"),
    ("numsentsuccess", "Num Sent Success"),
    ("numsentfailure", "Num Sent Failure"),
    ("currentfirmwareversion", "Current Firmware Version"),
    ("enra", "Enra"),
    ("enrr", "Enrr"),
    ("did_irr", "Did Irr"),
    ("nss", "Nss"),
    ("nfs", "Nfs"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_known_fields() {
        let registry = WidgetRegistry::farm_defaults();
        assert_eq!(registry.get("IRR_1").unwrap().kind, WidgetKind::ToggleSwitch);
        assert_eq!(registry.get("IRR_1").unwrap().title, "IRR 1");
        assert_eq!(registry.get("Tank_level").unwrap().kind, WidgetKind::CircularGauge);
        assert_eq!(registry.get("ph_nt1").unwrap().kind, WidgetKind::StatCard);
        assert_eq!(registry.get("hz").unwrap().category, Category::Power);
        assert!(registry.get("unknown_field").is_none());
    }

    #[test]
    fn temperatures_are_charted() {
        let registry = WidgetRegistry::farm_defaults();
        assert_eq!(
            registry.get("temp_in").unwrap().kind,
            WidgetKind::LineChart {
                chart: "temperature".to_string()
            }
        );
        assert_eq!(registry.get("temp_out").unwrap().unit, "°C");
    }

    #[test]
    fn diagnostics_are_hidden() {
        let registry = WidgetRegistry::farm_defaults();
        for (field, _) in HIDDEN_FIELDS {
            assert!(registry.get(field).unwrap().hidden, "{field}");
        }
        assert!(!registry.get("IRR_1").unwrap().hidden);
    }

    #[test]
    fn every_table_entry_is_registered() {
        let registry = WidgetRegistry::farm_defaults();
        assert_eq!(registry.len(), FARM_TABLE.len() + HIDDEN_FIELDS.len() + 2);
    }

    #[test]
    fn overrides_replace_and_extend() {
        let registry = WidgetRegistry::farm_defaults().with_overrides([
            descriptor("IRR_1", "Main Valve", "", WidgetKind::ToggleSwitch, Category::Control, false),
            descriptor("soil_ec", "Soil EC", "mS", WidgetKind::StatCard, Category::Water, false),
        ]);
        assert_eq!(registry.get("IRR_1").unwrap().title, "Main Valve");
        assert_eq!(registry.get("soil_ec").unwrap().unit, "mS");
    }

    #[test]
    fn widget_kind_serde_shape() {
        let json = serde_json::to_value(WidgetKind::LineChart {
            chart: "temperature".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "line_chart");
        assert_eq!(json["chart"], "temperature");
        let kind: WidgetKind = serde_json::from_str(r#"{"type": "circular_gauge"}"#).unwrap();
        assert_eq!(kind, WidgetKind::CircularGauge);
    }
}

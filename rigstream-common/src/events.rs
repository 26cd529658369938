//! Drilling telemetry model
//!
//! A [`RawSample`] arrives from the rig, the analyzer turns it into
//! [`DerivedFields`], and the pair plus an ingestion timestamp becomes a
//! [`DrillingEvent`]. [`Priority`] is always computed from the alerts and
//! never stored; live subscribers receive it inside a [`LiveEvent`].
//!
//! Serialized field order follows [`FIELD_NAMES`] for every wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical field order for history rows, CSV export and storage columns
pub const FIELD_NAMES: [&str; 13] = [
    "timestamp",
    "bit_depth",
    "wobs",
    "rpm",
    "torque",
    "flow_rate",
    "mud_density",
    "annular_pressure",
    "predicted_rop",
    "mechanical_sticking_alert",
    "differential_sticking_alert",
    "hole_cleaning_alert",
    "mud_loss_alert",
];

/// One raw sensor reading set as submitted by the rig
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub bit_depth: f64,
    /// Weight on bit
    #[serde(rename = "wobs")]
    pub wob: f64,
    pub rpm: f64,
    pub torque: f64,
    pub flow_rate: f64,
    pub mud_density: f64,
    pub annular_pressure: f64,
}

impl RawSample {
    /// Measurements paired with their wire names, in canonical order
    pub fn fields(&self) -> [(&'static str, f64); 7] {
        [
            ("bit_depth", self.bit_depth),
            ("wobs", self.wob),
            ("rpm", self.rpm),
            ("torque", self.torque),
            ("flow_rate", self.flow_rate),
            ("mud_density", self.mud_density),
            ("annular_pressure", self.annular_pressure),
        ]
    }
}

/// Analyzer output: predicted rate of penetration plus four risk flags
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedFields {
    pub predicted_rop: f64,
    #[serde(rename = "mechanical_sticking_alert")]
    pub mechanical_sticking: bool,
    #[serde(rename = "differential_sticking_alert")]
    pub differential_sticking: bool,
    #[serde(rename = "hole_cleaning_alert")]
    pub hole_cleaning: bool,
    #[serde(rename = "mud_loss_alert")]
    pub mud_loss: bool,
}

impl DerivedFields {
    /// Alerts that are raised, in canonical order
    pub fn active_alerts(&self) -> Vec<Alert> {
        Alert::ALL
            .into_iter()
            .filter(|alert| self.is_raised(*alert))
            .collect()
    }

    /// Whether a single alert is raised
    pub fn is_raised(&self, alert: Alert) -> bool {
        match alert {
            Alert::MechanicalSticking => self.mechanical_sticking,
            Alert::DifferentialSticking => self.differential_sticking,
            Alert::HoleCleaning => self.hole_cleaning,
            Alert::MudLoss => self.mud_loss,
        }
    }

    pub fn priority(&self) -> Priority {
        Priority::from_alert_count(self.active_alerts().len())
    }
}

/// Named risk flag produced by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alert {
    #[serde(rename = "mechanical_sticking_alert")]
    MechanicalSticking,
    #[serde(rename = "differential_sticking_alert")]
    DifferentialSticking,
    #[serde(rename = "hole_cleaning_alert")]
    HoleCleaning,
    #[serde(rename = "mud_loss_alert")]
    MudLoss,
}

impl Alert {
    pub const ALL: [Alert; 4] = [
        Alert::MechanicalSticking,
        Alert::DifferentialSticking,
        Alert::HoleCleaning,
        Alert::MudLoss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Alert::MechanicalSticking => "mechanical_sticking_alert",
            Alert::DifferentialSticking => "differential_sticking_alert",
            Alert::HoleCleaning => "hole_cleaning_alert",
            Alert::MudLoss => "mud_loss_alert",
        }
    }
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational urgency derived from the number of raised alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// 0 alerts -> LOW, 1 or 2 -> MEDIUM, more than 2 -> HIGH
    pub fn from_alert_count(count: usize) -> Self {
        match count {
            0 => Priority::Low,
            1 | 2 => Priority::Medium,
            _ => Priority::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An enriched sample as persisted. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillingEvent {
    #[serde(with = "crate::time::serde_micros")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub sample: RawSample,
    #[serde(flatten)]
    pub derived: DerivedFields,
}

impl DrillingEvent {
    pub fn new(timestamp: DateTime<Utc>, sample: RawSample, derived: DerivedFields) -> Self {
        Self {
            timestamp,
            sample,
            derived,
        }
    }

    pub fn priority(&self) -> Priority {
        self.derived.priority()
    }

    /// Attach the computed priority for live delivery
    pub fn into_live(self) -> LiveEvent {
        let priority = self.priority();
        LiveEvent {
            event: self,
            priority,
        }
    }
}

/// Broadcast payload: the persisted event plus its computed priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    #[serde(flatten)]
    pub event: DrillingEvent,
    pub priority: Priority,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "open",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(AlertStatus::Open),
            "acknowledged" => Some(AlertStatus::Acknowledged),
            "resolved" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }
}

/// A strongly-connected-component cycle raised by the Cycle Detector.
///
/// Uniqueness is the canonicalized path (rotation-invariant); see
/// `cycle_detector::canonicalize_cycle`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CircularDependencyAlert {
    pub id: Uuid,
    pub cycle_path: Vec<String>,
    pub status: AlertStatus,
    pub detected_at: DateTime<Utc>,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CircularDependencyAlertRow {
    pub id: String,
    pub cycle_path: String,
    pub status: String,
    pub detected_at: DateTime<Utc>,
    pub resolution_notes: Option<String>,
}

impl CircularDependencyAlertRow {
    pub fn into_alert(self) -> CircularDependencyAlert {
        CircularDependencyAlert {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            cycle_path: serde_json::from_str(&self.cycle_path).unwrap_or_default(),
            status: AlertStatus::parse(&self.status).unwrap_or(AlertStatus::Open),
            detected_at: self.detected_at,
            resolution_notes: self.resolution_notes,
        }
    }
}

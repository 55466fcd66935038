use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use super::active_slo::SloSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SloAction {
    Accept,
    Modify,
    Reject,
    AutoApprove,
    Expire,
    DriftTriggered,
}

impl SloAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SloAction::Accept => "accept",
            SloAction::Modify => "modify",
            SloAction::Reject => "reject",
            SloAction::AutoApprove => "auto_approve",
            SloAction::Expire => "expire",
            SloAction::DriftTriggered => "drift_triggered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(SloAction::Accept),
            "modify" => Some(SloAction::Modify),
            "reject" => Some(SloAction::Reject),
            "auto_approve" => Some(SloAction::AutoApprove),
            "expire" => Some(SloAction::Expire),
            "drift_triggered" => Some(SloAction::DriftTriggered),
            _ => None,
        }
    }
}

/// An immutable, append-only audit record of an SLO lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SloAuditEntry {
    pub id: Uuid,
    pub service_id: String,
    pub action: SloAction,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub recommendation_id: Option<Uuid>,
    pub previous_slo: Option<SloSnapshot>,
    pub new_slo: Option<SloSnapshot>,
    pub selected_tier: Option<String>,
    pub rationale: Option<String>,
    pub modification_delta: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SloAuditEntryRow {
    pub id: String,
    pub service_id: String,
    pub action: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub recommendation_id: Option<String>,
    pub previous_slo: Option<String>,
    pub new_slo: Option<String>,
    pub selected_tier: Option<String>,
    pub rationale: Option<String>,
    pub modification_delta: Option<String>,
    pub insertion_seq: i64,
}

impl SloAuditEntryRow {
    pub fn into_entry(self) -> SloAuditEntry {
        SloAuditEntry {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            service_id: self.service_id,
            action: SloAction::parse(&self.action).unwrap_or(SloAction::Reject),
            actor: self.actor,
            timestamp: self.timestamp,
            recommendation_id: self
                .recommendation_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            previous_slo: self
                .previous_slo
                .and_then(|s| serde_json::from_str(&s).ok()),
            new_slo: self.new_slo.and_then(|s| serde_json::from_str(&s).ok()),
            selected_tier: self.selected_tier,
            rationale: self.rationale,
            modification_delta: self
                .modification_delta
                .and_then(|s| serde_json::from_str(&s).ok()),
        }
    }
}

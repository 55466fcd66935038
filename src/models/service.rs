use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Critical,
    High,
    Medium,
    Low,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Critical => "critical",
            Criticality::High => "high",
            Criticality::Medium => "medium",
            Criticality::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Criticality::Critical),
            "high" => Some(Criticality::High),
            "medium" => Some(Criticality::Medium),
            "low" => Some(Criticality::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Internal,
    External,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Internal => "internal",
            ServiceType::External => "external",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(ServiceType::Internal),
            "external" => Some(ServiceType::External),
            _ => None,
        }
    }
}

/// A registered microservice node in the dependency graph.
///
/// `service_id` is the stable business identifier and is immutable once
/// assigned; `id` is the internal opaque identifier used for joins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Service {
    pub id: Uuid,
    pub service_id: String,
    pub team: Option<String>,
    pub criticality: Criticality,
    pub service_type: ServiceType,
    pub published_sla: Option<f64>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub discovered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub service_id: String,
    pub team: Option<String>,
    pub criticality: String,
    pub service_type: String,
    pub published_sla: Option<f64>,
    pub metadata: String,
    pub discovered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRow {
    pub fn into_service(self) -> Result<Service, serde_json::Error> {
        Ok(Service {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            service_id: self.service_id,
            team: self.team,
            criticality: Criticality::parse(&self.criticality).unwrap_or(Criticality::Medium),
            service_type: ServiceType::parse(&self.service_type).unwrap_or(ServiceType::Internal),
            published_sla: self.published_sla,
            metadata: serde_json::from_str(&self.metadata).unwrap_or_default(),
            discovered: self.discovered,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Node payload carried by an ingestion request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ServiceNodeDto {
    pub service_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

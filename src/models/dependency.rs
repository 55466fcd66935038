use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationMode {
    Sync,
    Async,
}

impl CommunicationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationMode::Sync => "sync",
            CommunicationMode::Async => "async",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sync" => Some(CommunicationMode::Sync),
            "async" => Some(CommunicationMode::Async),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DependencyCriticality {
    Hard,
    Soft,
    Degraded,
}

impl DependencyCriticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyCriticality::Hard => "hard",
            DependencyCriticality::Soft => "soft",
            DependencyCriticality::Degraded => "degraded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hard" => Some(DependencyCriticality::Hard),
            "soft" => Some(DependencyCriticality::Soft),
            "degraded" => Some(DependencyCriticality::Degraded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Manual,
    ServiceMesh,
    OtelServiceGraph,
    Kubernetes,
}

impl DiscoverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoverySource::Manual => "manual",
            DiscoverySource::ServiceMesh => "service_mesh",
            DiscoverySource::OtelServiceGraph => "otel_service_graph",
            DiscoverySource::Kubernetes => "kubernetes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(DiscoverySource::Manual),
            "service_mesh" => Some(DiscoverySource::ServiceMesh),
            "otel_service_graph" => Some(DiscoverySource::OtelServiceGraph),
            "kubernetes" => Some(DiscoverySource::Kubernetes),
            _ => None,
        }
    }

    /// Merge priority: higher wins. See the Edge Merger component design.
    pub fn priority(&self) -> u8 {
        match self {
            DiscoverySource::Manual => 3,
            DiscoverySource::ServiceMesh => 2,
            DiscoverySource::OtelServiceGraph => 1,
            DiscoverySource::Kubernetes => 0,
        }
    }

    pub fn base_confidence(&self) -> f64 {
        match self {
            DiscoverySource::Manual => 1.00,
            DiscoverySource::ServiceMesh => 0.95,
            DiscoverySource::OtelServiceGraph => 0.85,
            DiscoverySource::Kubernetes => 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_retries")]
    pub max_retries: i32,
    #[serde(default = "RetryConfig::default_backoff_strategy")]
    pub backoff_strategy: String,
}

impl RetryConfig {
    fn default_max_retries() -> i32 {
        3
    }

    fn default_backoff_strategy() -> String {
        "exponential".to_string()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries < 0 {
            return Err("max_retries must be non-negative".to_string());
        }
        const VALID: [&str; 3] = ["exponential", "linear", "constant"];
        if !VALID.contains(&self.backoff_strategy.as_str()) {
            return Err(format!(
                "backoff_strategy must be one of {:?}, got: {}",
                VALID, self.backoff_strategy
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            backoff_strategy: Self::default_backoff_strategy(),
        }
    }
}

/// A directed edge from `source_service_id` to `target_service_id`.
///
/// Domain invariants: `source_service_id != target_service_id`;
/// `confidence_score` in `[0, 1]`; `timeout_ms > 0` when present. Uniqueness
/// is the triple (source, target, discovery_source) — see the Edge Merger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DependencyEdge {
    pub id: Uuid,
    pub source_service_id: Uuid,
    pub target_service_id: Uuid,
    pub communication_mode: CommunicationMode,
    pub criticality: DependencyCriticality,
    pub protocol: Option<String>,
    pub timeout_ms: Option<i64>,
    pub retry_config: Option<RetryConfig>,
    pub discovery_source: DiscoverySource,
    pub confidence_score: f64,
    pub observation_count: i64,
    pub redundant_group: Option<String>,
    pub last_observed_at: DateTime<Utc>,
    pub is_stale: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DependencyEdge {
    pub fn validate(&self) -> Result<(), String> {
        if self.source_service_id == self.target_service_id {
            return Err(
                "Self-loops not allowed (source_service_id == target_service_id)".to_string(),
            );
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(format!(
                "confidence_score must be between 0.0 and 1.0, got: {}",
                self.confidence_score
            ));
        }
        if let Some(t) = self.timeout_ms {
            if t <= 0 {
                return Err(format!("timeout_ms must be positive, got: {}", t));
            }
        }
        if let Some(rc) = &self.retry_config {
            rc.validate()?;
        }
        Ok(())
    }

    pub fn is_hard_sync(&self) -> bool {
        self.criticality == DependencyCriticality::Hard
            && self.communication_mode == CommunicationMode::Sync
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DependencyEdgeRow {
    pub id: String,
    pub source_service_id: String,
    pub target_service_id: String,
    pub communication_mode: String,
    #[sqlx(rename = "dependency_criticality")]
    pub criticality: String,
    pub protocol: Option<String>,
    pub timeout_ms: Option<i64>,
    pub retry_config: Option<String>,
    pub discovery_source: String,
    #[sqlx(rename = "confidence")]
    pub confidence_score: f64,
    pub observation_count: i64,
    pub redundant_group: Option<String>,
    pub last_observed_at: DateTime<Utc>,
    pub is_stale: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DependencyEdgeRow {
    pub fn into_edge(self) -> DependencyEdge {
        DependencyEdge {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            source_service_id: Uuid::parse_str(&self.source_service_id).unwrap_or_default(),
            target_service_id: Uuid::parse_str(&self.target_service_id).unwrap_or_default(),
            communication_mode: CommunicationMode::parse(&self.communication_mode)
                .unwrap_or(CommunicationMode::Sync),
            criticality: DependencyCriticality::parse(&self.criticality)
                .unwrap_or(DependencyCriticality::Hard),
            protocol: self.protocol,
            timeout_ms: self.timeout_ms,
            retry_config: self
                .retry_config
                .and_then(|s| serde_json::from_str(&s).ok()),
            discovery_source: DiscoverySource::parse(&self.discovery_source)
                .unwrap_or(DiscoverySource::Manual),
            confidence_score: self.confidence_score,
            observation_count: self.observation_count,
            redundant_group: self.redundant_group,
            last_observed_at: self.last_observed_at,
            is_stale: self.is_stale,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Edge payload carried by an ingestion request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EdgeAttributesDto {
    pub communication_mode: String,
    #[serde(default = "default_criticality_str")]
    pub criticality: String,
    pub protocol: Option<String>,
    pub timeout_ms: Option<i64>,
    pub retry_config: Option<RetryConfig>,
}

fn default_criticality_str() -> String {
    "hard".to_string()
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DependencyEdgeDto {
    pub source: String,
    pub target: String,
    pub attributes: EdgeAttributesDto,
}

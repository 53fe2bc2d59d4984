use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cases::Deadline;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSummary {
    pub total_cases: u32,
    pub total_analyses: u32,
    pub avg_analysis_time: f64,
    pub avg_decision_time: f64,
    pub upcoming_deadlines: u32,
    pub critical_deadlines: u32,
}

/// Case counts per risk bucket. The backend keys these in Polish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBreakdown {
    #[serde(rename = "niski")]
    pub low: u32,
    #[serde(rename = "średni")]
    pub medium: u32,
    #[serde(rename = "wysoki")]
    pub high: u32,
    #[serde(rename = "krytyczny")]
    pub critical: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub total_cases: u32,
    pub total_analyses: u32,
    pub avg_analysis_time: f64,
    pub avg_decision_generation_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineBuckets {
    pub upcoming: Vec<Deadline>,
    pub critical: Vec<Deadline>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruthGuardianStats {
    pub total_verifications: u32,
    pub fake_detected: u32,
    pub verified: u32,
}

/// Payload of `GET /api/dashboard/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub summary: StatsSummary,
    pub cases_by_status: HashMap<String, u32>,
    pub cases_by_type: HashMap<String, u32>,
    pub cases_by_risk: RiskBreakdown,
    pub performance_metrics: PerformanceMetrics,
    pub deadlines: DeadlineBuckets,
    pub truth_guardian: TruthGuardianStats,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineInfo {
    pub name: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GqpaStatus {
    pub available: bool,
    pub info: Option<EngineInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaStatus {
    pub status: String,
    pub using_local: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiStatus {
    pub available: bool,
    pub using_api: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailsStatus {
    pub enabled: bool,
    pub audit_log_size: u64,
}

/// Payload of `GET /api/system/status`: subsystem availability flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub gqpa: GqpaStatus,
    pub ollama: OllamaStatus,
    pub gemini: GeminiStatus,
    pub guardrails: GuardrailsStatus,
    pub timestamp: String,
}

/// Merged view of the two polled resources.
///
/// A slot that held data keeps it when its fetch fails; only a successful
/// fetch replaces it, and then wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub stats: Option<DashboardStats>,
    pub system_status: Option<SystemStatus>,
    /// Unix millis of the last cycle in which at least one fetch succeeded.
    pub last_updated: Option<u64>,
    pub error: Option<String>,
    pub loading: bool,
    /// Id of the refresh cycle that last touched this snapshot.
    pub cycle: u64,
}

/// What the dashboard should render for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotView<'a> {
    /// First load still in flight.
    Loading,
    /// Nothing to show and the last refresh failed; offer a manual retry.
    Blocked(&'a str),
    /// Refresh finished without producing statistics.
    Empty,
    /// Statistics available, possibly stale with a non-blocking error.
    Ready,
}

impl DashboardSnapshot {
    pub fn view(&self) -> SnapshotView<'_> {
        if self.stats.is_some() {
            return SnapshotView::Ready;
        }
        if self.loading {
            return SnapshotView::Loading;
        }
        match self.error.as_deref() {
            Some(err) => SnapshotView::Blocked(err),
            None => SnapshotView::Empty,
        }
    }
}

pub mod analysis;
pub mod cases;
pub mod dashboard;
pub mod scenarios;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::analysis::{AnalysisStep, StepStatus};
    use crate::dashboard::{DashboardStats, GqpaStatus, SystemStatus};
    use crate::scenarios::{ScenarioResponse, ScenarioStatistics, ScenariosData};

    /// Create a step record with a generated name.
    pub fn make_step(step: u32, status: StepStatus, progress: f64) -> AnalysisStep {
        AnalysisStep {
            step,
            name: format!("stage-{step}"),
            progress,
            status,
            error: None,
        }
    }

    /// Create dashboard statistics reporting `total_cases` cases.
    pub fn make_stats(total_cases: u32) -> DashboardStats {
        let mut stats = DashboardStats::default();
        stats.summary.total_cases = total_cases;
        stats.timestamp = "2026-01-01T00:00:00Z".to_string();
        stats
    }

    /// Create a system status with the GQPA engine flagged as `available`.
    pub fn make_status(available: bool) -> SystemStatus {
        SystemStatus {
            gqpa: GqpaStatus {
                available,
                info: None,
            },
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            ..SystemStatus::default()
        }
    }

    /// Create a scenario set with the given ids.
    pub fn make_scenarios(ids: &[&str]) -> ScenariosData {
        let scenarios: Vec<ScenarioResponse> = ids
            .iter()
            .map(|id| ScenarioResponse {
                scenario_id: id.to_string(),
                title: format!("Scenario {id}"),
                ..ScenarioResponse::default()
            })
            .collect();
        ScenariosData {
            statistics: ScenarioStatistics {
                total: scenarios.len() as u32,
                positive: scenarios.len() as u32,
                negative: 0,
            },
            scenarios,
            status: None,
            message: None,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Forecast timeframe of a scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Horizon {
    #[default]
    #[serde(rename = "12M")]
    TwelveMonths,
    #[serde(rename = "36M")]
    ThirtySixMonths,
}

impl Horizon {
    pub fn months(self) -> u32 {
        match self {
            Self::TwelveMonths => 12,
            Self::ThirtySixMonths => 36,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioType {
    #[default]
    Positive,
    Negative,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyFactor {
    pub factor: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Explainability {
    pub key_factors: Vec<KeyFactor>,
    pub logic_summary: String,
}

/// A single AI-generated policy scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioResponse {
    pub scenario_id: String,
    pub title: String,
    pub horizon: Horizon,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub drivers: Vec<String>,
    pub recommendations: Vec<String>,
    pub explainability: Explainability,
    pub scenario_type: ScenarioType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioStatistics {
    pub total: u32,
    pub positive: u32,
    pub negative: u32,
}

/// Readiness reported by `GET /api/scenarios`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioSetStatus {
    AnalysisInProgress,
    NoData,
    Ready,
}

/// The scenario set, as listed by the API or delivered by `scenarios_ready`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenariosData {
    pub scenarios: Vec<ScenarioResponse>,
    pub statistics: ScenarioStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScenarioSetStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScenariosData {
    pub fn is_in_progress(&self) -> bool {
        self.status == Some(ScenarioSetStatus::AnalysisInProgress)
    }
}

/// Upper bound of each what-if slider.
pub const MAX_WEIGHT: u8 = 100;

/// "What if" slider values sent to `/api/scenarios/update-weights`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatIfValues {
    pub energy: u8,
    pub conflict: u8,
    pub investment: u8,
}

impl Default for WhatIfValues {
    fn default() -> Self {
        Self {
            energy: 50,
            conflict: 50,
            investment: 50,
        }
    }
}

impl WhatIfValues {
    /// Returns the name of the first slider above [`MAX_WEIGHT`].
    pub fn validate(&self) -> Result<(), &'static str> {
        for (name, value) in [
            ("energy", self.energy),
            ("conflict", self.conflict),
            ("investment", self.investment),
        ] {
            if value > MAX_WEIGHT {
                return Err(name);
            }
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scenarios::ScenariosData;

/// Number of stages the analysis pipeline reports.
pub const KNOWN_STAGES: u32 = 10;

/// Discriminant carried by the terminal stream record.
pub const SCENARIOS_READY: &str = "scenarios_ready";

/// Status of a single pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Running,
    Completed,
    Error,
    #[default]
    Pending,
    /// Another client's analysis is already running; no progress follows on
    /// this connection.
    #[serde(rename = "analysis_in_progress")]
    AnalysisInProgress,
}

/// One progress report from the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStep {
    pub step: u32,
    #[serde(default)]
    pub name: String,
    /// Percentage complete within this stage (0-100).
    #[serde(default)]
    pub progress: f64,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisStep {
    /// Label for the stage: the pipeline's known name, or whatever the record carried.
    pub fn label(&self) -> &str {
        stage_label(self.step).unwrap_or(&self.name)
    }

    /// Progress clamped to the 0-100 range.
    pub fn clamped_progress(&self) -> f64 {
        self.progress.clamp(0.0, 100.0)
    }
}

/// Human-readable label of a known pipeline stage.
pub fn stage_label(step: u32) -> Option<&'static str> {
    let label = match step {
        1 => "Collecting data",
        2 => "Verifying data",
        3 => "Analyzing data",
        4 => "Building knowledge graph",
        5 => "Registering factors",
        6 => "Prioritizing facts",
        7 => "Building causal chains",
        8 => "Generating scenarios",
        9 => "Generating recommendations",
        10 => "Complete",
        _ => return None,
    };
    Some(label)
}

/// A single payload received on the analysis stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Step(AnalysisStep),
    ScenariosReady(ScenariosData),
    /// An object with an unrecognised `type` and no `step` field.
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StreamEventError {
    #[error("invalid stream payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stream payload is not a JSON object")]
    NotAnObject,
}

impl StreamEvent {
    /// Parse one payload. The `type` discriminant is checked before the
    /// presence of a `step` field.
    pub fn parse(payload: &str) -> Result<Self, StreamEventError> {
        let Value::Object(map) = serde_json::from_str::<Value>(payload)? else {
            return Err(StreamEventError::NotAnObject);
        };

        let kind = map.get("type").and_then(Value::as_str);
        if kind == Some(SCENARIOS_READY) {
            let data = match map.get("data") {
                None | Some(Value::Null) => ScenariosData::default(),
                Some(data) => ScenariosData::deserialize(data)?,
            };
            return Ok(Self::ScenariosReady(data));
        }

        if map.contains_key("step") {
            let step = AnalysisStep::deserialize(Value::Object(map))?;
            return Ok(Self::Step(step));
        }

        Ok(Self::Other(kind.unwrap_or_default().to_string()))
    }
}

use serde::{Deserialize, Serialize};

/// An administrative case tracked by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Case {
    pub case_id: String,
    #[serde(rename = "type")]
    pub case_type: String,
    pub status: String,
    pub parties: Vec<String>,
    pub deadline: Option<String>,
    pub summary: Option<String>,
    pub risk_level: String,
    pub compliance_score: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deadline {
    pub case_id: String,
    pub case_type: String,
    pub deadline: String,
    pub days_left: i64,
    pub priority: String,
    pub status: String,
}

impl Deadline {
    pub fn is_overdue(&self) -> bool {
        self.days_left < 0
    }
}

/// `{ "cases": [...] }` envelope of `GET /api/cases`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CaseList {
    pub cases: Vec<Case>,
}

/// `{ "deadlines": [...] }` envelope of `GET /api/deadlines`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeadlineList {
    pub deadlines: Vec<Deadline>,
}

/// Decision flavour accepted by `generate-decision`.
pub const DEFAULT_DECISION_TYPE: &str = "pozytywna";

/// Response of `POST /api/demo/init`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitDemoResponse {
    pub cases_added: Option<u32>,
    pub skipped: bool,
    pub existing_cases: Option<u32>,
}

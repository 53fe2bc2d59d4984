use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use tomorrow_core::cases::{Case, CaseList, Deadline, DeadlineList, InitDemoResponse};
use tomorrow_core::dashboard::{DashboardStats, SystemStatus};
use tomorrow_core::scenarios::{ScenarioResponse, ScenariosData, WhatIfValues};

use crate::config::ClientConfig;
use crate::error::ApiError;

/// HTTP client for the dashboard backend.
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
    scenario_timeout: Duration,
}

impl ApiClient {
    /// Build a client from config. There is no client-wide total timeout, so
    /// the analysis stream can stay open; other requests set their own.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|_| ApiError::InvalidUrl(config.api_base_url.clone()))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("tomorrow-client/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            scenario_timeout: Duration::from_secs(config.scenario_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, escaping each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<(RequestBuilder, String), ApiError> {
        let mut url = self.url(segments)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let path = url.path().to_string();
        Ok((self.client.request(method, url).timeout(timeout), path))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: String,
    ) -> Result<T, ApiError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status {
                path,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let (req, path) = self.request(Method::GET, segments, &[], self.request_timeout)?;
        self.send(req, path).await
    }

    async fn post<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let (req, path) = self.request(Method::POST, segments, &[], self.request_timeout)?;
        self.send(req, path).await
    }

    /// GET /api/dashboard/stats
    pub async fn fetch_dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get(&["api", "dashboard", "stats"]).await
    }

    /// GET /api/system/status
    pub async fn fetch_system_status(&self) -> Result<SystemStatus, ApiError> {
        self.get(&["api", "system", "status"]).await
    }

    /// GET /api/cases
    pub async fn fetch_cases(&self) -> Result<Vec<Case>, ApiError> {
        let list: CaseList = self.get(&["api", "cases"]).await?;
        Ok(list.cases)
    }

    /// GET /api/cases/{id}
    pub async fn fetch_case_detail(&self, case_id: &str) -> Result<serde_json::Value, ApiError> {
        self.get(&["api", "cases", case_id]).await
    }

    /// GET /api/deadlines?days_ahead=N
    pub async fn fetch_deadlines(&self, days_ahead: u32) -> Result<Vec<Deadline>, ApiError> {
        let days = days_ahead.to_string();
        let (req, path) = self.request(
            Method::GET,
            &["api", "deadlines"],
            &[("days_ahead", &days)],
            self.request_timeout,
        )?;
        let list: DeadlineList = self.send(req, path).await?;
        Ok(list.deadlines)
    }

    /// GET /api/performance
    pub async fn fetch_performance_metrics(&self) -> Result<serde_json::Value, ApiError> {
        self.get(&["api", "performance"]).await
    }

    /// POST /api/cases/{id}/analyze
    pub async fn analyze_case(&self, case_id: &str) -> Result<serde_json::Value, ApiError> {
        self.post(&["api", "cases", case_id, "analyze"]).await
    }

    /// POST /api/cases/{id}/generate-decision?decision_type=...
    pub async fn generate_decision(
        &self,
        case_id: &str,
        decision_type: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let (req, path) = self.request(
            Method::POST,
            &["api", "cases", case_id, "generate-decision"],
            &[("decision_type", decision_type)],
            self.request_timeout,
        )?;
        self.send(req, path).await
    }

    /// POST /api/demo/init
    pub async fn init_demo_data(&self) -> Result<InitDemoResponse, ApiError> {
        self.post(&["api", "demo", "init"]).await
    }

    /// GET /api/scenarios
    pub async fn fetch_scenarios(&self) -> Result<ScenariosData, ApiError> {
        let (req, path) = self.request(Method::GET, &["api", "scenarios"], &[], self.scenario_timeout)?;
        self.send(req, path).await
    }

    /// GET /api/scenarios/{id}
    pub async fn get_scenario(&self, scenario_id: &str) -> Result<ScenarioResponse, ApiError> {
        let (req, path) = self.request(
            Method::GET,
            &["api", "scenarios", scenario_id],
            &[],
            self.scenario_timeout,
        )?;
        self.send(req, path).await
    }

    /// POST /api/scenarios/{id}/accept
    pub async fn accept_scenario(&self, scenario_id: &str) -> Result<serde_json::Value, ApiError> {
        self.decide_scenario(scenario_id, "accept").await
    }

    /// POST /api/scenarios/{id}/reject
    pub async fn reject_scenario(&self, scenario_id: &str) -> Result<serde_json::Value, ApiError> {
        self.decide_scenario(scenario_id, "reject").await
    }

    async fn decide_scenario(
        &self,
        scenario_id: &str,
        verdict: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let (req, path) = self.request(
            Method::POST,
            &["api", "scenarios", scenario_id, verdict],
            &[],
            self.scenario_timeout,
        )?;
        self.send(req, path).await
    }

    /// POST /api/scenarios/update-weights. Values are checked before sending.
    pub async fn update_weights(&self, values: &WhatIfValues) -> Result<ScenariosData, ApiError> {
        values
            .validate()
            .map_err(|field| ApiError::InvalidWeights { field })?;
        let (req, path) = self.request(
            Method::POST,
            &["api", "scenarios", "update-weights"],
            &[],
            self.scenario_timeout,
        )?;
        self.send(req.json(values), path).await
    }

    /// Open GET /api/analysis/stream. The returned response body is the
    /// live event stream; it carries no total timeout.
    pub async fn open_analysis_stream(&self) -> Result<reqwest::Response, ApiError> {
        let url = self.url(&["api", "analysis", "stream"])?;
        let path = url.path().to_string();
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status {
                path,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }
}

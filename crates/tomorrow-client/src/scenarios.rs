use std::time::Duration;

use tomorrow_core::scenarios::{ScenarioResponse, ScenariosData, WhatIfValues};

use crate::api::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// Fetch the scenario list, retrying every `retry` while the backend
    /// reports `analysis_in_progress`. With `max_attempts` of `None` this
    /// waits until the analysis finishes; drop the future to give up.
    pub async fn load_scenarios_when_ready(
        &self,
        retry: Duration,
        max_attempts: Option<u32>,
    ) -> Result<ScenariosData, ApiError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let data = self.fetch_scenarios().await?;
            if !data.is_in_progress() {
                return Ok(data);
            }
            if max_attempts.is_some_and(|max| attempts >= max) {
                return Err(ApiError::StillInProgress { attempts });
            }
            tracing::info!(
                attempts,
                retry_ms = retry.as_millis() as u64,
                "Scenario analysis in progress, retrying"
            );
            tokio::time::sleep(retry).await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckAdvance {
    /// Moved to the next card.
    Next,
    /// The last card was decided; the caller should reload the deck.
    Exhausted,
}

/// Scenarios presented one card at a time, in backend order.
#[derive(Debug, Clone, Default)]
pub struct ScenarioDeck {
    scenarios: Vec<ScenarioResponse>,
    index: usize,
}

impl ScenarioDeck {
    pub fn new(data: ScenariosData) -> Self {
        Self {
            scenarios: data.scenarios,
            index: 0,
        }
    }

    /// Replace the deck with a freshly loaded set and go back to the first card.
    pub fn replace(&mut self, data: ScenariosData) {
        self.scenarios = data.scenarios;
        self.index = 0;
    }

    /// Swap in a recalculated set, staying on the same position where possible.
    pub fn reweight(&mut self, data: ScenariosData) {
        self.scenarios = data.scenarios;
        self.index = self.index.min(self.scenarios.len().saturating_sub(1));
    }

    pub fn current(&self) -> Option<&ScenarioResponse> {
        self.scenarios.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    fn advance(&mut self) -> DeckAdvance {
        if self.index + 1 < self.scenarios.len() {
            self.index += 1;
            DeckAdvance::Next
        } else {
            DeckAdvance::Exhausted
        }
    }

    /// Send the verdict for the current card and move on. Returns `None` for
    /// an empty deck. The deck does not move when the request fails.
    pub async fn decide(
        &mut self,
        api: &ApiClient,
        verdict: Verdict,
    ) -> Result<Option<DeckAdvance>, ApiError> {
        let Some(current) = self.current() else {
            return Ok(None);
        };
        let id = current.scenario_id.clone();
        match verdict {
            Verdict::Accept => api.accept_scenario(&id).await?,
            Verdict::Reject => api.reject_scenario(&id).await?,
        };
        tracing::info!(scenario = %id, ?verdict, "Scenario decided");
        Ok(Some(self.advance()))
    }

    /// Recalculate the deck from new what-if weights.
    pub async fn apply_weights(
        &mut self,
        api: &ApiClient,
        values: &WhatIfValues,
    ) -> Result<(), ApiError> {
        let updated = api.update_weights(values).await?;
        self.reweight(updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tomorrow_core::test_helpers::make_scenarios;

    use super::*;

    #[test]
    fn advance_until_exhausted() {
        let mut deck = ScenarioDeck::new(make_scenarios(&["pos_12", "neg_12", "pos_36"]));
        assert_eq!(deck.current().unwrap().scenario_id, "pos_12");
        assert_eq!(deck.advance(), DeckAdvance::Next);
        assert_eq!(deck.advance(), DeckAdvance::Next);
        assert_eq!(deck.current().unwrap().scenario_id, "pos_36");
        assert_eq!(deck.advance(), DeckAdvance::Exhausted);
        assert_eq!(deck.index(), 2);
    }

    #[test]
    fn replace_resets_reweight_clamps() {
        let mut deck = ScenarioDeck::new(make_scenarios(&["a", "b", "c"]));
        deck.advance();
        deck.advance();
        deck.reweight(make_scenarios(&["x", "y"]));
        assert_eq!(deck.current().unwrap().scenario_id, "y");

        deck.replace(make_scenarios(&["z"]));
        assert_eq!(deck.index(), 0);
        assert_eq!(deck.len(), 1);

        deck.reweight(make_scenarios(&[]));
        assert!(deck.is_empty());
        assert!(deck.current().is_none());
    }

    #[test]
    fn empty_deck_is_exhausted() {
        let mut deck = ScenarioDeck::default();
        assert_eq!(deck.advance(), DeckAdvance::Exhausted);
    }
}

pub mod api;
pub mod config;
pub mod error;
pub mod refresher;
pub mod scenarios;
pub mod sse;
pub mod stream;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError};
pub use refresher::{DashboardRefresher, DashboardSource, RefreshHandle, RefreshOutcome};
pub use scenarios::{DeckAdvance, ScenarioDeck, Verdict};
pub use stream::{AnalysisStream, StreamPhase, StreamState};

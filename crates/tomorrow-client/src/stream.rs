use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use tomorrow_core::analysis::{AnalysisStep, StepStatus, StreamEvent};
use tomorrow_core::scenarios::ScenariosData;

use crate::api::ApiClient;
use crate::sse::FrameDecoder;

/// Error shown when a step reports `error` without a message.
pub const ANALYSIS_FAILED: &str = "Analysis failed";
/// Error shown when a stream payload cannot be parsed.
pub const PARSE_FAILED: &str = "Failed to parse stream data";
/// Error shown when the stream connection fails or drops.
pub const CONNECTION_FAILED: &str = "Connection to server failed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamPhase {
    #[default]
    Idle,
    Streaming,
    Done,
    Errored,
}

/// Observable state of the analysis stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamState {
    pub phase: StreamPhase,
    /// Latest step record; kept after the session ends.
    pub current_step: Option<AnalysisStep>,
    pub scenarios: Option<ScenariosData>,
    pub error: Option<String>,
    /// Id of the session this state belongs to; bumped by every start.
    pub session: u64,
    /// Whether the session still holds an open connection.
    pub connected: bool,
}

/// Whether a session keeps reading after a payload was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

impl StreamState {
    pub fn is_streaming(&self) -> bool {
        self.phase == StreamPhase::Streaming
    }

    /// Terminal for a caller waiting on the session: no longer streaming and
    /// no connection left that could still deliver scenarios.
    pub fn is_finished(&self) -> bool {
        !self.is_streaming() && !self.connected
    }

    fn begin(&mut self, session: u64) {
        *self = StreamState {
            phase: StreamPhase::Streaming,
            session,
            ..StreamState::default()
        };
    }

    /// A session may write only while it is current and not stopped.
    fn accepts(&self, session: u64) -> bool {
        self.session == session && self.phase != StreamPhase::Idle
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.phase = StreamPhase::Errored;
        self.error = Some(message.into());
    }

    /// Apply one parsed event.
    ///
    /// A `completed` step ends the streaming phase but leaves the connection
    /// open so a trailing `scenarios_ready` is still received.
    pub fn apply(&mut self, event: StreamEvent) -> Flow {
        match event {
            StreamEvent::Step(step) => {
                let status = step.status;
                let message = step.error.clone();
                self.current_step = Some(step);
                match status {
                    StepStatus::Running | StepStatus::Pending => Flow::Continue,
                    StepStatus::Completed => {
                        if self.phase == StreamPhase::Streaming {
                            self.phase = StreamPhase::Done;
                        }
                        Flow::Continue
                    },
                    StepStatus::Error => {
                        self.fail(message.unwrap_or_else(|| ANALYSIS_FAILED.to_string()));
                        Flow::Close
                    },
                    // The running analysis belongs to another session; its
                    // scenarios are fetched from the scenario list instead.
                    StepStatus::AnalysisInProgress => {
                        if self.phase == StreamPhase::Streaming {
                            self.phase = StreamPhase::Done;
                        }
                        Flow::Close
                    },
                }
            },
            StreamEvent::ScenariosReady(data) => {
                self.scenarios = Some(data);
                self.phase = StreamPhase::Done;
                Flow::Close
            },
            StreamEvent::Other(kind) => {
                tracing::debug!(kind = %kind, "Ignoring unrecognised stream event");
                Flow::Continue
            },
        }
    }

    /// Parse and apply one raw payload. Parse failures end the session.
    pub fn apply_payload(&mut self, payload: &str) -> Flow {
        match StreamEvent::parse(payload) {
            Ok(event) => self.apply(event),
            Err(e) => {
                tracing::warn!(session = self.session, error = %e, "Failed to parse stream payload");
                self.fail(PARSE_FAILED);
                Flow::Close
            },
        }
    }
}

type SharedState = Arc<watch::Sender<StreamState>>;

/// Consumer of `GET /api/analysis/stream`.
///
/// Owns at most one connection. Starting a new session closes the previous
/// one first, and frames from a superseded session are never applied.
/// Dropping the consumer closes its session.
pub struct AnalysisStream {
    client: ApiClient,
    state: SharedState,
    task: Option<JoinHandle<()>>,
}

impl AnalysisStream {
    pub fn new(client: ApiClient) -> Self {
        let (tx, _) = watch::channel(StreamState::default());
        Self {
            client,
            state: Arc::new(tx),
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.borrow().is_streaming()
    }

    /// Open a fresh session, closing any open one and resetting step,
    /// scenarios and error. Must be called within a tokio runtime.
    pub fn start_stream(&mut self) {
        self.close_session();

        let mut session = 0;
        self.state.send_modify(|s| {
            session = s.session + 1;
            s.begin(session);
        });
        tracing::info!(session, "Starting analysis stream");

        let task = tokio::spawn(run_session(
            self.client.clone(),
            Arc::clone(&self.state),
            session,
        ));
        self.task = Some(task);
    }

    /// Close the open session, if any, and return to idle. The last step,
    /// scenarios and error remain readable.
    pub fn stop_stream(&mut self) {
        let closed = self.close_session();
        self.state.send_if_modified(|s| {
            if s.phase == StreamPhase::Idle && !s.connected {
                return false;
            }
            s.phase = StreamPhase::Idle;
            s.connected = false;
            true
        });
        if closed {
            tracing::info!(session = self.state.borrow().session, "Stopped analysis stream");
        }
    }

    /// Wait until the current session has finished.
    pub async fn finished(&self) -> StreamState {
        let mut rx = self.subscribe();
        match rx.wait_for(StreamState::is_finished).await {
            Ok(state) => StreamState::clone(&state),
            Err(_) => self.state(),
        }
    }

    fn close_session(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            },
            None => false,
        }
    }
}

impl Drop for AnalysisStream {
    fn drop(&mut self) {
        self.close_session();
    }
}

/// Clears `connected` when the session task ends, including by abort.
struct SessionGuard {
    state: SharedState,
    session: u64,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.send_if_modified(|s| {
            if s.session == self.session && s.connected {
                s.connected = false;
                true
            } else {
                false
            }
        });
    }
}

async fn run_session(client: ApiClient, state: SharedState, session: u64) {
    let _guard = SessionGuard {
        state: Arc::clone(&state),
        session,
    };

    let resp = match client.open_analysis_stream().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(session, error = %e, "Failed to open analysis stream");
            fail_transport(&state, session);
            return;
        },
    };

    let still_current = state.send_if_modified(|s| {
        if !s.accepts(session) {
            return false;
        }
        s.connected = true;
        true
    });
    if !still_current {
        return;
    }

    let mut body = resp.bytes_stream();
    let mut decoder = FrameDecoder::new();
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(session, error = %e, "Analysis stream read failed");
                fail_transport(&state, session);
                return;
            },
        };
        let payloads = match decoder.push(&chunk) {
            Ok(payloads) => payloads,
            Err(e) => {
                tracing::warn!(session, error = %e, "Analysis stream framing failed");
                state.send_if_modified(|s| {
                    if !s.accepts(session) {
                        return false;
                    }
                    s.fail(PARSE_FAILED);
                    true
                });
                return;
            },
        };
        for payload in payloads {
            if apply(&state, session, &payload) == Flow::Close {
                tracing::info!(session, "Closing analysis stream");
                return;
            }
        }
    }

    if let Some(payload) = decoder.finish()
        && apply(&state, session, &payload) == Flow::Close
    {
        return;
    }

    // Server closed the body. Only an unfinished session treats that as an error.
    if fail_transport(&state, session) {
        tracing::warn!(session, "Analysis stream ended before completion");
    } else {
        tracing::info!(session, "Analysis stream closed by server");
    }
}

fn apply(state: &SharedState, session: u64, payload: &str) -> Flow {
    let mut flow = Flow::Close;
    state.send_if_modified(|s| {
        if !s.accepts(session) {
            return false;
        }
        flow = s.apply_payload(payload);
        true
    });
    flow
}

/// A transport failure only errors a session that is still streaming; after
/// a `completed` step the analysis result stands.
fn fail_transport(state: &SharedState, session: u64) -> bool {
    state.send_if_modified(|s| {
        if !s.accepts(session) || !s.is_streaming() {
            return false;
        }
        s.fail(CONNECTION_FAILED);
        true
    })
}

mod args;

use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tomorrow_client::{
    AnalysisStream, ApiClient, ApiError, ClientConfig, ConfigError, DashboardRefresher,
    StreamPhase, StreamState,
};
use tomorrow_core::analysis::{KNOWN_STAGES, StepStatus};
use tomorrow_core::dashboard::{DashboardSnapshot, SnapshotView};
use tomorrow_core::scenarios::ScenariosData;
use tomorrow_core::time::age_secs;

use args::{Command, USAGE};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let invocation = args::parse(std::env::args().skip(1));
    let json_logs = invocation.as_ref().is_ok_and(|inv| inv.json_logs);
    init_tracing(json_logs);

    let invocation = match invocation {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        },
    };

    match run(invocation.command).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(json: bool) {
    // Logs go to stderr so command output on stdout stays machine-readable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(command: Command) -> Result<ExitCode, CliError> {
    let config = ClientConfig::load();
    config.validate()?;
    let api = ApiClient::new(&config)?;
    tracing::debug!(base_url = %api.base_url(), ?command, "Running command");

    match command {
        Command::Watch => watch(api, &config).await,
        Command::Stream => return Ok(stream(api).await),
        Command::Cases => print_json(&api.fetch_cases().await?)?,
        Command::Deadlines { days } => {
            let days = days.unwrap_or(config.deadline_days_ahead);
            print_json(&api.fetch_deadlines(days).await?)?;
        },
        Command::Scenarios => {
            let load = api.load_scenarios_when_ready(config.scenario_retry(), None);
            tokio::select! {
                data = load => print_scenarios(&data?),
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted while waiting for scenarios");
                    return Ok(ExitCode::FAILURE);
                },
            }
        },
        Command::Accept { id } => print_json(&api.accept_scenario(&id).await?)?,
        Command::Reject { id } => print_json(&api.reject_scenario(&id).await?)?,
        Command::Weights(values) => print_scenarios(&api.update_weights(&values).await?),
        Command::InitDemo => {
            let resp = api.init_demo_data().await?;
            if resp.skipped {
                println!(
                    "Demo data already present ({} cases)",
                    resp.existing_cases.unwrap_or_default()
                );
            } else {
                println!("Added {} demo cases", resp.cases_added.unwrap_or_default());
            }
        },
        Command::Analyze { id } => print_json(&api.analyze_case(&id).await?)?,
        Command::Decide { id, decision_type } => {
            print_json(&api.generate_decision(&id, &decision_type).await?)?;
        },
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_scenarios(data: &ScenariosData) {
    let stats = &data.statistics;
    println!(
        "{} scenarios ({} positive, {} negative)",
        data.scenarios.len(),
        stats.positive,
        stats.negative
    );
    for s in &data.scenarios {
        println!(
            "  {:<12} {:>2}M {:?}/{:?} confidence {:.0}%  {}",
            s.scenario_id,
            s.horizon.months(),
            s.scenario_type,
            s.risk_level,
            s.confidence * 100.0,
            s.title
        );
    }
    if let Some(message) = &data.message {
        println!("  {message}");
    }
}

async fn watch(api: ApiClient, config: &ClientConfig) {
    let refresher = Arc::new(DashboardRefresher::new(api));
    let mut rx = refresher.subscribe();
    let handle = Arc::clone(&refresher).spawn(config.refresh_interval());
    tracing::info!(
        interval_secs = config.refresh_interval_secs,
        "Watching dashboard, Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                report_snapshot(&snapshot);
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.cancel();
}

fn report_snapshot(snapshot: &DashboardSnapshot) {
    match snapshot.view() {
        SnapshotView::Loading => tracing::debug!(cycle = snapshot.cycle, "Refreshing"),
        SnapshotView::Blocked(error) => println!("Dashboard unavailable: {error}"),
        SnapshotView::Empty => println!("No dashboard data"),
        SnapshotView::Ready if snapshot.loading => {},
        SnapshotView::Ready => {
            let Some(stats) = &snapshot.stats else {
                return;
            };
            let summary = &stats.summary;
            let engine = match &snapshot.system_status {
                Some(status) if status.gqpa.available => "online",
                Some(_) => "offline",
                None => "unknown",
            };
            let age = snapshot.last_updated.map(age_secs).unwrap_or_default();
            println!(
                "cases {} | analyses {} | deadlines {} ({} critical) | engine {} | updated {}s ago",
                summary.total_cases,
                summary.total_analyses,
                summary.upcoming_deadlines,
                summary.critical_deadlines,
                engine,
                age
            );
            if let Some(error) = &snapshot.error {
                println!("  stale: {error}");
            }
        },
    }
}

async fn stream(api: ApiClient) -> ExitCode {
    let mut stream = AnalysisStream::new(api);
    let mut rx = stream.subscribe();
    stream.start_stream();

    let mut last_step = None;
    let state = loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break stream.state();
                }
            },
            _ = tokio::signal::ctrl_c() => {
                stream.stop_stream();
                break stream.state();
            },
        }
        let state = rx.borrow_and_update().clone();
        if let Some(step) = &state.current_step
            && last_step.as_ref() != Some(step)
        {
            println!(
                "[{:>2}/{KNOWN_STAGES}] {:<40} {:>3.0}%",
                step.step,
                step.label(),
                step.clamped_progress()
            );
            last_step = Some(step.clone());
        }
        if state.is_finished() {
            break state;
        }
    };
    report_stream_end(&state)
}

fn report_stream_end(state: &StreamState) -> ExitCode {
    match state.phase {
        StreamPhase::Done => {
            let busy = state
                .current_step
                .as_ref()
                .is_some_and(|step| step.status == StepStatus::AnalysisInProgress);
            match &state.scenarios {
                Some(scenarios) => print_scenarios(scenarios),
                None if busy => println!("Analysis already running; see `tomorrow scenarios`"),
                None => println!("Analysis completed"),
            }
            ExitCode::SUCCESS
        },
        StreamPhase::Errored => {
            println!(
                "Analysis failed: {}",
                state.error.as_deref().unwrap_or("unknown error")
            );
            ExitCode::FAILURE
        },
        StreamPhase::Idle | StreamPhase::Streaming => {
            println!("Analysis stream stopped");
            ExitCode::FAILURE
        },
    }
}

use std::collections::HashMap;

use tomorrow_core::cases::DEFAULT_DECISION_TYPE;
use tomorrow_core::scenarios::WhatIfValues;

pub const USAGE: &str = "\
usage: tomorrow [--json] <command> [--flag=value ...]

commands:
  watch                                   poll dashboard stats until Ctrl-C
  stream                                  follow the analysis stream
  cases                                   list cases
  deadlines [--days=N]                    list upcoming deadlines
  scenarios                               list scenarios, waiting for analysis
  accept --id=ID                          accept a scenario
  reject --id=ID                          reject a scenario
  weights [--energy=N] [--conflict=N] [--investment=N]
                                          recalculate scenarios (0-100 each)
  init-demo                               load demo cases
  analyze --id=ID                         analyze a case
  decide --id=ID [--type=TYPE]            generate a decision draft";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Watch,
    Stream,
    Cases,
    Deadlines { days: Option<u32> },
    Scenarios,
    Accept { id: String },
    Reject { id: String },
    Weights(WhatIfValues),
    InitDemo,
    Analyze { id: String },
    Decide { id: String, decision_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("no command given")]
    MissingCommand,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{command}' requires --{flag}=...")]
    MissingFlag {
        command: &'static str,
        flag: &'static str,
    },

    #[error("invalid value '{value}' for --{flag}")]
    InvalidValue { flag: String, value: String },

    #[error("unexpected argument '{0}'")]
    Unexpected(String),
}

/// Parse `[--json] <command> [--flag=value ...]`. Flags may appear in any order.
pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Invocation, UsageError> {
    let mut json_logs = false;
    let mut command = None;
    let mut flags = HashMap::new();

    for arg in args {
        if arg == "--json" {
            json_logs = true;
        } else if let Some(flag) = arg.strip_prefix("--") {
            match flag.split_once('=') {
                Some((key, value)) => {
                    flags.insert(key.to_string(), value.to_string());
                },
                None => return Err(UsageError::Unexpected(arg)),
            }
        } else if command.is_none() {
            command = Some(arg);
        } else {
            return Err(UsageError::Unexpected(arg));
        }
    }

    let name = command.ok_or(UsageError::MissingCommand)?;
    let mut flags = Flags(flags);
    let command = match name.as_str() {
        "watch" => Command::Watch,
        "stream" => Command::Stream,
        "cases" => Command::Cases,
        "deadlines" => Command::Deadlines {
            days: flags.parsed("days")?,
        },
        "scenarios" => Command::Scenarios,
        "accept" => Command::Accept {
            id: flags.required("accept", "id")?,
        },
        "reject" => Command::Reject {
            id: flags.required("reject", "id")?,
        },
        "weights" => {
            let defaults = WhatIfValues::default();
            Command::Weights(WhatIfValues {
                energy: flags.parsed("energy")?.unwrap_or(defaults.energy),
                conflict: flags.parsed("conflict")?.unwrap_or(defaults.conflict),
                investment: flags.parsed("investment")?.unwrap_or(defaults.investment),
            })
        },
        "init-demo" => Command::InitDemo,
        "analyze" => Command::Analyze {
            id: flags.required("analyze", "id")?,
        },
        "decide" => Command::Decide {
            id: flags.required("decide", "id")?,
            decision_type: flags
                .take("type")
                .unwrap_or_else(|| DEFAULT_DECISION_TYPE.to_string()),
        },
        _ => return Err(UsageError::UnknownCommand(name)),
    };

    if let Some(key) = flags.0.into_keys().next() {
        return Err(UsageError::Unexpected(format!("--{key}")));
    }
    Ok(Invocation { command, json_logs })
}

struct Flags(HashMap<String, String>);

impl Flags {
    fn take(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    fn required(&mut self, command: &'static str, flag: &'static str) -> Result<String, UsageError> {
        self.take(flag)
            .filter(|v| !v.is_empty())
            .ok_or(UsageError::MissingFlag { command, flag })
    }

    fn parsed<T: std::str::FromStr>(&mut self, flag: &str) -> Result<Option<T>, UsageError> {
        match self.take(flag) {
            Some(value) => value.parse().map(Some).map_err(|_| UsageError::InvalidValue {
                flag: flag.to_string(),
                value,
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(line: &str) -> Result<Invocation, UsageError> {
        parse(line.split_whitespace().map(String::from))
    }

    #[test]
    fn plain_commands() {
        assert_eq!(parse_str("watch").unwrap().command, Command::Watch);
        assert_eq!(parse_str("init-demo").unwrap().command, Command::InitDemo);
        assert_eq!(
            parse_str("deadlines").unwrap().command,
            Command::Deadlines { days: None }
        );
    }

    #[test]
    fn json_flag_anywhere() {
        let inv = parse_str("stream --json").unwrap();
        assert!(inv.json_logs);
        assert_eq!(inv.command, Command::Stream);
        assert!(parse_str("--json cases").unwrap().json_logs);
    }

    #[test]
    fn flags_with_values() {
        assert_eq!(
            parse_str("deadlines --days=7").unwrap().command,
            Command::Deadlines { days: Some(7) }
        );
        assert_eq!(
            parse_str("decide --type=negatywna --id=SPR-1").unwrap().command,
            Command::Decide {
                id: "SPR-1".to_string(),
                decision_type: "negatywna".to_string()
            }
        );
        assert_eq!(
            parse_str("decide --id=SPR-1").unwrap().command,
            Command::Decide {
                id: "SPR-1".to_string(),
                decision_type: DEFAULT_DECISION_TYPE.to_string()
            }
        );
    }

    #[test]
    fn weights_default_missing_sliders() {
        let Command::Weights(values) = parse_str("weights --energy=90").unwrap().command else {
            panic!("expected weights");
        };
        assert_eq!(values.energy, 90);
        assert_eq!(values.conflict, 50);
        assert_eq!(values.investment, 50);
    }

    #[test]
    fn usage_errors() {
        assert_eq!(parse_str(""), Err(UsageError::MissingCommand));
        assert_eq!(
            parse_str("launch"),
            Err(UsageError::UnknownCommand("launch".to_string()))
        );
        assert_eq!(
            parse_str("accept"),
            Err(UsageError::MissingFlag {
                command: "accept",
                flag: "id"
            })
        );
        assert_eq!(
            parse_str("accept --id="),
            Err(UsageError::MissingFlag {
                command: "accept",
                flag: "id"
            })
        );
        assert!(matches!(
            parse_str("deadlines --days=soon"),
            Err(UsageError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_str("weights --energy=300"),
            Err(UsageError::InvalidValue { .. })
        ));
        assert_eq!(
            parse_str("cases --id=1"),
            Err(UsageError::Unexpected("--id".to_string()))
        );
        assert_eq!(
            parse_str("cases extra"),
            Err(UsageError::Unexpected("extra".to_string()))
        );
    }
}

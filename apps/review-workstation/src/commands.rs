use fraud_review_client::ReviewActionKind;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  select <transaction_id>   open a queued case
  approve [notes]           approve the selected case
  reject [notes]            reject the selected case
  analyst <name>            change the analyst recorded on actions
  review | monitoring       switch view
  refresh                   refresh the active view
  help                      show this help
  quit                      exit
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Select(String),
    Act {
        action: ReviewActionKind,
        notes: Option<String>,
    },
    Analyst(String),
    Review,
    Monitoring,
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
}

impl WatchCommand {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));
        let argument = (!rest.is_empty()).then(|| rest.to_string());

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(CommandParseError::Empty),
            "select" | "open" => argument
                .map(Self::Select)
                .ok_or(CommandParseError::MissingArgument("select")),
            "analyst" => argument
                .map(Self::Analyst)
                .ok_or(CommandParseError::MissingArgument("analyst")),
            "review" | "queue" => Ok(Self::Review),
            "monitoring" | "monitor" => Ok(Self::Monitoring),
            "refresh" | "r" => Ok(Self::Refresh),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => match ReviewActionKind::parse(other) {
                Some(action) => Ok(Self::Act {
                    action,
                    notes: argument,
                }),
                None => Err(CommandParseError::Unknown(other.to_string())),
            },
        }
    }
}

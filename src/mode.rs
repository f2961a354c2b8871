use std::fmt;
use std::str::FromStr;

/// Completion policy: which terminal [`Event`](crate::Event)s are surfaced
/// by [`Engine::execute`](crate::Engine::execute) for a given task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    /// Report exactly one result per task: the first success if any,
    /// otherwise the chronologically last error.
    FirstSuccessOrLastResult,
    /// Report every error seen, then the first success (if any); nothing
    /// further for that task.
    ResultsUntilFirstSuccess,
    /// Report every success and every error; ignore cancellations.
    SuccessOrErrorResults,
    /// Report every terminal event, including cancellations.
    AllResults,
}

/// Error returned by [`Mode::from_str`] for an unrecognized alias.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized mode alias: {0:?}")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "FirstSuccessOrLastError" => Ok(Mode::FirstSuccessOrLastResult),
            "U" | "UntilFirstSuccess" => Ok(Mode::ResultsUntilFirstSuccess),
            "A" | "All" => Ok(Mode::AllResults),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = match self {
            Mode::FirstSuccessOrLastResult => "FirstSuccessOrLastError",
            Mode::ResultsUntilFirstSuccess => "UntilFirstSuccess",
            Mode::SuccessOrErrorResults => "SuccessOrErrorResults",
            Mode::AllResults => "All",
        };
        f.write_str(alias)
    }
}

//! Error types for the survey aggregation library
//!
//! Empty cohorts, failed constraints and cohorts below the disclosure threshold are
//! policy outcomes reported through [`crate::result::AggregateResult`]; nothing in this
//! module is raised for them.

use crate::engine::PartyId;

/// Errors surfaced by a [`crate::engine::SecretEngine`] implementation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown party: {0}")]
    UnknownParty(PartyId),
    #[error("input shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("party {0} already submitted its input")]
    DuplicateSubmission(PartyId),
    #[error("open requested without any revealer")]
    NoRevealers,
    #[error("party {0} is not allowed to reveal values")]
    NotRevealer(PartyId),
    #[error("opened value does not fit in a signed 64-bit integer")]
    Overflow,
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised while managing the participant roster of a computation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("the roster is closed; the computation has already begun")]
    RosterClosed,
    #[error("the begin signal was already sent for this computation")]
    AlreadyStarted,
    #[error("the computation was dropped before it began")]
    Abandoned,
}

/// Errors raised while loading or validating an [`crate::config::AggregationConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Invalid(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the respondent-side encoder before anything is shared.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RespondentError {
    #[error("missing answer for required question {0}")]
    MissingAnswer(String),
    #[error("answer to question {0} has the wrong kind")]
    WrongKind(String),
    #[error("question {question} expects {expected} entries, got {found}")]
    WrongLength {
        question: String,
        expected: usize,
        found: usize,
    },
    #[error("question {0} only accepts 0/1 selections")]
    NotBoolean(String),
    #[error("answer {value} to question {question} is out of range")]
    OutOfRange { question: String, value: i64 },
    #[error("question {question} allows {min}..={max} selections, got {found}")]
    SelectionCount {
        question: String,
        min: usize,
        max: usize,
        found: usize,
    },
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Errors that abort an aggregation run.
#[derive(thiserror::Error, Debug)]
pub enum AggregationError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error(
        "malformed response from {party} to question {question}: expected {expected} entries, found {found}"
    )]
    MalformedResponse {
        question: usize,
        party: PartyId,
        expected: usize,
        found: usize,
    },
    #[error("timed out waiting for shares from {party}")]
    Timeout { party: PartyId },
    #[error("the orchestrator has already run")]
    AlreadyRun,
}

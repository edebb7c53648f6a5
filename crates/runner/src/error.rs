//! Error types for loading and running JSON UI tests

use std::path::PathBuf;

use thiserror::Error;

use crate::driver::DriverError;

#[derive(Error, Debug)]
pub enum RunnerError {
    // Definition errors (raised while loading a test file)
    #[error("Test file '{path}' is missing 'type' field")]
    MissingType { path: String },

    #[error("Unknown test type '{kind}' in file '{path}'")]
    UnknownType { kind: String, path: String },

    #[error("{kind} test '{path}' is missing '{field}' field")]
    MissingField {
        kind: &'static str,
        path: String,
        field: &'static str,
    },

    #[error("Screen test '{0}' has no test cases")]
    NoCases(String),

    #[error("Flow test '{0}' has no steps")]
    NoSteps(String),

    #[error("Invalid test definition '{path}': {source}")]
    Definition {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read test file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Reference errors (raised while composing a flow)
    #[error("Test file not found: {0}")]
    TestFileNotFound(String),

    #[error("Test case '{case}' not found in file: {file}")]
    CaseNotFound { case: String, file: String },

    #[error("File reference must point to a screen test: {0}")]
    NotAScreenTest(String),

    // Precondition errors (raised at dispatch)
    #[error("Step must have either 'action' or 'assert'")]
    StepKindMissing,

    #[error("Step must have either 'action' or 'assert', not both")]
    StepKindConflict,

    #[error("{operation} requires '{field}'")]
    MissingStepField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("{operation} has invalid '{field}': {reason}")]
    InvalidStepField {
        operation: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown assertion: {0}")]
    UnknownAssertion(String),

    // Expectation not met
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    // Driver / environment
    #[error("None of elements [{ids}] appeared within {timeout_ms}ms")]
    WaitTimeout { ids: String, timeout_ms: u64 },

    #[error("Text '{target}' not found in element text '{text}'")]
    TextPortionNotFound { target: String, text: String },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RunnerError {
    /// Whether this error comes from a step that could not be dispatched at all,
    /// as opposed to one that ran and failed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            RunnerError::StepKindMissing
                | RunnerError::StepKindConflict
                | RunnerError::MissingStepField { .. }
                | RunnerError::InvalidStepField { .. }
                | RunnerError::UnknownAction(_)
                | RunnerError::UnknownAssertion(_)
        )
    }

    /// Whether this error was raised while resolving a flow file reference.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            RunnerError::TestFileNotFound(_)
                | RunnerError::CaseNotFound { .. }
                | RunnerError::NotAScreenTest(_)
        )
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;

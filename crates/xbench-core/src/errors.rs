//! Structured error types shared across xbench crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`BenchError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (case ids, engine names, paths, line numbers).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the benchmark harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum BenchError {
    /// Malformed command file or engine configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// A command line matched no registered engine.
    #[error("unknown engine: {0}")]
    UnknownEngine(ErrorInfo),
    /// Run directory collision, creation or preparation failure.
    #[error("run directory error: {0}")]
    RunDir(ErrorInfo),
    /// A quantity could not be obtained from any lookup source.
    #[error("extraction error: {0}")]
    Extraction(ErrorInfo),
    /// Filesystem errors outside of a run directory (reports, outputs).
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl BenchError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            BenchError::Config(info)
            | BenchError::UnknownEngine(info)
            | BenchError::RunDir(info)
            | BenchError::Extraction(info)
            | BenchError::Io(info)
            | BenchError::Serde(info) => info,
        }
    }

    /// Stable machine readable code of the underlying payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Whether the error must abort the whole benchmark before any launch.
    ///
    /// Only configuration problems are fatal; everything else is scoped to a
    /// single command, run or quantity and is recorded in the report.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BenchError::Config(_))
    }

    /// Short lowercase label of the error family, used in reports and logs.
    pub fn family(&self) -> &'static str {
        match self {
            BenchError::Config(_) => "config",
            BenchError::UnknownEngine(_) => "unknown_engine",
            BenchError::RunDir(_) => "run_dir",
            BenchError::Extraction(_) => "extraction",
            BenchError::Io(_) => "io",
            BenchError::Serde(_) => "serde",
        }
    }
}

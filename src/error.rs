use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Stage of an orchestrated dub, attached to failures for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Poll,
    Link,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Submit => write!(f, "submit"),
            Stage::Poll => write!(f, "poll"),
            Stage::Link => write!(f, "link"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DubError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Token rejected twice during {operation}")]
    AuthorizationRetryExhausted { operation: String },

    #[error("Job submission failed: {0}")]
    Submission(String),

    #[error("Job lookup failed: {0}")]
    Lookup(String),

    #[error("Sharing link generation failed: {0}")]
    LinkGeneration(String),

    #[error("Job {correlation_id} did not finish within {waited:?}")]
    TimedOut {
        correlation_id: String,
        waited: Duration,
    },

    #[error("Remote job {job_id} reported FAILED")]
    RemoteJobFailed { job_id: String },

    /// A failure during orchestration. `project_id` names the remote job
    /// once one has been created.
    #[error("{} stage{}: {}", .stage, project_suffix(.project_id), .source)]
    Stage {
        stage: Stage,
        project_id: Option<String>,
        source: Box<DubError>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl DubError {
    /// Wrap this error with the orchestration stage it came from.
    pub fn in_stage(self, stage: Stage) -> Self {
        DubError::Stage {
            stage,
            project_id: None,
            source: Box::new(self),
        }
    }

    /// Wrap this error with its stage and the remote job it concerns.
    pub fn in_project_stage(self, stage: Stage, project_id: impl Into<String>) -> Self {
        DubError::Stage {
            stage,
            project_id: Some(project_id.into()),
            source: Box::new(self),
        }
    }

    /// The innermost error, with stage wrappers peeled off.
    pub fn root(&self) -> &DubError {
        match self {
            DubError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// The remote job a stage failure concerns, if one had been created.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            DubError::Stage { project_id, .. } => project_id.as_deref(),
            _ => None,
        }
    }

    /// The stage that failed, if this error was raised during orchestration.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DubError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

fn project_suffix(project_id: &Option<String>) -> String {
    project_id
        .as_deref()
        .map(|id| format!(" (project {})", id))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, DubError>;

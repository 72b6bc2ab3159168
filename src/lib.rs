pub mod api;
pub mod config;
pub mod error;
pub mod interactive;
pub mod pipeline;
pub mod poll;

pub use api::{DubbingClient, Job, JobStatus, Session};
pub use config::{Credentials, Settings};
pub use error::{DubError, Result, Stage};
pub use pipeline::{print_summary, DubRequest, DubResult, DubStats, Dubber};
pub use poll::{Clock, CompletionPoller, PollConfig, PollOutcome, PollState, TokioClock};

//! SpeechLab HTTP API: transport, session handling, and the job endpoints.

pub mod client;
pub mod models;
pub mod session;
pub mod transport;

pub use client::{DubbingClient, SubmitJob};
pub use models::{
    normalize_language, truncate_name, Dub, DubJobRequest, Job, JobStatus, Media, Translation,
};
pub use session::{Authenticator, Session};
pub use transport::{Transport, TransportError};

use crate::api::models::{
    normalize_language, truncate_name, CreateDubResponse, DubJobRequest, GenerateLinkRequest,
    GenerateLinkResponse, Job, ProjectsResponse,
};
use crate::api::session::{Authenticator, Session};
use crate::api::transport::{Transport, TransportError};
use crate::config::{Credentials, Settings, VoiceMatchingMode};
use crate::error::{DubError, Result};
use crate::poll::JobLookup;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

const CREATE_DUB_PATH: &str = "/v1/projects/createProjectAndDub";
const PROJECTS_PATH: &str = "/v1/projects";
const SHARING_LINK_PATH: &str = "/v1/collaborations/generateSharingLink";

/// Initial attempt plus one retry after a rejected token.
const MAX_ATTEMPTS: u32 = 2;

/// Parameters for one dubbing job submission.
#[derive(Debug, Clone)]
pub struct SubmitJob<'a> {
    pub audio_url: &'a str,
    pub project_name: &'a str,
    pub target_language: &'a str,
    pub correlation_id: &'a str,
    pub source_language: &'a str,
}

/// Authenticated SpeechLab API client.
#[derive(Debug, Clone)]
pub struct DubbingClient {
    transport: Transport,
    auth: Authenticator,
    credentials: Credentials,
    unit_type: String,
    voice_matching_mode: VoiceMatchingMode,
}

impl DubbingClient {
    /// Create a client that caches its token in `session`.
    pub fn new(transport: Transport, session: Arc<Session>, credentials: Credentials) -> Self {
        Self {
            auth: Authenticator::new(transport.clone(), session),
            transport,
            credentials,
            unit_type: "whiteGlove".to_string(),
            voice_matching_mode: VoiceMatchingMode::default(),
        }
    }

    /// Build a client from loaded settings.
    pub fn from_settings(settings: &Settings, session: Arc<Session>) -> Result<Self> {
        let transport = Transport::new(settings.base_url.clone(), settings.request_timeout())?;
        Ok(Self::new(transport, session, settings.credentials()?)
            .with_unit_type(settings.unit_type.clone())
            .with_voice_matching_mode(settings.voice_matching_mode))
    }

    pub fn with_unit_type(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = unit_type.into();
        self
    }

    pub fn with_voice_matching_mode(mut self, mode: VoiceMatchingMode) -> Self {
        self.voice_matching_mode = mode;
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.credentials.email.trim().is_empty() && !self.credentials.password.is_empty()
    }

    pub fn session(&self) -> &Arc<Session> {
        self.auth.session()
    }

    /// Obtain a token, logging in if none is cached.
    pub async fn authenticate(&self) -> Result<String> {
        self.auth.token(&self.credentials).await
    }

    /// Build the create-job body with name truncation and language mapping applied.
    pub fn build_request(&self, job: &SubmitJob<'_>) -> DubJobRequest {
        let api_language = normalize_language(job.target_language);
        if api_language != job.target_language {
            debug!(
                "Mapped target language {} to API code {}",
                job.target_language, api_language
            );
        }

        DubJobRequest {
            name: truncate_name(job.project_name),
            source_language: job.source_language.to_string(),
            target_language: api_language.to_string(),
            dub_accent: api_language.to_string(),
            unit_type: self.unit_type.clone(),
            media_uri: job.audio_url.to_string(),
            voice_matching_mode: self.voice_matching_mode.to_string(),
            correlation_id: job.correlation_id.to_string(),
        }
    }

    /// Create a dubbing job and return its remote id.
    pub async fn submit(&self, job: &SubmitJob<'_>) -> Result<String> {
        info!(
            "Creating dubbing project \"{}\" ({} -> {}, correlation id {})",
            job.project_name, job.source_language, job.target_language, job.correlation_id
        );

        let payload = self.build_request(job);
        debug!("Create project payload: {:?}", payload);

        let transport = &self.transport;
        let body = &payload;
        let response: CreateDubResponse = self
            .with_auth_retry("project creation", DubError::Submission, move |token| async move {
                transport.post_json(CREATE_DUB_PATH, body, Some(&token)).await
            })
            .await?;

        match response.project_id {
            Some(id) if !id.is_empty() => {
                info!(
                    "Created project {} (correlation id {})",
                    id, job.correlation_id
                );
                Ok(id)
            }
            _ => Err(DubError::Submission(
                "projectId not found in response".to_string(),
            )),
        }
    }

    /// Look up a job by correlation id. `Ok(None)` means no job matched yet.
    pub async fn fetch(&self, correlation_id: &str) -> Result<Option<Job>> {
        debug!("Fetching project for correlation id {}", correlation_id);

        let transport = &self.transport;
        let query = [
            ("sortBy", "createdAt:asc"),
            ("limit", "10"),
            ("page", "1"),
            ("expand", "true"),
            ("thirdPartyIDs", correlation_id),
        ];
        let query = &query[..];

        let response: ProjectsResponse = self
            .with_auth_retry("project lookup", DubError::Lookup, move |token| async move {
                transport.get_json(PROJECTS_PATH, query, Some(&token)).await
            })
            .await?;

        if response.results.len() > 1 {
            warn!(
                "{} projects share correlation id {}, using the first",
                response.results.len(),
                correlation_id
            );
        }

        match response.results.into_iter().next() {
            Some(job) => {
                debug!(
                    "Found project {} ({}): status {}, name {:?}, {} -> {}, {} media",
                    job.id,
                    correlation_id,
                    job.status,
                    job.name.as_deref().unwrap_or("Unknown"),
                    job.source_language.as_deref().unwrap_or("Unknown"),
                    job.target_language.as_deref().unwrap_or("Unknown"),
                    job.media_count()
                );
                Ok(Some(job))
            }
            None => {
                debug!(
                    "No project matches correlation id {} (total results: {:?})",
                    correlation_id, response.total_results
                );
                Ok(None)
            }
        }
    }

    /// Request a sharing link for a job.
    pub async fn generate_link(&self, job_id: &str) -> Result<String> {
        info!("Generating sharing link for project {}", job_id);

        let transport = &self.transport;
        let payload = GenerateLinkRequest { project_id: job_id };
        let body = &payload;
        let response: GenerateLinkResponse = self
            .with_auth_retry(
                "sharing link generation",
                DubError::LinkGeneration,
                move |token| async move {
                    transport.post_json(SHARING_LINK_PATH, body, Some(&token)).await
                },
            )
            .await?;

        match response.link {
            Some(link) if !link.is_empty() => {
                info!("Generated sharing link for project {}", job_id);
                Ok(link)
            }
            _ => Err(DubError::LinkGeneration(
                "link not found in response".to_string(),
            )),
        }
    }

    /// Run `call` with a bearer token, retrying once with a fresh token if the
    /// server rejects the first one.
    ///
    /// Non-authorization failures are logged and mapped through `on_error`.
    async fn with_auth_retry<T, F, Fut>(
        &self,
        operation: &str,
        on_error: fn(String) -> DubError,
        call: F,
    ) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        let mut attempt = 1;
        loop {
            let token = self.auth.token(&self.credentials).await?;

            match call(token).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_unauthorized() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "Token rejected during {} (attempt {}), re-authenticating",
                        operation, attempt
                    );
                    self.auth.session().invalidate().await;
                    attempt += 1;
                }
                Err(e) if e.is_unauthorized() => {
                    e.log(operation);
                    self.auth.session().invalidate().await;
                    return Err(DubError::AuthorizationRetryExhausted {
                        operation: operation.to_string(),
                    });
                }
                Err(e) => {
                    e.log(&format!("{} (attempt {})", operation, attempt));
                    return Err(on_error(e.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl JobLookup for DubbingClient {
    async fn find_job(&self, correlation_id: &str) -> Result<Option<Job>> {
        self.fetch(correlation_id).await
    }
}

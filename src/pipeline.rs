use crate::api::{DubbingClient, Job, Session, SubmitJob};
use crate::config::Settings;
use crate::error::{DubError, Result, Stage};
use crate::poll::{Clock, CompletionPoller, PollConfig, PollOutcome, TokioClock};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Caller parameters for one dub. Required fields are optional here so that
/// missing input can be reported instead of rejected by the type system.
#[derive(Debug, Clone, Default)]
pub struct DubRequest {
    pub audio_url: Option<String>,
    pub target_language: Option<String>,
    pub project_name: Option<String>,
    pub correlation_id: Option<String>,
}

impl DubRequest {
    pub fn new(audio_url: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            audio_url: Some(audio_url.into()),
            target_language: Some(target_language.into()),
            ..Default::default()
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Result of a completed dub.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DubResult {
    pub project_id: String,
    pub status: String,
    /// The language code as the caller gave it, never the API-mapped form.
    pub target_language: String,
    pub sharing_link: String,
    pub project_details: Job,
}

/// Statistics from one orchestrated dub.
#[derive(Debug, Clone)]
pub struct DubStats {
    pub correlation_id: String,
    pub total_time: Duration,
}

/// Submits, waits for, and shares one dubbing job per call.
pub struct Dubber {
    client: DubbingClient,
    clock: Arc<dyn Clock>,
    poll: PollConfig,
    source_language: String,
}

impl Dubber {
    pub fn new(client: DubbingClient) -> Self {
        Self {
            client,
            clock: Arc::new(TokioClock),
            poll: PollConfig::default(),
            source_language: "en".to_string(),
        }
    }

    /// Build a dubber from settings. Fails with a validation error, before
    /// any network traffic, when the credentials are missing.
    pub fn from_settings(settings: &Settings, session: Arc<Session>) -> Result<Self> {
        settings.validate()?;

        let client = DubbingClient::from_settings(settings, session)?;
        Ok(Self::new(client)
            .with_poll_config(PollConfig {
                max_wait: settings.max_wait(),
                check_interval: settings.check_interval(),
            })
            .with_source_language(settings.source_language.clone()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_source_language(mut self, language: impl Into<String>) -> Self {
        self.source_language = language.into();
        self
    }

    pub fn client(&self) -> &DubbingClient {
        &self.client
    }

    /// Dub the audio described by `request`.
    ///
    /// Input is validated before any network call. Any stage failure fails the
    /// whole dub, wrapped with the stage it came from.
    pub async fn dub(&self, request: Option<&DubRequest>) -> Result<DubResult> {
        self.dub_with_stats(request).await.map(|(result, _)| result)
    }

    pub async fn dub_with_stats(
        &self,
        request: Option<&DubRequest>,
    ) -> Result<(DubResult, DubStats)> {
        let start = Instant::now();
        let (audio_url, target_language) = self.validate(request)?;
        let request = request.cloned().unwrap_or_default();

        let correlation_id = request
            .correlation_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| generate_correlation_id(&target_language));
        let project_name = request
            .project_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(default_project_name);

        info!(
            "Dubbing {} into {} (source {}, correlation id {})",
            audio_url, target_language, self.source_language, correlation_id
        );

        let project_id = self
            .client
            .submit(&SubmitJob {
                audio_url: &audio_url,
                project_name: &project_name,
                target_language: &target_language,
                correlation_id: &correlation_id,
                source_language: &self.source_language,
            })
            .await
            .map_err(|e| e.in_stage(Stage::Submit))?;

        info!(
            "Waiting for project {} to complete (this may take several minutes)",
            project_id
        );
        let poller = CompletionPoller::new(&self.client, self.clock.as_ref(), self.poll);
        let job = match poller.wait(&correlation_id).await {
            PollOutcome::Complete(job) => job,
            PollOutcome::Failed(job) => {
                return Err(DubError::RemoteJobFailed { job_id: job.id }
                    .in_project_stage(Stage::Poll, &project_id));
            }
            PollOutcome::TimedOut { waited, .. } => {
                return Err(DubError::TimedOut {
                    correlation_id,
                    waited,
                }
                .in_project_stage(Stage::Poll, &project_id));
            }
        };

        if job.id != project_id {
            warn!(
                "Completed project id {} differs from submitted id {}",
                job.id, project_id
            );
        }

        let sharing_link = self
            .client
            .generate_link(&project_id)
            .await
            .map_err(|e| e.in_project_stage(Stage::Link, &project_id))?;

        let stats = DubStats {
            correlation_id,
            total_time: start.elapsed(),
        };
        info!(
            "Dub of project {} finished in {:.1}s",
            project_id,
            stats.total_time.as_secs_f64()
        );

        Ok((
            DubResult {
                project_id,
                status: job.status.to_string(),
                target_language,
                sharing_link,
                project_details: job,
            },
            stats,
        ))
    }

    fn validate(&self, request: Option<&DubRequest>) -> Result<(String, String)> {
        if !self.client.has_credentials() {
            return Err(DubError::Validation(
                "Missing required credentials. Please set SPEECHLAB_EMAIL and SPEECHLAB_PASSWORD"
                    .to_string(),
            ));
        }

        let request = request.ok_or_else(|| {
            DubError::Validation("Missing required dubbing options".to_string())
        })?;

        let audio_url = request
            .audio_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                DubError::Validation("Missing required audioUrl parameter".to_string())
            })?;

        let target_language = request
            .target_language
            .as_deref()
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .ok_or_else(|| {
                DubError::Validation("Missing required targetLanguage parameter".to_string())
            })?;

        Ok((audio_url.to_string(), target_language.to_string()))
    }
}

/// Correlation id from the current time and the target language.
pub fn generate_correlation_id(target_language: &str) -> String {
    format!(
        "speechdub-{}-{}",
        Utc::now().timestamp_millis(),
        target_language
    )
}

fn default_project_name() -> String {
    format!(
        "SpeechLab Dub {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Print a summary of a finished dub.
pub fn print_summary(result: &DubResult, stats: &DubStats) {
    println!();
    println!("Dub complete");
    println!("  Project:       {}", result.project_id);
    println!("  Status:        {}", result.status);
    println!("  Language:      {}", result.target_language);
    println!("  Correlation:   {}", stats.correlation_id);
    println!("  Media files:   {}", result.project_details.media_count());
    println!("  Time:          {:.1}s", stats.total_time.as_secs_f64());
    println!("  Sharing link:  {}", result.sharing_link);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_format() {
        let id = generate_correlation_id("es");
        assert!(id.starts_with("speechdub-"));
        assert!(id.ends_with("-es"));
        let millis = id
            .trim_start_matches("speechdub-")
            .trim_end_matches("-es");
        assert!(millis.parse::<i64>().is_ok());
    }

    #[test]
    fn test_default_project_name() {
        let name = default_project_name();
        assert!(name.starts_with("SpeechLab Dub "));
        assert!(name.ends_with('Z'));
    }

    #[test]
    fn test_request_builder() {
        let request = DubRequest::new("https://x/a.wav", "fr")
            .with_project_name("Episode 4")
            .with_correlation_id("c-9");
        assert_eq!(request.audio_url.as_deref(), Some("https://x/a.wav"));
        assert_eq!(request.target_language.as_deref(), Some("fr"));
        assert_eq!(request.project_name.as_deref(), Some("Episode 4"));
        assert_eq!(request.correlation_id.as_deref(), Some("c-9"));
    }
}

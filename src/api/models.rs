//! Wire types for the SpeechLab API and the client-side job model.

use serde::{Deserialize, Deserializer, Serialize};

/// Longest project name the API accepts.
pub const MAX_PROJECT_NAME_CHARS: usize = 100;

/// Status reported for a job whose record carries no status block.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// Map a caller language code to the code the API expects.
///
/// Only plain Spanish is remapped, to the Latin American variant.
pub fn normalize_language(code: &str) -> &str {
    match code {
        "es" => "es_la",
        other => other,
    }
}

/// Truncate a project name to at most [`MAX_PROJECT_NAME_CHARS`] characters.
pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_PROJECT_NAME_CHARS).collect()
}

/// Remote job status. Only `COMPLETE` and `FAILED` carry meaning here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Complete,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Complete => "COMPLETE",
            JobStatus::Failed => "FAILED",
            JobStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Other(UNKNOWN_STATUS.to_string())
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "COMPLETE" => JobStatus::Complete,
            "FAILED" => JobStatus::Failed,
            _ => JobStatus::Other(raw),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /v1/projects/createProjectAndDub`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DubJobRequest {
    pub name: String,
    #[serde(rename = "sourceLanguage")]
    pub source_language: String,
    #[serde(rename = "targetLanguage")]
    pub target_language: String,
    #[serde(rename = "dubAccent")]
    pub dub_accent: String,
    #[serde(rename = "unitType")]
    pub unit_type: String,
    #[serde(rename = "mediaFileURI")]
    pub media_uri: String,
    #[serde(rename = "voiceMatchingMode")]
    pub voice_matching_mode: String,
    #[serde(rename = "thirdPartyID")]
    pub correlation_id: String,
}

/// Snapshot of a remote dubbing job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProjectRecord")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub name: Option<String>,
    #[serde(rename = "sourceLanguage")]
    pub source_language: Option<String>,
    #[serde(rename = "targetLanguage")]
    pub target_language: Option<String>,
    pub translations: Vec<Translation>,
}

impl Job {
    /// Number of media artifacts in the first dub of the first translation.
    pub fn media_count(&self) -> usize {
        self.translations
            .first()
            .and_then(|t| t.dub.first())
            .map(|d| d.medias.len())
            .unwrap_or(0)
    }
}

// Translation metadata is passed through untouched, so explicit nulls in it
// read as defaults instead of failing the whole listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Translation {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dub: Vec<Dub>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dub {
    pub id: Option<String>,
    pub language: Option<String>,
    pub voice_matching_mode: Option<String>,
    pub is_dub_updated: Option<bool>,
    pub merge_status: Option<String>,
    pub last_dub_run_type: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub medias: Vec<Media>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Media {
    #[serde(rename = "_id", deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uri: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(alias = "contentTYpe", deserialize_with = "null_as_default")]
    pub content_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub format: String,
    #[serde(deserialize_with = "null_as_default")]
    pub operation_type: String,
    #[serde(rename = "presignedURL")]
    pub presigned_url: Option<String>,
    #[serde(rename = "isSRTUploaded")]
    pub is_srt_uploaded: Option<bool>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Listing records nest the descriptive fields under `job`; a flattened
// `Job` (as produced by serializing one) is accepted too.
#[derive(Debug, Deserialize)]
struct ProjectRecord {
    id: String,
    #[serde(default)]
    job: Option<JobInfo>,
    #[serde(default)]
    status: Option<JobStatus>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "sourceLanguage")]
    source_language: Option<String>,
    #[serde(default, rename = "targetLanguage")]
    target_language: Option<String>,
    #[serde(default)]
    translations: Option<Vec<Option<Translation>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JobInfo {
    name: Option<String>,
    source_language: Option<String>,
    target_language: Option<String>,
    status: Option<JobStatus>,
}

impl From<ProjectRecord> for Job {
    fn from(record: ProjectRecord) -> Self {
        let info = record.job.unwrap_or_default();
        Job {
            id: record.id,
            status: info.status.or(record.status).unwrap_or_default(),
            name: info.name.or(record.name),
            source_language: info.source_language.or(record.source_language),
            target_language: info.target_language.or(record.target_language),
            translations: record
                .translations
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub tokens: Option<LoginTokens>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginTokens {
    #[serde(rename = "accessToken")]
    pub access_token: Option<AccessToken>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessToken {
    #[serde(rename = "jwtToken")]
    pub jwt_token: Option<String>,
}

impl LoginResponse {
    pub fn into_token(self) -> Option<String> {
        self.tokens?
            .access_token?
            .jwt_token
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateDubResponse {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateLinkRequest<'a> {
    #[serde(rename = "projectId")]
    pub project_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateLinkResponse {
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Job>,
    #[serde(rename = "totalResults")]
    pub total_results: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("es"), "es_la");
        for code in ["en", "fr", "es_la", "ES", "pt-BR", ""] {
            assert_eq!(normalize_language(code), code);
        }
    }

    #[test]
    fn test_truncate_name() {
        let long = "x".repeat(150);
        let truncated = truncate_name(&long);
        assert_eq!(truncated.chars().count(), MAX_PROJECT_NAME_CHARS);
        assert!(long.starts_with(&truncated));

        assert_eq!(truncate_name("short"), "short");
    }

    #[test]
    fn test_truncate_name_multibyte() {
        let long = "ñ".repeat(120);
        let truncated = truncate_name(&long);
        assert_eq!(truncated.chars().count(), MAX_PROJECT_NAME_CHARS);
        assert!(long.starts_with(&truncated));
    }

    #[test]
    fn test_null_metadata_reads_as_defaults() {
        let job: Job = serde_json::from_value(json!({
            "id": "p-3",
            "job": { "status": "COMPLETE", "name": null },
            "translations": [
                { "id": null, "language": "fr", "dub": [{ "medias": [{ "_id": "m-1", "uri": null, "format": null }] }] },
                null
            ]
        }))
        .unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.translations.len(), 1);
        assert_eq!(job.translations[0].id, "");
        assert_eq!(job.media_count(), 1);
        assert_eq!(job.translations[0].dub[0].medias[0].uri, "");

        let job: Job = serde_json::from_value(json!({
            "id": "p-4",
            "job": { "status": "COMPLETE" },
            "translations": [{ "id": "t-1", "dub": null }]
        }))
        .unwrap();
        assert_eq!(job.media_count(), 0);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(JobStatus::from("COMPLETE".to_string()), JobStatus::Complete);
        assert_eq!(JobStatus::from("FAILED".to_string()), JobStatus::Failed);
        assert_eq!(
            JobStatus::from("QUEUED".to_string()),
            JobStatus::Other("QUEUED".to_string())
        );
        assert!(!JobStatus::Other("complete".to_string()).is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_from_listing_record() {
        let job: Job = serde_json::from_value(json!({
            "id": "p-1",
            "job": {
                "name": "Episode 1",
                "sourceLanguage": "en",
                "targetLanguage": "es_la",
                "status": "PROCESSING"
            },
            "translations": [{
                "id": "t-1",
                "language": "es_la",
                "dub": [{
                    "id": "d-1",
                    "medias": [
                        {"_id": "m-1", "uri": "s3://a", "contentTYpe": "audio/wav"},
                        {"_id": "m-2", "uri": "s3://b"}
                    ]
                }]
            }]
        }))
        .unwrap();

        assert_eq!(job.id, "p-1");
        assert_eq!(job.status, JobStatus::Other("PROCESSING".to_string()));
        assert_eq!(job.name.as_deref(), Some("Episode 1"));
        assert_eq!(job.target_language.as_deref(), Some("es_la"));
        assert_eq!(job.media_count(), 2);
        assert_eq!(job.translations[0].dub[0].medias[0].content_type, "audio/wav");
    }

    #[test]
    fn test_job_without_status_block() {
        let job: Job = serde_json::from_value(json!({"id": "p-2"})).unwrap();
        assert_eq!(job.status.as_str(), UNKNOWN_STATUS);
        assert_eq!(job.media_count(), 0);
    }

    #[test]
    fn test_job_survives_reserialization() {
        let job: Job = serde_json::from_value(json!({
            "id": "p-3",
            "job": {"status": "COMPLETE", "name": "n"}
        }))
        .unwrap();

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "COMPLETE");

        let again: Job = serde_json::from_value(value).unwrap();
        assert_eq!(again, job);
    }

    #[test]
    fn test_login_token_extraction() {
        let ok: LoginResponse =
            serde_json::from_value(json!({"tokens": {"accessToken": {"jwtToken": "abc"}}}))
                .unwrap();
        assert_eq!(ok.into_token().as_deref(), Some("abc"));

        let missing: LoginResponse = serde_json::from_value(json!({"tokens": {}})).unwrap();
        assert!(missing.into_token().is_none());

        let empty: LoginResponse =
            serde_json::from_value(json!({"tokens": {"accessToken": {"jwtToken": ""}}}))
                .unwrap();
        assert!(empty.into_token().is_none());
    }

    #[test]
    fn test_dub_request_wire_names() {
        let request = DubJobRequest {
            name: "n".to_string(),
            source_language: "en".to_string(),
            target_language: "es_la".to_string(),
            dub_accent: "es_la".to_string(),
            unit_type: "whiteGlove".to_string(),
            media_uri: "https://x/a.wav".to_string(),
            voice_matching_mode: "source".to_string(),
            correlation_id: "c-1".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["mediaFileURI"], "https://x/a.wav");
        assert_eq!(value["thirdPartyID"], "c-1");
        assert_eq!(value["dubAccent"], "es_la");
        assert_eq!(value["unitType"], "whiteGlove");
    }
}

use crate::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Failure of a single HTTP exchange, classified by where it broke.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("server responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request went out but no response came back (connect failure, timeout).
    #[error("no response received: {0}")]
    NoResponse(String),

    /// The request could not be built.
    #[error("request could not be constructed: {0}")]
    Request(String),

    /// The response body was not the expected JSON.
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    fn kind(&self) -> &'static str {
        match self {
            TransportError::Status { .. } => "status",
            TransportError::NoResponse(_) => "no-response",
            TransportError::Request(_) => "request",
            TransportError::Decode(_) => "decode",
        }
    }

    /// Log the failure with its classification.
    pub fn log(&self, context: &str) {
        error!(kind = self.kind(), "API error during {}: {}", context, self);
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            TransportError::Request(e.to_string())
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::NoResponse(e.to_string())
        }
    }
}

/// JSON-over-HTTPS sender bound to one API base URL.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
}

impl Transport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post_json<B, R>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> std::result::Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        self.send(request, token).await
    }

    pub async fn get_json<R>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: Option<&str>,
    ) -> std::result::Result<R, TransportError>
    where
        R: DeserializeOwned,
    {
        let request = self.client.get(self.url(path)).query(query);
        self.send(request, token).await
    }

    async fn send<R>(
        &self,
        mut request: RequestBuilder,
        token: Option<&str>,
    ) -> std::result::Result<R, TransportError>
    where
        R: DeserializeOwned,
    {
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("SpeechLab API response status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status { status, body });
        }

        debug!("SpeechLab API response: {}", truncate_for_log(&body));
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

fn truncate_for_log(body: &str) -> &str {
    match body.char_indices().nth(500) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_classification() {
        let rejected = TransportError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(rejected.is_unauthorized());

        let forbidden = TransportError::Status {
            status: StatusCode::FORBIDDEN,
            body: String::new(),
        };
        assert!(!forbidden.is_unauthorized());
        assert!(!TransportError::NoResponse("timeout".to_string()).is_unauthorized());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let transport =
            Transport::new("https://api.example.com/", Duration::from_secs(30)).unwrap();
        assert_eq!(transport.base_url(), "https://api.example.com");
        assert_eq!(
            transport.url("/v1/auth/login"),
            "https://api.example.com/v1/auth/login"
        );
    }

    #[test]
    fn test_truncate_for_log() {
        let body = "a".repeat(600);
        assert_eq!(truncate_for_log(&body).len(), 500);
        assert_eq!(truncate_for_log("short"), "short");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_no_response() {
        // Port 9 on localhost is reserved for discard and normally closed.
        let transport = Transport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result: std::result::Result<serde_json::Value, _> =
            transport.get_json("/v1/projects", &[], None).await;
        assert!(matches!(result, Err(TransportError::NoResponse(_))));
    }
}

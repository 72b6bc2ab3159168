//! Shared fixtures for the mock-server tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use speechdub::api::{DubbingClient, Session, Transport};
use speechdub::{Clock, Credentials};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_PATH: &str = "/v1/auth/login";
pub const CREATE_PATH: &str = "/v1/projects/createProjectAndDub";
pub const PROJECTS_PATH: &str = "/v1/projects";
pub const LINK_PATH: &str = "/v1/collaborations/generateSharingLink";

pub fn credentials() -> Credentials {
    Credentials::new("dubber@example.com", "hunter2")
}

pub fn client_for(server: &MockServer) -> DubbingClient {
    client_with_session(server, Session::new())
}

pub fn client_with_session(server: &MockServer, session: Arc<Session>) -> DubbingClient {
    let transport = Transport::new(server.uri(), Duration::from_secs(5)).unwrap();
    DubbingClient::new(transport, session, credentials())
}

pub fn login_body(token: &str) -> Value {
    json!({ "tokens": { "accessToken": { "jwtToken": token } } })
}

/// Login endpoint that always hands out `token`, expected `times` times.
pub async fn mount_login(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body(token)))
        .expect(times)
        .named("login")
        .mount(server)
        .await;
}

pub fn project(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "job": {
            "name": "Test dub",
            "sourceLanguage": "en",
            "targetLanguage": "es_la",
            "status": status
        },
        "translations": [{
            "id": "t-1",
            "language": "es_la",
            "dub": [{ "id": "d-1", "medias": [{ "_id": "m-1", "uri": "s3://out.wav" }] }]
        }]
    })
}

pub fn listing(projects: Vec<Value>) -> Value {
    let total = projects.len();
    json!({ "results": projects, "totalResults": total })
}

/// Serve `statuses` for `correlation_id`, one per lookup; the last repeats.
pub async fn mount_status_sequence(
    server: &MockServer,
    correlation_id: &str,
    job_id: &str,
    statuses: &[&str],
) {
    for (i, status) in statuses.iter().enumerate() {
        let mock = Mock::given(method("GET"))
            .and(path(PROJECTS_PATH))
            .and(query_param("thirdPartyIDs", correlation_id))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(listing(vec![project(job_id, status)])),
            );

        let mock = if i + 1 < statuses.len() {
            mock.up_to_n_times(1)
        } else {
            mock
        };
        mock.mount(server).await;
    }
}

/// Count requests the server saw on `request_path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

/// Clock whose sleeps advance virtual time instantly.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
    }
}

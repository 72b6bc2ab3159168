use crate::api::models::{LoginRequest, LoginResponse};
use crate::api::transport::Transport;
use crate::config::Credentials;
use crate::error::{DubError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/v1/auth/login";

/// Holds the single cached bearer token shared by every client built on it.
///
/// The token has no local expiry; it stays valid until the server rejects it
/// and someone calls [`Session::invalidate`].
#[derive(Debug, Default)]
pub struct Session {
    token: Mutex<Option<String>>,
}

impl Session {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn cached(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    #[cfg(test)]
    pub(crate) async fn set(&self, token: String) {
        *self.token.lock().await = Some(token);
    }

    /// Return the cached token, or run `login` and cache what it yields.
    ///
    /// The lock is held across `login`, so concurrent misses wait for one
    /// login instead of each issuing their own. A failed login caches nothing.
    pub async fn get_or_login<F, Fut>(&self, login: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            debug!("Using cached authentication token");
            return Ok(token.clone());
        }

        let token = login().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token. A no-op when nothing is cached.
    pub async fn invalidate(&self) {
        let mut token = self.token.lock().await;
        if token.take().is_some() {
            info!("Invalidating cached authentication token");
        }
    }
}

/// Exchanges credentials for a token, caching it in the shared [`Session`].
#[derive(Debug, Clone)]
pub struct Authenticator {
    transport: Transport,
    session: Arc<Session>,
}

impl Authenticator {
    pub fn new(transport: Transport, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Return the cached token, logging in first if there is none.
    pub async fn token(&self, credentials: &Credentials) -> Result<String> {
        self.session
            .get_or_login(move || async move {
                info!("No cached token, authenticating as {}", credentials.email);
                self.login(credentials).await
            })
            .await
    }

    async fn login(&self, credentials: &Credentials) -> Result<String> {
        let payload = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        };

        let response: LoginResponse = self
            .transport
            .post_json(LOGIN_PATH, &payload, None)
            .await
            .map_err(|e| {
                e.log("authentication");
                DubError::Authentication(e.to_string())
            })?;

        match response.into_token() {
            Some(token) => {
                info!("Authenticated and obtained token");
                Ok(token)
            }
            None => {
                warn!("Login succeeded but no token was found in the response");
                Err(DubError::Authentication(
                    "token not found in login response".to_string(),
                ))
            }
        }
    }
}

// MySmartBike session client
//
// Owns the credentials and the bearer token, and exposes the two vendor
// calls: login and the bike list. All transport goes through the
// `RequestExecutor`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{ApiConfig, Credentials};
use crate::error::Error;
use crate::executor::{RequestExecutor, RequestOptions};
use crate::mapper::map_devices;
use crate::models::DeviceRecord;
use crate::transport::{HttpSessionProvider, SessionManager, SessionPolicy, SessionProvider};

pub const LOGIN_ENDPOINT: &str = "/api/v1/users/login";
pub const DEVICES_ENDPOINT: &str = "/api/v1/objects/me";

/// Vendor success code in the body's `status` field.
const STATUS_OK: i64 = 200;

/// Client for one MySmartBike account.
///
/// `login` must succeed before `get_device_list` returns anything; the
/// client never logs in on its own.
pub struct SessionClient {
    executor: RequestExecutor,
    credentials: Credentials,
    token: RwLock<Option<SecretString>>,
    initialized: AtomicBool,
}

impl SessionClient {
    /// Create a client that opens its own HTTP session on first use.
    pub fn new(config: ApiConfig, credentials: Credentials) -> Result<Self, Error> {
        Self::with_provider(Arc::new(HttpSessionProvider), config, credentials)
    }

    /// Create a client that (re)opens sessions through a host-provided
    /// [`SessionProvider`].
    pub fn with_provider(
        provider: Arc<dyn SessionProvider>,
        config: ApiConfig,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        let sessions = SessionManager::new(provider, SessionPolicy::from(&config));
        Self::from_parts(sessions, config, credentials)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Use this when the host already owns a connection pool.
    pub fn with_client(
        http: reqwest::Client,
        config: ApiConfig,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        let sessions = SessionManager::with_client(http, SessionPolicy::from(&config));
        Self::from_parts(sessions, config, credentials)
    }

    fn from_parts(
        sessions: SessionManager,
        config: ApiConfig,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        Ok(Self {
            executor: RequestExecutor::new(config, sessions)?,
            credentials,
            token: RwLock::new(None),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn config(&self) -> &ApiConfig {
        self.executor.config()
    }

    /// The request executor, for callers that need a raw vendor call.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    // ── Token state ──────────────────────────────────────────────────

    /// The bearer token from the last successful login.
    pub fn token(&self) -> Option<SecretString> {
        self.token.read().expect("token lock poisoned").clone()
    }

    pub fn has_token(&self) -> bool {
        self.token.read().expect("token lock poisoned").is_some()
    }

    /// Forget the stored token. The next list call will send an empty bearer.
    pub fn clear_token(&self) {
        *self.token.write().expect("token lock poisoned") = None;
    }

    /// `true` once any login has succeeded. Informational only.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Drop the held HTTP session; the next call reopens it.
    pub fn close_session(&self) {
        self.executor.sessions().close();
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Exchange the credentials for a bearer token.
    ///
    /// - `Ok(true)`: body `status` is 200 and `data.token` is a non-empty
    ///   string; the token is stored.
    /// - `Err(Error::Authentication)`: the body has a `status` that is not a
    ///   success, or the HTTP layer rejected the request.
    /// - `Ok(false)`: no body, or a body without any `status`.
    pub async fn login(&self) -> Result<bool, Error> {
        self.login_inner(None).await
    }

    /// [`login`](Self::login) with an explicit cancellation token.
    pub async fn login_with(&self, cancel: CancellationToken) -> Result<bool, Error> {
        self.login_inner(Some(cancel)).await
    }

    async fn login_inner(&self, cancel: Option<CancellationToken>) -> Result<bool, Error> {
        debug!(username = %self.credentials.username, "logging in");

        let mut options = RequestOptions::new()
            .form([
                ("password", self.credentials.password.expose_secret()),
                ("contents_id", ""),
                ("email", self.credentials.username.as_str()),
            ])
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
            );
        options.cancel = cancel;

        let Some(response) = self
            .executor
            .execute(Method::POST, LOGIN_ENDPOINT, options)
            .await?
        else {
            debug!("login returned no body");
            return Ok(false);
        };

        let Some(status) = body_status(&response) else {
            debug!("login response carried no status");
            return Ok(false);
        };

        if status.as_i64() == Some(STATUS_OK) {
            if let Some(token) = response
                .pointer("/data/token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
            {
                *self.token.write().expect("token lock poisoned") =
                    Some(SecretString::from(token.to_owned()));
                self.initialized.store(true, Ordering::Release);
                debug!("login successful");
                return Ok(true);
            }
        }

        warn!(%status, "login rejected");
        Err(Error::Authentication {
            message: format!("login rejected with status {status}"),
            status: None,
            response: Some(response),
        })
    }

    // ── Bikes ────────────────────────────────────────────────────────

    /// Fetch the account's bikes, keyed by serial.
    ///
    /// Transport, HTTP and non-200 outcomes degrade to an empty map; only
    /// a malformed 200 payload (or cancellation) is an error.
    pub async fn get_device_list(&self) -> Result<HashMap<String, DeviceRecord>, Error> {
        self.get_device_list_inner(None).await
    }

    /// [`get_device_list`](Self::get_device_list) with an explicit cancellation token.
    pub async fn get_device_list_with(
        &self,
        cancel: CancellationToken,
    ) -> Result<HashMap<String, DeviceRecord>, Error> {
        self.get_device_list_inner(Some(cancel)).await
    }

    async fn get_device_list_inner(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<HashMap<String, DeviceRecord>, Error> {
        let bearer = {
            let guard = self.token.read().expect("token lock poisoned");
            let token = guard.as_ref().map_or("", |t| t.expose_secret());
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                Error::InvalidHeader {
                    name: "Authorization",
                    reason: e.to_string(),
                }
            })?;
            value.set_sensitive(true);
            value
        };

        let mut options = RequestOptions::new()
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(AUTHORIZATION, bearer)
            .ignore_errors();
        options.cancel = cancel;

        let endpoint = format!("{DEVICES_ENDPOINT}?limit={}", self.config().device_limit);
        let response = self
            .executor
            .execute(Method::GET, &endpoint, options)
            .await?;

        match response {
            Some(payload) if body_status(&payload).and_then(Value::as_i64) == Some(STATUS_OK) => {
                let devices = map_devices(&payload)?;
                debug!(count = devices.len(), "fetched bikes");
                Ok(devices)
            }
            Some(payload) => {
                debug!(status = ?body_status(&payload), "bike list not available");
                Ok(HashMap::new())
            }
            None => {
                debug!("bike list returned no response");
                Ok(HashMap::new())
            }
        }
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("username", &self.credentials.username)
            .field("has_token", &self.has_token())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// The vendor `status` field, if present and not null.
fn body_status(body: &Value) -> Option<&Value> {
    body.get("status").filter(|s| !s.is_null())
}

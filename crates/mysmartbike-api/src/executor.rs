// Request executor
//
// Builds a fully-qualified vendor request (URL, fixed protocol headers,
// proxy, body), sends it through the session manager's client and
// classifies the outcome. Nothing is swallowed here unless the caller
// asked for `ignore_errors`, and even then only classified failures.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::Error;
use crate::transport::SessionManager;

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs, encoded in order.
    Form(Vec<(String, String)>),
    Json(Value),
}

/// Per-call knobs for [`RequestExecutor::execute`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Caller headers. Fixed protocol headers overwrite overlapping keys.
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Route this call through a specific proxy instead of the configured one.
    pub proxy: Option<Url>,
    /// Send to this URL instead of `base_uri + endpoint`. The HTTP status is
    /// not validated on this path.
    pub url: Option<Url>,
    /// Turn classified failures into `Ok(None)`.
    pub ignore_errors: bool,
    /// Override the session timeout for this call.
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn form<K: Into<String>, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.body = RequestBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn proxy(mut self, proxy: Url) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Executes requests against the vendor API.
#[derive(Debug)]
pub struct RequestExecutor {
    config: ApiConfig,
    fixed_headers: HeaderMap,
    sessions: SessionManager,
}

impl RequestExecutor {
    /// Fails if a configured protocol header value can't be encoded.
    pub fn new(config: ApiConfig, sessions: SessionManager) -> Result<Self, Error> {
        let fixed_headers = config.headers.to_header_map()?;
        Ok(Self {
            config,
            fixed_headers,
            sessions,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Send one request and decode its body as JSON.
    ///
    /// Returns `Ok(None)` for an empty (or `null`) body, and for any
    /// classified failure when `options.ignore_errors` is set.
    /// Cancellation is always reported as [`Error::Cancelled`].
    pub async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, Error> {
        let ignore_errors = options.ignore_errors;
        let cancel = options.cancel.clone();

        let send = self.send(method, endpoint, options);
        let result = match cancel {
            Some(token) => tokio::select! {
                () = token.cancelled() => Err(Error::Cancelled),
                result = send => result,
            },
            None => send.await,
        };

        match result {
            Err(err) if ignore_errors && err.is_ignorable() => {
                warn!(endpoint, error = %err, "request failed, continuing without a response");
                Ok(None)
            }
            Err(err) => {
                debug!(endpoint, error = %err, "request failed");
                Err(err)
            }
            ok => ok,
        }
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, Error> {
        let http = match &options.proxy {
            Some(proxy) => self.sessions.open_with_proxy(proxy)?,
            None => self.sessions.acquire()?,
        };
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let validate_status = options.url.is_none();

        let request = self.build_request(&http, method, endpoint, options)?;
        debug!("{} {}", request.method(), request.url());

        let resp = http
            .execute(request)
            .await
            .map_err(|e| classify_transport(e, timeout))?;

        let status = resp.status();
        if validate_status && !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("HTTP {status}"),
                status: Some(status.as_u16()),
                response: serde_json::from_str(&body).ok(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| classify_transport(e, timeout))?;
        decode_lenient(&bytes)
    }

    fn build_request(
        &self,
        http: &reqwest::Client,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<reqwest::Request, Error> {
        let url = match options.url {
            Some(url) => url,
            None => self.config.endpoint_url(endpoint)?,
        };

        let mut builder = http.request(method, url);
        builder = match options.body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Json(body) => builder.json(&body),
        };

        let mut headers = options.headers;
        for (name, value) in &self.fixed_headers {
            headers.insert(name.clone(), value.clone());
        }
        builder = builder.headers(headers);

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(builder.build()?)
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            timeout_secs: timeout.as_secs(),
        }
    } else {
        Error::Transport(err)
    }
}

/// Decode JSON whatever the declared content type. Empty or `null` is `None`.
fn decode_lenient(bytes: &[u8]) -> Result<Option<Value>, Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(Error::Deserialization {
            message: e.to_string(),
            body: String::from_utf8_lossy(bytes).into_owned(),
        }),
    }
}

// ── Runtime connection configuration ──
//
// These types describe *how* to talk to the MySmartBike cloud. They carry
// credential data and connection tuning, but never touch disk.
// The CLI constructs an `ApiConfig` and hands it in.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use secrecy::SecretString;
use url::Url;

use crate::error::Error;

pub const DEFAULT_BASE_URI: &str = "https://my-smartbike.com";
pub const DEFAULT_DEVICE_LIMIT: u32 = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Username/password pair for the vendor login endpoint.
///
/// `SecretString` keeps the password out of `Debug` output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Fixed protocol headers the vendor API expects on every request.
///
/// These are applied after caller-supplied headers, so their values
/// always win for overlapping keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolHeaders {
    pub accept: String,
    pub user_agent: String,
    pub accept_language: String,
    pub theme: String,
    pub app: String,
    pub platform: String,
    pub version: String,
}

impl Default for ProtocolHeaders {
    fn default() -> Self {
        Self {
            accept: "application/json".into(),
            user_agent: "MySmartBike/1.0.0 (Android)".into(),
            accept_language: "de-DE".into(),
            theme: "mysmartbike".into(),
            app: "mysmartbike".into(),
            platform: "android".into(),
            version: "1.0.0".into(),
        }
    }
}

impl ProtocolHeaders {
    /// Encode the fixed set as a `HeaderMap`.
    pub fn to_header_map(&self) -> Result<HeaderMap, Error> {
        let entries: [(HeaderName, &'static str, &str); 7] = [
            (ACCEPT, "Accept", &self.accept),
            (USER_AGENT, "User-Agent", &self.user_agent),
            (ACCEPT_LANGUAGE, "Accept-Language", &self.accept_language),
            (HeaderName::from_static("x-theme"), "X-Theme", &self.theme),
            (HeaderName::from_static("x-app"), "X-App", &self.app),
            (HeaderName::from_static("x-platform"), "X-Platform", &self.platform),
            (HeaderName::from_static("x-version"), "X-Version", &self.version),
        ];

        let mut map = HeaderMap::with_capacity(entries.len());
        for (name, label, value) in entries {
            let value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
                name: label,
                reason: e.to_string(),
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

/// Configuration for one MySmartBike API session.
///
/// Built by the caller and injected at construction -- the client never
/// reads ambient process state.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Root of the vendor API; endpoint paths are appended verbatim.
    pub base_uri: Url,
    /// Fixed protocol header values.
    pub headers: ProtocolHeaders,
    /// Proxy for all requests that don't bring their own. `None` = direct.
    pub proxy: Option<Url>,
    /// Verify the server's TLS certificate.
    pub verify_tls: bool,
    /// Upper bound for a single request.
    pub timeout: Duration,
    /// Page-size cap for the bike list call.
    pub device_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_uri: Url::parse(DEFAULT_BASE_URI).expect("default base URI is a valid URL"),
            headers: ProtocolHeaders::default(),
            proxy: None,
            verify_tls: true,
            timeout: DEFAULT_TIMEOUT,
            device_limit: DEFAULT_DEVICE_LIMIT,
        }
    }
}

impl ApiConfig {
    /// Build the full URL for an endpoint path by plain concatenation.
    ///
    /// The endpoint may carry a query string (`/api/v1/objects/me?limit=5`).
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, Error> {
        let base = self.base_uri.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{endpoint}"))?)
    }
}

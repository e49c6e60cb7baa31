// HTTP session lifecycle.
//
// The executor never builds clients itself: it asks a `SessionManager`,
// which holds the current session and reopens it through a
// `SessionProvider` when none is held or the held one was closed.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::config::{ApiConfig, DEFAULT_TIMEOUT};
use crate::error::Error;

/// What a session is built for: TLS policy, proxy, and timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    pub verify_tls: bool,
    pub proxy: Option<Url>,
    pub timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            verify_tls: true,
            proxy: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl From<&ApiConfig> for SessionPolicy {
    fn from(config: &ApiConfig) -> Self {
        Self {
            verify_tls: config.verify_tls,
            proxy: config.proxy.clone(),
            timeout: config.timeout,
        }
    }
}

/// Something that can (re)create an HTTP session for a policy.
///
/// Hosts that own their own connection pool implement this to hand out
/// their client; the default builds a fresh `reqwest::Client`.
pub trait SessionProvider: Send + Sync {
    fn open(&self, policy: &SessionPolicy) -> Result<reqwest::Client, Error>;
}

/// Builds `reqwest::Client` instances straight from the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSessionProvider;

impl SessionProvider for HttpSessionProvider {
    fn open(&self, policy: &SessionPolicy) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder().timeout(policy.timeout);

        builder = match &policy.proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy.as_str())
                    .map_err(|e| Error::Session(format!("invalid proxy {proxy}: {e}")))?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        if !policy.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::Session(format!("failed to build HTTP client: {e}")))
    }
}

/// Owns the current HTTP session and reopens it on demand.
pub struct SessionManager {
    provider: Arc<dyn SessionProvider>,
    policy: SessionPolicy,
    current: RwLock<Option<reqwest::Client>>,
}

impl SessionManager {
    /// A manager with no session yet; the first `acquire` opens one.
    pub fn new(provider: Arc<dyn SessionProvider>, policy: SessionPolicy) -> Self {
        Self {
            provider,
            policy,
            current: RwLock::new(None),
        }
    }

    /// A manager seeded with a host-supplied session.
    ///
    /// The default provider is kept for reopening after `close`.
    pub fn with_client(http: reqwest::Client, policy: SessionPolicy) -> Self {
        Self {
            provider: Arc::new(HttpSessionProvider),
            policy,
            current: RwLock::new(Some(http)),
        }
    }

    /// The policy used for the held session.
    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Return the held session, opening a new one if none is held.
    pub fn acquire(&self) -> Result<reqwest::Client, Error> {
        if let Some(http) = self.current.read().expect("session lock poisoned").as_ref() {
            return Ok(http.clone());
        }

        let mut guard = self.current.write().expect("session lock poisoned");
        // Another caller may have reopened it between the two locks.
        if let Some(http) = guard.as_ref() {
            return Ok(http.clone());
        }

        debug!(verify_tls = self.policy.verify_tls, "opening HTTP session");
        let http = self.provider.open(&self.policy)?;
        *guard = Some(http.clone());
        Ok(http)
    }

    /// Open a one-off session routed through `proxy`.
    ///
    /// The held session is left untouched.
    pub fn open_with_proxy(&self, proxy: &Url) -> Result<reqwest::Client, Error> {
        let policy = SessionPolicy {
            proxy: Some(proxy.clone()),
            ..self.policy.clone()
        };
        debug!(%proxy, "opening one-off HTTP session");
        self.provider.open(&policy)
    }

    /// Drop the held session. The next `acquire` reopens it.
    pub fn close(&self) {
        *self.current.write().expect("session lock poisoned") = None;
    }

    /// `true` when no session is held.
    pub fn is_closed(&self) -> bool {
        self.current.read().expect("session lock poisoned").is_none()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("policy", &self.policy)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;

    use super::*;

    /// Records every policy it was asked to open.
    #[derive(Default)]
    struct RecordingProvider {
        opened: Mutex<Vec<SessionPolicy>>,
    }

    impl SessionProvider for RecordingProvider {
        fn open(&self, policy: &SessionPolicy) -> Result<reqwest::Client, Error> {
            self.opened.lock().unwrap().push(policy.clone());
            Ok(reqwest::Client::new())
        }
    }

    fn manager() -> (Arc<RecordingProvider>, SessionManager) {
        let provider = Arc::new(RecordingProvider::default());
        let policy = SessionPolicy {
            verify_tls: false,
            ..SessionPolicy::default()
        };
        let manager = SessionManager::new(provider.clone(), policy);
        (provider, manager)
    }

    #[test]
    fn acquire_opens_lazily_and_reuses() {
        let (provider, manager) = manager();
        assert!(manager.is_closed());

        manager.acquire().unwrap();
        manager.acquire().unwrap();

        assert!(!manager.is_closed());
        let opened = provider.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert!(!opened[0].verify_tls);
    }

    #[test]
    fn acquire_reopens_after_close() {
        let (provider, manager) = manager();
        manager.acquire().unwrap();
        manager.close();
        assert!(manager.is_closed());

        manager.acquire().unwrap();
        assert_eq!(provider.opened.lock().unwrap().len(), 2);
    }

    #[test]
    fn proxy_override_does_not_replace_held_session() {
        let (provider, manager) = manager();
        let proxy = Url::parse("http://proxy.local:3128").unwrap();

        manager.open_with_proxy(&proxy).unwrap();
        assert!(manager.is_closed());

        let opened = provider.opened.lock().unwrap();
        assert_eq!(opened[0].proxy.as_ref(), Some(&proxy));
        assert!(!opened[0].verify_tls);
    }

    #[test]
    fn seeded_session_is_not_reopened() {
        let manager = SessionManager::with_client(reqwest::Client::new(), SessionPolicy::default());
        assert!(!manager.is_closed());
        manager.acquire().unwrap();
    }

    #[test]
    fn http_provider_builds_insecure_proxied_client() {
        let policy = SessionPolicy {
            verify_tls: false,
            proxy: Some(Url::parse("http://proxy.local:3128").unwrap()),
            timeout: Duration::from_secs(1),
        };
        HttpSessionProvider.open(&policy).unwrap();
    }

    #[test]
    fn policy_follows_api_config() {
        let config = ApiConfig {
            verify_tls: false,
            timeout: Duration::from_secs(5),
            ..ApiConfig::default()
        };
        let policy = SessionPolicy::from(&config);
        assert!(!policy.verify_tls);
        assert_eq!(policy.timeout, Duration::from_secs(5));
        assert!(policy.proxy.is_none());
    }
}

//! Shared configuration for the mysmartbike CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `mysmartbike_api::ApiConfig`. The CLI adds
//! flag-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use mysmartbike_api::config::{DEFAULT_BASE_URI, DEFAULT_DEVICE_LIMIT};
use mysmartbike_api::{ApiConfig, Credentials, ProtocolHeaders};

/// Keyring service name for stored passwords.
pub const KEYRING_SERVICE: &str = "mysmartbike";
pub const ENV_PREFIX: &str = "MYSMARTBIKE_";
pub const PASSWORD_ENV: &str = "MYSMARTBIKE_PASSWORD";
pub const USERNAME_ENV: &str = "MYSMARTBIKE_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_base_uri")]
    pub base_uri: String,

    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Proxy URL applied to every profile that doesn't set its own.
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            base_uri: default_base_uri(),
            verify_tls: default_verify_tls(),
            proxy: None,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_base_uri() -> String {
    DEFAULT_BASE_URI.into()
}
fn default_verify_tls() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}

/// A named account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account e-mail used as the login name.
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Override the API root.
    pub base_uri: Option<String>,

    /// Override the proxy.
    pub proxy: Option<String>,

    /// Override TLS verification.
    pub verify_tls: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// How many bikes to request.
    pub device_limit: Option<u32>,

    /// Protocol header overrides, for when the vendor bumps its app version.
    #[serde(default, skip_serializing_if = "HeaderOverrides::is_empty")]
    pub headers: HeaderOverrides,
}

/// Optional replacements for the fixed protocol header values.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderOverrides {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub theme: Option<String>,
    pub app: Option<String>,
    pub platform: Option<String>,
    pub version: Option<String>,
}

impl HeaderOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the overrides on top of `base`.
    pub fn apply(&self, mut base: ProtocolHeaders) -> ProtocolHeaders {
        let pairs = [
            (&self.user_agent, &mut base.user_agent),
            (&self.accept_language, &mut base.accept_language),
            (&self.theme, &mut base.theme),
            (&self.app, &mut base.app),
            (&self.platform, &mut base.platform),
            (&self.version, &mut base.version),
        ];
        for (value, slot) in pairs {
            if let Some(v) = value {
                slot.clone_from(v);
            }
        }
        base
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "mysmartbike", "mysmartbike").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("mysmartbike");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. Environment `MYSMARTBIKE_*` keys win,
/// with `__` separating nested keys (`MYSMARTBIKE_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Keyring entry name for a profile's password.
pub fn keyring_key(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

/// Store a profile password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name))?;
    entry.set_password(password)?;
    Ok(())
}

/// Resolve the account username: profile, then `MYSMARTBIKE_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the password: env var, then keyring, then plaintext in config.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name)) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve both halves of the credential pair.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Credentials, ConfigError> {
    Ok(Credentials {
        username: resolve_username(profile, profile_name)?,
        password: resolve_password(profile, profile_name)?,
    })
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    value.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{value}': {e}"),
    })
}

/// Build an `ApiConfig` from defaults + profile. No credentials involved.
pub fn profile_to_api_config(profile: &Profile, defaults: &Defaults) -> Result<ApiConfig, ConfigError> {
    let base_uri = parse_url(
        "base_uri",
        profile.base_uri.as_deref().unwrap_or(&defaults.base_uri),
    )?;

    let proxy = profile
        .proxy
        .as_deref()
        .or(defaults.proxy.as_deref())
        .filter(|p| !p.is_empty())
        .map(|p| parse_url("proxy", p))
        .transpose()?;

    let device_limit = profile.device_limit.unwrap_or(DEFAULT_DEVICE_LIMIT);
    if device_limit == 0 {
        return Err(ConfigError::Validation {
            field: "device_limit".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(ApiConfig {
        base_uri,
        headers: profile.headers.apply(ProtocolHeaders::default()),
        proxy,
        verify_tls: profile.verify_tls.unwrap_or(defaults.verify_tls),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        device_limit,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "commute"

[defaults]
timeout = 15
proxy = "http://proxy.lan:3128"

[profiles.commute]
username = "rider@example.com"
password = "plain"
device_limit = 3

[profiles.commute.headers]
version = "2.4.1"

[profiles.lab]
username = "lab@example.com"
base_uri = "http://127.0.0.1:8080"
proxy = ""
verify_tls = false
"#;

    #[test]
    fn loads_profiles_and_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            let cfg = load_config_from(Path::new("config.toml")).unwrap();

            assert_eq!(cfg.default_profile.as_deref(), Some("commute"));
            assert_eq!(cfg.defaults.timeout, 15);
            assert_eq!(cfg.defaults.output, "table");
            assert_eq!(cfg.profiles.len(), 2);
            assert_eq!(cfg.profiles["commute"].device_limit, Some(3));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            jail.set_env("MYSMARTBIKE_DEFAULTS__TIMEOUT", "5");
            let cfg = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(cfg.defaults.timeout, 5);
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("absent.toml")).unwrap();
            assert_eq!(cfg.default_profile.as_deref(), Some("default"));
            assert!(cfg.profiles.is_empty());
            assert!(cfg.defaults.verify_tls);
            Ok(())
        });
    }

    #[test]
    fn profile_translation_applies_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            let cfg = load_config_from(Path::new("config.toml")).unwrap();

            let commute = profile_to_api_config(&cfg.profiles["commute"], &cfg.defaults).unwrap();
            assert_eq!(commute.base_uri.as_str(), "https://my-smartbike.com/");
            assert_eq!(commute.proxy.unwrap().as_str(), "http://proxy.lan:3128/");
            assert_eq!(commute.timeout, Duration::from_secs(15));
            assert_eq!(commute.device_limit, 3);
            assert_eq!(commute.headers.version, "2.4.1");
            assert_eq!(commute.headers.platform, "android");

            let lab = profile_to_api_config(&cfg.profiles["lab"], &cfg.defaults).unwrap();
            assert_eq!(lab.base_uri.as_str(), "http://127.0.0.1:8080/");
            assert!(lab.proxy.is_none());
            assert!(!lab.verify_tls);
            Ok(())
        });
    }

    #[test]
    fn invalid_base_uri_is_validation_error() {
        let profile = Profile {
            base_uri: Some("not a url".into()),
            ..Profile::default()
        };
        let err = profile_to_api_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "base_uri"));
    }

    #[test]
    fn zero_device_limit_is_rejected() {
        let profile = Profile {
            device_limit: Some(0),
            ..Profile::default()
        };
        assert!(profile_to_api_config(&profile, &Defaults::default()).is_err());
    }

    #[test]
    fn password_env_wins_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env(PASSWORD_ENV, "from-env");
            let profile = Profile {
                username: Some("rider@example.com".into()),
                password: Some("plain".into()),
                ..Profile::default()
            };
            let creds = resolve_credentials(&profile, "default").unwrap();
            assert_eq!(secrecy::ExposeSecret::expose_secret(&creds.password), "from-env");
            Ok(())
        });
    }

    #[test]
    fn missing_username_is_no_credentials() {
        Jail::expect_with(|_jail| {
            let err = resolve_username(&Profile::default(), "ghost").unwrap_err();
            assert!(matches!(err, ConfigError::NoCredentials { ref profile } if profile == "ghost"));
            Ok(())
        });
    }

    #[test]
    fn save_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                username: Some("rider@example.com".into()),
                device_limit: Some(2),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("username = \"rider@example.com\""));
        assert!(!written.contains("[profiles.default.headers]"));
    }
}

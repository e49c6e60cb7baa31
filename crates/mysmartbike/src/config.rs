//! CLI configuration: a thin wrapper around `mysmartbike_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--username, --base-uri, --proxy, --insecure, --timeout).

use std::time::Duration;

use mysmartbike_api::{ApiConfig, Credentials};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use mysmartbike_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Everything needed to build a `SessionClient`.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub api: ApiConfig,
    pub credentials: Credentials,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Translate config + profile + global flags into API config and credentials.
///
/// CLI flag overrides take priority over profile values. A missing profile
/// is fine as long as flags/env supply the credentials.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, config);
    let mut profile = config
        .profiles
        .get(&profile_name)
        .cloned()
        .unwrap_or_default();
    if let Some(u) = global.username.as_ref().filter(|u| !u.is_empty()) {
        profile.username = Some(u.clone());
    }

    let mut api = mysmartbike_config::profile_to_api_config(&profile, &config.defaults)?;

    if let Some(ref base) = global.base_uri {
        api.base_uri = parse_flag_url("base-uri", base)?;
    }
    if let Some(ref proxy) = global.proxy {
        api.proxy = if proxy.is_empty() {
            None
        } else {
            Some(parse_flag_url("proxy", proxy)?)
        };
    }
    if global.insecure {
        api.verify_tls = false;
    }
    if let Some(secs) = global.timeout {
        api.timeout = Duration::from_secs(secs);
    }

    let credentials = mysmartbike_config::resolve_credentials(&profile, &profile_name)?;

    Ok(Resolved {
        profile_name,
        api,
        credentials,
    })
}

fn parse_flag_url(field: &str, value: &str) -> Result<url::Url, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {value}"),
    })
}

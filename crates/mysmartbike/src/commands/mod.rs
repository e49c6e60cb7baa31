//! Command dispatch and the shared login step.

pub mod bikes;
pub mod config_cmd;
pub mod login;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use mysmartbike_api::SessionClient;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// A logged-in (or about to be) client plus the context commands need.
pub struct Session {
    pub client: SessionClient,
    pub profile_name: String,
    pub cancel: CancellationToken,
}

impl Session {
    /// Resolve config and build a client. Does not talk to the network.
    pub fn open(global: &GlobalOpts, cancel: CancellationToken) -> Result<Self, CliError> {
        let cfg = mysmartbike_config::load_config()?;
        let resolved = config::resolve(global, &cfg)?;
        debug!(
            profile = %resolved.profile_name,
            base_uri = %resolved.api.base_uri,
            "resolved configuration"
        );

        let client = SessionClient::new(resolved.api, resolved.credentials)
            .map_err(|e| CliError::from_api(e, &resolved.profile_name))?;

        Ok(Self {
            client,
            profile_name: resolved.profile_name,
            cancel,
        })
    }

    /// Log in, treating "no status in the response" as a failure.
    pub async fn authenticate(&self) -> Result<(), CliError> {
        match self.client.login_with(self.cancel.clone()).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::NoResponse),
            Err(e) => Err(CliError::from_api(e, &self.profile_name)),
        }
    }
}

/// Route a command to its handler.
pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    match cmd {
        Command::Login => {
            let session = Session::open(global, cancel)?;
            login::handle(&session, global).await
        }
        Command::Bikes(args) => {
            let session = Session::open(global, cancel)?;
            bikes::handle(&session, args, global).await
        }
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            use clap::CommandFactory;

            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "mysmartbike", &mut std::io::stdout());
            Ok(())
        }
    }
}

//! Login command handler.

use owo_colors::OwoColorize;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    session.authenticate().await?;

    let user = session.client.username();
    let message = if output::should_color(&global.color) {
        format!("{} logged in as {}", "✓".green(), user.bold())
    } else {
        format!("✓ logged in as {user}")
    };
    output::print_output(&message, global.quiet);
    Ok(())
}

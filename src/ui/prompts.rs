//! Interactive prompts with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{GetpackError, GetpackResult};

/// Ask for confirmation
///
/// `--yes` approves, a non-interactive session takes `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> GetpackResult<bool> {
    if ctx.auto_yes() {
        eprintln!("  {} (auto-approved)", message);
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on terminal input
    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| GetpackError::Prompt(format!("prompt task failed: {}", e)))?;

    result.map_err(|e| GetpackError::Prompt(e.to_string()))
}

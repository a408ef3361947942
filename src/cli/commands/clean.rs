//! Clean command - remove every cached resource

use crate::cache::format_bytes;
use crate::cli::args::CleanArgs;
use crate::cli::AppContext;
use crate::error::{GetpackError, GetpackResult};
use crate::ui::{self, UiContext};
use console::style;
use tracing::debug;

/// Execute the clean command
pub async fn execute(args: CleanArgs, app: &AppContext) -> GetpackResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let entries = app.cache.entries()?;

    if entries.is_empty() {
        ui::step_info(&ctx, "Nothing to clean");
    } else {
        let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
        eprintln!(
            "This will remove {} cache entr{} ({}):",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" },
            format_bytes(total)
        );
        for entry in &entries {
            let label = entry
                .marker
                .as_ref()
                .map(|m| format!("{} {}", m.name, m.version))
                .unwrap_or_else(|| format!("{} ({})", entry.identity, entry.state));
            eprintln!("  {} {}", style("•").red(), label);
        }

        if !ui::confirm(&ctx, "Remove these entries?", false).await? {
            ui::step_warn_hint(&ctx, "Aborted", "Use --yes to skip the prompt");
            return Ok(());
        }

        let cache = app.cache.clone();
        let identities: Vec<_> = entries.into_iter().map(|e| e.identity).collect();
        let removed = tokio::task::spawn_blocking(move || -> GetpackResult<usize> {
            let mut removed = 0;
            for identity in &identities {
                debug!("Removing {}", identity);
                if cache.remove_entry(identity)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
        .await
        .map_err(|e| GetpackError::Internal(format!("clean task failed: {}", e)))??;

        let noun = if removed == 1 { "entry" } else { "entries" };
        ui::step_ok(&ctx, &format!("Removed {} {}", removed, noun));
    }

    let pruned = app.cache.store().prune_staging(app.config.staging_max_age())?;
    if pruned > 0 {
        ui::remark(&ctx, &format!("Pruned {} abandoned staging dir(s)", pruned));
    }
    Ok(())
}

//! Remove command - delete one resource from the cache

use crate::cli::args::ResourceArgs;
use crate::cli::AppContext;
use crate::error::{GetpackError, GetpackResult};
use crate::ui::{self, UiContext};

/// Execute the remove command
pub async fn execute(args: ResourceArgs, app: &AppContext) -> GetpackResult<()> {
    let ctx = UiContext::detect();
    let descriptor = app.descriptor(&args.name, args.version.as_deref())?;
    let label = format!("{} {}", descriptor.name(), descriptor.version());

    let cache = app.cache.clone();
    let removed = tokio::task::spawn_blocking(move || cache.remove(&descriptor))
        .await
        .map_err(|e| GetpackError::Internal(format!("remove task failed: {}", e)))??;

    if removed {
        ui::step_ok(&ctx, &format!("Removed {}", label));
    } else {
        ui::step_info(&ctx, &format!("{} is not cached", label));
    }
    Ok(())
}

//! Path command - print the local path of one resource

use crate::cli::args::ResourceArgs;
use crate::cli::AppContext;
use crate::error::{GetpackError, GetpackResult};

/// Execute the path command
pub async fn execute(args: ResourceArgs, app: &AppContext) -> GetpackResult<()> {
    let descriptor = app.descriptor(&args.name, args.version.as_deref())?;
    let handle = app.cache.handle(descriptor);

    let path = tokio::task::spawn_blocking(move || handle.activate())
        .await
        .map_err(|e| GetpackError::Internal(format!("fetch task failed: {}", e)))??;

    println!("{}", path.display());
    Ok(())
}

//! Fetch command - materialize resources concurrently

use crate::cli::args::FetchArgs;
use crate::cli::AppContext;
use crate::error::{GetpackError, GetpackResult};
use crate::ui::{FetchProgress, UiContext};
use futures_util::future::join_all;
use std::path::PathBuf;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, app: &AppContext) -> GetpackResult<()> {
    let ctx = UiContext::detect();

    // Resolve every name first so a typo fails before any download starts
    let descriptors = args
        .names
        .iter()
        .map(|name| app.descriptor(name, args.version.as_deref()))
        .collect::<GetpackResult<Vec<_>>>()?;

    let progress = FetchProgress::new(&ctx);
    let mut lines = Vec::with_capacity(descriptors.len());
    let mut tasks = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let label = format!("{} {}", descriptor.name(), descriptor.version());
        let line = progress.add(&label);
        lines.push((label, line));
        let handle = app.cache.handle(descriptor);
        tasks.push(tokio::task::spawn_blocking(move || handle.activate()));
    }

    let mut first_error = None;
    for ((label, line), joined) in lines.into_iter().zip(join_all(tasks).await) {
        let result: GetpackResult<PathBuf> = joined
            .map_err(|e| GetpackError::Internal(format!("fetch task failed: {}", e)))
            .and_then(|r| r);
        match result {
            Ok(path) => {
                line.finish_ok(&path.display().to_string());
                println!("{}\t{}", label, path.display());
            }
            Err(e) => {
                line.finish_error(&e.to_string());
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

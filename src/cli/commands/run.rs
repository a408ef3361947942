//! Run command - execute the program shipped in a resource

use crate::cli::args::RunArgs;
use crate::cli::AppContext;
use crate::error::{GetpackError, GetpackResult};
use crate::executable::Executable;
use crate::ui::{TaskSpinner, UiContext};
use tracing::debug;

/// Execute the run command
///
/// The program inherits stdio; its exit status becomes ours.
pub async fn execute(args: RunArgs, app: &AppContext) -> GetpackResult<()> {
    let ctx = UiContext::detect();
    let descriptor = app.descriptor(&args.name, args.version.as_deref())?;
    let label = format!("{} {}", descriptor.name(), descriptor.version());
    let executable = Executable::new(app.cache.handle(descriptor));

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Preparing {}", label));
    let prepared = tokio::task::spawn_blocking(move || executable.command(&args.args))
        .await
        .map_err(|e| GetpackError::Internal(format!("run task failed: {}", e)))?;

    let mut command = match prepared {
        Ok(command) => {
            spinner.stop(&format!("{} ready", label));
            command
        }
        Err(e) => {
            spinner.stop_error(&format!("{} unavailable", label));
            return Err(e);
        }
    };

    debug!("Running {:?}", command);
    let command_line = format!("{:?}", command);
    let status = tokio::task::spawn_blocking(move || command.status())
        .await
        .map_err(|e| GetpackError::Internal(format!("run task failed: {}", e)))?
        .map_err(|e| GetpackError::command_failed(command_line, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(GetpackError::ChildExit(status.code().unwrap_or(1)))
    }
}

//! Terminal output for the getpack CLI
//!
//! Interactive terminals get `cliclack` styling and `indicatif` spinners;
//! pipes and CI get plain, line-oriented text. Status lines go to stderr so
//! that command results on stdout stay machine readable.
//!
//! # Example
//!
//! ```rust,ignore
//! use getpack::ui::{self, UiContext, FetchProgress};
//!
//! let ctx = UiContext::detect();
//! let progress = FetchProgress::new(&ctx);
//! let line = progress.add("ffmpeg 5.1.2");
//! // ... materialize ...
//! line.finish_ok("/home/me/.cache/getpack/tool-5.1.2-...");
//!
//! if ui::confirm(&ctx.with_auto_yes(args.yes), "Remove 3 entries?", false).await? {
//!     // ...
//! }
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{remark, step_info, step_ok, step_ok_detail, step_warn_hint};
pub use progress::{FetchLine, FetchProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, GetpackTheme};

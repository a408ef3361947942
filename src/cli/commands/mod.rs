//! CLI command implementations

pub mod catalog;
pub mod clean;
pub mod completions;
pub mod config;
pub mod fetch;
pub mod list;
pub mod path;
pub mod remove;
pub mod run;

pub use catalog::execute as catalog;
pub use clean::execute as clean;
pub use completions::execute as completions;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use list::execute as list;
pub use path::execute as path;
pub use remove::execute as remove;
pub use run::execute as run;

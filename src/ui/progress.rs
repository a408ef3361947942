//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// A single cliclack spinner for one blocking task
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner. Silent in plain mode.
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        }
    }

    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// One spinner line per resource while several fetch concurrently
pub struct FetchProgress {
    multi: Option<MultiProgress>,
    style: Option<ProgressStyle>,
}

/// Progress line of one resource
pub struct FetchLine {
    bar: Option<ProgressBar>,
    label: String,
}

impl FetchProgress {
    pub fn new(ctx: &UiContext) -> Self {
        if !ctx.use_fancy_output() {
            return Self {
                multi: None,
                style: None,
            };
        }
        let style =
            ProgressStyle::with_template("  {spinner:.cyan} {prefix:.bold} {msg}  {elapsed:.dim}")
                .ok()
                .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        Self {
            multi: Some(MultiProgress::new()),
            style,
        }
    }

    /// Add a line for `label` (e.g. `ffmpeg 5.1.2`)
    pub fn add(&self, label: &str) -> FetchLine {
        let bar = self.multi.as_ref().map(|multi| {
            let bar = multi.add(ProgressBar::new_spinner());
            if let Some(style) = &self.style {
                bar.set_style(style.clone());
            }
            bar.set_prefix(label.to_string());
            bar.set_message(style("materializing").dim().to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        if bar.is_none() {
            eprintln!("{} {}", style("...").dim(), label);
        }
        FetchLine {
            bar,
            label: label.to_string(),
        }
    }
}

impl FetchLine {
    pub fn finish_ok(&self, detail: &str) {
        match &self.bar {
            Some(bar) => bar.finish_with_message(format!(
                "{} {}",
                style("✓").green(),
                style(detail).dim()
            )),
            None => eprintln!("{} {} ({})", style("[OK]").green(), self.label, detail),
        }
    }

    pub fn finish_error(&self, error: &str) {
        match &self.bar {
            Some(bar) => {
                bar.finish_with_message(format!("{} {}", style("✗").red(), style(error).red()))
            }
            None => eprintln!("{} {}: {}", style("[FAIL]").red(), self.label, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Testing...");
        spinner.stop("Done");
        // Should not panic
    }

    #[test]
    fn fetch_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = FetchProgress::new(&ctx);
        let ok = progress.add("tool 1.0");
        let failed = progress.add("tool 2.0");
        assert!(ok.bar.is_none());
        ok.finish_ok("/cache/tool-1.0-abc");
        failed.finish_error("Download failed");
    }
}

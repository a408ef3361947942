//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::cli::AppContext;
use crate::config::{Config, ConfigManager};
use crate::error::GetpackResult;
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(args: ConfigArgs, app: &AppContext) -> GetpackResult<()> {
    let manager = ConfigManager::with_path(app.config_path.clone());

    match args.action {
        None | Some(ConfigAction::Show) => show_config(app)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(&manager, force).await?,
    }

    Ok(())
}

fn show_config(app: &AppContext) -> GetpackResult<()> {
    println!("{}", toml::to_string_pretty(&app.config)?);
    println!("# effective cache root: {}", app.cache.root().display());
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> GetpackResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

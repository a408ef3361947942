//! List command - show cached resources

use crate::cache::{format_bytes, CacheEntryInfo, EntryState};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::cli::AppContext;
use crate::error::GetpackResult;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// Execute the list command
pub async fn execute(args: ListArgs, app: &AppContext) -> GetpackResult<()> {
    let entries = app.cache.entries()?;

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                let root = app.cache.root().display();
                ui::step_info(&ctx, &format!("No cached resources in {}", root));
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[CacheEntryInfo]) {
    println!(
        "{:<16} {:<12} {:<10} {:<10} {:<17} {}",
        style("NAME").bold(),
        style("VERSION").bold(),
        style("STATE").bold(),
        style("SIZE").bold(),
        style("INSTALLED").bold(),
        style("IDENTITY").bold()
    );
    println!("{}", "-".repeat(100));

    let mut total = 0;
    for entry in entries {
        total += entry.size_bytes;
        let state = match entry.state {
            EntryState::Complete => style("complete").green(),
            EntryState::Partial => style("partial").yellow(),
            EntryState::Absent => style("absent").dim(),
        };
        let (name, version, installed) = match &entry.marker {
            Some(m) => (
                m.name.as_str(),
                m.version.as_str(),
                m.installed_at.format("%Y-%m-%d %H:%M").to_string(),
            ),
            None => ("?", "?", "-".to_string()),
        };

        println!(
            "{:<16} {:<12} {:<10} {:<10} {:<17} {}",
            name,
            version,
            state,
            format_bytes(entry.size_bytes),
            installed,
            style(&entry.identity).dim()
        );
    }

    println!();
    println!(
        "{} entr{}, {}",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        format_bytes(total)
    );
}

#[derive(Serialize)]
struct EntryJson<'a> {
    identity: &'a str,
    path: String,
    state: EntryState,
    size_bytes: u64,
    name: Option<&'a str>,
    kind: Option<&'a str>,
    version: Option<&'a str>,
    source: Option<&'a str>,
    installed_at: Option<String>,
}

fn print_json(entries: &[CacheEntryInfo]) -> GetpackResult<()> {
    let json: Vec<EntryJson<'_>> = entries
        .iter()
        .map(|e| EntryJson {
            identity: e.identity.as_str(),
            path: e.path.display().to_string(),
            state: e.state,
            size_bytes: e.size_bytes,
            name: e.marker.as_ref().map(|m| m.name.as_str()),
            kind: e.marker.as_ref().map(|m| m.kind.as_str()),
            version: e.marker.as_ref().map(|m| m.version.as_str()),
            source: e.marker.as_ref().map(|m| m.source.as_str()),
            installed_at: e.marker.as_ref().map(|m| m.installed_at.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_plain(entries: &[CacheEntryInfo]) {
    for entry in entries {
        println!("{}", entry.path.display());
    }
}

//! Catalog command - show declared resources

use crate::cli::args::{ListArgs, OutputFormat};
use crate::cli::AppContext;
use crate::error::GetpackResult;
use crate::resource::Overrides;
use console::style;
use serde::Serialize;

#[derive(Serialize)]
struct CatalogRow {
    name: String,
    kind: String,
    version: String,
    source: String,
    cached: bool,
}

/// Execute the catalog command
pub async fn execute(args: ListArgs, app: &AppContext) -> GetpackResult<()> {
    let rows = rows(app)?;

    match args.format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{}", row.name);
            }
        }
    }
    Ok(())
}

fn rows(app: &AppContext) -> GetpackResult<Vec<CatalogRow>> {
    app.catalog
        .names()
        .map(|name| {
            let descriptor = app.catalog.descriptor(name, &Overrides::default())?;
            Ok(CatalogRow {
                name: name.to_string(),
                kind: descriptor.kind().to_string(),
                version: descriptor.version().to_string(),
                source: descriptor.source()?,
                cached: app.cache.status(&descriptor)?.is_complete(),
            })
        })
        .collect()
}

fn print_table(rows: &[CatalogRow]) {
    println!(
        "{:<14} {:<8} {:<10} {:<7} {}",
        style("NAME").bold(),
        style("KIND").bold(),
        style("VERSION").bold(),
        style("CACHED").bold(),
        style("SOURCE").bold()
    );
    println!("{}", "-".repeat(80));

    for row in rows {
        let cached = if row.cached {
            style("yes").green()
        } else {
            style("no").dim()
        };
        println!(
            "{:<14} {:<8} {:<10} {:<7} {}",
            row.name,
            row.kind,
            row.version,
            cached,
            style(&row.source).dim()
        );
    }
}

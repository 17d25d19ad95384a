use anyhow::{Result, bail};
use comfy_table::{Cell, Table};
use serde_json::json;

use tokenroute_core::{AppConfig, HandlerRegistry, RegistryError};

use crate::cli::OutputFormat;
use crate::output::{json::print_json, table::print_table};

use super::registry_builder;

pub async fn run(config: AppConfig, format: OutputFormat) -> Result<()> {
    let builder = registry_builder(&config)?;
    let report = match builder
        .rebuild(&config.routing, &HandlerRegistry::empty())
        .await
    {
        Ok(report) => report,
        Err(RegistryError::FetchFailed { total, failures }) => {
            for failure in &failures {
                eprintln!("{}: {}", failure.handler, failure.error);
            }
            bail!("{} of {} handler metadata fetches failed", failures.len(), total);
        }
    };
    let registry = report.registry;

    if format.is_json() {
        let handlers: Vec<_> = registry
            .records()
            .into_iter()
            .map(|record| {
                json!({
                    "record": record,
                    "channel": registry.channel_of(&record.id),
                })
            })
            .collect();
        let carried_over: Vec<_> = report
            .carried_over
            .iter()
            .map(|f| json!({ "handler": f.handler.to_string(), "error": f.error.to_string() }))
            .collect();
        return print_json(&json!({ "handlers": handlers, "carried_over": carried_over }));
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Handler",
        "Name",
        "Active",
        "Invocations",
        "Contract",
        "Channel",
    ]);
    for record in registry.records() {
        table.add_row(vec![
            Cell::new(&record.id),
            Cell::new(&record.name),
            Cell::new(if record.active { "yes" } else { "no" }),
            Cell::new(record.invocation_count),
            Cell::new(record.contract_id.as_deref().unwrap_or("-")),
            Cell::new(registry.channel_of(&record.id).unwrap_or("-")),
        ]);
    }
    print_table(table)?;

    for failure in &report.carried_over {
        eprintln!("Kept previous record for {}: {}", failure.handler, failure.error);
    }
    Ok(())
}

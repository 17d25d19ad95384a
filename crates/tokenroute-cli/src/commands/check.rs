use anyhow::Result;
use comfy_table::{Cell, Table};
use serde_json::json;

use tokenroute_core::AppConfig;
use tokenroute_core::registry::collect_handler_references;

use crate::cli::OutputFormat;
use crate::output::{json::print_json, table::print_table};

pub fn run(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let routing = &config.routing;
    let references = collect_handler_references(&routing.channels);

    if format.is_json() {
        let channels: Vec<_> = routing
            .channels
            .iter()
            .map(|channel| {
                json!({
                    "id": channel.id,
                    "name": channel.name,
                    "default": channel.handler.as_ref().map(|h| h.default.to_string()),
                })
            })
            .collect();
        let handlers: Vec<_> = references
            .handlers
            .iter()
            .map(|id| {
                json!({
                    "id": id.to_string(),
                    "channel": references.channel_of_handler.get(id),
                })
            })
            .collect();
        return print_json(&json!({ "channels": channels, "handlers": handlers }));
    }

    let mut table = Table::new();
    table.set_header(vec!["Channel", "Name", "Default", "String triggers", "Range triggers"]);
    for channel in routing.channels.iter() {
        let (default, strings, ranges) = match &channel.handler {
            Some(handler) => (
                handler.default.to_string(),
                handler.string_triggers.len(),
                handler.token_id_triggers.iter().map(Vec::len).sum::<usize>(),
            ),
            None => ("-".to_string(), 0, 0),
        };
        table.add_row(vec![
            Cell::new(&channel.id),
            Cell::new(&channel.name),
            Cell::new(default),
            Cell::new(strings),
            Cell::new(ranges),
        ]);
    }
    print_table(table)?;

    let mut table = Table::new();
    table.set_header(vec!["Handler", "Channel", "Contract"]);
    for id in &references.handlers {
        let contract = match id.contract() {
            Some(name) if routing.contract(name).is_some() => name.to_string(),
            Some(name) => format!("{} (no descriptor)", name),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(id),
            Cell::new(
                references
                    .channel_of_handler
                    .get(id)
                    .map(String::as_str)
                    .unwrap_or("-"),
            ),
            Cell::new(contract),
        ]);
    }
    print_table(table)?;

    println!(
        "Configuration OK: {} channels, {} handlers",
        routing.channels.len(),
        references.handlers.len()
    );
    Ok(())
}

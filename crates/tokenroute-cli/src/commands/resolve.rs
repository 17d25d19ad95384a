use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use tokenroute_core::{AppConfig, RegistryHandle, Router};

use crate::cli::{OutputFormat, ResolveArgs};
use crate::output::json::print_json;

pub fn run(config: &AppConfig, args: ResolveArgs, format: OutputFormat) -> Result<()> {
    let text = args.text.join(" ");
    let router = Router::new(Arc::new(config.routing.clone()), RegistryHandle::new());
    let handler = router.resolve(&args.channel, &text)?;

    if format.is_json() {
        return print_json(&json!({
            "channel": args.channel,
            "text": text,
            "handler": handler.map(|id| id.to_string()),
        }));
    }

    match handler {
        Some(id) => println!("{}", id),
        None => println!("Channel {} does not have a handler", args.channel),
    }
    Ok(())
}

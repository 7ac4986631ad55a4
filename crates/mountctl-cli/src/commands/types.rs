//! Types command - list the mount backends compiled into this binary.

use anyhow::Result;
use clap::Args as ClapArgs;
use comfy_table::{Cell, Color, Table};
use tracing::instrument;

use mountctl_core::ControlConfig;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::types", skip_all)]
pub fn execute(args: &Args, config: ControlConfig) -> Result<()> {
    let control = super::build_control(config);
    let default = control.select_backend(None);
    let backends = control.backends().describe();

    if args.json {
        let default_type = (!default.is_empty()).then_some(&default);
        let output = serde_json::json!({
            "types": control.list_backend_types(),
            "default": default_type,
            "priority": control.config().backend_priority,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if backends.is_empty() {
        eprintln!("No mount backends are available in this build.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Type", "Default", "Description"]);
    for (name, description) in &backends {
        let marker = if *name == default {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("")
        };
        table.add_row(vec![Cell::new(name), marker, Cell::new(description)]);
    }
    println!("{table}");

    if default.is_empty() {
        eprintln!(
            "No backend from the priority list ({}) is available; pass backendName explicitly.",
            control.config().backend_priority.join(", ")
        );
    }
    Ok(())
}

//! Calls command - describe the calls accepted by `serve`.

use anyhow::Result;
use clap::Args as ClapArgs;
use comfy_table::Table;

use mountctl_core::rc::CallTable;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output in JSON format, including the full help text
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: &Args) -> Result<()> {
    let table = CallTable::new();

    if args.json {
        let calls: Vec<_> = table
            .calls()
            .iter()
            .map(|c| {
                serde_json::json!({
                    "path": c.path,
                    "title": c.title,
                    "authRequired": c.auth_required,
                    "help": c.help,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&calls)?);
        return Ok(());
    }

    let mut out = Table::new();
    out.set_header(vec!["Path", "Title", "Auth"]);
    for call in table.calls() {
        out.add_row(vec![
            call.path,
            call.title,
            if call.auth_required { "required" } else { "-" },
        ]);
    }
    println!("{out}");
    Ok(())
}

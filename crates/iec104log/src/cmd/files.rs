use iec104log_store::ConnectionInfo;

use crate::cmd::{Context, FilesArgs};
use crate::exit::{store_error, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

pub fn run(_args: FilesArgs, ctx: &Context) -> CliResult<i32> {
    let listed = ctx
        .catalog()
        .list_connections()
        .map_err(|err| store_error("listing failed", err))?;

    match ctx.format {
        OutputFormat::Json => print_json(&listed),
        OutputFormat::Table => {
            let mut table = table(vec!["ROLE", "NAME", "SIZE", "MODIFIED"]);
            for info in listed.client.iter().chain(&listed.server) {
                table.add_row(vec![
                    info.role.to_string(),
                    info.name.clone(),
                    info.size_formatted.clone(),
                    info.modified.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            print_group("client", &listed.client);
            print_group("server", &listed.server);
        }
        OutputFormat::Raw => {
            for info in listed.client.iter().chain(&listed.server) {
                println!("{}/{}", info.role, info.name);
            }
        }
    }

    Ok(SUCCESS)
}

fn print_group(label: &str, files: &[ConnectionInfo]) {
    println!("{label} ({})", files.len());
    for info in files {
        println!("  {:<32} {:>12}  {}", info.name, info.size_formatted, info.modified);
    }
}

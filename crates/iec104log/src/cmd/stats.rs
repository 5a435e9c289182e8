use std::collections::BTreeMap;

use serde::Serialize;

use crate::cmd::{Context, StatsArgs};
use crate::exit::{store_error, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Serialize)]
struct StatsOutput<'a> {
    store: String,
    #[serde(flatten)]
    stats: &'a iec104log_store::Stats,
}

pub fn run(args: StatsArgs, ctx: &Context) -> CliResult<i32> {
    let id = args.store.store_id()?;
    let stats = ctx
        .catalog()
        .get_stats(&id)
        .map_err(|err| store_error("stats failed", err))?;

    match ctx.format {
        OutputFormat::Json => print_json(&StatsOutput {
            store: id.to_string(),
            stats: &stats,
        }),
        OutputFormat::Table => {
            let mut table = table(vec!["GROUP", "KEY", "COUNT"]);
            table.add_row(vec!["total".to_string(), String::new(), stats.total.to_string()]);
            for (group, counts) in groups(&stats) {
                for (key, count) in counts {
                    table.add_row(vec![group.to_string(), key.clone(), count.to_string()]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{id}: {} frames", stats.total);
            for (group, counts) in groups(&stats) {
                if counts.is_empty() {
                    continue;
                }
                println!("  {group}");
                for (key, count) in counts {
                    println!("    {count:>8}  {key}");
                }
            }
        }
        OutputFormat::Raw => println!("{}", stats.total),
    }

    Ok(SUCCESS)
}

fn groups(stats: &iec104log_store::Stats) -> [(&'static str, &BTreeMap<String, u64>); 4] {
    [
        ("direction", &stats.by_direction),
        ("frame_type", &stats.by_frame_type),
        ("type_id", &stats.by_type_id),
        ("cause", &stats.by_cause),
    ]
}

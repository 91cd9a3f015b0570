use anyhow::Result;
use clap::Args;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use sewerflow_parser::summarize;

use super::{format_optional, load_tables, InputArgs};

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn handle_summarize_command(args: &SummarizeArgs) -> Result<()> {
    for loaded in load_tables(&args.input)? {
        let summary = summarize(&loaded.table);

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Parameter", "Count", "Min", "Max", "Mean"]);
        for (parameter, stats) in &summary.parameters {
            table.add_row(vec![
                parameter.clone(),
                stats.count.to_string(),
                format_optional(stats.min),
                format_optional(stats.max),
                format_optional(stats.mean),
            ]);
        }

        println!("{} ({})", loaded.site, loaded.path.display());
        println!(
            "  rows: {}  records imported: {}",
            summary.row_count, summary.records_imported
        );
        match &summary.time_range {
            Some([start, end]) => println!("  range: {start} .. {end}"),
            None => println!("  range: -"),
        }
        if let Some(hash) = &loaded.table.source_hash {
            println!("  blake3: {hash}");
        }
        println!("{table}\n");
    }
    Ok(())
}

mod config;
mod heuristics;
mod llm_extract;
mod order;
mod pdf_extract;
mod pipeline;
mod sheet;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Fill order-note spreadsheets from purchase-order PDFs")]
struct Cli {
    /// TOML config; missing file means defaults.
    #[arg(long, global = true, env = "ORDERSHEET_CONFIG", default_value = "ordersheet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process every PDF in the input folder (default).
    Run,
    /// Extract one PDF and print the order as JSON.
    Extract { pdf: PathBuf },
    /// Build a spreadsheet from an order JSON file.
    Fill {
        order: PathBuf,
        output: PathBuf,
        /// Overrides `paths.template`.
        #[arg(long)]
        template: Option<PathBuf>,
    },
    /// Write a blank order-note template.
    Template { output: PathBuf },
    /// Show item rows and merged ranges of a filled sheet.
    Inspect { xlsx: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing, RUST_LOG wins over the default
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::Config::load_or_default(&cli.config)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let summary = pipeline::run_batch(&cfg).await?;
            if summary.failed > 0 {
                return Err(format!("{} file(s) could not be written", summary.failed).into());
            }
        }
        Command::Extract { pdf } => {
            let bytes = std::fs::read(&pdf)?;
            let extractor = llm_extract::Extractor::new(&cfg.llm)?;
            extractor.preflight().await?;
            let order = extractor.extract(&bytes).await?;
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
        Command::Fill {
            order: order_json,
            output,
            template,
        } => {
            let json = std::fs::read_to_string(&order_json)?;
            let record: order::OrderRecord = serde_json::from_str(&json)?;
            let template = template.unwrap_or_else(|| PathBuf::from(&cfg.paths.template));
            let report = pipeline::fill_workbook(&template, &record, &output)?;
            info!(
                last_item_row = report.last_item_row,
                rows_removed = report.rows_removed,
                clean = report.is_clean(),
                "Sheet assembled"
            );
        }
        Command::Template { output } => {
            sheet::template::write_template(&output)?;
            info!(output = %output.display(), "Template written");
        }
        Command::Inspect { xlsx } => {
            let book = umya_spreadsheet::reader::xlsx::read(&xlsx)?;
            let ws = book
                .get_sheet(&0)
                .ok_or("workbook has no worksheets")?;
            let (merges, invalid) = sheet::merged_ranges(ws);
            println!("item rows: {}", sheet::count_item_rows(ws));
            println!("highest row: {}", ws.get_highest_row());
            for range in &merges {
                println!("merge {range}");
            }
            for raw in &invalid {
                println!("invalid merge {raw}");
            }
        }
    }

    Ok(())
}

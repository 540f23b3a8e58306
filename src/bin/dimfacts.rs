use std::path::PathBuf;
use std::process;

use clap::Parser;

use retail_dw::builder::build_warehouse;
use retail_dw::model::error::EtlError;
use retail_dw::report::build_reporter;
use retail_dw::storage::CsvStore;

/// Builds the dimension and fact tables from the staging layer.
#[derive(Parser, Debug)]
#[command(name = "dimfacts", version, about)]
struct Args {
    /// Directory holding the staging CSVs
    #[arg(long, default_value = "STAGING")]
    staging_dir: PathBuf,

    /// Directory the warehouse CSVs are written to
    #[arg(long, default_value = "DW")]
    dw_dir: PathBuf,

    /// Append run events to this file as JSON lines
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(EtlError::MissingDirectory(path)) => {
            eprintln!(
                "Error: staging directory does not exist: {}. Run denormalize first.",
                path.display()
            );
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<bool, EtlError> {
    let reporter = build_reporter(args.log_file.as_deref())?;
    let staging = CsvStore::new(&args.staging_dir);
    let warehouse = CsvStore::new(&args.dw_dir);

    println!("Reading staging from: {}", staging.dir().display());
    println!("Writing warehouse to: {}", warehouse.dir().display());

    let summary = build_warehouse(&staging, &warehouse, reporter.as_ref())?;
    println!(
        "Warehouse ready: {} tables written, {} skipped",
        summary.written, summary.skipped
    );
    Ok(summary.ok())
}

use std::path::PathBuf;
use std::process;

use clap::Parser;

use retail_dw::denormalize::build_staging;
use retail_dw::model::error::EtlError;
use retail_dw::report::build_reporter;
use retail_dw::storage::CsvStore;

/// Builds denormalized staging tables from the raw CSV extract.
#[derive(Parser, Debug)]
#[command(name = "denormalize", version, about)]
struct Args {
    /// Directory holding the raw CSV extract
    #[arg(long, default_value = "raw")]
    raw_dir: PathBuf,

    /// Directory the staging CSVs are written to
    #[arg(long, default_value = "STAGING")]
    staging_dir: PathBuf,

    /// Append run events to this file as JSON lines
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<bool, EtlError> {
    let reporter = build_reporter(args.log_file.as_deref())?;
    let raw = CsvStore::new(&args.raw_dir);
    let staging = CsvStore::new(&args.staging_dir);

    let summary = build_staging(&raw, &staging, reporter.as_ref())?;
    println!(
        "Staging ready in {}: {} tables written, {} skipped",
        staging.dir().display(),
        summary.written,
        summary.skipped
    );
    Ok(summary.ok())
}

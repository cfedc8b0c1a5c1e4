//! CLI tool for turning a PDF statement into debit/credit CSV rows

use clap::Parser;
use ledger_inspector::export::{output_file_name, write_csv_file};
use ledger_inspector::{process_statement_with_options, LedgerError, ParseOptions};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "ledger2csv", version, about = "Recover debit/credit rows from a PDF statement")]
struct Args {
    /// PDF statement to read
    pdf: PathBuf,

    /// Output CSV path (default: Resultado_<name>.csv next to the PDF)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the parsed statement as JSON instead of writing CSV
    #[arg(long)]
    json: bool,

    /// Vertical bucket size used to group text into lines
    #[arg(long, default_value_t = 3.0, value_parser = parse_bucket)]
    line_bucket: f32,

    /// Identifier substring marking rows to drop (repeatable, replaces the defaults)
    #[arg(long = "skip-marker", value_parser = parse_marker)]
    skip_markers: Vec<String>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_bucket(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err("line bucket must be positive".to_string())
    }
}

fn parse_marker(s: &str) -> Result<String, String> {
    if s.is_empty() {
        Err("skip marker must not be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        if args.json {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
        } else {
            eprintln!("Error: {}", e);
        }
        let code = if matches!(e, LedgerError::NoTextLayer) { 2 } else { 1 };
        process::exit(code);
    }
}

fn run(args: &Args) -> Result<(), LedgerError> {
    let mut options = ParseOptions {
        line_bucket: args.line_bucket,
        ..ParseOptions::default()
    };
    if !args.skip_markers.is_empty() {
        options.skip_markers = args.skip_markers.clone();
    }

    let statement = process_statement_with_options(&args.pdf, &options)?;

    if args.json {
        println!("{}", statement.to_json()?);
        return Ok(());
    }

    eprintln!("File: {}", args.pdf.display());
    eprintln!("Pages: {}", statement.page_count);
    eprintln!(
        "Rows: {} ({} excluded)",
        statement.rows.len(),
        statement.excluded_row_count
    );
    eprintln!(
        "Cut-point: x={:.2}{}",
        statement.calibration.cut_point,
        if statement.calibration.is_degraded() {
            " (global median)"
        } else {
            ""
        }
    );
    if statement.has_advisories() {
        eprintln!("{} warning(s):", statement.advisories.len());
        for advisory in &statement.advisories {
            eprintln!("  {}", advisory);
        }
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| output_file_name(&args.pdf));
    write_csv_file(&statement.rows, &output)?;
    eprintln!("CSV written to: {}", output.display());
    Ok(())
}

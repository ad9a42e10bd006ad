//! IntelliDealer CLI - Convert invoice CSV exports to IntelliDealer uploads
//!
//! # Main Commands
//!
//! ```bash
//! intellidealer process march.csv              # Write IntelliDealer_Upload_march.csv (+ march_PARTS.csv)
//! intellidealer process march.csv --balancing  # Add one RAMP PAYMENT row per record
//! intellidealer serve                          # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! intellidealer parse march.csv                # Just parse CSV to JSON
//! intellidealer locations                      # Show the location table in use
//! ```
//!
//! # Environment
//!
//! `INTELLIDEALER_PORT`, `INTELLIDEALER_LOCATIONS` and `INTELLIDEALER_OUTPUT_DIR`
//! are read from the environment or a `.env` file. Flags win over them.

use clap::{Parser, Subcommand};
use intellidealer::{
    parse_csv_file_auto, process_file, table_to_json, write_outputs, BalancingBankCostCtr, GroupingMode,
    LocationTable, PipelineOptions, Settings,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Record lines shown in the QA table.
const SUMMARY_RECORD_LINES: usize = 20;

#[derive(Parser)]
#[command(name = "intellidealer")]
#[command(about = "Convert invoice CSV exports to the IntelliDealer upload layout", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: CSV → IntelliDealer upload CSV + parts CSV
    Process {
        /// Input CSV file
        input: PathBuf,

        /// Directory for output files (default: INTELLIDEALER_OUTPUT_DIR, else next to the input)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Location table JSON file (default: INTELLIDEALER_LOCATIONS, else built-in)
        #[arg(short, long)]
        locations: Option<PathBuf>,

        /// Leave purchase dates and empty invoice numbers as they are
        #[arg(long)]
        no_fill: bool,

        /// Do not emit the Record ID column
        #[arg(long)]
        no_record_id: bool,

        /// Keep the original casing
        #[arg(long)]
        no_uppercase: bool,

        /// Add a balancing RAMP PAYMENT row ahead of each record
        #[arg(short, long)]
        balancing: bool,

        /// Record grouping: bank-account or invoice-change
        #[arg(long, default_value = "bank-account")]
        grouping_mode: GroupingMode,

        /// Bank Cost Ctr of balancing rows: empty or from-record
        #[arg(long, default_value = "empty")]
        balancing_bank_cost_ctr: BalancingBankCostCtr,

        /// Also write the QA summary as JSON to this file
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the location table as JSON
    Locations {
        /// Location table JSON file (default: INTELLIDEALER_LOCATIONS, else built-in)
        #[arg(short, long)]
        locations: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: INTELLIDEALER_PORT, else 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Location table JSON file (default: INTELLIDEALER_LOCATIONS, else built-in)
        #[arg(short, long)]
        locations: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match Settings::from_env() {
        Err(e) => Err(e.into()),
        Ok(settings) => match cli.command {
            Commands::Process {
                input,
                out_dir,
                locations,
                no_fill,
                no_record_id,
                no_uppercase,
                balancing,
                grouping_mode,
                balancing_bank_cost_ctr,
                summary_json,
            } => {
                let options = PipelineOptions {
                    fill_invoice_and_date: !no_fill,
                    assign_record_id: !no_record_id,
                    uppercase_output: !no_uppercase,
                    synthesize_balancing_rows: balancing,
                    grouping_mode,
                    balancing_bank_cost_ctr,
                };
                cmd_process(
                    &settings,
                    &input,
                    out_dir.as_deref(),
                    locations.as_deref(),
                    &options,
                    summary_json.as_deref(),
                )
            }

            Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

            Commands::Locations { locations } => cmd_locations(&settings, locations.as_deref()),

            Commands::Serve { port, locations } => cmd_serve(&settings, port, locations.as_deref()).await,
        },
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_locations(settings: &Settings, path: Option<&Path>) -> Result<LocationTable, Box<dyn std::error::Error>> {
    let table = match path {
        Some(path) => LocationTable::load(path)?,
        None => settings.location_table()?,
    };
    Ok(table)
}

fn cmd_process(
    settings: &Settings,
    input: &Path,
    out_dir: Option<&Path>,
    locations: Option<&Path>,
    options: &PipelineOptions,
    summary_json: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let locations = load_locations(settings, locations)?;
    let output = process_file(input, options, &locations)?;

    eprintln!("   Encoding: {}", output.csv_info.encoding);
    eprintln!("   Columns: {}", output.csv_info.headers.join(", "));

    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| settings.output_dir.clone())
        .or_else(|| input.parent().filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    for path in write_outputs(&output, &dir)? {
        eprintln!("   💾 Saved to: {}", path.display());
    }

    eprintln!("\n{}", output.summary.to_table(SUMMARY_RECORD_LINES));

    if let Some(path) = summary_json {
        fs::write(path, serde_json::to_string_pretty(&output.summary)?)?;
        eprintln!("   💾 Summary saved to: {}", path.display());
    }

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'",
        match result.delimiter {
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        }
    );
    eprintln!("   Columns: {}", result.table.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.table.len());

    let json = serde_json::to_string_pretty(&table_to_json(&result.table))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_locations(settings: &Settings, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_locations(settings, path)?;
    println!("{}", table.to_json()?);
    Ok(())
}

async fn cmd_serve(
    settings: &Settings,
    port: Option<u16>,
    locations: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let locations = load_locations(settings, locations)?;
    intellidealer::api::start_server(port.unwrap_or(settings.port), locations).await
}

fn write_output(content: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("   💾 Saved to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

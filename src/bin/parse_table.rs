use std::fs;
use std::path::PathBuf;

use clap::Parser;
use weather_station_service::config::Config;
use weather_station_service::fetcher::StationFetcher;
use weather_station_service::table_parser::{HeaderPolicy, ParserConfig, TableParser};
use weather_station_service::utils::validate_station_code;

#[derive(Parser)]
#[command(name = "parse-table")]
#[command(about = "Parse an INMET station table from a saved page or the live site", long_about = None)]
struct Cli {
    /// Saved HTML page to parse
    #[arg(short, long, conflicts_with = "station", required_unless_present = "station")]
    file: Option<PathBuf>,

    /// Station code to fetch live (e.g. A871)
    #[arg(short, long)]
    station: Option<String>,

    /// Station id used in error messages when parsing a file
    #[arg(long, default_value = "LOCAL")]
    station_id: String,

    /// Print header block and untyped rows instead of records
    #[arg(long)]
    raw: bool,

    /// two-row or single-row
    #[arg(long, env = "HEADER_POLICY", default_value = "two-row")]
    header_policy: HeaderPolicy,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let parser = TableParser::new(&ParserConfig {
        header_policy: cli.header_policy,
        ..ParserConfig::default()
    })?;

    let (markup, station_id) = match (&cli.file, &cli.station) {
        (Some(path), _) => (fs::read_to_string(path)?, cli.station_id.clone()),
        (None, Some(station)) => {
            let station = validate_station_code(station)?.to_string();
            let fetcher = StationFetcher::from_config(&Config::from_env()?)?;
            eprintln!("Fetching {}...", fetcher.station_url(&station));
            (fetcher.fetch_markup(&station).await?, station)
        }
        (None, None) => return Err("either --file or --station is required".into()),
    };

    let json = if cli.raw {
        serde_json::to_string_pretty(&parser.extract_raw(&markup, &station_id)?)?
    } else {
        let parsed = parser.parse(&markup, &station_id)?;
        eprintln!(
            "{} records, {} columns",
            parsed.records.len(),
            parsed.column_headers.len()
        );
        serde_json::to_string_pretty(&parsed)?
    };

    println!("{}", json);
    Ok(())
}

//! CLI entry point for the CTA feed decoder.
//!
//! Provides subcommands for decoding a saved or remote feed of any kind and
//! for fetching live train arrivals, a train run, or bus predictions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use cta_feeds::{
    DecodeError, FeedKind, TrainTopology,
    arrivals::ArrivalFilter,
    config::CtaConfig,
    decode,
    decoder::{decode_bus_arrivals, decode_train_arrivals, decode_train_follow},
    fetch::{BasicClient, fetch_bytes, fetch_feed},
    output::{append_record, print_pretty, write_json},
    requests::CtaRequest,
    summary::DecodeSummary,
};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cta_feeds")]
#[command(about = "Decode CTA Train Tracker and Bus Tracker feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a saved feed file or a full feed URL and print it as JSON
    Decode {
        /// Feed kind (train-arrivals, train-positions, train-follow, bus-routes,
        /// bus-directions, bus-stops, bus-patterns, bus-arrivals, bus-vehicles)
        #[arg(value_name = "KIND")]
        kind: FeedKind,

        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// "L" stops CSV used to resolve station and stop ids
        #[arg(short, long)]
        topology: Option<String>,

        /// CSV file to append a decode summary to
        #[arg(short, long)]
        summary: Option<String>,
    },
    /// Fetch live arrivals for one station
    Arrivals {
        /// Station (map) id, e.g. 40380 for Clark/Lake
        #[arg(long)]
        station: u32,

        /// "L" stops CSV used to resolve station and stop ids
        #[arg(short, long)]
        topology: Option<String>,

        /// JSON file of excluded station/line/direction combinations
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Fetch the upcoming stations of one train run
    Follow {
        /// Run number, e.g. 412
        #[arg(long)]
        run: String,

        /// "L" stops CSV used to resolve station and stop ids
        #[arg(short, long)]
        topology: Option<String>,
    },
    /// Fetch live predictions for one bus stop
    BusArrivals {
        /// Route id, e.g. 22
        #[arg(long)]
        route: String,

        /// Stop id
        #[arg(long)]
        stop: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/cta_feeds.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("cta_feeds.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = CtaConfig::from_env();

    match cli.command {
        Commands::Decode {
            kind,
            source,
            topology,
            summary,
        } => {
            let topology = load_topology(topology.as_deref(), kind.needs_topology())?;
            let bytes = fetcher(&source).await?;

            match decode(kind, bytes.as_slice(), &topology) {
                Ok(decoded) => {
                    let row = DecodeSummary::from_decoded(&decoded).with_source(kind, &source);
                    info!(
                        kind = %kind,
                        records = decoded.len(),
                        delayed_pct = row.delayed_pct(),
                        "Feed decoded"
                    );
                    print_pretty(&decoded);
                    write_json(std::io::stdout().lock(), &decoded)?;
                    if let Some(path) = summary {
                        append_record(&path, &row)?;
                    }
                }
                Err(e) => {
                    error!(kind = %kind, error = %e, "Feed decode failed");
                    if let Some(path) = summary {
                        let row = DecodeSummary::from_error(e.kind(), &e.to_string())
                            .with_source(kind, &source);
                        append_record(&path, &row)?;
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Arrivals {
            station,
            topology,
            filter,
        } => {
            let topology = load_topology(topology.as_deref(), true)?;
            let filter = match filter {
                Some(path) => ArrivalFilter::load(&path)?,
                None => ArrivalFilter::default(),
            };

            let request = CtaRequest::TrainArrivals { station_id: station };
            let bytes = fetch_live(&request, &config).await?;
            let arrivals = decode_train_arrivals(bytes.as_slice(), &topology)?;

            match arrivals.get(&station) {
                Some(arrival) => {
                    let etas = arrival.filtered(&filter);
                    info!(
                        station = %arrival.station_name,
                        lines = ?arrival.lines(),
                        shown = etas.len(),
                        hidden = arrival.etas.len() - etas.len(),
                        "Arrivals"
                    );
                    write_json(std::io::stdout().lock(), &etas)?;
                }
                None => warn!(station, "No arrivals reported for station"),
            }
        }
        Commands::Follow { run, topology } => {
            let topology = load_topology(topology.as_deref(), true)?;
            let request = CtaRequest::TrainFollow { run_number: run };
            let bytes = fetch_live(&request, &config).await?;
            let etas = decode_train_follow(bytes.as_slice(), &topology)?;

            info!(stations = etas.len(), "Run followed");
            write_json(std::io::stdout().lock(), &etas)?;
        }
        Commands::BusArrivals { route, stop } => {
            let request = CtaRequest::BusArrivals {
                route,
                stop_id: stop,
            };
            let bytes = fetch_live(&request, &config).await?;
            match decode_bus_arrivals(bytes.as_slice()) {
                Ok(arrivals) => {
                    info!(predictions = arrivals.len(), "Bus predictions");
                    write_json(std::io::stdout().lock(), &arrivals)?;
                }
                Err(DecodeError::Feed(message)) => {
                    info!(%message, "No predictions");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

fn load_topology(path: Option<&str>, needed: bool) -> Result<TrainTopology> {
    match path {
        Some(path) => {
            let topology = TrainTopology::from_path(path)?;
            let stops: usize = topology.stations().map(|s| s.stops.len()).sum();
            info!(stations = topology.len(), stops, "Topology loaded");
            Ok(topology)
        }
        None => {
            if needed {
                warn!("No topology given, stations and stops will be placeholders");
            }
            Ok(TrainTopology::default())
        }
    }
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(fields(source = %url))]
async fn fetcher(url: &String) -> Result<Vec<u8>> {
    let bytes = if url.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, &url).await?
    } else {
        std::fs::read(url)?
    };
    Ok(bytes)
}

/// Fetches a live feed from the tracker `request` targets.
#[tracing::instrument(skip(config), fields(kind = %request.kind()))]
async fn fetch_live(request: &CtaRequest, config: &CtaConfig) -> Result<Vec<u8>> {
    let client = BasicClient::with_timeout(Duration::from_secs(30))?;
    let fetch_start = std::time::Instant::now();
    let bytes = fetch_feed(client, request, config).await?;

    let elapsed = fetch_start.elapsed();
    if elapsed.as_secs() > 15 {
        warn!(elapsed_secs = elapsed.as_secs(), "Feed fetch was slow");
    }
    debug!(bytes = bytes.len(), "Feed bytes received");
    Ok(bytes)
}

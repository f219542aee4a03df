//! CLI entry point for the app profile analysis tool.
//!
//! Provides subcommands for exploring the raw Google Play and App Store
//! catalogs, inspecting duplicates, cleaning, building frequency tables and
//! per-group averages, and producing the full report.

use anyhow::{Result, bail};
use app_profiles::{
    clean::{find_duplicates, rows_with_key},
    config::{Config, Field, Market},
    output::{format_averages, format_table, print_lines, print_rows, write_csv, write_json},
    report::{self, load_clean, load_market, popularity_averages},
    stats::{display_table, sort_by_average},
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "app_profiles")]
#[command(about = "Find free app profiles that attract users on Google Play and the App Store", long_about = None)]
struct Cli {
    /// JSON file replacing the built-in dataset layout
    #[arg(long, global = true)]
    config: Option<String>,

    /// Path of the Google Play catalog CSV
    #[arg(long, global = true)]
    google_play: Option<PathBuf>,

    /// Path of the App Store catalog CSV
    #[arg(long, global = true)]
    app_store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a range of raw rows
    Explore {
        #[arg(short, long, value_enum)]
        market: Market,

        /// First row to print
        #[arg(short, long, default_value_t = 0)]
        start: usize,

        /// Row to stop before
        #[arg(short, long, default_value_t = 5)]
        end: usize,

        /// Also print the number of rows and columns
        #[arg(short, long, default_value_t = false)]
        counts: bool,
    },
    /// Count duplicate app names in a raw catalog
    Duplicates {
        #[arg(short, long, value_enum)]
        market: Market,

        /// Print every row carrying this app name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Run the cleaning pipeline and report row counts
    Clean {
        #[arg(short, long, value_enum)]
        market: Market,

        /// CSV file to write the cleaned rows to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Ranked frequency table of one column of the cleaned catalog
    Frequency {
        #[arg(short, long, value_enum)]
        market: Market,

        /// Logical field to tabulate
        #[arg(short, long, value_enum, conflicts_with = "column", required_unless_present = "column")]
        field: Option<Field>,

        /// Header name of the column to tabulate
        #[arg(long)]
        column: Option<String>,

        /// CSV file to write the table to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Average popularity per genre (App Store) or category (Google Play)
    Averages {
        #[arg(short, long, value_enum)]
        market: Market,

        /// Rank groups by decreasing average instead of first appearance
        #[arg(short, long, default_value_t = false)]
        sort: bool,

        /// CSV file to write the averages to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Clean both catalogs and print every table
    Report {
        /// JSON file to write the report to
        #[arg(long)]
        json: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/app_profiles.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("app_profiles.log"));

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
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Explore {
            market,
            start,
            end,
            counts,
        } => {
            let dataset = load_market(market, config.market(market))?;
            print_lines(None, &[format!("{:?}\n", dataset.header)])?;
            print_rows(dataset.slice(start, end))?;
            if counts {
                print_lines(
                    None,
                    &[
                        format!("Number of rows: {}", dataset.len()),
                        format!("Number of columns: {}", dataset.column_count().unwrap_or(0)),
                    ],
                )?;
            }
        }
        Commands::Duplicates { market, name } => {
            let dataset = load_market(market, config.market(market))?;
            let key = config.market(market).columns.position(market, Field::Name)?;
            let report = find_duplicates(&dataset, key)?;

            info!(
                %market,
                unique = report.unique,
                duplicates = report.duplicates.len(),
                "Duplicate scan finished"
            );
            let mut lines = vec![
                format!("Number of duplicate apps: {}", report.duplicates.len()),
                format!("Number of unique apps: {}", report.unique),
            ];
            lines.extend(report.duplicates.iter().take(15).map(|d| format!("  {d}")));
            print_lines(None, &lines)?;

            if let Some(name) = name {
                let rows = rows_with_key(&dataset, key, &name);
                if rows.is_empty() {
                    bail!("no {market} app named {name:?}");
                }
                let rows: Vec<_> = rows.into_iter().cloned().collect();
                print_rows(&rows)?;
            }
        }
        Commands::Clean { market, output } => {
            let (dataset, summary) = load_clean(market, config.market(market))?;
            print_lines(
                Some(&format!("{market} cleaning")),
                &[
                    format!("loaded: {}", summary.loaded),
                    format!("after row removal: {}", summary.after_row_removal),
                    format!("after deduplication: {}", summary.after_dedup),
                    format!("after language filter: {}", summary.after_language),
                    format!("after price filter: {}", summary.after_price),
                ],
            )?;
            if let Some(output) = output {
                dataset.write_csv(&output)?;
                info!(path = %output, rows = dataset.len(), "Cleaned rows written");
            }
        }
        Commands::Frequency {
            market,
            field,
            column,
            output,
        } => {
            let market_config = config.market(market);
            let (dataset, _) = load_clean(market, market_config)?;
            let index = match (field, column) {
                (Some(field), _) => market_config.columns.position(market, field)?,
                (None, Some(column)) => dataset.column(&column)?,
                (None, None) => bail!("either --field or --column is required"),
            };
            let entries = display_table(&dataset, index)?;
            print_lines(
                Some(&format!("{market} {}", dataset.column_name(index))),
                &format_table(&entries),
            )?;
            if let Some(output) = output {
                write_csv(&output, &entries)?;
            }
        }
        Commands::Averages {
            market,
            sort,
            output,
        } => {
            let market_config = config.market(market);
            let (dataset, _) = load_clean(market, market_config)?;
            let mut averages = popularity_averages(market, &dataset, market_config)?;
            if sort {
                sort_by_average(&mut averages.groups);
            }
            print_lines(
                Some(&format!(
                    "{market} average {} by {}",
                    averages.value, averages.group_by
                )),
                &format_averages(&averages.groups),
            )?;
            if let Some(output) = output {
                write_csv(&output, &averages.groups)?;
            }
        }
        Commands::Report { json } => {
            let report = report::run(&config)?;
            for summary in &report.cleaning {
                print_lines(
                    Some(&format!("{} rows after cleaning", summary.market)),
                    &[summary.rows.after_price.to_string()],
                )?;
            }
            for table in &report.tables {
                print_lines(
                    Some(&format!("{} {}", table.market, table.column)),
                    &format_table(&table.entries),
                )?;
            }
            for averages in &report.averages {
                print_lines(
                    Some(&format!(
                        "{} average {} by {}",
                        averages.market, averages.value, averages.group_by
                    )),
                    &format_averages(&averages.groups),
                )?;
            }
            if let Some(json) = json {
                write_json(&json, &report)?;
            }
        }
    }

    Ok(())
}

/// Builds the dataset configuration from, in increasing priority, the
/// built-in layout or a JSON config file, environment variables, then
/// command line paths.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("APP_PROFILES_CONFIG").ok());
    let mut config = match config_path {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let overrides = [
        (Market::GooglePlay, "GOOGLE_PLAY_CSV", &cli.google_play),
        (Market::AppStore, "APP_STORE_CSV", &cli.app_store),
    ];
    for (market, var, flag) in overrides {
        if let Ok(path) = std::env::var(var) {
            config.market_mut(market).path = PathBuf::from(path);
        }
        if let Some(path) = flag {
            config.market_mut(market).path = path.clone();
        }
    }

    info!(
        google_play = %config.google_play.path.display(),
        app_store = %config.app_store.path.display(),
        "Configuration resolved"
    );
    Ok(config)
}

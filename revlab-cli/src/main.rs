//! RevLab CLI: fetch intraday bars and run reversal analysis.
//!
//! Commands:
//! - `analyze`: load bars (Yahoo or CSV), flag reversals in a daily time window, print stats
//! - `fetch`: download bars and save them as CSV for offline analysis

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use revlab_core::analysis::{parse_clock, reversal_time_histogram, success_by_range_bucket};
use revlab_core::config::AnalysisConfig;
use revlab_core::data::{load_series, CsvProvider, DataProvider, YahooProvider};
use revlab_core::domain::{Interval, Series};
use revlab_core::export::{export_bars_csv, export_report_json, export_table_csv, write_file};
use revlab_core::pipeline::{analyze, ReversalReport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "revlab",
    about = "RevLab CLI: intraday futures reversal analysis"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flag reversals inside a daily time window and print statistics.
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        /// Window start (HH:MM). Defaults to 09:40.
        #[arg(long, value_parser = clock_arg)]
        start_time: Option<NaiveTime>,

        /// Window end (HH:MM), inclusive. Defaults to 09:50.
        #[arg(long, value_parser = clock_arg)]
        end_time: Option<NaiveTime>,

        /// Return threshold in percent. Defaults to -0.5.
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f64>,

        /// Add the morning-range feature, average return and success rate.
        #[arg(long, default_value_t = false)]
        extended: bool,

        /// Number of morning-range buckets in extended output.
        #[arg(long, default_value_t = 4)]
        buckets: usize,

        /// Print the report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write the annotated window table to this CSV file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Download bars and save them as CSV.
    Fetch {
        #[command(flatten)]
        source: SourceArgs,

        /// Output CSV path. Defaults to <symbol>_<interval>.csv.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Where bars come from and which bars to load.
#[derive(Args)]
struct SourceArgs {
    /// Path to a TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticker symbol. Defaults to NQ=F.
    #[arg(long)]
    symbol: Option<String>,

    /// Start date (YYYY-MM-DD). Defaults to 15 days before the end date.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Bar interval: 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d. Defaults to 5m.
    #[arg(long)]
    interval: Option<Interval>,

    /// Read bars from a CSV file instead of Yahoo Finance.
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl SourceArgs {
    /// Config file (or defaults) with command-line overrides applied.
    fn config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(symbol) = &self.symbol {
            config.symbol = symbol.clone();
        }
        if self.start.is_some() {
            config.start_date = self.start;
        }
        if self.end.is_some() {
            config.end_date = self.end;
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        Ok(config)
    }

    fn provider(&self) -> Result<Box<dyn DataProvider>> {
        Ok(match &self.csv {
            Some(path) => Box::new(CsvProvider::new(path)),
            None => Box::new(YahooProvider::new().context("failed to build HTTP client")?),
        })
    }

    fn load(&self, config: &AnalysisConfig) -> Result<Series> {
        let today = chrono::Local::now().date_naive();
        let request = config.fetch_request(today)?;
        let provider = self.provider()?;
        println!(
            "[ Data: {} to {} interval: {} source: {} ]",
            request.start,
            request.end,
            request.interval,
            provider.name()
        );
        load_series(provider.as_ref(), &request)
            .with_context(|| format!("failed to load bars for {}", request.symbol))
    }
}

fn clock_arg(s: &str) -> Result<NaiveTime, String> {
    parse_clock(s).map_err(|e| e.to_string())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter(None, LevelFilter::Warn)
        .filter(Some("revlab_core"), level)
        .filter(Some("revlab"), level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            source,
            start_time,
            end_time,
            threshold,
            extended,
            buckets,
            json,
            export,
        } => {
            let mut config = source.config()?;
            if let Some(t) = start_time {
                config.start_time = t;
            }
            if let Some(t) = end_time {
                config.end_time = t;
            }
            if let Some(t) = threshold {
                config.threshold = t;
            }
            config.extended |= extended;
            run_analyze(&source, config, buckets, json, export)
        }
        Commands::Fetch { source, output } => run_fetch(&source, output),
    }
}

fn run_analyze(
    source: &SourceArgs,
    config: AnalysisConfig,
    buckets: usize,
    json: bool,
    export: Option<PathBuf>,
) -> Result<()> {
    config.validate()?;
    let params = config.params()?;
    let series = source.load(&config)?;
    let report = analyze(&series, &params)?;

    if json {
        println!("{}", export_report_json(&report)?);
    } else {
        print_report(&report, config.extended, buckets);
    }

    if let Some(path) = export {
        let csv = export_table_csv(&report.table)?;
        write_file(&path, &csv)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Window table saved to: {}", path.display());
    }

    Ok(())
}

fn run_fetch(source: &SourceArgs, output: Option<PathBuf>) -> Result<()> {
    let config = source.config()?;
    config.validate()?;
    let series = source.load(&config)?;

    let path = output.unwrap_or_else(|| {
        let stem: String = config
            .symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        PathBuf::from(format!("{stem}_{}.csv", config.interval))
    });
    let csv = export_bars_csv(&series)?;
    write_file(&path, &csv).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Saved {} bars to: {}", series.len(), path.display());
    Ok(())
}

fn print_report(report: &ReversalReport, extended: bool, buckets: usize) {
    if report.is_empty_window() {
        println!("No data available for the given time window ({}).", report.window);
        return;
    }

    let stats = &report.stats;
    println!();
    println!("--- Reversal Analysis Results ---");
    println!("Symbol:         {} ({})", report.symbol, report.interval);
    println!("Window:         {}", report.window);
    println!("Threshold:      {:.2}%", report.threshold);
    println!("Window bars:    {}", stats.window_bars);
    println!(
        "Average Reversal Time = {} (HH:MM:SS)",
        stats.average_reversal_time_display()
    );
    println!("Reversal Percentage = {:.2}%", stats.reversal_percentage);
    println!("Total Reversals Detected: {}", stats.total_reversals);

    let hist = reversal_time_histogram(&report.table);
    if !hist.is_empty() {
        println!();
        println!("--- Reversal Times ---");
        for (time, count) in &hist {
            println!("{}  {:>4}  {}", time.format("%H:%M"), count, "#".repeat(*count));
        }
    }

    if extended {
        println!();
        println!("--- Extended ---");
        match stats.average_return {
            Some(r) => println!("Average Return: {r:.3}%"),
            None => println!("Average Return: N/A"),
        }
        match stats.success_rate {
            Some(s) => println!("Success Rate:   {:.1}%", s * 100.0),
            None => println!("Success Rate:   N/A"),
        }

        let rows = success_by_range_bucket(&report.table, buckets);
        if !rows.is_empty() {
            println!();
            println!(
                "{:<22} {:>10} {:>10} {:>10}",
                "Morning Range", "Reversals", "Successes", "Rate"
            );
            println!("{}", "-".repeat(55));
            for b in &rows {
                let rate = b
                    .success_rate
                    .map(|r| format!("{:.1}%", r * 100.0))
                    .unwrap_or_else(|| "N/A".to_string());
                println!(
                    "{:<22} {:>10} {:>10} {:>10}",
                    format!("{:.2} - {:.2}", b.lower, b.upper),
                    b.reversals,
                    b.successes,
                    rate
                );
            }
        }
    }
    println!();
}

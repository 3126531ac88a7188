//! GridCross CLI — run the optimizer over a directory of price CSVs, or a
//! single backtest over one file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gridcross_core::{
    run_simulation, MaKind, ParameterCombination, SecondaryParams, SimConfig,
};
use gridcross_runner::{
    load_bars, rank_by_gain, rank_by_profit_factor, rng_for, select_window,
    summarize_by_instrument, summarize_overall, GridOutcome, OptimizationDriver, OptimizerConfig,
    RankedSummary,
};

#[derive(Parser)]
#[command(name = "gridcross", about = "MA-crossover strategy optimizer", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize the parameter grid over every CSV in a directory.
    Optimize {
        /// Directory containing one CSV per instrument.
        #[arg(long)]
        data_dir: PathBuf,

        /// Optimizer configuration (TOML).
        #[arg(long)]
        config: PathBuf,

        /// Where to write per-instrument JSON results.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Rows to show in each ranking table.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Run one combination over a full price series.
    Run {
        /// Price CSV for a single instrument.
        #[arg(long)]
        file: PathBuf,

        /// Optional optimizer config; its [simulation] section is used.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        short: usize,

        #[arg(long)]
        mid: usize,

        #[arg(long)]
        long: usize,

        /// Reentry gap percent (default secondary parameter).
        #[arg(long)]
        reentry_gap: Option<f64>,

        /// Take-profit trigger percent; requires --partial-sell.
        #[arg(long)]
        take_profit: Option<f64>,

        /// Percent of a position to sell on take-profit.
        #[arg(long)]
        partial_sell: Option<f64>,

        /// Override the configured moving-average kind (sma/ema).
        #[arg(long)]
        ma_kind: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Optimize {
            data_dir,
            config,
            output_dir,
            top,
        } => cmd_optimize(&data_dir, &config, output_dir.as_deref(), top),
        Command::Run {
            file,
            config,
            short,
            mid,
            long,
            reentry_gap,
            take_profit,
            partial_sell,
            ma_kind,
        } => {
            if take_profit.is_some() != partial_sell.is_some() {
                bail!("--take-profit and --partial-sell must be given together");
            }
            cmd_run(
                &file,
                config.as_deref(),
                (short, mid, long),
                reentry_gap,
                take_profit.zip(partial_sell),
                ma_kind.as_deref(),
            )
        }
    }
}

fn discover_csvs(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(data_dir)
        .with_context(|| format!("cannot read data dir {}", data_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    paths.sort();
    Ok(paths)
}

fn cmd_optimize(
    data_dir: &Path,
    config_path: &Path,
    output_dir: Option<&Path>,
    top: usize,
) -> Result<()> {
    let config = OptimizerConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let grid = config.validate()?;
    let combinations = grid.combinations();
    if combinations.is_empty() {
        return Err(gridcross_core::ConfigError::EmptyGrid.into());
    }

    let csv_paths = discover_csvs(data_dir)?;
    if csv_paths.is_empty() {
        bail!("no CSV files found in {}", data_dir.display());
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create output dir {}", dir.display()))?;
    }

    let driver = OptimizationDriver::new(config.sampling.max_workers)?;
    println!(
        "optimizing {} combinations x {} instruments x {} iterations on {} workers",
        combinations.len(),
        csv_paths.len(),
        config.sampling.iterations_per_instrument,
        driver.workers()
    );

    let mut collected = GridOutcome::default();
    for path in &csv_paths {
        let series = match load_bars(path) {
            Ok(series) => series,
            Err(err) => {
                eprintln!("warning: skipping {}: {err}", path.display());
                continue;
            }
        };
        if series.skipped_rows > 0 {
            eprintln!(
                "warning: {}: skipped {} unparseable rows",
                series.instrument, series.skipped_rows
            );
        }

        let mut instrument_outcome = GridOutcome::default();
        for iteration in 0..config.sampling.iterations_per_instrument {
            let mut rng = rng_for(config.sampling.seed, &series.instrument, iteration);
            let window = match select_window(&series.bars, config.sampling.min_duration(), &mut rng)
            {
                Ok(window) => window,
                Err(err) => {
                    eprintln!(
                        "warning: {} iteration {iteration}: {err}; skipping",
                        series.instrument
                    );
                    continue;
                }
            };
            if window.len() < config.sampling.min_rows {
                eprintln!(
                    "warning: {} iteration {iteration}: window has {} rows (< {}); skipping",
                    series.instrument,
                    window.len(),
                    config.sampling.min_rows
                );
                continue;
            }
            if window.degraded {
                eprintln!(
                    "note: {} iteration {iteration}: series shorter than {} days, degraded window",
                    series.instrument, config.sampling.min_days
                );
            }

            let outcome = driver.run_grid(
                &series.instrument,
                &series.bars,
                window,
                &combinations,
                &config.simulation,
            )?;
            instrument_outcome.absorb(outcome);
        }

        if let Some(dir) = output_dir {
            let out_path = dir.join(format!("{}.json", series.instrument));
            let file = std::fs::File::create(&out_path)
                .with_context(|| format!("cannot write {}", out_path.display()))?;
            serde_json::to_writer_pretty(file, &instrument_outcome.results)?;
        }
        collected.absorb(instrument_outcome);
    }

    for failure in &collected.failures {
        eprintln!(
            "warning: {} {}: {}",
            failure.instrument, failure.combination, failure.error
        );
    }
    if collected.results.is_empty() {
        bail!("no simulation produced a result; check data and sampling settings");
    }

    let per_instrument = summarize_by_instrument(&collected.results);
    print_table(
        "Per-instrument ranking by average gain",
        &rank_by_gain(per_instrument),
        top,
    );

    let overall = summarize_overall(&collected.results);
    print_table(
        "Overall ranking by average gain",
        &rank_by_gain(overall.clone()),
        top,
    );
    print_table(
        "Overall ranking by profit factor",
        &rank_by_profit_factor(overall),
        top,
    );

    Ok(())
}

fn print_table(title: &str, summaries: &[RankedSummary], top: usize) {
    println!("\n=== {title} ===");
    println!(
        "{:<28} {:<10} {:>5} {:>10} {:>10} {:>8}",
        "combination", "instrument", "runs", "avg gain%", "stddev%", "pf"
    );
    for summary in summaries.iter().take(top) {
        let pf = summary
            .avg_profit_factor
            .map(|f| format!("{f:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:<10} {:>5} {:>10.2} {:>10.2} {:>8}",
            summary.combination.to_string(),
            summary.instrument.as_deref().unwrap_or("all"),
            summary.run_count,
            summary.avg_pct_gain,
            summary.std_dev_pct_gain,
            pf
        );
    }
}

fn cmd_run(
    file: &Path,
    config_path: Option<&Path>,
    lengths: (usize, usize, usize),
    reentry_gap: Option<f64>,
    take_profit: Option<(f64, f64)>,
    ma_kind: Option<&str>,
) -> Result<()> {
    let (short, mid, long) = lengths;
    if !(short < mid && mid < long) {
        bail!("lengths must satisfy short < mid < long, got {short}/{mid}/{long}");
    }
    if short == 0 {
        bail!("moving-average lengths must be at least 1");
    }

    let mut simulation = match config_path {
        Some(path) => {
            OptimizerConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?
                .simulation
        }
        None => SimConfig::default(),
    };
    if let Some(kind) = ma_kind {
        simulation.ma_kind = kind.parse::<MaKind>()?;
    }
    simulation.validate()?;

    let secondary = match (take_profit, reentry_gap) {
        (Some(_), Some(_)) => {
            bail!("pass either --reentry-gap or --take-profit/--partial-sell, not both")
        }
        (Some((percent, partial_sell_percent)), None) => SecondaryParams::TakeProfit {
            percent,
            partial_sell_percent,
        },
        (None, Some(percent)) => SecondaryParams::ReentryGap { percent },
        (None, None) => SecondaryParams::ReentryGap {
            percent: simulation.reentry_gap_percent,
        },
    };
    let combination = ParameterCombination {
        short,
        mid,
        long,
        secondary,
    };

    let series = load_bars(file)?;
    if series.skipped_rows > 0 {
        eprintln!(
            "warning: {}: skipped {} unparseable rows",
            series.instrument, series.skipped_rows
        );
    }

    let result = run_simulation(&series.bars, &combination, &simulation)?;

    let wins = result
        .closed_trades
        .iter()
        .filter(|t| t.is_winner())
        .count();
    let baseline = &result.buy_and_hold;
    let baseline_gain = baseline.total_pnl / result.initial_balance * 100.0;

    println!("=== {} | {} ===", series.instrument, combination);
    println!("bars:            {}", series.bars.len());
    println!("initial balance: {:.2}", result.initial_balance);
    println!("final balance:   {:.2}", result.final_balance);
    println!(
        "total pnl:       {:.2} ({:+.2}%)",
        result.total_pnl,
        result.pct_gain()
    );
    println!("max drawdown:    {:.2}%", result.max_drawdown_pct);
    println!(
        "closed trades:   {} ({} winners)",
        result.closed_trades.len(),
        wins
    );
    println!("max open pos:    {}", result.max_open_positions);
    println!(
        "buy-and-hold:    {:.2} ({:+.2}%, max dd {:.2}%)",
        baseline.final_value, baseline_gain, baseline.max_drawdown_pct
    );
    println!(
        "vs baseline:     {:+.2}%",
        result.pct_gain() - baseline_gain
    );

    Ok(())
}

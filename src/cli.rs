//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestResult};
use crate::domain::config_validation::{
    build_backtest_config, build_optimizer_config, build_strategy_kind, read_phenotype,
    read_signaler_phenotypes, validate_backtest_config, validate_optimizer_config,
    validate_phenotype,
};
use crate::domain::error::TicktraderError;
use crate::domain::genetic::{OptimizerRun, Scored};
use crate::domain::indicator::{AnyIndicator, Inputs, OutputMap, Study};
use crate::domain::signal::TradeSignaler;
use crate::domain::strategy::StrategyKind;
use crate::domain::tick::Tick;
use crate::domain::trader::Trader;
use crate::ports::config_port::ConfigPort;
use crate::ports::tick_port::TickPort;

#[derive(Parser, Debug)]
#[command(name = "ticktrader", about = "Intraday tick backtester and strategy optimizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the [phenotype] section against tick data
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Overrides [optimizer] strategy
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Evolve phenotypes for the [optimizer] strategy
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        population_size: Option<usize>,
        #[arg(long)]
        evolutions: Option<usize>,
    },
    /// Replay ticks through the [signaler.<symbol>] signalers
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Print an indicator over one symbol's ticks as CSV
    Study {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        /// ema, rsi, stochastic or bollinger
        #[arg(short, long)]
        indicator: String,
        #[arg(short, long)]
        length: usize,
        #[arg(long)]
        d_length: Option<usize>,
        #[arg(long)]
        deviations: Option<f64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            strategy,
        } => run_backtest(&config, &data, symbol.as_deref(), strategy.as_deref()),
        Command::Optimize {
            config,
            data,
            symbol,
            seed,
            population_size,
            evolutions,
        } => run_optimize(
            &config,
            &data,
            symbol.as_deref(),
            OptimizeOverrides {
                seed,
                population_size,
                evolutions,
            },
        ),
        Command::Replay { config, data } => run_replay(&config, &data),
        Command::Study {
            data,
            symbol,
            indicator,
            length,
            d_length,
            deviations,
        } => {
            let mut inputs = Inputs::new().with("length", length as f64);
            if let Some(d_length) = d_length {
                inputs = inputs.with("d_length", d_length as f64);
            }
            if let Some(deviations) = deviations {
                inputs = inputs.with("deviations", deviations);
            }
            run_study(&data, &symbol, &indicator, &inputs)
        }
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TicktraderError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Ticks for one symbol. Without a symbol the file must hold exactly one.
pub fn load_symbol_ticks(
    data: &dyn TickPort,
    symbol: Option<&str>,
) -> Result<Vec<Tick>, TicktraderError> {
    if let Some(symbol) = symbol {
        return data.load_ticks(Some(symbol));
    }
    match data.list_symbols()?.as_slice() {
        [] => Err(TicktraderError::NoData {
            symbol: "<any>".into(),
        }),
        [only] => data.load_ticks(Some(only)),
        _ => Err(TicktraderError::ConfigMissing {
            section: "backtest".into(),
            key: "symbol".into(),
        }),
    }
}

/// `--strategy`, else `[optimizer] strategy`.
fn resolve_strategy(
    config: &dyn ConfigPort,
    strategy: Option<&str>,
) -> Result<StrategyKind, TicktraderError> {
    match strategy {
        Some(name) => name.parse(),
        None => build_strategy_kind(config),
    }
}

pub fn backtest_pipeline(
    config: &dyn ConfigPort,
    data: &dyn TickPort,
    symbol: Option<&str>,
    strategy: Option<&str>,
) -> Result<(StrategyKind, BacktestResult), TicktraderError> {
    let backtest_config = build_backtest_config(config)?;
    let kind = resolve_strategy(config, strategy)?;
    let phenotype = read_phenotype(config, "phenotype")?;
    let symbol = symbol
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "symbol"));
    let ticks = load_symbol_ticks(data, symbol.as_deref())?;
    info!(strategy = %kind, ticks = ticks.len(), "running backtest");
    let result = backtest_engine::backtest(kind, &phenotype, &ticks, &backtest_config)?;
    Ok((kind, result))
}

fn run_backtest(
    config_path: &Path,
    data_path: &Path,
    symbol: Option<&str>,
    strategy: Option<&str>,
) -> Result<(), TicktraderError> {
    let config = load_config(config_path)?;
    let data = CsvAdapter::new(data_path.to_path_buf());
    let (kind, result) = backtest_pipeline(&config, &data, symbol, strategy)?;
    println!("Strategy:     {kind}");
    println!("{result}");
    Ok(())
}

/// Command-line values that take precedence over `[optimizer]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeOverrides {
    pub seed: Option<u64>,
    pub population_size: Option<usize>,
    pub evolutions: Option<usize>,
}

pub fn optimize_pipeline(
    config: &dyn ConfigPort,
    data: &dyn TickPort,
    symbol: Option<&str>,
    overrides: OptimizeOverrides,
) -> Result<(StrategyKind, Scored), TicktraderError> {
    let backtest_config = build_backtest_config(config)?;
    let kind = build_strategy_kind(config)?;
    let mut optimizer_config = build_optimizer_config(config)?;
    if overrides.seed.is_some() {
        optimizer_config.seed = overrides.seed;
    }
    if let Some(size) = overrides.population_size {
        optimizer_config.population_size = size;
    }
    if let Some(evolutions) = overrides.evolutions {
        optimizer_config.evolution_count = evolutions;
    }
    let symbol = symbol
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "symbol"));
    let ticks = load_symbol_ticks(data, symbol.as_deref())?;
    let best = OptimizerRun::new(kind, &ticks, backtest_config, optimizer_config)?.run()?;
    Ok((kind, best))
}

/// The best phenotype as INI that `backtest` reads back.
pub fn format_optimized(kind: StrategyKind, best: &Scored) -> String {
    format!(
        "; fitness {}\n[optimizer]\nstrategy = {}\n\n[phenotype]\n{}",
        best.fitness, kind, best.phenotype
    )
}

fn run_optimize(
    config_path: &Path,
    data_path: &Path,
    symbol: Option<&str>,
    overrides: OptimizeOverrides,
) -> Result<(), TicktraderError> {
    let config = load_config(config_path)?;
    let data = CsvAdapter::new(data_path.to_path_buf());
    let (kind, best) = optimize_pipeline(&config, &data, symbol, overrides)?;
    print!("{}", format_optimized(kind, &best));
    Ok(())
}

pub fn build_trader(config: &dyn ConfigPort) -> Result<Trader, TicktraderError> {
    let backtest_config = build_backtest_config(config)?;
    let phenotypes = read_signaler_phenotypes(config)?;
    if phenotypes.is_empty() {
        return Err(TicktraderError::ConfigMissing {
            section: "signaler.<symbol>".into(),
            key: "*".into(),
        });
    }
    let signalers = phenotypes
        .iter()
        .map(|(symbol, phenotype)| {
            TradeSignaler::new(symbol, phenotype)
                .map(|s| s.with_day_end(backtest_config.day_end))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Trader::new(
        signalers,
        backtest_config.initial_balance,
        backtest_config.commission,
    ))
}

pub fn replay_pipeline(
    config: &dyn ConfigPort,
    data: &dyn TickPort,
) -> Result<Trader, TicktraderError> {
    let mut trader = build_trader(config)?;
    let ticks = data.load_ticks(None)?;
    info!(ticks = ticks.len(), "replaying");
    for tick in &ticks {
        trader.tick(tick);
    }
    Ok(trader)
}

fn run_replay(config_path: &Path, data_path: &Path) -> Result<(), TicktraderError> {
    let config = load_config(config_path)?;
    let data = CsvAdapter::new(data_path.to_path_buf());
    let trader = replay_pipeline(&config, &data)?;
    println!("{}", trader.result());
    if let Some(position) = trader.position() {
        println!(
            "Open:         {} x{} @ {:.2}",
            position.symbol, position.quantity, position.buy_price
        );
    }
    Ok(())
}

/// Writes `timestamp,<outputs...>` rows, one per tick that produced output.
pub fn write_study<W: Write>(
    ticks: &[Tick],
    indicator: AnyIndicator,
    out: W,
) -> Result<usize, TicktraderError> {
    let mut writer = csv::Writer::from_writer(out);
    let mut study = Study::new(indicator);
    let mut columns: Option<Vec<String>> = None;
    let mut rows = 0;

    for end in 1..=ticks.len() {
        study.set_data(&ticks[..end]);
        let output = study.tick();
        if output.is_empty() {
            continue;
        }
        if columns.is_none() {
            let names: Vec<String> = output.keys().cloned().collect();
            let mut header = vec!["timestamp".to_string()];
            header.extend(names.iter().cloned());
            writer.write_record(&header).map_err(io::Error::from)?;
            columns = Some(names);
        }
        let names = columns.as_deref().unwrap_or_default();
        let mut record = vec![ticks[end - 1].timestamp.format("%Y-%m-%d %H:%M:%S").to_string()];
        record.extend(
            names
                .iter()
                .map(|name| output.get(name).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record).map_err(io::Error::from)?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

fn run_study(
    data_path: &Path,
    symbol: &str,
    indicator: &str,
    inputs: &Inputs,
) -> Result<(), TicktraderError> {
    let indicator = AnyIndicator::from_name(indicator, inputs, OutputMap::new())?;
    let data = CsvAdapter::new(data_path.to_path_buf());
    let ticks = data.load_ticks(Some(symbol))?;
    info!(indicator = %indicator, ticks = ticks.len(), "computing study");
    let rows = write_study(&ticks, indicator, io::stdout().lock())?;
    if rows == 0 {
        warn!(symbol, "not enough ticks for any output");
    }
    Ok(())
}

/// Checks every section present in the file.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TicktraderError> {
    validate_backtest_config(config)?;
    let sections = config.sections();
    if sections.iter().any(|s| s == "optimizer") {
        validate_optimizer_config(config)?;
    }
    if sections.iter().any(|s| s == "phenotype") {
        let phenotype = read_phenotype(config, "phenotype")?;
        if let Ok(kind) = build_strategy_kind(config) {
            validate_phenotype(kind, &phenotype)?;
        }
    }
    for (symbol, phenotype) in read_signaler_phenotypes(config)? {
        TradeSignaler::new(&symbol, &phenotype)?;
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TicktraderError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;
    eprintln!("Config validated successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_ticks;
    use std::collections::BTreeSet;

    struct VecTicks(Vec<Tick>);

    impl TickPort for VecTicks {
        fn load_ticks(&self, symbol: Option<&str>) -> Result<Vec<Tick>, TicktraderError> {
            let ticks: Vec<Tick> = self
                .0
                .iter()
                .filter(|t| symbol.is_none_or(|s| t.symbol == s))
                .cloned()
                .collect();
            if ticks.is_empty() {
                return Err(TicktraderError::NoData {
                    symbol: symbol.unwrap_or("<any>").to_string(),
                });
            }
            Ok(ticks)
        }

        fn list_symbols(&self) -> Result<Vec<String>, TicktraderError> {
            let symbols: BTreeSet<String> = self.0.iter().map(|t| t.symbol.clone()).collect();
            Ok(symbols.into_iter().collect())
        }
    }

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn two_symbols() -> VecTicks {
        let mut ticks = make_ticks(&[10.0, 11.0, 12.0]);
        let mut other = make_ticks(&[20.0, 21.0]);
        for tick in &mut other {
            tick.symbol = "MSFT".into();
        }
        ticks.extend(other);
        VecTicks(ticks)
    }

    #[test]
    fn cli_parses_backtest() {
        let cli = Cli::try_parse_from([
            "ticktrader",
            "backtest",
            "--config",
            "run.ini",
            "--data",
            "ticks.csv",
            "--strategy",
            "price_change",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                config, strategy, ..
            } => {
                assert_eq!(config, PathBuf::from("run.ini"));
                assert_eq!(strategy.as_deref(), Some("price_change"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_study() {
        let cli = Cli::try_parse_from([
            "ticktrader", "study", "-d", "t.csv", "--symbol", "AAPL", "-i", "stochastic", "-l",
            "14", "--d-length", "3",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Study {
                length: 14,
                d_length: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn single_symbol_needs_no_flag() {
        let data = VecTicks(make_ticks(&[1.0, 2.0]));
        assert_eq!(load_symbol_ticks(&data, None).unwrap().len(), 2);
    }

    #[test]
    fn multiple_symbols_need_a_choice() {
        let data = two_symbols();
        assert!(matches!(
            load_symbol_ticks(&data, None),
            Err(TicktraderError::ConfigMissing { ref key, .. }) if key == "symbol"
        ));
        assert_eq!(load_symbol_ticks(&data, Some("MSFT")).unwrap().len(), 2);
    }

    #[test]
    fn backtest_pipeline_reads_symbol_from_config() {
        let cfg = config(
            "[backtest]\nsymbol = MSFT\n\n[optimizer]\nstrategy = price_change\n\n\
             [phenotype]\ninvestment_divisor = 4\nsell_trigger_profit_percentage = 1\n\
             stop_loss_threshold = 1\nrecent_large_change_counter_start = 3\n\
             min_percent_change_buy = -5\nmax_percent_change_buy = 5\n",
        );
        let (kind, result) = backtest_pipeline(&cfg, &two_symbols(), None, None).unwrap();
        assert_eq!(kind, StrategyKind::PriceChange);
        assert!(result.balance > 0.0);
    }

    #[test]
    fn backtest_pipeline_strategy_flag_wins() {
        let cfg = config("[optimizer]\nstrategy = price_change\n\n[phenotype]\nema_length = 5\n");
        let err = backtest_pipeline(
            &cfg,
            &VecTicks(make_ticks(&[1.0])),
            None,
            Some("ema_threshold"),
        )
        .unwrap_err();
        // ema_threshold needs more fields than the section supplies
        assert!(matches!(err, TicktraderError::MissingParameter { .. }));
    }

    #[test]
    fn optimized_output_round_trips_through_config() {
        let best = Scored {
            phenotype: crate::domain::phenotype::Phenotype::new()
                .with("ema_length", 12.0)
                .with("target_increase", 0.0005),
            fitness: 42.5,
        };
        let text = format_optimized(StrategyKind::EmaThreshold, &best);
        let cfg = config(&text);
        assert_eq!(build_strategy_kind(&cfg).unwrap(), StrategyKind::EmaThreshold);
        assert_eq!(read_phenotype(&cfg, "phenotype").unwrap(), best.phenotype);
    }

    #[test]
    fn replay_requires_signalers() {
        let err = build_trader(&config("[backtest]\n")).unwrap_err();
        assert!(matches!(err, TicktraderError::ConfigMissing { .. }));
    }

    #[test]
    fn study_writes_header_and_rows() {
        let ticks = make_ticks(&[10.0, 11.0, 12.0, 13.0]);
        let indicator =
            AnyIndicator::from_name("ema", &Inputs::new().with("length", 2.0), OutputMap::new())
                .unwrap();
        let mut out = Vec::new();
        let rows = write_study(&ticks, indicator, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,ema");
        assert_eq!(lines.len(), rows + 1);
        assert!(rows >= 2);
    }

    #[test]
    fn validate_checks_phenotype_ranges() {
        let cfg = config(
            "[optimizer]\nstrategy = bollinger_reversion\n\n[phenotype]\nbollinger_length = 500\n\
             deviations = 2\ntarget_increase = 0.001\nstop_loss_threshold = 0.001\n",
        );
        assert!(matches!(
            validate_config(&cfg),
            Err(TicktraderError::ParameterOutOfRange { .. })
        ));
    }

    #[test]
    fn validate_checks_signalers() {
        assert!(validate_config(&config("[signaler.aapl]\nema_length = 14\n")).is_err());
        assert!(validate_config(&config(
            "[signaler.aapl]\nema_length = 14\nema_change_negative_buy_threshold = 2\n\
             ema_change_positive_buy_threshold = 1\ntarget_increase = 0.0005\n"
        ))
        .is_ok());
    }
}

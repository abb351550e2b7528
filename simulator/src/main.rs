use anyhow::{Context, Result};
use clap::Parser;
use roscoin_simulator::{run, Report, SimulationConfig};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML file with simulation parameters. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Independent bankrolls per bet fraction.
    #[arg(long)]
    trials: Option<u32>,

    /// Maximum bets per bankroll.
    #[arg(long)]
    turns: Option<u32>,

    /// Stake per turn in basis points of the max bet (repeat or comma-separate).
    #[arg(long = "bet-fraction-bps", value_delimiter = ',')]
    bet_fraction_bps: Vec<u32>,

    #[arg(long)]
    bet_number: Option<u8>,

    /// Reserve level, in basis points of the starting bankroll, that counts as broke.
    #[arg(long)]
    broke_threshold_bps: Option<u32>,

    /// Starting bankroll in whole currency units.
    #[arg(long)]
    bankroll: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn build_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read config file {}", path.display()))?;
            serde_yaml::from_str(&contents).context("Could not parse config file")?
        }
        None => SimulationConfig::default(),
    };

    if let Some(trials) = args.trials {
        config.trials = trials;
    }
    if let Some(turns) = args.turns {
        config.turns = turns;
    }
    if !args.bet_fraction_bps.is_empty() {
        config.bet_fractions_bps = args.bet_fraction_bps.clone();
    }
    if let Some(bet_number) = args.bet_number {
        config.bet_number = bet_number;
    }
    if let Some(threshold) = args.broke_threshold_bps {
        config.broke_threshold_bps = threshold;
    }
    if let Some(bankroll) = args.bankroll {
        config.bankroll = bankroll;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(log_level: &str) -> Result<()> {
    let level = Level::from_str(log_level).context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn print_text(report: &Report) {
    for row in &report.fractions {
        println!(
            "Bet size (% of max bet): {:.2}",
            f64::from(row.bet_fraction_bps) / 100.0
        );
        println!("Survival rate (%): {:.2}", row.survival_rate_pct);
        println!(
            "Average ending profit (%): {:.2}",
            row.average_ending_profit_pct
        );
        println!();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = build_config(&args)?;
    info!(?config, "starting simulation");
    let report = run(&config).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{json}");
    } else {
        print_text(&report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_and_comma_separated_fractions() {
        let args = Args::parse_from([
            "roscoin-simulator",
            "--bet-fraction-bps",
            "1000,2000",
            "--bet-fraction-bps",
            "3000",
            "--trials",
            "7",
            "--json",
        ]);
        assert!(args.json);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.bet_fractions_bps, vec![1_000, 2_000, 3_000]);
        assert_eq!(config.trials, 7);
        assert_eq!(config.turns, SimulationConfig::default().turns);
    }

    #[test]
    fn rejects_off_wheel_bet_number() {
        let args = Args::parse_from(["roscoin-simulator", "--bet-number", "40"]);
        let err = build_config(&args).unwrap_err();
        assert!(
            err.to_string().contains("bet number"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn missing_config_file_is_reported() {
        let args = Args::parse_from([
            "roscoin-simulator",
            "--config",
            "/nonexistent/roscoin-simulation.yaml",
        ]);
        let err = build_config(&args).unwrap_err();
        assert!(err.to_string().contains("Could not read config file"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(init_tracing("chatty").is_err());
    }
}

//! Monte Carlo survival analysis of a roscoin house bankroll.
//!
//! Every trial deploys a fresh pool, reserve and wager engine over in-memory state, seeds the
//! reserve through an LP investment and then lets a single bettor stake a fixed fraction of the
//! current max bet on one number, turn after turn. The seeded oracle answers each request in the
//! following block. A bankroll is broke once the reserve falls to the configured threshold.

use anyhow::{ensure, Context, Result};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use roscoin_types::constants::{DEFAULT_FEE_STEP, DEFAULT_MAX_BET_DIVISOR, MAX_SLOT, ONE};
use serde::{Deserialize, Serialize};
use tracing::info;

mod house;
pub use house::{House, Turn};

const BPS: u32 = 10_000;

/// Simulation parameters. Any field missing from a config file takes its default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub trials: u32,
    pub turns: u32,
    /// Stake per turn, in basis points of the max bet. One report row per entry.
    pub bet_fractions_bps: Vec<u32>,
    pub bet_number: u8,
    /// Reserve level, in basis points of the starting bankroll, at which a trial stops.
    pub broke_threshold_bps: u32,
    /// Starting bankroll in whole currency units.
    pub bankroll: u64,
    pub seed: u64,
    pub fee_step: u128,
    pub max_bet_divisor: u128,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: 50,
            turns: 500,
            bet_fractions_bps: (1..=10).map(|step| step * 1_000).collect(),
            bet_number: 10,
            broke_threshold_bps: 500,
            bankroll: 1_000_000,
            seed: 0,
            fee_step: DEFAULT_FEE_STEP,
            max_bet_divisor: DEFAULT_MAX_BET_DIVISOR,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.trials > 0, "trials must be positive");
        ensure!(
            !self.bet_fractions_bps.is_empty(),
            "at least one bet fraction is required"
        );
        for fraction in &self.bet_fractions_bps {
            ensure!(
                (1..=BPS).contains(fraction),
                "bet fraction must be within 1..={BPS} bps (got {fraction})"
            );
        }
        ensure!(
            self.bet_number <= MAX_SLOT,
            "bet number must be within 0..={MAX_SLOT} (got {})",
            self.bet_number
        );
        ensure!(
            self.broke_threshold_bps < BPS,
            "broke threshold must be below {BPS} bps (got {})",
            self.broke_threshold_bps
        );
        ensure!(self.bankroll > 0, "bankroll must be positive");
        Ok(())
    }

    pub fn starting_balance(&self) -> u128 {
        u128::from(self.bankroll) * ONE
    }

    pub fn broke_threshold(&self) -> u128 {
        self.starting_balance() * u128::from(self.broke_threshold_bps) / u128::from(BPS)
    }
}

/// How a single bankroll ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialOutcome {
    pub final_balance: u128,
    pub turns: u32,
    pub wagered: u128,
    pub survived: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FractionReport {
    pub bet_fraction_bps: u32,
    pub trials: u32,
    pub survivors: u32,
    pub survival_rate_pct: f64,
    pub average_ending_profit_pct: f64,
    pub average_turns: f64,
    /// Mean currency staked per trial, in whole units.
    pub average_wagered: f64,
}

impl FractionReport {
    fn summarize(bet_fraction_bps: u32, starting_balance: u128, outcomes: &[TrialOutcome]) -> Self {
        let trials = outcomes.len() as f64;
        let survivors = outcomes.iter().filter(|outcome| outcome.survived).count() as u32;
        let mean = |value: fn(&TrialOutcome) -> f64| -> f64 {
            if outcomes.is_empty() {
                return 0.0;
            }
            outcomes.iter().map(value).sum::<f64>() / trials
        };
        let average_balance = mean(|outcome| outcome.final_balance as f64);
        Self {
            bet_fraction_bps,
            trials: outcomes.len() as u32,
            survivors,
            survival_rate_pct: if outcomes.is_empty() {
                0.0
            } else {
                f64::from(survivors) / trials * 100.0
            },
            average_ending_profit_pct: average_balance / starting_balance as f64 * 100.0 - 100.0,
            average_turns: mean(|outcome| f64::from(outcome.turns)),
            average_wagered: mean(|outcome| outcome.wagered as f64) / ONE as f64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub config: SimulationConfig,
    pub fractions: Vec<FractionReport>,
}

/// Plays one bankroll until it goes broke, stops being able to bet or runs out of turns.
pub async fn run_trial(
    config: &SimulationConfig,
    fraction_bps: u32,
    secret: [u8; 32],
) -> Result<TrialOutcome> {
    let mut house = House::open(config, secret).await?;
    let threshold = config.broke_threshold();
    let mut balance = house.reserve_balance().await?;
    let mut turns = 0;
    let mut wagered = 0u128;

    while turns < config.turns && balance > threshold {
        let Some(turn) = house.play(config.bet_number, fraction_bps).await? else {
            break;
        };
        turns += 1;
        wagered = wagered.saturating_add(turn.wagered);
        balance = house.reserve_balance().await?;
    }

    Ok(TrialOutcome {
        final_balance: balance,
        turns,
        wagered,
        survived: balance > threshold,
    })
}

/// Runs every configured bet fraction. Oracle secrets are drawn from `config.seed`, so identical
/// configs produce identical reports.
pub async fn run(config: &SimulationConfig) -> Result<Report> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut fractions = Vec::with_capacity(config.bet_fractions_bps.len());

    for &fraction in &config.bet_fractions_bps {
        let mut outcomes = Vec::with_capacity(config.trials as usize);
        for trial in 0..config.trials {
            let mut secret = [0u8; 32];
            rng.fill_bytes(&mut secret);
            let outcome = run_trial(config, fraction, secret)
                .await
                .with_context(|| format!("trial {trial} at {fraction} bps failed"))?;
            outcomes.push(outcome);
        }

        let report = FractionReport::summarize(fraction, config.starting_balance(), &outcomes);
        info!(
            bet_fraction_bps = fraction,
            survival_rate_pct = report.survival_rate_pct,
            average_ending_profit_pct = report.average_ending_profit_pct,
            "bet fraction simulated"
        );
        fractions.push(report);
    }

    Ok(Report {
        config: config.clone(),
        fractions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SimulationConfig {
        SimulationConfig {
            trials: 2,
            turns: 15,
            bet_fractions_bps: vec![5_000, 10_000],
            bankroll: 100,
            seed: 11,
            ..SimulationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_reports_every_fraction() {
        let config = small();
        let report = run(&config).await.unwrap();
        assert_eq!(report.fractions.len(), 2);
        for (row, fraction) in report.fractions.iter().zip(&config.bet_fractions_bps) {
            assert_eq!(row.bet_fraction_bps, *fraction);
            assert_eq!(row.trials, 2);
            assert!(row.survivors <= 2);
            assert!(row.average_turns <= 15.0);
            assert!(row.average_wagered > 0.0);
        }
    }

    #[tokio::test]
    async fn test_default_and_billion_unit_bankrolls_play() {
        for bankroll in [SimulationConfig::default().bankroll, 1_000_000_000] {
            let config = SimulationConfig {
                trials: 1,
                turns: 5,
                bet_fractions_bps: vec![10_000],
                bankroll,
                ..SimulationConfig::default()
            };
            let report = run(&config).await.unwrap();
            let row = &report.fractions[0];
            assert_eq!(row.average_turns, 5.0);
            assert!(row.average_wagered >= bankroll as f64 / 100.0);
        }
    }

    #[tokio::test]
    async fn test_run_is_reproducible_for_a_seed() {
        let config = small();
        let first = run(&config).await.unwrap();
        let second = run(&config).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let bad = [
            SimulationConfig {
                trials: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                bet_fractions_bps: vec![],
                ..SimulationConfig::default()
            },
            SimulationConfig {
                bet_fractions_bps: vec![0],
                ..SimulationConfig::default()
            },
            SimulationConfig {
                bet_fractions_bps: vec![10_001],
                ..SimulationConfig::default()
            },
            SimulationConfig {
                bet_number: 37,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                broke_threshold_bps: 10_000,
                ..SimulationConfig::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "accepted {config:?}");
        }
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn test_yaml_fills_missing_fields_with_defaults() {
        let config: SimulationConfig = serde_yaml::from_str(
            "trials: 3\nbet_fractions_bps: [2500]\nbroke_threshold_bps: 1000\n",
        )
        .unwrap();
        assert_eq!(config.trials, 3);
        assert_eq!(config.bet_fractions_bps, vec![2_500]);
        assert_eq!(config.turns, SimulationConfig::default().turns);
        assert_eq!(config.broke_threshold(), config.starting_balance() / 10);
    }

    #[test]
    fn test_summary_reports_profit_relative_to_start() {
        let start = 100 * ONE;
        let outcomes = [
            TrialOutcome {
                final_balance: 150 * ONE,
                turns: 10,
                wagered: 20 * ONE,
                survived: true,
            },
            TrialOutcome {
                final_balance: 0,
                turns: 4,
                wagered: 10 * ONE,
                survived: false,
            },
        ];
        let report = FractionReport::summarize(1_000, start, &outcomes);
        assert_eq!(report.survivors, 1);
        assert_eq!(report.survival_rate_pct, 50.0);
        assert_eq!(report.average_ending_profit_pct, -25.0);
        assert_eq!(report.average_turns, 7.0);
        assert_eq!(report.average_wagered, 15.0);
    }
}

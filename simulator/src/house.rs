//! One simulated bankroll: fresh state, a deployed pool/reserve/engine and the accounts driving it.

use crate::SimulationConfig;
use anyhow::{bail, Context, Result};
use commonware_cryptography::{ed25519::PrivateKey, Signer as _};
use roscoin_execution::{Layer, Memory, RandomnessOracle, SeededOracle, State};
use roscoin_types::{
    execution::{Event, Instruction, Output, Transaction},
    PoolId, ReserveId, SettlementConfig,
};
use tracing::debug;

const OWNER_SEED: u64 = 0;
const ORACLE_SEED: u64 = 1;
const LP_SEED: u64 = 2;
const BETTOR_SEED: u64 = 3;

/// Signing key plus the nonce its next transaction must carry.
struct Actor {
    key: PrivateKey,
    nonce: u64,
}

impl Actor {
    fn new(seed: u64) -> Self {
        Self {
            key: PrivateKey::from_seed(seed),
            nonce: 0,
        }
    }

    fn sign(&mut self, instruction: Instruction) -> Transaction {
        let transaction = Transaction::sign(&self.key, self.nonce, instruction);
        self.nonce += 1;
        transaction
    }
}

/// Result of a single bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Turn {
    pub wagered: u128,
    pub payout: u128,
}

pub struct House {
    state: Memory,
    config: SettlementConfig,
    owner: Actor,
    lp: Actor,
    bettor: Actor,
    oracle: SeededOracle,
    reserve: ReserveId,
}

impl House {
    /// Deploys the contracts on empty state and lets the LP invest the starting bankroll.
    pub async fn open(simulation: &SimulationConfig, secret: [u8; 32]) -> Result<Self> {
        let oracle = SeededOracle::new(PrivateKey::from_seed(ORACLE_SEED), secret);
        let mut config = SettlementConfig::new(oracle.public_key());
        config.fee_step = simulation.fee_step;
        config.max_bet_divisor = simulation.max_bet_divisor;
        config.validate().context("invalid settlement config")?;

        let mut house = Self {
            state: Memory::default(),
            config,
            owner: Actor::new(OWNER_SEED),
            lp: Actor::new(LP_SEED),
            bettor: Actor::new(BETTOR_SEED),
            oracle,
            reserve: 0,
        };

        let create = house.owner.sign(Instruction::CreatePool);
        let outputs = house.execute(vec![create]).await?;
        let pool: PoolId = outputs
            .iter()
            .find_map(|output| match output {
                Output::Event(Event::PoolCreated { pool, .. }) => Some(*pool),
                _ => None,
            })
            .context("pool was not created")?;

        let back = house.owner.sign(Instruction::CreateReserve { pool });
        let init = house.owner.sign(Instruction::InitEngine { pool });
        let outputs = house.execute(vec![back, init]).await?;
        house.reserve = outputs
            .iter()
            .find_map(|output| match output {
                Output::Event(Event::ReserveBacked { reserve, .. }) => Some(*reserve),
                _ => None,
            })
            .context("reserve was not deployed")?;

        let amount = simulation.starting_balance();
        let fund = house.lp.sign(Instruction::Fund { amount });
        let invest = house.lp.sign(Instruction::Invest { amount });
        house.execute(vec![fund, invest]).await?;
        Ok(house)
    }

    fn layer(&self) -> Layer<'_, Memory> {
        Layer::new(&self.state, self.config.clone())
    }

    /// Executes one block and commits it. Any rejection during setup or play is fatal here.
    async fn execute(&mut self, transactions: Vec<Transaction>) -> Result<Vec<Output>> {
        let mut layer = Layer::new(&self.state, self.config.clone());
        let (outputs, _) = layer.execute(transactions).await?;
        let changes = layer.commit();
        self.state.apply(changes).await?;

        for output in &outputs {
            if let Output::Event(Event::Rejected { code, message, .. }) = output {
                bail!("instruction rejected (code={code}): {message}");
            }
        }
        self.oracle.observe(&outputs);
        Ok(outputs)
    }

    pub async fn reserve_balance(&self) -> Result<u128> {
        Ok(self.layer().reserve_balance(self.reserve).await?)
    }

    pub async fn max_bet(&self) -> Result<u128> {
        Ok(self.layer().max_bet().await?)
    }

    /// Stakes `fraction_bps` of the current max bet on `bet_number` and resolves it at once.
    ///
    /// Returns `None` once the allowance rounds down to nothing.
    pub async fn play(&mut self, bet_number: u8, fraction_bps: u32) -> Result<Option<Turn>> {
        let max = self.max_bet().await?;
        let value = max
            .checked_mul(u128::from(fraction_bps))
            .context("bet value overflow")?
            / 10_000;
        if value == 0 {
            debug!(max, fraction_bps, "max bet exhausted");
            return Ok(None);
        }

        let fund = self.bettor.sign(Instruction::Fund { amount: value });
        let bet = self.bettor.sign(Instruction::Bet {
            number: bet_number,
            value,
        });
        self.execute(vec![fund, bet]).await?;

        let callbacks = self.oracle.resolve_all();
        let outputs = self.execute(callbacks).await?;
        let payout = outputs
            .iter()
            .filter_map(|output| match output {
                Output::Event(Event::Payout { payout, .. }) => Some(*payout),
                _ => None,
            })
            .sum();
        Ok(Some(Turn {
            wagered: value,
            payout,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_runtime::{deterministic::Runner, Runner as _};
    use roscoin_types::constants::ONE;

    #[test]
    fn test_open_seeds_reserve_with_bankroll() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let config = SimulationConfig::default();
            let house = House::open(&config, [1u8; 32]).await.unwrap();
            assert_eq!(
                house.reserve_balance().await.unwrap(),
                config.starting_balance()
            );
            assert_eq!(
                house.max_bet().await.unwrap(),
                config.starting_balance() / config.max_bet_divisor
            );
        });
    }

    #[test]
    fn test_turn_settles_against_reserve() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let config = SimulationConfig {
                bankroll: 1_000,
                ..SimulationConfig::default()
            };
            let mut house = House::open(&config, [2u8; 32]).await.unwrap();
            let before = house.reserve_balance().await.unwrap();

            let turn = house.play(config.bet_number, 10_000).await.unwrap().unwrap();
            assert_eq!(turn.wagered, 10 * ONE);
            let after = house.reserve_balance().await.unwrap();
            if turn.payout == 0 {
                assert_eq!(after, before + turn.wagered);
            } else {
                assert_eq!(turn.payout, 36 * turn.wagered);
                assert_eq!(after, before + turn.wagered - turn.payout);
            }
        });
    }
}

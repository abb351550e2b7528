use anyhow::{Context as _, Result};
use commonware_cryptography::ed25519::PublicKey;
use roscoin_types::{
    execution::{rejection_message, Event, Instruction, Key, Output, Registry, Transaction, Value},
    LiquidityPool, PoolId, RequestId, Reserve, ReserveId, SettlementConfig, SettlementError,
    Wager, WagerEngine,
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;
use tracing::{debug, warn};

use crate::state::{load_account, validate_and_increment_nonce, PrepareError, State, Status};

mod handlers;

/// Failure of a single instruction.
#[derive(Debug, ThisError)]
pub enum ExecutionError {
    /// The instruction was refused; the layer rolled back everything it wrote.
    #[error(transparent)]
    Rejected(#[from] SettlementError),
    /// Backing storage failed. Execution must stop.
    #[error(transparent)]
    State(#[from] anyhow::Error),
}

impl ExecutionError {
    pub fn rejection(&self) -> Option<&SettlementError> {
        match self {
            Self::Rejected(err) => Some(err),
            Self::State(_) => None,
        }
    }
}

/// Deterministic settlement layer.
///
/// Reads fall through to the backing [`State`]; writes are buffered until [`Layer::commit`].
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    config: SettlementConfig,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S, config: SettlementConfig) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),

            config,
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    fn insert(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    pub(crate) async fn prepare(&mut self, transaction: &Transaction) -> Result<(), PrepareError> {
        let mut account = load_account(self, &transaction.public)
            .await
            .map_err(PrepareError::State)?;
        validate_and_increment_nonce(&mut account, transaction.nonce)?;
        self.insert(
            Key::Account(transaction.public.clone()),
            Value::Account(account),
        );

        Ok(())
    }

    async fn dispatch(
        &mut self,
        public: &PublicKey,
        instruction: &Instruction,
    ) -> Result<Vec<Event>, ExecutionError> {
        match instruction {
            Instruction::Fund { amount } => self.handle_fund(public, *amount).await,

            Instruction::CreatePool => self.handle_create_pool(public).await,
            Instruction::CreateReserve { pool } => self.handle_create_reserve(public, *pool).await,
            Instruction::BackPool { pool } => self.handle_back_pool(public, *pool).await,
            Instruction::Donate { reserve, amount } => {
                self.handle_donate(public, *reserve, *amount).await
            }
            Instruction::Withdraw { reserve, amount } => {
                self.handle_withdraw(public, *reserve, *amount).await
            }
            Instruction::Buy { pool, amount } => self.handle_buy(public, *pool, *amount).await,
            Instruction::Sell { pool, tokens } => self.handle_sell(public, *pool, *tokens).await,

            Instruction::Transfer { pool, to, amount } => {
                self.handle_transfer(public, *pool, to, *amount).await
            }
            Instruction::Approve {
                pool,
                spender,
                amount,
            } => self.handle_approve(public, *pool, spender, *amount).await,
            Instruction::TransferFrom {
                pool,
                from,
                to,
                amount,
            } => {
                self.handle_transfer_from(public, *pool, from, to, *amount)
                    .await
            }

            Instruction::InitEngine { pool } => self.handle_init_engine(public, *pool).await,
            Instruction::Bet { number, value } => self.handle_bet(public, *number, *value).await,
            Instruction::ResolveRandomness {
                request_id,
                random_number,
            } => {
                self.handle_resolve_randomness(public, *request_id, *random_number)
                    .await
            }
            Instruction::Invest { amount } => self.handle_invest(public, *amount).await,
            Instruction::Divest { tokens } => self.handle_divest(public, *tokens).await,
            Instruction::Pause => self.handle_set_paused(public, true).await,
            Instruction::Unpause => self.handle_set_paused(public, false).await,
        }
    }

    /// Applies one prepared transaction all-or-nothing.
    ///
    /// On rejection every write made by the instruction is discarded; the nonce increment from
    /// [`Layer::prepare`] is kept.
    pub(crate) async fn apply(
        &mut self,
        transaction: &Transaction,
    ) -> Result<Vec<Event>, ExecutionError> {
        let snapshot = self.pending.clone();
        let result = self
            .dispatch(&transaction.public, &transaction.instruction)
            .await;
        if result.is_err() {
            self.pending = snapshot;
        }
        result
    }

    pub async fn execute(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<(Vec<Output>, BTreeMap<PublicKey, u64>)> {
        let mut processed_nonces = BTreeMap::new();
        let mut outputs = Vec::new();

        for tx in transactions {
            if !tx.verify() {
                debug!(public = ?tx.public, "invalid signature; dropping transaction");
                continue;
            }
            match self.prepare(&tx).await {
                Ok(()) => {}
                Err(PrepareError::NonceMismatch { expected, got }) => {
                    debug!(
                        public = ?tx.public,
                        expected,
                        got,
                        "nonce mismatch; dropping transaction"
                    );
                    continue;
                }
                Err(PrepareError::State(err)) => {
                    return Err(err).context("state error during prepare");
                }
            }
            processed_nonces.insert(tx.public.clone(), tx.nonce.saturating_add(1));
            match self.apply(&tx).await {
                Ok(events) => outputs.extend(events.into_iter().map(Output::Event)),
                Err(ExecutionError::Rejected(err)) => {
                    warn!(
                        public = ?tx.public,
                        code = err.code(),
                        error = %err,
                        "instruction rejected"
                    );
                    outputs.push(Output::Event(Event::Rejected {
                        account: tx.public.clone(),
                        code: err.code(),
                        message: rejection_message(err.to_string()),
                    }));
                }
                Err(ExecutionError::State(err)) => {
                    return Err(err).context("state error during apply");
                }
            }
            outputs.push(Output::Transaction(tx));
        }

        Ok((outputs, processed_nonces))
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }

    // === Loaders ===

    async fn registry(&self) -> Result<Registry> {
        Ok(match self.get(&Key::Registry).await? {
            Some(Value::Registry(registry)) => registry,
            _ => Registry::default(),
        })
    }

    async fn wallet(&self, public: &PublicKey) -> Result<u128> {
        Ok(match self.get(&Key::Wallet(public.clone())).await? {
            Some(Value::Wallet(balance)) => balance,
            _ => 0,
        })
    }

    fn set_wallet(&mut self, public: &PublicKey, balance: u128) {
        if balance == 0 {
            self.pending.insert(Key::Wallet(public.clone()), Status::Delete);
        } else {
            self.insert(Key::Wallet(public.clone()), Value::Wallet(balance));
        }
    }

    async fn load_pool(&self, id: PoolId) -> Result<LiquidityPool, ExecutionError> {
        match self.get(&Key::Pool(id)).await? {
            Some(Value::Pool(pool)) => Ok(pool),
            _ => Err(SettlementError::UnknownPool(id).into()),
        }
    }

    async fn load_reserve(&self, id: ReserveId) -> Result<Reserve, ExecutionError> {
        match self.get(&Key::Reserve(id)).await? {
            Some(Value::Reserve(reserve)) => Ok(reserve),
            _ => Err(SettlementError::UnknownReserve(id).into()),
        }
    }

    /// Loads a pool together with the reserve it is paired with.
    async fn load_pair(&self, id: PoolId) -> Result<(LiquidityPool, Reserve), ExecutionError> {
        let pool = self.load_pool(id).await?;
        let reserve = pool
            .reserve()
            .ok_or(SettlementError::ReserveNotPaired(id))?;
        let reserve = self.load_reserve(reserve).await?;
        Ok((pool, reserve))
    }

    async fn load_engine(&self) -> Result<WagerEngine, ExecutionError> {
        match self.get(&Key::Engine).await? {
            Some(Value::Engine(engine)) => Ok(engine),
            _ => Err(SettlementError::EngineNotInitialized.into()),
        }
    }

    async fn engine(&self) -> Result<Option<WagerEngine>> {
        Ok(match self.get(&Key::Engine).await? {
            Some(Value::Engine(engine)) => Some(engine),
            _ => None,
        })
    }

    // === Queries ===

    /// Largest stake `bet` accepts right now. Recomputed from the reserve on every call.
    pub async fn max_bet(&self) -> Result<u128, ExecutionError> {
        let engine = self.load_engine().await?;
        let (_, reserve) = self.load_pair(engine.pool).await?;
        Ok(engine.max_bet(reserve.balance(), self.config.max_bet_divisor))
    }

    pub async fn token_price(&self, pool: PoolId) -> Result<u128, ExecutionError> {
        let (pool, reserve) = self.load_pair(pool).await?;
        Ok(pool.token_price(reserve.balance(), self.config.initial_token_price)?)
    }

    pub async fn balance_of(
        &self,
        pool: PoolId,
        account: &PublicKey,
    ) -> Result<u128, ExecutionError> {
        Ok(self.load_pool(pool).await?.ledger.balance_of(account))
    }

    pub async fn total_supply(&self, pool: PoolId) -> Result<u128, ExecutionError> {
        Ok(self.load_pool(pool).await?.ledger.total_supply())
    }

    pub async fn wallet_balance(&self, account: &PublicKey) -> Result<u128> {
        self.wallet(account).await
    }

    pub async fn reserve_balance(&self, reserve: ReserveId) -> Result<u128, ExecutionError> {
        Ok(self.load_reserve(reserve).await?.balance())
    }

    pub async fn pending_request_count(&self) -> Result<u64, ExecutionError> {
        Ok(self.load_engine().await?.pending_request_count)
    }

    pub async fn wager(&self, request_id: RequestId) -> Result<Option<Wager>> {
        Ok(match self.get(&Key::Wager(request_id)).await? {
            Some(Value::Wager(wager)) => Some(wager),
            _ => None,
        })
    }

    pub async fn wager_engine(&self) -> Result<Option<WagerEngine>> {
        self.engine().await
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}

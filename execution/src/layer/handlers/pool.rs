use super::super::*;
use super::Trade;
use roscoin_types::Principal;
use tracing::info;

impl<'a, S: State> Layer<'a, S> {
    // === Wallet, Pool & Reserve Handlers ===

    pub(in crate::layer) async fn handle_fund(
        &mut self,
        public: &PublicKey,
        amount: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        if amount == 0 {
            return Err(SettlementError::InsufficientValue.into());
        }
        let balance = self.credit_wallet(public, amount).await?;
        Ok(vec![Event::Funded {
            account: public.clone(),
            amount,
            balance,
        }])
    }

    pub(in crate::layer) async fn handle_create_pool(
        &mut self,
        public: &PublicKey,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut registry = self.registry().await?;
        let id = registry.next_pool;
        registry.next_pool = id.checked_add(1).ok_or(SettlementError::Overflow)?;

        self.insert(Key::Registry, Value::Registry(registry));
        self.insert(
            Key::Pool(id),
            Value::Pool(LiquidityPool::new(id, public.clone())),
        );
        info!(pool = id, creator = ?public, "pool created");
        Ok(vec![Event::PoolCreated {
            pool: id,
            creator: public.clone(),
        }])
    }

    /// Deploys a reserve and registers it with the pool it backs.
    pub(in crate::layer) async fn handle_create_reserve(
        &mut self,
        public: &PublicKey,
        pool_id: PoolId,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut pool = self.load_pool(pool_id).await?;
        let mut registry = self.registry().await?;
        let id = registry.next_reserve;
        registry.next_reserve = id.checked_add(1).ok_or(SettlementError::Overflow)?;

        pool.back(&Principal::Reserve(id))?;

        self.insert(Key::Registry, Value::Registry(registry));
        self.insert(Key::Pool(pool_id), Value::Pool(pool));
        self.insert(
            Key::Reserve(id),
            Value::Reserve(Reserve::new(id, pool_id, public.clone())),
        );
        info!(pool = pool_id, reserve = id, deployer = ?public, "reserve backed pool");
        Ok(vec![Event::ReserveBacked {
            pool: pool_id,
            reserve: id,
            deployer: public.clone(),
        }])
    }

    pub(in crate::layer) async fn handle_back_pool(
        &mut self,
        public: &PublicKey,
        pool_id: PoolId,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut pool = self.load_pool(pool_id).await?;
        pool.back(&Principal::Account(public.clone()))?;
        self.insert(Key::Pool(pool_id), Value::Pool(pool));
        Ok(vec![])
    }

    pub(in crate::layer) async fn handle_donate(
        &mut self,
        public: &PublicKey,
        reserve_id: ReserveId,
        amount: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        if amount == 0 {
            return Err(SettlementError::InsufficientValue.into());
        }
        let mut reserve = self.load_reserve(reserve_id).await?;
        self.debit_wallet(public, amount).await?;
        reserve.deposit(amount)?;
        self.insert(Key::Reserve(reserve_id), Value::Reserve(reserve));
        info!(reserve = reserve_id, from = ?public, amount, "donation");
        Ok(vec![Event::Donation {
            reserve: reserve_id,
            from: public.clone(),
            amount,
        }])
    }

    /// Withdrawal requested directly by an account. Only the paired pool holds withdraw
    /// authority, so this is refused for every signer, the deployer included.
    pub(in crate::layer) async fn handle_withdraw(
        &mut self,
        public: &PublicKey,
        reserve_id: ReserveId,
        amount: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut reserve = self.load_reserve(reserve_id).await?;
        reserve.withdraw(&Principal::Account(public.clone()), amount)?;
        self.credit_wallet(public, amount).await?;
        self.insert(Key::Reserve(reserve_id), Value::Reserve(reserve));
        Ok(vec![])
    }

    pub(in crate::layer) async fn handle_buy(
        &mut self,
        public: &PublicKey,
        pool_id: PoolId,
        amount: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let Trade {
            currency_amount,
            token_price,
            token_amount,
        } = self.purchase(public, pool_id, amount).await?;
        info!(
            pool = pool_id,
            buyer = ?public,
            currency_amount,
            token_price,
            token_amount,
            "buy"
        );
        Ok(vec![Event::Buy {
            pool: pool_id,
            buyer: public.clone(),
            currency_amount,
            token_price,
            token_amount,
        }])
    }

    pub(in crate::layer) async fn handle_sell(
        &mut self,
        public: &PublicKey,
        pool_id: PoolId,
        tokens: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let Trade {
            currency_amount,
            token_price,
            token_amount,
        } = self.redeem(public, pool_id, tokens).await?;
        info!(
            pool = pool_id,
            seller = ?public,
            currency_amount,
            token_price,
            token_amount,
            "sell"
        );
        Ok(vec![Event::Sell {
            pool: pool_id,
            seller: public.clone(),
            currency_amount,
            token_price,
            token_amount,
        }])
    }
}

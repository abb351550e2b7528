use super::super::*;
use super::Trade;
use roscoin_types::{
    constants::PAYOUT_MULTIPLIER, error::CheckedAmount, Principal, Slot, WagerStatus,
};
use tracing::info;

impl<'a, S: State> Layer<'a, S> {
    // === Wager Engine Handlers ===

    pub(in crate::layer) async fn handle_init_engine(
        &mut self,
        public: &PublicKey,
        pool_id: PoolId,
    ) -> Result<Vec<Event>, ExecutionError> {
        if self.engine().await?.is_some() {
            return Err(SettlementError::EngineAlreadyInitialized.into());
        }
        // Only a paired pool can bank wagers.
        self.load_pair(pool_id).await?;

        self.insert(
            Key::Engine,
            Value::Engine(WagerEngine::new(public.clone(), pool_id)),
        );
        info!(owner = ?public, pool = pool_id, "wager engine initialized");
        Ok(vec![Event::EngineInitialized {
            owner: public.clone(),
            pool: pool_id,
        }])
    }

    /// Escrows a stake and issues a randomness request for it.
    pub(in crate::layer) async fn handle_bet(
        &mut self,
        public: &PublicKey,
        number: u8,
        value: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut engine = self.load_engine().await?;
        if engine.paused {
            return Err(SettlementError::Paused.into());
        }
        let bet_number = Slot::new(number)?;
        if value == 0 {
            return Err(SettlementError::InsufficientValue.into());
        }

        let (_, mut reserve) = self.load_pair(engine.pool).await?;
        let max = engine.max_bet(reserve.balance(), self.config.max_bet_divisor);
        if value > max {
            return Err(SettlementError::BetTooLarge { value, max }.into());
        }
        let fee = self
            .config
            .fee_schedule()
            .fee(engine.pending_request_count)?;
        if value <= fee {
            return Err(SettlementError::BetTooSmall { value, fee }.into());
        }
        let bet_size = value - fee;

        self.debit_wallet(public, value).await?;
        let oracle = self.config.oracle.clone();
        if fee > 0 {
            self.credit_wallet(&oracle, fee).await?;
        }
        reserve.deposit(bet_size)?;

        let liability = bet_size.mul_or_overflow(PAYOUT_MULTIPLIER)?;
        let request_id = engine.open(liability)?;
        let wager = Wager {
            id: request_id,
            player: public.clone(),
            bet_number,
            bet_size,
            status: WagerStatus::Pending,
        };

        self.insert(Key::Reserve(reserve.id), Value::Reserve(reserve));
        self.insert(Key::Wager(request_id), Value::Wager(wager));
        self.insert(Key::Engine, Value::Engine(engine));

        info!(
            player = ?public,
            request_id,
            bet_number = bet_number.number(),
            bet_size,
            fee,
            "bet accepted"
        );
        Ok(vec![
            Event::Bet {
                request_id,
                player: public.clone(),
                bet_number,
                bet_size,
            },
            Event::RandomnessRequested { request_id, fee },
        ])
    }

    /// Oracle callback. Resolves a pending wager exactly once; anything else is a no-op.
    pub(in crate::layer) async fn handle_resolve_randomness(
        &mut self,
        public: &PublicKey,
        request_id: RequestId,
        random_number: u64,
    ) -> Result<Vec<Event>, ExecutionError> {
        if *public != self.config.oracle {
            return Err(SettlementError::Unauthorized.into());
        }
        let mut wager = match self.wager(request_id).await? {
            Some(wager) if wager.is_pending() => wager,
            _ => {
                debug!(request_id, "no pending wager for randomness; ignoring");
                return Ok(vec![]);
            }
        };
        let mut engine = self.load_engine().await?;

        let winning_number = Slot::from_random(random_number);
        wager.status = WagerStatus::Resolved { winning_number };
        let liability = wager.liability()?;
        engine.close(liability)?;

        let mut events = vec![Event::Play {
            request_id,
            player: wager.player.clone(),
            bet_number: wager.bet_number,
            winning_number,
        }];

        if wager.won() {
            let (_, mut reserve) = self.load_pair(engine.pool).await?;
            // Bookkeeping first: the reserve is debited before the winner is credited.
            reserve.withdraw(&Principal::Pool(engine.pool), liability)?;
            self.insert(Key::Reserve(reserve.id), Value::Reserve(reserve));
            self.credit_wallet(&wager.player, liability).await?;
            info!(request_id, winner = ?wager.player, payout = liability, "payout");
            events.push(Event::Payout {
                request_id,
                winner: wager.player.clone(),
                payout: liability,
            });
        } else {
            info!(
                request_id,
                player = ?wager.player,
                bet_number = wager.bet_number.number(),
                winning_number = winning_number.number(),
                "wager lost"
            );
        }

        self.insert(Key::Wager(request_id), Value::Wager(wager));
        self.insert(Key::Engine, Value::Engine(engine));
        Ok(events)
    }

    pub(in crate::layer) async fn handle_invest(
        &mut self,
        public: &PublicKey,
        amount: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let engine = self.load_engine().await?;
        let Trade {
            currency_amount,
            token_price,
            token_amount,
        } = self.purchase(public, engine.pool, amount).await?;
        info!(investor = ?public, currency_amount, token_price, token_amount, "invest");
        Ok(vec![Event::Invest {
            investor: public.clone(),
            currency_amount,
            token_price,
            token_amount,
        }])
    }

    pub(in crate::layer) async fn handle_divest(
        &mut self,
        public: &PublicKey,
        tokens: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let engine = self.load_engine().await?;
        let Trade {
            currency_amount,
            token_price,
            token_amount,
        } = self.redeem(public, engine.pool, tokens).await?;
        info!(investor = ?public, currency_amount, token_price, token_amount, "divest");
        Ok(vec![Event::Divest {
            investor: public.clone(),
            currency_amount,
            token_price,
            token_amount,
        }])
    }

    /// Pausing blocks new bets only; pending wagers still resolve.
    pub(in crate::layer) async fn handle_set_paused(
        &mut self,
        public: &PublicKey,
        paused: bool,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut engine = self.load_engine().await?;
        engine.ensure_owner(public)?;
        engine.paused = paused;
        self.insert(Key::Engine, Value::Engine(engine));

        info!(by = ?public, paused, "wager engine pause toggled");
        let by = public.clone();
        Ok(vec![if paused {
            Event::Paused { by }
        } else {
            Event::Unpaused { by }
        }])
    }
}

use super::*;
use roscoin_types::{error::CheckedAmount, Principal};

mod ledger;
mod pool;
mod wager;

/// Priced conversion between currency and claim tokens, shared by pool and engine handlers.
struct Trade {
    currency_amount: u128,
    token_price: u128,
    token_amount: u128,
}

impl<'a, S: State> Layer<'a, S> {
    async fn debit_wallet(
        &mut self,
        public: &PublicKey,
        amount: u128,
    ) -> Result<(), ExecutionError> {
        let have = self.wallet(public).await?;
        let remaining = have
            .checked_sub(amount)
            .ok_or(SettlementError::InsufficientFunds { have, need: amount })?;
        self.set_wallet(public, remaining);
        Ok(())
    }

    async fn credit_wallet(
        &mut self,
        public: &PublicKey,
        amount: u128,
    ) -> Result<u128, ExecutionError> {
        let balance = self.wallet(public).await?.add_or_overflow(amount)?;
        self.set_wallet(public, balance);
        Ok(balance)
    }

    /// Mints tokens for `amount` of the buyer's currency and forwards the currency to the reserve.
    async fn purchase(
        &mut self,
        buyer: &PublicKey,
        pool_id: PoolId,
        amount: u128,
    ) -> Result<Trade, ExecutionError> {
        let (mut pool, mut reserve) = self.load_pair(pool_id).await?;
        let quote = pool.quote_buy(reserve.balance(), amount, self.config.initial_token_price)?;

        self.debit_wallet(buyer, amount).await?;
        pool.ledger.mint(buyer, quote.tokens_out)?;
        reserve.deposit(amount)?;

        self.insert(Key::Pool(pool_id), Value::Pool(pool));
        self.insert(Key::Reserve(reserve.id), Value::Reserve(reserve));
        Ok(Trade {
            currency_amount: amount,
            token_price: quote.token_price,
            token_amount: quote.tokens_out,
        })
    }

    /// Burns the seller's tokens and pays out currency through the pool's withdraw authority.
    ///
    /// Currency locked as worst-case payout for pending wagers cannot be redeemed.
    async fn redeem(
        &mut self,
        seller: &PublicKey,
        pool_id: PoolId,
        tokens: u128,
    ) -> Result<Trade, ExecutionError> {
        if tokens == 0 {
            return Err(SettlementError::InsufficientValue.into());
        }
        let (mut pool, mut reserve) = self.load_pair(pool_id).await?;
        let quote = pool.quote_sell(
            seller,
            reserve.balance(),
            tokens,
            self.config.initial_token_price,
        )?;

        if let Some(engine) = self.engine().await? {
            if engine.pool == pool_id {
                let available = engine.free_reserve(reserve.balance());
                if quote.currency_out > available {
                    return Err(SettlementError::InsufficientReserve {
                        available,
                        need: quote.currency_out,
                    }
                    .into());
                }
            }
        }

        pool.ledger.burn(seller, tokens)?;
        reserve.withdraw(&Principal::Pool(pool_id), quote.currency_out)?;
        self.credit_wallet(seller, quote.currency_out).await?;

        self.insert(Key::Pool(pool_id), Value::Pool(pool));
        self.insert(Key::Reserve(reserve.id), Value::Reserve(reserve));
        Ok(Trade {
            currency_amount: quote.currency_out,
            token_price: quote.token_price,
            token_amount: tokens,
        })
    }
}

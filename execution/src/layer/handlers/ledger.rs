use super::super::*;
use tracing::info;

impl<'a, S: State> Layer<'a, S> {
    // === Claim-Token Ledger Handlers ===

    pub(in crate::layer) async fn handle_transfer(
        &mut self,
        public: &PublicKey,
        pool_id: PoolId,
        to: &PublicKey,
        amount: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut pool = self.load_pool(pool_id).await?;
        pool.ledger.transfer(public, to, amount)?;
        self.insert(Key::Pool(pool_id), Value::Pool(pool));
        info!(pool = pool_id, from = ?public, to = ?to, amount, "transfer");
        Ok(vec![Event::Transfer {
            pool: pool_id,
            from: public.clone(),
            to: to.clone(),
            amount,
        }])
    }

    pub(in crate::layer) async fn handle_approve(
        &mut self,
        public: &PublicKey,
        pool_id: PoolId,
        spender: &PublicKey,
        amount: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut pool = self.load_pool(pool_id).await?;
        pool.ledger.approve(public, spender, amount);
        self.insert(Key::Pool(pool_id), Value::Pool(pool));
        Ok(vec![Event::Approval {
            pool: pool_id,
            owner: public.clone(),
            spender: spender.clone(),
            amount,
        }])
    }

    pub(in crate::layer) async fn handle_transfer_from(
        &mut self,
        public: &PublicKey,
        pool_id: PoolId,
        from: &PublicKey,
        to: &PublicKey,
        amount: u128,
    ) -> Result<Vec<Event>, ExecutionError> {
        let mut pool = self.load_pool(pool_id).await?;
        pool.ledger.transfer_from(public, from, to, amount)?;
        self.insert(Key::Pool(pool_id), Value::Pool(pool));
        info!(pool = pool_id, spender = ?public, from = ?from, to = ?to, amount, "transfer from");
        Ok(vec![Event::Transfer {
            pool: pool_id,
            from: from.clone(),
            to: to.clone(),
            amount,
        }])
    }
}

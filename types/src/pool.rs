//! Claim-token pool: price discovery from the reserve-to-supply ratio.
//!
//! The pool owns the [`FixedPointLedger`] and is paired, exactly once, with a [`crate::Reserve`]
//! that holds the backing currency. Buy and sell both use the price observed before any mutation
//! and both floor, so issuance and redemption never move the price against existing holders.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;

use crate::codec::{option_encode_size, read_option, write_option};
use crate::constants::ONE;
use crate::error::SettlementError;
use crate::ledger::FixedPointLedger;
use crate::math::mul_div_floor;
use crate::{PoolId, Principal, ReserveId};

/// Price of one whole token, in currency base units.
///
/// `floor(reserve_balance * ONE / total_supply)` while tokens are outstanding, `initial_price`
/// otherwise.
pub fn token_price(
    reserve_balance: u128,
    total_supply: u128,
    initial_price: u128,
) -> Result<u128, SettlementError> {
    if total_supply == 0 {
        return Ok(initial_price);
    }
    mul_div_floor(reserve_balance, ONE, total_supply)
}

/// Tokens issued for `amount` of currency at `price`.
pub fn tokens_for_currency(amount: u128, price: u128) -> Result<u128, SettlementError> {
    if price == 0 {
        return Err(SettlementError::InsufficientReserve {
            available: 0,
            need: amount,
        });
    }
    mul_div_floor(amount, ONE, price)
}

/// Currency redeemed for `tokens` at `price`.
pub fn currency_for_tokens(tokens: u128, price: u128) -> Result<u128, SettlementError> {
    mul_div_floor(tokens, price, ONE)
}

/// Result of pricing a purchase against the pre-mutation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuyQuote {
    pub token_price: u128,
    pub tokens_out: u128,
}

/// Result of pricing a redemption against the pre-mutation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SellQuote {
    pub token_price: u128,
    pub currency_out: u128,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiquidityPool {
    pub id: PoolId,
    pub creator: PublicKey,
    reserve: Option<ReserveId>,
    pub ledger: FixedPointLedger,
}

impl LiquidityPool {
    pub fn new(id: PoolId, creator: PublicKey) -> Self {
        Self {
            id,
            creator,
            reserve: None,
            ledger: FixedPointLedger::default(),
        }
    }

    /// The reserve backing this pool, if the handshake has happened.
    pub fn reserve(&self) -> Option<ReserveId> {
        self.reserve
    }

    /// Backing handshake: only a reserve may register itself, and only once.
    pub fn back(&mut self, caller: &Principal) -> Result<(), SettlementError> {
        let Principal::Reserve(reserve) = caller else {
            return Err(SettlementError::Unauthorized);
        };
        if let Some(existing) = self.reserve {
            return Err(SettlementError::AlreadyBacked {
                pool: self.id,
                reserve: existing,
            });
        }
        self.reserve = Some(*reserve);
        Ok(())
    }

    pub fn token_price(
        &self,
        reserve_balance: u128,
        initial_price: u128,
    ) -> Result<u128, SettlementError> {
        token_price(reserve_balance, self.ledger.total_supply(), initial_price)
    }

    pub fn quote_buy(
        &self,
        reserve_balance: u128,
        amount: u128,
        initial_price: u128,
    ) -> Result<BuyQuote, SettlementError> {
        if amount == 0 {
            return Err(SettlementError::InsufficientValue);
        }
        let token_price = self.token_price(reserve_balance, initial_price)?;
        let tokens_out = tokens_for_currency(amount, token_price)?;
        if tokens_out == 0 {
            return Err(SettlementError::InsufficientValue);
        }
        Ok(BuyQuote {
            token_price,
            tokens_out,
        })
    }

    pub fn quote_sell(
        &self,
        seller: &PublicKey,
        reserve_balance: u128,
        tokens: u128,
        initial_price: u128,
    ) -> Result<SellQuote, SettlementError> {
        let have = self.ledger.balance_of(seller);
        if have < tokens {
            return Err(SettlementError::InsufficientBalance { have, need: tokens });
        }
        let token_price = self.token_price(reserve_balance, initial_price)?;
        // Redeeming the whole supply releases the whole reserve, so no dust is stranded.
        let currency_out = if tokens == self.ledger.total_supply() {
            reserve_balance
        } else {
            currency_for_tokens(tokens, token_price)?
        };
        Ok(SellQuote {
            token_price,
            currency_out,
        })
    }
}

impl Write for LiquidityPool {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.creator.write(writer);
        write_option(&self.reserve, writer);
        self.ledger.write(writer);
    }
}

impl Read for LiquidityPool {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: PoolId::read(reader)?,
            creator: PublicKey::read(reader)?,
            reserve: read_option(reader)?,
            ledger: FixedPointLedger::read(reader)?,
        })
    }
}

impl EncodeSize for LiquidityPool {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.creator.encode_size()
            + option_encode_size(&self.reserve)
            + self.ledger.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::account;
    use proptest::prelude::*;

    #[test]
    fn empty_pool_uses_initial_price() {
        assert_eq!(token_price(0, 0, ONE), Ok(ONE));
        assert_eq!(token_price(5 * ONE, 0, ONE), Ok(ONE));
    }

    #[test]
    fn price_tracks_reserve_per_token() {
        assert_eq!(token_price(2 * ONE, ONE, ONE), Ok(2 * ONE));
        assert_eq!(token_price(ONE, 4 * ONE, ONE), Ok(ONE / 4));
    }

    #[test]
    fn prices_large_pools_exactly() {
        assert_eq!(token_price(1_500 * ONE, 1_000 * ONE, ONE), Ok(ONE + ONE / 2));
        assert_eq!(
            token_price(1_000_000_000 * ONE, 400_000_000 * ONE, ONE),
            Ok(5 * ONE / 2)
        );
        assert_eq!(tokens_for_currency(400 * ONE, ONE), Ok(400 * ONE));
        assert_eq!(
            tokens_for_currency(1_500 * ONE, ONE + ONE / 2),
            Ok(1_000 * ONE)
        );
        assert_eq!(
            currency_for_tokens(1_000 * ONE, ONE + ONE / 2),
            Ok(1_500 * ONE)
        );
    }

    #[test]
    fn large_buy_and_sell_at_fractional_price() {
        let alice = account(1);
        let bob = account(2);
        let mut pool = LiquidityPool::new(0, alice.clone());
        pool.ledger.mint(&alice, 1_000 * ONE).unwrap();
        let reserve = 1_500 * ONE;

        let buy = pool.quote_buy(reserve, 3_000 * ONE, ONE).unwrap();
        assert_eq!(buy.token_price, ONE + ONE / 2);
        assert_eq!(buy.tokens_out, 2_000 * ONE);
        pool.ledger.mint(&bob, buy.tokens_out).unwrap();
        let reserve = reserve + 3_000 * ONE;
        assert_eq!(pool.token_price(reserve, ONE), Ok(ONE + ONE / 2));

        let sell = pool.quote_sell(&bob, reserve, 2_000 * ONE, ONE).unwrap();
        assert_eq!(sell.currency_out, 3_000 * ONE);
    }

    #[test]
    fn price_floors_a_repeating_ratio() {
        // 1000 / 3 per token: the last digit is dropped, never rounded up.
        assert_eq!(
            token_price(1_000 * ONE, 3 * ONE, ONE),
            Ok(333_333_333_333_333_333_333)
        );
    }

    #[test]
    fn only_a_reserve_can_back_and_only_once() {
        let mut pool = LiquidityPool::new(0, account(1));
        assert_eq!(
            pool.back(&Principal::Account(account(1))),
            Err(SettlementError::Unauthorized)
        );
        assert_eq!(pool.back(&Principal::Pool(0)), Err(SettlementError::Unauthorized));
        pool.back(&Principal::Reserve(3)).unwrap();
        assert_eq!(pool.reserve(), Some(3));
        assert_eq!(
            pool.back(&Principal::Reserve(4)),
            Err(SettlementError::AlreadyBacked { pool: 0, reserve: 3 })
        );
        assert_eq!(pool.reserve(), Some(3));
    }

    #[test]
    fn zero_buy_is_rejected() {
        let pool = LiquidityPool::new(0, account(1));
        assert_eq!(
            pool.quote_buy(0, 0, ONE),
            Err(SettlementError::InsufficientValue)
        );
    }

    #[test]
    fn sell_requires_balance() {
        let alice = account(1);
        let mut pool = LiquidityPool::new(0, alice.clone());
        pool.ledger.mint(&alice, ONE).unwrap();
        assert_eq!(
            pool.quote_sell(&alice, ONE, ONE + 1, ONE),
            Err(SettlementError::InsufficientBalance {
                have: ONE,
                need: ONE + 1
            })
        );
    }

    #[test]
    fn selling_whole_supply_releases_whole_reserve() {
        let alice = account(1);
        let mut pool = LiquidityPool::new(0, alice.clone());
        pool.ledger.mint(&alice, 3).unwrap();
        // 10 / 3 does not divide; the last holder still gets every unit.
        let quote = pool.quote_sell(&alice, 10, 3, ONE).unwrap();
        assert_eq!(quote.currency_out, 10);
    }

    proptest! {
        #[test]
        fn buy_then_sell_never_lowers_price(
            reserve in ONE..1_000_000_000 * ONE,
            supply in ONE..1_000_000_000 * ONE,
            amount in 1u128..1_000_000_000 * ONE,
        ) {
            let price_before = token_price(reserve, supply, ONE).unwrap();
            let tokens = tokens_for_currency(amount, price_before).unwrap();
            let reserve_after_buy = reserve + amount;
            let supply_after_buy = supply + tokens;
            let price_mid = token_price(reserve_after_buy, supply_after_buy, ONE).unwrap();
            prop_assert!(price_mid >= price_before);

            let out = currency_for_tokens(tokens, price_mid).unwrap();
            prop_assert!(out <= reserve_after_buy);
            let price_after = token_price(reserve_after_buy - out, supply, ONE).unwrap();
            prop_assert!(price_after >= price_before);
        }

        #[test]
        fn buy_then_sell_is_exact_at_initial_price(
            amount in 1u128..1_000_000_000 * ONE,
        ) {
            let tokens = tokens_for_currency(amount, ONE).unwrap();
            prop_assert_eq!(tokens, amount);
            prop_assert_eq!(token_price(amount, tokens, ONE), Ok(ONE));
            prop_assert_eq!(currency_for_tokens(tokens, ONE).unwrap(), amount);
        }
    }
}

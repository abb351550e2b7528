//! Balance and allowance bookkeeping for a single 18-decimal claim token.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

use crate::codec::read_len;
use crate::constants::MAX_LEDGER_ACCOUNTS;
use crate::error::{CheckedAmount, SettlementError};

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum LedgerInvariantError {
    #[error("sum of balances does not match total supply (sum={sum}, supply={supply})")]
    SupplyMismatch { sum: u128, supply: u128 },
    #[error("ledger stores an empty balance entry")]
    EmptyEntry,
}

/// Fungible claim-token ledger.
///
/// Invariant: `sum(balances) == total_supply`. Zero balances and zero allowances are pruned.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FixedPointLedger {
    balances: BTreeMap<PublicKey, u128>,
    allowances: BTreeMap<(PublicKey, PublicKey), u128>,
    total_supply: u128,
}

impl FixedPointLedger {
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, account: &PublicKey) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &PublicKey, spender: &PublicKey) -> u128 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn holders(&self) -> usize {
        self.balances.len()
    }

    pub fn mint(&mut self, to: &PublicKey, amount: u128) -> Result<(), SettlementError> {
        let supply = self.total_supply.add_or_overflow(amount)?;
        let balance = self.balance_of(to).add_or_overflow(amount)?;
        self.total_supply = supply;
        self.set_balance(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: &PublicKey, amount: u128) -> Result<(), SettlementError> {
        let balance = self.debit(from, amount)?;
        self.total_supply -= amount;
        self.set_balance(from, balance);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &PublicKey,
        to: &PublicKey,
        amount: u128,
    ) -> Result<(), SettlementError> {
        let from_balance = self.debit(from, amount)?;
        if from == to {
            return Ok(());
        }
        let to_balance = self.balance_of(to).add_or_overflow(amount)?;
        self.set_balance(from, from_balance);
        self.set_balance(to, to_balance);
        Ok(())
    }

    pub fn approve(&mut self, owner: &PublicKey, spender: &PublicKey, amount: u128) {
        let key = (owner.clone(), spender.clone());
        if amount == 0 {
            self.allowances.remove(&key);
        } else {
            self.allowances.insert(key, amount);
        }
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    pub fn transfer_from(
        &mut self,
        spender: &PublicKey,
        from: &PublicKey,
        to: &PublicKey,
        amount: u128,
    ) -> Result<(), SettlementError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(SettlementError::InsufficientAllowance {
                have: allowance,
                need: amount,
            });
        }
        self.transfer(from, to, amount)?;
        self.approve(from, spender, allowance - amount);
        Ok(())
    }

    pub fn validate_invariants(&self) -> Result<(), LedgerInvariantError> {
        if self.balances.values().any(|balance| *balance == 0) {
            return Err(LedgerInvariantError::EmptyEntry);
        }
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, balance| acc.checked_add(*balance));
        match sum {
            Some(sum) if sum == self.total_supply => Ok(()),
            Some(sum) => Err(LedgerInvariantError::SupplyMismatch {
                sum,
                supply: self.total_supply,
            }),
            None => Err(LedgerInvariantError::SupplyMismatch {
                sum: u128::MAX,
                supply: self.total_supply,
            }),
        }
    }

    fn debit(&self, from: &PublicKey, amount: u128) -> Result<u128, SettlementError> {
        let have = self.balance_of(from);
        have.checked_sub(amount)
            .ok_or(SettlementError::InsufficientBalance { have, need: amount })
    }

    fn set_balance(&mut self, account: &PublicKey, balance: u128) {
        if balance == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.clone(), balance);
        }
    }
}

impl Write for FixedPointLedger {
    fn write(&self, writer: &mut impl BufMut) {
        self.total_supply.write(writer);
        (self.balances.len() as u32).write(writer);
        for (account, balance) in &self.balances {
            account.write(writer);
            balance.write(writer);
        }
        (self.allowances.len() as u32).write(writer);
        for ((owner, spender), amount) in &self.allowances {
            owner.write(writer);
            spender.write(writer);
            amount.write(writer);
        }
    }
}

impl Read for FixedPointLedger {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let total_supply = u128::read(reader)?;

        let holders = read_len(reader, MAX_LEDGER_ACCOUNTS, "FixedPointLedger")?;
        let mut balances = BTreeMap::new();
        for _ in 0..holders {
            let account = PublicKey::read(reader)?;
            let balance = u128::read(reader)?;
            if balance == 0 {
                return Err(Error::Invalid("FixedPointLedger", "empty balance"));
            }
            if balances.insert(account, balance).is_some() {
                return Err(Error::Invalid("FixedPointLedger", "duplicate holder"));
            }
        }

        let grants = read_len(reader, MAX_LEDGER_ACCOUNTS, "FixedPointLedger")?;
        let mut allowances = BTreeMap::new();
        for _ in 0..grants {
            let owner = PublicKey::read(reader)?;
            let spender = PublicKey::read(reader)?;
            let amount = u128::read(reader)?;
            allowances.insert((owner, spender), amount);
        }

        let ledger = Self {
            balances,
            allowances,
            total_supply,
        };
        ledger
            .validate_invariants()
            .map_err(|_| Error::Invalid("FixedPointLedger", "supply mismatch"))?;
        Ok(ledger)
    }
}

impl EncodeSize for FixedPointLedger {
    fn encode_size(&self) -> usize {
        u128::SIZE
            + u32::SIZE
            + self.balances.len() * (PublicKey::SIZE + u128::SIZE)
            + u32::SIZE
            + self.allowances.len() * (2 * PublicKey::SIZE + u128::SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::account;
    use commonware_codec::{Encode, ReadExt};
    use proptest::prelude::*;

    #[test]
    fn mint_and_burn_track_supply() {
        let alice = account(1);
        let mut ledger = FixedPointLedger::default();
        ledger.mint(&alice, 500).unwrap();
        assert_eq!(ledger.total_supply(), 500);
        assert_eq!(ledger.balance_of(&alice), 500);

        ledger.burn(&alice, 500).unwrap();
        assert_eq!(ledger.total_supply(), 0);
        assert_eq!(ledger.balance_of(&alice), 0);
        assert_eq!(ledger.holders(), 0, "zero balances are pruned");
        ledger.validate_invariants().unwrap();
    }

    #[test]
    fn burn_more_than_balance_is_rejected_without_change() {
        let alice = account(1);
        let mut ledger = FixedPointLedger::default();
        ledger.mint(&alice, 10).unwrap();
        let before = ledger.clone();
        assert_eq!(
            ledger.burn(&alice, 11),
            Err(SettlementError::InsufficientBalance { have: 10, need: 11 })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn transfer_to_self_is_a_noop() {
        let alice = account(1);
        let mut ledger = FixedPointLedger::default();
        ledger.mint(&alice, 10).unwrap();
        ledger.transfer(&alice, &alice, 10).unwrap();
        assert_eq!(ledger.balance_of(&alice), 10);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let (alice, bob, carol) = (account(1), account(2), account(3));
        let mut ledger = FixedPointLedger::default();
        ledger.mint(&alice, 100).unwrap();
        ledger.approve(&alice, &bob, 60);

        assert_eq!(
            ledger.transfer_from(&bob, &alice, &carol, 61),
            Err(SettlementError::InsufficientAllowance { have: 60, need: 61 })
        );
        ledger.transfer_from(&bob, &alice, &carol, 40).unwrap();
        assert_eq!(ledger.allowance(&alice, &bob), 20);
        assert_eq!(ledger.balance_of(&carol), 40);
        assert_eq!(ledger.balance_of(&alice), 60);

        ledger.transfer_from(&bob, &alice, &carol, 20).unwrap();
        assert_eq!(ledger.allowance(&alice, &bob), 0);
        ledger.validate_invariants().unwrap();
    }

    #[test]
    fn decode_rejects_supply_mismatch() {
        let alice = account(1);
        let mut ledger = FixedPointLedger::default();
        ledger.mint(&alice, 10).unwrap();
        ledger.total_supply = 11;
        let encoded = ledger.encode();
        assert!(FixedPointLedger::read(&mut &encoded[..]).is_err());
    }

    #[test]
    fn encoding_round_trips() {
        let (alice, bob) = (account(1), account(2));
        let mut ledger = FixedPointLedger::default();
        ledger.mint(&alice, 7).unwrap();
        ledger.mint(&bob, 9).unwrap();
        ledger.approve(&alice, &bob, 3);
        let encoded = ledger.encode();
        assert_eq!(encoded.len(), ledger.encode_size());
        assert_eq!(FixedPointLedger::read(&mut &encoded[..]).unwrap(), ledger);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Mint(u8, u64),
        Burn(u8, u64),
        Transfer(u8, u8, u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4, any::<u64>()).prop_map(|(a, n)| Op::Mint(a, n)),
            (0u8..4, any::<u64>()).prop_map(|(a, n)| Op::Burn(a, n)),
            (0u8..4, 0u8..4, any::<u64>()).prop_map(|(a, b, n)| Op::Transfer(a, b, n)),
        ]
    }

    proptest! {
        #[test]
        fn supply_always_equals_sum_of_balances(ops in proptest::collection::vec(op(), 0..64)) {
            let accounts: Vec<_> = (0..4).map(account).collect();
            let mut ledger = FixedPointLedger::default();
            for op in ops {
                let _ = match op {
                    Op::Mint(a, n) => ledger.mint(&accounts[a as usize], n as u128),
                    Op::Burn(a, n) => ledger.burn(&accounts[a as usize], n as u128),
                    Op::Transfer(a, b, n) => {
                        ledger.transfer(&accounts[a as usize], &accounts[b as usize], n as u128)
                    }
                };
                prop_assert!(ledger.validate_invariants().is_ok());
            }
        }
    }
}

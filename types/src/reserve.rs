use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;

use crate::error::{CheckedAmount, SettlementError};
use crate::{PoolId, Principal, ReserveId};

/// Currency held 1:1 against the tokens issued by exactly one pool.
///
/// The pairing is fixed at construction. Anyone may deposit, but only the paired pool may
/// withdraw; the deployer has no special authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reserve {
    pub id: ReserveId,
    backed_pool: PoolId,
    pub deployer: PublicKey,
    balance: u128,
}

impl Reserve {
    pub fn new(id: ReserveId, backed_pool: PoolId, deployer: PublicKey) -> Self {
        Self {
            id,
            backed_pool,
            deployer,
            balance: 0,
        }
    }

    pub fn backed_pool(&self) -> PoolId {
        self.backed_pool
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn deposit(&mut self, amount: u128) -> Result<u128, SettlementError> {
        self.balance = self.balance.add_or_overflow(amount)?;
        Ok(self.balance)
    }

    /// Releases `amount` to the caller's recipient and returns the remaining balance.
    ///
    /// The balance is decremented here, before the caller credits anyone, so a reentrant read
    /// already observes the reduced balance.
    pub fn withdraw(&mut self, caller: &Principal, amount: u128) -> Result<u128, SettlementError> {
        if *caller != Principal::Pool(self.backed_pool) {
            return Err(SettlementError::Unauthorized);
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(SettlementError::InsufficientReserve {
                available: self.balance,
                need: amount,
            })?;
        Ok(self.balance)
    }
}

impl Write for Reserve {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.backed_pool.write(writer);
        self.deployer.write(writer);
        self.balance.write(writer);
    }
}

impl Read for Reserve {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: ReserveId::read(reader)?,
            backed_pool: PoolId::read(reader)?,
            deployer: PublicKey::read(reader)?,
            balance: u128::read(reader)?,
        })
    }
}

impl EncodeSize for Reserve {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.backed_pool.encode_size()
            + self.deployer.encode_size()
            + self.balance.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::account;

    #[test]
    fn only_paired_pool_can_withdraw() {
        let deployer = account(1);
        let mut reserve = Reserve::new(9, 4, deployer.clone());
        reserve.deposit(100).unwrap();

        for caller in [
            Principal::Account(deployer),
            Principal::Account(account(2)),
            Principal::Pool(5),
            Principal::Reserve(9),
        ] {
            assert_eq!(
                reserve.withdraw(&caller, 1),
                Err(SettlementError::Unauthorized)
            );
        }
        assert_eq!(reserve.balance(), 100);

        assert_eq!(reserve.withdraw(&Principal::Pool(4), 40), Ok(60));
        assert_eq!(reserve.balance(), 60);
    }

    #[test]
    fn withdraw_cannot_overdraw() {
        let mut reserve = Reserve::new(0, 0, account(1));
        reserve.deposit(10).unwrap();
        assert_eq!(
            reserve.withdraw(&Principal::Pool(0), 11),
            Err(SettlementError::InsufficientReserve {
                available: 10,
                need: 11
            })
        );
        assert_eq!(reserve.balance(), 10);
    }
}

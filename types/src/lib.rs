//! Common types used throughout roscoin: the claim-token ledger, the pool/reserve pair, wager
//! state and the transaction envelope that drives them.

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod ledger;
pub mod math;
pub mod pool;
pub mod reserve;
pub mod wager;

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;

pub use config::{ConfigError, SettlementConfig};
pub use error::SettlementError;
pub use execution::{
    transaction_namespace, Account, Event, Instruction, Key, Output, Registry, Transaction, Value,
    NAMESPACE,
};
pub use ledger::{FixedPointLedger, LedgerInvariantError};
pub use math::mul_div_floor;
pub use pool::{token_price, BuyQuote, LiquidityPool, SellQuote};
pub use reserve::Reserve;
pub use wager::{FeeSchedule, Slot, Wager, WagerEngine, WagerStatus};

pub type PoolId = u64;
pub type ReserveId = u64;
pub type RequestId = u64;

/// Identity on whose behalf a privileged operation is attempted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Principal {
    Account(PublicKey),
    Pool(PoolId),
    Reserve(ReserveId),
}

impl Write for Principal {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(public) => {
                0u8.write(writer);
                public.write(writer);
            }
            Self::Pool(id) => {
                1u8.write(writer);
                id.write(writer);
            }
            Self::Reserve(id) => {
                2u8.write(writer);
                id.write(writer);
            }
        }
    }
}

impl Read for Principal {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Account(PublicKey::read(reader)?)),
            1 => Ok(Self::Pool(PoolId::read(reader)?)),
            2 => Ok(Self::Reserve(ReserveId::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Principal {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(_) => PublicKey::SIZE,
                Self::Pool(_) => PoolId::SIZE,
                Self::Reserve(_) => ReserveId::SIZE,
            }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use commonware_cryptography::{
        ed25519::{PrivateKey, PublicKey},
        Signer as _,
    };

    pub fn account(seed: u64) -> PublicKey {
        PrivateKey::from_seed(seed).public_key()
    }
}

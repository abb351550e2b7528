//! Settlement parameters shared by the execution layer and the simulator.

use commonware_cryptography::ed25519::PublicKey;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::constants::{
    DEFAULT_FEE_STEP, DEFAULT_INITIAL_TOKEN_PRICE, DEFAULT_MAX_BET_DIVISOR, PAYOUT_MULTIPLIER,
};
use crate::wager::FeeSchedule;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ConfigError {
    #[error("fee_step must be positive so concurrent bets pay strictly more")]
    ZeroFeeStep,
    #[error("max_bet_divisor must be at least {min} (got {got})")]
    DivisorTooSmall { got: u128, min: u128 },
    #[error("initial_token_price must be positive")]
    ZeroInitialPrice,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Only this account may deliver randomness.
    #[serde(with = "serde_public_key_hex")]
    pub oracle: PublicKey,
    #[serde(default = "default_fee_step")]
    pub fee_step: u128,
    /// `maxBet = free reserve / max_bet_divisor`.
    #[serde(default = "default_max_bet_divisor")]
    pub max_bet_divisor: u128,
    #[serde(default = "default_initial_token_price")]
    pub initial_token_price: u128,
}

fn default_fee_step() -> u128 {
    DEFAULT_FEE_STEP
}

fn default_max_bet_divisor() -> u128 {
    DEFAULT_MAX_BET_DIVISOR
}

fn default_initial_token_price() -> u128 {
    DEFAULT_INITIAL_TOKEN_PRICE
}

impl SettlementConfig {
    pub fn new(oracle: PublicKey) -> Self {
        Self {
            oracle,
            fee_step: DEFAULT_FEE_STEP,
            max_bet_divisor: DEFAULT_MAX_BET_DIVISOR,
            initial_token_price: DEFAULT_INITIAL_TOKEN_PRICE,
        }
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            step: self.fee_step,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_step == 0 {
            return Err(ConfigError::ZeroFeeStep);
        }
        // A divisor below the payout multiple would let one winning bet exceed the free reserve.
        if self.max_bet_divisor < PAYOUT_MULTIPLIER {
            return Err(ConfigError::DivisorTooSmall {
                got: self.max_bet_divisor,
                min: PAYOUT_MULTIPLIER,
            });
        }
        if self.initial_token_price == 0 {
            return Err(ConfigError::ZeroInitialPrice);
        }
        Ok(())
    }
}

mod serde_public_key_hex {
    use commonware_codec::ReadExt;
    use commonware_cryptography::ed25519::PublicKey;
    use commonware_utils::{from_hex, hex};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(public_key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex(public_key.as_ref()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PublicKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = from_hex(&s).ok_or_else(|| serde::de::Error::custom("invalid hex string"))?;
        let mut reader = bytes.as_slice();
        PublicKey::read(&mut reader).map_err(|_| serde::de::Error::custom("invalid public key"))
    }
}

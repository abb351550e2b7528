use thiserror::Error as ThisError;

use crate::constants::*;
use crate::{PoolId, ReserveId};

/// Caller-visible rejection of a settlement operation.
///
/// Every variant is recoverable: the rejected call leaves no partial state behind and the caller
/// may resubmit with corrected parameters.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum SettlementError {
    #[error("caller lacks the required privilege")]
    Unauthorized,
    #[error("pool {pool} is already backed by reserve {reserve}")]
    AlreadyBacked { pool: PoolId, reserve: ReserveId },
    #[error("insufficient token balance (have={have}, need={need})")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("bet exceeds max bet (value={value}, max={max})")]
    BetTooLarge { value: u128, max: u128 },
    #[error("bet does not exceed the request fee (value={value}, fee={fee})")]
    BetTooSmall { value: u128, fee: u128 },
    #[error("wager engine is paused")]
    Paused,
    #[error("value must be greater than zero")]
    InsufficientValue,
    #[error("insufficient allowance (have={have}, need={need})")]
    InsufficientAllowance { have: u128, need: u128 },
    #[error("insufficient wallet funds (have={have}, need={need})")]
    InsufficientFunds { have: u128, need: u128 },
    #[error("insufficient free reserve (available={available}, need={need})")]
    InsufficientReserve { available: u128, need: u128 },
    #[error("slot {0} is not on the wheel")]
    InvalidSlot(u8),
    #[error("pool {0} has no reserve")]
    ReserveNotPaired(PoolId),
    #[error("pool {0} does not exist")]
    UnknownPool(PoolId),
    #[error("reserve {0} does not exist")]
    UnknownReserve(ReserveId),
    #[error("wager engine is not initialized")]
    EngineNotInitialized,
    #[error("wager engine is already initialized")]
    EngineAlreadyInitialized,
    #[error("arithmetic overflow")]
    Overflow,
}

impl SettlementError {
    /// Stable numeric code carried by `Rejected` events.
    pub fn code(&self) -> u8 {
        match self {
            Self::Unauthorized => ERROR_UNAUTHORIZED,
            Self::AlreadyBacked { .. } => ERROR_ALREADY_BACKED,
            Self::InsufficientBalance { .. } => ERROR_INSUFFICIENT_BALANCE,
            Self::BetTooLarge { .. } => ERROR_BET_TOO_LARGE,
            Self::BetTooSmall { .. } => ERROR_BET_TOO_SMALL,
            Self::Paused => ERROR_PAUSED,
            Self::InsufficientValue => ERROR_INSUFFICIENT_VALUE,
            Self::InsufficientAllowance { .. } => ERROR_INSUFFICIENT_ALLOWANCE,
            Self::InsufficientFunds { .. } => ERROR_INSUFFICIENT_FUNDS,
            Self::InsufficientReserve { .. } => ERROR_INSUFFICIENT_RESERVE,
            Self::InvalidSlot(_) => ERROR_INVALID_SLOT,
            Self::ReserveNotPaired(_) => ERROR_RESERVE_NOT_PAIRED,
            Self::UnknownPool(_) => ERROR_UNKNOWN_POOL,
            Self::UnknownReserve(_) => ERROR_UNKNOWN_RESERVE,
            Self::EngineNotInitialized => ERROR_ENGINE_NOT_INITIALIZED,
            Self::EngineAlreadyInitialized => ERROR_ENGINE_ALREADY_INITIALIZED,
            Self::Overflow => ERROR_OVERFLOW,
        }
    }
}

/// Checked arithmetic helpers that turn overflow into a rejection.
pub trait CheckedAmount: Sized {
    fn add_or_overflow(self, rhs: Self) -> Result<Self, SettlementError>;
    fn mul_or_overflow(self, rhs: Self) -> Result<Self, SettlementError>;
}

impl CheckedAmount for u128 {
    fn add_or_overflow(self, rhs: Self) -> Result<Self, SettlementError> {
        self.checked_add(rhs).ok_or(SettlementError::Overflow)
    }

    fn mul_or_overflow(self, rhs: Self) -> Result<Self, SettlementError> {
        self.checked_mul(rhs).ok_or(SettlementError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            SettlementError::Unauthorized,
            SettlementError::AlreadyBacked { pool: 0, reserve: 0 },
            SettlementError::InsufficientBalance { have: 0, need: 1 },
            SettlementError::BetTooLarge { value: 2, max: 1 },
            SettlementError::BetTooSmall { value: 1, fee: 1 },
            SettlementError::Paused,
            SettlementError::InsufficientValue,
            SettlementError::InsufficientAllowance { have: 0, need: 1 },
            SettlementError::InsufficientFunds { have: 0, need: 1 },
            SettlementError::InsufficientReserve { available: 0, need: 1 },
            SettlementError::InvalidSlot(37),
            SettlementError::ReserveNotPaired(0),
            SettlementError::UnknownPool(0),
            SettlementError::UnknownReserve(0),
            SettlementError::EngineNotInitialized,
            SettlementError::EngineAlreadyInitialized,
            SettlementError::Overflow,
        ];
        let mut codes: Vec<u8> = errors.iter().map(SettlementError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn overflow_is_a_rejection() {
        assert_eq!(u128::MAX.add_or_overflow(1), Err(SettlementError::Overflow));
        assert_eq!(u128::MAX.mul_or_overflow(2), Err(SettlementError::Overflow));
        assert_eq!(2u128.mul_or_overflow(3), Ok(6));
    }
}

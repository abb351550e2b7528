//! Wager engine state: pending requests, fee escalation and solvency-bounded stakes.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;

use crate::constants::{MAX_SLOT, PAYOUT_MULTIPLIER, SLOT_COUNT};
use crate::error::{CheckedAmount, SettlementError};
use crate::{PoolId, RequestId};

/// One of the 37 equiprobable wheel outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u8);

impl Slot {
    pub fn new(number: u8) -> Result<Self, SettlementError> {
        if number > MAX_SLOT {
            return Err(SettlementError::InvalidSlot(number));
        }
        Ok(Self(number))
    }

    /// Maps an oracle-supplied random number onto the wheel.
    pub fn from_random(random_number: u64) -> Self {
        Self((random_number % SLOT_COUNT as u64) as u8)
    }

    pub fn number(&self) -> u8 {
        self.0
    }
}

impl Write for Slot {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.write(writer);
    }
}

impl Read for Slot {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Self::new(u8::read(reader)?).map_err(|_| Error::Invalid("Slot", "off the wheel"))
    }
}

impl FixedSize for Slot {
    const SIZE: usize = u8::SIZE;
}

/// Fee charged for a new randomness request given how many are already outstanding.
///
/// The first outstanding request is subsidized by the house; each further concurrent request
/// costs one more `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSchedule {
    pub step: u128,
}

impl FeeSchedule {
    pub fn fee(&self, pending_request_count: u64) -> Result<u128, SettlementError> {
        self.step.mul_or_overflow(pending_request_count as u128)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WagerStatus {
    Pending,
    Resolved { winning_number: Slot },
}

/// A single accepted bet, keyed by the randomness request that will resolve it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wager {
    pub id: RequestId,
    pub player: PublicKey,
    pub bet_number: Slot,
    /// Net stake after the request fee.
    pub bet_size: u128,
    pub status: WagerStatus,
}

impl Wager {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, WagerStatus::Pending)
    }

    /// Worst-case amount the reserve owes if this wager wins.
    pub fn liability(&self) -> Result<u128, SettlementError> {
        self.bet_size.mul_or_overflow(PAYOUT_MULTIPLIER)
    }

    pub fn won(&self) -> bool {
        match self.status {
            WagerStatus::Resolved { winning_number } => winning_number == self.bet_number,
            WagerStatus::Pending => false,
        }
    }
}

impl Write for Wager {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.player.write(writer);
        self.bet_number.write(writer);
        self.bet_size.write(writer);
        match self.status {
            WagerStatus::Pending => 0u8.write(writer),
            WagerStatus::Resolved { winning_number } => {
                1u8.write(writer);
                winning_number.write(writer);
            }
        }
    }
}

impl Read for Wager {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let id = RequestId::read(reader)?;
        let player = PublicKey::read(reader)?;
        let bet_number = Slot::read(reader)?;
        let bet_size = u128::read(reader)?;
        let status = match u8::read(reader)? {
            0 => WagerStatus::Pending,
            1 => WagerStatus::Resolved {
                winning_number: Slot::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(Self {
            id,
            player,
            bet_number,
            bet_size,
            status,
        })
    }
}

impl EncodeSize for Wager {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.player.encode_size()
            + Slot::SIZE
            + self.bet_size.encode_size()
            + match self.status {
                WagerStatus::Pending => 1,
                WagerStatus::Resolved { .. } => 1 + Slot::SIZE,
            }
    }
}

/// Engine-wide state: owner, pause flag and the outstanding-request accumulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WagerEngine {
    pub owner: PublicKey,
    /// Pool whose reserve banks every wager.
    pub pool: PoolId,
    pub paused: bool,
    pub pending_request_count: u64,
    pub next_request_id: RequestId,
    /// Sum of worst-case payouts of all pending wagers.
    pub locked_liability: u128,
}

impl WagerEngine {
    pub fn new(owner: PublicKey, pool: PoolId) -> Self {
        Self {
            owner,
            pool,
            paused: false,
            pending_request_count: 0,
            next_request_id: 0,
            locked_liability: 0,
        }
    }

    /// Reserve balance not already promised to pending wagers.
    pub fn free_reserve(&self, reserve_balance: u128) -> u128 {
        reserve_balance.saturating_sub(self.locked_liability)
    }

    pub fn max_bet(&self, reserve_balance: u128, max_bet_divisor: u128) -> u128 {
        self.free_reserve(reserve_balance) / max_bet_divisor.max(1)
    }

    pub fn ensure_owner(&self, caller: &PublicKey) -> Result<(), SettlementError> {
        if *caller != self.owner {
            return Err(SettlementError::Unauthorized);
        }
        Ok(())
    }

    /// Registers a new pending wager and returns its request id.
    pub fn open(&mut self, liability: u128) -> Result<RequestId, SettlementError> {
        let id = self.next_request_id;
        self.next_request_id = id.checked_add(1).ok_or(SettlementError::Overflow)?;
        self.pending_request_count = self
            .pending_request_count
            .checked_add(1)
            .ok_or(SettlementError::Overflow)?;
        self.locked_liability = self.locked_liability.add_or_overflow(liability)?;
        Ok(id)
    }

    /// Releases the bookkeeping of a resolved wager.
    ///
    /// Fails without touching the engine if no request is outstanding or `liability` exceeds what
    /// is locked.
    pub fn close(&mut self, liability: u128) -> Result<(), SettlementError> {
        let pending_request_count = self
            .pending_request_count
            .checked_sub(1)
            .ok_or(SettlementError::Overflow)?;
        let locked_liability = self
            .locked_liability
            .checked_sub(liability)
            .ok_or(SettlementError::Overflow)?;
        self.pending_request_count = pending_request_count;
        self.locked_liability = locked_liability;
        Ok(())
    }
}

impl Write for WagerEngine {
    fn write(&self, writer: &mut impl BufMut) {
        self.owner.write(writer);
        self.pool.write(writer);
        self.paused.write(writer);
        self.pending_request_count.write(writer);
        self.next_request_id.write(writer);
        self.locked_liability.write(writer);
    }
}

impl Read for WagerEngine {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            owner: PublicKey::read(reader)?,
            pool: PoolId::read(reader)?,
            paused: bool::read(reader)?,
            pending_request_count: u64::read(reader)?,
            next_request_id: RequestId::read(reader)?,
            locked_liability: u128::read(reader)?,
        })
    }
}

impl EncodeSize for WagerEngine {
    fn encode_size(&self) -> usize {
        self.owner.encode_size()
            + self.pool.encode_size()
            + self.paused.encode_size()
            + self.pending_request_count.encode_size()
            + self.next_request_id.encode_size()
            + self.locked_liability.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ONE;
    use crate::test_support::account;

    #[test]
    fn slot_rejects_numbers_off_the_wheel() {
        assert!(Slot::new(0).is_ok());
        assert!(Slot::new(36).is_ok());
        assert_eq!(Slot::new(37), Err(SettlementError::InvalidSlot(37)));
    }

    #[test]
    fn random_numbers_map_modulo_37() {
        assert_eq!(Slot::from_random(0).number(), 0);
        assert_eq!(Slot::from_random(37).number(), 0);
        assert_eq!(Slot::from_random(38).number(), 1);
        assert_eq!(Slot::from_random(u64::MAX).number(), (u64::MAX % 37) as u8);
    }

    #[test]
    fn fee_escalates_with_outstanding_requests() {
        let schedule = FeeSchedule { step: 5 };
        assert_eq!(schedule.fee(0), Ok(0));
        let fees: Vec<u128> = (0..5).map(|n| schedule.fee(n).unwrap()).collect();
        assert!(fees.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn max_bet_excludes_locked_liability() {
        let mut engine = WagerEngine::new(account(1), 0);
        assert_eq!(engine.max_bet(100 * ONE, 100), ONE);

        engine.open(36 * ONE).unwrap();
        assert_eq!(engine.free_reserve(100 * ONE), 64 * ONE);
        assert_eq!(engine.max_bet(100 * ONE, 100), 64 * ONE / 100);

        engine.close(36 * ONE).unwrap();
        assert_eq!(engine.pending_request_count, 0);
        assert_eq!(engine.max_bet(100 * ONE, 100), ONE);
    }

    #[test]
    fn request_ids_are_never_reused() {
        let mut engine = WagerEngine::new(account(1), 0);
        let first = engine.open(0).unwrap();
        engine.close(0).unwrap();
        let second = engine.open(0).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn closing_more_than_was_opened_is_rejected() {
        let mut engine = WagerEngine::new(account(1), 0);
        assert_eq!(engine.close(0), Err(SettlementError::Overflow));

        engine.open(36 * ONE).unwrap();
        let before = engine.clone();
        assert_eq!(engine.close(72 * ONE), Err(SettlementError::Overflow));
        assert_eq!(engine, before);

        engine.close(36 * ONE).unwrap();
        assert_eq!(engine.locked_liability, 0);
        assert_eq!(engine.close(0), Err(SettlementError::Overflow));
    }

    #[test]
    fn resolved_wager_reports_outcome() {
        let mut wager = Wager {
            id: 0,
            player: account(2),
            bet_number: Slot::new(7).unwrap(),
            bet_size: 10,
            status: WagerStatus::Pending,
        };
        assert!(wager.is_pending());
        assert!(!wager.won());
        assert_eq!(wager.liability(), Ok(360));

        wager.status = WagerStatus::Resolved {
            winning_number: Slot::new(7).unwrap(),
        };
        assert!(!wager.is_pending());
        assert!(wager.won());
    }
}

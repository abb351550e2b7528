use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::{
    ed25519::{self, PublicKey},
    Signer, Verifier,
};
use commonware_utils::union;

use crate::codec::{read_string, string_encode_size, write_string};
use crate::constants::MAX_MESSAGE_LENGTH;
use crate::pool::LiquidityPool;
use crate::reserve::Reserve;
use crate::wager::{Slot, Wager, WagerEngine};
use crate::{PoolId, RequestId, ReserveId};

pub const NAMESPACE: &[u8] = b"_ROSCOIN";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub instruction: Instruction,

    pub public: ed25519::PublicKey,
    pub signature: ed25519::Signature,
}

impl Transaction {
    fn payload(nonce: &u64, instruction: &Instruction) -> Vec<u8> {
        let mut payload = Vec::new();
        nonce.write(&mut payload);
        instruction.write(&mut payload);

        payload
    }

    pub fn sign(private: &ed25519::PrivateKey, nonce: u64, instruction: Instruction) -> Self {
        let signature = private.sign(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&nonce, &instruction),
        );

        Self {
            nonce,
            instruction,
            public: private.public_key(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        self.public.verify(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&self.nonce, &self.instruction),
            &self.signature,
        )
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.instruction.write(writer);
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let nonce = u64::read(reader)?;
        let instruction = Instruction::read(reader)?;
        let public = ed25519::PublicKey::read(reader)?;
        let signature = ed25519::Signature::read(reader)?;

        Ok(Self {
            nonce,
            instruction,
            public,
            signature,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
            + self.instruction.encode_size()
            + self.public.encode_size()
            + self.signature.encode_size()
    }
}

/// Operations a signed transaction may carry.
///
/// Amounts are 18-decimal fixed point. The signer is the caller of every instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    // Wallet (tag 0)
    /// Credit currency attached by the host to the signer's wallet.
    ///
    /// Models value arriving from outside the system: the credit is minted, not moved, so it is
    /// not a conserved path. Conservation holds between wallets, reserves and payouts once funds
    /// are in.
    Fund { amount: u128 },

    // Pool & reserve (tags 1-7)
    CreatePool,
    /// Deploy a reserve for `pool` and perform the backing handshake.
    CreateReserve { pool: PoolId },
    /// Attempt the backing handshake as a plain account. Always rejected.
    BackPool { pool: PoolId },
    /// Send currency to a reserve without minting.
    Donate { reserve: ReserveId, amount: u128 },
    /// Attempt a reserve withdrawal as a plain account. Always rejected.
    Withdraw { reserve: ReserveId, amount: u128 },
    Buy { pool: PoolId, amount: u128 },
    Sell { pool: PoolId, tokens: u128 },

    // Claim-token ledger (tags 8-10)
    Transfer {
        pool: PoolId,
        to: PublicKey,
        amount: u128,
    },
    Approve {
        pool: PoolId,
        spender: PublicKey,
        amount: u128,
    },
    TransferFrom {
        pool: PoolId,
        from: PublicKey,
        to: PublicKey,
        amount: u128,
    },

    // Wager engine (tags 11-17)
    InitEngine { pool: PoolId },
    /// `number` is validated by the engine so an off-wheel slot is a rejection, not a decode error.
    Bet { number: u8, value: u128 },
    ResolveRandomness {
        request_id: RequestId,
        random_number: u64,
    },
    Invest { amount: u128 },
    Divest { tokens: u128 },
    Pause,
    Unpause,
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Fund { amount } => {
                0u8.write(writer);
                amount.write(writer);
            }
            Self::CreatePool => 1u8.write(writer),
            Self::CreateReserve { pool } => {
                2u8.write(writer);
                pool.write(writer);
            }
            Self::BackPool { pool } => {
                3u8.write(writer);
                pool.write(writer);
            }
            Self::Donate { reserve, amount } => {
                4u8.write(writer);
                reserve.write(writer);
                amount.write(writer);
            }
            Self::Withdraw { reserve, amount } => {
                5u8.write(writer);
                reserve.write(writer);
                amount.write(writer);
            }
            Self::Buy { pool, amount } => {
                6u8.write(writer);
                pool.write(writer);
                amount.write(writer);
            }
            Self::Sell { pool, tokens } => {
                7u8.write(writer);
                pool.write(writer);
                tokens.write(writer);
            }
            Self::Transfer { pool, to, amount } => {
                8u8.write(writer);
                pool.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::Approve {
                pool,
                spender,
                amount,
            } => {
                9u8.write(writer);
                pool.write(writer);
                spender.write(writer);
                amount.write(writer);
            }
            Self::TransferFrom {
                pool,
                from,
                to,
                amount,
            } => {
                10u8.write(writer);
                pool.write(writer);
                from.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::InitEngine { pool } => {
                11u8.write(writer);
                pool.write(writer);
            }
            Self::Bet { number, value } => {
                12u8.write(writer);
                number.write(writer);
                value.write(writer);
            }
            Self::ResolveRandomness {
                request_id,
                random_number,
            } => {
                13u8.write(writer);
                request_id.write(writer);
                random_number.write(writer);
            }
            Self::Invest { amount } => {
                14u8.write(writer);
                amount.write(writer);
            }
            Self::Divest { tokens } => {
                15u8.write(writer);
                tokens.write(writer);
            }
            Self::Pause => 16u8.write(writer),
            Self::Unpause => 17u8.write(writer),
        }
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let instruction = match u8::read(reader)? {
            0 => Self::Fund {
                amount: u128::read(reader)?,
            },
            1 => Self::CreatePool,
            2 => Self::CreateReserve {
                pool: PoolId::read(reader)?,
            },
            3 => Self::BackPool {
                pool: PoolId::read(reader)?,
            },
            4 => Self::Donate {
                reserve: ReserveId::read(reader)?,
                amount: u128::read(reader)?,
            },
            5 => Self::Withdraw {
                reserve: ReserveId::read(reader)?,
                amount: u128::read(reader)?,
            },
            6 => Self::Buy {
                pool: PoolId::read(reader)?,
                amount: u128::read(reader)?,
            },
            7 => Self::Sell {
                pool: PoolId::read(reader)?,
                tokens: u128::read(reader)?,
            },
            8 => Self::Transfer {
                pool: PoolId::read(reader)?,
                to: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            9 => Self::Approve {
                pool: PoolId::read(reader)?,
                spender: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            10 => Self::TransferFrom {
                pool: PoolId::read(reader)?,
                from: PublicKey::read(reader)?,
                to: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            11 => Self::InitEngine {
                pool: PoolId::read(reader)?,
            },
            12 => Self::Bet {
                number: u8::read(reader)?,
                value: u128::read(reader)?,
            },
            13 => Self::ResolveRandomness {
                request_id: RequestId::read(reader)?,
                random_number: u64::read(reader)?,
            },
            14 => Self::Invest {
                amount: u128::read(reader)?,
            },
            15 => Self::Divest {
                tokens: u128::read(reader)?,
            },
            16 => Self::Pause,
            17 => Self::Unpause,
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(instruction)
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Fund { .. } | Self::Invest { .. } | Self::Divest { .. } => u128::SIZE,
                Self::CreatePool | Self::Pause | Self::Unpause => 0,
                Self::CreateReserve { .. } | Self::BackPool { .. } | Self::InitEngine { .. } => {
                    PoolId::SIZE
                }
                Self::Donate { .. } | Self::Withdraw { .. } => ReserveId::SIZE + u128::SIZE,
                Self::Buy { .. } | Self::Sell { .. } => PoolId::SIZE + u128::SIZE,
                Self::Transfer { .. } | Self::Approve { .. } => {
                    PoolId::SIZE + PublicKey::SIZE + u128::SIZE
                }
                Self::TransferFrom { .. } => PoolId::SIZE + 2 * PublicKey::SIZE + u128::SIZE,
                Self::Bet { .. } => u8::SIZE + u128::SIZE,
                Self::ResolveRandomness { .. } => RequestId::SIZE + u64::SIZE,
            }
    }
}

/// Minimal account structure for transaction nonce tracking.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Account {
    pub nonce: u64,
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Account {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
    }
}

/// Id allocator for pools and reserves. Ids are never reused.
#[derive(Clone, Copy, Default, Eq, PartialEq, Debug)]
pub struct Registry {
    pub next_pool: PoolId,
    pub next_reserve: ReserveId,
}

impl Write for Registry {
    fn write(&self, writer: &mut impl BufMut) {
        self.next_pool.write(writer);
        self.next_reserve.write(writer);
    }
}

impl Read for Registry {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            next_pool: PoolId::read(reader)?,
            next_reserve: ReserveId::read(reader)?,
        })
    }
}

impl FixedSize for Registry {
    const SIZE: usize = PoolId::SIZE + ReserveId::SIZE;
}

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    /// Account for nonce tracking (tag 0)
    Account(PublicKey),
    /// Reserve-currency wallet (tag 1)
    Wallet(PublicKey),

    // Settlement keys (tags 2-6)
    Registry,
    Pool(PoolId),
    Reserve(ReserveId),
    Engine,
    Wager(RequestId),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(pk) => {
                0u8.write(writer);
                pk.write(writer);
            }
            Self::Wallet(pk) => {
                1u8.write(writer);
                pk.write(writer);
            }
            Self::Registry => 2u8.write(writer),
            Self::Pool(id) => {
                3u8.write(writer);
                id.write(writer);
            }
            Self::Reserve(id) => {
                4u8.write(writer);
                id.write(writer);
            }
            Self::Engine => 5u8.write(writer),
            Self::Wager(id) => {
                6u8.write(writer);
                id.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Account(PublicKey::read(reader)?),
            1 => Self::Wallet(PublicKey::read(reader)?),
            2 => Self::Registry,
            3 => Self::Pool(PoolId::read(reader)?),
            4 => Self::Reserve(ReserveId::read(reader)?),
            5 => Self::Engine,
            6 => Self::Wager(RequestId::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(_) | Self::Wallet(_) => PublicKey::SIZE,
                Self::Registry | Self::Engine => 0,
                Self::Pool(_) => PoolId::SIZE,
                Self::Reserve(_) => ReserveId::SIZE,
                Self::Wager(_) => RequestId::SIZE,
            }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    Account(Account),
    Wallet(u128),
    Registry(Registry),
    Pool(LiquidityPool),
    Reserve(Reserve),
    Engine(WagerEngine),
    Wager(Wager),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
            Self::Wallet(balance) => {
                1u8.write(writer);
                balance.write(writer);
            }
            Self::Registry(registry) => {
                2u8.write(writer);
                registry.write(writer);
            }
            Self::Pool(pool) => {
                3u8.write(writer);
                pool.write(writer);
            }
            Self::Reserve(reserve) => {
                4u8.write(writer);
                reserve.write(writer);
            }
            Self::Engine(engine) => {
                5u8.write(writer);
                engine.write(writer);
            }
            Self::Wager(wager) => {
                6u8.write(writer);
                wager.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Account(Account::read(reader)?),
            1 => Self::Wallet(u128::read(reader)?),
            2 => Self::Registry(Registry::read(reader)?),
            3 => Self::Pool(LiquidityPool::read(reader)?),
            4 => Self::Reserve(Reserve::read(reader)?),
            5 => Self::Engine(WagerEngine::read(reader)?),
            6 => Self::Wager(Wager::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(account) => account.encode_size(),
                Self::Wallet(balance) => balance.encode_size(),
                Self::Registry(registry) => registry.encode_size(),
                Self::Pool(pool) => pool.encode_size(),
                Self::Reserve(reserve) => reserve.encode_size(),
                Self::Engine(engine) => engine.encode_size(),
                Self::Wager(wager) => wager.encode_size(),
            }
    }
}

/// Observable outcome of an accepted (or rejected) instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Funded {
        account: PublicKey,
        amount: u128,
        balance: u128,
    },
    PoolCreated {
        pool: PoolId,
        creator: PublicKey,
    },
    ReserveBacked {
        pool: PoolId,
        reserve: ReserveId,
        deployer: PublicKey,
    },
    Donation {
        reserve: ReserveId,
        from: PublicKey,
        amount: u128,
    },
    Buy {
        pool: PoolId,
        buyer: PublicKey,
        currency_amount: u128,
        token_price: u128,
        token_amount: u128,
    },
    Sell {
        pool: PoolId,
        seller: PublicKey,
        currency_amount: u128,
        token_price: u128,
        token_amount: u128,
    },
    Transfer {
        pool: PoolId,
        from: PublicKey,
        to: PublicKey,
        amount: u128,
    },
    Approval {
        pool: PoolId,
        owner: PublicKey,
        spender: PublicKey,
        amount: u128,
    },
    EngineInitialized {
        owner: PublicKey,
        pool: PoolId,
    },
    Bet {
        request_id: RequestId,
        player: PublicKey,
        bet_number: Slot,
        /// Net stake after the request fee.
        bet_size: u128,
    },
    RandomnessRequested {
        request_id: RequestId,
        fee: u128,
    },
    Play {
        request_id: RequestId,
        player: PublicKey,
        bet_number: Slot,
        winning_number: Slot,
    },
    Payout {
        request_id: RequestId,
        winner: PublicKey,
        payout: u128,
    },
    Invest {
        investor: PublicKey,
        currency_amount: u128,
        token_price: u128,
        token_amount: u128,
    },
    Divest {
        investor: PublicKey,
        currency_amount: u128,
        token_price: u128,
        token_amount: u128,
    },
    Paused {
        by: PublicKey,
    },
    Unpaused {
        by: PublicKey,
    },
    /// An instruction was rejected; no state changed.
    Rejected {
        account: PublicKey,
        code: u8,
        message: String,
    },
}

/// Writes the shared Buy/Sell/Invest/Divest trade fields.
fn write_trade(
    currency_amount: &u128,
    token_price: &u128,
    token_amount: &u128,
    writer: &mut impl BufMut,
) {
    currency_amount.write(writer);
    token_price.write(writer);
    token_amount.write(writer);
}

fn read_trade(reader: &mut impl Buf) -> Result<(u128, u128, u128), Error> {
    Ok((
        u128::read(reader)?,
        u128::read(reader)?,
        u128::read(reader)?,
    ))
}

const TRADE_SIZE: usize = 3 * u128::SIZE;

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Funded {
                account,
                amount,
                balance,
            } => {
                0u8.write(writer);
                account.write(writer);
                amount.write(writer);
                balance.write(writer);
            }
            Self::PoolCreated { pool, creator } => {
                1u8.write(writer);
                pool.write(writer);
                creator.write(writer);
            }
            Self::ReserveBacked {
                pool,
                reserve,
                deployer,
            } => {
                2u8.write(writer);
                pool.write(writer);
                reserve.write(writer);
                deployer.write(writer);
            }
            Self::Donation {
                reserve,
                from,
                amount,
            } => {
                3u8.write(writer);
                reserve.write(writer);
                from.write(writer);
                amount.write(writer);
            }
            Self::Buy {
                pool,
                buyer,
                currency_amount,
                token_price,
                token_amount,
            } => {
                4u8.write(writer);
                pool.write(writer);
                buyer.write(writer);
                write_trade(currency_amount, token_price, token_amount, writer);
            }
            Self::Sell {
                pool,
                seller,
                currency_amount,
                token_price,
                token_amount,
            } => {
                5u8.write(writer);
                pool.write(writer);
                seller.write(writer);
                write_trade(currency_amount, token_price, token_amount, writer);
            }
            Self::Transfer {
                pool,
                from,
                to,
                amount,
            } => {
                6u8.write(writer);
                pool.write(writer);
                from.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::Approval {
                pool,
                owner,
                spender,
                amount,
            } => {
                7u8.write(writer);
                pool.write(writer);
                owner.write(writer);
                spender.write(writer);
                amount.write(writer);
            }
            Self::EngineInitialized { owner, pool } => {
                8u8.write(writer);
                owner.write(writer);
                pool.write(writer);
            }
            Self::Bet {
                request_id,
                player,
                bet_number,
                bet_size,
            } => {
                9u8.write(writer);
                request_id.write(writer);
                player.write(writer);
                bet_number.write(writer);
                bet_size.write(writer);
            }
            Self::RandomnessRequested { request_id, fee } => {
                10u8.write(writer);
                request_id.write(writer);
                fee.write(writer);
            }
            Self::Play {
                request_id,
                player,
                bet_number,
                winning_number,
            } => {
                11u8.write(writer);
                request_id.write(writer);
                player.write(writer);
                bet_number.write(writer);
                winning_number.write(writer);
            }
            Self::Payout {
                request_id,
                winner,
                payout,
            } => {
                12u8.write(writer);
                request_id.write(writer);
                winner.write(writer);
                payout.write(writer);
            }
            Self::Invest {
                investor,
                currency_amount,
                token_price,
                token_amount,
            } => {
                13u8.write(writer);
                investor.write(writer);
                write_trade(currency_amount, token_price, token_amount, writer);
            }
            Self::Divest {
                investor,
                currency_amount,
                token_price,
                token_amount,
            } => {
                14u8.write(writer);
                investor.write(writer);
                write_trade(currency_amount, token_price, token_amount, writer);
            }
            Self::Paused { by } => {
                15u8.write(writer);
                by.write(writer);
            }
            Self::Unpaused { by } => {
                16u8.write(writer);
                by.write(writer);
            }
            Self::Rejected {
                account,
                code,
                message,
            } => {
                17u8.write(writer);
                account.write(writer);
                code.write(writer);
                write_string(message, writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match u8::read(reader)? {
            0 => Self::Funded {
                account: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
                balance: u128::read(reader)?,
            },
            1 => Self::PoolCreated {
                pool: PoolId::read(reader)?,
                creator: PublicKey::read(reader)?,
            },
            2 => Self::ReserveBacked {
                pool: PoolId::read(reader)?,
                reserve: ReserveId::read(reader)?,
                deployer: PublicKey::read(reader)?,
            },
            3 => Self::Donation {
                reserve: ReserveId::read(reader)?,
                from: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            4 => {
                let pool = PoolId::read(reader)?;
                let buyer = PublicKey::read(reader)?;
                let (currency_amount, token_price, token_amount) = read_trade(reader)?;
                Self::Buy {
                    pool,
                    buyer,
                    currency_amount,
                    token_price,
                    token_amount,
                }
            }
            5 => {
                let pool = PoolId::read(reader)?;
                let seller = PublicKey::read(reader)?;
                let (currency_amount, token_price, token_amount) = read_trade(reader)?;
                Self::Sell {
                    pool,
                    seller,
                    currency_amount,
                    token_price,
                    token_amount,
                }
            }
            6 => Self::Transfer {
                pool: PoolId::read(reader)?,
                from: PublicKey::read(reader)?,
                to: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            7 => Self::Approval {
                pool: PoolId::read(reader)?,
                owner: PublicKey::read(reader)?,
                spender: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            8 => Self::EngineInitialized {
                owner: PublicKey::read(reader)?,
                pool: PoolId::read(reader)?,
            },
            9 => Self::Bet {
                request_id: RequestId::read(reader)?,
                player: PublicKey::read(reader)?,
                bet_number: Slot::read(reader)?,
                bet_size: u128::read(reader)?,
            },
            10 => Self::RandomnessRequested {
                request_id: RequestId::read(reader)?,
                fee: u128::read(reader)?,
            },
            11 => Self::Play {
                request_id: RequestId::read(reader)?,
                player: PublicKey::read(reader)?,
                bet_number: Slot::read(reader)?,
                winning_number: Slot::read(reader)?,
            },
            12 => Self::Payout {
                request_id: RequestId::read(reader)?,
                winner: PublicKey::read(reader)?,
                payout: u128::read(reader)?,
            },
            13 => {
                let investor = PublicKey::read(reader)?;
                let (currency_amount, token_price, token_amount) = read_trade(reader)?;
                Self::Invest {
                    investor,
                    currency_amount,
                    token_price,
                    token_amount,
                }
            }
            14 => {
                let investor = PublicKey::read(reader)?;
                let (currency_amount, token_price, token_amount) = read_trade(reader)?;
                Self::Divest {
                    investor,
                    currency_amount,
                    token_price,
                    token_amount,
                }
            }
            15 => Self::Paused {
                by: PublicKey::read(reader)?,
            },
            16 => Self::Unpaused {
                by: PublicKey::read(reader)?,
            },
            17 => Self::Rejected {
                account: PublicKey::read(reader)?,
                code: u8::read(reader)?,
                message: read_string(reader, MAX_MESSAGE_LENGTH)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Funded { .. } => PublicKey::SIZE + 2 * u128::SIZE,
                Self::PoolCreated { .. } => PoolId::SIZE + PublicKey::SIZE,
                Self::ReserveBacked { .. } => PoolId::SIZE + ReserveId::SIZE + PublicKey::SIZE,
                Self::Donation { .. } => ReserveId::SIZE + PublicKey::SIZE + u128::SIZE,
                Self::Buy { .. } | Self::Sell { .. } => {
                    PoolId::SIZE + PublicKey::SIZE + TRADE_SIZE
                }
                Self::Transfer { .. } | Self::Approval { .. } => {
                    PoolId::SIZE + 2 * PublicKey::SIZE + u128::SIZE
                }
                Self::EngineInitialized { .. } => PublicKey::SIZE + PoolId::SIZE,
                Self::Bet { .. } => RequestId::SIZE + PublicKey::SIZE + Slot::SIZE + u128::SIZE,
                Self::RandomnessRequested { .. } => RequestId::SIZE + u128::SIZE,
                Self::Play { .. } => RequestId::SIZE + PublicKey::SIZE + 2 * Slot::SIZE,
                Self::Payout { .. } => RequestId::SIZE + PublicKey::SIZE + u128::SIZE,
                Self::Invest { .. } | Self::Divest { .. } => PublicKey::SIZE + TRADE_SIZE,
                Self::Paused { .. } | Self::Unpaused { .. } => PublicKey::SIZE,
                Self::Rejected { message, .. } => {
                    PublicKey::SIZE + u8::SIZE + string_encode_size(message)
                }
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Event(Event),
    Transaction(Transaction),
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Event(event) => {
                0u8.write(writer);
                event.write(writer);
            }
            Self::Transaction(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Event(Event::read(reader)?)),
            1 => Ok(Self::Transaction(Transaction::read(reader)?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Event(event) => event.encode_size(),
            Self::Transaction(transaction) => transaction.encode_size(),
        }
    }
}

/// Truncates a rejection message to what [`Event::Rejected`] can carry.
pub fn rejection_message(message: impl Into<String>) -> String {
    let mut message = message.into();
    if message.len() > MAX_MESSAGE_LENGTH {
        let mut end = MAX_MESSAGE_LENGTH;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};
    use commonware_cryptography::ed25519::PrivateKey;

    #[test]
    fn signed_transaction_verifies_and_detects_tampering() {
        let private = PrivateKey::from_seed(1);
        let tx = Transaction::sign(&private, 0, Instruction::Bet { number: 7, value: 5 });
        assert!(tx.verify());

        let mut tampered = tx.clone();
        tampered.instruction = Instruction::Bet { number: 8, value: 5 };
        assert!(!tampered.verify());

        let mut replayed = tx;
        replayed.nonce = 1;
        assert!(!replayed.verify());
    }

    #[test]
    fn transaction_encoding_matches_size() {
        let private = PrivateKey::from_seed(2);
        let tx = Transaction::sign(
            &private,
            3,
            Instruction::TransferFrom {
                pool: 1,
                from: PrivateKey::from_seed(3).public_key(),
                to: PrivateKey::from_seed(4).public_key(),
                amount: 9,
            },
        );
        let encoded = tx.encode();
        assert_eq!(encoded.len(), tx.encode_size());
        assert_eq!(Transaction::decode(encoded).unwrap(), tx);
    }

    #[test]
    fn unknown_instruction_tag_is_rejected() {
        assert!(matches!(
            Instruction::read(&mut &[99u8][..]),
            Err(Error::InvalidEnum(99))
        ));
    }

    #[test]
    fn rejected_event_carries_message() {
        let event = Event::Rejected {
            account: PrivateKey::from_seed(5).public_key(),
            code: 6,
            message: "wager engine is paused".to_string(),
        };
        let encoded = event.encode();
        assert_eq!(encoded.len(), event.encode_size());
        assert_eq!(Event::decode(encoded).unwrap(), event);
    }

    #[test]
    fn off_wheel_slot_in_event_fails_to_decode() {
        let event = Event::Play {
            request_id: 0,
            player: PrivateKey::from_seed(6).public_key(),
            bet_number: Slot::new(1).unwrap(),
            winning_number: Slot::new(2).unwrap(),
        };
        let mut bytes = event.encode().to_vec();
        let last = bytes.len() - 1;
        bytes[last] = 40;
        assert!(Event::decode(&bytes[..]).is_err());
    }

    #[test]
    fn long_messages_are_truncated_on_char_boundary() {
        let message = "é".repeat(MAX_MESSAGE_LENGTH);
        let truncated = rejection_message(message);
        assert!(truncated.len() <= MAX_MESSAGE_LENGTH);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}

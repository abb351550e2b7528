/// Fixed-point scale shared by claim-token amounts and reserve currency (18 decimals).
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// Number of equiprobable wheel slots (0..=36).
pub const SLOT_COUNT: u8 = 37;

/// Highest valid slot number.
pub const MAX_SLOT: u8 = SLOT_COUNT - 1;

/// A winning straight bet returns the stake times this multiplier (stake included).
pub const PAYOUT_MULTIPLIER: u128 = 36;

/// Price of one whole claim token while no tokens are outstanding (1 token = 1 currency unit).
pub const DEFAULT_INITIAL_TOKEN_PRICE: u128 = ONE;

/// Fee increment charged per already-outstanding randomness request (0.001 currency).
pub const DEFAULT_FEE_STEP: u128 = ONE / 1_000;

/// Fraction of free reserve (1 / divisor) a single bet may stake.
pub const DEFAULT_MAX_BET_DIVISOR: u128 = 100;

/// Upper bound on distinct holders decoded from a single ledger value.
pub const MAX_LEDGER_ACCOUNTS: usize = 1 << 20;

/// Upper bound on the length of a rejection message carried in an event.
pub const MAX_MESSAGE_LENGTH: usize = 256;

/// Error codes carried by `Rejected` events.
pub const ERROR_UNAUTHORIZED: u8 = 1;
pub const ERROR_ALREADY_BACKED: u8 = 2;
pub const ERROR_INSUFFICIENT_BALANCE: u8 = 3;
pub const ERROR_BET_TOO_LARGE: u8 = 4;
pub const ERROR_BET_TOO_SMALL: u8 = 5;
pub const ERROR_PAUSED: u8 = 6;
pub const ERROR_INSUFFICIENT_VALUE: u8 = 7;
pub const ERROR_INSUFFICIENT_ALLOWANCE: u8 = 8;
pub const ERROR_INSUFFICIENT_FUNDS: u8 = 9;
pub const ERROR_INSUFFICIENT_RESERVE: u8 = 10;
pub const ERROR_INVALID_SLOT: u8 = 11;
pub const ERROR_RESERVE_NOT_PAIRED: u8 = 12;
pub const ERROR_UNKNOWN_POOL: u8 = 13;
pub const ERROR_UNKNOWN_RESERVE: u8 = 14;
pub const ERROR_ENGINE_NOT_INITIALIZED: u8 = 15;
pub const ERROR_ENGINE_ALREADY_INITIALIZED: u8 = 16;
pub const ERROR_OVERFLOW: u8 = 17;

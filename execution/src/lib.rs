//! Roscoin settlement execution.
//!
//! This crate contains the deterministic transaction execution logic (`Layer`) for the claim-token
//! pool, its reserve and the wager engine, plus the randomness-oracle collaborator contract.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution.
//! - Randomness only enters through `ResolveRandomness` transactions signed by the configured
//!   oracle.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Atomicity
//! Each instruction either applies completely or leaves no trace besides the consumed nonce.
//! Rejections surface as `Event::Rejected` from [`Layer::execute`].
//!
//! The primary entrypoint is [`Layer`].

pub mod oracle;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod layer;

mod state;


pub use layer::{ExecutionError, Layer};
pub use oracle::{RandomnessOracle, SeededOracle};
pub use state::{nonce, Memory, PrepareError, State, Status};

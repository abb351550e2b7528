//! Randomness collaborators.
//!
//! The engine never waits on an oracle. A bet emits [`Event::RandomnessRequested`]; an oracle that
//! observed the request later submits [`Instruction::ResolveRandomness`] for the same id. Nothing
//! but the request id connects the two calls, and an undelivered request simply stays pending.

use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    sha256::Sha256,
    Hasher, Signer,
};
use roscoin_types::{
    execution::{Event, Instruction, Output, Transaction},
    RequestId,
};
use std::collections::BTreeSet;

/// Domain separator for roulette outcomes.
const ROULETTE_DOMAIN: &[u8] = b"roulette";

/// Request/callback contract of an external randomness source.
pub trait RandomnessOracle {
    /// Records a request. Fire-and-forget: no answer is produced here.
    fn request(&mut self, request_id: RequestId);

    /// Produces the random number for a previously requested id, at most once.
    fn deliver(&mut self, request_id: RequestId) -> Option<u64>;

    /// Ids requested but not yet delivered, in ascending order.
    fn pending(&self) -> Vec<RequestId>;

    /// Registers every randomness request found in `outputs`.
    fn observe(&mut self, outputs: &[Output]) {
        for output in outputs {
            if let Output::Event(Event::RandomnessRequested { request_id, .. }) = output {
                self.request(*request_id);
            }
        }
    }
}

/// Deterministic oracle that derives each outcome from a secret and the request id.
pub struct SeededOracle {
    signer: PrivateKey,
    secret: [u8; 32],
    pending: BTreeSet<RequestId>,
    nonce: u64,
}

impl SeededOracle {
    pub fn new(signer: PrivateKey, secret: [u8; 32]) -> Self {
        Self {
            signer,
            secret,
            pending: BTreeSet::new(),
            nonce: 0,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    /// Number returned for `request_id`: `be_u64(sha256(secret || request_id || "roulette"))`.
    pub fn random_number(&self, request_id: RequestId) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(&request_id.to_be_bytes());
        hasher.update(ROULETTE_DOMAIN);
        let digest = hasher.finalize().0;
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(word)
    }

    /// Signs the callback transaction for a pending request, consuming it.
    pub fn resolve(&mut self, request_id: RequestId) -> Option<Transaction> {
        let random_number = self.deliver(request_id)?;
        let transaction = Transaction::sign(
            &self.signer,
            self.nonce,
            Instruction::ResolveRandomness {
                request_id,
                random_number,
            },
        );
        self.nonce += 1;
        Some(transaction)
    }

    /// Signs callbacks for every pending request in id order.
    pub fn resolve_all(&mut self) -> Vec<Transaction> {
        self.pending()
            .into_iter()
            .filter_map(|request_id| self.resolve(request_id))
            .collect()
    }

    /// Aligns the transaction nonce with the oracle account's stored nonce.
    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }
}

impl RandomnessOracle for SeededOracle {
    fn request(&mut self, request_id: RequestId) {
        self.pending.insert(request_id);
    }

    fn deliver(&mut self, request_id: RequestId) -> Option<u64> {
        if !self.pending.remove(&request_id) {
            return None;
        }
        Some(self.random_number(request_id))
    }

    fn pending(&self) -> Vec<RequestId> {
        self.pending.iter().copied().collect()
    }
}

/// Oracle that answers from a script keyed by request id.
#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct FixedOracle {
    script: std::collections::BTreeMap<RequestId, u64>,
    pending: BTreeSet<RequestId>,
}

#[cfg(any(test, feature = "mocks"))]
impl FixedOracle {
    /// Scripts the number delivered for `request_id`.
    pub fn script(&mut self, request_id: RequestId, random_number: u64) {
        self.script.insert(request_id, random_number);
    }
}

#[cfg(any(test, feature = "mocks"))]
impl RandomnessOracle for FixedOracle {
    fn request(&mut self, request_id: RequestId) {
        self.pending.insert(request_id);
    }

    fn deliver(&mut self, request_id: RequestId) -> Option<u64> {
        if !self.pending.remove(&request_id) {
            return None;
        }
        self.script.get(&request_id).copied()
    }

    fn pending(&self) -> Vec<RequestId> {
        self.pending.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> SeededOracle {
        SeededOracle::new(PrivateKey::from_seed(42), [7u8; 32])
    }

    #[test]
    fn outcomes_are_deterministic_per_request() {
        let a = oracle();
        let b = oracle();
        assert_eq!(a.random_number(3), b.random_number(3));
        assert_ne!(a.random_number(3), a.random_number(4));

        let other = SeededOracle::new(PrivateKey::from_seed(42), [8u8; 32]);
        assert_ne!(a.random_number(3), other.random_number(3));
    }

    #[test]
    fn delivers_each_request_at_most_once() {
        let mut oracle = oracle();
        assert_eq!(oracle.deliver(0), None, "never requested");

        oracle.request(0);
        oracle.request(1);
        assert_eq!(oracle.pending(), vec![0, 1]);
        assert!(oracle.deliver(1).is_some());
        assert_eq!(oracle.deliver(1), None);
        assert_eq!(oracle.pending(), vec![0]);
    }

    #[test]
    fn resolve_signs_with_increasing_nonces() {
        let mut oracle = oracle();
        oracle.observe(&[
            Output::Event(Event::RandomnessRequested {
                request_id: 5,
                fee: 0,
            }),
            Output::Event(Event::RandomnessRequested {
                request_id: 2,
                fee: 1,
            }),
        ]);

        let transactions = oracle.resolve_all();
        assert_eq!(transactions.len(), 2);
        assert!(transactions.iter().all(Transaction::verify));
        assert_eq!(transactions[0].nonce, 0);
        assert_eq!(transactions[1].nonce, 1);
        assert!(matches!(
            transactions[0].instruction,
            Instruction::ResolveRandomness { request_id: 2, .. }
        ));
        assert!(oracle.pending().is_empty());
    }

    #[test]
    fn fixed_oracle_follows_script() {
        let mut oracle = FixedOracle::default();
        oracle.script(0, 17);
        oracle.request(0);
        assert_eq!(oracle.deliver(0), Some(17));
        assert_eq!(oracle.deliver(0), None);
    }
}

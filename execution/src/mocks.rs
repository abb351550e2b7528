use crate::{state::nonce, ExecutionError, Layer, State};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    Signer,
};
use commonware_math::algebra::Random as _;
use rand::{rngs::StdRng, SeedableRng};
use roscoin_types::{
    execution::{Event, Instruction, Transaction},
    PoolId, ReserveId, SettlementConfig, SettlementError,
};

/// Creates an account keypair for Ed25519 signatures used by users
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let mut rng = StdRng::seed_from_u64(seed);
    let private = PrivateKey::random(&mut rng);
    let public = private.public_key();
    (private, public)
}

pub fn account(seed: u64) -> PublicKey {
    create_account_keypair(seed).1
}

/// Default settlement parameters with `oracle` as the randomness source.
pub fn test_config(oracle: &PublicKey) -> SettlementConfig {
    SettlementConfig::new(oracle.clone())
}

/// Signs `instruction` with the signer's next nonce and applies it.
///
/// Panics on storage failure; returns the rejection otherwise.
pub async fn submit<S: State>(
    layer: &mut Layer<'_, S>,
    signer: &PrivateKey,
    instruction: Instruction,
) -> Result<Vec<Event>, SettlementError> {
    let nonce = nonce(layer, &signer.public_key())
        .await
        .expect("failed to load nonce");
    let transaction = Transaction::sign(signer, nonce, instruction);
    layer
        .prepare(&transaction)
        .await
        .expect("nonce must match");
    match layer.apply(&transaction).await {
        Ok(events) => Ok(events),
        Err(ExecutionError::Rejected(err)) => Err(err),
        Err(ExecutionError::State(err)) => panic!("state failure: {err:?}"),
    }
}

/// Creates a pool, backs it with a fresh reserve and binds the wager engine to it.
pub async fn deploy<S: State>(
    layer: &mut Layer<'_, S>,
    owner: &PrivateKey,
) -> (PoolId, ReserveId) {
    let events = submit(layer, owner, Instruction::CreatePool)
        .await
        .expect("create pool");
    let Some(Event::PoolCreated { pool, .. }) = events.first().cloned() else {
        panic!("missing PoolCreated");
    };
    let events = submit(layer, owner, Instruction::CreateReserve { pool })
        .await
        .expect("create reserve");
    let Some(Event::ReserveBacked { reserve, .. }) = events.first().cloned() else {
        panic!("missing ReserveBacked");
    };
    submit(layer, owner, Instruction::InitEngine { pool })
        .await
        .expect("init engine");
    (pool, reserve)
}

/// Funds `signer` with `amount` and invests all of it in the engine's pool.
pub async fn fund_and_invest<S: State>(
    layer: &mut Layer<'_, S>,
    signer: &PrivateKey,
    amount: u128,
) -> Vec<Event> {
    submit(layer, signer, Instruction::Fund { amount })
        .await
        .expect("fund");
    submit(layer, signer, Instruction::Invest { amount })
        .await
        .expect("invest")
}

use nestera_crypto::{authority_key_of, sign_message, Ed25519SigningKey};
use nestera_types::{Beneficiary, ContractEvent, Decision, MintPayload, MintSignature};

use super::*;
use crate::codec;

const USER: Beneficiary = Beneficiary([0x42; 32]);

/// 初期化済みコントラクトと管理者の署名鍵を構築する
fn setup() -> (MintContract, Ed25519SigningKey) {
    let signing_key = Ed25519SigningKey::generate(&mut rand::rngs::OsRng);
    let mut contract = MintContract::ed25519(VerifierConfig::default());
    contract.initialize(authority_key_of(&signing_key)).unwrap();
    (contract, signing_key)
}

fn sign(signing_key: &Ed25519SigningKey, payload: &MintPayload) -> MintSignature {
    sign_message(signing_key, &codec::encode(payload))
}

fn scenario_payload() -> MintPayload {
    MintPayload::new(USER, 100, 1000, 3600, 1).unwrap()
}

/// 管理者署名付きペイロードの承認・リプレイ・改ざん・期限切れのシナリオ
#[test]
fn test_mint_scenario() {
    let (mut contract, key) = setup();
    let mut ledger = MemoryLedger::new();
    let payload = scenario_payload();
    let signature = sign(&key, &payload);

    // 発行時刻ちょうどに承認される
    let receipt = contract.mint(&payload, &signature, 1000, &mut ledger).unwrap();
    assert_eq!(receipt.amount, 100);
    assert_eq!(receipt.fingerprint, codec::fingerprint(&payload));
    assert_eq!(ledger.balance(&USER), 100);

    // 同じペイロードの再送は消費済み
    let replay = contract.mint(&payload, &signature, 1500, &mut ledger);
    assert_eq!(
        replay,
        Err(ContractError::Rejected(Decision::AlreadyConsumed))
    );
    assert_eq!(ledger.balance(&USER), 100);

    // amountを書き換えると署名が一致しない
    let tampered = MintPayload {
        amount: 200,
        ..payload
    };
    let result = contract.mint(&tampered, &signature, 1500, &mut ledger);
    assert_eq!(
        result,
        Err(ContractError::Rejected(Decision::InvalidSignature))
    );
    assert_eq!(ledger.balance(&USER), 100);

    // 新しい状態でも期限切れ後は拒否される
    let mut fresh = MintContract::ed25519(VerifierConfig::default());
    fresh.initialize(authority_key_of(&key)).unwrap();
    let mut fresh_ledger = MemoryLedger::new();
    let expired = fresh.mint(&payload, &signature, 5000, &mut fresh_ledger);
    assert_eq!(expired, Err(ContractError::Rejected(Decision::Expired)));
    assert_eq!(fresh_ledger.total_supply(), 0);
    assert!(fresh.consumed().is_empty());
}

#[test]
fn test_initialize_only_once() {
    let (mut contract, _) = setup();
    let other = authority_key_of(&Ed25519SigningKey::generate(&mut rand::rngs::OsRng));

    let before = contract.admin_public_key().unwrap();
    assert_eq!(
        contract.initialize(other),
        Err(ContractError::AlreadyInitialized)
    );
    assert_eq!(contract.admin_public_key().unwrap(), before);
    assert_eq!(contract.events().len(), 1);
}

#[test]
fn test_uninitialized_contract_rejects_everything() {
    let mut contract = MintContract::ed25519(VerifierConfig::default());
    let key = Ed25519SigningKey::generate(&mut rand::rngs::OsRng);
    let payload = scenario_payload();
    let signature = sign(&key, &payload);
    let mut ledger = MemoryLedger::new();

    assert!(!contract.is_initialized());
    assert_eq!(
        contract.admin_public_key(),
        Err(ContractError::NotInitialized)
    );
    assert_eq!(
        contract.verify_signature(&payload, &signature, 1000),
        Err(ContractError::NotInitialized)
    );
    assert_eq!(
        contract.mint(&payload, &signature, 1000, &mut ledger),
        Err(ContractError::NotInitialized)
    );
    assert!(contract.consumed().is_empty());
    assert!(contract.events().is_empty());
}

#[test]
fn test_verify_signature_is_read_only() {
    let (contract, key) = setup();
    let payload = scenario_payload();
    let signature = sign(&key, &payload);

    assert_eq!(contract.verify_signature(&payload, &signature, 1200), Ok(()));
    assert_eq!(contract.verify_signature(&payload, &signature, 1200), Ok(()));
    assert!(contract.consumed().is_empty());

    assert_eq!(
        contract.verify_signature(&payload, &signature, 4601),
        Err(ContractError::Rejected(Decision::Expired))
    );
}

#[test]
fn test_ledger_failure_rolls_back_consumption() {
    let (mut contract, key) = setup();
    let payload = scenario_payload();
    let signature = sign(&key, &payload);

    let mut ledger = MemoryLedger::new();
    ledger.set_paused(true);

    let result = contract.mint(&payload, &signature, 1000, &mut ledger);
    assert!(matches!(result, Err(ContractError::Ledger(_))));
    assert!(contract.consumed().is_empty());
    assert_eq!(contract.events().len(), 1);

    // 同じペイロードで再試行できる
    ledger.set_paused(false);
    let receipt = contract.mint(&payload, &signature, 1001, &mut ledger).unwrap();
    assert_eq!(receipt.amount, 100);
    assert_eq!(ledger.balance(&USER), 100);
}

#[test]
fn test_ledger_overflow_is_reported() {
    let (mut contract, key) = setup();
    let mut ledger = MemoryLedger::new();

    let first = MintPayload::new(USER, u128::MAX, 1000, 60, 1).unwrap();
    let second = MintPayload::new(USER, 1, 1000, 60, 2).unwrap();

    contract
        .mint(&first, &sign(&key, &first), 1000, &mut ledger)
        .unwrap();
    let result = contract.mint(&second, &sign(&key, &second), 1000, &mut ledger);

    assert!(matches!(result, Err(ContractError::Ledger(_))));
    assert_eq!(ledger.balance(&USER), u128::MAX);
    assert!(!contract.consumed().contains(&codec::fingerprint(&second)));
}

#[test]
fn test_same_second_payloads_distinguished_by_nonce() {
    let (mut contract, key) = setup();
    let mut ledger = MemoryLedger::new();

    let a = MintPayload::new(USER, 50, 1000, 60, 7).unwrap();
    let b = MintPayload::new(USER, 50, 1000, 60, 8).unwrap();

    contract.mint(&a, &sign(&key, &a), 1000, &mut ledger).unwrap();
    contract.mint(&b, &sign(&key, &b), 1000, &mut ledger).unwrap();

    assert_eq!(ledger.balance(&USER), 100);
    assert_eq!(contract.consumed().len(), 2);
}

#[test]
fn test_events_record_init_and_mint() {
    let (mut contract, key) = setup();
    let mut ledger = MemoryLedger::new();
    let payload = scenario_payload();
    let receipt = contract
        .mint(&payload, &sign(&key, &payload), 1000, &mut ledger)
        .unwrap();

    let events = contract.take_events();
    assert_eq!(
        events,
        vec![
            ContractEvent::Initialized {
                authority: authority_key_of(&key)
            },
            ContractEvent::Minted {
                beneficiary: USER,
                amount: 100,
                fingerprint: receipt.fingerprint,
            },
        ]
    );
    assert!(contract.events().is_empty());
}

#[test]
fn test_prune_keeps_replay_protection() {
    let (mut contract, key) = setup();
    let mut ledger = MemoryLedger::new();
    let payload = scenario_payload();
    let signature = sign(&key, &payload);

    contract.mint(&payload, &signature, 1000, &mut ledger).unwrap();
    assert_eq!(contract.prune_consumed(4600), 0);
    assert_eq!(contract.prune_consumed(4601), 1);

    // 記録が消えても期限切れで拒否される
    let replay = contract.mint(&payload, &signature, 4601, &mut ledger);
    assert_eq!(replay, Err(ContractError::Rejected(Decision::Expired)));
    assert_eq!(ledger.balance(&USER), 100);
}

#[test]
fn test_restore_from_persisted_state() {
    let (mut contract, key) = setup();
    let mut ledger = MemoryLedger::new();
    let payload = scenario_payload();
    let signature = sign(&key, &payload);
    contract.mint(&payload, &signature, 1000, &mut ledger).unwrap();

    let authority = contract.admin_public_key().ok();
    let consumed = contract.consumed().clone();
    let mut restored = MintContract::restore(
        Verifier::ed25519(VerifierConfig::default()),
        authority,
        consumed,
    );

    assert!(restored.is_initialized());
    assert_eq!(
        restored.mint(&payload, &signature, 1200, &mut ledger),
        Err(ContractError::Rejected(Decision::AlreadyConsumed))
    );
}

#[test]
fn test_rejection_reason_is_exposed() {
    let err = ContractError::Rejected(Decision::NotYetValid);
    assert_eq!(err.decision(), Some(Decision::NotYetValid));
    assert_eq!(ContractError::NotInitialized.decision(), None);
}

//! # Nestera Mint Core
//!
//! オフチェーンで管理者が署名したペイロードに基づき、オンチェーンでミントを承認する。
//!
//! ## 処理フロー
//! 1. ペイロードを正規バイト列にエンコードする（[`codec`]）
//! 2. 構造・有効期限・リプレイ・署名を順に検査する（[`verifier`]）
//! 3. 承認時のみフィンガープリントを記録し、ミントを実行する（[`contract`]）
//!
//! 検証者自身は可変状態を持たない。全ての判定は永続状態とリクエストから再導出できる。

pub mod codec;
pub mod config;
pub mod consumed;
pub mod contract;
pub mod verifier;

pub use codec::{decode, encode, fingerprint, CodecError};
pub use config::VerifierConfig;
pub use consumed::{ConsumedPayloadSet, MemoryConsumedSet};
pub use contract::{ContractError, LedgerError, MemoryLedger, MintContract, MintLedger};
pub use verifier::{Evaluation, Verifier};

pub use nestera_types::{
    AuthorityKey, Beneficiary, ContractEvent, Decision, Fingerprint, MintPayload, MintReceipt,
    MintSignature,
};

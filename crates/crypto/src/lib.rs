//! # Nestera Mint 暗号処理
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 管理者署名 | Ed25519 |
//! | フィンガープリント | SHA-256 |
//!
//! 承認判定アルゴリズムは [`SignatureScheme`] トレイト越しに署名を検証するため、
//! 32バイト公開鍵・64バイト署名の別方式（BIP-340 Schnorr等）に差し替えられる。

use ed25519_dalek::Signer;
use sha2::{Digest, Sha256};

use nestera_types::{AuthorityKey, MintSignature};

pub use ed25519_dalek::{
    Signature as Ed25519Signature, SigningKey as Ed25519SigningKey,
    VerifyingKey as Ed25519VerifyingKey,
};

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// 公開鍵がEd25519の曲線上の点として不正
    #[error("Ed25519公開鍵が不正です")]
    InvalidPublicKey,
    /// Ed25519署名検証エラー
    #[error("Ed25519署名検証に失敗しました")]
    SignatureVerifyError,
}

/// 署名検証の能力。ステートレスかつ決定論的であること。
pub trait SignatureScheme {
    /// 方式名（ログ出力用）
    fn name(&self) -> &'static str;

    /// `signature` が `key` の秘密鍵で `message` に対して生成されたものなら `true`。
    /// 鍵や署名が構造的に不正な場合も `false` を返す。
    fn verify(&self, key: &AuthorityKey, message: &[u8], signature: &MintSignature) -> bool;
}

/// Ed25519による [`SignatureScheme`] 実装。
///
/// 署名の可鍛性（malleability）と小位数公開鍵を拒否する `verify_strict` を使う。
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    fn name(&self) -> &'static str {
        "ed25519"
    }

    fn verify(&self, key: &AuthorityKey, message: &[u8], signature: &MintSignature) -> bool {
        let Ok(verifying_key) = verifying_key_from_authority(key) else {
            return false;
        };
        let signature = Ed25519Signature::from_bytes(signature.as_bytes());
        ed25519_verify(&verifying_key, message, &signature).is_ok()
    }
}

/// 管理者鍵をEd25519検証鍵に変換する。
pub fn verifying_key_from_authority(
    key: &AuthorityKey,
) -> Result<Ed25519VerifyingKey, CryptoError> {
    Ed25519VerifyingKey::from_bytes(key.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)
}

/// 署名鍵に対応する管理者鍵を返す。
pub fn authority_key_of(signing_key: &Ed25519SigningKey) -> AuthorityKey {
    AuthorityKey(signing_key.verifying_key().to_bytes())
}

/// Ed25519による署名。
pub fn ed25519_sign(signing_key: &Ed25519SigningKey, message: &[u8]) -> Ed25519Signature {
    signing_key.sign(message)
}

/// Ed25519による署名を [`MintSignature`] として返す。
pub fn sign_message(signing_key: &Ed25519SigningKey, message: &[u8]) -> MintSignature {
    MintSignature(ed25519_sign(signing_key, message).to_bytes())
}

/// Ed25519による署名検証（strict）。
pub fn ed25519_verify(
    verifying_key: &Ed25519VerifyingKey,
    message: &[u8],
    signature: &Ed25519Signature,
) -> Result<(), CryptoError> {
    verifying_key
        .verify_strict(message, signature)
        .map_err(|_| CryptoError::SignatureVerifyError)
}

/// SHA-256ハッシュ計算。
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_accepts_valid_signature() {
        let signing_key = Ed25519SigningKey::generate(&mut rand::rngs::OsRng);
        let key = authority_key_of(&signing_key);
        let signature = sign_message(&signing_key, b"mint 100");

        assert!(Ed25519Scheme.verify(&key, b"mint 100", &signature));
    }

    #[test]
    fn test_scheme_rejects_other_message() {
        let signing_key = Ed25519SigningKey::generate(&mut rand::rngs::OsRng);
        let key = authority_key_of(&signing_key);
        let signature = sign_message(&signing_key, b"mint 100");

        assert!(!Ed25519Scheme.verify(&key, b"mint 200", &signature));
    }

    #[test]
    fn test_scheme_rejects_other_key() {
        let signing_key = Ed25519SigningKey::generate(&mut rand::rngs::OsRng);
        let other_key = Ed25519SigningKey::generate(&mut rand::rngs::OsRng);
        let signature = sign_message(&signing_key, b"mint 100");

        assert!(!Ed25519Scheme.verify(&authority_key_of(&other_key), b"mint 100", &signature));
    }

    #[test]
    fn test_scheme_rejects_garbage_signature() {
        let signing_key = Ed25519SigningKey::generate(&mut rand::rngs::OsRng);
        let key = authority_key_of(&signing_key);

        assert!(!Ed25519Scheme.verify(&key, b"mint 100", &MintSignature([0xff; 64])));
    }

    #[test]
    fn test_scheme_rejects_small_order_key() {
        // 単位元（small-order点）。verify_strictでは必ず拒否される。
        let mut identity = [0u8; 32];
        identity[0] = 1;
        let key = AuthorityKey(identity);

        assert!(!Ed25519Scheme.verify(&key, b"mint 100", &MintSignature([0u8; 64])));
    }

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"abc");
        assert_eq!(hash[0], 0xba);
        assert_eq!(hash[31], 0xad);
    }
}

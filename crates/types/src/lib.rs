//! # Nestera Mint 共有型定義
//!
//! オフチェーン署名者とオンチェーン検証者が共有するデータ構造を提供する。
//!
//! ## エンコーディング規則（JSON表現）
//! - Base58: 公開鍵、受益者アイデンティティ
//! - Base64: 署名
//! - Hex（`0x`プレフィックス付き）: フィンガープリント
//!
//! 署名対象のバイト列はJSONではなく、`nestera-core::codec`の固定長バイナリレイアウトで決まる。

use std::fmt;

use base58::{FromBase58, ToBase58};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Base64エンジン（Standard）
fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

// ---------------------------------------------------------------------------
// 固定長バイト列のパース
// ---------------------------------------------------------------------------

/// 固定長値のパースエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Base58デコードに失敗
    #[error("Base58デコードに失敗しました: {0}")]
    Base58(String),
    /// Base64デコードに失敗
    #[error("Base64デコードに失敗しました: {0}")]
    Base64(String),
    /// Hexデコードに失敗
    #[error("Hexデコードに失敗しました: {0}")]
    Hex(String),
    /// 長さが期待値と異なる
    #[error("長さが不正です: {actual} bytes (期待値: {expected} bytes)")]
    Length { expected: usize, actual: usize },
}

fn to_array<const N: usize>(bytes: Vec<u8>) -> Result<[u8; N], ParseError> {
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseError::Length { expected: N, actual })
}

fn from_base58_32(s: &str) -> Result<[u8; 32], ParseError> {
    let bytes = s
        .from_base58()
        .map_err(|e| ParseError::Base58(format!("{e:?}")))?;
    to_array(bytes)
}

// ---------------------------------------------------------------------------
// 鍵・アイデンティティ
// ---------------------------------------------------------------------------

/// ミントを承認する権限を持つ管理者のEd25519公開鍵（32バイト）。
///
/// 初期化時に一度だけ設定され、以降は変更されない。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthorityKey(pub [u8; 32]);

impl AuthorityKey {
    /// 公開鍵のバイト列を返す。
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base58文字列からパースする。
    pub fn from_base58(s: &str) -> Result<Self, ParseError> {
        from_base58_32(s).map(Self)
    }

    /// Base58文字列に変換する。
    pub fn to_base58(&self) -> String {
        self.0.to_base58()
    }
}

/// ミントの受益者を表す不透明なアイデンティティ（32バイトのアカウントアドレス）。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Beneficiary(pub [u8; 32]);

impl Beneficiary {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base58文字列からパースする。
    pub fn from_base58(s: &str) -> Result<Self, ParseError> {
        from_base58_32(s).map(Self)
    }

    pub fn to_base58(&self) -> String {
        self.0.to_base58()
    }
}

/// 管理者がペイロードの正規エンコーディングに対して生成したEd25519署名（64バイト）。
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MintSignature(pub [u8; 64]);

impl MintSignature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Base64文字列からパースする。
    pub fn from_base64(s: &str) -> Result<Self, ParseError> {
        let bytes = b64()
            .decode(s)
            .map_err(|e| ParseError::Base64(e.to_string()))?;
        to_array(bytes).map(Self)
    }

    /// Base64文字列に変換する。
    pub fn to_base64(&self) -> String {
        b64().encode(self.0)
    }
}

/// ペイロードの一意な識別子。正規エンコーディングのSHA-256。
///
/// 消費済みペイロード集合のキーとして使用し、リプレイを検出する。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// 「0x」プレフィックス付き（省略可）のhex文字列からパースする。
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| ParseError::Hex(e.to_string()))?;
        to_array(bytes).map(Self)
    }
}

impl fmt::Display for AuthorityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for AuthorityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorityKey({})", self.to_base58())
    }
}

impl fmt::Display for Beneficiary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Beneficiary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Beneficiary({})", self.to_base58())
    }
}

impl fmt::Debug for MintSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MintSignature({})", self.to_base64())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

// ---------------------------------------------------------------------------
// serde: 文字列表現
// ---------------------------------------------------------------------------

impl Serialize for AuthorityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for AuthorityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Beneficiary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Beneficiary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for MintSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for MintSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// MintPayload
// ---------------------------------------------------------------------------

/// ペイロードの構造的な不正。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// ミント量がゼロ
    #[error("amountは1以上である必要があります")]
    ZeroAmount,
    /// 有効期間がゼロ
    #[error("valid_forは1秒以上である必要があります")]
    ZeroValidity,
}

/// 管理者がオフチェーンで構築し、ユーザーに渡すミント承認ペイロード。
///
/// 各フィールドはワイヤから直接デシリアライズされるため、
/// 検証者は署名検証の前に [`MintPayload::validate`] を必ず通す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MintPayload {
    /// ミントの受益者
    pub beneficiary: Beneficiary,
    /// ミント量（1以上）
    pub amount: u128,
    /// 発行時刻（ホストの台帳時刻、UNIX秒）
    pub issued_at: u64,
    /// 有効期間（秒、1以上）
    pub valid_for: u64,
    /// 管理者が割り当てる一意な番号。同一秒に発行された同内容のペイロードを区別する。
    pub nonce: u64,
}

impl MintPayload {
    /// 構造検証済みのペイロードを構築する。
    pub fn new(
        beneficiary: Beneficiary,
        amount: u128,
        issued_at: u64,
        valid_for: u64,
        nonce: u64,
    ) -> Result<Self, PayloadError> {
        let payload = Self {
            beneficiary,
            amount,
            issued_at,
            valid_for,
            nonce,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// `amount > 0` かつ `valid_for > 0` を確認する。
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.amount == 0 {
            return Err(PayloadError::ZeroAmount);
        }
        if self.valid_for == 0 {
            return Err(PayloadError::ZeroValidity);
        }
        Ok(())
    }

    /// 有効期限（この時刻まで有効、境界を含む）。オーバーフロー時は`u64::MAX`で飽和する。
    pub fn expires_at(&self) -> u64 {
        self.issued_at.saturating_add(self.valid_for)
    }
}

// ---------------------------------------------------------------------------
// 判定結果
// ---------------------------------------------------------------------------

/// 承認判定の結果。拒否理由は検証ステージごとに一つずつ対応する閉じた列挙。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum Decision {
    /// 全検査を通過。呼び出し元は一回だけミントを実行してよい。
    Admitted = 0,
    /// amountまたはvalid_forがゼロ
    MalformedPayload = 1,
    /// `now > issued_at + valid_for`
    Expired = 2,
    /// 発行時刻が許容クロックスキューを超えて未来
    NotYetValid = 3,
    /// 既に承認済みのペイロード
    AlreadyConsumed = 4,
    /// 管理者鍵による署名として検証できない
    InvalidSignature = 5,
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted)
    }

    /// ホストがエラーを整数で返す場合の安定したコード。
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// 新しいペイロードを取得すれば再送で通る可能性があるか。
    /// 改ざん・不正署名は再送しても結果は変わらない。
    pub fn is_retryable_with_fresh_payload(&self) -> bool {
        matches!(self, Decision::Expired | Decision::NotYetValid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Admitted => "admitted",
            Decision::MalformedPayload => "malformed_payload",
            Decision::Expired => "expired",
            Decision::NotYetValid => "not_yet_valid",
            Decision::AlreadyConsumed => "already_consumed",
            Decision::InvalidSignature => "invalid_signature",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// コントラクトイベント
// ---------------------------------------------------------------------------

/// コントラクトが発行するイベント。インデクサ等の外部コラボレータが購読する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContractEvent {
    /// 管理者鍵が設定された
    Initialized { authority: AuthorityKey },
    /// 承認済みペイロードに基づいてミントが実行された
    Minted {
        beneficiary: Beneficiary,
        amount: u128,
        fingerprint: Fingerprint,
    },
}

/// ミント成功時の受領情報。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// ミントされた量
    pub amount: u128,
    /// 消費済みとして記録されたフィンガープリント
    pub fingerprint: Fingerprint,
}

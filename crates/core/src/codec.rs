//! # ペイロードの正規エンコーディング
//!
//! オフチェーン署名者とオンチェーン検証者が同一のバイト列を得るための固定長バイナリレイアウト。
//!
//! ## レイアウト v1（ビッグエンディアン、77バイト）
//! | offset | len | フィールド |
//! |--------|-----|-----------|
//! | 0 | 4 | マジック `NMNT` |
//! | 4 | 1 | レイアウトバージョン `0x01` |
//! | 5 | 32 | beneficiary |
//! | 37 | 16 | amount (u128) |
//! | 53 | 8 | issued_at (u64) |
//! | 61 | 8 | valid_for (u64) |
//! | 69 | 8 | nonce (u64) |
//!
//! 全フィールドが固定幅・固定順序なので、異なるペイロードが同じバイト列になることはない。
//! スキーマを変える場合はバージョンを上げる。

use nestera_types::{Beneficiary, Fingerprint, MintPayload};

/// エンコーディングの先頭に置くマジックバイト
pub const MAGIC: [u8; 4] = *b"NMNT";

/// 現行のレイアウトバージョン
pub const LAYOUT_VERSION: u8 = 1;

/// v1レイアウトのバイト長
pub const ENCODED_LEN: usize = 4 + 1 + 32 + 16 + 8 + 8 + 8;

/// デコードエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// 長さが固定長と一致しない
    #[error(
        "エンコード長が不正です: {actual} bytes (期待値: {expected} bytes)",
        expected = ENCODED_LEN
    )]
    InvalidLength { actual: usize },
    /// マジックバイトが一致しない
    #[error("マジックバイトが一致しません")]
    BadMagic,
    /// 未対応のレイアウトバージョン
    #[error("未対応のレイアウトバージョンです: {0}")]
    UnsupportedVersion(u8),
}

/// ペイロードを正規バイト列にエンコードする。
pub fn encode(payload: &MintPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENCODED_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(LAYOUT_VERSION);
    out.extend_from_slice(payload.beneficiary.as_bytes());
    out.extend_from_slice(&payload.amount.to_be_bytes());
    out.extend_from_slice(&payload.issued_at.to_be_bytes());
    out.extend_from_slice(&payload.valid_for.to_be_bytes());
    out.extend_from_slice(&payload.nonce.to_be_bytes());
    debug_assert_eq!(out.len(), ENCODED_LEN);
    out
}

/// 正規バイト列からペイロードを復元する。
///
/// amount/valid_forの構造検証は行わない（検証者の責務）。
pub fn decode(bytes: &[u8]) -> Result<MintPayload, CodecError> {
    if bytes.len() != ENCODED_LEN {
        return Err(CodecError::InvalidLength {
            actual: bytes.len(),
        });
    }
    if bytes[0..4] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    if bytes[4] != LAYOUT_VERSION {
        return Err(CodecError::UnsupportedVersion(bytes[4]));
    }

    let mut reader = Reader {
        buf: bytes,
        pos: 5,
    };
    Ok(MintPayload {
        beneficiary: Beneficiary(reader.take()),
        amount: u128::from_be_bytes(reader.take()),
        issued_at: u64::from_be_bytes(reader.take()),
        valid_for: u64::from_be_bytes(reader.take()),
        nonce: u64::from_be_bytes(reader.take()),
    })
}

/// ペイロードのフィンガープリント（正規エンコーディングのSHA-256）。
pub fn fingerprint(payload: &MintPayload) -> Fingerprint {
    Fingerprint(nestera_crypto::sha256(&encode(payload)))
}

/// 長さ検査済みバッファからの固定長読み取り。
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }
}

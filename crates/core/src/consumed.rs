//! # 消費済みペイロード集合
//!
//! 承認済みペイロードのフィンガープリントを記録し、リプレイを拒否する。
//! 永続化はホスト環境の責務で、このトレイトはその境界を定める。

use std::collections::HashMap;

use nestera_types::Fingerprint;

/// 消費済みペイロード集合の抽象インターフェース。
///
/// エントリは承認成功時にのみ追加される。削除は期限切れエントリの整理と、
/// 同一呼び出し内でミントが失敗した場合のロールバックに限られる。
pub trait ConsumedPayloadSet {
    /// フィンガープリントが記録済みか。
    fn contains(&self, fingerprint: &Fingerprint) -> bool;

    /// フィンガープリントを記録する。新規なら `true`、既存なら `false` を返し何もしない。
    fn insert(&mut self, fingerprint: Fingerprint, expires_at: u64) -> bool;

    /// フィンガープリントを削除する。存在した場合は `true`。
    fn remove(&mut self, fingerprint: &Fingerprint) -> bool;

    /// `now > expires_at` のエントリを削除し、削除件数を返す。
    ///
    /// 期限切れのペイロードはリプレイ検査より先に `Expired` で拒否されるため、
    /// ここで削除してもリプレイ耐性は失われない。
    fn prune_expired(&mut self, now: u64) -> usize;

    /// 記録済みエントリ数。
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// メモリ内の消費済みペイロード集合。
#[derive(Debug, Clone, Default)]
pub struct MemoryConsumedSet {
    /// フィンガープリント → 有効期限
    entries: HashMap<Fingerprint, u64>,
}

impl MemoryConsumedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録済みエントリの有効期限を返す。
    pub fn expires_at(&self, fingerprint: &Fingerprint) -> Option<u64> {
        self.entries.get(fingerprint).copied()
    }
}

impl ConsumedPayloadSet for MemoryConsumedSet {
    fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    fn insert(&mut self, fingerprint: Fingerprint, expires_at: u64) -> bool {
        if self.entries.contains_key(&fingerprint) {
            return false;
        }
        self.entries.insert(fingerprint, expires_at);
        true
    }

    fn remove(&mut self, fingerprint: &Fingerprint) -> bool {
        self.entries.remove(fingerprint).is_some()
    }

    fn prune_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| now <= *expires_at);
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

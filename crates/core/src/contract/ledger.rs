//! # ミント台帳
//!
//! 承認後に呼び出される特権的な状態変更（残高の増加）の抽象インターフェース。
//! 実際のトークン会計は外部の台帳・トークンモジュールが担う。

use std::collections::HashMap;
use std::fmt;

use nestera_types::Beneficiary;

/// ミント能力を持つ台帳。
pub trait MintLedger {
    /// 台帳固有のエラー
    type Error: fmt::Display;

    /// `beneficiary` に `amount` をミントする。失敗時は台帳の状態を変更しないこと。
    fn mint(&mut self, beneficiary: &Beneficiary, amount: u128) -> Result<(), Self::Error>;
}

/// メモリ内台帳のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// 残高または総供給量がオーバーフローする
    #[error("残高がオーバーフローします: {beneficiary}")]
    Overflow { beneficiary: Beneficiary },
    /// 台帳がミントを受け付けない状態
    #[error("台帳はミントを停止しています")]
    Paused,
}

/// メモリ内の残高台帳。
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    balances: HashMap<Beneficiary, u128>,
    total_supply: u128,
    paused: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, beneficiary: &Beneficiary) -> u128 {
        self.balances.get(beneficiary).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// ミントの受付を停止・再開する。
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

impl MintLedger for MemoryLedger {
    type Error = LedgerError;

    fn mint(&mut self, beneficiary: &Beneficiary, amount: u128) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }

        let overflow = || LedgerError::Overflow {
            beneficiary: *beneficiary,
        };
        let total_supply = self.total_supply.checked_add(amount).ok_or_else(overflow)?;
        let balance = self
            .balance(beneficiary)
            .checked_add(amount)
            .ok_or_else(overflow)?;

        self.total_supply = total_supply;
        self.balances.insert(*beneficiary, balance);
        Ok(())
    }
}

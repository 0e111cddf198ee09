//! # ミントコントラクトのエントリポイント
//!
//! ホスト環境から呼ばれる唯一の入口。管理者鍵と消費済み集合を永続状態として保持し、
//! 承認判定とミントを一つの不可分な単位として実行する。
//!
//! ## 処理フロー（mint）
//! 1. 初期化済みか確認
//! 2. AuthorizationVerifierで判定（Admitted時のみフィンガープリントを記録）
//! 3. MintLedgerでミントを実行
//! 4. ミント失敗時はフィンガープリントの記録を取り消す
//!
//! 各呼び出しは `&mut self` を取るため、同一インスタンスへの呼び出しは直列化される。
//! 複数プロセス間の直列化はホストのトランザクションモデルに委ねる。

mod ledger;

#[cfg(test)]
mod tests;

pub use ledger::{LedgerError, MemoryLedger, MintLedger};

use nestera_crypto::{Ed25519Scheme, SignatureScheme};
use nestera_types::{
    AuthorityKey, ContractEvent, Decision, MintPayload, MintReceipt, MintSignature,
};

use crate::config::VerifierConfig;
use crate::consumed::{ConsumedPayloadSet, MemoryConsumedSet};
use crate::verifier::Verifier;

/// コントラクトのエラー型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// 既に初期化済み
    #[error("コントラクトは既に初期化されています")]
    AlreadyInitialized,
    /// 未初期化
    #[error("コントラクトが初期化されていません")]
    NotInitialized,
    /// 承認判定で拒否された
    #[error("ミント承認が拒否されました: {0}")]
    Rejected(Decision),
    /// 台帳へのミントに失敗（承認記録はロールバック済み）
    #[error("台帳へのミントに失敗: {0}")]
    Ledger(String),
}

impl ContractError {
    /// 拒否理由（承認判定による拒否の場合のみ）。
    pub fn decision(&self) -> Option<Decision> {
        match self {
            ContractError::Rejected(decision) => Some(*decision),
            _ => None,
        }
    }
}

/// ミント承認コントラクト。
pub struct MintContract<S = Ed25519Scheme, C = MemoryConsumedSet> {
    verifier: Verifier<S>,
    /// 管理者鍵（initialize後に一度だけ設定）
    authority: Option<AuthorityKey>,
    /// 消費済みペイロード集合
    consumed: C,
    /// 未取得のイベント
    events: Vec<ContractEvent>,
}

impl MintContract {
    /// Ed25519方式・メモリ内消費済み集合で構築する。
    pub fn ed25519(config: VerifierConfig) -> Self {
        Self::new(Verifier::ed25519(config), MemoryConsumedSet::new())
    }
}

impl<S, C> MintContract<S, C>
where
    S: SignatureScheme,
    C: ConsumedPayloadSet,
{
    /// 検証者と（永続化済みの）消費済み集合から構築する。管理者鍵は未設定。
    pub fn new(verifier: Verifier<S>, consumed: C) -> Self {
        Self {
            verifier,
            authority: None,
            consumed,
            events: Vec::new(),
        }
    }

    /// 永続化された状態から復元する。
    pub fn restore(verifier: Verifier<S>, authority: Option<AuthorityKey>, consumed: C) -> Self {
        Self {
            verifier,
            authority,
            consumed,
            events: Vec::new(),
        }
    }

    /// 管理者鍵を設定する。一度しか呼べない。
    pub fn initialize(&mut self, authority: AuthorityKey) -> Result<(), ContractError> {
        if self.authority.is_some() {
            tracing::warn!(%authority, "二重初期化を拒否");
            return Err(ContractError::AlreadyInitialized);
        }

        self.authority = Some(authority);
        self.events.push(ContractEvent::Initialized { authority });
        tracing::info!(%authority, "コントラクトを初期化");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.authority.is_some()
    }

    /// 設定済みの管理者鍵を返す。オフチェーン検証・デバッグ用。
    pub fn admin_public_key(&self) -> Result<AuthorityKey, ContractError> {
        self.authority.ok_or(ContractError::NotInitialized)
    }

    /// 状態を変更せずに、ペイロードと署名がこの時点で承認されるかを検査する。
    pub fn verify_signature(
        &self,
        payload: &MintPayload,
        signature: &MintSignature,
        now: u64,
    ) -> Result<(), ContractError> {
        let authority = self.admin_public_key()?;
        match self
            .verifier
            .check(payload, signature, now, &authority, &self.consumed)
        {
            Decision::Admitted => Ok(()),
            rejected => Err(ContractError::Rejected(rejected)),
        }
    }

    /// 管理者署名を検証し、承認されればミントを実行してミント量を返す。
    ///
    /// 拒否時・ミント失敗時はいずれも状態を変更しない。
    pub fn mint<L>(
        &mut self,
        payload: &MintPayload,
        signature: &MintSignature,
        now: u64,
        ledger: &mut L,
    ) -> Result<MintReceipt, ContractError>
    where
        L: MintLedger + ?Sized,
    {
        let authority = self.admin_public_key()?;

        let evaluation = self.verifier.authorize_with_fingerprint(
            payload,
            signature,
            now,
            &authority,
            &mut self.consumed,
        );
        if !evaluation.decision.is_admitted() {
            return Err(ContractError::Rejected(evaluation.decision));
        }

        if let Err(e) = ledger.mint(&payload.beneficiary, payload.amount) {
            self.consumed.remove(&evaluation.fingerprint);
            tracing::warn!(
                fingerprint = %evaluation.fingerprint,
                error = %e,
                "ミントに失敗したため承認記録をロールバック"
            );
            return Err(ContractError::Ledger(e.to_string()));
        }

        self.events.push(ContractEvent::Minted {
            beneficiary: payload.beneficiary,
            amount: payload.amount,
            fingerprint: evaluation.fingerprint,
        });
        tracing::info!(
            beneficiary = %payload.beneficiary,
            amount = %payload.amount,
            "ミント完了"
        );

        Ok(MintReceipt {
            amount: payload.amount,
            fingerprint: evaluation.fingerprint,
        })
    }

    /// 期限切れの消費済みエントリを整理する。
    pub fn prune_consumed(&mut self, now: u64) -> usize {
        let pruned = self.consumed.prune_expired(now);
        if pruned > 0 {
            tracing::debug!(pruned, now, "期限切れの消費済みエントリを削除");
        }
        pruned
    }

    /// 消費済み集合への参照（永続化用）。
    pub fn consumed(&self) -> &C {
        &self.consumed
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// 蓄積されたイベントを取り出す。
    pub fn take_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

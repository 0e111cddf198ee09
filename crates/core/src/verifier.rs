//! # 承認検証
//!
//! ペイロード・署名・現在時刻・管理者鍵・消費済み集合から承認判定を導く。
//!
//! ## 検査順序（安価なものから、最初の失敗で打ち切り）
//! 1. 構造検証（amount > 0, valid_for > 0）
//! 2. 有効期限・未来発行の検査
//! 3. リプレイ検査（フィンガープリント）
//! 4. 署名検証（最も高価。状態変更より必ず前）
//! 5. 全通過時のみフィンガープリントを記録
//!
//! 拒否時は状態を一切変更しない。内部での再試行もしない。

use nestera_crypto::{Ed25519Scheme, SignatureScheme};
use nestera_types::{AuthorityKey, Decision, Fingerprint, MintPayload, MintSignature};

use crate::codec;
use crate::config::VerifierConfig;
use crate::consumed::ConsumedPayloadSet;

/// 判定結果と、判定に使ったフィンガープリント。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    pub fingerprint: Fingerprint,
}

/// AuthorizationVerifier。署名方式と設定のみを保持し、状態は引数で受け取る。
#[derive(Debug, Clone)]
pub struct Verifier<S> {
    scheme: S,
    config: VerifierConfig,
}

impl Verifier<Ed25519Scheme> {
    /// Ed25519方式の検証者を構築する。
    pub fn ed25519(config: VerifierConfig) -> Self {
        Self::new(Ed25519Scheme, config)
    }
}

impl<S: SignatureScheme> Verifier<S> {
    pub fn new(scheme: S, config: VerifierConfig) -> Self {
        Self { scheme, config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// 承認判定を行い、`Admitted` の場合のみフィンガープリントを記録する。
    ///
    /// `Admitted` を受け取った呼び出し元は、このペイロードに対して一回だけミントを実行してよい。
    pub fn authorize<C>(
        &self,
        payload: &MintPayload,
        signature: &MintSignature,
        now: u64,
        authority: &AuthorityKey,
        consumed: &mut C,
    ) -> Decision
    where
        C: ConsumedPayloadSet + ?Sized,
    {
        self.authorize_with_fingerprint(payload, signature, now, authority, consumed)
            .decision
    }

    /// [`Verifier::authorize`] と同じだが、フィンガープリントも返す。
    pub fn authorize_with_fingerprint<C>(
        &self,
        payload: &MintPayload,
        signature: &MintSignature,
        now: u64,
        authority: &AuthorityKey,
        consumed: &mut C,
    ) -> Evaluation
    where
        C: ConsumedPayloadSet + ?Sized,
    {
        let evaluation = self.evaluate(payload, signature, now, authority, &*consumed);
        if !evaluation.decision.is_admitted() {
            return evaluation;
        }

        if !consumed.insert(evaluation.fingerprint, payload.expires_at()) {
            // 判定直後に同じフィンガープリントが現れるのはホストが直列化を守っていない場合のみ
            tracing::warn!(
                fingerprint = %evaluation.fingerprint,
                "承認直前に消費済みとなっていました"
            );
            return Evaluation {
                decision: Decision::AlreadyConsumed,
                ..evaluation
            };
        }

        tracing::info!(
            beneficiary = %payload.beneficiary,
            amount = %payload.amount,
            nonce = payload.nonce,
            fingerprint = %evaluation.fingerprint,
            "ミント承認"
        );
        evaluation
    }

    /// 状態を変更せずに判定のみ行う（検査1〜4）。
    pub fn check<C>(
        &self,
        payload: &MintPayload,
        signature: &MintSignature,
        now: u64,
        authority: &AuthorityKey,
        consumed: &C,
    ) -> Decision
    where
        C: ConsumedPayloadSet + ?Sized,
    {
        self.evaluate(payload, signature, now, authority, consumed)
            .decision
    }

    fn evaluate<C>(
        &self,
        payload: &MintPayload,
        signature: &MintSignature,
        now: u64,
        authority: &AuthorityKey,
        consumed: &C,
    ) -> Evaluation
    where
        C: ConsumedPayloadSet + ?Sized,
    {
        let encoded = codec::encode(payload);
        let fingerprint = Fingerprint(nestera_crypto::sha256(&encoded));
        let decision = self.decide(
            payload,
            &encoded,
            &fingerprint,
            signature,
            now,
            authority,
            consumed,
        );

        if !decision.is_admitted() {
            tracing::debug!(
                scheme = self.scheme.name(),
                reason = %decision,
                fingerprint = %fingerprint,
                now,
                issued_at = payload.issued_at,
                valid_for = payload.valid_for,
                "ミント承認を拒否"
            );
        }

        Evaluation {
            decision,
            fingerprint,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn decide<C>(
        &self,
        payload: &MintPayload,
        encoded: &[u8],
        fingerprint: &Fingerprint,
        signature: &MintSignature,
        now: u64,
        authority: &AuthorityKey,
        consumed: &C,
    ) -> Decision
    where
        C: ConsumedPayloadSet + ?Sized,
    {
        if payload.validate().is_err() {
            return Decision::MalformedPayload;
        }

        if now > payload.expires_at() {
            return Decision::Expired;
        }
        if payload.issued_at > now.saturating_add(self.config.clock_skew_secs) {
            return Decision::NotYetValid;
        }

        if consumed.contains(fingerprint) {
            return Decision::AlreadyConsumed;
        }

        if !self.scheme.verify(authority, encoded, signature) {
            return Decision::InvalidSignature;
        }

        Decision::Admitted
    }
}

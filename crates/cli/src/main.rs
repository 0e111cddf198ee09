//! # Nestera Mint 管理者CLI
//!
//! 管理者がオフチェーンでミント承認ペイロードを発行するためのツール。
//!
//! ## サブコマンド
//! - `keygen` — 管理者用Ed25519キーペアを生成
//! - `sign` — ペイロードを構築し、正規エンコーディングに署名
//! - `encode` / `decode` — 正規エンコーディングとJSON表現の相互変換
//! - `verify` — コントラクトと同じ手順で承認判定を試算（状態は持たない）
//!
//! 秘密鍵は `--secret-key` または環境変数 `NESTERA_AUTHORITY_SECRET`（hex）で渡す。

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;

use nestera_core::{codec, MemoryConsumedSet, Verifier, VerifierConfig};
use nestera_crypto::{authority_key_of, sign_message, Ed25519SigningKey};
use nestera_types::{AuthorityKey, Beneficiary, Decision, Fingerprint, MintPayload, MintSignature};

/// 管理者秘密鍵の環境変数名
const SECRET_ENV: &str = "NESTERA_AUTHORITY_SECRET";

#[derive(Parser)]
#[command(name = "nestera-cli", version, about = "Nestera mint authority tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 管理者用Ed25519キーペアを生成する
    Keygen,
    /// ミント承認ペイロードを構築して署名する
    Sign {
        /// 管理者秘密鍵（hex、32バイト）。未指定時は環境変数から読む
        #[arg(long)]
        secret_key: Option<String>,
        /// 受益者（Base58）
        #[arg(long)]
        beneficiary: String,
        /// ミント量
        #[arg(long)]
        amount: u128,
        /// 発行時刻（UNIX秒）。未指定時は現在時刻
        #[arg(long)]
        issued_at: Option<u64>,
        /// 有効期間（秒）
        #[arg(long, default_value_t = 3600)]
        valid_for: u64,
        /// 一意な番号。未指定時はランダム
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// ペイロードJSONを正規エンコーディング（hex）に変換する
    Encode {
        /// ペイロードJSON
        #[arg(long)]
        payload: String,
    },
    /// 正規エンコーディング（hex）をペイロードJSONに変換する
    Decode {
        /// 正規エンコーディング（hex）
        #[arg(long)]
        hex: String,
    },
    /// 承認判定を試算する
    Verify {
        /// 管理者公開鍵（Base58）
        #[arg(long)]
        authority: String,
        /// ペイロードJSON
        #[arg(long)]
        payload: String,
        /// 署名（Base64）
        #[arg(long)]
        signature: String,
        /// 判定時刻（UNIX秒）。未指定時は現在時刻
        #[arg(long)]
        now: Option<u64>,
        /// 許容クロックスキュー（秒）。未指定時は環境変数・デフォルト値
        #[arg(long)]
        clock_skew: Option<u64>,
    },
}

/// keygenの出力
#[derive(Serialize)]
struct KeygenOutput {
    secret_key: String,
    authority: AuthorityKey,
}

/// signの出力。ユーザーはpayloadとsignatureをコントラクトに提出する。
#[derive(Serialize)]
struct SignOutput {
    payload: MintPayload,
    encoded: String,
    signature: MintSignature,
    fingerprint: Fingerprint,
}

/// verifyの出力
#[derive(Serialize)]
struct VerifyOutput {
    decision: Decision,
    fingerprint: Fingerprint,
    now: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Keygen => print_json(&keygen()),
        Command::Sign {
            secret_key,
            beneficiary,
            amount,
            issued_at,
            valid_for,
            nonce,
        } => {
            let secret = match secret_key {
                Some(s) => s,
                None => std::env::var(SECRET_ENV).with_context(|| {
                    format!("--secret-key または {SECRET_ENV} を指定してください")
                })?,
            };
            let signing_key = parse_secret_key(&secret)?;
            let beneficiary = Beneficiary::from_base58(&beneficiary)
                .context("beneficiaryのパースに失敗")?;
            let payload = MintPayload::new(
                beneficiary,
                amount,
                issued_at.unwrap_or_else(unix_now),
                valid_for,
                nonce.unwrap_or_else(rand::random),
            )?;
            print_json(&sign(&signing_key, payload))
        }
        Command::Encode { payload } => {
            let payload = parse_payload(&payload)?;
            println!("{}", hex::encode(codec::encode(&payload)));
            Ok(())
        }
        Command::Decode { hex: encoded } => {
            let bytes = hex::decode(encoded.trim_start_matches("0x"))
                .context("hexデコードに失敗")?;
            print_json(&codec::decode(&bytes)?)
        }
        Command::Verify {
            authority,
            payload,
            signature,
            now,
            clock_skew,
        } => {
            let authority =
                AuthorityKey::from_base58(&authority).context("authorityのパースに失敗")?;
            let payload = parse_payload(&payload)?;
            let signature =
                MintSignature::from_base64(&signature).context("signatureのパースに失敗")?;

            let mut config = VerifierConfig::from_env();
            if let Some(skew) = clock_skew {
                config.clock_skew_secs = skew;
            }

            let output = verify(
                config,
                &authority,
                &payload,
                &signature,
                now.unwrap_or_else(unix_now),
            );
            print_json(&output)?;
            if !output.decision.is_admitted() {
                bail!("承認されません: {}", output.decision);
            }
            Ok(())
        }
    }
}

fn keygen() -> KeygenOutput {
    let signing_key = Ed25519SigningKey::generate(&mut rand::rngs::OsRng);
    tracing::info!("管理者キーペアを生成");
    KeygenOutput {
        secret_key: hex::encode(signing_key.to_bytes()),
        authority: authority_key_of(&signing_key),
    }
}

fn sign(signing_key: &Ed25519SigningKey, payload: MintPayload) -> SignOutput {
    let encoded = codec::encode(&payload);
    let signature = sign_message(signing_key, &encoded);
    tracing::info!(
        beneficiary = %payload.beneficiary,
        amount = %payload.amount,
        nonce = payload.nonce,
        "ペイロードに署名"
    );
    SignOutput {
        payload,
        encoded: hex::encode(&encoded),
        signature,
        fingerprint: codec::fingerprint(&payload),
    }
}

/// 空の消費済み集合に対して判定する。実際のリプレイ状態はコントラクト側にしかない。
fn verify(
    config: VerifierConfig,
    authority: &AuthorityKey,
    payload: &MintPayload,
    signature: &MintSignature,
    now: u64,
) -> VerifyOutput {
    let verifier = Verifier::ed25519(config);
    let consumed = MemoryConsumedSet::new();
    let decision = verifier.check(payload, signature, now, authority, &consumed);
    VerifyOutput {
        decision,
        fingerprint: codec::fingerprint(payload),
        now,
    }
}

fn parse_secret_key(s: &str) -> anyhow::Result<Ed25519SigningKey> {
    let bytes = hex::decode(s.trim().trim_start_matches("0x"))
        .context("秘密鍵のhexデコードに失敗")?;
    let bytes: [u8; 32] = match bytes.try_into() {
        Ok(b) => b,
        Err(v) => bail!("秘密鍵は32バイトである必要があります: {} bytes", v.len()),
    };
    Ok(Ed25519SigningKey::from_bytes(&bytes))
}

fn parse_payload(s: &str) -> anyhow::Result<MintPayload> {
    serde_json::from_str(s).context("ペイロードJSONのパースに失敗")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

//! # 検証者設定
//!
//! 環境変数からの設定読み込み。

/// クロックスキュー許容値の環境変数名
pub const CLOCK_SKEW_ENV: &str = "NESTERA_CLOCK_SKEW_SECS";

/// 発行時刻の未来方向の許容クロックスキュー（秒）のデフォルト値。
/// ゼロの場合、`issued_at > now` のペイロードは `NotYetValid` となる。
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 0;

/// AuthorizationVerifierの設定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    /// `issued_at` が `now` より未来でも許容する秒数
    pub clock_skew_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
        }
    }
}

impl VerifierConfig {
    /// 環境変数から構築する。未設定・パース不能な値はデフォルトにフォールバックする。
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let clock_skew_secs = match lookup(CLOCK_SKEW_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        value = %raw,
                        error = %e,
                        "{}をパースできません。デフォルト値を使用します",
                        CLOCK_SKEW_ENV
                    );
                    DEFAULT_CLOCK_SKEW_SECS
                }
            },
            None => DEFAULT_CLOCK_SKEW_SECS,
        };

        tracing::debug!(clock_skew_secs, "検証者設定を読み込み");
        Self { clock_skew_secs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_zero_skew() {
        assert_eq!(VerifierConfig::default().clock_skew_secs, 0);
    }

    #[test]
    fn test_from_lookup_reads_value() {
        let config = VerifierConfig::from_lookup(|key| {
            (key == CLOCK_SKEW_ENV).then(|| " 30 ".to_string())
        });
        assert_eq!(config.clock_skew_secs, 30);
    }

    #[test]
    fn test_from_lookup_falls_back_on_garbage() {
        let config = VerifierConfig::from_lookup(|_| Some("soon".to_string()));
        assert_eq!(config, VerifierConfig::default());
    }

    #[test]
    fn test_from_lookup_unset() {
        let config = VerifierConfig::from_lookup(|_| None);
        assert_eq!(config, VerifierConfig::default());
    }
}

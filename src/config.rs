//! パーサー設定管理モジュール
//!
//! TOMLファイルからパーサーの動作設定を読み込み・保存します。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// `timeoutMs` を導出できない場合のポーリング間隔（ミリ秒）
pub const DEFAULT_TIMEOUT_MS: i64 = 10_000;

/// 投稿者チャンネルURLのプレフィックス
pub const CHANNEL_URL_PREFIX: &str = "http://www.youtube.com/channel/";

/// パーサー設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// アーカイブ（リプレイ）チャットとして解析するか
    pub is_replay: bool,
    /// 最終的なフォールバック間隔
    pub default_timeout_ms: i64,
    /// チャンネルURL生成に使うプレフィックス
    pub channel_url_prefix: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            is_replay: false,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            channel_url_prefix: CHANNEL_URL_PREFIX.to_string(),
        }
    }
}

impl ParserConfig {
    /// モード指定でデフォルト設定を作成
    pub fn with_mode(is_replay: bool) -> Self {
        Self {
            is_replay,
            ..Self::default()
        }
    }

    /// TOML文字列から設定を読み込み
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse parser config")
    }

    /// 設定ファイルを読み込み
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(
            is_replay = config.is_replay,
            default_timeout_ms = config.default_timeout_ms,
            "Parser config loaded from {}",
            path.display()
        );

        Ok(config)
    }

    /// 設定を保存
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!("💾 Parser config saved to: {}", path.display());

        Ok(())
    }
}

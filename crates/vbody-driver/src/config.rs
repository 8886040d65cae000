//! 会话配置
//!
//! 纯数据结构（POD），可从 TOML 加载。

use crate::error::DriverError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Spine 会话配置
///
/// # Example
///
/// ```
/// use vbody_driver::SpineConfig;
///
/// let config = SpineConfig::from_toml_str("read_only = true\nstartup_settle_ms = 0").unwrap();
/// assert!(config.read_only);
/// assert_eq!(config.command_period_ms, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpineConfig {
    /// 只读模式：不启动命令线程（采集和按键检测照常运行）
    pub read_only: bool,
    /// 命令线程周期（毫秒）
    pub command_period_ms: u64,
    /// `stop()` 等待工作线程退出的上限（毫秒）
    pub stop_grace_ms: u64,
    /// 预热探测最多读取的帧数
    pub warmup_attempts: u32,
    /// 预热探测两次读取之间的间隔（毫秒）
    pub warmup_retry_ms: u64,
    /// 工作线程启动后 `init()` 返回前的等待时间（毫秒）
    pub startup_settle_ms: u64,
    /// 命令序号初值
    pub command_seq_seed: u32,
    /// 超过此时间未收到帧即认为链路失联（毫秒）
    pub connection_timeout_ms: u64,
}

impl Default for SpineConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            command_period_ms: 10,
            stop_grace_ms: 50,
            warmup_attempts: 11,
            warmup_retry_ms: 10,
            startup_settle_ms: 1000,
            command_seq_seed: 8888,
            connection_timeout_ms: 500,
        }
    }
}

impl SpineConfig {
    /// 从 TOML 文本解析，缺省字段使用默认值
    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        let config: SpineConfig =
            toml::from_str(content).map_err(|e| DriverError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DriverError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 检查取值范围
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.command_period_ms == 0 {
            return Err(DriverError::Config(
                "command_period_ms must be greater than 0".to_string(),
            ));
        }
        if self.warmup_attempts == 0 {
            return Err(DriverError::Config(
                "warmup_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn command_period(&self) -> Duration {
        Duration::from_millis(self.command_period_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn warmup_retry(&self) -> Duration {
        Duration::from_millis(self.warmup_retry_ms)
    }

    pub fn startup_settle(&self) -> Duration {
        Duration::from_millis(self.startup_settle_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

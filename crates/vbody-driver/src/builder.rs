//! Builder 模式实现
//!
//! 提供链式构造 `Spine` 实例的便捷方式。

use crate::config::SpineConfig;
use crate::error::DriverError;
use crate::spine::Spine;
use std::path::Path;
use std::sync::Arc;
use vbody_spine::SpineTransport;

/// Spine Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use vbody_driver::SpineBuilder;
/// # fn example(transport: impl vbody_spine::SpineTransport + 'static) {
/// let spine = SpineBuilder::new()
///     .read_only(true)
///     .stop_grace_ms(100)
///     .build(transport)
///     .unwrap();
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpineBuilder {
    config: SpineConfig,
}

impl SpineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以完整配置为起点
    pub fn config(mut self, config: SpineConfig) -> Self {
        self.config = config;
        self
    }

    /// 从 TOML 文件加载配置
    pub fn config_file<P: AsRef<Path>>(self, path: P) -> Result<Self, DriverError> {
        Ok(self.config(SpineConfig::load_from_file(path)?))
    }

    /// 只读模式：不写入任何指令
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    pub fn command_period_ms(mut self, period_ms: u64) -> Self {
        self.config.command_period_ms = period_ms;
        self
    }

    pub fn stop_grace_ms(mut self, grace_ms: u64) -> Self {
        self.config.stop_grace_ms = grace_ms;
        self
    }

    /// `init()` 返回前的稳定等待（测试中通常设为 0）
    pub fn startup_settle_ms(mut self, settle_ms: u64) -> Self {
        self.config.startup_settle_ms = settle_ms;
        self
    }

    /// 校验配置并创建会话（不打开链路）
    pub fn build(self, transport: impl SpineTransport + 'static) -> Result<Spine, DriverError> {
        self.build_shared(Arc::new(transport))
    }

    /// 与 `build` 相同，传输层由调用方共享持有
    pub fn build_shared(self, transport: Arc<dyn SpineTransport>) -> Result<Spine, DriverError> {
        self.config.validate()?;
        Ok(Spine::new(transport, self.config))
    }
}

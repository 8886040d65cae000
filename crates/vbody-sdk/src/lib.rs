//! vbody SDK - 机身 spine 链路 Rust SDK
//!
//! 负责与机身控制板之间的帧交换：持续采集传感器帧、按固定周期下发电机/LED 指令、
//! 检测背部按键事件。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 原始帧/解码帧类型、指令打包、LED 常量
//! - **传输层** (`spine`): 传输能力 trait 和错误分类
//! - **驱动层** (`driver`): 会话生命周期、工作线程、扇出、按键检测
//!
//! # 快速开始
//!
//! ```no_run
//! use vbody_sdk::prelude::*;
//!
//! # fn example(transport: impl SpineTransport + 'static) -> Result<(), DriverError> {
//! vbody_sdk::init_logger();
//!
//! let spine = SpineBuilder::new().build(transport)?;
//! spine.init()?;
//! spine.set_motor_command(10, 10, 0, 0)?;
//!
//! let frames = spine.frames()?;
//! if let Ok(frame) = frames.recv() {
//!     println!("battery {} mV", frame.batt_voltage);
//! }
//! spine.stop();
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub use vbody_driver as driver;
pub use vbody_protocol as protocol;
pub use vbody_spine as spine;

// --- 用户以此为界 ---

pub use driver::{
    ButtonEvent, DriverError, MetricsSnapshot, SessionFault, SessionState, Spine, SpineBuilder,
    SpineConfig,
};
pub use protocol::{
    CommandState, DataFrame, LED_BLUE, LED_GREEN, LED_OFF, LED_RED, MotorIndex, ProtocolError,
};
pub use spine::{SpineHandle, SpineTransport, TransportError};

#[cfg(feature = "mock")]
pub use spine::MockTransport;

/// 默认日志过滤级别（未设置 `RUST_LOG` 时）
const DEFAULT_LOG_FILTER: &str = "info";

/// 初始化日志
///
/// 安装 `tracing-subscriber` 的 fmt 订阅者，过滤规则取自 `RUST_LOG`（缺省 `info`），
/// 并把 `log` 记录桥接到 `tracing`。重复调用是安全的，只有第一次生效。
///
/// 返回本次调用是否安装了订阅者。
pub fn init_logger() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let installed = tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok();

    // fmt 订阅者已安装桥接时这里返回错误，忽略即可
    let _ = tracing_log::LogTracer::init();

    if installed {
        tracing::debug!("Logger initialized");
    }
    installed
}

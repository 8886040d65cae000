//! 驱动层模块
//!
//! 本模块提供机身 spine 链路的会话管理，包括：
//! - 会话生命周期（init/stop，可重复调用）
//! - 采集线程：连续读取、解码、隔帧扇出
//! - 命令线程：固定周期写入指令快照（ArcSwap 无锁读取）
//! - 按键边沿检测
//! - 单槽“最新值优先”交接点
//!
//! # 使用场景
//!
//! 大多数用户通过 [`SpineBuilder`] 创建 [`Spine`]，然后从 `frames()`/`buttons()` 接收数据。

mod builder;
pub mod button;
pub mod config;
mod error;
pub mod fanout;
pub mod heartbeat;
pub mod metrics;
pub mod pipeline;
pub mod slot;
mod spine;
pub mod state;

pub use builder::SpineBuilder;
pub use button::{ButtonEdgeDetector, ButtonEvent};
pub use config::SpineConfig;
pub use error::{DriverError, FaultSource, SessionFault};
pub use fanout::FrameFanout;
pub use heartbeat::ConnectionMonitor;
pub use metrics::{MetricsSnapshot, SpineMetrics};
pub use slot::{LatestSlot, OfferOutcome, latest_slot};
pub use spine::Spine;
pub use state::{AtomicSessionState, SessionState, SpineContext};

pub use vbody_protocol::{
    CommandState, DataFrame, LED_BLUE, LED_GREEN, LED_OFF, LED_RED, MotorIndex, MotorStatus,
};

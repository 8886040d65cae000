//! # vbody Protocol
//!
//! 机身 spine 链路的语义化帧定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量（LED 颜色、通道数量、缩放比例）
//! - `feedback`: 原始帧与解码后的 `DataFrame`，以及解码函数
//! - `control`: 执行器指令状态与打包
//!
//! 原始帧的字节布局、CRC 与同步由传输层负责，本 crate 只处理已按字段拆分的数据。

pub mod constants;
pub mod control;
pub mod feedback;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;

use thiserror::Error;

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

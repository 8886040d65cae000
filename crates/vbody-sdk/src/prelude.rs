//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use vbody_sdk::prelude::*;
//! ```

// 会话
pub use crate::driver::{ButtonEvent, SessionFault, SessionState, Spine, SpineBuilder, SpineConfig};

// 帧与指令
pub use crate::protocol::{
    CommandState, DataFrame, LED_BLUE, LED_GREEN, LED_OFF, LED_RED, MotorIndex,
};

// 传输层（常用 Trait）
pub use crate::spine::{SpineHandle, SpineTransport};

// 错误类型
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::spine::TransportError;

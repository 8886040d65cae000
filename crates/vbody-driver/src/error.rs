//! 驱动层错误类型定义

use std::fmt;
use thiserror::Error;
use vbody_spine::TransportError;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 无法获得传输层句柄
    #[error("Failed to open spine transport: {0}")]
    InitFailure(#[source] TransportError),

    /// 预热探测期间机身没有返回有效帧
    #[error("Body did not return a valid frame after {attempts} tries")]
    LinkNotResponding { attempts: u32 },

    /// 会话未运行
    #[error("Spine not initialized")]
    NotInitialized,

    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 工作线程启动失败
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// 配置错误
    #[error("Invalid config: {0}")]
    Config(String),
}

/// 故障来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSource {
    /// 采集线程（读取）
    Acquisition,
    /// 命令线程（写入）
    Command,
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultSource::Acquisition => write!(f, "acquisition"),
            FaultSource::Command => write!(f, "command"),
        }
    }
}

/// 会话故障事件
///
/// 工作线程遇到致命传输错误时发布，随后会话进入 `Faulted` 状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFault {
    pub source: FaultSource,
    pub message: String,
}

impl fmt::Display for SessionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} worker fault: {}", self.source, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbody_spine::{SpineDeviceError, SpineDeviceErrorKind};

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::LinkNotResponding { attempts: 11 };
        assert_eq!(
            format!("{}", err),
            "Body did not return a valid frame after 11 tries"
        );

        assert_eq!(
            format!("{}", DriverError::NotInitialized),
            "Spine not initialized"
        );

        let err = DriverError::InitFailure(TransportError::Device(SpineDeviceError::new(
            SpineDeviceErrorKind::NotFound,
            "no tty",
        )));
        let msg = format!("{}", err);
        assert!(msg.contains("open spine transport") && msg.contains("no tty"));
    }

    #[test]
    fn test_from_transport_error() {
        let err: DriverError = TransportError::Timeout.into();
        assert!(matches!(err, DriverError::Transport(TransportError::Timeout)));
    }

    #[test]
    fn test_session_fault_display() {
        let fault = SessionFault {
            source: FaultSource::Command,
            message: "Transport closed".to_string(),
        };
        assert_eq!(format!("{}", fault), "command worker fault: Transport closed");
    }
}

//! # vbody Spine Transport Layer
//!
//! spine 传输能力抽象。字节级成帧、CRC、串口同步都在实现方内部完成，
//! 驱动层只通过 [`SpineTransport`] 的四个操作与机身交互。

use std::fmt;
use std::io;
use thiserror::Error;

pub use vbody_protocol::{RawDataFrame, SpineCommand};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] SpineDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Transport not open")]
    NotOpen,
    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// 是否为致命错误（链路已不可用，会话应当终止）
    pub fn is_fatal(&self) -> bool {
        match self {
            TransportError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::NotFound
            ),
            TransportError::Device(e) => e.is_fatal(),
            TransportError::NotOpen | TransportError::Closed => true,
            TransportError::Timeout => false,
        }
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpineDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SpineDeviceError {
    pub kind: SpineDeviceErrorKind,
    pub message: String,
}

impl SpineDeviceError {
    pub fn new(kind: SpineDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SpineDeviceErrorKind::NoDevice
                | SpineDeviceErrorKind::AccessDenied
                | SpineDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for SpineDeviceError {
    fn from(message: String) -> Self {
        Self::new(SpineDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SpineDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SpineDeviceErrorKind::Unknown, message)
    }
}

/// spine 链路句柄（不透明，恒为正数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpineHandle(u32);

impl SpineHandle {
    pub fn new(id: u32) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// 从底层库返回的原始句柄构造，`<= 0` 视为打开失败
    pub fn from_raw(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().and_then(Self::new)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// spine 传输能力
///
/// 读写可以在不同线程上并发调用（采集线程只读、命令线程只写），
/// 实现方需要自行保证内部同步。`close` 只由会话管理器调用。
pub trait SpineTransport: Send + Sync {
    /// 打开链路并返回句柄
    fn open(&self) -> Result<SpineHandle, TransportError>;

    /// 阻塞读取一帧
    fn read_frame(&self, handle: SpineHandle) -> Result<RawDataFrame, TransportError>;

    /// 写入一条指令
    fn write_command(
        &self,
        handle: SpineHandle,
        command: &SpineCommand,
    ) -> Result<(), TransportError>;

    /// 关闭链路
    fn close(&self, handle: SpineHandle);
}

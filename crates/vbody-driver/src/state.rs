//! 会话状态与共享上下文
//!
//! 会话生命周期：`Uninitialized → Initializing → Running → Stopped`，
//! 工作线程遇到致命传输错误时进入 `Faulted`。
//! 所有工作线程在每次迭代前读取状态，离开 `Running` 后在一次阻塞调用内退出。

use crate::heartbeat::ConnectionMonitor;
use crate::metrics::SpineMetrics;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use vbody_protocol::CommandState;

/// 会话生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    /// 未初始化（默认）
    #[default]
    Uninitialized = 0,
    /// 正在打开传输层
    Initializing = 1,
    /// 链路已验证，工作线程运行中
    Running = 2,
    /// 已停止
    Stopped = 3,
    /// 工作线程遇到致命错误
    Faulted = 4,
}

impl SessionState {
    /// 从 u8 转换，无效值视为 Uninitialized
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initializing,
            2 => Self::Running,
            3 => Self::Stopped,
            4 => Self::Faulted,
            _ => Self::Uninitialized,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// 会话状态（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicSessionState {
    inner: AtomicU8,
}

impl AtomicSessionState {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 获取当前状态
    ///
    /// 工作线程使用 `Acquire`：看到非 Running 时，必须同时看到停止前的所有写入。
    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: SessionState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换，成功返回 true
    pub fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.inner
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.get().is_running()
    }
}

/// 会话共享上下文
///
/// 由会话管理器持有，并以 `Arc` 形式交给三个工作线程。
/// 指令状态是唯一跨线程可变的数据：setter 整体替换快照，命令线程每个周期读取一次。
pub struct SpineContext {
    pub state: AtomicSessionState,
    pub commands: ArcSwap<CommandState>,
    pub metrics: SpineMetrics,
    pub connection_monitor: ConnectionMonitor,
}

impl SpineContext {
    pub fn new(connection_timeout: Duration) -> Self {
        Self {
            state: AtomicSessionState::new(SessionState::Uninitialized),
            commands: ArcSwap::from_pointee(CommandState::default()),
            metrics: SpineMetrics::new(),
            connection_monitor: ConnectionMonitor::new(connection_timeout),
        }
    }

    /// 当前指令快照
    pub fn command_snapshot(&self) -> CommandState {
        **self.commands.load()
    }

    /// 原子地修改指令状态（并发 setter 不会互相覆盖）
    pub fn update_commands(&self, f: impl Fn(&mut CommandState)) {
        self.commands.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            Arc::new(next)
        });
    }
}

//! Mock 传输实现
//!
//! 无硬件依赖，按脚本返回原始帧，记录所有写入。克隆出的实例共享内部状态，
//! 测试代码可以把一个克隆交给驱动、保留另一个用于检查。

use crate::{
    RawDataFrame, SpineCommand, SpineDeviceError, SpineDeviceErrorKind, SpineHandle,
    SpineTransport, TransportError,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// 脚本中的一步
enum ScriptStep {
    Frame(RawDataFrame),
    Error(TransportError),
}

struct MockState {
    script: VecDeque<ScriptStep>,
    /// 脚本耗尽后重复返回的帧（`seq` 自动递增）
    idle_frame: RawDataFrame,
    read_delay: Duration,
    fail_open: bool,
    write_fault: Option<SpineDeviceErrorKind>,
    next_handle: u32,
    open_handle: Option<SpineHandle>,
    open_count: usize,
    close_count: usize,
    read_count: usize,
    written: Vec<SpineCommand>,
    writes_after_close: usize,
}

/// 可脚本化的 spine 传输
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// 创建 Mock 传输，空闲帧的触摸值为 1（可通过预热探测）
    pub fn new() -> Self {
        let idle_frame = RawDataFrame {
            touch_sensor: 1,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(MockState {
                script: VecDeque::new(),
                idle_frame,
                read_delay: Duration::from_millis(1),
                fail_open: false,
                write_fault: None,
                next_handle: 1,
                open_handle: None,
                open_count: 0,
                close_count: 0,
                read_count: 0,
                written: Vec::new(),
                writes_after_close: 0,
            })),
        }
    }

    pub fn with_idle_frame(self, frame: RawDataFrame) -> Self {
        self.state.lock().idle_frame = frame;
        self
    }

    pub fn with_read_delay(self, delay: Duration) -> Self {
        self.state.lock().read_delay = delay;
        self
    }

    /// 追加一帧到读取脚本
    pub fn push_frame(&self, frame: RawDataFrame) {
        self.state.lock().script.push_back(ScriptStep::Frame(frame));
    }

    /// 追加一个读取错误到脚本
    pub fn push_error(&self, error: TransportError) {
        self.state.lock().script.push_back(ScriptStep::Error(error));
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// 设置后续写入返回的设备错误（`None` 恢复正常）
    pub fn set_write_fault(&self, kind: Option<SpineDeviceErrorKind>) {
        self.state.lock().write_fault = kind;
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().read_count
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open_handle.is_some()
    }

    pub fn written_commands(&self) -> Vec<SpineCommand> {
        self.state.lock().written.clone()
    }

    /// 在 `close` 之后仍然到达的写入次数
    pub fn writes_after_close(&self) -> usize {
        self.state.lock().writes_after_close
    }
}

impl SpineTransport for MockTransport {
    fn open(&self) -> Result<SpineHandle, TransportError> {
        let mut state = self.state.lock();
        state.open_count += 1;
        if state.fail_open {
            return Err(
                SpineDeviceError::new(SpineDeviceErrorKind::NotFound, "mock open failure").into(),
            );
        }
        let handle = SpineHandle::new(state.next_handle)
            .ok_or_else(|| SpineDeviceError::new(SpineDeviceErrorKind::Backend, "handle exhausted"))?;
        state.next_handle = state.next_handle.wrapping_add(1).max(1);
        state.open_handle = Some(handle);
        debug!("Mock spine opened, handle {}", handle);
        Ok(handle)
    }

    fn read_frame(&self, handle: SpineHandle) -> Result<RawDataFrame, TransportError> {
        let delay = self.state.lock().read_delay;
        // 模拟串口节奏，锁外等待
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if state.open_handle != Some(handle) {
            return Err(TransportError::Closed);
        }
        state.read_count += 1;
        match state.script.pop_front() {
            Some(ScriptStep::Frame(frame)) => Ok(frame),
            Some(ScriptStep::Error(e)) => {
                trace!("Mock spine: scripted read error: {}", e);
                Err(e)
            },
            None => {
                state.idle_frame.seq = state.idle_frame.seq.wrapping_add(1);
                Ok(state.idle_frame.clone())
            },
        }
    }

    fn write_command(
        &self,
        handle: SpineHandle,
        command: &SpineCommand,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.open_handle != Some(handle) {
            state.writes_after_close += 1;
            return Err(TransportError::Closed);
        }
        if let Some(kind) = state.write_fault {
            return Err(SpineDeviceError::new(kind, "mock write fault").into());
        }
        state.written.push(*command);
        Ok(())
    }

    fn close(&self, handle: SpineHandle) {
        let mut state = self.state.lock();
        if state.open_handle == Some(handle) {
            state.open_handle = None;
        }
        state.close_count += 1;
        debug!("Mock spine closed, handle {}", handle);
    }
}

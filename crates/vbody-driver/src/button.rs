//! 按键边沿检测
//!
//! 将帧中的按键电平（按下/未按下）转换为离散的按下/松开事件。

use crate::slot::LatestSlot;
use crate::state::SpineContext;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, trace};
use vbody_protocol::DataFrame;

/// 按键事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Released,
}

impl ButtonEvent {
    pub fn is_pressed(self) -> bool {
        self == ButtonEvent::Pressed
    }
}

impl From<ButtonEvent> for bool {
    fn from(event: ButtonEvent) -> bool {
        event.is_pressed()
    }
}

/// 边沿检测状态机（初始为未按下）
#[derive(Debug, Default)]
pub struct ButtonEdgeDetector {
    pressed: bool,
}

impl ButtonEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输入一次电平，电平变化时返回事件
    pub fn observe(&mut self, level: bool) -> Option<ButtonEvent> {
        match (self.pressed, level) {
            (false, true) => {
                self.pressed = true;
                Some(ButtonEvent::Pressed)
            },
            (true, false) => {
                self.pressed = false;
                Some(ButtonEvent::Released)
            },
            _ => None,
        }
    }
}

/// 按键检测线程主循环
///
/// 从扇出的按键输入槽取帧，检测边沿并投递到事件槽。
/// 带超时等待输入，以便在会话停止后及时退出；输入端断开时同样退出。
pub fn button_loop(
    input: Receiver<DataFrame>,
    events: LatestSlot<ButtonEvent>,
    ctx: Arc<SpineContext>,
    poll_interval: Duration,
) {
    let mut detector = ButtonEdgeDetector::new();

    loop {
        let frame = match input.recv_timeout(poll_interval) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => {
                if !ctx.state.is_running() {
                    break;
                }
                continue;
            },
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if !ctx.state.is_running() {
            break;
        }

        if let Some(event) = detector.observe(frame.button_state) {
            debug!("Button {:?} (frame seq {})", event, frame.seq);
            ctx.metrics.button_events.fetch_add(1, Ordering::Relaxed);
            events.offer(event);
        }
    }

    trace!("Button thread: loop exited");
}

//! Pipeline IO 循环模块
//!
//! - 预热探测：`init()` 中确认机身链路存活
//! - 采集线程（RX）：连续读取、解码、扇出，不跳过任何读取
//! - 命令线程（TX）：固定周期写入当前指令快照
//!
//! 两个线程互相独立：TX 的阻塞不会影响 RX 的读取节奏。

use crate::config::SpineConfig;
use crate::error::{DriverError, FaultSource, SessionFault};
use crate::fanout::FrameFanout;
use crate::slot::LatestSlot;
use crate::state::{SessionState, SpineContext};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};
use vbody_protocol::{DataFrame, decode_frame};
use vbody_spine::{SpineHandle, SpineTransport, TransportError};

/// 预热探测
///
/// 最多读取 `warmup_attempts` 帧，直到某一帧的触摸传感器读数非零。
/// 非零读数说明链路存活且固件在产生有效数据；这不是传感器校准检查。
///
/// # 错误
/// - `DriverError::LinkNotResponding`: 所有尝试的读数都为 0
/// - `DriverError::Transport`: 读取时遇到致命传输错误
pub fn warmup_probe(
    transport: &dyn SpineTransport,
    handle: SpineHandle,
    config: &SpineConfig,
) -> Result<DataFrame, DriverError> {
    let attempts = config.warmup_attempts;

    for attempt in 1..=attempts {
        match transport.read_frame(handle) {
            Ok(raw) => {
                let frame = decode_frame(&raw);
                if frame.touch != 0 {
                    debug!(
                        "Warm-up probe: valid frame after {} attempt(s), seq {}",
                        attempt, frame.seq
                    );
                    return Ok(frame);
                }
                debug!("Warm-up probe {}/{}: touch sensor reads 0", attempt, attempts);
            },
            Err(e) if e.is_fatal() => return Err(DriverError::Transport(e)),
            Err(e) => debug!("Warm-up probe {}/{}: read failed: {}", attempt, attempts, e),
        }

        if attempt < attempts {
            thread::sleep(config.warmup_retry());
        }
    }

    Err(DriverError::LinkNotResponding { attempts })
}

/// 工作线程遇到致命错误时，将会话切换到 Faulted 并发布故障事件
///
/// 会话已经不在 Running（例如正在 `stop()`）时什么都不做。
fn raise_fault(
    ctx: &SpineContext,
    faults: &LatestSlot<SessionFault>,
    source: FaultSource,
    err: &TransportError,
) {
    if ctx.state.transition(SessionState::Running, SessionState::Faulted) {
        error!("{} thread: fatal transport error, session faulted: {}", source, err);
        faults.offer(SessionFault {
            source,
            message: err.to_string(),
        });
    }
}

/// RX 线程主循环（采集）
///
/// # 参数
/// - `transport`: 传输层（只调用 `read_frame`）
/// - `handle`: 链路句柄
/// - `ctx`: 共享上下文
/// - `fanout`: 扇出状态机（持有订阅槽和按键输入槽的生产端）
/// - `faults`: 故障事件槽
pub fn rx_loop(
    transport: Arc<dyn SpineTransport>,
    handle: SpineHandle,
    ctx: Arc<SpineContext>,
    mut fanout: FrameFanout,
    faults: Arc<LatestSlot<SessionFault>>,
) {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::info;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => info!("RX thread priority set to MAX (realtime)"),
            Err(e) => warn!(
                "Failed to set RX thread priority: {}. \
                On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                e
            ),
        }
    }

    let metrics = &ctx.metrics;

    loop {
        if !ctx.state.is_running() {
            trace!("RX thread: session not running, exiting");
            break;
        }

        let raw = match transport.read_frame(handle) {
            Ok(raw) => {
                metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
                raw
            },
            Err(TransportError::Timeout) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) if e.is_fatal() => {
                metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                raise_fault(&ctx, &faults, FaultSource::Acquisition, &e);
                break;
            },
            Err(e) => {
                metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Spine read error: {}", e);
                continue;
            },
        };

        ctx.connection_monitor.register_frame();
        fanout.offer(decode_frame(&raw), metrics);
    }

    trace!("RX thread: loop exited");
}

/// TX 线程主循环（命令）
///
/// 每个周期读取一次指令快照并写入一次，同一时刻最多一个写入在途。
/// 非致命写入错误只记录，不向调用方报告。
///
/// # 参数
/// - `period`: 写入周期
/// - `seq_seed`: 第一条指令的序号，之后每个周期递增（回绕）
pub fn tx_loop(
    transport: Arc<dyn SpineTransport>,
    handle: SpineHandle,
    ctx: Arc<SpineContext>,
    faults: Arc<LatestSlot<SessionFault>>,
    period: Duration,
    seq_seed: u32,
) {
    let metrics = &ctx.metrics;
    let mut seq = seq_seed;
    let mut next_tick = Instant::now() + period;

    loop {
        // spin_sleep 提供亚毫秒精度，10ms 周期下抖动远小于 thread::sleep
        spin_sleep::sleep(next_tick.saturating_duration_since(Instant::now()));
        next_tick += period;
        let now = Instant::now();
        if next_tick < now {
            // 落后超过一个周期：重新对齐，不补发
            next_tick = now + period;
        }

        if !ctx.state.is_running() {
            trace!("TX thread: session not running, exiting");
            break;
        }

        let command = ctx.command_snapshot().to_command(seq);
        seq = seq.wrapping_add(1);

        match transport.write_command(handle, &command) {
            Ok(()) => {
                metrics.tx_commands_total.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) if e.is_fatal() => {
                metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                raise_fault(&ctx, &faults, FaultSource::Command, &e);
                break;
            },
            Err(e) => {
                metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                trace!("Spine write error (seq {}): {}", command.seq, e);
            },
        }
    }

    trace!("TX thread: loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::latest_slot;
    use vbody_protocol::RawDataFrame;
    use vbody_spine::{MockTransport, SpineDeviceError, SpineDeviceErrorKind};

    fn touch_frame(seq: u32, touch: u16) -> RawDataFrame {
        RawDataFrame {
            seq,
            touch_sensor: touch,
            ..Default::default()
        }
    }

    fn fast_config() -> SpineConfig {
        SpineConfig {
            warmup_retry_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_warmup_succeeds_on_first_nonzero_touch() {
        let mock = MockTransport::new().with_read_delay(Duration::ZERO);
        mock.push_frame(touch_frame(1, 0));
        mock.push_frame(touch_frame(2, 0));
        mock.push_frame(touch_frame(3, 900));
        let handle = mock.open().unwrap();

        let frame = warmup_probe(&mock, handle, &fast_config()).unwrap();
        assert_eq!(frame.seq, 3);
        assert_eq!(mock.read_count(), 3);
    }

    #[test]
    fn test_warmup_gives_up_after_eleven_zero_reads() {
        let mock = MockTransport::new()
            .with_read_delay(Duration::ZERO)
            .with_idle_frame(touch_frame(0, 0));
        let handle = mock.open().unwrap();

        let err = warmup_probe(&mock, handle, &fast_config()).unwrap_err();
        assert!(matches!(err, DriverError::LinkNotResponding { attempts: 11 }));
        assert_eq!(mock.read_count(), 11);
    }

    #[test]
    fn test_warmup_valid_on_last_attempt() {
        let mock = MockTransport::new().with_read_delay(Duration::ZERO);
        for seq in 0..10 {
            mock.push_frame(touch_frame(seq, 0));
        }
        mock.push_frame(touch_frame(10, 5));
        let handle = mock.open().unwrap();

        assert_eq!(warmup_probe(&mock, handle, &fast_config()).unwrap().seq, 10);
    }

    #[test]
    fn test_warmup_aborts_on_fatal_error() {
        let mock = MockTransport::new().with_read_delay(Duration::ZERO);
        mock.push_error(TransportError::Timeout);
        mock.push_error(TransportError::Device(SpineDeviceError::new(
            SpineDeviceErrorKind::NoDevice,
            "unplugged",
        )));
        let handle = mock.open().unwrap();

        let err = warmup_probe(&mock, handle, &fast_config()).unwrap_err();
        assert!(matches!(err, DriverError::Transport(_)));
        assert_eq!(mock.read_count(), 2);
    }

    #[test]
    fn test_rx_loop_faults_on_fatal_read_error() {
        let mock = MockTransport::new().with_read_delay(Duration::ZERO);
        for seq in 1..=4 {
            mock.push_frame(touch_frame(seq, 1));
        }
        mock.push_error(TransportError::Timeout);
        mock.push_error(TransportError::Closed);
        let handle = mock.open().unwrap();

        let ctx = Arc::new(SpineContext::new(Duration::from_secs(1)));
        ctx.state.set(SessionState::Running);
        let (sub_slot, sub_rx) = latest_slot();
        let (btn_slot, _btn_rx) = latest_slot();
        let (fault_slot, fault_rx) = latest_slot();

        rx_loop(
            Arc::new(mock),
            handle,
            ctx.clone(),
            FrameFanout::new(sub_slot, btn_slot),
            Arc::new(fault_slot),
        );

        assert_eq!(ctx.state.get(), SessionState::Faulted);
        let fault = fault_rx.try_recv().unwrap();
        assert_eq!(fault.source, FaultSource::Acquisition);

        // 4 帧读取，转发第 2、4 帧；槽中保留最新的第 4 帧
        assert_eq!(sub_rx.try_recv().unwrap().seq, 4);
        let snapshot = ctx.metrics.snapshot();
        assert_eq!(snapshot.rx_frames_total, 4);
        assert_eq!(snapshot.rx_frames_forwarded, 2);
        assert_eq!(snapshot.rx_timeouts, 1);
        assert_eq!(snapshot.rx_errors, 1);
    }

    #[test]
    fn test_tx_loop_writes_snapshot_with_increasing_seq() {
        let mock = MockTransport::new();
        let handle = mock.open().unwrap();
        let ctx = Arc::new(SpineContext::new(Duration::from_secs(1)));
        ctx.state.set(SessionState::Running);
        ctx.update_commands(|c| {
            c.motors = [100, -100, 0, 0];
            c.front_led = 0xFF;
        });
        let (fault_slot, _fault_rx) = latest_slot();

        let transport: Arc<dyn SpineTransport> = Arc::new(mock.clone());
        let ctx_clone = ctx.clone();
        let worker = thread::spawn(move || {
            tx_loop(
                transport,
                handle,
                ctx_clone,
                Arc::new(fault_slot),
                Duration::from_millis(2),
                8888,
            );
        });

        thread::sleep(Duration::from_millis(50));
        ctx.state.set(SessionState::Stopped);
        worker.join().unwrap();

        let written = mock.written_commands();
        assert!(written.len() >= 3, "expected several ticks, got {}", written.len());
        assert_eq!(written[0].seq, 8888);
        assert!(written.windows(2).all(|w| w[1].seq == w[0].seq.wrapping_add(1)));
        assert_eq!(written[0].motors, [100, -100, 0, 0]);
        assert_eq!(written[0].leds, [0, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_tx_loop_non_fatal_errors_keep_running() {
        let mock = MockTransport::new();
        let handle = mock.open().unwrap();
        mock.set_write_fault(Some(SpineDeviceErrorKind::Busy));
        let ctx = Arc::new(SpineContext::new(Duration::from_secs(1)));
        ctx.state.set(SessionState::Running);
        let (fault_slot, fault_rx) = latest_slot();

        let transport: Arc<dyn SpineTransport> = Arc::new(mock.clone());
        let ctx_clone = ctx.clone();
        let worker = thread::spawn(move || {
            tx_loop(
                transport,
                handle,
                ctx_clone,
                Arc::new(fault_slot),
                Duration::from_millis(2),
                0,
            );
        });

        thread::sleep(Duration::from_millis(30));
        assert_eq!(ctx.state.get(), SessionState::Running);
        assert!(fault_rx.try_recv().is_err());

        mock.set_write_fault(Some(SpineDeviceErrorKind::NoDevice));
        worker.join().unwrap();
        assert_eq!(ctx.state.get(), SessionState::Faulted);
        assert_eq!(fault_rx.try_recv().unwrap().source, FaultSource::Command);
        assert!(ctx.metrics.snapshot().tx_errors >= 2);
    }
}

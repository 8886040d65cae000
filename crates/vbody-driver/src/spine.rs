//! Spine 会话管理
//!
//! 提供对外的 `Spine` 结构体：持有传输层句柄和指令状态，
//! 负责启动/停止采集、命令、按键检测三个工作线程。

use crate::button::{ButtonEvent, button_loop};
use crate::config::SpineConfig;
use crate::error::{DriverError, SessionFault};
use crate::fanout::FrameFanout;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{rx_loop, tx_loop, warmup_probe};
use crate::slot::latest_slot;
use crate::state::{SessionState, SpineContext};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use vbody_protocol::{CommandState, DataFrame, scale_motor_speeds};
use vbody_spine::{SpineHandle, SpineTransport};

/// 按键线程等待输入的超时，决定其观察到停止的最长延迟
const BUTTON_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 排空等待时轮询线程状态的间隔
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 在截止时间前回收工作线程
///
/// 线程在截止时间前结束时 join 并返回 true（线程 panic 也算已结束，记录错误）；
/// 超时返回 false，线程被分离，阻塞的读取会在句柄关闭后以 `Closed` 返回。
fn drain_worker(name: &str, worker: JoinHandle<()>, deadline: Instant) -> bool {
    while !worker.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(DRAIN_POLL_INTERVAL);
    }
    if worker.join().is_err() {
        error!("{} thread panicked", name);
    }
    true
}

#[derive(Default)]
struct Workers {
    rx: Option<JoinHandle<()>>,
    tx: Option<JoinHandle<()>>,
    button: Option<JoinHandle<()>>,
}

/// 只在持有生命周期锁时访问
#[derive(Default)]
struct Lifecycle {
    handle: Option<SpineHandle>,
    workers: Workers,
}

/// 当前会话的接收端，每次 `init()` 重新创建
#[derive(Clone)]
struct SessionOutputs {
    frames: Receiver<DataFrame>,
    buttons: Receiver<ButtonEvent>,
    faults: Receiver<SessionFault>,
}

/// Spine 会话（对外 API）
///
/// 一个实例对应一条机身链路。`init()`/`stop()` 可以重复调用，
/// 所有方法都可以从任意线程并发调用。
///
/// # Example
///
/// ```no_run
/// use vbody_driver::{SpineBuilder, LED_GREEN};
/// # fn example(transport: impl vbody_spine::SpineTransport + 'static) -> Result<(), vbody_driver::DriverError> {
/// let spine = SpineBuilder::new().build(transport)?;
/// spine.init()?;
/// spine.set_led_command(LED_GREEN, LED_GREEN, LED_GREEN)?;
///
/// for frame in spine.frames()?.iter().take(10) {
///     println!("seq {} touch {}", frame.seq, frame.touch);
/// }
/// spine.stop();
/// # Ok(())
/// # }
/// ```
pub struct Spine {
    transport: Arc<dyn SpineTransport>,
    config: SpineConfig,
    ctx: Arc<SpineContext>,
    /// 串行化 init/stop
    lifecycle: Mutex<Lifecycle>,
    outputs: Mutex<Option<SessionOutputs>>,
}

impl Spine {
    /// 创建会话（不打开链路）
    pub fn new(transport: Arc<dyn SpineTransport>, config: SpineConfig) -> Self {
        let ctx = Arc::new(SpineContext::new(config.connection_timeout()));
        Self {
            transport,
            config,
            ctx,
            lifecycle: Mutex::new(Lifecycle::default()),
            outputs: Mutex::new(None),
        }
    }

    /// 初始化链路并启动工作线程
    ///
    /// 已经运行时直接返回 `Ok`，不会重新打开传输层。
    ///
    /// # 错误
    /// - `DriverError::InitFailure`: 无法打开传输层
    /// - `DriverError::LinkNotResponding`: 预热探测未收到有效帧
    /// - `DriverError::Transport`: 预热期间遇到致命传输错误
    /// - `DriverError::WorkerSpawn`: 无法创建工作线程
    ///
    /// 任何错误都会把会话回滚为未初始化并释放句柄。
    pub fn init(&self) -> Result<(), DriverError> {
        let mut lifecycle = self.lifecycle.lock();

        if self.ctx.state.is_running() {
            if let Some(handle) = lifecycle.handle {
                info!("Spine already initialized, handle {}", handle);
            }
            return Ok(());
        }

        // 故障后残留的线程和句柄
        self.teardown(&mut lifecycle);

        self.ctx.state.set(SessionState::Initializing);
        let handle = match self.transport.open() {
            Ok(handle) => handle,
            Err(e) => {
                self.ctx.state.set(SessionState::Uninitialized);
                error!("Error initializing spine: {}. Is the body link alive?", e);
                return Err(DriverError::InitFailure(e));
            },
        };
        lifecycle.handle = Some(handle);

        self.ctx.metrics.reset();
        self.ctx.commands.store(Arc::new(CommandState::default()));
        self.ctx.state.set(SessionState::Running);

        let started = warmup_probe(self.transport.as_ref(), handle, &self.config)
            .and_then(|_| self.spawn_workers(handle, &mut lifecycle.workers));
        if let Err(e) = started {
            error!("Error initializing spine: {}", e);
            self.ctx.state.set(SessionState::Uninitialized);
            self.teardown(&mut lifecycle);
            return Err(e);
        }

        self.ctx.connection_monitor.register_frame();
        info!(
            "Spine initialized, handle {} (read_only: {})",
            handle, self.config.read_only
        );
        drop(lifecycle);

        let settle = self.config.startup_settle();
        if !settle.is_zero() {
            thread::sleep(settle);
        }
        Ok(())
    }

    /// 停止工作线程并关闭链路
    ///
    /// 未运行时为空操作。命令线程先于 `close()` 退出，关闭之后不会再有写入。
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();

        match self.ctx.state.get() {
            SessionState::Running => {},
            SessionState::Faulted if lifecycle.handle.is_some() => {},
            state => {
                debug!("Spine stop ignored in state {:?}", state);
                return;
            },
        }

        self.ctx.state.set(SessionState::Stopped);
        info!("Stopping spine");
        self.teardown(&mut lifecycle);
    }

    /// 会话是否运行中
    pub fn is_initialized(&self) -> bool {
        self.ctx.state.is_running()
    }

    /// 当前生命周期状态
    pub fn state(&self) -> SessionState {
        self.ctx.state.get()
    }

    /// 设置电机速度（右轮、左轮、升降臂、头部）
    ///
    /// 速度乘以 100 转换为传输层单位，左轮取反。不做限幅。
    pub fn set_motor_command(
        &self,
        right: i16,
        left: i16,
        lift: i16,
        head: i16,
    ) -> Result<(), DriverError> {
        if !self.ctx.state.is_running() {
            return Err(DriverError::NotInitialized);
        }
        let motors = scale_motor_speeds(right, left, lift, head);
        self.ctx.update_commands(|c| c.motors = motors);
        Ok(())
    }

    /// 设置 LED 颜色（前、中、后），参考 `LED_*` 常量
    pub fn set_led_command(&self, front: u32, middle: u32, back: u32) -> Result<(), DriverError> {
        if !self.ctx.state.is_running() {
            return Err(DriverError::NotInitialized);
        }
        self.ctx.update_commands(|c| {
            c.front_led = front;
            c.middle_led = middle;
            c.back_led = back;
        });
        Ok(())
    }

    /// 当前指令快照（已缩放）
    pub fn command_state(&self) -> CommandState {
        self.ctx.command_snapshot()
    }

    /// 帧订阅接收端（最新值优先，每两帧转发一帧）
    ///
    /// 会话停止后接收端返回断开错误；重新 `init()` 后需要重新获取。
    pub fn frames(&self) -> Result<Receiver<DataFrame>, DriverError> {
        self.outputs()
            .map(|o| o.frames)
            .ok_or(DriverError::NotInitialized)
    }

    /// 按键事件接收端
    pub fn buttons(&self) -> Result<Receiver<ButtonEvent>, DriverError> {
        self.outputs()
            .map(|o| o.buttons)
            .ok_or(DriverError::NotInitialized)
    }

    /// 会话故障接收端
    pub fn faults(&self) -> Result<Receiver<SessionFault>, DriverError> {
        self.outputs()
            .map(|o| o.faults)
            .ok_or(DriverError::NotInitialized)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 最近一帧是否在连接超时之内
    pub fn is_link_alive(&self) -> bool {
        self.is_initialized() && self.ctx.connection_monitor.check_connection()
    }

    pub fn time_since_last_frame(&self) -> Duration {
        self.ctx.connection_monitor.time_since_last_frame()
    }

    pub fn config(&self) -> &SpineConfig {
        &self.config
    }

    fn outputs(&self) -> Option<SessionOutputs> {
        self.outputs.lock().clone()
    }

    fn spawn_workers(
        &self,
        handle: SpineHandle,
        workers: &mut Workers,
    ) -> Result<(), DriverError> {
        let (frame_slot, frame_rx) = latest_slot();
        let (button_input, button_input_rx) = latest_slot();
        let (event_slot, event_rx) = latest_slot();
        let (fault_slot, fault_rx) = latest_slot();
        let fault_slot = Arc::new(fault_slot);

        *self.outputs.lock() = Some(SessionOutputs {
            frames: frame_rx,
            buttons: event_rx,
            faults: fault_rx,
        });

        let fanout = FrameFanout::new(frame_slot, button_input);
        let transport = self.transport.clone();
        let ctx = self.ctx.clone();
        let faults = fault_slot.clone();
        workers.rx = Some(spawn_worker("vbody-rx", move || {
            rx_loop(transport, handle, ctx, fanout, faults);
        })?);

        let ctx = self.ctx.clone();
        workers.button = Some(spawn_worker("vbody-button", move || {
            button_loop(button_input_rx, event_slot, ctx, BUTTON_POLL_INTERVAL);
        })?);

        if self.config.read_only {
            info!("Read-only mode: command loop disabled");
        } else {
            let transport = self.transport.clone();
            let ctx = self.ctx.clone();
            let period = self.config.command_period();
            let seed = self.config.command_seq_seed;
            workers.tx = Some(spawn_worker("vbody-tx", move || {
                tx_loop(transport, handle, ctx, fault_slot, period, seed);
            })?);
        }

        Ok(())
    }

    /// 回收工作线程并关闭句柄（调用前会话必须已离开 Running）
    fn teardown(&self, lifecycle: &mut Lifecycle) {
        let grace = self.config.stop_grace();

        // 命令线程必须在 close 之前退出；它最多睡眠一个周期
        let tx_bound = grace.max(self.config.command_period() * 2);
        if let Some(worker) = lifecycle.workers.tx.take()
            && !drain_worker("TX", worker, Instant::now() + tx_bound)
        {
            error!("TX thread failed to shut down within {:?}", tx_bound);
        }

        // 采集线程可能阻塞在读取上，最多等待 grace
        let deadline = Instant::now() + grace;
        for (name, worker) in [
            ("RX", lifecycle.workers.rx.take()),
            ("Button", lifecycle.workers.button.take()),
        ] {
            if let Some(worker) = worker
                && !drain_worker(name, worker, deadline)
            {
                warn!("{} thread did not exit within {:?}", name, grace);
            }
        }

        if let Some(handle) = lifecycle.handle.take() {
            self.transport.close(handle);
            info!("Spine closed, handle {}", handle);
        }
        *self.outputs.lock() = None;
    }
}

impl Drop for Spine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_worker<F>(name: &str, f: F) -> Result<JoinHandle<()>, DriverError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(DriverError::WorkerSpawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbody_protocol::{LED_BLUE, LED_GREEN, LED_RED, RawDataFrame};
    use vbody_spine::MockTransport;

    fn test_config() -> SpineConfig {
        SpineConfig {
            startup_settle_ms: 0,
            warmup_retry_ms: 0,
            ..Default::default()
        }
    }

    fn new_spine(mock: &MockTransport) -> Spine {
        Spine::new(Arc::new(mock.clone()), test_config())
    }

    #[test]
    fn test_init_and_stop_are_idempotent() {
        let mock = MockTransport::new();
        let spine = new_spine(&mock);

        spine.stop();
        assert_eq!(mock.close_count(), 0);

        spine.init().unwrap();
        spine.init().unwrap();
        assert!(spine.is_initialized());
        assert_eq!(mock.open_count(), 1);

        spine.stop();
        spine.stop();
        assert!(!spine.is_initialized());
        assert_eq!(spine.state(), SessionState::Stopped);
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_commands_require_running_session() {
        let mock = MockTransport::new();
        let spine = new_spine(&mock);

        assert!(matches!(
            spine.set_motor_command(1, 1, 0, 0),
            Err(DriverError::NotInitialized)
        ));
        assert!(matches!(
            spine.set_led_command(LED_RED, LED_RED, LED_RED),
            Err(DriverError::NotInitialized)
        ));
        assert!(matches!(spine.frames(), Err(DriverError::NotInitialized)));

        spine.init().unwrap();
        spine.set_motor_command(1, 1, 0, 0).unwrap();
        spine.set_led_command(LED_RED, LED_GREEN, LED_BLUE).unwrap();

        let state = spine.command_state();
        assert_eq!(state.motors, [100, -100, 0, 0]);
        assert_eq!(
            (state.front_led, state.middle_led, state.back_led),
            (LED_RED, LED_GREEN, LED_BLUE)
        );

        spine.stop();
        assert!(matches!(
            spine.set_motor_command(1, 1, 0, 0),
            Err(DriverError::NotInitialized)
        ));
    }

    #[test]
    fn test_open_failure_leaves_session_uninitialized() {
        let mock = MockTransport::new();
        mock.set_fail_open(true);
        let spine = new_spine(&mock);

        assert!(matches!(spine.init(), Err(DriverError::InitFailure(_))));
        assert_eq!(spine.state(), SessionState::Uninitialized);
        assert!(!spine.is_initialized());
    }

    #[test]
    fn test_warmup_failure_rolls_back_and_closes() {
        let mock = MockTransport::new()
            .with_read_delay(Duration::ZERO)
            .with_idle_frame(RawDataFrame::default());
        let spine = new_spine(&mock);

        let err = spine.init().unwrap_err();
        assert!(matches!(err, DriverError::LinkNotResponding { attempts: 11 }));
        assert_eq!(spine.state(), SessionState::Uninitialized);
        assert_eq!(mock.read_count(), 11);
        assert!(!mock.is_open());
        assert!(matches!(spine.frames(), Err(DriverError::NotInitialized)));
    }

    #[test]
    fn test_command_state_resets_on_reinit() {
        let mock = MockTransport::new();
        let spine = new_spine(&mock);

        spine.init().unwrap();
        spine.set_motor_command(3, 0, 0, 0).unwrap();
        spine.stop();

        spine.init().unwrap();
        assert_eq!(spine.command_state(), CommandState::default());
        assert_eq!(mock.open_count(), 2);
    }

    #[test]
    fn test_read_only_mode_never_writes() {
        let mock = MockTransport::new();
        let config = SpineConfig {
            read_only: true,
            ..test_config()
        };
        let spine = Spine::new(Arc::new(mock.clone()), config);

        spine.init().unwrap();
        let frame = spine
            .frames()
            .unwrap()
            .recv_timeout(Duration::from_secs(1))
            .unwrap();
        assert_eq!(frame.touch, 1);
        thread::sleep(Duration::from_millis(30));
        spine.stop();

        assert!(mock.written_commands().is_empty());
    }

    #[test]
    fn test_drain_worker_joins_finished_thread() {
        let worker = thread::spawn(|| thread::sleep(Duration::from_millis(5)));
        assert!(drain_worker("test", worker, Instant::now() + Duration::from_secs(1)));
    }

    #[test]
    fn test_drain_worker_gives_up_at_deadline() {
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let worker = thread::spawn(move || {
            let _ = release_rx.recv();
        });

        let started = Instant::now();
        assert!(!drain_worker("test", worker, started + Duration::from_millis(20)));
        assert!(started.elapsed() < Duration::from_millis(500));
        drop(release_tx);
    }

    #[test]
    fn test_drain_worker_survives_panicked_thread() {
        let worker = thread::spawn(|| panic!("worker panic"));
        assert!(drain_worker("test", worker, Instant::now() + Duration::from_secs(1)));
    }

    #[test]
    fn test_drop_closes_transport() {
        let mock = MockTransport::new();
        {
            let spine = new_spine(&mock);
            spine.init().unwrap();
        }
        assert_eq!(mock.close_count(), 1);
        assert!(!mock.is_open());
    }
}

//! 性能指标模块
//!
//! 原子计数器，用于观察 spine 链路健康状态、丢帧与覆盖情况。
//! 任何线程都可以读取快照，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// Spine 会话实时指标
///
/// # 使用示例
///
/// ```rust
/// use vbody_driver::SpineMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = SpineMetrics::new();
/// metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.rx_frames_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct SpineMetrics {
    /// 采集线程读取的总帧数
    pub rx_frames_total: AtomicU64,

    /// 转发给下游的帧数
    pub rx_frames_forwarded: AtomicU64,

    /// 被隔帧丢弃的帧数
    pub rx_frames_discarded: AtomicU64,

    /// 订阅输出槽被覆盖的次数（消费者跟不上）
    pub frame_slot_overwrites: AtomicU64,

    /// 按键检测输入槽被覆盖的次数
    pub button_slot_overwrites: AtomicU64,

    /// 产生的按键事件数
    pub button_events: AtomicU64,

    /// 读取超时次数
    pub rx_timeouts: AtomicU64,

    /// 读取错误次数（不含超时）
    pub rx_errors: AtomicU64,

    /// 成功写入的指令数
    pub tx_commands_total: AtomicU64,

    /// 写入失败次数
    pub tx_errors: AtomicU64,
}

impl SpineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_frames_forwarded: self.rx_frames_forwarded.load(Ordering::Relaxed),
            rx_frames_discarded: self.rx_frames_discarded.load(Ordering::Relaxed),
            frame_slot_overwrites: self.frame_slot_overwrites.load(Ordering::Relaxed),
            button_slot_overwrites: self.button_slot_overwrites.load(Ordering::Relaxed),
            button_events: self.button_events.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            tx_commands_total: self.tx_commands_total.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器（每次 `init()` 时调用）
    pub fn reset(&self) {
        self.rx_frames_total.store(0, Ordering::Relaxed);
        self.rx_frames_forwarded.store(0, Ordering::Relaxed);
        self.rx_frames_discarded.store(0, Ordering::Relaxed);
        self.frame_slot_overwrites.store(0, Ordering::Relaxed);
        self.button_slot_overwrites.store(0, Ordering::Relaxed);
        self.button_events.store(0, Ordering::Relaxed);
        self.rx_timeouts.store(0, Ordering::Relaxed);
        self.rx_errors.store(0, Ordering::Relaxed);
        self.tx_commands_total.store(0, Ordering::Relaxed);
        self.tx_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub rx_frames_total: u64,
    pub rx_frames_forwarded: u64,
    pub rx_frames_discarded: u64,
    pub frame_slot_overwrites: u64,
    pub button_slot_overwrites: u64,
    pub button_events: u64,
    pub rx_timeouts: u64,
    pub rx_errors: u64,
    pub tx_commands_total: u64,
    pub tx_errors: u64,
}

impl MetricsSnapshot {
    /// 订阅槽覆盖率（百分比，相对于已转发帧数）
    ///
    /// 如果这个值持续偏高，说明消费者处理速度跟不上帧率。
    pub fn overwrite_rate(&self) -> f64 {
        if self.rx_frames_forwarded == 0 {
            return 0.0;
        }
        (self.frame_slot_overwrites as f64 / self.rx_frames_forwarded as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = SpineMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = SpineMetrics::new();
        metrics.rx_frames_total.fetch_add(100, Ordering::Relaxed);
        metrics.tx_commands_total.fetch_add(50, Ordering::Relaxed);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_overwrite_rate() {
        let snapshot = MetricsSnapshot {
            rx_frames_forwarded: 200,
            frame_slot_overwrites: 50,
            ..Default::default()
        };
        assert!((snapshot.overwrite_rate() - 25.0).abs() < f64::EPSILON);
        assert_eq!(MetricsSnapshot::default().overwrite_rate(), 0.0);
    }

    #[test]
    fn test_metrics_concurrent_updates() {
        let metrics = Arc::new(SpineMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.rx_frames_total.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().rx_frames_total, 4000);
    }
}

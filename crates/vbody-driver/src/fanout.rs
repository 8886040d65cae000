//! 帧扇出
//!
//! 采集线程必须读取每一帧（串口缓冲区不能堆积），但下游只需要一半的帧率：
//! 每两帧丢弃第一帧、转发第二帧。转发的帧同时投递到订阅槽和按键检测输入槽，
//! 两个槽都是最新值优先，慢消费者只会丢帧，不会拖慢采集线程。

use crate::metrics::SpineMetrics;
use crate::slot::{LatestSlot, OfferOutcome};
use std::sync::atomic::Ordering;
use vbody_protocol::DataFrame;

/// 隔帧转发状态机
pub struct FrameFanout {
    /// 下一帧是否转发
    forward_next: bool,
    subscriber: LatestSlot<DataFrame>,
    button_input: LatestSlot<DataFrame>,
}

impl FrameFanout {
    pub fn new(subscriber: LatestSlot<DataFrame>, button_input: LatestSlot<DataFrame>) -> Self {
        Self {
            forward_next: false,
            subscriber,
            button_input,
        }
    }

    /// 处理一帧，返回是否转发
    pub fn offer(&mut self, frame: DataFrame, metrics: &SpineMetrics) -> bool {
        if !self.forward_next {
            self.forward_next = true;
            metrics.rx_frames_discarded.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.forward_next = false;

        if self.button_input.offer(frame.clone()) == OfferOutcome::Replaced {
            metrics.button_slot_overwrites.fetch_add(1, Ordering::Relaxed);
        }
        if self.subscriber.offer(frame) == OfferOutcome::Replaced {
            metrics.frame_slot_overwrites.fetch_add(1, Ordering::Relaxed);
        }
        metrics.rx_frames_forwarded.fetch_add(1, Ordering::Relaxed);
        true
    }
}

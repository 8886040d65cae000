//! 单槽“最新值优先”交接点
//!
//! 容量为 1 的通道：生产者永不阻塞，槽中最多一个待取值。
//! 槽被占用时丢弃旧值，新值留在槽中（Overwrite 策略）。
//! 消费者拿到的是普通的 `crossbeam_channel::Receiver`，所有生产端释放后 `recv()` 返回错误。

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// 一次投递的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// 槽为空，直接放入
    Stored,
    /// 槽中的旧值被丢弃
    Replaced,
}

/// 生产端
///
/// 同一个槽只能有一个生产者；持有一个接收端克隆用于弹出旧值。
pub struct LatestSlot<T> {
    tx: Sender<T>,
    evict: Receiver<T>,
}

/// 创建一个单槽交接点，返回生产端和消费端
pub fn latest_slot<T>() -> (LatestSlot<T>, Receiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let slot = LatestSlot {
        tx,
        evict: rx.clone(),
    };
    (slot, rx)
}

impl<T> LatestSlot<T> {
    /// 非阻塞投递
    pub fn offer(&self, value: T) -> OfferOutcome {
        match self.tx.try_send(value) {
            Ok(()) => OfferOutcome::Stored,
            Err(TrySendError::Full(value)) => {
                // 弹出旧值后重试；消费者可能恰好取走了它，结果相同
                let _ = self.evict.try_recv();
                let _ = self.tx.try_send(value);
                OfferOutcome::Replaced
            },
            // 自身持有接收端，通道不会断开
            Err(TrySendError::Disconnected(_)) => OfferOutcome::Stored,
        }
    }

    /// 槽中是否有待取值
    pub fn is_occupied(&self) -> bool {
        !self.tx.is_empty()
    }
}

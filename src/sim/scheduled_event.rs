//! 调度事件
//!
//! 定义调度事件结构及其优先级比较。

use super::event::Event;
use std::cmp::Ordering;

/// 调度事件，包含事件对象与入队序列号。
pub(crate) struct ScheduledEvent {
    pub(crate) seq: u64,
    pub(crate) ev: Event,
}

// BinaryHeap 是 max-heap；我们需要最小时间优先，因此反向比较。
// 同一时间的事件按入队顺序（FIFO）出队。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.ev.time.total_cmp(&other.ev.time) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
        .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

//! 事件队列
//!
//! 最小时间优先的事件队列，维护当前仿真时间与已处理事件计数。

use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use crate::error::SimError;
use std::collections::BinaryHeap;
use tracing::{debug, trace};

/// 事件队列：弹出顺序按时间单调不减，同时间按入队顺序。
#[derive(Default)]
pub struct EventQueue {
    now: SimTime,
    next_seq: u64,
    processed: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入事件；早于当前时间的事件会被拒绝
    #[tracing::instrument(skip(self, ev), fields(at = ?ev.time, dest = ?ev.destination))]
    pub fn add_event(&mut self, ev: Event) -> Result<(), SimError> {
        if ev.time.0.is_nan() || ev.time < self.now {
            return Err(SimError::EventInPast {
                at: ev.time,
                now: self.now,
            });
        }
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent { seq, ev });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        Ok(())
    }

    pub fn has_more_events(&self) -> bool {
        !self.q.is_empty()
    }

    /// 下一个事件的时间；队列为空时返回 None
    pub fn peek_next_event_time(&self) -> Option<SimTime> {
        self.q.peek().map(|item| item.ev.time)
    }

    /// 弹出下一个事件并推进当前时间
    pub fn pop_next_event(&mut self) -> Option<Event> {
        let item = self.q.pop()?;
        self.now = self.now.max(item.ev.time);
        self.processed = self.processed.saturating_add(1);
        trace!(
            now = ?self.now,
            seq = item.seq,
            remaining_queue = self.q.len(),
            "弹出事件"
        );
        Some(item.ev)
    }

    pub fn processed_count(&self) -> u64 {
        self.processed
    }

    pub fn pending_count(&self) -> usize {
        self.q.len()
    }

    pub fn current_time(&self) -> SimTime {
        self.now
    }

    /// 清空队列，时间与计数归零
    pub fn reset(&mut self) {
        debug!(dropped = self.q.len(), "重置事件队列");
        *self = Self::default();
    }
}

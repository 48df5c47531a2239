//! 仿真监听器
//!
//! 状态变化与刷新通知。未注册监听器时使用 [`ConsoleListener`] 打印到标准输出。

use super::state::{Reason, SimState};
use super::time::SimTime;
use std::time::Duration;

/// 仿真进度快照
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    pub processed: u64,
    pub pending: usize,
    pub sim_time: SimTime,
    /// 处理事件累计耗费的墙钟时间
    pub cpu_time: Duration,
}

pub trait SimListener: Send + Sync {
    fn on_state_changed(&self, state: SimState, reason: &Reason);

    /// `forced` 为 true 表示结束/出错时的强制刷新
    fn on_refresh(&self, forced: bool, progress: &Progress);
}

/// 默认监听器：打印文本摘要
#[derive(Debug, Default)]
pub struct ConsoleListener;

impl SimListener for ConsoleListener {
    fn on_state_changed(&self, state: SimState, reason: &Reason) {
        println!("simulation state -> {state:?} ({reason})");
    }

    fn on_refresh(&self, forced: bool, progress: &Progress) {
        println!(
            "refresh{}: t={}, processed={}, pending={}, cpu={:.3}s",
            if forced { " (forced)" } else { "" },
            progress.sim_time,
            progress.processed,
            progress.pending,
            progress.cpu_time.as_secs_f64()
        );
    }
}

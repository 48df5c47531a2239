//! 仿真控制句柄
//!
//! 其它线程只能通过 [`SimControl`] 请求状态变化或读取进度，绝不直接触碰网络。
//! 状态变化请求会等待正在处理的事件结束后才生效；暂停时仿真线程阻塞在条件变量上。

use super::listener::{ConsoleListener, Progress, SimListener};
use super::state::{Reason, SimState};
use crate::error::SimError;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

struct ControlState {
    state: SimState,
    /// 仿真线程正在处理一个事件
    in_flight: bool,
    /// 等待生效的外部请求数；大于 0 时仿真线程不会开始下一个事件
    pending_requests: usize,
    last_reason: Option<Reason>,
    progress: Progress,
}

struct Inner {
    st: Mutex<ControlState>,
    changed: Condvar,
    listener: Arc<dyn SimListener>,
}

/// 可跨线程克隆的控制句柄
#[derive(Clone)]
pub struct SimControl {
    inner: Arc<Inner>,
}

impl SimControl {
    pub fn new(listener: Option<Arc<dyn SimListener>>) -> Self {
        let listener = listener.unwrap_or_else(|| Arc::new(ConsoleListener));
        Self {
            inner: Arc::new(Inner {
                st: Mutex::new(ControlState {
                    state: SimState::NotStarted,
                    in_flight: false,
                    pending_requests: 0,
                    last_reason: None,
                    progress: Progress::default(),
                }),
                changed: Condvar::new(),
                listener,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.inner.st.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, ControlState>) -> MutexGuard<'a, ControlState> {
        self.inner
            .changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SimState {
        self.lock().state
    }

    pub fn last_reason(&self) -> Option<Reason> {
        self.lock().last_reason.clone()
    }

    pub fn progress(&self) -> Progress {
        self.lock().progress
    }

    pub fn listener(&self) -> &Arc<dyn SimListener> {
        &self.inner.listener
    }

    /// NotStarted -> Running
    pub fn start(&self) -> Result<(), SimError> {
        self.request(SimState::Running, |s| s == SimState::NotStarted)
    }

    /// Running/Step -> Paused
    pub fn pause(&self) -> Result<(), SimError> {
        self.request(SimState::Paused, |s| s.can_transition_to(SimState::Paused))
    }

    /// Paused -> Running
    pub fn resume(&self) -> Result<(), SimError> {
        self.request(SimState::Running, |s| s == SimState::Paused)
    }

    /// 处理一个事件后自动暂停
    pub fn step(&self) -> Result<(), SimError> {
        self.request(SimState::Step, |s| s.can_transition_to(SimState::Step))
    }

    /// 停止仿真；停止后不可恢复，只能重置
    pub fn stop(&self) -> Result<(), SimError> {
        self.request(SimState::Stopped, |s| s.can_transition_to(SimState::Stopped))
    }

    fn request(&self, to: SimState, allowed: impl Fn(SimState) -> bool) -> Result<(), SimError> {
        let mut st = self.lock();
        st.pending_requests += 1;
        while st.in_flight {
            st = self.wait(st);
        }
        st.pending_requests -= 1;
        let from = st.state;
        let result = if allowed(from) {
            st.state = to;
            st.last_reason = Some(Reason::UserRequest);
            Ok(())
        } else {
            Err(SimError::InvalidTransition { from, to })
        };
        drop(st);
        self.inner.changed.notify_all();

        if result.is_ok() {
            info!(?from, ?to, "外部请求状态变化");
            self.inner.listener.on_state_changed(to, &Reason::UserRequest);
        }
        result
    }

    /// 阻塞直到仿真停止，返回停止原因
    pub fn wait_until_stopped(&self) -> Reason {
        self.wait_for(|s| s == SimState::Stopped);
        self.last_reason().unwrap_or(Reason::EndOfSimulation)
    }

    /// 阻塞直到状态满足条件
    pub fn wait_for(&self, pred: impl Fn(SimState) -> bool) -> SimState {
        let mut st = self.lock();
        while !pred(st.state) {
            st = self.wait(st);
        }
        st.state
    }

    // ---- 以下由仿真线程调用 ----

    /// 未开始或暂停时阻塞；返回 Running/Step/Stopped
    pub(crate) fn wait_runnable(&self) -> SimState {
        self.wait_for(|s| !matches!(s, SimState::NotStarted | SimState::Paused))
    }

    /// 标记开始处理一个事件。外部请求优先；状态不再可运行时返回 false。
    pub(crate) fn begin_event(&self) -> bool {
        let mut st = self.lock();
        while st.pending_requests > 0 {
            st = self.wait(st);
        }
        if !st.state.is_active() {
            return false;
        }
        st.in_flight = true;
        true
    }

    /// 事件处理结束。Step 状态会降级为 Paused。返回最新状态。
    pub(crate) fn end_event(&self, progress: Progress) -> SimState {
        let mut st = self.lock();
        st.in_flight = false;
        st.progress = progress;
        let stepped = st.state == SimState::Step;
        if stepped {
            st.state = SimState::Paused;
            st.last_reason = Some(Reason::StepCompleted);
        }
        let state = st.state;
        drop(st);
        self.inner.changed.notify_all();

        if stepped {
            debug!("单步完成，暂停");
            self.inner
                .listener
                .on_state_changed(SimState::Paused, &Reason::StepCompleted);
        }
        state
    }

    /// 仿真线程主动停止。已经停止时不重复通知，返回 false。
    pub(crate) fn finish(&self, reason: Reason, progress: Progress) -> bool {
        let mut st = self.lock();
        st.in_flight = false;
        st.progress = progress;
        if st.state == SimState::Stopped {
            drop(st);
            self.inner.changed.notify_all();
            return false;
        }
        st.state = SimState::Stopped;
        st.last_reason = Some(reason.clone());
        drop(st);
        self.inner.changed.notify_all();

        self.inner
            .listener
            .on_state_changed(SimState::Stopped, &reason);
        true
    }

    pub(crate) fn refresh(&self, forced: bool, progress: Progress) {
        self.lock().progress = progress;
        self.inner.listener.on_refresh(forced, &progress);
    }

    /// 回到 NotStarted
    pub(crate) fn reset(&self) {
        let mut st = self.lock();
        st.state = SimState::NotStarted;
        st.in_flight = false;
        st.last_reason = None;
        st.progress = Progress::default();
        drop(st);
        self.inner.changed.notify_all();
    }
}

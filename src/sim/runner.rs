//! 仿真循环
//!
//! 反复执行 取事件 -> 路由处理 -> 统计，检查过渡期/结束条件并节流刷新通知。
//! 每次迭代返回显式的 [`Iteration`]，正常结束不借助错误传播。

use super::control::SimControl;
use super::kernel::{ModuleReport, SimKernel};
use super::listener::{Progress, SimListener};
use super::state::{Reason, SimState};
use super::time::SimTime;
use crate::error::SimError;
use crate::stats::ReportNode;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 单次迭代的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Iteration {
    /// 继续处理下一个事件
    Continue,
    /// 状态不再是 Running（暂停/单步结束/外部停止），回到等待
    Suspend,
    /// 仿真结束
    Finished(Reason),
}

/// 仿真结束后的完整报告
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub state: SimState,
    pub reason: String,
    pub end_time: SimTime,
    pub processed_events: u64,
    pub statistics: Option<ReportNode>,
    pub modules: Vec<ModuleReport>,
}

/// 仿真运行器：拥有内核，在单一线程上驱动仿真循环
pub struct SimRunner {
    kernel: SimKernel,
    control: SimControl,
    in_transitory: bool,
    cpu_total: Duration,
    cpu_since_refresh: Duration,
}

impl SimRunner {
    pub fn new(mut kernel: SimKernel, listener: Option<Arc<dyn SimListener>>) -> Self {
        let control = SimControl::new(listener);
        kernel.attach_control(control.clone());
        Self {
            kernel,
            control,
            in_transitory: true,
            cpu_total: Duration::ZERO,
            cpu_since_refresh: Duration::ZERO,
        }
    }

    /// 控制句柄，可克隆到其它线程
    pub fn control(&self) -> SimControl {
        self.control.clone()
    }

    pub fn state(&self) -> SimState {
        self.control.state()
    }

    pub fn kernel(&self) -> &SimKernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut SimKernel {
        &mut self.kernel
    }

    pub fn cpu_time(&self) -> Duration {
        self.cpu_total
    }

    fn progress(&self) -> Progress {
        let q = self.kernel.queue();
        Progress {
            processed: q.processed_count(),
            pending: q.pending_count(),
            sim_time: q.current_time(),
            cpu_time: self.cpu_total,
        }
    }

    /// 驱动仿真直到 Stopped。处于 NotStarted/Paused 时阻塞等待控制句柄的请求。
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Reason {
        loop {
            if self.control.wait_runnable() == SimState::Stopped {
                break;
            }
            if !self.kernel.is_started() {
                info!("▶️  开始运行仿真");
                if let Err(e) = self.kernel.initialize() {
                    self.finish(Reason::Error(e));
                    break;
                }
            }
            match self.iterate() {
                Iteration::Continue | Iteration::Suspend => {}
                Iteration::Finished(reason) => {
                    self.finish(reason);
                    break;
                }
            }
        }
        let reason = self
            .control
            .last_reason()
            .unwrap_or(Reason::EndOfSimulation);
        info!(
            total_events = self.kernel.queue().processed_count(),
            final_time = ?self.kernel.report_time(),
            %reason,
            "✅ 仿真结束"
        );
        reason
    }

    /// 单次迭代：检查过渡期与结束条件，然后处理一个事件
    pub fn iterate(&mut self) -> Iteration {
        let Some(t) = self.kernel.queue().peek_next_event_time() else {
            debug!("事件队列耗尽");
            self.control.refresh(true, self.progress());
            return Iteration::Finished(Reason::EndOfSimulation);
        };
        let processed = self.kernel.queue().processed_count();
        let params = *self.kernel.params();

        if self.in_transitory {
            let by_time = params.transitory_time.filter(|&tt| t >= tt);
            let by_count = params.transitory_events == Some(processed);
            if by_time.is_some() || by_count {
                let at = by_time.unwrap_or_else(|| self.kernel.queue().current_time());
                self.kernel.finish_transitory(at);
                self.in_transitory = false;
            }
        }

        if let Some(limit) = params.sim_time.filter(|&lim| t >= lim) {
            debug!(next = ?t, ?limit, "达到仿真时间上限");
            self.kernel.set_end_time(limit);
            return Iteration::Finished(Reason::EndOfSimulation);
        }
        if params.sim_events == Some(processed) {
            debug!(processed, "达到事件数上限");
            return Iteration::Finished(Reason::EndOfSimulation);
        }

        if !self.control.begin_event() {
            return Iteration::Suspend;
        }
        let Some(ev) = self.kernel.pop_next_event() else {
            self.control.end_event(self.progress());
            return Iteration::Continue;
        };
        let started = Instant::now();
        let result = self.kernel.process_event(ev);
        let elapsed = started.elapsed();
        self.cpu_total += elapsed;
        self.cpu_since_refresh += elapsed;

        if let Err(e) = result {
            warn!(error = %e, "事件处理出错，停止仿真");
            let reason = Reason::Error(e);
            // 刷新前先结束当前事件，回调里可以调用控制句柄
            self.finish(reason.clone());
            self.control.refresh(true, self.progress());
            return Iteration::Finished(reason);
        }

        if self.kernel.queue().processed_count() == u64::MAX {
            warn!("已处理事件数达到上限，停止仿真");
            return Iteration::Finished(Reason::EndOfSimulation);
        }

        let state = self.control.end_event(self.progress());
        if self.cpu_since_refresh.as_secs_f64() > params.refresh_time {
            self.control.refresh(false, self.progress());
            self.cpu_since_refresh = Duration::ZERO;
        }
        // 刷新回调可能已请求暂停或停止，下一次 begin_event 会看到
        match state {
            SimState::Running => Iteration::Continue,
            _ => Iteration::Suspend,
        }
    }

    fn finish(&mut self, reason: Reason) {
        let error = reason.is_error().then(|| reason.to_string());
        let stopped_now = self.control.finish(reason, self.progress());
        if let (true, Some(reason)) = (stopped_now, error) {
            warn!(%reason, "仿真因错误停止");
        }
    }

    /// 回到 NotStarted：队列、网络、统计、状态全部复位
    pub fn reset(&mut self) {
        self.kernel.reset();
        self.control.reset();
        self.in_transitory = true;
        self.cpu_total = Duration::ZERO;
        self.cpu_since_refresh = Duration::ZERO;
    }

    /// 收集最终报告（会调用各模块的 `finish`）
    pub fn report(&mut self) -> SimReport {
        let modules = self.kernel.finish();
        SimReport {
            state: self.control.state(),
            reason: self
                .control
                .last_reason()
                .map(|r| r.to_string())
                .unwrap_or_default(),
            end_time: self.kernel.report_time(),
            processed_events: self.kernel.queue().processed_count(),
            statistics: self.kernel.results(),
            modules,
        }
    }

    /// 在独立线程上运行仿真循环，结束后可通过 `join` 取回运行器
    pub fn spawn(self) -> Result<SimThread, SimError> {
        let control = self.control();
        let handle = thread::Builder::new()
            .name("sim-loop".to_string())
            .spawn(move || {
                let mut runner = self;
                runner.run();
                runner
            })?;
        Ok(SimThread { control, handle })
    }
}

/// 在后台线程上运行中的仿真
pub struct SimThread {
    control: SimControl,
    handle: JoinHandle<SimRunner>,
}

impl SimThread {
    pub fn control(&self) -> &SimControl {
        &self.control
    }

    /// 等待仿真线程结束并取回运行器
    pub fn join(self) -> Result<SimRunner, SimError> {
        self.handle
            .join()
            .map_err(|_| SimError::module("sim-loop", "simulation thread panicked"))
    }
}

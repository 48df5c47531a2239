//! 测试用的记录模块与监听器

use crate::error::SimError;
use crate::net::Network;
use crate::sim::{
    Capability, Destination, Event, ModuleContext, ParamMap, Progress, Reason, SimKernel,
    SimListener, SimModule, SimParams, SimState, SimTime,
};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

pub(super) type Log = Arc<Mutex<Vec<String>>>;

pub(super) fn new_log() -> Log {
    Arc::default()
}

pub(super) fn entries(log: &Log) -> Vec<String> {
    log.lock().expect("log lock").clone()
}

/// 把收到的回调按 `init:名字` / `名字@时间` / `transitory:名字@时间` 记入日志
pub(super) struct Recorder {
    name: &'static str,
    capability: Capability,
    log: Log,
    schedule: Vec<(f64, Destination)>,
    /// 每处理一个事件就给自己调度 `period` 秒之后的下一个
    period: Option<f64>,
    fail_at: Option<f64>,
}

impl Recorder {
    pub(super) fn new(name: &'static str, capability: Capability, log: &Log) -> Self {
        Self {
            name,
            capability,
            log: Arc::clone(log),
            schedule: Vec::new(),
            period: None,
            fail_at: None,
        }
    }

    /// 初始化时调度这些事件
    pub(super) fn scheduling(mut self, times: &[f64], dest: Destination) -> Self {
        self.schedule.extend(times.iter().map(|&t| (t, dest)));
        self
    }

    pub(super) fn every(mut self, period: f64) -> Self {
        self.period = Some(period);
        self
    }

    pub(super) fn failing_at(mut self, t: f64) -> Self {
        self.fail_at = Some(t);
        self
    }

    fn push(&self, entry: String) {
        self.log.lock().expect("log lock").push(entry);
    }
}

impl SimModule for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn initialize(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        _net: &mut Network,
        _own: &ParamMap,
        _sim: &SimParams,
        _global: &ParamMap,
    ) -> Result<(), SimError> {
        self.push(format!("init:{}", self.name));
        for &(t, dest) in &self.schedule {
            ctx.schedule_event(Event::tick(SimTime(t), dest))?;
        }
        Ok(())
    }

    fn process_event(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        _net: &mut Network,
        event: &Event,
    ) -> Result<(), SimError> {
        self.push(format!("{}@{}", self.name, event.time.0));
        if self.fail_at == Some(event.time.0) {
            return Err(SimError::module(self.name, "boom"));
        }
        if let Some(period) = self.period {
            ctx.schedule_event(Event::tick(
                SimTime(event.time.0 + period),
                event.destination,
            ))?;
        }
        Ok(())
    }

    fn finish_transitory(&mut self, now: SimTime) {
        self.push(format!("transitory:{}@{}", self.name, now.0));
    }

    fn finish(&mut self, out: &mut String, _now: SimTime) -> String {
        let _ = writeln!(out, "recorded by {}", self.name);
        format!("recorder {}", self.name)
    }
}

/// 记录所有状态变化与刷新
#[derive(Default)]
pub(super) struct RecordingListener {
    pub(super) states: Mutex<Vec<(SimState, Reason)>>,
    pub(super) refreshes: Mutex<Vec<(bool, Progress)>>,
}

impl RecordingListener {
    pub(super) fn states(&self) -> Vec<(SimState, Reason)> {
        self.states.lock().expect("states lock").clone()
    }

    pub(super) fn forced_refreshes(&self) -> usize {
        self.refreshes
            .lock()
            .expect("refreshes lock")
            .iter()
            .filter(|(forced, _)| *forced)
            .count()
    }

    /// 节流触发的（非强制）刷新，按发生顺序给出当时已处理的事件数
    pub(super) fn throttled_refreshes(&self) -> Vec<u64> {
        self.refreshes
            .lock()
            .expect("refreshes lock")
            .iter()
            .filter(|(forced, _)| !*forced)
            .map(|(_, progress)| progress.processed)
            .collect()
    }
}

impl SimListener for RecordingListener {
    fn on_state_changed(&self, state: SimState, reason: &Reason) {
        self.states
            .lock()
            .expect("states lock")
            .push((state, reason.clone()));
    }

    fn on_refresh(&self, forced: bool, progress: &Progress) {
        self.refreshes
            .lock()
            .expect("refreshes lock")
            .push((forced, *progress));
    }
}

/// 以默认参数叠加 `overrides` 配置内核
pub(super) fn configured_kernel(
    overrides: &[(&str, &str)],
    generator: impl SimModule + 'static,
    processor: impl SimModule + 'static,
) -> SimKernel {
    let mut map = SimParams::default_map();
    for (k, v) in overrides {
        map.insert(k.to_string(), v.to_string());
    }
    let mut kernel = SimKernel::new();
    kernel
        .configure(
            &map,
            ParamMap::new(),
            Box::new(generator),
            ParamMap::new(),
            Box::new(processor),
            ParamMap::new(),
        )
        .expect("configure kernel");
    kernel
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
